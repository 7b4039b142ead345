use std::path::PathBuf;

use clap::{Parser, Subcommand};
use payments_amqp::{
    amqp::{AmqpConnectionFactory, AmqpConnector},
    configuration::DefaultConfigurationProvider,
    ConfigurationProvider, InfrastructureBuilder, PaymentInfrastructure, Settings,
};

#[derive(Debug, Parser, Clone)]
#[command(version, about, long_about = None)]
pub struct Opts {
    /// Configuration file. Any format supported by the `config` crate (yaml, toml, json, ...)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Broker host, overrides `spring.rabbitmq.host`
    #[clap(long, global = true)]
    pub host: Option<String>,

    /// Broker port, overrides `spring.rabbitmq.port`
    #[clap(long, global = true)]
    pub port: Option<u16>,

    /// Broker user, overrides `spring.rabbitmq.username`
    #[clap(long, global = true)]
    pub username: Option<String>,

    /// Broker password, overrides `spring.rabbitmq.password`
    #[clap(long, global = true)]
    pub password: Option<String>,

    /// Overrides `payment.request-payment-queue`
    #[clap(long, global = true)]
    pub request_payment_queue: Option<String>,

    /// Overrides `payment.response-payment-queue`
    #[clap(long, global = true)]
    pub response_payment_queue: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Declare the payment exchanges, queues and bindings
    Declare,

    /// Publish one message
    Publish {
        /// Exchange to publish to
        #[clap(long, default_value = "request-payment")]
        exchange: String,

        /// Routing key of the message
        #[clap(long)]
        routing_key: String,

        /// Message body
        payload: String,
    },

    /// Print the messages of a queue until interrupted
    Listen {
        /// Queue to consume, defaults to the request payment queue
        #[clap(long)]
        queue: Option<String>,
    },
}

impl Opts {
    /// Load the settings from the configuration file, the environment and the command line
    pub fn settings(&self) -> anyhow::Result<Settings> {
        Ok(self.settings_provider().configure()?)
    }

    /// Provider layering the command line overrides on top of the other sources
    pub fn settings_provider(&self) -> DefaultConfigurationProvider<Settings> {
        let mut provider = DefaultConfigurationProvider::new();

        if let Some(ref config) = self.config {
            provider = provider.with_file(config);
        }

        let overrides = [
            ("spring.rabbitmq.host", self.host.clone()),
            ("spring.rabbitmq.port", self.port.map(|p| p.to_string())),
            ("spring.rabbitmq.username", self.username.clone()),
            ("spring.rabbitmq.password", self.password.clone()),
            (
                "payment.request-payment-queue",
                self.request_payment_queue.clone(),
            ),
            (
                "payment.response-payment-queue",
                self.response_payment_queue.clone(),
            ),
        ];

        for (key, value) in overrides {
            if let Some(value) = value {
                provider = provider.with_override(key, value);
            }
        }

        provider
    }

    pub async fn create_infrastructure(
        &self,
    ) -> anyhow::Result<PaymentInfrastructure<AmqpConnectionFactory>> {
        let infrastructure = InfrastructureBuilder::new()
            .configure(self.settings()?)
            .with_connector(AmqpConnector)
            .create()
            .await?;

        Ok(infrastructure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_configuration() {
        let opts = Opts::parse_from([
            "payments-amqp",
            "--host",
            "rabbitmq",
            "--port",
            "5673",
            "--request-payment-queue",
            "requests",
            "--response-payment-queue",
            "responses",
            "declare",
        ]);

        let settings = opts
            .settings_provider()
            .with_environment(false)
            .configure()
            .unwrap();
        assert_eq!(settings.broker().host, "rabbitmq");
        assert_eq!(settings.broker().port, 5673);
        assert_eq!(settings.payment().request_payment_queue, "requests");
        assert_eq!(settings.payment().response_payment_queue, "responses");
    }

    #[test]
    fn command_line_wins_over_environment() {
        let opts = Opts::parse_from([
            "payments-amqp",
            "--request-payment-queue",
            "from-cli",
            "listen",
        ]);

        let settings = opts
            .settings_provider()
            .with_environment_variables([
                ("PAYMENTS__PAYMENT__REQUEST_PAYMENT_QUEUE", "from-env"),
                ("PAYMENTS__PAYMENT__RESPONSE_PAYMENT_QUEUE", "from-env-resp"),
            ])
            .configure()
            .unwrap();

        assert_eq!(settings.payment().request_payment_queue, "from-cli");
        assert_eq!(settings.payment().response_payment_queue, "from-env-resp");
    }

    #[test]
    fn publish_defaults_to_request_exchange() {
        let opts = Opts::parse_from(["payments-amqp", "publish", "--routing-key", "card", "{}"]);

        match opts.command {
            Command::Publish {
                exchange,
                routing_key,
                payload,
            } => {
                assert_eq!(exchange, "request-payment");
                assert_eq!(routing_key, "card");
                assert_eq!(payload, "{}");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
