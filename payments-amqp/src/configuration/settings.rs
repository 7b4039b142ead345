use std::fmt;

/// Default broker host
pub const DEFAULT_HOST: &str = "localhost";

/// Default AMQP port
pub const DEFAULT_PORT: u16 = 5672;

/// Default broker user
pub const DEFAULT_USERNAME: &str = "guest";

/// Default broker password
pub const DEFAULT_PASSWORD: &str = "guest";

/// Broker connection parameters, read from `spring.rabbitmq.*`
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-provider", derive(serde::Deserialize))]
pub struct BrokerConfiguration {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl BrokerConfiguration {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }
}

impl Default for BrokerConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

impl fmt::Debug for BrokerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerConfiguration")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Names of the payment queues, read from `payment.*`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-provider", derive(serde::Deserialize))]
#[cfg_attr(feature = "config-provider", serde(rename_all = "kebab-case"))]
pub struct PaymentConfiguration {
    /// Queue receiving payment requests
    pub request_payment_queue: String,

    /// Queue receiving payment responses
    pub response_payment_queue: String,
}

impl PaymentConfiguration {
    pub fn new(
        request_payment_queue: impl Into<String>,
        response_payment_queue: impl Into<String>,
    ) -> Self {
        Self {
            request_payment_queue: request_payment_queue.into(),
            response_payment_queue: response_payment_queue.into(),
        }
    }
}

/// The `spring` section of the configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "config-provider", derive(serde::Deserialize))]
pub struct SpringSettings {
    pub rabbitmq: BrokerConfiguration,
}

/// Every configuration value the payment broker wiring depends on
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config-provider", derive(serde::Deserialize))]
pub struct Settings {
    pub spring: SpringSettings,
    pub payment: PaymentConfiguration,
}

impl Settings {
    pub fn new(broker: BrokerConfiguration, payment: PaymentConfiguration) -> Self {
        Self {
            spring: SpringSettings { rabbitmq: broker },
            payment,
        }
    }

    /// The broker connection parameters
    pub fn broker(&self) -> &BrokerConfiguration {
        &self.spring.rabbitmq
    }

    /// The payment queue names
    pub fn payment(&self) -> &PaymentConfiguration {
        &self.payment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_broker_configuration() {
        let broker = BrokerConfiguration::default();
        assert_eq!(broker.host, "localhost");
        assert_eq!(broker.port, 5672);
        assert_eq!(broker.username, "guest");
        assert_eq!(broker.password, "guest");
    }

    #[test]
    fn debug_redacts_password() {
        let broker = BrokerConfiguration::new("rabbit", 5672, "payments", "s3cr3t");
        let debug = format!("{broker:?}");
        assert!(debug.contains("rabbit"));
        assert!(!debug.contains("s3cr3t"));
    }

    #[test]
    fn settings_accessors() {
        let settings = Settings::new(
            BrokerConfiguration::default(),
            PaymentConfiguration::new("request-payment-queue", "response-payment-queue"),
        );
        assert_eq!(settings.broker(), &BrokerConfiguration::default());
        assert_eq!(
            settings.payment().request_payment_queue,
            "request-payment-queue"
        );
    }
}
