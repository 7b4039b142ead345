use tracing::info;

use super::{PaymentInfrastructure, ADMIN_CONNECTION_NAME, REACTIVE_CONNECTION_NAME};
use crate::{
    Admin, CachingConnectionFactory, ConfigurationProvider, ConnectionParameters, Connector,
    Error, PaymentTopology, Receiver, ReceiverOptions, Result, Sender, SenderOptions, Settings,
};

pub struct Init;

pub struct Configured {
    settings: Settings,
}

pub struct ConnectorAttached<C: Connector> {
    settings: Settings,
    connector: C,
}

/// Builds a [`PaymentInfrastructure`] in three steps: configure, attach a [`Connector`],
/// create.
///
/// ```no_run
/// # async fn run() -> payments_amqp::Result<()> {
/// use payments_amqp::{
///     amqp::AmqpConnector, BrokerConfiguration, InfrastructureBuilder, PaymentConfiguration,
///     Settings,
/// };
///
/// let settings = Settings::new(
///     BrokerConfiguration::default(),
///     PaymentConfiguration::new("request-payment-queue", "response-payment-queue"),
/// );
///
/// let infrastructure = InfrastructureBuilder::new()
///     .configure(settings)
///     .with_connector(AmqpConnector)
///     .create()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct InfrastructureBuilder<Step = Init> {
    step: Step,
}

impl Default for InfrastructureBuilder<Init> {
    fn default() -> Self {
        Self::new()
    }
}

impl InfrastructureBuilder<Init> {
    pub fn new() -> Self {
        Self { step: Init }
    }

    pub fn configure(self, settings: Settings) -> InfrastructureBuilder<Configured> {
        InfrastructureBuilder::<Configured> {
            step: Configured { settings },
        }
    }

    pub fn configure_with<Provider>(
        self,
        provider: &mut Provider,
    ) -> Result<InfrastructureBuilder<Configured>>
    where
        Provider: ConfigurationProvider,
        <Provider as ConfigurationProvider>::Configuration: Into<Settings>,
    {
        let settings = provider
            .configure()
            .map_err(|e| Error::Configuration(e.into()))?
            .into();
        Ok(self.configure(settings))
    }
}

impl InfrastructureBuilder<Configured> {
    pub fn settings(&self) -> &Settings {
        &self.step.settings
    }

    pub fn with_connector<C>(self, connector: C) -> InfrastructureBuilder<ConnectorAttached<C>>
    where
        C: Connector,
    {
        InfrastructureBuilder::<ConnectorAttached<C>> {
            step: ConnectorAttached {
                settings: self.step.settings,
                connector,
            },
        }
    }
}

impl<C> InfrastructureBuilder<ConnectorAttached<C>>
where
    C: Connector,
{
    /// Create every object in order and declare the payment topology.
    /// Any failure aborts the creation
    pub async fn create(self) -> Result<PaymentInfrastructure<C::Factory>> {
        let settings = self.step.settings;
        let connector = self.step.connector;

        let parameters = ConnectionParameters::from(settings.broker());
        info!("wiring payment broker infrastructure on {parameters}");

        // Administrative connection and topology
        let connection_factory = CachingConnectionFactory::new(
            connector.connection_factory(ADMIN_CONNECTION_NAME, parameters.clone()),
        );
        let admin = Admin::new(connection_factory.clone());
        let topology = PaymentTopology::new(settings.payment());
        admin.initialize(&topology.topology()).await?;

        // Reactive sender and receiver
        let reactive_connection_factory =
            connector.connection_factory(REACTIVE_CONNECTION_NAME, parameters);
        let receiver = Receiver::new(ReceiverOptions::new(reactive_connection_factory.clone()));
        let sender = Sender::new(SenderOptions::new(reactive_connection_factory.clone()));

        Ok(PaymentInfrastructure {
            settings,
            connection_factory,
            admin,
            topology,
            reactive_connection_factory,
            receiver,
            sender,
        })
    }
}
