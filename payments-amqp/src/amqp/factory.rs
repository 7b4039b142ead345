use async_trait::async_trait;
use lapin::{Connection, ConnectionProperties};
use tracing::info;

use super::{AmqpConnection, Result};
use crate::connection::{ConnectionFactory, ConnectionParameters, Connector};

/// Protocol-native [`ConnectionFactory`]: every call opens a new AMQP connection
#[derive(Clone)]
pub struct AmqpConnectionFactory {
    /// Name reported to the broker for connections opened by this factory
    name: String,
    parameters: ConnectionParameters,
}

impl AmqpConnectionFactory {
    pub fn new(name: impl Into<String>, parameters: ConnectionParameters) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn properties(&self) -> ConnectionProperties {
        ConnectionProperties::default().with_connection_name(self.name.clone().into())
    }
}

#[async_trait]
impl ConnectionFactory for AmqpConnectionFactory {
    type Connection = AmqpConnection;

    fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    async fn create_connection(&self) -> Result<Self::Connection> {
        info!("[{}] connecting to {}", self.name, self.parameters);

        let connection = Connection::connect_uri(self.parameters.uri(), self.properties()).await?;
        let channel = connection.create_channel().await?;

        Ok(AmqpConnection::new(connection, channel))
    }
}

/// [`Connector`] creating [`AmqpConnectionFactory`] factories
#[derive(Debug, Clone, Copy, Default)]
pub struct AmqpConnector;

impl Connector for AmqpConnector {
    type Factory = AmqpConnectionFactory;

    fn connection_factory(&self, name: &str, parameters: ConnectionParameters) -> Self::Factory {
        AmqpConnectionFactory::new(name, parameters)
    }
}
