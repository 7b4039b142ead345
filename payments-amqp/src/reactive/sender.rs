use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use tracing::debug;

use super::OutboundMessage;
use crate::{
    connection::{BrokerConnection, CachingConnectionFactory, ConnectionFactory},
    Error, Result,
};

/// Options used to create a [`Sender`]
#[derive(Clone)]
pub struct SenderOptions<F> {
    connection_factory: F,
}

impl<F: ConnectionFactory> SenderOptions<F> {
    pub fn new(connection_factory: F) -> Self {
        Self { connection_factory }
    }

    pub fn connection_factory(&self) -> &F {
        &self.connection_factory
    }
}

/// Publishes [`OutboundMessage`] messages.
///
/// The sender opens its connection on first use and keeps it for the following sends.
pub struct Sender<F: ConnectionFactory> {
    factory: CachingConnectionFactory<F>,
}

impl<F: ConnectionFactory> Sender<F> {
    pub fn new(options: SenderOptions<F>) -> Self {
        Self {
            factory: CachingConnectionFactory::new(options.connection_factory),
        }
    }

    /// The factory the sender opens its connection with
    pub fn connection_factory(&self) -> &F {
        self.factory.inner()
    }

    /// Publish one message
    pub async fn send(&self, message: &OutboundMessage) -> Result<()> {
        let connection = self
            .factory
            .create_connection()
            .await
            .map_err(|e| Error::Connection {
                endpoint: self.factory.parameters().endpoint(),
                source: e.into(),
            })?;

        connection
            .publish(&message.exchange, &message.routing_key, &message.payload)
            .await
            .map_err(|e| Error::Publish {
                exchange: message.exchange.clone(),
                routing_key: message.routing_key.clone(),
                source: e.into(),
            })?;

        debug!(
            "sent message to '{}' with '{}'",
            message.exchange, message.routing_key
        );
        Ok(())
    }

    /// Publish every message of `messages` in order, stopping at the first failure.
    /// Returns the number of messages published
    pub async fn send_all<S>(&self, messages: S) -> Result<usize>
    where
        S: Stream<Item = OutboundMessage>,
    {
        pin_mut!(messages);

        let mut sent = 0;
        while let Some(message) = messages.next().await {
            self.send(&message).await?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Close the connection of the sender. A later send opens a new one
    pub async fn close(&self) -> Result<()> {
        self.factory
            .close()
            .await
            .map_err(|e| Error::Close(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemoryBroker, MemoryConnectionFactory},
        ConnectionParameters, Connector, PaymentConfiguration, PaymentTopology,
    };
    use futures_util::stream;

    async fn setup() -> (MemoryBroker, Sender<MemoryConnectionFactory>) {
        let broker = MemoryBroker::new();
        let factory = broker.connection_factory(
            "sender",
            ConnectionParameters::new("localhost", 5672, "guest", "guest"),
        );

        let topology = PaymentTopology::new(&PaymentConfiguration::new(
            "request-payment-queue",
            "response-payment-queue",
        ));
        crate::Admin::new(factory.clone())
            .initialize(&topology.topology())
            .await
            .unwrap();

        (broker, Sender::new(SenderOptions::new(factory)))
    }

    #[tokio::test]
    async fn send_routes_to_bound_queue() {
        let (broker, sender) = setup().await;

        sender
            .send(&OutboundMessage::new("request-payment", "card", "{}"))
            .await
            .unwrap();

        assert_eq!(broker.message_count("request-payment-queue"), Some(1));
        assert_eq!(broker.message_count("response-payment-queue"), Some(0));
    }

    #[tokio::test]
    async fn send_all_reuses_one_connection() {
        let (broker, sender) = setup().await;
        let opened = broker.connections_opened();

        let messages = stream::iter(vec![
            OutboundMessage::new("request-payment", "card", "1"),
            OutboundMessage::new("response-payment", "card", "2"),
            OutboundMessage::new("response-payment", "transfer", "3"),
        ]);
        let sent = sender.send_all(messages).await.unwrap();

        assert_eq!(sent, 3);
        assert_eq!(broker.connections_opened(), opened + 1);
        assert_eq!(broker.message_count("request-payment-queue"), Some(1));
        assert_eq!(broker.message_count("response-payment-queue"), Some(2));
    }

    #[tokio::test]
    async fn send_to_unknown_exchange_fails() {
        let (_broker, sender) = setup().await;

        let error = sender
            .send(&OutboundMessage::new("unknown", "card", "{}"))
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Publish { ref exchange, .. } if exchange == "unknown"));
    }

    #[tokio::test]
    async fn close_then_send_reconnects() {
        let (broker, sender) = setup().await;
        let message = OutboundMessage::new("request-payment", "card", "{}");
        let opened = broker.connections_opened();

        sender.send(&message).await.unwrap();
        sender.close().await.unwrap();
        sender.send(&message).await.unwrap();

        assert_eq!(broker.connections_opened(), opened + 2);
        assert_eq!(broker.message_count("request-payment-queue"), Some(2));
    }
}
