use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures_core::Stream;
use pin_project::pin_project;
use tracing::info;

use crate::{
    connection::{
        BrokerConnection, CachingConnectionFactory, ConnectionFactory, Delivery, DeliveryStream,
    },
    Error, Result,
};

/// Prefix of the consumer tags generated by a [`Receiver`]
pub const DEFAULT_CONSUMER_TAG_PREFIX: &str = "payments";

/// Options used to create a [`Receiver`]
#[derive(Clone)]
pub struct ReceiverOptions<F> {
    connection_factory: F,
    consumer_tag_prefix: String,
}

impl<F: ConnectionFactory> ReceiverOptions<F> {
    pub fn new(connection_factory: F) -> Self {
        Self {
            connection_factory,
            consumer_tag_prefix: DEFAULT_CONSUMER_TAG_PREFIX.to_string(),
        }
    }

    /// Update the options with the prefix of the generated consumer tags
    pub fn with_consumer_tag_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.consumer_tag_prefix = prefix.into();
        self
    }

    pub fn connection_factory(&self) -> &F {
        &self.connection_factory
    }
}

/// Consumes queues as [`Stream`] of [`Delivery`].
///
/// Every consumer of a receiver shares one connection, opened on first use.
pub struct Receiver<F: ConnectionFactory> {
    factory: CachingConnectionFactory<F>,
    consumer_tag_prefix: String,
}

impl<F: ConnectionFactory> Receiver<F> {
    pub fn new(options: ReceiverOptions<F>) -> Self {
        Self {
            factory: CachingConnectionFactory::new(options.connection_factory),
            consumer_tag_prefix: options.consumer_tag_prefix,
        }
    }

    /// The factory the receiver opens its connection with
    pub fn connection_factory(&self) -> &F {
        self.factory.inner()
    }

    /// Start consuming `queue`.
    ///
    /// Messages are acknowledged by the broker as soon as they are delivered. Dropping the
    /// returned stream stops consuming.
    pub async fn consume_auto_ack(&self, queue: &str) -> Result<Consumer<Arc<F::Connection>>> {
        let factory = &self.factory;
        let connection = factory
            .create_connection()
            .await
            .map_err(|e| Error::Connection {
                endpoint: factory.parameters().endpoint(),
                source: e.into(),
            })?;

        let consumer_tag = format!("{}-{}", self.consumer_tag_prefix, uuid::Uuid::new_v4());
        let deliveries = connection
            .consume(queue, &consumer_tag)
            .await
            .map_err(|e| Error::Consume {
                queue: queue.to_string(),
                source: e.into(),
            })?;

        info!("consuming queue '{queue}' as '{consumer_tag}'");
        Ok(Consumer {
            deliveries,
            queue: queue.to_string(),
            consumer_tag,
            _connection: connection,
        })
    }

    /// Close the shared connection. A later consume opens a new one
    pub async fn close(&self) -> Result<()> {
        self.factory
            .close()
            .await
            .map_err(|e| Error::Close(e.into()))
    }
}

/// Stream of the deliveries of a queue returned by [`Receiver::consume_auto_ack`]
#[pin_project]
pub struct Consumer<C: BrokerConnection> {
    #[pin]
    deliveries: DeliveryStream<C::Err>,

    /// Name of the consumed queue
    queue: String,

    consumer_tag: String,

    /// Connection the deliveries are received on, kept open as long as the stream lives
    _connection: C,
}

impl<C: BrokerConnection> Consumer<C> {
    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }
}

impl<C: BrokerConnection> Stream for Consumer<C> {
    type Item = Result<Delivery>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        match this.deliveries.poll_next(cx) {
            Poll::Ready(Some(Ok(delivery))) => Poll::Ready(Some(Ok(delivery))),
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(Error::Consume {
                queue: this.queue.clone(),
                source: e.into(),
            }))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemoryBroker, MemoryConnectionFactory},
        Admin, ConnectionParameters, Connector, OutboundMessage, PaymentConfiguration,
        PaymentTopology, Sender, SenderOptions,
    };
    use futures_util::StreamExt;

    async fn setup() -> (MemoryBroker, MemoryConnectionFactory) {
        let broker = MemoryBroker::new();
        let factory = broker.connection_factory(
            "receiver",
            ConnectionParameters::new("localhost", 5672, "guest", "guest"),
        );

        let topology = PaymentTopology::new(&PaymentConfiguration::new(
            "request-payment-queue",
            "response-payment-queue",
        ));
        Admin::new(factory.clone())
            .initialize(&topology.topology())
            .await
            .unwrap();

        (broker, factory)
    }

    #[tokio::test]
    async fn receives_sent_messages() {
        let (_broker, factory) = setup().await;
        let receiver = Receiver::new(ReceiverOptions::new(factory.clone()));
        let sender = Sender::new(SenderOptions::new(factory));

        let mut consumer = receiver
            .consume_auto_ack("request-payment-queue")
            .await
            .unwrap();
        assert_eq!(consumer.queue(), "request-payment-queue");

        sender
            .send(&OutboundMessage::new("request-payment", "card", r#"{"amount":42}"#))
            .await
            .unwrap();

        let delivery = consumer.next().await.unwrap().unwrap();
        assert_eq!(delivery.routing_key, "card");
        assert_eq!(delivery.payload, br#"{"amount":42}"#);
    }

    #[tokio::test]
    async fn consumer_tags_are_unique_and_prefixed() {
        let (_broker, factory) = setup().await;
        let receiver =
            Receiver::new(ReceiverOptions::new(factory).with_consumer_tag_prefix("airline"));

        let first = receiver.consume_auto_ack("request-payment-queue").await.unwrap();
        let second = receiver.consume_auto_ack("request-payment-queue").await.unwrap();

        assert!(first.consumer_tag().starts_with("airline-"));
        assert_ne!(first.consumer_tag(), second.consumer_tag());
    }

    #[tokio::test]
    async fn consumers_share_one_connection() {
        let (broker, factory) = setup().await;
        let opened = broker.connections_opened();
        let receiver = Receiver::new(ReceiverOptions::new(factory));

        let _request = receiver.consume_auto_ack("request-payment-queue").await.unwrap();
        let _response = receiver.consume_auto_ack("response-payment-queue").await.unwrap();

        assert_eq!(broker.connections_opened(), opened + 1);
    }

    #[tokio::test]
    async fn close_then_consume_reconnects() {
        let (broker, factory) = setup().await;
        let opened = broker.connections_opened();
        let receiver = Receiver::new(ReceiverOptions::new(factory));

        let _first = receiver.consume_auto_ack("request-payment-queue").await.unwrap();
        receiver.close().await.unwrap();
        let _second = receiver.consume_auto_ack("request-payment-queue").await.unwrap();

        assert_eq!(broker.connections_opened(), opened + 2);
    }

    #[tokio::test]
    async fn consuming_unknown_queue_fails() {
        let (_broker, factory) = setup().await;
        let receiver = Receiver::new(ReceiverOptions::new(factory));

        let error = receiver.consume_auto_ack("unknown").await.err().unwrap();
        assert!(matches!(error, Error::Consume { ref queue, .. } if queue == "unknown"));
    }
}
