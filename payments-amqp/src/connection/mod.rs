//! Connections to the message broker
//!
//! A [`ConnectionFactory`] opens [`BrokerConnection`] handles from a set of
//! [`ConnectionParameters`]. Two families of factories exist:
//!
//! - protocol-native factories, like [`crate::amqp::AmqpConnectionFactory`], that open a new
//!   connection every time they are asked to
//! - the [`CachingConnectionFactory`] that wraps any factory and hands out a single shared
//!   connection while it stays open
mod caching;
mod parameters;

use std::sync::Arc;

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use payments_amqp_core::{BindingDescriptor, ExchangeDescriptor, QueueDescriptor};

pub use caching::CachingConnectionFactory;
pub use parameters::ConnectionParameters;

/// Stream of [`Delivery`] returned by [`BrokerConnection::consume`]
pub type DeliveryStream<E> = BoxStream<'static, Result<Delivery, E>>;

/// Error type of the connections opened by a [`ConnectionFactory`]
pub type FactoryError<F> = <<F as ConnectionFactory>::Connection as BrokerConnection>::Err;

/// A message received from a queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Exchange the message was published to
    pub exchange: String,

    /// Routing key the message was published with
    pub routing_key: String,

    /// Raw message body
    pub payload: Vec<u8>,

    /// Broker assigned tag, unique per channel
    pub delivery_tag: u64,

    /// `true` if the message has already been delivered once
    pub redelivered: bool,
}

/// An open connection to a broker, able to declare topology, publish and consume
#[async_trait]
pub trait BrokerConnection: Send + Sync + 'static {
    /// The associated error type which can be returned from the connection
    type Err: std::error::Error + Send + Sync + 'static;

    /// Returns `true` while the connection can still be used
    fn is_open(&self) -> bool;

    /// Declare an exchange. Declaring an identical exchange again is a no-op
    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<(), Self::Err>;

    /// Declare a queue. Declaring an identical queue again is a no-op
    async fn declare_queue(&self, queue: &QueueDescriptor) -> Result<(), Self::Err>;

    /// Bind a queue to an exchange. Declaring an identical binding again is a no-op
    async fn declare_binding(&self, binding: &BindingDescriptor) -> Result<(), Self::Err>;

    /// Publish `payload` to `exchange` with `routing_key`
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<(), Self::Err>;

    /// Start consuming `queue`. Messages are acknowledged as soon as they are delivered
    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream<Self::Err>, Self::Err>;

    /// Close the connection
    async fn close(&self) -> Result<(), Self::Err>;
}

#[async_trait]
impl<C> BrokerConnection for Arc<C>
where
    C: BrokerConnection,
{
    type Err = C::Err;

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<(), Self::Err> {
        (**self).declare_exchange(exchange).await
    }

    async fn declare_queue(&self, queue: &QueueDescriptor) -> Result<(), Self::Err> {
        (**self).declare_queue(queue).await
    }

    async fn declare_binding(&self, binding: &BindingDescriptor) -> Result<(), Self::Err> {
        (**self).declare_binding(binding).await
    }

    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
    ) -> Result<(), Self::Err> {
        (**self).publish(exchange, routing_key, payload).await
    }

    async fn consume(
        &self,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<DeliveryStream<Self::Err>, Self::Err> {
        (**self).consume(queue, consumer_tag).await
    }

    async fn close(&self) -> Result<(), Self::Err> {
        (**self).close().await
    }
}

/// Creates [`BrokerConnection`] connections to a broker
#[async_trait]
pub trait ConnectionFactory: Send + Sync + 'static {
    /// Type of connection opened by this factory
    type Connection: BrokerConnection;

    /// The parameters used to open connections
    fn parameters(&self) -> &ConnectionParameters;

    /// Get a connection to the broker
    async fn create_connection(&self) -> Result<Self::Connection, FactoryError<Self>>;
}

/// Creates protocol-native [`ConnectionFactory`] factories from [`ConnectionParameters`]
pub trait Connector {
    /// Type of factory created
    type Factory: ConnectionFactory + Clone;

    /// Create a factory named `name` that opens connections with `parameters`
    fn connection_factory(&self, name: &str, parameters: ConnectionParameters) -> Self::Factory;
}
