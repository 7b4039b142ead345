//! Administrative client declaring topology on the broker
use payments_amqp_core::{BindingDescriptor, ExchangeDescriptor, QueueDescriptor};
use tracing::info;

use crate::{
    connection::{BrokerConnection, ConnectionFactory},
    DeclarableKind, Error, Result, Topology,
};

/// Declares exchanges, queues and bindings through the connections of a [`ConnectionFactory`].
///
/// Declarations are made by name: declaring an object that already exists with the same
/// properties leaves the broker untouched.
pub struct Admin<F: ConnectionFactory> {
    factory: F,
}

impl<F: ConnectionFactory> Admin<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }

    pub fn connection_factory(&self) -> &F {
        &self.factory
    }

    async fn connection(&self) -> Result<F::Connection> {
        self.factory
            .create_connection()
            .await
            .map_err(|e| Error::Connection {
                endpoint: self.factory.parameters().endpoint(),
                source: e.into(),
            })
    }

    pub async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<()> {
        self.connection()
            .await?
            .declare_exchange(exchange)
            .await
            .map_err(|e| Error::Declaration {
                kind: DeclarableKind::Exchange,
                name: exchange.name.clone(),
                source: e.into(),
            })?;

        info!("declared {} exchange '{}'", exchange.kind, exchange.name);
        Ok(())
    }

    pub async fn declare_queue(&self, queue: &QueueDescriptor) -> Result<()> {
        self.connection()
            .await?
            .declare_queue(queue)
            .await
            .map_err(|e| Error::Declaration {
                kind: DeclarableKind::Queue,
                name: queue.name.clone(),
                source: e.into(),
            })?;

        info!("declared queue '{}'", queue.name);
        Ok(())
    }

    pub async fn declare_binding(&self, binding: &BindingDescriptor) -> Result<()> {
        self.connection()
            .await?
            .declare_binding(binding)
            .await
            .map_err(|e| Error::Declaration {
                kind: DeclarableKind::Binding,
                name: format!("{} -> {}", binding.exchange, binding.queue),
                source: e.into(),
            })?;

        info!(
            "bound queue '{}' to exchange '{}' with '{}'",
            binding.queue, binding.exchange, binding.key
        );
        Ok(())
    }

    /// Declare every object of `topology`: exchanges first, then queues, then bindings
    pub async fn initialize(&self, topology: &Topology) -> Result<()> {
        for exchange in topology.exchanges() {
            self.declare_exchange(exchange).await?;
        }

        for queue in topology.queues() {
            self.declare_queue(queue).await?;
        }

        for binding in topology.bindings() {
            self.declare_binding(binding).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemoryBroker, MemoryConnectionFactory},
        CachingConnectionFactory, ConnectionParameters, Connector, PaymentConfiguration,
        PaymentTopology,
    };

    fn admin(broker: &MemoryBroker) -> Admin<CachingConnectionFactory<MemoryConnectionFactory>> {
        let parameters = ConnectionParameters::new("localhost", 5672, "guest", "guest");
        Admin::new(CachingConnectionFactory::new(
            broker.connection_factory("admin", parameters),
        ))
    }

    fn payment_topology() -> PaymentTopology {
        PaymentTopology::new(&PaymentConfiguration::new(
            "request-payment-queue",
            "response-payment-queue",
        ))
    }

    #[tokio::test]
    async fn initialize_declares_payment_topology() {
        let broker = MemoryBroker::new();
        let payment = payment_topology();

        admin(&broker).initialize(&payment.topology()).await.unwrap();

        assert_eq!(
            broker.exchanges(),
            vec![
                payment.request_payment_exchange.clone(),
                payment.response_payment_exchange.clone()
            ]
        );
        assert_eq!(
            broker.queues(),
            vec![
                payment.request_payment_queue.clone(),
                payment.response_payment_queue.clone()
            ]
        );
        assert_eq!(
            broker.bindings(),
            vec![
                payment.request_payment_binding.clone(),
                payment.response_payment_binding.clone()
            ]
        );
    }

    #[tokio::test]
    async fn initialize_twice_is_a_no_op() {
        let broker = MemoryBroker::new();
        let admin = admin(&broker);
        let topology = payment_topology().topology();

        admin.initialize(&topology).await.unwrap();
        admin.initialize(&topology).await.unwrap();

        assert_eq!(broker.exchanges().len(), 2);
        assert_eq!(broker.queues().len(), 2);
        assert_eq!(broker.bindings().len(), 2);
        assert_eq!(broker.connections_opened(), 1);
    }

    #[tokio::test]
    async fn inequivalent_exchange_is_reported() {
        let broker = MemoryBroker::new();
        let admin = admin(&broker);
        admin
            .declare_exchange(&ExchangeDescriptor::topic("request-payment", false, true))
            .await
            .unwrap();

        let error = admin
            .initialize(&payment_topology().topology())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::Declaration {
                kind: DeclarableKind::Exchange,
                ref name,
                ..
            } if name == "request-payment"
        ));
    }

    #[tokio::test]
    async fn refused_connection_is_reported() {
        let broker = MemoryBroker::with_credentials("payments", "s3cr3t");

        let error = admin(&broker)
            .initialize(&payment_topology().topology())
            .await
            .unwrap_err();

        assert!(matches!(
            error,
            Error::Connection { ref endpoint, .. } if endpoint == "localhost:5672"
        ));
        assert!(broker.exchanges().is_empty());
    }
}
