use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{BrokerConnection, ConnectionFactory, ConnectionParameters, FactoryError};

/// A [`ConnectionFactory`] that opens a single connection through an underlying factory and
/// shares it with every caller while it stays open.
///
/// A cached connection that has been closed is replaced by a new one on the next call to
/// [`ConnectionFactory::create_connection`]. No retry or backoff is attempted when opening a
/// connection fails.
pub struct CachingConnectionFactory<F: ConnectionFactory> {
    /// Factory used to open the shared connection
    inner: F,

    /// The shared connection, if any
    cached: Arc<Mutex<Option<Arc<F::Connection>>>>,
}

impl<F: ConnectionFactory> CachingConnectionFactory<F> {
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// The factory used to open the shared connection
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Returns `true` if a connection is cached and still open
    pub async fn is_connected(&self) -> bool {
        self.cached
            .lock()
            .await
            .as_ref()
            .map(|c| c.is_open())
            .unwrap_or(false)
    }

    /// Forget the cached connection without closing it
    pub async fn reset(&self) {
        self.cached.lock().await.take();
    }

    /// Close and forget the cached connection
    pub async fn close(&self) -> Result<(), FactoryError<F>> {
        let connection = self.cached.lock().await.take();
        match connection {
            Some(connection) if connection.is_open() => {
                info!("closing connection to {}", self.inner.parameters());
                connection.close().await
            }
            _ => Ok(()),
        }
    }
}

impl<F> Clone for CachingConnectionFactory<F>
where
    F: ConnectionFactory + Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cached: Arc::clone(&self.cached),
        }
    }
}

#[async_trait]
impl<F> ConnectionFactory for CachingConnectionFactory<F>
where
    F: ConnectionFactory,
{
    type Connection = Arc<F::Connection>;

    fn parameters(&self) -> &ConnectionParameters {
        self.inner.parameters()
    }

    async fn create_connection(&self) -> Result<Self::Connection, FactoryError<Self>> {
        let mut cached = self.cached.lock().await;

        if let Some(ref connection) = *cached {
            if connection.is_open() {
                debug!("reusing cached connection to {}", self.inner.parameters());
                return Ok(Arc::clone(connection));
            }
            info!(
                "cached connection to {} has been closed, reconnecting",
                self.inner.parameters()
            );
        }

        let connection = Arc::new(self.inner.create_connection().await?);
        info!("opened connection to {}", self.inner.parameters());

        *cached = Some(Arc::clone(&connection));
        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        memory::{MemoryBroker, MemoryConnectionFactory},
        Connector,
    };

    fn factory(broker: &MemoryBroker) -> CachingConnectionFactory<MemoryConnectionFactory> {
        let parameters = ConnectionParameters::new("localhost", 5672, "guest", "guest");
        CachingConnectionFactory::new(broker.connection_factory("test", parameters))
    }

    #[tokio::test]
    async fn opens_a_single_connection() {
        let broker = MemoryBroker::new();
        let factory = factory(&broker);

        let first = factory.create_connection().await.unwrap();
        let second = factory.clone().create_connection().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(broker.connections_opened(), 1);
        assert!(factory.is_connected().await);
    }

    #[tokio::test]
    async fn replaces_a_closed_connection() {
        let broker = MemoryBroker::new();
        let factory = factory(&broker);

        let first = factory.create_connection().await.unwrap();
        first.close().await.unwrap();
        assert!(!factory.is_connected().await);

        let second = factory.create_connection().await.unwrap();
        assert!(second.is_open());
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(broker.connections_opened(), 2);
    }

    #[tokio::test]
    async fn reset_forgets_the_connection() {
        let broker = MemoryBroker::new();
        let factory = factory(&broker);

        let first = factory.create_connection().await.unwrap();
        factory.reset().await;
        assert!(first.is_open());

        factory.create_connection().await.unwrap();
        assert_eq!(broker.connections_opened(), 2);
    }

    #[tokio::test]
    async fn close_closes_the_connection() {
        let broker = MemoryBroker::new();
        let factory = factory(&broker);

        let connection = factory.create_connection().await.unwrap();
        factory.close().await.unwrap();

        assert!(!connection.is_open());
        assert!(!factory.is_connected().await);
    }

    #[tokio::test]
    async fn exposes_inner_parameters() {
        let broker = MemoryBroker::new();
        let factory = factory(&broker);

        assert_eq!(factory.parameters().host(), "localhost");
        assert_eq!(factory.parameters().port(), 5672);
        assert_eq!(factory.parameters(), factory.inner().parameters());
    }
}
