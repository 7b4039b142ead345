//! In-process broker
//!
//! [`MemoryBroker`] keeps exchanges, queues and bindings in memory and routes published
//! messages the way an AMQP broker does. It is used to exercise the wiring without a running
//! broker.
mod tree;

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use payments_amqp_core::{
    BindingDescriptor, ExchangeDescriptor, ExchangeKind, QueueDescriptor, DEFAULT_EXCHANGE,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::connection::{
    BrokerConnection, ConnectionFactory, ConnectionParameters, Connector, Delivery,
    DeliveryStream,
};

use tree::BindingTree;

/// Errors returned by the [`MemoryBroker`]
#[derive(Debug, Error)]
pub enum Error {
    /// The exchange or queue does not exist
    #[error("no {kind} '{name}'")]
    NotFound { kind: &'static str, name: String },

    /// An exchange or queue already exists with different properties
    #[error("inequivalent arguments for {kind} '{name}'")]
    PreconditionFailed { kind: &'static str, name: String },

    /// The credentials were refused
    #[error("access refused for user '{0}'")]
    AccessRefused(String),

    /// The connection has been closed
    #[error("connection is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;

/// A declared exchange along with its bindings
struct MemoryExchange {
    descriptor: ExchangeDescriptor,

    /// Bindings in declaration order
    bindings: Vec<BindingDescriptor>,

    /// Index of the bindings, only used by topic exchanges
    tree: BindingTree,
}

impl MemoryExchange {
    fn new(descriptor: ExchangeDescriptor) -> Self {
        Self {
            descriptor,
            bindings: Vec::new(),
            tree: BindingTree::new(),
        }
    }

    /// Names of the queues a message published with `routing_key` is routed to
    fn route(&self, routing_key: &str) -> Vec<String> {
        match self.descriptor.kind {
            ExchangeKind::Topic => self.tree.route(routing_key),
            ExchangeKind::Direct => self
                .bindings
                .iter()
                .filter(|b| b.key.to_string() == routing_key)
                .map(|b| b.queue.clone())
                .collect(),
            ExchangeKind::Fanout | ExchangeKind::Headers => {
                let mut queues = Vec::new();
                for binding in &self.bindings {
                    if !queues.contains(&binding.queue) {
                        queues.push(binding.queue.clone());
                    }
                }
                queues
            }
        }
    }
}

/// A declared queue and its pending messages
struct MemoryQueue {
    descriptor: QueueDescriptor,
    tx: mpsc::UnboundedSender<Delivery>,

    /// Shared by every consumer of the queue, each message goes to a single consumer
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>>,

    /// Number of messages waiting to be consumed
    ready: Arc<AtomicUsize>,
}

impl MemoryQueue {
    fn new(descriptor: QueueDescriptor) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            descriptor,
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            ready: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn push(&self, delivery: Delivery) {
        // Counted before sending, a consumer decrements as soon as it receives
        self.ready.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(delivery).is_err() {
            self.ready.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Inner [`MemoryBroker`] state
#[derive(Default)]
struct MemoryBrokerInner {
    exchanges: BTreeMap<String, MemoryExchange>,
    queues: BTreeMap<String, MemoryQueue>,

    /// Accepted `(username, password)`, any credentials are accepted when `None`
    credentials: Option<(String, String)>,

    connections_opened: usize,
    next_delivery_tag: u64,
}

/// An AMQP-like broker that lives in memory
#[derive(Clone, Default)]
pub struct MemoryBroker {
    inner: Arc<Mutex<MemoryBrokerInner>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// A broker that only accepts connections authenticated with `username` and `password`
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        let broker = Self::new();
        broker.lock().credentials = Some((username.into(), password.into()));
        broker
    }

    /// Declared exchanges, sorted by name
    pub fn exchanges(&self) -> Vec<ExchangeDescriptor> {
        self.lock()
            .exchanges
            .values()
            .map(|e| e.descriptor.clone())
            .collect()
    }

    /// Declared queues, sorted by name
    pub fn queues(&self) -> Vec<QueueDescriptor> {
        self.lock()
            .queues
            .values()
            .map(|q| q.descriptor.clone())
            .collect()
    }

    /// Declared bindings, grouped by exchange
    pub fn bindings(&self) -> Vec<BindingDescriptor> {
        self.lock()
            .exchanges
            .values()
            .flat_map(|e| e.bindings.iter().cloned())
            .collect()
    }

    /// Number of connections opened since the broker was created
    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    /// Number of messages waiting in `queue`, `None` if the queue does not exist
    pub fn message_count(&self, queue: &str) -> Option<usize> {
        self.lock()
            .queues
            .get(queue)
            .map(|q| q.ready.load(Ordering::SeqCst))
    }

    fn lock(&self) -> MutexGuard<'_, MemoryBrokerInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connect(&self, parameters: &ConnectionParameters) -> Result<()> {
        let mut inner = self.lock();

        if let Some((ref username, ref password)) = inner.credentials {
            if parameters.username() != username || parameters.password() != password {
                return Err(Error::AccessRefused(parameters.username().to_string()));
            }
        }

        inner.connections_opened += 1;
        Ok(())
    }

    fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<()> {
        let mut inner = self.lock();

        match inner.exchanges.get(&exchange.name) {
            Some(existing) if existing.descriptor.is_equivalent(exchange) => Ok(()),
            Some(_) => Err(Error::PreconditionFailed {
                kind: "exchange",
                name: exchange.name.clone(),
            }),
            None => {
                debug!("declared {exchange}");
                inner
                    .exchanges
                    .insert(exchange.name.clone(), MemoryExchange::new(exchange.clone()));
                Ok(())
            }
        }
    }

    fn declare_queue(&self, queue: &QueueDescriptor) -> Result<()> {
        let mut inner = self.lock();

        match inner.queues.get(&queue.name) {
            Some(existing) if existing.descriptor.is_equivalent(queue) => Ok(()),
            Some(_) => Err(Error::PreconditionFailed {
                kind: "queue",
                name: queue.name.clone(),
            }),
            None => {
                debug!("declared {queue}");
                inner
                    .queues
                    .insert(queue.name.clone(), MemoryQueue::new(queue.clone()));
                Ok(())
            }
        }
    }

    fn declare_binding(&self, binding: &BindingDescriptor) -> Result<()> {
        let mut inner = self.lock();

        if !inner.queues.contains_key(&binding.queue) {
            return Err(Error::NotFound {
                kind: "queue",
                name: binding.queue.clone(),
            });
        }

        let exchange = inner
            .exchanges
            .get_mut(&binding.exchange)
            .ok_or_else(|| Error::NotFound {
                kind: "exchange",
                name: binding.exchange.clone(),
            })?;

        if !exchange.bindings.contains(binding) {
            debug!("declared {binding}");
            exchange.tree.add(&binding.queue, &binding.key);
            exchange.bindings.push(binding.clone());
        }

        Ok(())
    }

    /// Route a message and return the number of queues it has been delivered to
    fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<usize> {
        let mut inner = self.lock();

        let queues = if exchange == DEFAULT_EXCHANGE {
            if inner.queues.contains_key(routing_key) {
                vec![routing_key.to_string()]
            } else {
                vec![]
            }
        } else {
            inner
                .exchanges
                .get(exchange)
                .ok_or_else(|| Error::NotFound {
                    kind: "exchange",
                    name: exchange.to_string(),
                })?
                .route(routing_key)
        };

        for name in &queues {
            inner.next_delivery_tag += 1;
            let delivery = Delivery {
                exchange: exchange.to_string(),
                routing_key: routing_key.to_string(),
                payload: payload.to_vec(),
                delivery_tag: inner.next_delivery_tag,
                redelivered: false,
            };

            if let Some(queue) = inner.queues.get(name) {
                queue.push(delivery);
            }
        }

        trace!(
            "routed message from '{exchange}' with '{routing_key}' to {} queue(s)",
            queues.len()
        );
        Ok(queues.len())
    }

    fn consume(&self, queue: &str) -> Result<DeliveryStream<Error>> {
        let inner = self.lock();

        let queue = inner.queues.get(queue).ok_or_else(|| Error::NotFound {
            kind: "queue",
            name: queue.to_string(),
        })?;

        let state = (Arc::clone(&queue.rx), Arc::clone(&queue.ready));
        let deliveries = stream::unfold(state, |(rx, ready)| async move {
            let delivery = {
                let mut rx = rx.lock().await;
                rx.recv().await
            }?;

            ready.fetch_sub(1, Ordering::SeqCst);
            Some((Ok(delivery), (rx, ready)))
        });

        Ok(deliveries.boxed())
    }
}

impl Connector for MemoryBroker {
    type Factory = MemoryConnectionFactory;

    fn connection_factory(&self, name: &str, parameters: ConnectionParameters) -> Self::Factory {
        MemoryConnectionFactory {
            name: name.to_string(),
            parameters,
            broker: self.clone(),
        }
    }
}

/// A [`ConnectionFactory`] opening connections to a [`MemoryBroker`]
#[derive(Clone)]
pub struct MemoryConnectionFactory {
    name: String,
    parameters: ConnectionParameters,
    broker: MemoryBroker,
}

impl MemoryConnectionFactory {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn broker(&self) -> &MemoryBroker {
        &self.broker
    }
}

#[async_trait]
impl ConnectionFactory for MemoryConnectionFactory {
    type Connection = MemoryConnection;

    fn parameters(&self) -> &ConnectionParameters {
        &self.parameters
    }

    async fn create_connection(&self) -> Result<Self::Connection> {
        self.broker.connect(&self.parameters)?;

        Ok(MemoryConnection {
            broker: self.broker.clone(),
            open: AtomicBool::new(true),
        })
    }
}

/// A connection to a [`MemoryBroker`]
pub struct MemoryConnection {
    broker: MemoryBroker,
    open: AtomicBool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::Closed)
        }
    }
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    type Err = Error;

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn declare_exchange(&self, exchange: &ExchangeDescriptor) -> Result<()> {
        self.ensure_open()?;
        self.broker.declare_exchange(exchange)
    }

    async fn declare_queue(&self, queue: &QueueDescriptor) -> Result<()> {
        self.ensure_open()?;
        self.broker.declare_queue(queue)
    }

    async fn declare_binding(&self, binding: &BindingDescriptor) -> Result<()> {
        self.ensure_open()?;
        self.broker.declare_binding(binding)
    }

    async fn publish(&self, exchange: &str, routing_key: &str, payload: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.broker.publish(exchange, routing_key, payload)?;
        Ok(())
    }

    async fn consume(&self, queue: &str, _consumer_tag: &str) -> Result<DeliveryStream<Error>> {
        self.ensure_open()?;
        self.broker.consume(queue)
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}
