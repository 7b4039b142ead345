use std::fmt;

use crate::BindingKey;

/// Name of the pre-declared default exchange. Messages published to it are routed to the queue
/// whose name equals the routing key
pub const DEFAULT_EXCHANGE: &str = "";

/// Routing algorithm of an exchange
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ExchangeKind {
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl ExchangeKind {
    /// The wire name of the exchange type
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Headers => "headers",
        }
    }
}

impl fmt::Display for ExchangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An exchange to declare on the broker
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ExchangeDescriptor {
    pub name: String,
    pub kind: ExchangeKind,

    /// A durable exchange survives a broker restart
    pub durable: bool,

    /// An auto-delete exchange is deleted once its last binding is removed
    pub auto_delete: bool,
}

impl ExchangeDescriptor {
    pub fn new(
        name: impl Into<String>,
        kind: ExchangeKind,
        durable: bool,
        auto_delete: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            durable,
            auto_delete,
        }
    }

    pub fn topic(name: impl Into<String>, durable: bool, auto_delete: bool) -> Self {
        Self::new(name, ExchangeKind::Topic, durable, auto_delete)
    }

    /// Returns `true` if declaring `other` on a broker where `self` exists would succeed
    pub fn is_equivalent(&self, other: &ExchangeDescriptor) -> bool {
        self == other
    }
}

impl fmt::Display for ExchangeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Exchange({}, {})", self.name, self.kind)
    }
}

/// A queue to declare on the broker
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct QueueDescriptor {
    pub name: String,

    /// A durable queue survives a broker restart
    pub durable: bool,

    /// An exclusive queue can only be used by the connection that declared it
    pub exclusive: bool,

    /// An auto-delete queue is deleted once its last consumer unsubscribes
    pub auto_delete: bool,
}

impl QueueDescriptor {
    pub fn new(name: impl Into<String>, durable: bool, exclusive: bool, auto_delete: bool) -> Self {
        Self {
            name: name.into(),
            durable,
            exclusive,
            auto_delete,
        }
    }

    /// A durable, non-exclusive, non auto-delete queue
    pub fn durable(name: impl Into<String>) -> Self {
        Self::new(name, true, false, false)
    }

    pub fn is_equivalent(&self, other: &QueueDescriptor) -> bool {
        self == other
    }
}

impl fmt::Display for QueueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Queue({})", self.name)
    }
}

/// Routing rule from an exchange to a queue
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct BindingDescriptor {
    pub queue: String,
    pub exchange: String,
    pub key: BindingKey,
}

impl BindingDescriptor {
    pub fn new(
        queue: impl Into<String>,
        exchange: impl Into<String>,
        key: impl Into<BindingKey>,
    ) -> Self {
        Self {
            queue: queue.into(),
            exchange: exchange.into(),
            key: key.into(),
        }
    }

    /// Start building a binding for `queue`
    ///
    /// ```
    /// use payments_amqp_core::{BindingDescriptor, ExchangeDescriptor, QueueDescriptor};
    ///
    /// let queue = QueueDescriptor::durable("payments");
    /// let exchange = ExchangeDescriptor::topic("request-payment", true, false);
    /// let binding = BindingDescriptor::bind(&queue).to(&exchange).with("*");
    ///
    /// assert_eq!(binding.queue, "payments");
    /// assert_eq!(binding.exchange, "request-payment");
    /// assert_eq!(binding.key.to_string(), "*");
    /// ```
    pub fn bind(queue: &QueueDescriptor) -> QueueBinding<'_> {
        QueueBinding { queue }
    }
}

impl fmt::Display for BindingDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Binding({} -> {}, {})", self.exchange, self.queue, self.key)
    }
}

/// First step of [`BindingDescriptor::bind`]
pub struct QueueBinding<'a> {
    queue: &'a QueueDescriptor,
}

impl<'a> QueueBinding<'a> {
    pub fn to(self, exchange: &'a ExchangeDescriptor) -> ExchangeBinding<'a> {
        ExchangeBinding {
            queue: self.queue,
            exchange,
        }
    }
}

/// Second step of [`BindingDescriptor::bind`]
pub struct ExchangeBinding<'a> {
    queue: &'a QueueDescriptor,
    exchange: &'a ExchangeDescriptor,
}

impl ExchangeBinding<'_> {
    pub fn with(self, key: impl Into<BindingKey>) -> BindingDescriptor {
        BindingDescriptor::new(&self.queue.name, &self.exchange.name, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding_key;

    #[test]
    fn topic_exchange() {
        let exchange = ExchangeDescriptor::topic("request-payment", true, false);
        assert_eq!(exchange.kind, ExchangeKind::Topic);
        assert_eq!(exchange.kind.to_string(), "topic");
        assert!(exchange.durable);
        assert!(!exchange.auto_delete);
    }

    #[test]
    fn durable_queue() {
        let queue = QueueDescriptor::durable("payments");
        assert_eq!(queue, QueueDescriptor::new("payments", true, false, false));
    }

    #[test]
    fn equivalence_compares_flags() {
        let exchange = ExchangeDescriptor::topic("request-payment", true, false);
        assert!(exchange.is_equivalent(&exchange.clone()));
        assert!(!exchange.is_equivalent(&ExchangeDescriptor::topic(
            "request-payment",
            false,
            false
        )));
        assert!(!exchange.is_equivalent(&ExchangeDescriptor::new(
            "request-payment",
            ExchangeKind::Direct,
            true,
            false
        )));
    }

    #[test]
    fn bind_queue_to_exchange() {
        let queue = QueueDescriptor::durable("payments");
        let exchange = ExchangeDescriptor::topic("request-payment", true, false);

        let binding = BindingDescriptor::bind(&queue).to(&exchange).with("*");
        assert_eq!(
            binding,
            BindingDescriptor::new("payments", "request-payment", binding_key![*])
        );
        assert_eq!(binding.to_string(), "Binding(request-payment -> payments, *)");
    }
}
