//! Exchanges, queues and bindings of the payment service
use payments_amqp_core::{BindingDescriptor, ExchangeDescriptor, QueueDescriptor};

use crate::PaymentConfiguration;

/// Topic exchange receiving payment requests
pub const REQUEST_PAYMENT_EXCHANGE: &str = "request-payment";

/// Topic exchange receiving payment responses
pub const RESPONSE_PAYMENT_EXCHANGE: &str = "response-payment";

/// Binding key of the payment queues: any single-word routing key
pub const PAYMENT_ROUTING_KEY: &str = "*";

/// A set of objects to declare on a broker.
///
/// Objects are identified by name (exchanges and queues) or by their
/// `(queue, exchange, key)` triple (bindings): adding an object that is already part of the
/// topology has no effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Topology {
    exchanges: Vec<ExchangeDescriptor>,
    queues: Vec<QueueDescriptor>,
    bindings: Vec<BindingDescriptor>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an exchange. Returns `false` if an exchange with the same name is already present
    pub fn add_exchange(&mut self, exchange: ExchangeDescriptor) -> bool {
        if self.exchanges.iter().any(|e| e.name == exchange.name) {
            return false;
        }
        self.exchanges.push(exchange);
        true
    }

    /// Add a queue. Returns `false` if a queue with the same name is already present
    pub fn add_queue(&mut self, queue: QueueDescriptor) -> bool {
        if self.queues.iter().any(|q| q.name == queue.name) {
            return false;
        }
        self.queues.push(queue);
        true
    }

    /// Add a binding. Returns `false` if the same binding is already present
    pub fn add_binding(&mut self, binding: BindingDescriptor) -> bool {
        if self.bindings.contains(&binding) {
            return false;
        }
        self.bindings.push(binding);
        true
    }

    pub fn with_exchange(mut self, exchange: ExchangeDescriptor) -> Self {
        self.add_exchange(exchange);
        self
    }

    pub fn with_queue(mut self, queue: QueueDescriptor) -> Self {
        self.add_queue(queue);
        self
    }

    pub fn with_binding(mut self, binding: BindingDescriptor) -> Self {
        self.add_binding(binding);
        self
    }

    pub fn exchanges(&self) -> &[ExchangeDescriptor] {
        &self.exchanges
    }

    pub fn queues(&self) -> &[QueueDescriptor] {
        &self.queues
    }

    pub fn bindings(&self) -> &[BindingDescriptor] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty() && self.queues.is_empty() && self.bindings.is_empty()
    }
}

/// The topology of the payment service.
///
/// Each payment queue is bound to its topic exchange with [`PAYMENT_ROUTING_KEY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentTopology {
    pub request_payment_exchange: ExchangeDescriptor,
    pub response_payment_exchange: ExchangeDescriptor,
    pub request_payment_queue: QueueDescriptor,
    pub response_payment_queue: QueueDescriptor,
    pub request_payment_binding: BindingDescriptor,
    pub response_payment_binding: BindingDescriptor,
}

impl PaymentTopology {
    pub fn new(configuration: &PaymentConfiguration) -> Self {
        let request_payment_exchange =
            ExchangeDescriptor::topic(REQUEST_PAYMENT_EXCHANGE, true, false);
        let response_payment_exchange =
            ExchangeDescriptor::topic(RESPONSE_PAYMENT_EXCHANGE, true, false);

        let request_payment_queue =
            QueueDescriptor::new(&configuration.request_payment_queue, true, false, false);
        let response_payment_queue =
            QueueDescriptor::new(&configuration.response_payment_queue, true, false, false);

        let request_payment_binding = BindingDescriptor::bind(&request_payment_queue)
            .to(&request_payment_exchange)
            .with(PAYMENT_ROUTING_KEY);
        let response_payment_binding = BindingDescriptor::bind(&response_payment_queue)
            .to(&response_payment_exchange)
            .with(PAYMENT_ROUTING_KEY);

        Self {
            request_payment_exchange,
            response_payment_exchange,
            request_payment_queue,
            response_payment_queue,
            request_payment_binding,
            response_payment_binding,
        }
    }

    /// Every object of the payment topology, in declaration order
    pub fn topology(&self) -> Topology {
        Topology::new()
            .with_exchange(self.request_payment_exchange.clone())
            .with_exchange(self.response_payment_exchange.clone())
            .with_queue(self.request_payment_queue.clone())
            .with_queue(self.response_payment_queue.clone())
            .with_binding(self.request_payment_binding.clone())
            .with_binding(self.response_payment_binding.clone())
    }
}

impl From<&PaymentTopology> for Topology {
    fn from(payment: &PaymentTopology) -> Self {
        payment.topology()
    }
}
