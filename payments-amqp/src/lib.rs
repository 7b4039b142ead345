//! Broker wiring for the payment service
//!
//! This crate turns a [`Settings`] configuration into the set of objects the payment service
//! needs to talk to its AMQP broker:
//!
//! - a [`CachingConnectionFactory`] and an [`Admin`] client that declares the
//!   [`PaymentTopology`] (two topic exchanges, two queues and their bindings)
//! - a second, protocol-native [`ConnectionFactory`] shared by a reactive [`Sender`] and
//!   [`Receiver`]
//!
//! Everything is assembled in order by the [`InfrastructureBuilder`].
pub mod admin;
pub mod amqp;
pub mod configuration;
pub mod connection;
mod error;
pub mod infrastructure;
pub mod memory;
pub mod reactive;
pub mod topology;

pub use admin::Admin;
pub use configuration::{
    BrokerConfiguration, ConfigurationProvider, PaymentConfiguration, Settings, SpringSettings,
};
pub use connection::{
    BrokerConnection, CachingConnectionFactory, ConnectionFactory, ConnectionParameters,
    Connector, Delivery,
};
pub use error::{DeclarableKind, Error, Result};
pub use infrastructure::{InfrastructureBuilder, PaymentInfrastructure};
pub use reactive::{OutboundMessage, Receiver, ReceiverOptions, Sender, SenderOptions};
pub use topology::{PaymentTopology, Topology};

pub use payments_amqp_core::{
    binding_key, fragment, BindingDescriptor, BindingKey, BindingKeyFragment, ExchangeDescriptor,
    ExchangeKind, QueueDescriptor,
};

/// Type-erased error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
