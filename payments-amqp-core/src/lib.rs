//! Broker-independent descriptions of AMQP topology objects
//!
//! Exchanges, queues and bindings are plain values here. Declaring them against a broker is the
//! job of the `payments-amqp` crate.
mod binding_key;
mod descriptor;

pub use binding_key::{routing_words, BindingKey, BindingKeyFragment};
pub use descriptor::{
    BindingDescriptor, ExchangeBinding, ExchangeDescriptor, ExchangeKind, QueueBinding,
    QueueDescriptor, DEFAULT_EXCHANGE,
};

#[macro_export]
macro_rules! fragment {
    (*) => {
        $crate::BindingKeyFragment::Star
    };

    (#) => {
        $crate::BindingKeyFragment::Sharp
    };

    ($lit:literal) => {
        $crate::BindingKeyFragment::Value($lit.to_string())
    };
}

#[macro_export]
macro_rules! binding_key {
    () => {
        $crate::BindingKey::default()
    };

    ($($x:tt),*) => {
        $crate::BindingKey {
            fragments: vec![$($crate::fragment![$x]),+]
        }
    };
}
