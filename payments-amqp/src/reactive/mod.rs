//! Stream based sender and receiver
//!
//! The [`Sender`] and [`Receiver`] are built from options carrying a protocol-native
//! [`ConnectionFactory`](crate::ConnectionFactory). They add no backpressure, retry or
//! cancellation policy of their own: dropping a consumption stream stops consuming.
mod receiver;
mod sender;

pub use receiver::{Consumer, Receiver, ReceiverOptions, DEFAULT_CONSUMER_TAG_PREFIX};
pub use sender::{Sender, SenderOptions};

/// A message to publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub exchange: String,
    pub routing_key: String,
    pub payload: Vec<u8>,
}

impl OutboundMessage {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            payload: payload.into(),
        }
    }
}
