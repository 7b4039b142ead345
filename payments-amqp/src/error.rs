use std::fmt;

use thiserror::Error;

use crate::BoxError;

/// Kind of topology object that failed to be declared
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeclarableKind {
    Exchange,
    Queue,
    Binding,
}

impl fmt::Display for DeclarableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarableKind::Exchange => write!(f, "exchange"),
            DeclarableKind::Queue => write!(f, "queue"),
            DeclarableKind::Binding => write!(f, "binding"),
        }
    }
}

/// Errors raised while wiring or using the payment broker infrastructure
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration could not be loaded
    #[error("configuration error: {0}")]
    Configuration(#[source] BoxError),

    /// A connection to the broker could not be opened
    #[error("unable to connect to {endpoint}: {source}")]
    Connection {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    /// A topology object was refused by the broker
    #[error("failed to declare {kind} '{name}': {source}")]
    Declaration {
        kind: DeclarableKind,
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to publish to '{exchange}' with routing key '{routing_key}': {source}")]
    Publish {
        exchange: String,
        routing_key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to consume from '{queue}': {source}")]
    Consume {
        queue: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to close connection: {0}")]
    Close(#[source] BoxError),
}

pub type Result<T> = std::result::Result<T, Error>;
