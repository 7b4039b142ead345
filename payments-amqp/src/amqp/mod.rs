//! AMQP 0-9-1 connections backed by [`lapin`]
mod connection;
mod factory;

pub use connection::AmqpConnection;
pub use factory::{AmqpConnectionFactory, AmqpConnector};

use thiserror::Error;

/// Associated Error type with the AMQP client
#[derive(Debug, Error)]
pub enum Error {
    /// Error reported by the client or the broker
    #[error("amqp error {0}")]
    Client(#[from] lapin::Error),

    /// An operation was attempted on a closed connection
    #[error("connection is closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, Error>;
