//! Configuration of the payment broker wiring
//!
//! The wiring reads the same property keys as the payment service always did:
//!
//! | Key                               | Field                                        |
//! |-----------------------------------|----------------------------------------------|
//! | `spring.rabbitmq.host`            | [`BrokerConfiguration::host`]                |
//! | `spring.rabbitmq.port`            | [`BrokerConfiguration::port`]                |
//! | `spring.rabbitmq.username`        | [`BrokerConfiguration::username`]            |
//! | `spring.rabbitmq.password`        | [`BrokerConfiguration::password`]            |
//! | `payment.request-payment-queue`   | [`PaymentConfiguration::request_payment_queue`]  |
//! | `payment.response-payment-queue`  | [`PaymentConfiguration::response_payment_queue`] |
mod settings;

pub use settings::{
    BrokerConfiguration, PaymentConfiguration, Settings, SpringSettings, DEFAULT_HOST,
    DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME,
};

#[cfg(feature = "config-provider")]
mod default;
#[cfg(feature = "config-provider")]
pub use default::{DefaultConfigurationProvider, DEFAULT_ENVIRONMENT_PREFIX};

use crate::BoxError;

/// A source of [`Settings`], or of any other configuration type
pub trait ConfigurationProvider {
    /// The configuration produced
    type Configuration;

    /// Error raised when the configuration can not be produced
    type Error: Into<BoxError>;

    /// Load the configuration from the underlying sources
    fn configure(&mut self) -> Result<Self::Configuration, Self::Error>;
}
