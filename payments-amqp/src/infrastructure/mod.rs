//! Assembly of the payment broker infrastructure
mod builder;

pub use builder::{Configured, ConnectorAttached, Init, InfrastructureBuilder};

use tracing::info;

use crate::{
    Admin, CachingConnectionFactory, ConnectionFactory, Error, PaymentTopology, Receiver, Result,
    Sender, Settings,
};

/// Name of the connections opened to declare topology
pub const ADMIN_CONNECTION_NAME: &str = "payments-admin";

/// Name of the connections opened by the sender and the receiver
pub const REACTIVE_CONNECTION_NAME: &str = "payments-reactive";

/// Every broker object the payment service depends on, created by the
/// [`InfrastructureBuilder`].
///
/// The two connection factories are configured with the same parameters:
/// `connection_factory` caches a single connection and is used by the `admin`, while
/// `reactive_connection_factory` is the protocol-native factory shared by the `sender` and the
/// `receiver`.
pub struct PaymentInfrastructure<F: ConnectionFactory + Clone> {
    pub settings: Settings,
    pub connection_factory: CachingConnectionFactory<F>,
    pub admin: Admin<CachingConnectionFactory<F>>,
    pub topology: PaymentTopology,
    pub reactive_connection_factory: F,
    pub receiver: Receiver<F>,
    pub sender: Sender<F>,
}

impl<F: ConnectionFactory + Clone> PaymentInfrastructure<F> {
    /// Declare the payment topology again. This is a no-op on an up-to-date broker
    pub async fn redeclare(&self) -> Result<()> {
        self.admin.initialize(&self.topology.topology()).await
    }

    /// Close the connections held by the sender, the receiver and the administrative factory
    pub async fn shutdown(&self) -> Result<()> {
        info!("shutting down payment broker infrastructure");

        self.sender.close().await?;
        self.receiver.close().await?;
        self.connection_factory
            .close()
            .await
            .map_err(|e| Error::Close(e.into()))
    }
}
