use payments_amqp::OutboundMessage;
use tracing::info;

use crate::opts::Opts;

pub(crate) async fn start(
    opts: Opts,
    exchange: String,
    routing_key: String,
    payload: String,
) -> anyhow::Result<()> {
    let infrastructure = opts.create_infrastructure().await?;

    let message = OutboundMessage::new(exchange, routing_key, payload);
    infrastructure.sender.send(&message).await?;
    info!(
        "published {} bytes to '{}' with routing key '{}'",
        message.payload.len(),
        message.exchange,
        message.routing_key
    );

    infrastructure.shutdown().await?;
    Ok(())
}
