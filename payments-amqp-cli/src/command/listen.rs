use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::opts::Opts;

pub(crate) async fn start(
    opts: Opts,
    queue: Option<String>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let infrastructure = opts.create_infrastructure().await?;
    let queue = queue.unwrap_or_else(|| infrastructure.topology.request_payment_queue.name.clone());

    let mut consumer = infrastructure.receiver.consume_auto_ack(&queue).await?;
    info!("listening on '{queue}', press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            delivery = consumer.next() => match delivery {
                Some(Ok(delivery)) => println!(
                    "[{}] {}: {}",
                    delivery.exchange,
                    delivery.routing_key,
                    String::from_utf8_lossy(&delivery.payload)
                ),
                Some(Err(e)) => warn!("{e}"),
                None => {
                    warn!("consumer of '{queue}' was cancelled by the broker");
                    break;
                }
            }
        }
    }

    drop(consumer);
    infrastructure.shutdown().await?;
    Ok(())
}
