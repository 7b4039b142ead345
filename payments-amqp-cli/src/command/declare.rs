use tracing::info;

use crate::opts::Opts;

pub(crate) async fn start(opts: Opts) -> anyhow::Result<()> {
    let infrastructure = opts.create_infrastructure().await?;

    let topology = &infrastructure.topology;
    for exchange in [&topology.request_payment_exchange, &topology.response_payment_exchange] {
        info!("declared {exchange}");
    }
    for queue in [&topology.request_payment_queue, &topology.response_payment_queue] {
        info!("declared {queue}");
    }
    for binding in [&topology.request_payment_binding, &topology.response_payment_binding] {
        info!("declared {binding}");
    }

    infrastructure.shutdown().await?;
    Ok(())
}
