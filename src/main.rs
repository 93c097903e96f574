use anyhow::{Context, Result};
use tracing::{error, info, warn};

use notification_consumer::{
    health,
    processing::{DeliveryProcessor, Dispatcher},
    rabbitmq::{shutdown, subscribe, ActiveChannel, ConnectionManager, Topology},
    telemetry::init_tracing,
    Config, SimulatedNotifier, TimeoutNotifier,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    init_tracing(config.log_format);

    health::serve(config.port, &config.service_name)
        .await
        .with_context(|| format!("Failed to bind health check server on port {}", config.port))?;

    let manager =
        ConnectionManager::new(&config.rabbit_url).with_retry_policy(config.retry_policy());
    let session = manager
        .connect()
        .await
        .context("Failed to start notification service")?;

    let consumed = consume_until_shutdown(&session, manager.topology(), &config).await;

    // Released on every path, including a failed subscription.
    if let Err(e) = shutdown(session).await {
        warn!(error = %e, "RabbitMQ session did not close cleanly");
    }

    consumed
}

async fn consume_until_shutdown(
    session: &ActiveChannel,
    topology: &Topology,
    config: &Config,
) -> Result<()> {
    let deliveries = subscribe(session, topology, &config.channel_config())
        .await
        .context("Failed to start consuming")?;

    let notifier = TimeoutNotifier::new(SimulatedNotifier::default(), config.notify_timeout());
    let dispatcher = Dispatcher::new(
        DeliveryProcessor::new(notifier, &config.service_name),
        usize::from(config.prefetch_count),
    );

    tokio::select! {
        dispatched = dispatcher.run(deliveries) => {
            warn!(dispatched, "Consumer stream closed, shutting down");
        }
        signal = shutdown_signal() => {
            info!("{} received, shutting down gracefully", signal);
        }
    }

    Ok(())
}

async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        signal = interrupt => signal,
        signal = terminate => signal,
    }
}
