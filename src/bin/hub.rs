use std::sync::Arc;

use clap::Parser;
use netpulse::{
    actors::{alert::AlertHandle, scheduler::SchedulerHandle},
    config::{ProberConfig, read_config_file},
    notifier::WebhookNotifier,
    prober::{Prober, SimulatedProber, TcpProber},
    registry::DeviceRegistry,
};
use tracing::{debug, error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("netpulse", LevelFilter::TRACE),
        ("hub", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let registry = Arc::new(DeviceRegistry::new(config.monitor.history_limit));

    for seed in &config.devices {
        if let Err(e) = registry.create(&seed.address, &seed.label).await {
            error!(
                "skipping seed device {} ({}): {e}",
                seed.label, seed.address
            );
        }
    }

    let notifier = config
        .alerts
        .as_ref()
        .and_then(|alerts| alerts.webhook.clone())
        .map(WebhookNotifier::new);
    let retention_days = config.alerts.as_ref().map(|alerts| alerts.retention_days);

    let alerts = AlertHandle::spawn(registry.subscribe(), notifier, retention_days);

    let prober: Arc<dyn Prober> = match config.monitor.prober {
        ProberConfig::Simulated { loss_rate } => Arc::new(SimulatedProber::new(loss_rate)),
        ProberConfig::Tcp { port } => Arc::new(TcpProber::new(port)),
    };

    let scheduler = SchedulerHandle::spawn(registry.clone(), prober, &config.monitor);

    info!(
        "monitoring {} devices every {}s",
        registry.list().await.len(),
        config.monitor.ping_interval_secs
    );

    tokio::signal::ctrl_c().await?;

    debug!("shutting down");
    scheduler.shutdown().await?;
    alerts.shutdown().await;

    Ok(())
}
