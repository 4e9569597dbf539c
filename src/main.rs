use app_dashboard::{
    actuator::client::{ActuatorClient, TelemetryClient},
    cli::Cli,
    config::Config,
    coordination::{memory::InMemoryStore, path::instance_path, watcher::CoordinationWatcher},
    dashboard::Dashboard,
    export, logging,
    metrics::{collector::MetricsPoller, store::TimeSeriesCache},
    registry::{codec::encode_instance, store::ApplicationRegistry, types::Instance},
};
use clap::Parser;
use color_eyre::Result;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?
        .with_overrides(cli.interval, cli.export_dir.clone())?;

    logging::init(&config.log_level);

    let store = Arc::new(InMemoryStore::new());
    seed_store(&store, &config).await?;

    let registry = Arc::new(ApplicationRegistry::new());
    let cache = Arc::new(TimeSeriesCache::new(config.history_size));
    let client: Arc<dyn TelemetryClient> = Arc::new(ActuatorClient::new(config.request_timeout));

    let watcher = CoordinationWatcher::new(
        store.clone(),
        registry.clone(),
        &config.root_path,
        config.event_buffer,
    );
    let watch_handle = watcher.start().await?;

    let poller = Arc::new(MetricsPoller::new(
        registry.clone(),
        cache.clone(),
        client.clone(),
        config.poll_interval,
        config.request_timeout,
    ));
    let dashboard = Dashboard::new(
        registry,
        cache,
        client,
        &config.biz_state_base_path,
        config.request_timeout,
    );

    if cli.once {
        let report = poller.poll_once().await;
        info!(
            "Polled {} instances ({} skipped, {} fallback readings)",
            report.polled, report.skipped, report.fallback_readings
        );

        let path = export::export_snapshot_json(&dashboard, &config.export_dir())?;
        println!("Snapshot written to {}", path.display());

        watch_handle.abort();
        return Ok(());
    }

    let poll_handle = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run().await })
    };

    let mut summary = tokio::time::interval(config.poll_interval);
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = summary.tick() => log_summary(&dashboard, poller.ticks()),
        }
    }

    info!("Shutting down");
    poll_handle.abort();
    watch_handle.abort();
    Ok(())
}

async fn seed_store(store: &InMemoryStore, config: &Config) -> Result<()> {
    for seed in &config.instances {
        let instance = Instance::from(seed);
        let path = instance_path(
            &config.root_path,
            &instance.app_name,
            &instance.host_name,
            instance.port,
        );
        store.put(&path, encode_instance(&instance)?).await?;
    }
    Ok(())
}

fn log_summary(dashboard: &Dashboard, ticks: u64) {
    let applications = dashboard.list_applications();
    info!("{} applications after {} polls", applications.len(), ticks);

    for app in applications {
        info!("  {} ({} instances)", app.name, app.instance_count);
        for instance in dashboard.list_instances(&app.name) {
            let Ok(key) = Dashboard::instance_key(&instance) else {
                continue;
            };
            if let Some(latest) = dashboard.heap_series(&key).latest() {
                info!(
                    "    {} heap {}/{} threads {}",
                    instance.address(),
                    latest.used.value,
                    latest.size.value,
                    dashboard
                        .thread_series(&key)
                        .latest()
                        .map(|threads| threads.live.value)
                        .unwrap_or_default()
                );
            }
        }
    }
}
