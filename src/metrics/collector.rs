use crate::actuator::client::TelemetryClient;
use crate::actuator::types::{
    Reading, HEAP_COMMITTED, HEAP_USED, METASPACE_USED, NON_HEAP_COMMITTED, NON_HEAP_USED,
    THREADS_DAEMON, THREADS_LIVE, THREADS_PEAK,
};
use crate::address;
use crate::metrics::store::TimeSeriesCache;
use crate::metrics::types::{HeapSnapshot, NonHeapSnapshot, ThreadSnapshot};
use crate::registry::store::ApplicationRegistry;
use chrono::Local;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info, warn};

const TIME_FORMAT: &str = "%H:%M:%S";

/// What one tick did, mostly for logging and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub polled: usize,
    pub skipped: usize,
    pub fallback_readings: usize,
}

struct InstanceSample {
    key: String,
    address: String,
    threads: ThreadSnapshot,
    heap: HeapSnapshot,
    non_heap: NonHeapSnapshot,
    fallbacks: usize,
}

pub struct MetricsPoller {
    registry: Arc<ApplicationRegistry>,
    cache: Arc<TimeSeriesCache>,
    client: Arc<dyn TelemetryClient>,
    interval: Duration,
    request_timeout: Duration,
    tick_count: AtomicU64,
}

impl MetricsPoller {
    pub fn new(
        registry: Arc<ApplicationRegistry>,
        cache: Arc<TimeSeriesCache>,
        client: Arc<dyn TelemetryClient>,
        interval: Duration,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            client,
            interval,
            request_timeout,
            tick_count: AtomicU64::new(0),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    pub async fn run(&self) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    /// Polls every registered instance once and appends the results.
    ///
    /// Instances are queried concurrently and each query is bounded by the
    /// request timeout, so one slow instance cannot hold up the others or
    /// spill into the next tick. Failed readings are recorded as zero.
    pub async fn poll_once(&self) -> TickReport {
        let tick = self.tick_count.fetch_add(1, Ordering::Relaxed);
        let timestamp = Local::now().format(TIME_FORMAT).to_string();
        let applications = self.registry.list_all();

        let mut report = TickReport::default();
        let mut tasks = JoinSet::new();

        for instance in applications.values().flat_map(|instances| instances.values()) {
            let key = match address::encode(&instance.host_name, instance.port) {
                Ok(key) => key,
                Err(e) => {
                    warn!("Not polling {}: {}", instance.address(), e);
                    report.skipped += 1;
                    continue;
                }
            };

            tasks.spawn(poll_instance(
                self.client.clone(),
                key,
                instance.address(),
                self.request_timeout,
                timestamp.clone(),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(sample) => {
                    if sample.fallbacks > 0 {
                        debug!(
                            "{} of 8 readings from {} fell back to zero",
                            sample.fallbacks, sample.address
                        );
                    }
                    self.cache.record_threads(&sample.key, sample.threads);
                    self.cache.record_heap(&sample.key, sample.heap);
                    self.cache.record_non_heap(&sample.key, sample.non_heap);
                    report.polled += 1;
                    report.fallback_readings += sample.fallbacks;
                }
                Err(e) => error!("Metrics task failed: {}", e),
            }
        }

        info!(
            "Tick {} polled {} instances ({} skipped, {} fallback readings)",
            tick, report.polled, report.skipped, report.fallback_readings
        );
        report
    }
}

async fn read_metric(
    client: &dyn TelemetryClient,
    address: &str,
    path: &str,
    request_timeout: Duration,
) -> Reading {
    match timeout(request_timeout, client.get_json(address, path)).await {
        Ok(response) => {
            if let Err(e) = &response {
                debug!("Metric {} from {} unavailable: {}", path, address, e);
            }
            Reading::from_response(response)
        }
        Err(_) => {
            debug!("Metric {} from {} timed out", path, address);
            Reading::Fallback
        }
    }
}

async fn poll_instance(
    client: Arc<dyn TelemetryClient>,
    key: String,
    address: String,
    request_timeout: Duration,
    timestamp: String,
) -> InstanceSample {
    let client = client.as_ref();
    let target = address.as_str();
    let read = |path: &'static str| read_metric(client, target, path, request_timeout);

    let (
        live,
        daemon,
        peak,
        heap_used,
        heap_committed,
        non_heap_used,
        non_heap_committed,
        metaspace,
    ) = tokio::join!(
        read(THREADS_LIVE),
        read(THREADS_DAEMON),
        read(THREADS_PEAK),
        read(HEAP_USED),
        read(HEAP_COMMITTED),
        read(NON_HEAP_USED),
        read(NON_HEAP_COMMITTED),
        read(METASPACE_USED),
    );

    let fallbacks = [
        live,
        daemon,
        peak,
        heap_used,
        heap_committed,
        non_heap_used,
        non_heap_committed,
        metaspace,
    ]
    .iter()
    .filter(|reading| reading.is_fallback())
    .count();

    InstanceSample {
        threads: ThreadSnapshot::from_readings(live, daemon, peak, &timestamp),
        heap: HeapSnapshot::from_readings(heap_used, heap_committed, &timestamp),
        non_heap: NonHeapSnapshot::from_readings(
            non_heap_used,
            non_heap_committed,
            metaspace,
            &timestamp,
        ),
        fallbacks,
        key,
        address,
    }
}
