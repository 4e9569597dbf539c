use crate::actuator::client::TelemetryClient;
use crate::actuator::types::{parse_biz_state, BIZ_STATE};
use crate::address;
use crate::error::{AppError, Result};
use crate::metrics::ring_buffer::BoundedSeries;
use crate::metrics::store::TimeSeriesCache;
use crate::metrics::types::{HeapSnapshot, NonHeapSnapshot, ThreadSnapshot};
use crate::registry::store::ApplicationRegistry;
use crate::registry::types::{AppModel, ApplicationSummary, Instance};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Read-side view over the registry and metrics cache, plus point lookups
/// against individual instances.
pub struct Dashboard {
    registry: Arc<ApplicationRegistry>,
    cache: Arc<TimeSeriesCache>,
    client: Arc<dyn TelemetryClient>,
    biz_state_base_path: String,
    request_timeout: Duration,
}

impl Dashboard {
    pub fn new(
        registry: Arc<ApplicationRegistry>,
        cache: Arc<TimeSeriesCache>,
        client: Arc<dyn TelemetryClient>,
        biz_state_base_path: &str,
        request_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            cache,
            client,
            biz_state_base_path: biz_state_base_path.trim_end_matches('/').to_string(),
            request_timeout,
        }
    }

    pub fn list_applications(&self) -> Vec<ApplicationSummary> {
        self.registry.summaries()
    }

    pub fn list_instances(&self, app_name: &str) -> Vec<Instance> {
        self.registry.instances(app_name)
    }

    pub fn list_app_models(&self) -> Vec<AppModel> {
        self.registry.app_models()
    }

    pub fn thread_series(&self, instance_key: &str) -> BoundedSeries<ThreadSnapshot> {
        self.cache
            .thread_series(instance_key)
            .unwrap_or_else(|| BoundedSeries::new(self.cache.capacity()))
    }

    pub fn heap_series(&self, instance_key: &str) -> BoundedSeries<HeapSnapshot> {
        self.cache
            .heap_series(instance_key)
            .unwrap_or_else(|| BoundedSeries::new(self.cache.capacity()))
    }

    pub fn non_heap_series(&self, instance_key: &str) -> BoundedSeries<NonHeapSnapshot> {
        self.cache
            .non_heap_series(instance_key)
            .unwrap_or_else(|| BoundedSeries::new(self.cache.capacity()))
    }

    /// Keys of every instance with cached history.
    pub fn instance_keys(&self) -> BTreeSet<String> {
        self.cache.keys()
    }

    /// Turns an instance key back into `host:port`.
    pub fn resolve_address(&self, instance_key: &str) -> Result<String> {
        Ok(address::decode(instance_key)?)
    }

    pub fn instance_key(instance: &Instance) -> Result<String> {
        Ok(address::encode(&instance.host_name, instance.port)?)
    }

    /// State of one biz module on one instance, or an empty string when the
    /// instance, module or endpoint can't be reached.
    pub async fn get_biz_state(
        &self,
        app_name: &str,
        host: &str,
        biz_name: &str,
        biz_version: &str,
    ) -> String {
        let instance = match self.registry.find_instance(app_name, host) {
            Ok(instance) => instance,
            Err(AppError::NotFound { .. }) => {
                debug!("No instance of {} on {}", app_name, host);
                return String::new();
            }
            Err(e) => {
                warn!("Biz state lookup failed: {}", e);
                return String::new();
            }
        };

        let path = format!("{}/{}", self.biz_state_base_path, BIZ_STATE);
        let address = instance.address();

        match timeout(self.request_timeout, self.client.get_json(&address, &path)).await {
            Ok(Ok(body)) => parse_biz_state(&body, biz_name, biz_version),
            Ok(Err(e)) => {
                warn!("Failed to fetch biz state from {}: {}", address, e);
                String::new()
            }
            Err(_) => {
                warn!("Biz state request to {} timed out", address);
                String::new()
            }
        }
    }
}
