use crate::dashboard::Dashboard;
use crate::error::Result;
use crate::metrics::ring_buffer::BoundedSeries;
use crate::metrics::types::{HeapSnapshot, NonHeapSnapshot, ThreadSnapshot};
use crate::registry::types::AppModel;
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: String,
    pub applications: Vec<AppModel>,
    pub instances: BTreeMap<String, InstanceHistory>,
}

#[derive(Debug, Serialize)]
pub struct InstanceHistory {
    pub address: Option<String>,
    pub threads: BoundedSeries<ThreadSnapshot>,
    pub heap: BoundedSeries<HeapSnapshot>,
    pub non_heap: BoundedSeries<NonHeapSnapshot>,
}

impl DashboardSnapshot {
    pub fn capture(dashboard: &Dashboard) -> Self {
        let instances = dashboard
            .instance_keys()
            .into_iter()
            .map(|key| {
                let history = InstanceHistory {
                    address: dashboard.resolve_address(&key).ok(),
                    threads: dashboard.thread_series(&key),
                    heap: dashboard.heap_series(&key),
                    non_heap: dashboard.non_heap_series(&key),
                };
                (key, history)
            })
            .collect();

        Self {
            generated_at: Local::now().to_rfc3339(),
            applications: dashboard.list_app_models(),
            instances,
        }
    }
}

/// Writes the registry and cached history to `dashboard_<timestamp>.json`
/// under `dir`, creating it if needed.
pub fn export_snapshot_json(dashboard: &Dashboard, dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let filepath = dir.join(format!("dashboard_{}.json", timestamp));

    let json = serde_json::to_string_pretty(&DashboardSnapshot::capture(dashboard))?;
    std::fs::write(&filepath, json)?;

    Ok(filepath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::client::TelemetryClient;
    use crate::actuator::types::Reading;
    use crate::error::AppError;
    use crate::metrics::store::TimeSeriesCache;
    use crate::registry::store::ApplicationRegistry;
    use crate::registry::types::Instance;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    struct Offline;

    #[async_trait]
    impl TelemetryClient for Offline {
        async fn get_json(&self, _address: &str, _path: &str) -> Result<Value> {
            Err(AppError::Http("offline".to_string()))
        }
    }

    #[test]
    fn test_export_snapshot_json() {
        let registry = Arc::new(ApplicationRegistry::new());
        registry.upsert("orderApp", Instance::new("orderApp", "10.0.0.1", 8080, "UP"));

        let cache = Arc::new(TimeSeriesCache::new(4));
        cache.record_threads(
            "ag0g0g1g1f90",
            ThreadSnapshot::from_readings(
                Reading::Measured(42.0),
                Reading::Measured(30.0),
                Reading::Fallback,
                "10:15:00",
            ),
        );

        let dashboard = Dashboard::new(
            registry,
            cache,
            Arc::new(Offline),
            "/actuator",
            Duration::from_secs(1),
        );

        let dir = std::env::temp_dir().join(format!("app-dashboard-export-{}", std::process::id()));
        let path = export_snapshot_json(&dashboard, &dir).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("dashboard_") && name.ends_with(".json"));

        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["applications"][0]["name"], "orderApp");

        let history = &written["instances"]["ag0g0g1g1f90"];
        assert_eq!(history["address"], "10.0.0.1:8080");
        assert_eq!(history["threads"].as_array().unwrap().len(), 1);
        assert_eq!(history["heap"].as_array().unwrap().len(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
