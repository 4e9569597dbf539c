use crate::address::LOCALHOST_IP;
use crate::error::{AppError, Result};
use crate::registry::types::{
    AppModel, ApplicationSummary, Instance, InstanceId, InstanceSet, RegistrySnapshot,
};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

/// In-memory view of which instances each application currently has.
///
/// Buckets live in a sharded [`DashMap`], so upserts and removals for
/// different applications do not contend. The `resync_gate` is only taken
/// exclusively by [`ApplicationRegistry::resync`] and [`ApplicationRegistry::clear`];
/// every other operation holds it shared, which keeps a full replace atomic
/// with respect to readers without serialising ordinary mutations.
#[derive(Default)]
pub struct ApplicationRegistry {
    apps: DashMap<String, InstanceSet>,
    resync_gate: RwLock<()>,
}

impl ApplicationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `instance` in `app_name`'s set. Blank keys are ignored.
    pub fn upsert(&self, app_name: &str, instance: Instance) {
        if app_name.is_empty() || instance.host_name.is_empty() {
            debug!("Ignoring upsert with blank app name or host");
            return;
        }

        let _gate = self.resync_gate.read();
        self.apps
            .entry(app_name.to_string())
            .or_default()
            .insert(instance.id(), instance);
    }

    /// Removes the `host:port` instance from `app_name`. Returns whether
    /// anything was removed. The application entry itself is kept, even if empty.
    pub fn remove(&self, app_name: &str, host: &str, port: u16) -> bool {
        if app_name.is_empty() || host.is_empty() {
            return false;
        }

        let _gate = self.resync_gate.read();
        match self.apps.get_mut(app_name) {
            Some(mut instances) => instances.remove(&InstanceId::new(host, port)).is_some(),
            None => false,
        }
    }

    pub fn list_all(&self) -> RegistrySnapshot {
        let _gate = self.resync_gate.read();
        self.apps
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Replaces the whole registry with `snapshot`.
    pub fn resync(&self, snapshot: RegistrySnapshot) {
        let _gate = self.resync_gate.write();
        self.apps.clear();
        for (app_name, instances) in snapshot {
            self.apps.insert(app_name, instances);
        }
    }

    pub fn clear(&self) {
        let _gate = self.resync_gate.write();
        self.apps.clear();
    }

    pub fn instances(&self, app_name: &str) -> Vec<Instance> {
        let _gate = self.resync_gate.read();
        self.apps
            .get(app_name)
            .map(|instances| instances.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolves the instance of `app_name` running on `host`.
    ///
    /// A loopback `host` matches the first instance of the application, so
    /// lookups made from a developer machine reach locally registered apps
    /// that advertise their LAN address.
    pub fn find_instance(&self, app_name: &str, host: &str) -> Result<Instance> {
        let _gate = self.resync_gate.read();
        self.apps
            .get(app_name)
            .and_then(|instances| {
                instances
                    .values()
                    .find(|instance| host == LOCALHOST_IP || instance.host_name == host)
                    .cloned()
            })
            .ok_or_else(|| AppError::NotFound {
                app_name: app_name.to_string(),
                host: host.to_string(),
            })
    }

    pub fn summaries(&self) -> Vec<ApplicationSummary> {
        self.list_all()
            .into_iter()
            .map(|(name, instances)| ApplicationSummary {
                name,
                instance_count: instances.len(),
            })
            .collect()
    }

    pub fn app_models(&self) -> Vec<AppModel> {
        self.list_all()
            .values()
            .flat_map(|instances| instances.values().map(AppModel::from))
            .collect()
    }

    pub fn instance_count(&self) -> usize {
        let _gate = self.resync_gate.read();
        self.apps.iter().map(|entry| entry.value().len()).sum()
    }
}
