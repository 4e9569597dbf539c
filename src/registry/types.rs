use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One running deployment of an application, identified by `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub app_name: String,
    #[serde(alias = "host")]
    pub host_name: String,
    pub port: u16,
    #[serde(default, alias = "state")]
    pub app_state: String,
}

impl Instance {
    pub fn new(app_name: &str, host_name: &str, port: u16, app_state: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            host_name: host_name.to_string(),
            port,
            app_state: app_state.to_string(),
        }
    }

    pub fn id(&self) -> InstanceId {
        InstanceId::new(&self.host_name, self.port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host_name, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pub host: String,
    pub port: u16,
}

impl InstanceId {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

/// Instances of one application keyed by identity, so re-adding the same
/// `host:port` replaces rather than duplicates.
pub type InstanceSet = BTreeMap<InstanceId, Instance>;

/// Point-in-time copy of the whole registry.
pub type RegistrySnapshot = BTreeMap<String, InstanceSet>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub name: String,
    pub instance_count: usize,
}

/// Flattened `name/host/port/state` row across every application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppModel {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub state: String,
}

impl From<&Instance> for AppModel {
    fn from(instance: &Instance) -> Self {
        Self {
            name: instance.app_name.clone(),
            host: instance.host_name.clone(),
            port: instance.port,
            state: instance.app_state.clone(),
        }
    }
}
