use crate::coordination::client::{CoordinationClient, EventKind, WatchEvent};
use crate::coordination::path::{app_path, instances_root, parse_instance_path, InstancePath};
use crate::error::Result;
use crate::registry::codec::decode_instance;
use crate::registry::store::ApplicationRegistry;
use crate::registry::types::{Instance, InstanceId, RegistrySnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const RESYNC_ATTEMPTS: u32 = 4;
const RESYNC_BACKOFF: Duration = Duration::from_millis(100);

/// Keeps an [`ApplicationRegistry`] consistent with the coordination store.
///
/// Startup subscribes first and then performs a full tree read, so a node
/// written in between is seen either by the read or as a buffered event.
/// Change events are applied one at a time from a bounded channel, in the
/// order the store emitted them. A reconnect always triggers another full
/// read, retried with backoff, which recovers anything missed while the
/// connection was down.
pub struct CoordinationWatcher {
    client: Arc<dyn CoordinationClient>,
    registry: Arc<ApplicationRegistry>,
    root: String,
    event_buffer: usize,
}

impl CoordinationWatcher {
    pub fn new(
        client: Arc<dyn CoordinationClient>,
        registry: Arc<ApplicationRegistry>,
        root: &str,
        event_buffer: usize,
    ) -> Self {
        Self {
            client,
            registry,
            root: root.to_string(),
            event_buffer: event_buffer.max(1),
        }
    }

    pub async fn start(self) -> Result<JoinHandle<()>> {
        let (tx, rx) = mpsc::channel(self.event_buffer);
        self.client.subscribe_subtree(&self.root, tx).await?;
        info!("Watching {} for application changes", self.root);

        // events raised during the read wait in the channel and replay
        // idempotently on top of it
        if let Err(e) = self.resync().await {
            warn!("Initial application read failed, waiting for events: {}", e);
        }

        Ok(tokio::spawn(async move { self.run(rx).await }))
    }

    pub async fn run(&self, mut events: mpsc::Receiver<WatchEvent>) {
        while let Some(event) = events.recv().await {
            self.handle_event(event).await;
        }
        info!("Coordination event stream closed");
    }

    pub async fn handle_event(&self, event: WatchEvent) {
        debug!("Coordination event {} {:?}", event.kind, event.path);

        match event.kind {
            EventKind::Added | EventKind::Updated => self.apply_update(&event),
            EventKind::Removed => self.apply_remove(&event),
            EventKind::ConnectionLost => self.apply_connection_lost(&event),
            EventKind::ConnectionReconnected => {
                if let Err(e) = self.resync_with_retry().await {
                    error!(
                        "Resync after reconnect failed {} times, giving up until next reconnect: {}",
                        RESYNC_ATTEMPTS, e
                    );
                }
            }
        }
    }

    async fn resync_with_retry(&self) -> Result<usize> {
        let mut backoff = RESYNC_BACKOFF;
        let mut attempt = 1;
        loop {
            match self.resync().await {
                Ok(count) => return Ok(count),
                Err(e) if attempt < RESYNC_ATTEMPTS => {
                    warn!(
                        "Resync attempt {} failed, retrying in {:?}: {}",
                        attempt, backoff, e
                    );
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Re-reads the whole instance tree and replaces the registry with it.
    /// Returns the number of instances loaded.
    pub async fn resync(&self) -> Result<usize> {
        let snapshot = self.read_tree().await?;
        let count = snapshot.values().map(|instances| instances.len()).sum();
        info!(
            "Loaded {} applications with {} instances from {}",
            snapshot.len(),
            count,
            self.root
        );
        self.registry.resync(snapshot);
        Ok(count)
    }

    async fn read_tree(&self) -> Result<RegistrySnapshot> {
        let app_names = self.client.read_children(&instances_root(&self.root)).await?;

        let mut snapshot = RegistrySnapshot::new();
        for app_name in app_names {
            let app_root = app_path(&self.root, &app_name);
            let children = match self.client.read_children(&app_root).await {
                Ok(children) => children,
                Err(e) => {
                    warn!("Skipping application {}: {}", app_name, e);
                    continue;
                }
            };

            let instances = snapshot.entry(app_name.clone()).or_default();
            for child in children {
                let node = format!("{}/{}", app_root, child);
                let decoded = match self.client.read_data(&node).await {
                    Ok(bytes) => decode_instance(&bytes),
                    Err(e) => Err(e),
                };
                let Some(location) = parse_instance_path(&self.root, &node) else {
                    warn!("Skipping non-instance node {}", node);
                    continue;
                };
                match decoded {
                    Ok(instance) if matches_location(&instance, &location) => {
                        instances.insert(instance.id(), instance);
                    }
                    Ok(instance) => warn!(
                        "Skipping instance node {}: payload is for {}",
                        node,
                        instance.address()
                    ),
                    Err(e) => warn!("Skipping instance node {}: {}", node, e),
                }
            }
        }

        Ok(snapshot)
    }

    fn apply_update(&self, event: &WatchEvent) {
        let (Some(path), Some(data)) = (&event.path, &event.data) else {
            return;
        };
        let Some(location) = parse_instance_path(&self.root, path) else {
            debug!("Ignoring {} for non-instance node {}", event.kind, path);
            return;
        };

        match decode_instance(data) {
            Ok(instance) if !matches_location(&instance, &location) => warn!(
                "Skipping {} for {}: payload is for {}",
                event.kind,
                path,
                instance.address()
            ),
            Ok(instance) => {
                if instance.app_name != location.app_name {
                    warn!(
                        "Instance payload at {} names application {}",
                        path, instance.app_name
                    );
                }
                self.registry.upsert(&location.app_name, instance);
            }
            Err(e) => warn!("Skipping {} for {}: {}", event.kind, path, e),
        }
    }

    fn apply_remove(&self, event: &WatchEvent) {
        let Some(path) = &event.path else {
            return;
        };
        match parse_instance_path(&self.root, path) {
            Some(location) => {
                if self
                    .registry
                    .remove(&location.app_name, &location.host, location.port)
                {
                    info!("Instance {} removed", path);
                }
            }
            None => debug!("Ignoring removal of non-instance node {}", path),
        }
    }

    /// Drops registry state rather than serving it stale. A path naming a
    /// single instance removes just that instance; otherwise everything goes
    /// until the reconnect resync repopulates it.
    fn apply_connection_lost(&self, event: &WatchEvent) {
        let location = event
            .path
            .as_deref()
            .and_then(|path| parse_instance_path(&self.root, path));

        match location {
            Some(location) => {
                self.registry
                    .remove(&location.app_name, &location.host, location.port);
            }
            None => {
                warn!(
                    "Coordination connection lost, dropping {} instances until reconnect",
                    self.registry.instance_count()
                );
                self.registry.clear();
            }
        }
    }
}

/// Instances are keyed by `host:port`, so a payload that disagrees with its
/// node name could never be removed by that node's deletion.
fn matches_location(instance: &Instance, location: &InstancePath) -> bool {
    instance.id() == InstanceId::new(&location.host, location.port)
}
