use crate::coordination::client::{CoordinationClient, EventKind, WatchEvent};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

/// A process-local coordination store.
///
/// Nodes are created with their ancestors, deletes are recursive, and every
/// change is published to subtree subscribers. While disconnected, writes
/// still land but reads fail and no node events are delivered, which is the
/// window a subscriber has to recover from with a full re-read.
///
/// Writers hold `publish_order` from commit until their events are queued,
/// so subscribers see changes in commit order.
pub struct InMemoryStore {
    nodes: RwLock<BTreeMap<String, Vec<u8>>>,
    publish_order: tokio::sync::Mutex<()>,
    subscribers: Mutex<Vec<Subscriber>>,
    connected: AtomicBool,
}

struct Subscriber {
    root: String,
    sink: mpsc::Sender<WatchEvent>,
}

fn normalize(path: &str) -> &str {
    path.trim_end_matches('/')
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn in_subtree(root: &str, path: &str) -> bool {
    root.is_empty()
        || path == root
        || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

fn validate(path: &str) -> Result<&str> {
    let path = normalize(path);
    if !path.starts_with('/') || path.contains("//") {
        return Err(AppError::Coordination(format!("Invalid node path: {:?}", path)));
    }
    Ok(path)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(BTreeMap::new()),
            publish_order: tokio::sync::Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Creates or overwrites `path`, creating missing ancestors with empty data.
    pub async fn put(&self, path: &str, data: Vec<u8>) -> Result<()> {
        let path = validate(path)?;
        let _order = self.publish_order.lock().await;

        let events = {
            let mut nodes = self.nodes.write();
            let mut events = Vec::new();

            let mut missing = Vec::new();
            let mut ancestor = parent_of(path);
            while !ancestor.is_empty() && !nodes.contains_key(ancestor) {
                missing.push(ancestor.to_string());
                ancestor = parent_of(ancestor);
            }
            for ancestor in missing.into_iter().rev() {
                nodes.insert(ancestor.clone(), Vec::new());
                events.push(WatchEvent::node(EventKind::Added, &ancestor, Some(Vec::new())));
            }

            let kind = match nodes.insert(path.to_string(), data.clone()) {
                Some(_) => EventKind::Updated,
                None => EventKind::Added,
            };
            events.push(WatchEvent::node(kind, path, Some(data)));
            events
        };

        if self.is_connected() {
            self.publish(events).await;
        }
        Ok(())
    }

    /// Deletes `path` and everything below it. Returns whether it existed.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        let path = validate(path)?;
        let prefix = format!("{}/", path);
        let _order = self.publish_order.lock().await;

        let events = {
            let mut nodes = self.nodes.write();
            if !nodes.contains_key(path) {
                return Ok(false);
            }

            let doomed: Vec<String> = nodes
                .keys()
                .filter(|key| key.as_str() == path || key.starts_with(&prefix))
                .cloned()
                .collect();

            // deepest first
            doomed
                .into_iter()
                .rev()
                .filter_map(|key| {
                    nodes
                        .remove(&key)
                        .map(|data| WatchEvent::node(EventKind::Removed, &key, Some(data)))
                })
                .collect::<Vec<_>>()
        };

        if self.is_connected() {
            self.publish(events).await;
        }
        Ok(true)
    }

    pub async fn disconnect(&self) {
        let _order = self.publish_order.lock().await;
        if self.connected.swap(false, Ordering::SeqCst) {
            self.publish(vec![WatchEvent::connection(EventKind::ConnectionLost)])
                .await;
        }
    }

    pub async fn reconnect(&self) {
        let _order = self.publish_order.lock().await;
        if !self.connected.swap(true, Ordering::SeqCst) {
            self.publish(vec![WatchEvent::connection(EventKind::ConnectionReconnected)])
                .await;
        }
    }

    async fn publish(&self, events: Vec<WatchEvent>) {
        let subscribers: Vec<(String, mpsc::Sender<WatchEvent>)> = self
            .subscribers
            .lock()
            .iter()
            .map(|s| (s.root.clone(), s.sink.clone()))
            .collect();

        for event in events {
            for (root, sink) in &subscribers {
                let in_scope = match &event.path {
                    Some(path) => in_subtree(root, path),
                    None => true,
                };
                if in_scope && sink.send(event.clone()).await.is_err() {
                    debug!("Subscriber for {:?} went away", root);
                }
            }
        }

        self.subscribers.lock().retain(|s| !s.sink.is_closed());
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(AppError::Coordination("Connection lost".to_string()))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationClient for InMemoryStore {
    async fn read_children(&self, path: &str) -> Result<Vec<String>> {
        self.ensure_connected()?;
        let path = normalize(path);

        let nodes = self.nodes.read();
        if !path.is_empty() && !nodes.contains_key(path) {
            return Err(AppError::Coordination(format!("No node at {}", path)));
        }

        Ok(nodes
            .keys()
            .filter(|key| parent_of(key) == path)
            .filter_map(|key| key.rsplit_once('/').map(|(_, name)| name.to_string()))
            .collect())
    }

    async fn read_data(&self, path: &str) -> Result<Vec<u8>> {
        self.ensure_connected()?;
        self.nodes
            .read()
            .get(normalize(path))
            .cloned()
            .ok_or_else(|| AppError::Coordination(format!("No node at {}", path)))
    }

    async fn subscribe_subtree(&self, root: &str, sink: mpsc::Sender<WatchEvent>) -> Result<()> {
        self.ensure_connected()?;
        self.subscribers.lock().push(Subscriber {
            root: normalize(root).to_string(),
            sink,
        });
        Ok(())
    }
}
