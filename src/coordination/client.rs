use crate::error::Result;
use async_trait::async_trait;
use strum::Display;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Added,
    Updated,
    Removed,
    ConnectionLost,
    ConnectionReconnected,
}

/// A change notification from the coordination store. Connection events
/// usually carry neither a path nor data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: EventKind,
    pub path: Option<String>,
    pub data: Option<Vec<u8>>,
}

impl WatchEvent {
    pub fn node(kind: EventKind, path: &str, data: Option<Vec<u8>>) -> Self {
        Self {
            kind,
            path: Some(path.to_string()),
            data,
        }
    }

    pub fn connection(kind: EventKind) -> Self {
        Self {
            kind,
            path: None,
            data: None,
        }
    }
}

/// Hierarchical namespace read plus a subtree-watch primitive.
#[async_trait]
pub trait CoordinationClient: Send + Sync {
    async fn read_children(&self, path: &str) -> Result<Vec<String>>;

    async fn read_data(&self, path: &str) -> Result<Vec<u8>>;

    /// Delivers every change under `root`, plus connection state changes,
    /// into `sink` in the order they happen.
    async fn subscribe_subtree(&self, root: &str, sink: mpsc::Sender<WatchEvent>) -> Result<()>;
}
