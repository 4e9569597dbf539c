pub mod client;
pub mod memory;
pub mod path;
pub mod watcher;
