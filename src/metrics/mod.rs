pub mod collector;
pub mod ring_buffer;
pub mod store;
pub mod types;
