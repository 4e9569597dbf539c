pub mod codec;
pub mod store;
pub mod types;
