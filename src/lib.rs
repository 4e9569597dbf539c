pub mod actuator;
pub mod address;
pub mod cli;
pub mod config;
pub mod coordination;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod registry;
