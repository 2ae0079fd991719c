// nvml-exporter library - public API

// Re-export error types
pub mod error;
pub use error::{ExporterError, Result};

// Module declarations
pub mod cli;
pub mod commands;
pub mod core;
pub mod platform;
pub mod server;

// Re-export commonly used types
pub use crate::core::config::ExporterConfig;
pub use crate::core::exporter::{DeviceSource, FailurePolicy, GpuExporter};

// Initialize logging (RUST_LOG overrides the default `info` level)
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
