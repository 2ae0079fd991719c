// Core business logic module

pub mod config;
pub mod exporter;

// Re-export commonly used items
pub use config::ExporterConfig;
pub use exporter::{CycleSummary, FailurePolicy, GpuExporter};
