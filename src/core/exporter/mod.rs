//! GPU telemetry exporter core.
//!
//! Defines the metric catalog, the device source abstraction, and the
//! collector that turns one poll cycle into a Prometheus snapshot.

pub mod catalog;
mod collector;
mod device;

pub use catalog::{GpuMetric, DEVICE_LABELS, NAMESPACE};
pub use collector::{CycleSummary, FailurePolicy, GpuExporter};
pub use device::{Device, DeviceSource, MemoryInfo, Query, Utilization};
