//! GPU device sources.
//!
//! NVIDIA devices are read through NVML; the mock source serves scripted
//! readings for tests and for running without hardware.

mod mock;
mod nvidia;

pub use mock::{MockDeviceSource, MockReadings};
pub use nvidia::{NvmlDeviceSource, NvmlHandle};
