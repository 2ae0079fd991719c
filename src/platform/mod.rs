// Platform-specific code module

pub mod gpu;

// Re-exports for cleaner imports
pub use gpu::{MockDeviceSource, MockReadings, NvmlDeviceSource, NvmlHandle};
