#[cfg(feature = "nvml")]
use std::sync::Arc;

#[cfg(feature = "nvml")]
use nvml_wrapper::{enum_wrappers::device::TemperatureSensor, error::NvmlError, Nvml};

use crate::core::exporter::{Device, DeviceSource, MemoryInfo, Query, Utilization};
use crate::error::{ExporterError, Result};

/// Device source backed by NVML (NVIDIA Management Library)
///
/// Device handles are looked up by index on every query; NVML keeps them
/// valid for as long as the library stays initialized.
pub struct NvmlDeviceSource {
    #[cfg(feature = "nvml")]
    nvml: Arc<Nvml>,
}

/// Keeps NVML loaded until `shutdown` is called or the last owner drops it
pub struct NvmlHandle {
    #[cfg(feature = "nvml")]
    nvml: Arc<Nvml>,
}

impl NvmlDeviceSource {
    /// Initialize NVML. Must succeed before any device can be enumerated.
    pub fn init() -> Result<(Self, NvmlHandle)> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Nvml::init().map_err(|e| {
                ExporterError::initialization(format!("Failed to init NVML: {}", e))
            })?;
            let nvml = Arc::new(nvml);

            Ok((
                Self {
                    nvml: Arc::clone(&nvml),
                },
                NvmlHandle { nvml },
            ))
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(ExporterError::initialization(
                "NVML feature not enabled. Recompile with --features nvml",
            ))
        }
    }

    #[cfg(feature = "nvml")]
    fn handle(&self, device: &Device, query: Query) -> Result<nvml_wrapper::Device<'_>> {
        self.nvml
            .device_by_index(device.index)
            .map_err(|e| query_error(device, query, e))
    }
}

#[cfg(feature = "nvml")]
fn query_error(device: &Device, query: Query, err: NvmlError) -> ExporterError {
    ExporterError::query(device.uuid.clone(), query, err.to_string())
}

impl NvmlHandle {
    /// Release NVML. Fails if the exporter still holds a device source.
    pub fn shutdown(self) -> Result<()> {
        #[cfg(feature = "nvml")]
        {
            let nvml = Arc::try_unwrap(self.nvml).map_err(|_| {
                ExporterError::protocol("NVML is still in use by a device source")
            })?;
            nvml.shutdown()
                .map_err(|e| ExporterError::protocol(format!("Failed to shut down NVML: {}", e)))
        }
        #[cfg(not(feature = "nvml"))]
        {
            Ok(())
        }
    }
}

impl DeviceSource for NvmlDeviceSource {
    fn enumerate(&mut self) -> Result<Vec<Device>> {
        #[cfg(feature = "nvml")]
        {
            let count = self.nvml.device_count().map_err(|e| {
                ExporterError::initialization(format!("Failed to count NVIDIA devices: {}", e))
            })?;

            let mut devices = Vec::with_capacity(count as usize);
            for index in 0..count {
                let handle = self.nvml.device_by_index(index).map_err(|e| {
                    ExporterError::initialization(format!("GPU {} not found: {}", index, e))
                })?;
                let uuid = handle.uuid().map_err(|e| {
                    ExporterError::initialization(format!("GPU {} has no UUID: {}", index, e))
                })?;
                let name = handle.name().map_err(|e| {
                    ExporterError::initialization(format!("GPU {} has no name: {}", index, e))
                })?;

                devices.push(Device { index, uuid, name });
            }

            Ok(devices)
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(ExporterError::initialization(
                "NVIDIA GPU support not enabled",
            ))
        }
    }

    fn utilization(&mut self, device: &Device) -> Result<Utilization> {
        #[cfg(feature = "nvml")]
        {
            let rates = self
                .handle(device, Query::Utilization)?
                .utilization_rates()
                .map_err(|e| query_error(device, Query::Utilization, e))?;

            Ok(Utilization {
                gpu_percent: rates.gpu,
                memory_percent: rates.memory,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(unsupported(device, Query::Utilization))
        }
    }

    fn temperature(&mut self, device: &Device) -> Result<u32> {
        #[cfg(feature = "nvml")]
        {
            self.handle(device, Query::Temperature)?
                .temperature(TemperatureSensor::Gpu)
                .map_err(|e| query_error(device, Query::Temperature, e))
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(unsupported(device, Query::Temperature))
        }
    }

    fn power_usage(&mut self, device: &Device) -> Result<u32> {
        #[cfg(feature = "nvml")]
        {
            self.handle(device, Query::PowerUsage)?
                .power_usage()
                .map_err(|e| query_error(device, Query::PowerUsage, e))
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(unsupported(device, Query::PowerUsage))
        }
    }

    fn fan_speed(&mut self, device: &Device) -> Result<u32> {
        #[cfg(feature = "nvml")]
        {
            // Fan 0 (percentage)
            self.handle(device, Query::FanSpeed)?
                .fan_speed(0)
                .map_err(|e| query_error(device, Query::FanSpeed, e))
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(unsupported(device, Query::FanSpeed))
        }
    }

    fn memory_info(&mut self, device: &Device) -> Result<MemoryInfo> {
        #[cfg(feature = "nvml")]
        {
            let info = self
                .handle(device, Query::MemoryInfo)?
                .memory_info()
                .map_err(|e| query_error(device, Query::MemoryInfo, e))?;

            Ok(MemoryInfo {
                free_bytes: info.free,
                total_bytes: info.total,
                used_bytes: info.used,
            })
        }
        #[cfg(not(feature = "nvml"))]
        {
            Err(unsupported(device, Query::MemoryInfo))
        }
    }
}

#[cfg(not(feature = "nvml"))]
fn unsupported(device: &Device, query: Query) -> ExporterError {
    ExporterError::query(device.uuid.clone(), query, "NVIDIA GPU support not enabled")
}
