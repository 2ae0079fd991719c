use std::fmt;

use crate::error::Result;

/// One GPU as seen at enumeration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub index: u32,
    pub uuid: String,
    pub name: String,
}

impl Device {
    pub fn new<U: Into<String>, N: Into<String>>(index: u32, uuid: U, name: N) -> Self {
        Self {
            index,
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

/// GPU and memory-controller utilization, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Utilization {
    pub gpu_percent: u32,
    pub memory_percent: u32,
}

/// Framebuffer memory, in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    pub free_bytes: u64,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// The per-device queries of a poll cycle, in the order they are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    Utilization,
    Temperature,
    PowerUsage,
    FanSpeed,
    MemoryInfo,
}

impl Query {
    pub const ORDER: [Query; 5] = [
        Query::Utilization,
        Query::Temperature,
        Query::PowerUsage,
        Query::FanSpeed,
        Query::MemoryInfo,
    ];
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Query::Utilization => "utilization",
            Query::Temperature => "temperature",
            Query::PowerUsage => "power usage",
            Query::FanSpeed => "fan speed",
            Query::MemoryInfo => "memory info",
        };
        f.write_str(name)
    }
}

/// Trait for GPU telemetry sources
///
/// Abstracts the native device-management layer. The NVML implementation
/// lives in the platform layer; a scripted one is available for tests.
/// Callers never invoke a source from two threads at once.
pub trait DeviceSource: Send {
    /// List the attached devices. Called once, when the exporter is built.
    fn enumerate(&mut self) -> Result<Vec<Device>>;

    fn utilization(&mut self, device: &Device) -> Result<Utilization>;

    /// Current core temperature in degrees Celsius
    fn temperature(&mut self, device: &Device) -> Result<u32>;

    /// Current board power draw in milliwatts
    fn power_usage(&mut self, device: &Device) -> Result<u32>;

    /// Fan speed in percent of maximum
    fn fan_speed(&mut self, device: &Device) -> Result<u32>;

    fn memory_info(&mut self, device: &Device) -> Result<MemoryInfo>;
}
