//! Static catalog of the metrics the exporter can produce.

use prometheus::Opts;

/// Namespace prepended to every exported metric name
pub const NAMESPACE: &str = "nvml";

/// Label dimensions attached to every per-device sample, in this order
pub const DEVICE_LABELS: [&str; 3] = ["device_id", "device_uuid", "device_name"];

pub const UP_NAME: &str = "up";
pub const UP_HELP: &str = "Were the NVML queries successful?";

/// Per-device gauges exported on every scrape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuMetric {
    PowerWatts,
    FanSpeed,
    GpuPercent,
    MemoryFree,
    MemoryTotal,
    MemoryUsed,
    MemoryPercent,
    TemperatureFahrenheit,
    TemperatureCelsius,
}

impl GpuMetric {
    pub const ALL: [GpuMetric; 9] = [
        GpuMetric::PowerWatts,
        GpuMetric::FanSpeed,
        GpuMetric::GpuPercent,
        GpuMetric::MemoryFree,
        GpuMetric::MemoryTotal,
        GpuMetric::MemoryUsed,
        GpuMetric::MemoryPercent,
        GpuMetric::TemperatureFahrenheit,
        GpuMetric::TemperatureCelsius,
    ];

    /// Metric name without the namespace
    pub fn name(self) -> &'static str {
        match self {
            GpuMetric::PowerWatts => "power_watts",
            GpuMetric::FanSpeed => "fan_speed",
            GpuMetric::GpuPercent => "gpu_percent",
            GpuMetric::MemoryFree => "memory_free",
            GpuMetric::MemoryTotal => "memory_total",
            GpuMetric::MemoryUsed => "memory_used",
            GpuMetric::MemoryPercent => "memory_percent",
            GpuMetric::TemperatureFahrenheit => "temperature_fahrenheit",
            GpuMetric::TemperatureCelsius => "temperature_celsius",
        }
    }

    pub fn help(self) -> &'static str {
        match self {
            GpuMetric::PowerWatts => "Power Usage of an NVIDIA GPU in Watts",
            GpuMetric::FanSpeed => "Device Fan Speed in Percent of Maximum",
            GpuMetric::GpuPercent => "Percent of GPU Utilized",
            GpuMetric::MemoryFree => "Number of bytes free in the GPU Memory",
            GpuMetric::MemoryTotal => "Total bytes of the GPU's memory",
            GpuMetric::MemoryUsed => "Total number of bytes used in the GPU Memory",
            GpuMetric::MemoryPercent => "Percent of GPU Memory Utilized",
            GpuMetric::TemperatureFahrenheit => "GPU Temperature in Fahrenheit",
            GpuMetric::TemperatureCelsius => "GPU Temperature in Celsius",
        }
    }

    /// Name as it appears in the exposition text, e.g. `nvml_gpu_percent`
    pub fn exported_name(self) -> String {
        format!("{}_{}", NAMESPACE, self.name())
    }

    pub fn opts(self) -> Opts {
        Opts::new(self.name(), self.help()).namespace(NAMESPACE)
    }
}

/// Integer Fahrenheit from integer Celsius. The division truncates.
pub fn celsius_to_fahrenheit(celsius: u32) -> u32 {
    celsius * 9 / 5 + 32
}

/// NVML reports power in milliwatts; whole watts, truncated.
pub fn milliwatts_to_watts(milliwatts: u32) -> u32 {
    milliwatts / 1000
}
