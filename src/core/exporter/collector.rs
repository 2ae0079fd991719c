use std::fmt;
use std::str::FromStr;

use parking_lot::Mutex;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, GaugeVec, Opts};

use super::catalog::{
    celsius_to_fahrenheit, milliwatts_to_watts, GpuMetric, DEVICE_LABELS, NAMESPACE, UP_HELP,
    UP_NAME,
};
use super::device::{Device, DeviceSource};
use crate::error::{ExporterError, Result};

/// What a poll cycle does after a device query fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the whole cycle at the first failing query. Later devices are
    /// not queried until the next scrape.
    #[default]
    AbortCycle,
    /// Drop the rest of the failing device's queries and move on to the
    /// next device. `up` still reports 0.
    SkipDevice,
}

impl FromStr for FailurePolicy {
    type Err = ExporterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "abort" => Ok(FailurePolicy::AbortCycle),
            "skip-device" => Ok(FailurePolicy::SkipDevice),
            other => Err(ExporterError::config(format!(
                "unknown failure policy '{}' (expected 'abort' or 'skip-device')",
                other
            ))),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::AbortCycle => f.write_str("abort"),
            FailurePolicy::SkipDevice => f.write_str("skip-device"),
        }
    }
}

/// Outcome of one poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Devices that went through every query without error
    pub devices_completed: usize,
    pub failures: usize,
}

impl CycleSummary {
    pub fn healthy(&self) -> bool {
        self.failures == 0
    }
}

/// Prometheus collector that polls every GPU on each scrape.
///
/// The device list is fixed at construction. Every `collect` call resets all
/// series, queries the devices in enumeration order and returns the fresh
/// samples, all while holding one lock, so concurrent scrapes never see a
/// mix of two cycles and the device source is never called concurrently.
pub struct GpuExporter {
    source: Mutex<Box<dyn DeviceSource>>,
    devices: Vec<Device>,
    series: Vec<GaugeVec>,
    up: Gauge,
    policy: FailurePolicy,
}

impl GpuExporter {
    /// Enumerate devices and build the exporter with the default policy.
    ///
    /// Fails if the source cannot enumerate its devices.
    pub fn new(source: Box<dyn DeviceSource>) -> Result<Self> {
        Self::with_policy(source, FailurePolicy::default())
    }

    pub fn with_policy(mut source: Box<dyn DeviceSource>, policy: FailurePolicy) -> Result<Self> {
        let devices = source.enumerate()?;

        let up = Gauge::with_opts(Opts::new(UP_NAME, UP_HELP).namespace(NAMESPACE))?;
        let series = GpuMetric::ALL
            .iter()
            .map(|metric| GaugeVec::new(metric.opts(), &DEVICE_LABELS))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            source: Mutex::new(source),
            devices,
            series,
            up,
            policy,
        })
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run one poll cycle and leave the results in the series.
    pub fn run_cycle(&self) -> CycleSummary {
        let mut source = self.source.lock();
        self.poll_devices(&mut **source)
    }

    fn poll_devices(&self, source: &mut dyn DeviceSource) -> CycleSummary {
        for vec in &self.series {
            vec.reset();
        }
        self.up.set(1.0);

        let mut summary = CycleSummary::default();

        for device in &self.devices {
            match self.poll_device(source, device) {
                Ok(()) => summary.devices_completed += 1,
                Err(e) => {
                    log::error!("Failed to query device {}: {}", device.uuid, e);
                    self.up.set(0.0);
                    summary.failures += 1;

                    if self.policy == FailurePolicy::AbortCycle {
                        break;
                    }
                }
            }
        }

        log::debug!(
            "Poll cycle finished: {}/{} devices complete, {} failure(s)",
            summary.devices_completed,
            self.devices.len(),
            summary.failures
        );

        summary
    }

    /// Query one device in the fixed order, writing each reading as soon as
    /// it arrives. Stops at the first error.
    fn poll_device(&self, source: &mut dyn DeviceSource, device: &Device) -> Result<()> {
        let id = device.index.to_string();
        let labels = [id.as_str(), device.uuid.as_str(), device.name.as_str()];

        let utilization = source.utilization(device)?;
        self.set(GpuMetric::GpuPercent, &labels, utilization.gpu_percent as f64);
        self.set(
            GpuMetric::MemoryPercent,
            &labels,
            utilization.memory_percent as f64,
        );

        let celsius = source.temperature(device)?;
        self.set(GpuMetric::TemperatureCelsius, &labels, celsius as f64);
        self.set(
            GpuMetric::TemperatureFahrenheit,
            &labels,
            celsius_to_fahrenheit(celsius) as f64,
        );

        let milliwatts = source.power_usage(device)?;
        self.set(
            GpuMetric::PowerWatts,
            &labels,
            milliwatts_to_watts(milliwatts) as f64,
        );

        let fan = source.fan_speed(device)?;
        self.set(GpuMetric::FanSpeed, &labels, fan as f64);

        let memory = source.memory_info(device)?;
        self.set(GpuMetric::MemoryFree, &labels, memory.free_bytes as f64);
        self.set(GpuMetric::MemoryTotal, &labels, memory.total_bytes as f64);
        self.set(GpuMetric::MemoryUsed, &labels, memory.used_bytes as f64);

        Ok(())
    }

    fn set(&self, metric: GpuMetric, labels: &[&str; 3], value: f64) {
        self.series_for(metric).with_label_values(labels).set(value);
    }

    fn series_for(&self, metric: GpuMetric) -> &GaugeVec {
        // `series` is built from GpuMetric::ALL, which lists variants in declaration order
        &self.series[metric as usize]
    }
}

impl Collector for GpuExporter {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.up.desc();
        for vec in &self.series {
            descs.extend(vec.desc());
        }
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let mut source = self.source.lock();
        self.poll_devices(&mut **source);

        let mut families = Vec::with_capacity(self.series.len() + 1);
        for vec in &self.series {
            families.extend(vec.collect());
        }
        families.extend(self.up.collect());
        families
    }
}
