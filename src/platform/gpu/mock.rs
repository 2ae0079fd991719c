//! Scripted device source for tests and hardware-free runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::core::exporter::{Device, DeviceSource, MemoryInfo, Query, Utilization};
use crate::error::{ExporterError, Result};

/// Fixed readings reported by a mock device
#[derive(Debug, Clone, Default)]
pub struct MockReadings {
    pub utilization: Utilization,
    pub temperature_celsius: u32,
    pub power_milliwatts: u32,
    pub fan_speed_percent: u32,
    pub memory: MemoryInfo,
}

#[derive(Debug)]
struct MockDevice {
    device: Device,
    readings: MockReadings,
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    failures: HashMap<u32, Query>,
    enumerate_error: Option<String>,
    stamped: bool,
    generation: u64,
    calls: Vec<(u32, Query)>,
}

/// In-memory `DeviceSource`.
///
/// Clones share state, so a test can keep one handle and hand the other to
/// the exporter, then inject failures between scrapes. The source also
/// records every query it served and how many ran at the same time.
#[derive(Debug, Clone, Default)]
pub struct MockDeviceSource {
    state: Arc<Mutex<MockState>>,
    query_delay: Option<Duration>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockDeviceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// One healthy device with a typical reading set
    pub fn demo() -> Self {
        Self::new().with_device(
            "GPU-00000000-0000-0000-0000-000000000000",
            "Mock GPU",
            MockReadings {
                utilization: Utilization {
                    gpu_percent: 42,
                    memory_percent: 17,
                },
                temperature_celsius: 70,
                power_milliwatts: 125_500,
                fan_speed_percent: 55,
                memory: MemoryInfo {
                    free_bytes: 1000,
                    total_bytes: 4000,
                    used_bytes: 3000,
                },
            },
        )
    }

    /// `count` devices whose readings all equal the current cycle number.
    ///
    /// The cycle number advances when device 0 is asked for utilization, so
    /// every sample of one cycle carries the same value. Power is reported as
    /// `cycle * 1000` mW so the exported watts match too.
    pub fn stamped(count: u32) -> Self {
        let mut source = Self::new();
        for i in 0..count {
            source = source.with_device(
                format!("GPU-stamp-{}", i),
                "Stamped GPU",
                MockReadings::default(),
            );
        }
        source.state.lock().stamped = true;
        source
    }

    /// Append a device; its index is its position in the list.
    pub fn with_device<U: Into<String>, N: Into<String>>(
        self,
        uuid: U,
        name: N,
        readings: MockReadings,
    ) -> Self {
        {
            let mut state = self.state.lock();
            let index = state.devices.len() as u32;
            state.devices.push(MockDevice {
                device: Device::new(index, uuid, name),
                readings,
            });
        }
        self
    }

    /// Sleep inside every query, to widen race windows in tests
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = Some(delay);
        self
    }

    pub fn fail_enumeration<S: Into<String>>(self, msg: S) -> Self {
        self.state.lock().enumerate_error = Some(msg.into());
        self
    }

    /// Make `query` fail on device `index` until `recover` is called
    pub fn fail_on(&self, index: u32, query: Query) {
        self.state.lock().failures.insert(index, query);
    }

    pub fn recover(&self, index: u32) {
        self.state.lock().failures.remove(&index);
    }

    /// Every `(device index, query)` served so far, in call order
    pub fn calls(&self) -> Vec<(u32, Query)> {
        self.state.lock().calls.clone()
    }

    /// Number of queries running right now
    pub fn queries_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of queries that were running at the same instant
    pub fn max_concurrent_queries(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn query<T>(
        &self,
        device: &Device,
        query: Query,
        read: impl FnOnce(&MockReadings, Option<u64>) -> T,
    ) -> Result<T> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        if let Some(delay) = self.query_delay {
            std::thread::sleep(delay);
        }

        let result = {
            let mut state = self.state.lock();
            state.calls.push((device.index, query));

            if state.stamped && device.index == 0 && query == Query::Utilization {
                state.generation += 1;
            }

            if state.failures.get(&device.index) == Some(&query) {
                Err(ExporterError::query(
                    device.uuid.clone(),
                    query,
                    "injected failure",
                ))
            } else {
                let stamp = state.stamped.then_some(state.generation);
                match state.devices.get(device.index as usize) {
                    Some(mock) => Ok(read(&mock.readings, stamp)),
                    None => Err(ExporterError::query(
                        device.uuid.clone(),
                        query,
                        "no such device",
                    )),
                }
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl DeviceSource for MockDeviceSource {
    fn enumerate(&mut self) -> Result<Vec<Device>> {
        let state = self.state.lock();
        if let Some(msg) = &state.enumerate_error {
            return Err(ExporterError::initialization(msg.clone()));
        }
        Ok(state.devices.iter().map(|d| d.device.clone()).collect())
    }

    fn utilization(&mut self, device: &Device) -> Result<Utilization> {
        self.query(device, Query::Utilization, |r, stamp| match stamp {
            Some(n) => Utilization {
                gpu_percent: n as u32,
                memory_percent: n as u32,
            },
            None => r.utilization,
        })
    }

    fn temperature(&mut self, device: &Device) -> Result<u32> {
        self.query(device, Query::Temperature, |r, stamp| {
            stamp.map_or(r.temperature_celsius, |n| n as u32)
        })
    }

    fn power_usage(&mut self, device: &Device) -> Result<u32> {
        self.query(device, Query::PowerUsage, |r, stamp| {
            stamp.map_or(r.power_milliwatts, |n| n as u32 * 1000)
        })
    }

    fn fan_speed(&mut self, device: &Device) -> Result<u32> {
        self.query(device, Query::FanSpeed, |r, stamp| {
            stamp.map_or(r.fan_speed_percent, |n| n as u32)
        })
    }

    fn memory_info(&mut self, device: &Device) -> Result<MemoryInfo> {
        self.query(device, Query::MemoryInfo, |r, stamp| match stamp {
            Some(n) => MemoryInfo {
                free_bytes: n,
                total_bytes: n,
                used_bytes: n,
            },
            None => r.memory,
        })
    }
}
