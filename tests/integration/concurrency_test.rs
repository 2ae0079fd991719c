use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use nvml_exporter::core::exporter::{FailurePolicy, GpuExporter, GpuMetric};
use nvml_exporter::platform::gpu::MockDeviceSource;
use prometheus::core::Collector;

use super::support::{registry_for, scrape, Scrape};

const SCRAPERS: usize = 8;
const DEVICES: u32 = 2;

fn assert_single_cycle(scrape: &Scrape) {
    assert_eq!(scrape.up(), 1.0);
    assert_eq!(
        scrape.samples.len(),
        GpuMetric::ALL.len() * DEVICES as usize + 1
    );

    // Stamped readings carry the cycle number; Fahrenheit is derived from it
    let stamps: Vec<f64> = scrape
        .samples
        .iter()
        .filter(|s| s.name != "nvml_up" && s.name != "nvml_temperature_fahrenheit")
        .map(|s| s.value)
        .collect();
    let first = stamps[0];
    assert!(
        stamps.iter().all(|v| *v == first),
        "snapshot mixes cycles: {:?}",
        stamps
    );
}

#[test]
fn test_concurrent_scrapes_are_serialized() {
    let source = MockDeviceSource::stamped(DEVICES).with_query_delay(Duration::from_millis(2));
    let control = source.clone();
    let registry = registry_for(source, FailurePolicy::AbortCycle);

    let handles: Vec<_> = (0..SCRAPERS)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || scrape(&registry))
        })
        .collect();

    let mut stamps = Vec::new();
    for handle in handles {
        let scrape = handle.join().unwrap();
        assert_single_cycle(&scrape);
        stamps.push(scrape.value("nvml_gpu_percent", Some("0")).unwrap() as u64);
    }

    assert_eq!(control.max_concurrent_queries(), 1);

    // Every scrape ran its own cycle
    stamps.sort_unstable();
    stamps.dedup();
    assert_eq!(stamps.len(), SCRAPERS);
}

#[test]
fn test_describe_does_not_wait_for_collect() {
    let source = MockDeviceSource::stamped(DEVICES).with_query_delay(Duration::from_millis(200));
    let control = source.clone();
    let exporter = Arc::new(GpuExporter::new(Box::new(source)).unwrap());

    let collecting = {
        let exporter = Arc::clone(&exporter);
        thread::spawn(move || exporter.collect())
    };

    // A running query means collect() holds the source lock
    let deadline = Instant::now() + Duration::from_secs(5);
    while control.queries_in_flight() == 0 {
        assert!(Instant::now() < deadline, "collect never started querying");
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(exporter.desc().len(), GpuMetric::ALL.len() + 1);
    assert_eq!(control.queries_in_flight(), 1);
    assert!(!collecting.is_finished());

    let families = collecting.join().unwrap();
    assert_eq!(families.len(), GpuMetric::ALL.len() + 1);
}
