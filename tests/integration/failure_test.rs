use nvml_exporter::core::exporter::{FailurePolicy, GpuMetric, Query};

use super::support::{fleet, registry_for, scrape};

/// Metrics written by `query` once it succeeds
fn written_by(query: Query) -> &'static [GpuMetric] {
    match query {
        Query::Utilization => &[GpuMetric::GpuPercent, GpuMetric::MemoryPercent],
        Query::Temperature => &[
            GpuMetric::TemperatureCelsius,
            GpuMetric::TemperatureFahrenheit,
        ],
        Query::PowerUsage => &[GpuMetric::PowerWatts],
        Query::FanSpeed => &[GpuMetric::FanSpeed],
        Query::MemoryInfo => &[
            GpuMetric::MemoryFree,
            GpuMetric::MemoryTotal,
            GpuMetric::MemoryUsed,
        ],
    }
}

fn metrics_before(step: Query) -> Vec<GpuMetric> {
    Query::ORDER
        .iter()
        .take_while(|q| **q != step)
        .flat_map(|q| written_by(*q).iter().copied())
        .collect()
}

#[test]
fn test_abort_keeps_prefix_and_skips_later_devices() {
    const DEVICES: u32 = 3;

    for failing in 0..DEVICES {
        for step in Query::ORDER {
            let source = fleet(DEVICES);
            source.fail_on(failing, step);
            let control = source.clone();
            let registry = registry_for(source, FailurePolicy::AbortCycle);

            let scrape = scrape(&registry);
            assert_eq!(scrape.up(), 0.0, "device {} step {}", failing, step);

            for earlier in 0..failing {
                assert_eq!(
                    scrape.device_samples(&earlier.to_string()).len(),
                    GpuMetric::ALL.len()
                );
            }

            let expected = metrics_before(step);
            let id = failing.to_string();
            assert_eq!(scrape.device_samples(&id).len(), expected.len());
            for metric in &expected {
                assert!(
                    scrape.value(&metric.exported_name(), Some(&id)).is_some(),
                    "device {} step {} missing {:?}",
                    failing,
                    step,
                    metric
                );
            }

            for later in failing + 1..DEVICES {
                assert!(scrape.device_samples(&later.to_string()).is_empty());
                assert!(control.calls().iter().all(|(index, _)| *index != later));
            }
        }
    }
}

#[test]
fn test_failing_query_is_the_last_one_issued() {
    let source = fleet(2);
    source.fail_on(0, Query::Temperature);
    let control = source.clone();
    let registry = registry_for(source, FailurePolicy::AbortCycle);

    scrape(&registry);

    assert_eq!(
        control.calls(),
        vec![(0, Query::Utilization), (0, Query::Temperature)]
    );
}

#[test]
fn test_skip_device_policy_polls_remaining_devices() {
    let source = fleet(3);
    source.fail_on(1, Query::FanSpeed);
    let registry = registry_for(source, FailurePolicy::SkipDevice);

    let scrape = scrape(&registry);

    assert_eq!(scrape.up(), 0.0);
    assert_eq!(scrape.device_samples("0").len(), GpuMetric::ALL.len());
    assert_eq!(
        scrape.device_samples("1").len(),
        metrics_before(Query::FanSpeed).len()
    );
    assert_eq!(scrape.device_samples("2").len(), GpuMetric::ALL.len());
}

#[test]
fn test_health_recovers_on_next_cycle() {
    let source = fleet(1);
    let control = source.clone();
    let registry = registry_for(source, FailurePolicy::AbortCycle);

    control.fail_on(0, Query::MemoryInfo);
    assert_eq!(scrape(&registry).up(), 0.0);

    control.recover(0);
    assert_eq!(scrape(&registry).up(), 1.0);
}
