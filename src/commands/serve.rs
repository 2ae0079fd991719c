//! Exporter command handler.
//!
//! Initializes the device layer, registers the collector and serves HTTP
//! until Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use prometheus::Registry;

use crate::core::config::ExporterConfig;
use crate::core::exporter::{DeviceSource, GpuExporter};
use crate::platform::gpu::{MockDeviceSource, NvmlDeviceSource, NvmlHandle};
use crate::server;

/// Execute the exporter
pub fn execute(config: ExporterConfig) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("nvml-exporter")
        .build()
        .context("Failed to build tokio runtime")?;

    let (source, nvml) = open_device_source(config.use_mock)?;

    let result = runtime.block_on(serve(config, source));

    // The registry (and with it the device source) is gone once serve returns
    if let Some(handle) = nvml {
        match handle.shutdown() {
            Ok(()) => log::info!("NVML shut down"),
            Err(e) => log::error!("{}", e),
        }
    }

    result
}

fn open_device_source(use_mock: bool) -> Result<(Box<dyn DeviceSource>, Option<NvmlHandle>)> {
    if use_mock {
        log::warn!("Serving readings from a mock GPU, NVML is not used");
        let source: Box<dyn DeviceSource> = Box::new(MockDeviceSource::demo());
        return Ok((source, None));
    }

    let (source, handle) = NvmlDeviceSource::init().context("Failed initializing exporter")?;
    let source: Box<dyn DeviceSource> = Box::new(source);
    Ok((source, Some(handle)))
}

async fn serve(config: ExporterConfig, source: Box<dyn DeviceSource>) -> Result<()> {
    let exporter = GpuExporter::with_policy(source, config.failure_policy)
        .context("Failed initializing exporter")?;

    log::info!(
        "Found {} GPU(s), failure policy: {}",
        exporter.devices().len(),
        exporter.policy()
    );
    for device in exporter.devices() {
        log::info!("  GPU {}: {} ({})", device.index, device.name, device.uuid);
    }

    let registry = Registry::new();
    registry
        .register(Box::new(exporter))
        .context("Failed to register GPU collector")?;

    let app = server::router(registry, &config.telemetry_path);

    let listener = tokio::net::TcpListener::bind(config.listen_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_address))?;

    log::info!(
        "Starting NVML Exporter Server: {} (metrics at {})",
        config.listen_address,
        config.telemetry_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    log::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            // Without a signal handler, keep serving until the process is killed
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    log::info!("Shutdown requested");
}
