//! Configure a simulated device and make a short recording.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use optica_capture_engine::backend::{SimulatedDevice, SimulatedOutput};
use optica_capture_engine::{CaptureService, LibraryDirectory, RecordingEvent};
use optica_common::classify::ErrorKind;
use optica_common::config::AppConfig;
use optica_device_model::session::SessionTarget;

use super::load_topology;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn run(
    config: &AppConfig,
    topology: PathBuf,
    target: SessionTarget,
    duration_ms: u64,
) -> anyhow::Result<()> {
    let topology = load_topology(&topology)?;
    println!("Device: {} ({} lenses)", topology.name, topology.lenses.len());

    let device = Arc::new(SimulatedDevice::new(topology));
    let output = Arc::new(SimulatedOutput::new());
    let library = Arc::new(LibraryDirectory::from_config(&config.storage));
    println!("Library: {}", library.root().display());
    let (service, mut events) = CaptureService::start(config, device, output, library);
    let mut errors = service.subscribe_errors();

    println!(
        "Target: {} @ {} fps, zoom {}x, HDR {}, enhanced color {}, exposure {:+} EV",
        target.dimensions,
        target.frame_rate,
        target.zoom,
        target.hdr,
        target.enhanced_color,
        target.exposure_bias
    );
    let state = service.reconfigure(target).await?;
    while let Ok(event) = errors.try_recv() {
        println!("  warning: {} ({})", event.message, event.detail);
    }
    anyhow::ensure!(state.is_configured(), "Session has no active format after configuration");

    println!("Configured (generation {}):", state.generation);
    if let (Some(lens), Some(role)) = (&state.active_lens, state.active_role) {
        println!("  lens: {lens} ({role})");
    }
    if let Some(format) = &state.active_format {
        println!("  format: {format}");
    }
    if let Some(fps) = state.frame_rate {
        println!("  frame rate: {fps}");
    }
    println!(
        "  zoom: {}x logical, {:.3}x native",
        state.logical_zoom, state.native_zoom
    );
    println!("  HDR: {}", state.hdr_enabled);
    println!(
        "  exposure: {:+} EV, smooth autofocus {}",
        state.exposure_bias, state.smooth_autofocus
    );

    service.start_session().await?;
    service.start_recording().await?;
    if let Some(destination) = service.recorder().active_destination().await {
        println!("Recording to {}", destination.display());
    }
    tokio::time::sleep(Duration::from_millis(duration_ms)).await;
    service.stop_recording().await?;

    let deadline = tokio::time::sleep(EVENT_TIMEOUT);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                anyhow::bail!("Timed out waiting for the recording to finish");
            }
            Ok(error) = errors.recv() => {
                println!("  {:?}: {} ({})", error.severity, error.message, error.detail);
                if error.kind == ErrorKind::Persistence {
                    break;
                }
            }
            event = events.recv() => {
                let event = event.ok_or_else(|| anyhow::anyhow!("Recording event channel closed"))?;
                tracing::debug!(event = %serde_json::to_string(&event)?, "Recording event");

                match event {
                    RecordingEvent::Finished {
                        location,
                        duration_secs,
                        ..
                    } => println!(
                        "Recording finished: {} ({duration_secs:.2}s)",
                        location.display()
                    ),
                    RecordingEvent::Failed { error, .. } => {
                        anyhow::bail!("Recording failed: {}", error.detail)
                    }
                    RecordingEvent::Persisted { location, .. } => {
                        println!("Saved to library: {}", location.display());
                        break;
                    }
                }
            }
        }
    }

    service.stop_session().await?;
    service.shutdown().await;
    Ok(())
}
