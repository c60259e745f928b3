//! Wiring of session worker, recorder and event bus.

use std::sync::Arc;

use optica_common::classify::ErrorEvent;
use optica_common::config::{AppConfig, SessionDefaults};
use optica_common::error::OpticaResult;
use optica_device_model::format::Dimensions;
use optica_device_model::session::{SessionState, SessionTarget};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::backend::{CaptureDevice, OutputSink, PersistenceSink};
use crate::events::EventBus;
use crate::library::DestinationAllocator;
use crate::manager::ConfigurationManager;
use crate::recorder::{RecordingEvent, RecordingLifecycle};
use crate::worker::SessionHandle;

/// Session target built from configured defaults.
pub fn default_target(defaults: &SessionDefaults) -> SessionTarget {
    SessionTarget {
        dimensions: Dimensions::new(defaults.width, defaults.height),
        frame_rate: defaults.frame_rate,
        zoom: defaults.zoom,
        enhanced_color: defaults.enhanced_color,
        hdr: defaults.hdr,
        exposure_bias: defaults.exposure_bias,
        smooth_autofocus: defaults.smooth_autofocus,
    }
}

/// One capture device with its recorder.
pub struct CaptureService {
    session: SessionHandle,
    recorder: RecordingLifecycle,
    allocator: Arc<DestinationAllocator>,
    bus: EventBus,
    defaults: SessionTarget,
    worker: JoinHandle<()>,
}

impl CaptureService {
    /// Spawn the session worker. Must be called inside a runtime.
    pub fn start(
        config: &AppConfig,
        device: Arc<dyn CaptureDevice>,
        output: Arc<dyn OutputSink>,
        persistence: Arc<dyn PersistenceSink>,
    ) -> (Self, mpsc::UnboundedReceiver<RecordingEvent>) {
        let bus = EventBus::default();
        let allocator = Arc::new(DestinationAllocator::from_config(&config.storage));
        let (recorder, events) =
            RecordingLifecycle::new(output.clone(), persistence, allocator.clone(), bus.clone());

        let manager = ConfigurationManager::new(device, output, &config.scoring, bus.clone())
            .with_recorder(recorder.clone());
        let (session, worker) = SessionHandle::spawn(manager);

        tracing::debug!(policy = ?config.scoring.frame_rate_policy, "Capture service started");
        let service = Self {
            session,
            recorder,
            allocator,
            bus,
            defaults: default_target(&config.session),
            worker,
        };
        (service, events)
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn recorder(&self) -> &RecordingLifecycle {
        &self.recorder
    }

    pub async fn reconfigure(&self, target: SessionTarget) -> OpticaResult<SessionState> {
        self.session.reconfigure(target).await
    }

    /// Reconfigure with the configured defaults.
    pub async fn configure_defaults(&self) -> OpticaResult<SessionState> {
        self.session.reconfigure(self.defaults.clone()).await
    }

    pub async fn start_session(&self) -> OpticaResult<bool> {
        self.session.start_running().await
    }

    pub async fn stop_session(&self) -> OpticaResult<bool> {
        self.session.stop_running().await
    }

    pub async fn start_recording(&self) -> OpticaResult<bool> {
        self.session.start_recording().await
    }

    pub async fn stop_recording(&self) -> OpticaResult<bool> {
        self.session.stop_recording().await
    }

    pub fn subscribe_errors(&self) -> broadcast::Receiver<ErrorEvent> {
        self.bus.subscribe()
    }

    /// Committed session state with the live recording state.
    pub fn snapshot(&self) -> SessionState {
        let mut state = self.session.state();
        state.recording = self.recorder.state();
        state
    }

    /// Stop the worker after queued commands finish.
    pub async fn shutdown(self) {
        let Self {
            session,
            worker,
            allocator,
            ..
        } = self;
        drop(session);
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Session worker ended abnormally");
        }
        let pending = allocator.pending();
        if pending > 0 {
            tracing::warn!(pending, "Shutting down with recordings not yet in the library");
        }
    }
}
