//! Recording lifecycle.
//!
//! `Idle -> Recording -> Idle`. Starting and stopping return as soon as the
//! sink acknowledges; the outcome of each recording arrives later as exactly
//! one [`RecordingEvent::Finished`] or [`RecordingEvent::Failed`], followed by
//! [`RecordingEvent::Persisted`] once a finished file reaches the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use optica_common::classify::ErrorEvent;
use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::session::RecordingState;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};

use crate::backend::{CaptureCompletion, OutputSink, PersistenceSink};
use crate::events::EventBus;
use crate::library::DestinationAllocator;

pub type RecordingId = u64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RecordingEvent {
    Finished {
        recording: RecordingId,
        location: PathBuf,
        duration_secs: f64,
    },
    Failed {
        recording: RecordingId,
        error: ErrorEvent,
    },
    Persisted {
        recording: RecordingId,
        location: PathBuf,
    },
}

impl RecordingEvent {
    pub fn recording(&self) -> RecordingId {
        match self {
            RecordingEvent::Finished { recording, .. }
            | RecordingEvent::Failed { recording, .. }
            | RecordingEvent::Persisted { recording, .. } => *recording,
        }
    }
}

#[derive(Debug)]
struct Active {
    id: RecordingId,
    destination: PathBuf,
}

#[derive(Debug, Default)]
struct Inner {
    active: Option<Active>,
    next_id: RecordingId,
}

/// Drives an [`OutputSink`] through recordings and hands finished files to
/// a [`PersistenceSink`].
#[derive(Clone)]
pub struct RecordingLifecycle {
    sink: Arc<dyn OutputSink>,
    persistence: Arc<dyn PersistenceSink>,
    allocator: Arc<DestinationAllocator>,
    bus: EventBus,
    events: mpsc::UnboundedSender<RecordingEvent>,
    inner: Arc<Mutex<Inner>>,
    state: Arc<watch::Sender<RecordingState>>,
}

impl RecordingLifecycle {
    pub fn new(
        sink: Arc<dyn OutputSink>,
        persistence: Arc<dyn PersistenceSink>,
        allocator: Arc<DestinationAllocator>,
        bus: EventBus,
    ) -> (Self, mpsc::UnboundedReceiver<RecordingEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let (state, _) = watch::channel(RecordingState::Idle);
        let lifecycle = Self {
            sink,
            persistence,
            allocator,
            bus,
            events,
            inner: Arc::new(Mutex::new(Inner {
                active: None,
                next_id: 1,
            })),
            state: Arc::new(state),
        };
        (lifecycle, receiver)
    }

    pub fn state(&self) -> RecordingState {
        *self.state.borrow()
    }

    /// Destination of the recording in progress.
    pub async fn active_destination(&self) -> Option<PathBuf> {
        self.inner
            .lock()
            .await
            .active
            .as_ref()
            .map(|a| a.destination.clone())
    }

    /// Begin a recording. Returns `false` if one is already running.
    pub async fn start(&self) -> OpticaResult<bool> {
        let mut inner = self.inner.lock().await;
        if inner.active.is_some() {
            tracing::warn!("Recording already in progress");
            return Ok(false);
        }
        if !self.sink.is_attached() {
            let err = OpticaError::recording("output is not attached to the session");
            self.bus.report(&err);
            return Err(err);
        }

        let destination = self.allocator.allocate()?;
        let completion = match self.sink.start_capture(&destination).await {
            Ok(completion) => completion,
            Err(e) => {
                self.allocator.release(&destination);
                self.bus.report(&e);
                return Err(e);
            }
        };

        let id = inner.next_id;
        inner.next_id += 1;
        inner.active = Some(Active {
            id,
            destination: destination.clone(),
        });
        self.state.send_replace(RecordingState::Recording);
        tracing::info!(recording = id, destination = %destination.display(), "Recording started");

        let lifecycle = self.clone();
        tokio::spawn(async move {
            lifecycle
                .complete(id, destination, Utc::now(), completion)
                .await;
        });
        Ok(true)
    }

    /// Ask the running recording to stop. Returns `false` if none is running,
    /// including when the output already ended it on its own.
    ///
    /// The outcome arrives on the event channel.
    pub async fn stop(&self) -> OpticaResult<bool> {
        let mut inner = self.inner.lock().await;
        let Some(id) = inner.active.as_ref().map(|a| a.id) else {
            tracing::warn!("No recording in progress");
            return Ok(false);
        };

        // The output may have ended the capture on its own before this call.
        let ended_by_output = if self.sink.is_capturing() {
            match self.sink.stop_capture().await {
                Ok(()) => false,
                Err(_) if !self.sink.is_capturing() => true,
                Err(e) => {
                    self.bus.report(&e);
                    return Err(e);
                }
            }
        } else {
            true
        };

        inner.active = None;
        self.state.send_replace(RecordingState::Idle);
        if ended_by_output {
            tracing::info!(recording = id, "Recording already ended by the output");
            return Ok(false);
        }
        tracing::info!(recording = id, "Recording stopped");
        Ok(true)
    }

    async fn complete(
        self,
        id: RecordingId,
        destination: PathBuf,
        started: DateTime<Utc>,
        completion: CaptureCompletion,
    ) {
        let outcome = completion.await.unwrap_or_else(|_| {
            Err(OpticaError::recording(
                "capture ended without reporting a result",
            ))
        });

        {
            let mut inner = self.inner.lock().await;
            if inner.active.as_ref().is_some_and(|a| a.id == id) {
                inner.active = None;
                self.state.send_replace(RecordingState::Idle);
                tracing::info!(recording = id, "Recording stopped by the output");
            }
        }

        let duration_secs = (Utc::now() - started).num_milliseconds() as f64 / 1000.0;
        match outcome {
            Ok(location) => {
                tracing::info!(
                    recording = id,
                    location = %location.display(),
                    duration_secs,
                    "Recording finished"
                );
                self.emit(RecordingEvent::Finished {
                    recording: id,
                    location: location.clone(),
                    duration_secs,
                });
                tokio::spawn(async move {
                    self.persist(id, &location, &destination).await;
                });
            }
            Err(e) => {
                let error = self.bus.report(&e);
                self.emit(RecordingEvent::Failed {
                    recording: id,
                    error,
                });
                self.allocator.release(&destination);
            }
        }
    }

    async fn persist(&self, id: RecordingId, location: &Path, destination: &Path) {
        match self.persistence.persist(location).await {
            Ok(stored) => {
                self.emit(RecordingEvent::Persisted {
                    recording: id,
                    location: stored,
                });
            }
            Err(e) => {
                let err = match e {
                    OpticaError::Persistence { .. } => e,
                    other => OpticaError::persistence(location, other.to_string()),
                };
                self.bus.report(&err);
            }
        }
        self.allocator.release(destination);
    }

    fn emit(&self, event: RecordingEvent) {
        if self.events.send(event).is_err() {
            tracing::debug!("Recording event receiver dropped");
        }
    }
}
