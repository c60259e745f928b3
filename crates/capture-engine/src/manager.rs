//! Session configuration manager.
//!
//! Turns a [`SessionTarget`] into device settings in five ordered steps:
//! route the zoom to a lens, attach inputs, activate a format, attach the
//! output, and apply the native zoom. Steps two through five run inside a
//! [`Transaction`]; any failure rolls them back and leaves the last
//! committed [`SessionState`] in place.

use std::collections::BTreeSet;
use std::sync::Arc;

use optica_common::config::ScoringConfig;
use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::lens::{LensRole, Topology, ZoomCrossoverTable};
use optica_device_model::session::{RecordingState, SessionState, SessionTarget};
use optica_negotiation::ranking::FormatRanker;
use optica_negotiation::scoring::FormatScorer;
use optica_negotiation::selection::select;
use optica_negotiation::zoom::{compute_weights, route, ZoomWeightTable};
use tokio::sync::watch;

use crate::backend::{CaptureDevice, OutputSink};
use crate::events::EventBus;
use crate::recorder::RecordingLifecycle;
use crate::transaction::Transaction;

/// Zoom weights for the topology they were computed from.
#[derive(Debug, Clone)]
struct WeightSnapshot {
    roles: BTreeSet<LensRole>,
    crossover: ZoomCrossoverTable,
    table: ZoomWeightTable,
}

impl WeightSnapshot {
    fn matches(&self, topology: &Topology) -> bool {
        self.roles == topology.roles() && self.crossover == topology.crossover
    }
}

pub struct ConfigurationManager {
    device: Arc<dyn CaptureDevice>,
    output: Arc<dyn OutputSink>,
    ranker: FormatRanker,
    bus: EventBus,
    state: watch::Sender<SessionState>,
    recorder: Option<RecordingLifecycle>,
    weights: Option<WeightSnapshot>,
}

impl ConfigurationManager {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        output: Arc<dyn OutputSink>,
        scoring: &ScoringConfig,
        bus: EventBus,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            device,
            output,
            ranker: FormatRanker::new(FormatScorer::new(scoring.frame_rate_policy)),
            bus,
            state,
            recorder: None,
            weights: None,
        }
    }

    /// Share the session with a recorder; reconfiguration is refused while
    /// it is capturing.
    pub fn with_recorder(mut self, recorder: RecordingLifecycle) -> Self {
        self.recorder = Some(recorder);
        self
    }

    pub fn recorder(&self) -> Option<&RecordingLifecycle> {
        self.recorder.as_ref()
    }

    fn recording_state(&self) -> RecordingState {
        self.recorder
            .as_ref()
            .map(RecordingLifecycle::state)
            .unwrap_or_default()
    }

    /// Last committed state.
    pub fn state(&self) -> SessionState {
        let mut state = self.state.borrow().clone();
        state.recording = self.recording_state();
        state
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Weight table of the last routed topology.
    pub fn weights(&self) -> Option<&ZoomWeightTable> {
        self.weights.as_ref().map(|snapshot| &snapshot.table)
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Apply a target; on failure the error is published and nothing changes.
    pub fn reconfigure(&mut self, target: &SessionTarget) -> OpticaResult<SessionState> {
        match self.try_reconfigure(target) {
            Ok((state, warnings)) => {
                for warning in &warnings {
                    self.bus.report(warning);
                }
                self.state.send_replace(state.clone());
                tracing::info!(
                    generation = state.generation,
                    lens = ?state.active_lens,
                    role = ?state.active_role,
                    frame_rate = ?state.frame_rate,
                    logical_zoom = state.logical_zoom,
                    native_zoom = state.native_zoom,
                    hdr = state.hdr_enabled,
                    warnings = warnings.len(),
                    "Session reconfigured"
                );
                Ok(state)
            }
            Err(e) => {
                self.bus.report(&e);
                Err(e)
            }
        }
    }

    fn try_reconfigure(
        &mut self,
        target: &SessionTarget,
    ) -> OpticaResult<(SessionState, Vec<OpticaError>)> {
        let recording = self.recording_state();
        if recording == RecordingState::Recording {
            return Err(OpticaError::session_busy(
                "cannot reconfigure while a recording is in progress",
            ));
        }

        // Step 1: route zoom to a lens. Nothing is touched yet.
        let topology = self.device.topology()?;
        let weights = self.refresh_weights(&topology)?;
        let zoom = route(target.zoom, &weights)?;
        let lens = topology
            .lens(zoom.role)
            .ok_or_else(|| OpticaError::LensTopologyUnsupported {
                role: zoom.role.to_string(),
            })?;
        if zoom.native_factor > lens.max_zoom_factor {
            return Err(OpticaError::ZoomRange {
                logical: target.zoom,
                native: zoom.native_factor,
                max: lens.max_zoom_factor,
            });
        }
        tracing::debug!(
            device = self.device.name(),
            lens = %lens.id,
            role = %zoom.role,
            native = zoom.native_factor,
            "Routed zoom"
        );

        let mut warnings = Vec::new();
        let mut tx = Transaction::begin(self.device.as_ref(), self.output.as_ref());

        // Step 2: inputs.
        if let Err(e) = tx.attach_video_input(&lens.id) {
            tx.rollback();
            return Err(e);
        }
        if let Some(microphone) = topology.microphone.as_deref() {
            if let Err(e) = tx.attach_audio_input(microphone) {
                tx.rollback();
                return Err(e);
            }
        }

        // Step 3: format, frame rate, HDR, then exposure and focus controls.
        let selection = self
            .ranker
            .rank_lens(lens, target.enhanced_color)
            .and_then(|ranked| select(&ranked, target.dimensions, target.frame_rate));
        let selection = match selection {
            Ok(selection) => selection,
            Err(e) => {
                tx.rollback();
                return Err(e);
            }
        };
        let (scored, degraded) = selection.into_parts();
        let format = scored.format;
        let frame_rate = match degraded {
            Some(warning) => {
                warnings.push(warning);
                format.frame_rate_range.clamp(target.frame_rate)
            }
            None => target.frame_rate,
        };
        match tx.apply_format(&lens.id, &format, frame_rate, target.hdr) {
            Ok(Some(warning)) => warnings.push(warning),
            Ok(None) => {}
            Err(e) => {
                tx.rollback();
                return Err(e);
            }
        }
        let (exposure_bias, smooth_autofocus) =
            match tx.apply_controls(lens, target.exposure_bias, target.smooth_autofocus) {
                Ok(applied) => applied,
                Err(e) => {
                    tx.rollback();
                    return Err(e);
                }
            };

        // Step 4: output.
        if let Err(e) = tx.attach_output() {
            tx.rollback();
            return Err(e);
        }

        // Step 5: zoom.
        if let Err(e) = tx.apply_zoom(&lens.id, zoom.native_factor) {
            tx.rollback();
            return Err(e);
        }

        tx.commit();

        let generation = self.state.borrow().generation + 1;
        let hdr_enabled = target.hdr && format.hdr_supported;
        let state = SessionState {
            active_lens: Some(lens.id.clone()),
            active_role: Some(zoom.role),
            active_format: Some(format),
            frame_rate: Some(frame_rate),
            logical_zoom: target.zoom,
            native_zoom: zoom.native_factor,
            hdr_enabled,
            exposure_bias,
            smooth_autofocus,
            recording,
            generation,
        };
        Ok((state, warnings))
    }

    fn refresh_weights(&mut self, topology: &Topology) -> OpticaResult<ZoomWeightTable> {
        if let Some(snapshot) = self.weights.as_ref().filter(|s| s.matches(topology)) {
            return Ok(snapshot.table.clone());
        }

        tracing::debug!(
            lenses = topology.lenses.len(),
            crossover = ?topology.crossover.factors(),
            "Lens topology changed, recomputing zoom weights"
        );
        let roles = topology.roles();
        let table = compute_weights(&roles, &topology.crossover)?;
        self.weights = Some(WeightSnapshot {
            roles,
            crossover: topology.crossover.clone(),
            table: table.clone(),
        });
        Ok(table)
    }

    /// Start frames flowing. Returns `false` if already running.
    pub fn start_running(&self) -> OpticaResult<bool> {
        if self.device.is_running() {
            tracing::warn!(device = self.device.name(), "Session already running");
            return Ok(false);
        }
        if let Err(e) = self.device.start_running() {
            self.bus.report(&e);
            return Err(e);
        }
        tracing::info!(device = self.device.name(), "Session started");
        Ok(true)
    }

    /// Stop frames flowing. Returns `false` if not running.
    pub fn stop_running(&self) -> OpticaResult<bool> {
        if !self.device.is_running() {
            tracing::warn!(device = self.device.name(), "Session not running");
            return Ok(false);
        }
        if let Err(e) = self.device.stop_running() {
            self.bus.report(&e);
            return Err(e);
        }
        tracing::info!(device = self.device.name(), "Session stopped");
        Ok(true)
    }
}
