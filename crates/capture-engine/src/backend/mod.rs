//! Capture backend abstractions.
//!
//! [`CaptureDevice`] covers lenses and session control. [`OutputSink`] writes
//! recordings and [`PersistenceSink`] takes the finished files.
//! [`simulated`] has in-memory devices and outputs for tests and the CLI.

use std::path::{Path, PathBuf};

use optica_common::error::OpticaResult;
use optica_device_model::format::FormatDescriptor;
use optica_device_model::lens::{LensId, Topology};
use tokio::sync::oneshot;

pub mod simulated;

pub use simulated::{Fault, SimulatedDevice, SimulatedOutput};

/// Resolves once a capture-to-file operation has ended, with the finished
/// file or the fault that ended it.
pub type CaptureCompletion = oneshot::Receiver<OpticaResult<PathBuf>>;

/// Abstract interface to the camera hardware session.
///
/// Property setters must only be called while the lens is locked for
/// configuration (see [`crate::lock::ConfigurationLock`]); implementations
/// may reject unlocked mutations.
pub trait CaptureDevice: Send + Sync {
    /// Device name for logging.
    fn name(&self) -> &str;

    /// Enumerate the lenses currently present, their formats, the zoom
    /// crossover table, and the microphone.
    fn topology(&self) -> OpticaResult<Topology>;

    /// Acquire exclusive configuration access to a lens.
    fn lock_for_configuration(&self, lens: &LensId) -> OpticaResult<()>;

    /// Release configuration access taken by `lock_for_configuration`.
    fn unlock_for_configuration(&self, lens: &LensId);

    /// Lens currently attached as the video input.
    fn video_input(&self) -> Option<LensId>;

    fn attach_video_input(&self, lens: &LensId) -> OpticaResult<()>;

    fn detach_video_input(&self);

    /// Microphone currently attached as the audio input.
    fn audio_input(&self) -> Option<String>;

    fn attach_audio_input(&self, microphone: &str) -> OpticaResult<()>;

    fn detach_audio_input(&self);

    fn active_format(&self, lens: &LensId) -> Option<FormatDescriptor>;

    fn set_active_format(&self, lens: &LensId, format: &FormatDescriptor) -> OpticaResult<()>;

    /// Return the lens to having no explicitly selected format, dropping
    /// the frame rate and HDR settings that belonged to it.
    fn clear_active_format(&self, lens: &LensId) -> OpticaResult<()>;

    fn frame_rate(&self, lens: &LensId) -> Option<f64>;

    fn set_frame_rate(&self, lens: &LensId, fps: f64) -> OpticaResult<()>;

    fn hdr_enabled(&self, lens: &LensId) -> bool;

    fn set_hdr_enabled(&self, lens: &LensId, enabled: bool) -> OpticaResult<()>;

    fn zoom_factor(&self, lens: &LensId) -> f64;

    fn set_zoom_factor(&self, lens: &LensId, factor: f64) -> OpticaResult<()>;

    /// Exposure compensation in EV.
    fn exposure_bias(&self, lens: &LensId) -> f64;

    fn set_exposure_bias(&self, lens: &LensId, bias: f64) -> OpticaResult<()>;

    fn smooth_autofocus(&self, lens: &LensId) -> bool;

    fn set_smooth_autofocus(&self, lens: &LensId, enabled: bool) -> OpticaResult<()>;

    /// Whether frames are flowing through the session.
    fn is_running(&self) -> bool;

    fn start_running(&self) -> OpticaResult<()>;

    fn stop_running(&self) -> OpticaResult<()>;
}

/// Recording destination attached to the session.
#[async_trait::async_trait]
pub trait OutputSink: Send + Sync {
    fn is_attached(&self) -> bool;

    /// Attach the sink to the session.
    fn attach(&self) -> OpticaResult<()>;

    fn detach(&self);

    /// Whether a capture is running right now. Turns false as soon as a
    /// capture ends, including when it ends on its own.
    fn is_capturing(&self) -> bool;

    /// Begin capturing to `destination`.
    ///
    /// Returns as soon as capture is running; the returned receiver resolves
    /// after the capture stops, whether through [`OutputSink::stop_capture`]
    /// or on its own (e.g. the disk filled up).
    async fn start_capture(&self, destination: &Path) -> OpticaResult<CaptureCompletion>;

    /// Ask the running capture to stop and finalize its file.
    async fn stop_capture(&self) -> OpticaResult<()>;
}

/// Long-term storage for finished recordings.
#[async_trait::async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Hand a finished file over; returns where it now lives.
    async fn persist(&self, media: &Path) -> OpticaResult<PathBuf>;
}
