//! In-memory capture backends.
//!
//! `SimulatedDevice` models a multi-lens camera from a [`Topology`] and
//! enforces the same rules a real device does: property changes need the
//! configuration lock, formats must come from the lens catalog, and zoom
//! must stay within the lens range. An injected fault fails the next call
//! of its operation and is then cleared.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::format::FormatDescriptor;
use optica_device_model::lens::{LensDescriptor, LensId, Topology};
use tokio::sync::oneshot;

use super::{CaptureCompletion, CaptureDevice, OutputSink};

/// Operations that can be made to fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    VideoAttach,
    AudioAttach,
    Lock,
    Format,
    Zoom,
    Exposure,
    OutputAttach,
    CaptureStart,
}

#[derive(Debug, Default, Clone)]
struct LensSettings {
    format: Option<FormatDescriptor>,
    frame_rate: Option<f64>,
    hdr: bool,
    zoom: Option<f64>,
    exposure_bias: Option<f64>,
    smooth_autofocus: bool,
}

#[derive(Debug)]
struct DeviceState {
    topology: Topology,
    video_input: Option<LensId>,
    audio_input: Option<String>,
    settings: HashMap<LensId, LensSettings>,
    locked: HashSet<LensId>,
    lock_balance: i64,
    lock_count: u64,
    running: bool,
    faults: HashSet<Fault>,
}

/// Simulated multi-lens capture device.
#[derive(Debug)]
pub struct SimulatedDevice {
    name: String,
    state: Mutex<DeviceState>,
}

impl SimulatedDevice {
    pub fn new(topology: Topology) -> Self {
        let name = if topology.name.is_empty() {
            "simulated".to_string()
        } else {
            topology.name.clone()
        };
        Self {
            name,
            state: Mutex::new(DeviceState {
                topology,
                video_input: None,
                audio_input: None,
                settings: HashMap::new(),
                locked: HashSet::new(),
                lock_balance: 0,
                lock_count: 0,
                running: false,
                faults: HashSet::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replace the lens topology, as when a lens becomes unavailable.
    pub fn set_topology(&self, topology: Topology) {
        self.state().topology = topology;
    }

    pub fn inject(&self, fault: Fault) {
        self.state().faults.insert(fault);
    }

    pub fn clear(&self, fault: Fault) {
        self.state().faults.remove(&fault);
    }

    /// Locks taken minus locks released; zero when every guard was dropped.
    pub fn lock_balance(&self) -> i64 {
        self.state().lock_balance
    }

    /// Total number of successful lock acquisitions.
    pub fn lock_count(&self) -> u64 {
        self.state().lock_count
    }
}

impl DeviceState {
    fn take_fault(&mut self, fault: Fault) -> bool {
        self.faults.remove(&fault)
    }

    fn require_lock(&self, lens: &LensId) -> OpticaResult<()> {
        if self.locked.contains(lens) {
            Ok(())
        } else {
            Err(OpticaError::device_lock(
                lens.as_str(),
                "property change without configuration lock",
            ))
        }
    }

    fn lens(&self, lens: &LensId) -> OpticaResult<&LensDescriptor> {
        self.topology
            .lens_by_id(lens)
            .ok_or_else(|| OpticaError::device_lock(lens.as_str(), "lens is not present"))
    }

    fn settings(&mut self, lens: &LensId) -> &mut LensSettings {
        self.settings.entry(lens.clone()).or_default()
    }
}

impl CaptureDevice for SimulatedDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn topology(&self) -> OpticaResult<Topology> {
        Ok(self.state().topology.clone())
    }

    fn lock_for_configuration(&self, lens: &LensId) -> OpticaResult<()> {
        let mut state = self.state();
        if state.take_fault(Fault::Lock) {
            return Err(OpticaError::device_lock(lens.as_str(), "injected lock fault"));
        }
        state.lens(lens)?;
        if !state.locked.insert(lens.clone()) {
            return Err(OpticaError::device_lock(lens.as_str(), "already locked"));
        }
        state.lock_balance += 1;
        state.lock_count += 1;
        Ok(())
    }

    fn unlock_for_configuration(&self, lens: &LensId) {
        let mut state = self.state();
        if state.locked.remove(lens) {
            state.lock_balance -= 1;
        } else {
            tracing::warn!(lens = %lens, "Unlock without matching lock");
        }
    }

    fn video_input(&self) -> Option<LensId> {
        self.state().video_input.clone()
    }

    fn attach_video_input(&self, lens: &LensId) -> OpticaResult<()> {
        let mut state = self.state();
        if state.take_fault(Fault::VideoAttach) {
            return Err(OpticaError::resource_attach(
                format!("video input {lens}"),
                "injected attach fault",
            ));
        }
        state
            .lens(lens)
            .map_err(|e| OpticaError::resource_attach(format!("video input {lens}"), e.to_string()))?;
        if let Some(current) = &state.video_input {
            if current != lens {
                return Err(OpticaError::resource_attach(
                    format!("video input {lens}"),
                    format!("{current} is still attached"),
                ));
            }
        }
        state.video_input = Some(lens.clone());
        Ok(())
    }

    fn detach_video_input(&self) {
        self.state().video_input = None;
    }

    fn audio_input(&self) -> Option<String> {
        self.state().audio_input.clone()
    }

    fn attach_audio_input(&self, microphone: &str) -> OpticaResult<()> {
        let mut state = self.state();
        if state.take_fault(Fault::AudioAttach) {
            return Err(OpticaError::resource_attach(
                format!("audio input {microphone}"),
                "injected attach fault",
            ));
        }
        if state.topology.microphone.as_deref() != Some(microphone) {
            return Err(OpticaError::resource_attach(
                format!("audio input {microphone}"),
                "microphone is not present",
            ));
        }
        state.audio_input = Some(microphone.to_string());
        Ok(())
    }

    fn detach_audio_input(&self) {
        self.state().audio_input = None;
    }

    fn active_format(&self, lens: &LensId) -> Option<FormatDescriptor> {
        self.state().settings.get(lens).and_then(|s| s.format.clone())
    }

    fn set_active_format(&self, lens: &LensId, format: &FormatDescriptor) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        if state.take_fault(Fault::Format) {
            return Err(OpticaError::device_lock(lens.as_str(), "injected format fault"));
        }
        if !state.lens(lens)?.formats.contains(format) {
            return Err(OpticaError::device_lock(
                lens.as_str(),
                format!("format {format} is not in the lens catalog"),
            ));
        }
        let settings = state.settings(lens);
        settings.format = Some(format.clone());
        // Switching formats resets rate and HDR to the device defaults.
        settings.frame_rate = None;
        settings.hdr = false;
        Ok(())
    }

    fn clear_active_format(&self, lens: &LensId) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        let settings = state.settings(lens);
        settings.format = None;
        settings.frame_rate = None;
        settings.hdr = false;
        Ok(())
    }

    fn frame_rate(&self, lens: &LensId) -> Option<f64> {
        self.state().settings.get(lens).and_then(|s| s.frame_rate)
    }

    fn set_frame_rate(&self, lens: &LensId, fps: f64) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        let settings = state.settings(lens);
        let format = settings.format.as_ref().ok_or_else(|| {
            OpticaError::device_lock(lens.as_str(), "no active format to set a frame rate on")
        })?;
        if !format.supports_frame_rate(fps) {
            return Err(OpticaError::FormatUnavailable {
                width: format.dimensions.width,
                height: format.dimensions.height,
                frame_rate: fps,
            });
        }
        settings.frame_rate = Some(fps);
        Ok(())
    }

    fn hdr_enabled(&self, lens: &LensId) -> bool {
        self.state().settings.get(lens).is_some_and(|s| s.hdr)
    }

    fn set_hdr_enabled(&self, lens: &LensId, enabled: bool) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        let settings = state.settings(lens);
        let supported = settings.format.as_ref().is_some_and(|f| f.hdr_supported);
        if enabled && !supported {
            return Err(OpticaError::HdrNotSupported {
                lens: lens.to_string(),
            });
        }
        settings.hdr = enabled;
        Ok(())
    }

    fn zoom_factor(&self, lens: &LensId) -> f64 {
        self.state()
            .settings
            .get(lens)
            .and_then(|s| s.zoom)
            .unwrap_or(1.0)
    }

    fn set_zoom_factor(&self, lens: &LensId, factor: f64) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        let max = state.lens(lens)?.max_zoom_factor;
        if state.take_fault(Fault::Zoom) || !(1.0..=max).contains(&factor) {
            return Err(OpticaError::ZoomRange {
                logical: factor,
                native: factor,
                max,
            });
        }
        state.settings(lens).zoom = Some(factor);
        Ok(())
    }

    fn exposure_bias(&self, lens: &LensId) -> f64 {
        self.state()
            .settings
            .get(lens)
            .and_then(|s| s.exposure_bias)
            .unwrap_or(0.0)
    }

    fn set_exposure_bias(&self, lens: &LensId, bias: f64) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        if state.take_fault(Fault::Exposure) {
            return Err(OpticaError::device_lock(lens.as_str(), "injected exposure fault"));
        }
        let range = state.lens(lens)?.controls.exposure_bias_range;
        if !range.contains(bias) {
            return Err(OpticaError::device_lock(
                lens.as_str(),
                format!("exposure bias {bias} outside {}..={}", range.min, range.max),
            ));
        }
        state.settings(lens).exposure_bias = Some(bias);
        Ok(())
    }

    fn smooth_autofocus(&self, lens: &LensId) -> bool {
        self.state()
            .settings
            .get(lens)
            .is_some_and(|s| s.smooth_autofocus)
    }

    fn set_smooth_autofocus(&self, lens: &LensId, enabled: bool) -> OpticaResult<()> {
        let mut state = self.state();
        state.require_lock(lens)?;
        if enabled && !state.lens(lens)?.controls.smooth_autofocus_supported {
            return Err(OpticaError::device_lock(
                lens.as_str(),
                "smooth autofocus is not supported",
            ));
        }
        state.settings(lens).smooth_autofocus = enabled;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.state().running
    }

    fn start_running(&self) -> OpticaResult<()> {
        let mut state = self.state();
        if state.video_input.is_none() {
            return Err(OpticaError::resource_attach("video input", "nothing attached"));
        }
        state.running = true;
        Ok(())
    }

    fn stop_running(&self) -> OpticaResult<()> {
        self.state().running = false;
        Ok(())
    }
}

struct ActiveCapture {
    destination: PathBuf,
    done: oneshot::Sender<OpticaResult<PathBuf>>,
}

/// Simulated file output: writes a placeholder file per capture.
#[derive(Default)]
pub struct SimulatedOutput {
    attached: AtomicBool,
    faults: Mutex<HashSet<Fault>>,
    active: Mutex<Option<ActiveCapture>>,
    started: AtomicU64,
}

impl SimulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&self, fault: Fault) {
        lock(&self.faults).insert(fault);
    }

    pub fn clear(&self, fault: Fault) {
        lock(&self.faults).remove(&fault);
    }

    fn take_fault(&self, fault: Fault) -> bool {
        lock(&self.faults).remove(&fault)
    }

    /// Number of captures that actually started.
    pub fn captures_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// End the running capture on its own, as a size or duration limit would.
    pub fn finish_implicitly(&self) -> bool {
        match lock(&self.active).take() {
            Some(active) => {
                let _ = active.done.send(Ok(active.destination));
                true
            }
            None => false,
        }
    }

    /// End the running capture with a fault.
    pub fn fail_active(&self, message: &str) -> bool {
        match lock(&self.active).take() {
            Some(active) => {
                let _ = active.done.send(Err(OpticaError::recording(message)));
                true
            }
            None => false,
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait::async_trait]
impl OutputSink for SimulatedOutput {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn attach(&self) -> OpticaResult<()> {
        if self.take_fault(Fault::OutputAttach) {
            return Err(OpticaError::resource_attach(
                "movie file output",
                "injected attach fault",
            ));
        }
        self.attached.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn detach(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }

    fn is_capturing(&self) -> bool {
        lock(&self.active).is_some()
    }

    async fn start_capture(&self, destination: &Path) -> OpticaResult<CaptureCompletion> {
        if !self.is_attached() {
            return Err(OpticaError::recording("output is not attached"));
        }
        if self.take_fault(Fault::CaptureStart) {
            return Err(OpticaError::recording("injected capture fault"));
        }
        if self.is_capturing() {
            return Err(OpticaError::recording("a capture is already running"));
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, b"optica simulated capture\n").await?;

        let (done, completion) = oneshot::channel();
        *lock(&self.active) = Some(ActiveCapture {
            destination: destination.to_path_buf(),
            done,
        });
        self.started.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(destination = %destination.display(), "Simulated capture started");
        Ok(completion)
    }

    async fn stop_capture(&self) -> OpticaResult<()> {
        if self.finish_implicitly() {
            tracing::debug!("Simulated capture stopped");
            Ok(())
        } else {
            Err(OpticaError::recording("no capture is running"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use optica_device_model::format::{ChromaSubtype, Dimensions, FocusSystem, FrameRateRange};
    use optica_device_model::lens::{ExposureBiasRange, LensControls, LensRole};

    fn hd() -> FormatDescriptor {
        FormatDescriptor {
            dimensions: Dimensions::FHD_1080P,
            frame_rate_range: FrameRateRange::new(1.0, 60.0),
            subtype: ChromaSubtype::FullRange,
            focus_system: FocusSystem::PhaseDetection,
            hdr_supported: false,
            binned: false,
        }
    }

    fn device() -> SimulatedDevice {
        SimulatedDevice::new(Topology {
            name: "test".to_string(),
            lenses: vec![LensDescriptor {
                id: LensId::new("wide"),
                role: LensRole::Wide,
                field_of_view_deg: 70.0,
                max_zoom_factor: 4.0,
                formats: vec![hd()],
                controls: LensControls {
                    exposure_bias_range: ExposureBiasRange::new(-2.0, 2.0),
                    smooth_autofocus_supported: false,
                },
            }],
            crossover: Default::default(),
            microphone: Some("mic".to_string()),
        })
    }

    #[test]
    fn test_mutation_requires_lock() {
        let device = device();
        let lens = LensId::new("wide");
        let err = device.set_active_format(&lens, &hd()).unwrap_err();
        assert!(matches!(err, OpticaError::DeviceLock { .. }));

        device.lock_for_configuration(&lens).unwrap();
        device.set_active_format(&lens, &hd()).unwrap();
        device.set_frame_rate(&lens, 60.0).unwrap();
        assert!(device.set_frame_rate(&lens, 120.0).is_err());
        assert!(device.set_hdr_enabled(&lens, true).is_err());
        device.unlock_for_configuration(&lens);

        assert_eq!(device.lock_balance(), 0);
        assert_eq!(device.frame_rate(&lens), Some(60.0));
    }

    #[test]
    fn test_zoom_is_bounded_by_lens() {
        let device = device();
        let lens = LensId::new("wide");
        device.lock_for_configuration(&lens).unwrap();
        assert!(device.set_zoom_factor(&lens, 0.5).is_err());
        assert!(device.set_zoom_factor(&lens, 5.0).is_err());
        device.set_zoom_factor(&lens, 4.0).unwrap();
        device.unlock_for_configuration(&lens);
        assert_eq!(device.zoom_factor(&lens), 4.0);
    }

    #[test]
    fn test_clear_active_format_resets_dependent_settings() {
        let device = device();
        let lens = LensId::new("wide");
        assert!(device.clear_active_format(&lens).is_err());

        device.lock_for_configuration(&lens).unwrap();
        device.set_active_format(&lens, &hd()).unwrap();
        device.set_frame_rate(&lens, 30.0).unwrap();
        device.clear_active_format(&lens).unwrap();
        device.unlock_for_configuration(&lens);

        assert_eq!(device.active_format(&lens), None);
        assert_eq!(device.frame_rate(&lens), None);
    }

    #[test]
    fn test_exposure_and_smooth_autofocus_follow_lens_controls() {
        let device = device();
        let lens = LensId::new("wide");
        device.lock_for_configuration(&lens).unwrap();

        device.set_exposure_bias(&lens, -1.5).unwrap();
        assert!(device.set_exposure_bias(&lens, 3.0).is_err());
        assert!(device.set_smooth_autofocus(&lens, true).is_err());
        device.set_smooth_autofocus(&lens, false).unwrap();
        device.unlock_for_configuration(&lens);

        assert_eq!(device.exposure_bias(&lens), -1.5);
        assert!(!device.smooth_autofocus(&lens));
    }

    #[test]
    fn test_injected_faults() {
        let device = device();
        let lens = LensId::new("wide");
        device.inject(Fault::VideoAttach);
        assert!(device.attach_video_input(&lens).is_err());
        device.attach_video_input(&lens).unwrap();

        device.inject(Fault::Lock);
        device.clear(Fault::Lock);
        device.lock_for_configuration(&lens).unwrap();
        device.unlock_for_configuration(&lens);
        assert_eq!(device.video_input(), Some(lens));
        assert!(device.attach_audio_input("other-mic").is_err());
    }

    #[tokio::test]
    async fn test_output_completion_after_stop() {
        let output = SimulatedOutput::new();
        let path = std::env::temp_dir()
            .join("optica-simulated-output")
            .join("clip.mov");

        assert!(output.start_capture(&path).await.is_err());
        output.attach().unwrap();

        let completion = output.start_capture(&path).await.unwrap();
        assert!(output.start_capture(&path).await.is_err());
        output.stop_capture().await.unwrap();

        let finished = completion.await.unwrap().unwrap();
        assert_eq!(finished, path);
        assert!(path.exists());
        assert_eq!(output.captures_started(), 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
