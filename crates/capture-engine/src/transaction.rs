//! Undo-journaled hardware mutations.
//!
//! Every mutation records how to restore what it replaced before touching
//! the device. Rolling back replays the journal newest-first, taking a fresh
//! configuration lock for each property restore. A transaction dropped
//! without `commit` rolls itself back.

use optica_common::error::{OpticaError, OpticaResult};
use optica_device_model::format::FormatDescriptor;
use optica_device_model::lens::{LensDescriptor, LensId};

use crate::backend::{CaptureDevice, OutputSink};
use crate::lock::with_configuration_lock;

#[derive(Debug)]
enum Undo {
    VideoInput {
        previous: Option<LensId>,
    },
    AudioInput {
        previous: Option<String>,
    },
    Format {
        lens: LensId,
        format: Option<FormatDescriptor>,
        frame_rate: Option<f64>,
        hdr: bool,
    },
    Controls {
        lens: LensId,
        exposure_bias: f64,
        smooth_autofocus: bool,
    },
    Zoom {
        lens: LensId,
        previous: f64,
    },
    OutputAttached,
}

pub struct Transaction<'a> {
    device: &'a dyn CaptureDevice,
    output: &'a dyn OutputSink,
    journal: Vec<Undo>,
    finished: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(device: &'a dyn CaptureDevice, output: &'a dyn OutputSink) -> Self {
        Self {
            device,
            output,
            journal: Vec::new(),
            finished: false,
        }
    }

    /// Make `lens` the video input, replacing whatever is attached.
    pub fn attach_video_input(&mut self, lens: &LensId) -> OpticaResult<()> {
        let previous = self.device.video_input();
        if previous.as_ref() == Some(lens) {
            tracing::debug!(lens = %lens, "Video input already attached");
            return Ok(());
        }

        self.journal.push(Undo::VideoInput {
            previous: previous.clone(),
        });
        if previous.is_some() {
            self.device.detach_video_input();
        }
        self.device.attach_video_input(lens)?;
        tracing::debug!(lens = %lens, ?previous, "Attached video input");
        Ok(())
    }

    pub fn attach_audio_input(&mut self, microphone: &str) -> OpticaResult<()> {
        let previous = self.device.audio_input();
        if previous.as_deref() == Some(microphone) {
            return Ok(());
        }

        self.journal.push(Undo::AudioInput {
            previous: previous.clone(),
        });
        if previous.is_some() {
            self.device.detach_audio_input();
        }
        self.device.attach_audio_input(microphone)?;
        tracing::debug!(microphone, "Attached audio input");
        Ok(())
    }

    /// Activate a format, frame rate and HDR mode on `lens`.
    ///
    /// HDR requested on a format without HDR support is switched off and
    /// returned as a warning rather than failing the transaction.
    pub fn apply_format(
        &mut self,
        lens: &LensId,
        format: &FormatDescriptor,
        frame_rate: f64,
        hdr: bool,
    ) -> OpticaResult<Option<OpticaError>> {
        self.journal.push(Undo::Format {
            lens: lens.clone(),
            format: self.device.active_format(lens),
            frame_rate: self.device.frame_rate(lens),
            hdr: self.device.hdr_enabled(lens),
        });

        with_configuration_lock(self.device, lens, || {
            self.device.set_active_format(lens, format)
        })?;
        with_configuration_lock(self.device, lens, || {
            self.device.set_frame_rate(lens, frame_rate)
        })?;

        let mut warning = None;
        let enable = if hdr && !format.hdr_supported {
            warning = Some(OpticaError::HdrNotSupported {
                lens: lens.to_string(),
            });
            false
        } else {
            hdr
        };
        with_configuration_lock(self.device, lens, || {
            self.device.set_hdr_enabled(lens, enable)
        })?;

        tracing::debug!(lens = %lens, format = %format, frame_rate, hdr = enable, "Applied format");
        Ok(warning)
    }

    /// Set exposure compensation and smooth autofocus on `lens`.
    ///
    /// The bias is clamped into the lens range. Smooth autofocus is left off
    /// on lenses that cannot do it. Returns the values actually applied.
    pub fn apply_controls(
        &mut self,
        lens: &LensDescriptor,
        exposure_bias: f64,
        smooth_autofocus: bool,
    ) -> OpticaResult<(f64, bool)> {
        let id = &lens.id;
        self.journal.push(Undo::Controls {
            lens: id.clone(),
            exposure_bias: self.device.exposure_bias(id),
            smooth_autofocus: self.device.smooth_autofocus(id),
        });

        let range = lens.controls.exposure_bias_range;
        let bias = range.clamp(exposure_bias);
        if bias != exposure_bias {
            tracing::warn!(lens = %id, requested = exposure_bias, applied = bias, "Exposure bias clamped to lens range");
        }
        let smooth = smooth_autofocus && lens.controls.smooth_autofocus_supported;
        if smooth_autofocus && !smooth {
            tracing::debug!(lens = %id, "Smooth autofocus not supported, leaving it off");
        }

        with_configuration_lock(self.device, id, || {
            self.device.set_exposure_bias(id, bias)?;
            self.device.set_smooth_autofocus(id, smooth)
        })?;
        tracing::debug!(lens = %id, exposure_bias = bias, smooth_autofocus = smooth, "Applied lens controls");
        Ok((bias, smooth))
    }

    pub fn attach_output(&mut self) -> OpticaResult<()> {
        if self.output.is_attached() {
            return Ok(());
        }
        self.output.attach()?;
        self.journal.push(Undo::OutputAttached);
        tracing::debug!("Attached output");
        Ok(())
    }

    pub fn apply_zoom(&mut self, lens: &LensId, factor: f64) -> OpticaResult<()> {
        self.journal.push(Undo::Zoom {
            lens: lens.clone(),
            previous: self.device.zoom_factor(lens),
        });
        with_configuration_lock(self.device, lens, || {
            self.device.set_zoom_factor(lens, factor)
        })?;
        tracing::debug!(lens = %lens, factor, "Applied zoom");
        Ok(())
    }

    /// Keep every mutation.
    pub fn commit(mut self) {
        self.journal.clear();
        self.finished = true;
    }

    /// Undo every mutation, newest first.
    pub fn rollback(mut self) {
        self.unwind();
    }

    fn unwind(&mut self) {
        self.finished = true;
        let steps = self.journal.len();
        while let Some(undo) = self.journal.pop() {
            self.revert(undo);
        }
        if steps > 0 {
            tracing::debug!(steps, "Rolled back transaction");
        }
    }

    fn revert(&self, undo: Undo) {
        let device = self.device;
        match undo {
            Undo::VideoInput { previous } => {
                device.detach_video_input();
                if let Some(lens) = previous {
                    if let Err(e) = device.attach_video_input(&lens) {
                        tracing::warn!(lens = %lens, error = %e, "Failed to restore video input");
                    }
                }
            }
            Undo::AudioInput { previous } => {
                device.detach_audio_input();
                if let Some(microphone) = previous {
                    if let Err(e) = device.attach_audio_input(&microphone) {
                        tracing::warn!(microphone = %microphone, error = %e, "Failed to restore audio input");
                    }
                }
            }
            Undo::Format {
                lens,
                format,
                frame_rate,
                hdr,
            } => {
                let restored = with_configuration_lock(device, &lens, || match &format {
                    Some(format) => {
                        device.set_active_format(&lens, format)?;
                        if let Some(fps) = frame_rate {
                            device.set_frame_rate(&lens, fps)?;
                        }
                        device.set_hdr_enabled(&lens, hdr)
                    }
                    None => device.clear_active_format(&lens),
                });
                if let Err(e) = restored {
                    tracing::warn!(lens = %lens, error = %e, "Failed to restore format");
                }
            }
            Undo::Controls {
                lens,
                exposure_bias,
                smooth_autofocus,
            } => {
                let restored = with_configuration_lock(device, &lens, || {
                    device.set_exposure_bias(&lens, exposure_bias)?;
                    device.set_smooth_autofocus(&lens, smooth_autofocus)
                });
                if let Err(e) = restored {
                    tracing::warn!(lens = %lens, error = %e, "Failed to restore lens controls");
                }
            }
            Undo::Zoom { lens, previous } => {
                let restored =
                    with_configuration_lock(device, &lens, || device.set_zoom_factor(&lens, previous));
                if let Err(e) = restored {
                    tracing::warn!(lens = %lens, error = %e, "Failed to restore zoom");
                }
            }
            Undo::OutputAttached => self.output.detach(),
        }
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.unwind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Fault, SimulatedDevice, SimulatedOutput};
    use optica_device_model::format::{ChromaSubtype, Dimensions, FocusSystem, FrameRateRange};
    use optica_device_model::lens::{ExposureBiasRange, LensControls, LensRole, Topology};

    fn format(dimensions: Dimensions, hdr: bool) -> FormatDescriptor {
        FormatDescriptor {
            dimensions,
            frame_rate_range: FrameRateRange::new(1.0, 60.0),
            subtype: ChromaSubtype::FullRange,
            focus_system: FocusSystem::PhaseDetection,
            hdr_supported: hdr,
            binned: false,
        }
    }

    fn device() -> SimulatedDevice {
        SimulatedDevice::new(Topology {
            name: "tx".to_string(),
            lenses: vec![
                LensDescriptor {
                    id: LensId::new("wide"),
                    role: LensRole::Wide,
                    field_of_view_deg: 70.0,
                    max_zoom_factor: 8.0,
                    formats: vec![
                        format(Dimensions::UHD_4K, true),
                        format(Dimensions::FHD_1080P, false),
                    ],
                    controls: LensControls {
                        exposure_bias_range: ExposureBiasRange::new(-3.0, 3.0),
                        smooth_autofocus_supported: true,
                    },
                },
                LensDescriptor {
                    id: LensId::new("tele"),
                    role: LensRole::Telephoto,
                    field_of_view_deg: 30.0,
                    max_zoom_factor: 4.0,
                    formats: vec![format(Dimensions::FHD_1080P, false)],
                    controls: LensControls::default(),
                },
            ],
            crossover: Default::default(),
            microphone: Some("mic".to_string()),
        })
    }

    #[test]
    fn test_rollback_restores_inputs_and_format() {
        let device = device();
        let output = SimulatedOutput::new();
        let wide = LensId::new("wide");

        let mut tx = Transaction::begin(&device, &output);
        tx.attach_video_input(&wide).unwrap();
        tx.apply_format(&wide, &format(Dimensions::UHD_4K, true), 30.0, true)
            .unwrap();
        tx.commit();

        let tele = LensId::new("tele");
        let mut tx = Transaction::begin(&device, &output);
        tx.attach_video_input(&tele).unwrap();
        tx.attach_audio_input("mic").unwrap();
        tx.apply_format(&wide, &format(Dimensions::FHD_1080P, false), 60.0, false)
            .unwrap();
        tx.attach_output().unwrap();
        tx.rollback();

        assert_eq!(device.video_input(), Some(wide.clone()));
        assert_eq!(device.audio_input(), None);
        assert_eq!(
            device.active_format(&wide).unwrap().dimensions,
            Dimensions::UHD_4K
        );
        assert_eq!(device.frame_rate(&wide), Some(30.0));
        assert!(device.hdr_enabled(&wide));
        assert!(!output.is_attached());
        assert_eq!(device.lock_balance(), 0);
    }

    #[test]
    fn test_rollback_clears_format_on_fresh_lens() {
        let device = device();
        let output = SimulatedOutput::new();
        let wide = LensId::new("wide");

        let mut tx = Transaction::begin(&device, &output);
        tx.attach_video_input(&wide).unwrap();
        tx.apply_format(&wide, &format(Dimensions::UHD_4K, true), 30.0, true)
            .unwrap();
        output.inject(Fault::OutputAttach);
        assert!(tx.attach_output().is_err());
        tx.rollback();

        assert_eq!(device.video_input(), None);
        assert_eq!(device.active_format(&wide), None);
        assert_eq!(device.frame_rate(&wide), None);
        assert!(!device.hdr_enabled(&wide));
        assert_eq!(device.lock_balance(), 0);
    }

    #[test]
    fn test_controls_are_clamped_and_rolled_back() {
        let device = device();
        let output = SimulatedOutput::new();
        let topology = device.topology().unwrap();
        let wide = topology.lens_by_id(&LensId::new("wide")).unwrap();
        let tele = topology.lens_by_id(&LensId::new("tele")).unwrap();

        let mut tx = Transaction::begin(&device, &output);
        assert_eq!(tx.apply_controls(wide, -1.0, true).unwrap(), (-1.0, true));
        tx.commit();

        let mut tx = Transaction::begin(&device, &output);
        assert_eq!(tx.apply_controls(wide, 5.0, false).unwrap(), (3.0, false));
        assert_eq!(device.exposure_bias(&wide.id), 3.0);
        // Tele cannot smooth its autofocus; the request is dropped.
        assert_eq!(tx.apply_controls(tele, 0.5, true).unwrap(), (0.5, false));
        tx.rollback();

        assert_eq!(device.exposure_bias(&wide.id), -1.0);
        assert!(device.smooth_autofocus(&wide.id));
        assert_eq!(device.exposure_bias(&tele.id), 0.0);
        assert_eq!(device.lock_balance(), 0);
    }

    #[test]
    fn test_hdr_on_unsupported_format_is_a_warning() {
        let device = device();
        let output = SimulatedOutput::new();
        let wide = LensId::new("wide");

        let mut tx = Transaction::begin(&device, &output);
        let warning = tx
            .apply_format(&wide, &format(Dimensions::FHD_1080P, false), 30.0, true)
            .unwrap();
        tx.commit();

        assert!(matches!(warning, Some(OpticaError::HdrNotSupported { .. })));
        assert!(!device.hdr_enabled(&wide));
    }

    #[test]
    fn test_drop_without_commit_rolls_back() {
        let device = device();
        let output = SimulatedOutput::new();
        let wide = LensId::new("wide");
        {
            let mut tx = Transaction::begin(&device, &output);
            tx.attach_video_input(&wide).unwrap();
            device.inject(Fault::Zoom);
            assert!(tx.apply_zoom(&wide, 2.0).is_err());
            device.clear(Fault::Zoom);
        }

        assert_eq!(device.video_input(), None);
        assert_eq!(device.zoom_factor(&wide), 1.0);
        assert_eq!(device.lock_balance(), 0);
    }
}
