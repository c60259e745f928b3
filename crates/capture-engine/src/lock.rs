//! Scoped configuration locks.

use optica_common::error::OpticaResult;
use optica_device_model::lens::LensId;

use crate::backend::CaptureDevice;

/// Holds a lens's configuration lock; released on drop on every exit path.
pub struct ConfigurationLock<'a> {
    device: &'a dyn CaptureDevice,
    lens: &'a LensId,
}

impl<'a> ConfigurationLock<'a> {
    pub fn acquire(device: &'a dyn CaptureDevice, lens: &'a LensId) -> OpticaResult<Self> {
        device.lock_for_configuration(lens)?;
        tracing::trace!(lens = %lens, "Configuration lock acquired");
        Ok(Self { device, lens })
    }

    #[cfg(test)]
    fn lens(&self) -> &LensId {
        self.lens
    }
}

impl Drop for ConfigurationLock<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration(self.lens);
        tracing::trace!(lens = %self.lens, "Configuration lock released");
    }
}

/// Run `f` while holding the configuration lock for `lens`.
pub fn with_configuration_lock<T>(
    device: &dyn CaptureDevice,
    lens: &LensId,
    f: impl FnOnce() -> OpticaResult<T>,
) -> OpticaResult<T> {
    let _guard = ConfigurationLock::acquire(device, lens)?;
    f()
}
