//! Recording destinations and the media library.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use optica_common::config::StorageConfig;
use optica_common::error::{OpticaError, OpticaResult};
use tokio::fs::{File, OpenOptions};

use crate::backend::PersistenceSink;

/// Hands out unique recording file paths.
///
/// A path stays reserved until [`DestinationAllocator::release`] is called,
/// which the recorder does once the file has been persisted.
#[derive(Debug)]
pub struct DestinationAllocator {
    dir: PathBuf,
    prefix: String,
    extension: String,
    counter: AtomicU64,
    reserved: Mutex<HashSet<PathBuf>>,
}

impl DestinationAllocator {
    pub fn new(
        dir: impl Into<PathBuf>,
        prefix: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: extension.into(),
            counter: AtomicU64::new(0),
            reserved: Mutex::new(HashSet::new()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            config.recordings_dir.clone(),
            config.file_prefix.clone(),
            config.extension.clone(),
        )
    }

    /// Reserve a fresh destination inside the recordings directory.
    pub fn allocate(&self) -> OpticaResult<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let mut reserved = self
            .reserved
            .lock()
            .map_err(|_| OpticaError::recording("destination registry poisoned"))?;

        loop {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let path = self.dir.join(format!(
                "{}_{}_{:04}.{}",
                self.prefix, stamp, n, self.extension
            ));
            if !reserved.contains(&path) && !path.exists() {
                reserved.insert(path.clone());
                tracing::debug!(path = %path.display(), "Allocated recording destination");
                return Ok(path);
            }
        }
    }

    pub fn release(&self, path: &Path) {
        if let Ok(mut reserved) = self.reserved.lock() {
            reserved.remove(path);
        }
    }

    /// Destinations handed out and not yet released.
    pub fn pending(&self) -> usize {
        self.reserved
            .lock()
            .map(|reserved| reserved.len())
            .unwrap_or(0)
    }
}

/// Moves finished recordings into a library directory.
#[derive(Debug, Clone)]
pub struct LibraryDirectory {
    root: PathBuf,
}

impl LibraryDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.library_dir.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a library file named after `file_name` that did not exist
    /// before. A taken name gets a numeric suffix.
    async fn create_target(&self, file_name: &Path) -> std::io::Result<(PathBuf, File)> {
        let stem = file_name
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = file_name
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut attempt = 0u32;
        loop {
            let candidate = if attempt == 0 {
                self.root.join(file_name)
            } else {
                self.root.join(format!("{stem}-{attempt}{extension}"))
            };
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
                .await
            {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %candidate.display(), "Library name taken");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait::async_trait]
impl PersistenceSink for LibraryDirectory {
    async fn persist(&self, media: &Path) -> OpticaResult<PathBuf> {
        let file_name = media
            .file_name()
            .ok_or_else(|| OpticaError::persistence(media, "not a file path"))?;

        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            OpticaError::persistence(
                media,
                format!("cannot create library {}: {e}", self.root.display()),
            )
        })?;

        let mut source = File::open(media)
            .await
            .map_err(|e| OpticaError::persistence(media, format!("cannot open recording: {e}")))?;
        let (target, mut file) = self
            .create_target(Path::new(file_name))
            .await
            .map_err(|e| OpticaError::persistence(media, format!("cannot create library file: {e}")))?;

        let copied = async {
            tokio::io::copy(&mut source, &mut file).await?;
            file.sync_all().await
        }
        .await;
        if let Err(e) = copied {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(OpticaError::persistence(media, format!("copy failed: {e}")));
        }
        drop(source);
        drop(file);

        // The library copy is authoritative once written.
        if let Err(e) = tokio::fs::remove_file(media).await {
            tracing::warn!(path = %media.display(), error = %e, "Failed to remove recorded source file");
        }

        tracing::info!(
            source = %media.display(),
            target = %target.display(),
            "Recording saved to library"
        );
        Ok(target)
    }
}
