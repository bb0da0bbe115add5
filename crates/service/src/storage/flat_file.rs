use std::{io::ErrorKind, path::PathBuf};

use tokio::{
    fs,
    sync::{Mutex, MutexGuard},
};
use tracing::{debug, warn};

use crate::errors::ServiceError;

/// What a read of the backing file found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    Present(String),
    /// The file does not exist yet; legitimately empty.
    Missing,
    /// The file exists but could not be read.
    Unreadable(String),
}

/// How [`FlatFile::read_text`] treats [`LoadOutcome::Unreadable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Log and carry on with an empty record set.
    #[default]
    Lenient,
    /// Fail with [`ServiceError::Storage`].
    Strict,
}

impl ReadPolicy {
    pub fn from_strict(strict: bool) -> Self {
        if strict { ReadPolicy::Strict } else { ReadPolicy::Lenient }
    }
}

/// A whole-file text resource with a single-writer lock.
///
/// Reads are not locked. Mutations hold [`FlatFile::lock`] across their
/// load-modify-save sequence so overlapping writers cannot drop each other's
/// changes.
pub struct FlatFile {
    path: PathBuf,
    policy: ReadPolicy,
    writer: Mutex<()>,
}

impl FlatFile {
    pub fn new<P: Into<PathBuf>>(path: P, policy: ReadPolicy) -> Self {
        Self { path: path.into(), policy, writer: Mutex::new(()) }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Read the file and report exactly what happened.
    pub async fn read(&self) -> LoadOutcome {
        match fs::read_to_string(&self.path).await {
            Ok(text) => LoadOutcome::Present(text),
            Err(e) if e.kind() == ErrorKind::NotFound => LoadOutcome::Missing,
            Err(e) => LoadOutcome::Unreadable(e.to_string()),
        }
    }

    /// Read the file as text, applying the configured [`ReadPolicy`].
    pub async fn read_text(&self) -> Result<String, ServiceError> {
        match self.read().await {
            LoadOutcome::Present(text) => Ok(text),
            LoadOutcome::Missing => {
                debug!(path = %self.path.display(), "backing file missing, treating as empty");
                Ok(String::new())
            }
            LoadOutcome::Unreadable(err) => match self.policy {
                ReadPolicy::Lenient => {
                    warn!(path = %self.path.display(), error = %err, "backing file unreadable, treating as empty");
                    Ok(String::new())
                }
                ReadPolicy::Strict => Err(ServiceError::Storage(format!(
                    "cannot read {}: {err}",
                    self.path.display()
                ))),
            },
        }
    }

    /// Overwrite the whole file.
    pub async fn write(&self, text: &str) -> Result<(), ServiceError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(e) = fs::create_dir_all(parent).await {
                warn!(path = %parent.display(), error = %e, "cannot create parent directory");
            }
        }
        fs::write(&self.path, text).await.map_err(|e| {
            ServiceError::Storage(format!("cannot write {}: {e}", self.path.display()))
        })
    }

    /// Take the writer lock for one read-modify-write sequence.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.writer.lock().await
    }
}
