//! File effector.
//!
//! Performs reads and writes the Guard has already approved. All I/O
//! uses `tokio::fs` so large files do not block the runtime.

use std::io::ErrorKind;
use std::path::Path;

use tracing::info;

use crate::error::{Denial, DeniedKind, GuardError};

#[derive(Debug, Default, Clone)]
pub struct FileOperations;

impl FileOperations {
    pub fn new() -> Self {
        Self
    }

    /// Reads the whole file. A missing path is `NotFound`; a path the
    /// process may not inspect is `PermissionDenied`.
    pub async fn read(&self, path: &str) -> Result<Vec<u8>, GuardError> {
        match tokio::fs::try_exists(path).await {
            Ok(true) => {}
            Ok(false) => {
                return Err(GuardError::NotFound(format!("path does not exist: {path}")));
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return Err(GuardError::PermissionDenied(Denial::new(
                    DeniedKind::Read,
                    format!("cannot access {path}: {e}"),
                )));
            }
            Err(e) => return Err(GuardError::Io(e)),
        }

        info!(path, "Reading file");
        Ok(tokio::fs::read(path).await?)
    }

    /// Writes `data`, creating parent directories first. Returns the
    /// number of bytes written.
    pub async fn write(&self, path: &str, data: &[u8]) -> Result<usize, GuardError> {
        info!(path, bytes = data.len(), "Writing file");

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    GuardError::PermissionDenied(Denial::new(
                        DeniedKind::Write,
                        format!("cannot create directory for {path}: {e}"),
                    ))
                })?;
            }
        }

        tokio::fs::write(path, data).await?;
        Ok(data.len())
    }
}
