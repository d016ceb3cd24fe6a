//! System directories no manifest can open up.

use crate::capability::manifest::is_within;
use crate::capability::normalize_path;

/// Directories denied for file reads and writes on every platform.
const SYSTEM_DIRS: &[&str] = &[
    "C:/Windows",
    "C:/Program Files",
    "C:/ProgramData",
    "C:/System32",
    "/etc",
    "/boot",
    "/proc",
    "/sys",
    "/dev",
    "/bin",
    "/sbin",
    "/usr/bin",
    "/usr/sbin",
];

#[derive(Debug, Clone)]
pub struct ProtectedPaths {
    dirs: Vec<String>,
}

impl Default for ProtectedPaths {
    fn default() -> Self {
        Self::with_extra(&[])
    }
}

impl ProtectedPaths {
    /// Fixed system list plus `extra` prefixes from configuration.
    pub fn with_extra(extra: &[String]) -> Self {
        let dirs = SYSTEM_DIRS
            .iter()
            .map(|d| d.to_string())
            .chain(extra.iter().cloned())
            .map(|d| normalize_path(&d))
            .collect();
        Self { dirs }
    }

    /// Returns the protected directory `path` falls under, if any.
    /// Drive-letter paths compare case-insensitively.
    pub fn matching(&self, path: &str) -> Option<&str> {
        let normalized = normalize_path(path);
        let folded = normalized.to_lowercase();
        self.dirs
            .iter()
            .find(|dir| {
                if has_drive(dir) {
                    is_within(&folded, &dir.to_lowercase())
                } else {
                    is_within(&normalized, dir)
                }
            })
            .map(String::as_str)
    }
}

fn has_drive(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}
