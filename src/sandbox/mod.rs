//! Isolation context for approved operations.
//!
//! The physical sandbox (a WASI runtime with preopened directories) is
//! an external collaborator. This module only defines the seam: before
//! an approved operation runs, the Guard enters an [`IsolationScope`]
//! built from the manifest, and the scope is released when it is
//! dropped, whether the operation succeeded, failed or panicked.
//!
//! The security model is layered:
//!
//! 1. Declarative capabilities (JSON manifest), read and approved by a human
//! 2. Guard check of every operation against the manifest
//! 3. Isolation context around the effector call

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::capability::CapabilityManifest;
use crate::error::GuardError;

/// Live isolation state. Released on drop.
pub trait IsolationScope: Send {}

/// Factory for isolation scopes.
pub trait IsolationContext: Send + Sync {
    /// Establishes isolation for one operation batch under `manifest`.
    fn enter(&self, manifest: &CapabilityManifest) -> Result<Box<dyn IsolationScope>, GuardError>;
}

/// Default context: records the directories a WASI runtime would
/// preopen and tracks how many scopes are live.
#[derive(Default)]
pub struct PreopenSandbox {
    active: Arc<AtomicUsize>,
}

impl PreopenSandbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of scopes currently entered and not yet released.
    pub fn active_scopes(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl IsolationContext for PreopenSandbox {
    fn enter(&self, manifest: &CapabilityManifest) -> Result<Box<dyn IsolationScope>, GuardError> {
        let preopened: Vec<String> = manifest
            .filesystem
            .read
            .iter()
            .chain(manifest.filesystem.write.iter())
            .map(|p| p.replace('\\', "/"))
            .collect();
        debug!(skill = %manifest.skill_name, ?preopened, "Entering isolation scope");

        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(PreopenScope {
            skill: manifest.skill_name.clone(),
            active: Arc::clone(&self.active),
        }))
    }
}

struct PreopenScope {
    skill: String,
    active: Arc<AtomicUsize>,
}

impl IsolationScope for PreopenScope {}

impl Drop for PreopenScope {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        debug!(skill = %self.skill, "Isolation scope released");
    }
}
