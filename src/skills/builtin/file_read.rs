//! Builtin skill: read a file from the paths the capability registry
//! allows.
//!
//! Two gates apply: the coarse `FileRead` path patterns, then the
//! `FileRead` manifest through the Guard. Failures are reported as text.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::capability::CapabilityRegistry;
use crate::guard::GuardFactory;
use crate::operation::Operation;
use crate::skills::Skill;

pub struct FileReadSkill {
    capabilities: Arc<CapabilityRegistry>,
    guards: Arc<GuardFactory>,
}

impl FileReadSkill {
    pub fn new(capabilities: Arc<CapabilityRegistry>, guards: Arc<GuardFactory>) -> Self {
        Self {
            capabilities,
            guards,
        }
    }
}

#[async_trait]
impl Skill for FileReadSkill {
    fn name(&self) -> &str {
        "FileRead"
    }

    fn description(&self) -> &str {
        "Read files from allowed paths"
    }

    fn capabilities(&self) -> Vec<String> {
        vec!["FileRead".to_string()]
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let path = input.trim();
        if !self.capabilities.check_capability("FileRead", Some(path)) {
            warn!(path, "FileRead path outside capability patterns");
            return Ok("Permission denied".to_string());
        }

        let guard = self.guards.guard_for("FileRead")?;
        match guard
            .check_and_execute(Operation::FileRead {
                path: path.to_string(),
            })
            .await
        {
            Ok(output) => {
                let bytes = output.into_bytes().unwrap_or_default();
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Err(e) => Ok(format!("Error: {e}")),
        }
    }
}
