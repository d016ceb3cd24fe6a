//! Skill registry.
//!
//! Holds the skills available to the runtime, keyed by name. The
//! registry is an ordinary value built by the caller and handed to the
//! runtime; there is no process-wide instance.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::capability::CapabilityRegistry;

use super::Skill;

/// Returned when a skill fails the coarse capability check.
pub const MISSING_CAPABILITIES: &str = "Permission denied: Missing capabilities";

pub struct SkillRegistry {
    skills: HashMap<String, Box<dyn Skill>>,
    capabilities: Arc<CapabilityRegistry>,
}

impl SkillRegistry {
    pub fn new(capabilities: Arc<CapabilityRegistry>) -> Self {
        Self {
            skills: HashMap::new(),
            capabilities,
        }
    }

    /// Registers a skill, replacing any skill with the same name.
    /// Fails if the skill declares a capability the registry does not know.
    pub fn register(&mut self, skill: Box<dyn Skill>) -> anyhow::Result<()> {
        for cap in skill.capabilities() {
            if !self.capabilities.contains(&cap) {
                anyhow::bail!(
                    "Skill '{}' requires unknown capability '{cap}'",
                    skill.name()
                );
            }
        }
        info!(skill = skill.name(), "Registered skill");
        self.skills.insert(skill.name().to_string(), skill);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Skill> {
        self.skills.get(name).map(|s| s.as_ref())
    }

    /// Registered skill names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.skills.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Runs `name` on `input`.
    ///
    /// An unknown skill or a failed capability check is reported as a
    /// fixed message, not an error. Errors raised by the skill itself
    /// propagate.
    pub async fn execute(&self, name: &str, input: &str) -> anyhow::Result<String> {
        let Some(skill) = self.skills.get(name) else {
            warn!(skill = name, "Skill not found");
            return Ok(format!("Error: Skill '{name}' not found"));
        };

        let caps = skill.capabilities();
        if !caps
            .iter()
            .all(|cap| self.capabilities.check_capability(cap, None))
        {
            warn!(skill = name, ?caps, "Skill denied by capability registry");
            return Ok(MISSING_CAPABILITIES.to_string());
        }

        info!(skill = name, "Executing skill");
        skill.execute(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::capability::CapabilityEntry;

    struct Echo {
        caps: Vec<String>,
    }

    #[async_trait]
    impl Skill for Echo {
        fn name(&self) -> &str {
            "Echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn capabilities(&self) -> Vec<String> {
            self.caps.clone()
        }

        async fn execute(&self, input: &str) -> anyhow::Result<String> {
            if input == "fail" {
                anyhow::bail!("echo failed");
            }
            Ok(format!("echo: {input}"))
        }
    }

    fn registry() -> SkillRegistry {
        SkillRegistry::new(Arc::new(CapabilityRegistry::with_defaults()))
    }

    #[tokio::test]
    async fn test_execute_registered_skill() {
        let mut reg = registry();
        reg.register(Box::new(Echo { caps: vec![] })).unwrap();
        assert_eq!(reg.execute("Echo", "hi").await.unwrap(), "echo: hi");
        assert!(reg.get("Echo").is_some());
        assert_eq!(reg.names(), vec!["Echo"]);
    }

    #[tokio::test]
    async fn test_unknown_skill_message() {
        let reg = registry();
        assert_eq!(
            reg.execute("Nope", "x").await.unwrap(),
            "Error: Skill 'Nope' not found"
        );
    }

    #[test]
    fn test_register_rejects_unknown_capability() {
        let mut reg = registry();
        let err = reg
            .register(Box::new(Echo {
                caps: vec!["Teleport".to_string()],
            }))
            .unwrap_err();
        assert!(err.to_string().contains("Teleport"));
        assert!(reg.get("Echo").is_none());
    }

    #[tokio::test]
    async fn test_capability_checked_at_call_time() {
        // Known at registration, gone from the registry at call time.
        let mut caps = CapabilityRegistry::new();
        caps.insert(
            "WebSearch",
            CapabilityEntry {
                capability: "network".to_string(),
                risk_level: 1,
                paths: vec![],
            },
        );
        let mut reg = SkillRegistry::new(Arc::new(caps));
        reg.register(Box::new(Echo {
            caps: vec!["WebSearch".to_string()],
        }))
        .unwrap();
        assert_eq!(reg.execute("Echo", "x").await.unwrap(), "echo: x");

        reg.capabilities = Arc::new(CapabilityRegistry::new());
        assert_eq!(reg.execute("Echo", "x").await.unwrap(), MISSING_CAPABILITIES);
    }

    #[tokio::test]
    async fn test_skill_errors_propagate() {
        let mut reg = registry();
        reg.register(Box::new(Echo { caps: vec![] })).unwrap();
        assert!(reg.execute("Echo", "fail").await.is_err());
    }
}
