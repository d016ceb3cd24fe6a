pub mod builtin;
pub mod registry;

use async_trait::async_trait;

/// A named unit of functionality run when no dedicated pipeline
/// handles a mission.
///
/// Builtin skills implement this trait and are registered by name in a
/// [`SkillRegistry`].
#[async_trait]
pub trait Skill: Send + Sync {
    /// Unique name the registry dispatches on (e.g. "WebSearch").
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Names of the coarse capabilities this skill needs. Each one must
    /// be known to the capability registry when the skill is registered,
    /// and must pass its check every time the skill runs.
    fn capabilities(&self) -> Vec<String> {
        vec![]
    }

    /// Runs the skill on free-text input and returns a text result.
    async fn execute(&self, input: &str) -> anyhow::Result<String>;
}

pub use registry::SkillRegistry;
