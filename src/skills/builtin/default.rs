//! Builtin skill: fallback for missions no other skill recognizes.

use async_trait::async_trait;

use crate::skills::Skill;

pub struct DefaultSkill;

#[async_trait]
impl Skill for DefaultSkill {
    fn name(&self) -> &str {
        "DefaultSkill"
    }

    fn description(&self) -> &str {
        "Fallback skill for unknown commands"
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        Ok(format!(
            "Command not recognized. Attempting to execute request: {input}"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_request() {
        let out = DefaultSkill.execute("hello there").await.unwrap();
        assert_eq!(
            out,
            "Command not recognized. Attempting to execute request: hello there"
        );
        assert!(DefaultSkill.capabilities().is_empty());
    }
}
