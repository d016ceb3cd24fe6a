//! Per-mission state threaded through the pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::parser::ParsedCommand;
use super::router::Pipeline;

/// What a successful mission produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissionResult {
    /// File contents plus the filtered view (Cyrillic letters, digits and whitespace).
    FileRead {
        path: String,
        content: String,
        filtered: String,
    },
    FileWrite {
        path: String,
        bytes_written: usize,
    },
    Http {
        status_code: u16,
        content: String,
    },
    Skill {
        skill: String,
        output: String,
    },
    DryRun {
        message: String,
    },
}

impl MissionResult {
    /// The text a caller would read or analyze.
    pub fn text(&self) -> String {
        match self {
            MissionResult::FileRead { content, .. } => content.clone(),
            MissionResult::FileWrite {
                path,
                bytes_written,
            } => format!("Wrote {bytes_written} bytes to {path}"),
            MissionResult::Http { content, .. } => content.clone(),
            MissionResult::Skill { output, .. } => output.clone(),
            MissionResult::DryRun { message } => message.clone(),
        }
    }
}

/// Either a result or an error message, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionOutcome {
    Result(MissionResult),
    Error(String),
}

impl MissionOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, MissionOutcome::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionStatus {
    Pending,
    Completed,
    Failed,
}

/// Mutable record owned by one mission execution.
#[derive(Debug, Clone)]
pub struct AgentState {
    pub mission_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mission: String,
    pub parsed_command: Option<ParsedCommand>,
    pub current_skill: Option<String>,
    pub next_node: Option<Pipeline>,
    pub result: Option<MissionResult>,
    pub error: Option<String>,
    pub status: MissionStatus,
}

impl AgentState {
    pub fn new(mission: &str) -> Self {
        Self {
            mission_id: Uuid::new_v4(),
            started_at: Utc::now(),
            mission: mission.to_string(),
            parsed_command: None,
            current_skill: None,
            next_node: None,
            result: None,
            error: None,
            status: MissionStatus::Pending,
        }
    }

    pub fn complete(&mut self, result: MissionResult) {
        self.result = Some(result);
        self.error = None;
        self.status = MissionStatus::Completed;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.result = None;
        self.error = Some(error.into());
        self.status = MissionStatus::Failed;
    }

    /// Final outcome. A state that never completed reports an error.
    pub fn into_outcome(self) -> MissionOutcome {
        match (self.result, self.error) {
            (_, Some(error)) => MissionOutcome::Error(error),
            (Some(result), None) => MissionOutcome::Result(result),
            (None, None) => MissionOutcome::Error("Mission produced no result".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_serialization() {
        let ok = MissionOutcome::Result(MissionResult::Http {
            status_code: 200,
            content: "Paris".to_string(),
        });
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"result": {"type": "http", "status_code": 200, "content": "Paris"}})
        );

        let err = MissionOutcome::Error("Permission denied: x".to_string());
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"error": "Permission denied: x"})
        );
    }

    #[test]
    fn test_state_transitions() {
        let mut state = AgentState::new("find cats");
        assert_eq!(state.status, MissionStatus::Pending);

        state.fail("boom");
        assert_eq!(state.status, MissionStatus::Failed);

        state.complete(MissionResult::DryRun {
            message: "ok".to_string(),
        });
        assert_eq!(state.status, MissionStatus::Completed);
        assert!(!state.into_outcome().is_error());
    }

    #[test]
    fn test_unfinished_state_is_error() {
        assert!(AgentState::new("x").into_outcome().is_error());
    }

    #[test]
    fn test_mission_ids_unique() {
        assert_ne!(AgentState::new("a").mission_id, AgentState::new("a").mission_id);
    }
}
