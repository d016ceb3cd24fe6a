use serde::Serialize;
use tracing::{debug, info};

use super::parser::{Action, ParsedCommand, Target};

/// Processing pipeline a parsed mission is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pipeline {
    FileOps,
    Http,
    /// No dedicated pipeline; the skill registry runs the skill.
    None,
}

/// Picks the pipeline for `parsed`, given the skill selected for it.
pub fn route(parsed: &ParsedCommand, skill: &str) -> Pipeline {
    let pipeline = if skill == "WebSearch"
        || (parsed.action == Action::Get && parsed.target == Target::Network)
    {
        Pipeline::Http
    } else if matches!(skill, "FileReader" | "FileWriter") {
        Pipeline::FileOps
    } else {
        debug!(
            skill,
            action = ?parsed.action,
            target = ?parsed.target,
            "No direct handler, falling back to skill execution"
        );
        Pipeline::None
    };

    info!(skill, pipeline = ?pipeline, "Routing mission");
    pipeline
}
