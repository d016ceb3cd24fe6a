//! Mission parsing, routing and per-mission state.

pub mod parser;
pub mod router;
pub mod state;

pub use parser::{parse, Action, ParsedCommand, Target};
pub use router::{route, Pipeline};
pub use state::{AgentState, MissionOutcome, MissionResult, MissionStatus};
