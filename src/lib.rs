//! Capability-gated mission execution.
//!
//! A free-text mission is parsed into a command, routed to a pipeline,
//! and every effect it needs (file, network, GPU, sensor, camera) is
//! checked by a [`guard::Guard`] against the selected skill's manifest
//! before an effector runs it.

pub mod agent;
pub mod capability;
pub mod config;
pub mod effectors;
pub mod error;
pub mod guard;
pub mod mission;
pub mod operation;
pub mod sandbox;
pub mod skills;

pub use agent::{AgentRuntime, ExecuteOptions};
pub use config::Config;
pub use error::{Decision, GuardError};
