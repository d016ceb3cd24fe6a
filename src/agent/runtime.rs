use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, info_span, warn, Instrument};

use crate::capability::{CapabilityRegistry, ManifestStore};
use crate::config::Config;
use crate::effectors::Effectors;
use crate::error::{Decision, GuardError};
use crate::guard::{EffectOutput, Guard, GuardFactory, ProtectedPaths};
use crate::mission::{
    self, Action, AgentState, MissionOutcome, MissionResult, ParsedCommand, Pipeline, Target,
};
use crate::operation::{NetworkRequest, Operation};
use crate::skills::builtin::{
    DefaultSkill, FileReadSkill, SearchChain, SimpleAnalysisSkill, WebSearchSkill,
};
use crate::skills::SkillRegistry;

/// Per-call options for [`AgentRuntime::execute`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Payload for write and post missions. Overrides quoted text in the
    /// mission.
    pub data: Option<String>,
    /// Report what would run without running it.
    pub dry_run: bool,
    /// Use this manifest file instead of the selected skill's manifest.
    pub manifest_override: Option<PathBuf>,
}

/// The mission runtime.
///
/// Parses a mission, routes it, and runs it through the file-ops
/// pipeline, the HTTP pipeline or the skill registry. Every effect goes
/// through a [`Guard`] built from the selected skill's manifest.
pub struct AgentRuntime {
    guards: Arc<GuardFactory>,
    skills: SkillRegistry,
    search: Arc<SearchChain>,
}

impl AgentRuntime {
    pub fn new(guards: Arc<GuardFactory>, skills: SkillRegistry, search: Arc<SearchChain>) -> Self {
        Self {
            guards,
            skills,
            search,
        }
    }

    /// Production wiring from configuration, with the builtin skills
    /// registered.
    pub fn from_config(config: &Config) -> Result<Self> {
        let capabilities = Arc::new(config.capability_registry());
        let guards = Arc::new(GuardFactory::new(
            Arc::new(ManifestStore::new(&config.manifests.dir)),
            Arc::new(Effectors::new(config.http_timeout())?),
            ProtectedPaths::with_extra(&config.guard.protected_paths),
        ));
        let search = Arc::new(SearchChain::from_config(&config.search));
        let skills = builtin_skills(capabilities, guards.clone(), search.clone())?;

        info!(
            manifests = %config.manifests.dir.display(),
            providers = ?search.provider_names(),
            skills = ?skills.names(),
            "Agent runtime ready"
        );
        Ok(Self::new(guards, skills, search))
    }

    pub fn manifests(&self) -> &ManifestStore {
        self.guards.store()
    }

    pub fn skills(&self) -> &SkillRegistry {
        &self.skills
    }

    /// Executes one mission. Never returns a raw error: failures become
    /// [`MissionOutcome::Error`].
    pub async fn execute(&self, mission: &str, options: &ExecuteOptions) -> MissionOutcome {
        if mission.trim().is_empty() {
            return MissionOutcome::Error("No mission text provided".to_string());
        }

        let mut state = AgentState::new(mission);
        let span = info_span!("mission", id = %state.mission_id);
        async {
            info!("Received mission: {mission}");
            self.run(&mut state, options).await;
            match &state.error {
                Some(e) => warn!("Mission failed: {e}"),
                None => info!("Mission completed"),
            }
        }
        .instrument(span)
        .await;

        state.into_outcome()
    }

    async fn run(&self, state: &mut AgentState, options: &ExecuteOptions) {
        if options.dry_run {
            state.complete(MissionResult::DryRun {
                message: format!("[DRY-RUN] Execution: {}", state.mission),
            });
            return;
        }

        let parsed = mission::parse(&state.mission);
        let skill = parsed.selected_skill();
        let pipeline = mission::route(&parsed, skill);
        state.current_skill = Some(skill.to_string());
        state.next_node = Some(pipeline);
        state.parsed_command = Some(parsed.clone());

        match pipeline {
            Pipeline::FileOps => match self.guard(skill, options) {
                Ok(guard) => self.file_ops(state, &guard, &parsed, options).await,
                Err(e) => state.fail(describe(&e)),
            },
            Pipeline::Http => match self.guard(skill, options) {
                Ok(guard) => self.http(state, &guard, &parsed, options).await,
                Err(e) => state.fail(describe(&e)),
            },
            Pipeline::None => match self.skills.execute(skill, &state.mission).await {
                Ok(output) => state.complete(MissionResult::Skill {
                    skill: skill.to_string(),
                    output,
                }),
                Err(e) => {
                    error!(skill, "Skill failed: {e:#}");
                    state.fail(format!("Execution error: {e}"));
                }
            },
        }
    }

    fn guard(&self, skill: &str, options: &ExecuteOptions) -> Result<Guard, GuardError> {
        match &options.manifest_override {
            Some(path) => self.guards.guard_from_file(path),
            None => self.guards.guard_for(skill),
        }
    }

    // ── Pipelines ─────────────────────────────────────────

    async fn file_ops(
        &self,
        state: &mut AgentState,
        guard: &Guard,
        parsed: &ParsedCommand,
        options: &ExecuteOptions,
    ) {
        let Some(path) = parsed.path.clone() else {
            state.fail("No file path found in mission");
            return;
        };

        match parsed.action {
            Action::Read => {
                match guard
                    .check_and_execute(Operation::FileRead { path: path.clone() })
                    .await
                {
                    Ok(output) => {
                        let bytes = output.into_bytes().unwrap_or_default();
                        let content = String::from_utf8_lossy(&bytes).into_owned();
                        let filtered = filtered_view(&content);
                        state.complete(MissionResult::FileRead {
                            path,
                            content,
                            filtered,
                        });
                    }
                    Err(e) => state.fail(describe(&e)),
                }
            }
            Action::Write => {
                let Some(data) = options.data.clone().or_else(|| parsed.data.clone()) else {
                    state.fail("No data provided for file write operation");
                    return;
                };
                match guard
                    .check_and_execute(Operation::FileWrite {
                        path: path.clone(),
                        data: data.into_bytes(),
                    })
                    .await
                {
                    Ok(output) => {
                        let bytes_written = match output {
                            EffectOutput::Written(n) => n,
                            _ => 0,
                        };
                        state.complete(MissionResult::FileWrite {
                            path,
                            bytes_written,
                        });
                    }
                    Err(e) => state.fail(describe(&e)),
                }
            }
            other => state.fail(format!("Unsupported file action: {other:?}")),
        }
    }

    async fn http(
        &self,
        state: &mut AgentState,
        guard: &Guard,
        parsed: &ParsedCommand,
        options: &ExecuteOptions,
    ) {
        if let Some(url) = &parsed.url {
            let request = if parsed.action == Action::Post {
                let data = options.data.clone().or_else(|| parsed.data.clone());
                NetworkRequest::post(url, data.unwrap_or_default().into_bytes())
            } else {
                NetworkRequest::get(url)
            };
            match guard
                .check_and_execute(Operation::NetworkRequest(request))
                .await
            {
                Ok(output) => match output.into_http() {
                    Some(response) => state.complete(MissionResult::Http {
                        status_code: response.status_code,
                        content: response.body,
                    }),
                    None => state.fail("Execution error: unexpected effect output"),
                },
                Err(e) => state.fail(describe(&e)),
            }
            return;
        }

        let query = parsed.query.as_deref().unwrap_or(&state.mission).to_string();
        match self.search.search(guard, &query).await {
            Ok(content) => {
                info!("Search completed: {query}");
                state.complete(MissionResult::Http {
                    status_code: 200,
                    content,
                });
            }
            Err(e) => state.fail(describe(&e)),
        }
    }

    // ── Dry checks ────────────────────────────────────────

    /// Human-readable verdict on whether `mission` would be allowed,
    /// without performing any effect.
    pub fn validate_mission(&self, mission: &str) -> String {
        let parsed = mission::parse(mission);
        let skill = parsed.selected_skill();

        // One guard for the selected skill, whatever the target.
        let guard = match self.guards.guard_for(skill) {
            Ok(guard) => guard,
            Err(e) => return format!("Validation error: {e}"),
        };

        let verdict = match (parsed.target, parsed.action, &parsed.path) {
            (Target::File, Action::Read, Some(path)) => guard
                .check(&Operation::FileRead { path: path.clone() })
                .map(|d| verdict(d, "Read denied")),
            (Target::File, Action::Write, Some(path)) => guard
                .check(&Operation::FileWrite {
                    path: path.clone(),
                    data: vec![],
                })
                .map(|d| verdict(d, "Write denied")),
            (Target::Network, _, _) => match &parsed.url {
                Some(url) => guard
                    .check(&Operation::NetworkRequest(NetworkRequest::get(url)))
                    .map(|d| verdict(d, "Network access denied")),
                None if guard.manifest().network => Ok("Operation allowed".to_string()),
                None => Ok("Network access denied".to_string()),
            },
            _ => Ok("Validation not implemented for this operation type".to_string()),
        };

        verdict.unwrap_or_else(|e| format!("Validation error: {e}"))
    }

    /// Text statistics for `text` through the `SimpleAnalysis` skill.
    pub async fn analyze(&self, text: &str) -> MissionOutcome {
        match self.skills.execute("SimpleAnalysis", text).await {
            Ok(output) => MissionOutcome::Result(MissionResult::Skill {
                skill: "SimpleAnalysis".to_string(),
                output,
            }),
            Err(e) => MissionOutcome::Error(format!("Analysis error: {e}")),
        }
    }
}

/// Registers the builtin skills.
pub fn builtin_skills(
    capabilities: Arc<CapabilityRegistry>,
    guards: Arc<GuardFactory>,
    search: Arc<SearchChain>,
) -> Result<SkillRegistry> {
    let mut skills = SkillRegistry::new(capabilities.clone());
    skills.register(Box::new(WebSearchSkill::new(search, guards.clone())))?;
    skills.register(Box::new(FileReadSkill::new(capabilities, guards)))?;
    skills.register(Box::new(DefaultSkill))?;
    skills.register(Box::new(SimpleAnalysisSkill))?;
    Ok(skills)
}

fn verdict(decision: Decision, denied: &str) -> String {
    match decision {
        Decision::Allowed => "Operation allowed".to_string(),
        Decision::Denied(_) => denied.to_string(),
    }
}

/// Caller-facing message for a pipeline failure. Internal failures are
/// wrapped as execution errors.
fn describe(e: &GuardError) -> String {
    match e {
        GuardError::PermissionDenied(_)
        | GuardError::NotFound(_)
        | GuardError::InvalidRequest(_)
        | GuardError::Transport(_) => e.to_string(),
        GuardError::ProviderUnavailable(_) | GuardError::Manifest(_) | GuardError::Io(_) => {
            format!("Execution error: {e}")
        }
    }
}

static RE_NOT_FILTERED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^ЁёА-Яа-я0-9\s]").unwrap());

/// Keeps only Cyrillic letters, ASCII digits and whitespace.
fn filtered_view(content: &str) -> String {
    RE_NOT_FILTERED.replace_all(content, "").trim().to_string()
}
