//! The enforcement core.
//!
//! A [`Guard`] owns one manifest. [`Guard::check`] turns an
//! [`Operation`] into a [`Decision`]; [`Guard::check_and_execute`] runs
//! the matching effector only when that decision is `Allowed`, inside an
//! isolation scope that is released on every exit path.
//!
//! Every operation goes through a Guard before any effector sees it.

mod protected;

pub use protected::ProtectedPaths;

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::capability::{normalize_path, store, CapabilityManifest, FsOp, ManifestStore};
use crate::effectors::device;
use crate::effectors::{Effectors, HttpResponse};
use crate::error::{Decision, DeniedKind, Denial, GuardError};
use crate::operation::{HttpMethod, NetworkRequest, Operation};

/// Redirect hops followed for one network request.
const MAX_REDIRECTS: usize = 5;

/// Result of an executed operation, as produced by its effector.
#[derive(Debug, Clone, PartialEq)]
pub enum EffectOutput {
    /// File contents, GPU output or a camera frame.
    Bytes(Vec<u8>),
    /// Number of bytes written by a file write.
    Written(usize),
    Http(HttpResponse),
    /// A sensor reading.
    Reading(f64),
}

impl EffectOutput {
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            EffectOutput::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_http(self) -> Option<HttpResponse> {
        match self {
            EffectOutput::Http(response) => Some(response),
            _ => None,
        }
    }
}

pub struct Guard {
    manifest: Arc<CapabilityManifest>,
    effectors: Arc<Effectors>,
    protected: Arc<ProtectedPaths>,
}

impl Guard {
    pub fn new(
        manifest: Arc<CapabilityManifest>,
        effectors: Arc<Effectors>,
        protected: Arc<ProtectedPaths>,
    ) -> Self {
        Self {
            manifest,
            effectors,
            protected,
        }
    }

    pub fn manifest(&self) -> &CapabilityManifest {
        &self.manifest
    }

    /// Decides a filesystem operation: protected directories first, then
    /// the manifest.
    ///
    /// Both checks apply to the literal path and, when it differs, to the
    /// path the filesystem resolves it to, so a symlink cannot lead out of
    /// the granted prefixes or into a protected directory.
    pub fn check_file(&self, op: FsOp, path: &str) -> Decision {
        let kind = match op {
            FsOp::Read => DeniedKind::Read,
            FsOp::Write => DeniedKind::Write,
            FsOp::Delete => DeniedKind::Delete,
        };
        let resolved = resolve_links(path).filter(|r| normalize_path(r) != normalize_path(path));

        for candidate in std::iter::once(path).chain(resolved.as_deref()) {
            if let Some(dir) = self.protected.matching(candidate) {
                return Decision::Denied(Denial::new(
                    kind,
                    format!("{candidate} is inside protected directory {dir}"),
                ));
            }
        }
        if !self.manifest.validate(op, path) {
            return Decision::Denied(Denial::new(kind, path.to_string()));
        }
        match resolved {
            Some(target) if !self.manifest.validate(op, &target) => Decision::Denied(Denial::new(
                kind,
                format!("{path} resolves to {target}"),
            )),
            _ => Decision::Allowed,
        }
    }

    /// Decides whether `operation` may run. Malformed network requests
    /// are `InvalidRequest` errors rather than denials.
    pub fn check(&self, operation: &Operation) -> Result<Decision, GuardError> {
        let skill = &self.manifest.skill_name;
        let decision = match operation {
            Operation::FileRead { path } => self.check_file(FsOp::Read, path),
            Operation::FileWrite { path, .. } => self.check_file(FsOp::Write, path),
            Operation::NetworkRequest(request) => self.check_network(request)?,
            Operation::GpuCompute { .. } => {
                flag_decision(self.manifest.gpu, DeniedKind::Gpu, skill)
            }
            Operation::SensorRead { .. } => {
                flag_decision(self.manifest.sensors, DeniedKind::Sensor, skill)
            }
            Operation::CameraCapture => {
                flag_decision(self.manifest.camera, DeniedKind::Camera, skill)
            }
        };

        match &decision {
            Decision::Allowed => info!(skill = %skill, op = operation.kind(), "Operation allowed"),
            Decision::Denied(denial) => {
                warn!(skill = %skill, op = operation.kind(), "Operation denied: {denial}")
            }
        }
        Ok(decision)
    }

    /// Decides a network request: the manifest's network flag, then the
    /// URL shape, then the optional domain allow-list.
    fn check_network(&self, request: &NetworkRequest) -> Result<Decision, GuardError> {
        if !self.manifest.network {
            return Ok(Decision::Denied(Denial::new(
                DeniedKind::Network,
                format!(
                    "manifest '{}' does not allow network access",
                    self.manifest.skill_name
                ),
            )));
        }
        let url = request.parsed_url()?;
        let host = url.host_str().unwrap_or_default();
        if self.manifest.allows_host(host) {
            Ok(Decision::Allowed)
        } else {
            Ok(Decision::Denied(Denial::new(
                DeniedKind::Network,
                format!("domain not allowed: {host}"),
            )))
        }
    }

    /// Performs an approved request, following redirects itself. Every
    /// `Location` hop is checked like a new request before it is sent.
    async fn fetch(&self, mut request: NetworkRequest) -> Result<HttpResponse, GuardError> {
        for _ in 0..=MAX_REDIRECTS {
            let response = self.effectors.http.execute(&request).await?;
            let Some(next) = redirect_target(&request, &response)? else {
                return Ok(response);
            };

            if let Decision::Denied(denial) = self.check_network(&next)? {
                warn!(from = %request.url, to = %next.url, "Redirect denied: {denial}");
                return Err(GuardError::PermissionDenied(denial));
            }
            info!(from = %request.url, to = %next.url, "Following redirect");
            request = next;
        }
        Err(GuardError::Transport(format!(
            "too many redirects (more than {MAX_REDIRECTS})"
        )))
    }

    /// Checks `operation` and, when allowed, runs it through its effector.
    /// The effector's result is returned unchanged, except that an
    /// unavailable GPU echoes the input data back.
    pub async fn check_and_execute(
        &self,
        operation: Operation,
    ) -> Result<EffectOutput, GuardError> {
        if let Decision::Denied(denial) = self.check(&operation)? {
            return Err(GuardError::PermissionDenied(denial));
        }

        // Released when this function returns, on success or error.
        let _scope = self.effectors.sandbox.enter(&self.manifest)?;

        match operation {
            Operation::FileRead { path } => {
                Ok(EffectOutput::Bytes(self.effectors.files.read(&path).await?))
            }
            Operation::FileWrite { path, data } => Ok(EffectOutput::Written(
                self.effectors.files.write(&path, &data).await?,
            )),
            Operation::NetworkRequest(request) => Ok(EffectOutput::Http(self.fetch(request).await?)),
            Operation::GpuCompute { shader_code, data } => {
                match self.effectors.gpu.compute(&shader_code, &data) {
                    Ok(output) => Ok(EffectOutput::Bytes(output)),
                    Err(GuardError::ProviderUnavailable(reason)) => {
                        warn!("GPU unavailable ({reason}), echoing input data");
                        Ok(EffectOutput::Bytes(data))
                    }
                    Err(e) => Err(e),
                }
            }
            Operation::SensorRead { sensor_type } => {
                Ok(EffectOutput::Reading(device::read_sensor(&sensor_type)?))
            }
            Operation::CameraCapture => Ok(EffectOutput::Bytes(device::capture_camera())),
        }
    }
}

/// Where the filesystem takes `path`: the canonical form of its longest
/// existing prefix, with the not-yet-existing rest appended. `None` when
/// no prefix exists (e.g. a drive path on a POSIX host).
fn resolve_links(path: &str) -> Option<String> {
    let literal = Path::new(path);
    for ancestor in literal.ancestors() {
        if ancestor.as_os_str().is_empty() {
            break;
        }
        let Ok(real) = std::fs::canonicalize(ancestor) else {
            continue;
        };
        let rest = literal.strip_prefix(ancestor).ok()?;
        let full = if rest.as_os_str().is_empty() {
            real
        } else {
            real.join(rest)
        };
        let full = full.to_string_lossy();
        // Windows verbatim prefix.
        return Some(full.strip_prefix(r"\\?\").unwrap_or(&full).to_string());
    }
    None
}

/// Request for the next hop of a 3xx response, if it is a redirect.
///
/// 303, and 301/302 after a POST, continue as a bodiless GET. Headers
/// only carry over to the same host.
fn redirect_target(
    request: &NetworkRequest,
    response: &HttpResponse,
) -> Result<Option<NetworkRequest>, GuardError> {
    let status = response.status_code;
    if !matches!(status, 301 | 302 | 303 | 307 | 308) {
        return Ok(None);
    }
    let Some(location) = response
        .headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("location"))
        .map(|(_, value)| value.as_str())
    else {
        return Ok(None);
    };

    let current = request.parsed_url()?;
    let next = current.join(location).map_err(|e| {
        GuardError::InvalidRequest(format!("invalid redirect location '{location}': {e}"))
    })?;

    let keep_method = matches!(status, 307 | 308)
        || (request.method == HttpMethod::Get && matches!(status, 301 | 302));
    let mut hop = if keep_method {
        NetworkRequest {
            url: next.to_string(),
            headers: Default::default(),
            ..request.clone()
        }
    } else {
        NetworkRequest::get(next.to_string())
    };
    if next.host_str() == current.host_str() {
        hop.headers = request.headers.clone();
    }
    Ok(Some(hop))
}

fn flag_decision(enabled: bool, kind: DeniedKind, skill: &str) -> Decision {
    if enabled {
        Decision::Allowed
    } else {
        Decision::Denied(Denial::new(
            kind,
            format!("manifest '{skill}' does not grant it"),
        ))
    }
}

/// Builds Guards that share one manifest store and one set of effectors.
pub struct GuardFactory {
    store: Arc<ManifestStore>,
    effectors: Arc<Effectors>,
    protected: Arc<ProtectedPaths>,
}

impl GuardFactory {
    pub fn new(
        store: Arc<ManifestStore>,
        effectors: Arc<Effectors>,
        protected: ProtectedPaths,
    ) -> Self {
        Self {
            store,
            effectors,
            protected: Arc::new(protected),
        }
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Guard for `skill`'s manifest, creating a deny-all manifest if the
    /// skill has none yet.
    pub fn guard_for(&self, skill: &str) -> Result<Guard, GuardError> {
        let manifest = self.store.load(skill)?;
        Ok(self.guard_with(manifest))
    }

    /// Guard for an explicit manifest file (created deny-all if absent).
    pub fn guard_from_file(&self, path: &Path) -> Result<Guard, GuardError> {
        let manifest = store::load_or_create(path, "default")?;
        Ok(self.guard_with(Arc::new(manifest)))
    }

    pub fn guard_with(&self, manifest: Arc<CapabilityManifest>) -> Guard {
        Guard::new(
            manifest,
            Arc::clone(&self.effectors),
            Arc::clone(&self.protected),
        )
    }
}
