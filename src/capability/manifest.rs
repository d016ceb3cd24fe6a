//! Per-skill capability manifest.
//!
//! A manifest lists the filesystem prefixes a skill may read, write or
//! delete, plus on/off flags for network, GPU, sensors and camera.
//! Everything not listed is denied.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Filesystem operation classes a manifest can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Read,
    Write,
    Delete,
}

impl FromStr for FsOp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "read" => Ok(FsOp::Read),
            "write" => Ok(FsOp::Write),
            "delete" => Ok(FsOp::Delete),
            other => anyhow::bail!("unknown filesystem operation: '{other}'"),
        }
    }
}

impl fmt::Display for FsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FsOp::Read => "read",
            FsOp::Write => "write",
            FsOp::Delete => "delete",
        })
    }
}

/// Path patterns per filesystem operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsAccess {
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub write: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
}

impl FsAccess {
    pub fn patterns(&self, op: FsOp) -> &[String] {
        match op {
            FsOp::Read => &self.read,
            FsOp::Write => &self.write,
            FsOp::Delete => &self.delete,
        }
    }
}

/// Declarative policy for one skill, loaded from `<skill>.json`.
///
/// Immutable once loaded; a changed file only takes effect through an
/// explicit reload on the `ManifestStore`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityManifest {
    #[serde(default = "default_skill_name")]
    pub skill_name: String,
    #[serde(default)]
    pub filesystem: FsAccess,
    #[serde(default)]
    pub network: bool,
    #[serde(default)]
    pub gpu: bool,
    #[serde(default)]
    pub sensors: bool,
    #[serde(default)]
    pub camera: bool,
    /// Optional host allow-list for network requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_domains: Option<Vec<String>>,
}

fn default_skill_name() -> String {
    "default".to_string()
}

/// Sections every manifest document must carry to be considered valid.
const REQUIRED_SECTIONS: &[&str] = &["filesystem", "network", "gpu"];

impl CapabilityManifest {
    /// Deny-everything manifest, written when a skill has no manifest yet.
    pub fn deny_all(skill_name: &str) -> Self {
        Self {
            skill_name: skill_name.to_string(),
            filesystem: FsAccess::default(),
            network: false,
            gpu: false,
            sensors: false,
            camera: false,
            allowed_domains: None,
        }
    }

    /// Placeholder manifest printed by `apex manifest generate`.
    pub fn template() -> Self {
        Self {
            skill_name: "default".to_string(),
            filesystem: FsAccess {
                read: vec!["/safe/path/*".to_string()],
                write: vec!["/output/dir/".to_string()],
                delete: vec![],
            },
            network: true,
            gpu: false,
            sensors: false,
            camera: false,
            allowed_domains: None,
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that a raw manifest document has the mandatory sections.
    pub fn check_sections(json: &str) -> anyhow::Result<()> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        for section in REQUIRED_SECTIONS {
            if value.get(section).is_none() {
                anyhow::bail!("missing section: {section}");
            }
        }
        // Also make sure the document deserializes with the right types.
        serde_json::from_value::<CapabilityManifest>(value)?;
        Ok(())
    }

    /// Returns true iff `path` lies under (or equals) one of the patterns
    /// listed for `op`. An empty list never matches.
    pub fn validate(&self, op: FsOp, path: &str) -> bool {
        let normalized = normalize_path(path);
        self.filesystem
            .patterns(op)
            .iter()
            .any(|pattern| pattern_matches(pattern, &normalized))
    }

    /// Whether `host` passes the optional domain allow-list.
    pub fn allows_host(&self, host: &str) -> bool {
        match &self.allowed_domains {
            None => true,
            Some(domains) => domains.iter().any(|d| d.eq_ignore_ascii_case(host)),
        }
    }
}

/// Normalizes a path to an absolute, `/`-delimited form.
///
/// Backslashes become slashes, `.` segments vanish and `..` pops a
/// segment but never climbs above the root. A leading drive letter
/// (`C:`) is kept, upper-cased, and marks the path as absolute. Relative
/// paths are anchored at the current working directory.
pub fn normalize_path(path: &str) -> String {
    let mut rest = path.trim().replace('\\', "/");
    let mut drive = None;

    let bytes = rest.as_bytes();
    if bytes.len() >= 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic() {
        drive = Some(format!("{}:", (bytes[0] as char).to_ascii_uppercase()));
        rest = rest[2..].to_string();
    }

    if drive.is_none() && !rest.starts_with('/') {
        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| "/".to_string());
        // The working directory may itself carry a drive prefix.
        return normalize_path(&format!("{cwd}/{rest}"));
    }

    let mut segments: Vec<&str> = Vec::new();
    for part in rest.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    format!("{}/{}", drive.unwrap_or_default(), segments.join("/"))
}

/// True if `path` (already normalized) equals `base` or lies below it.
pub(crate) fn is_within(path: &str, base: &str) -> bool {
    if base.ends_with('/') {
        return path.starts_with(base);
    }
    path == base
        || path
            .strip_prefix(base)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Matches one manifest pattern against a normalized path.
///
/// `dir/*` and `dir/` are directory prefixes; `name*` is a raw string
/// prefix; anything else matches itself and everything below it.
fn pattern_matches(pattern: &str, normalized: &str) -> bool {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return false;
    }

    match pattern.strip_suffix('*') {
        Some(stem) => {
            let stem = stem.trim_end_matches('*');
            if stem.is_empty() || stem.ends_with('/') || stem.ends_with('\\') {
                is_within(normalized, &normalize_path(stem))
            } else {
                normalized.starts_with(&normalize_path(stem))
            }
        }
        None => is_within(normalized, &normalize_path(pattern)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_with_read(patterns: &[&str]) -> CapabilityManifest {
        let mut m = CapabilityManifest::deny_all("TestSkill");
        m.filesystem.read = patterns.iter().map(|p| p.to_string()).collect();
        m
    }

    // ── normalize_path ───────────────────────────────────

    #[test]
    fn test_normalize_collapses_dots() {
        assert_eq!(normalize_path("/tmp/../etc"), "/etc");
        assert_eq!(normalize_path("/var/./log/../tmp"), "/var/tmp");
        assert_eq!(normalize_path("/a/b/c/../../d"), "/a/d");
    }

    #[test]
    fn test_normalize_never_climbs_above_root() {
        assert_eq!(normalize_path("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(normalize_path("C:\\..\\Windows"), "C:/Windows");
    }

    #[test]
    fn test_normalize_drive_paths() {
        assert_eq!(normalize_path("C:\\Windows\\..\\System32"), "C:/System32");
        assert_eq!(normalize_path("c:\\\\Users\\\\test"), "C:/Users/test");
        assert_eq!(normalize_path("C:\\data\\a.txt"), "C:/data/a.txt");
    }

    #[test]
    fn test_normalize_root() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("//"), "/");
    }

    #[test]
    fn test_normalize_relative_is_absolute() {
        let normalized = normalize_path("some/file.txt");
        assert!(normalized.starts_with('/') || normalized.as_bytes()[1] == b':');
        assert!(normalized.ends_with("/some/file.txt"));
    }

    // ── validate ─────────────────────────────────────────

    #[test]
    fn test_validate_wildcard_prefix() {
        let m = manifest_with_read(&["/data/*"]);
        assert!(m.validate(FsOp::Read, "/data/a.txt"));
        assert!(m.validate(FsOp::Read, "/data/nested/deep/b.bin"));
        assert!(!m.validate(FsOp::Read, "/etc/passwd"));
    }

    #[test]
    fn test_validate_empty_list_denies() {
        let m = CapabilityManifest::deny_all("x");
        assert!(!m.validate(FsOp::Read, "/data/a.txt"));
        assert!(!m.validate(FsOp::Write, "/"));
        assert!(!m.validate(FsOp::Delete, "/tmp"));
    }

    #[test]
    fn test_validate_blocks_traversal() {
        let mut m = manifest_with_read(&["/data"]);
        m.filesystem.delete = vec!["/tmp".to_string()];
        assert!(!m.validate(FsOp::Read, "/data/../etc/passwd"));
        assert!(!m.validate(FsOp::Delete, "/tmp/../etc"));
        assert!(!m.validate(FsOp::Read, "/data/./../root"));
        assert!(m.validate(FsOp::Read, "/data/./file.txt"));
    }

    #[test]
    fn test_validate_exact_directory_is_contained() {
        let m = manifest_with_read(&["/data"]);
        assert!(m.validate(FsOp::Read, "/data"));
        assert!(m.validate(FsOp::Read, "/data/x"));
    }

    #[test]
    fn test_validate_sibling_prefix_does_not_match() {
        let m = manifest_with_read(&["/data/*"]);
        assert!(!m.validate(FsOp::Read, "/database/secret"));
        let m = manifest_with_read(&["/data"]);
        assert!(!m.validate(FsOp::Read, "/data2/file"));
    }

    #[test]
    fn test_validate_raw_wildcard_prefix() {
        let m = manifest_with_read(&["/logs/app*"]);
        assert!(m.validate(FsOp::Read, "/logs/app.log"));
        assert!(m.validate(FsOp::Read, "/logs/app-2024/x.log"));
        assert!(!m.validate(FsOp::Read, "/logs/other.log"));
    }

    #[test]
    fn test_validate_windows_patterns() {
        let mut m = CapabilityManifest::deny_all("FileWriter");
        m.filesystem.write = vec!["C:\\data\\*".to_string()];
        assert!(m.validate(FsOp::Write, "C:\\data\\a.txt"));
        assert!(m.validate(FsOp::Write, "C:/data/sub/b.txt"));
        assert!(!m.validate(FsOp::Write, "C:\\Windows\\win.ini"));
        assert!(!m.validate(FsOp::Read, "C:\\data\\a.txt"));
    }

    #[test]
    fn test_validate_operations_are_independent() {
        let m = manifest_with_read(&["/data/*"]);
        assert!(m.validate(FsOp::Read, "/data/a"));
        assert!(!m.validate(FsOp::Write, "/data/a"));
        assert!(!m.validate(FsOp::Delete, "/data/a"));
    }

    // ── serde / helpers ──────────────────────────────────

    #[test]
    fn test_from_json_full_document() {
        let json = r#"{
            "skill_name": "FileReader",
            "filesystem": {"read": ["/data/*"], "write": [], "delete": []},
            "network": false, "gpu": true, "sensors": false, "camera": true
        }"#;
        let m = CapabilityManifest::from_json(json).unwrap();
        assert_eq!(m.skill_name, "FileReader");
        assert_eq!(m.filesystem.read, vec!["/data/*"]);
        assert!(m.gpu);
        assert!(m.camera);
        assert!(m.allowed_domains.is_none());
    }

    #[test]
    fn test_from_json_missing_fields_default_to_deny() {
        let m = CapabilityManifest::from_json(r#"{"skill_name": "x"}"#).unwrap();
        assert!(!m.network);
        assert!(m.filesystem.read.is_empty());
    }

    #[test]
    fn test_deny_all_serializes_without_domains() {
        let json = CapabilityManifest::deny_all("WebSearch").to_json_pretty().unwrap();
        assert!(json.contains("\"skill_name\": \"WebSearch\""));
        assert!(json.contains("\"network\": false"));
        assert!(!json.contains("allowed_domains"));
    }

    #[test]
    fn test_template_shape() {
        let t = CapabilityManifest::template();
        assert_eq!(t.filesystem.read, vec!["/safe/path/*"]);
        assert_eq!(t.filesystem.write, vec!["/output/dir/"]);
        assert!(t.network);
        let json = t.to_json_pretty().unwrap();
        assert!(CapabilityManifest::check_sections(&json).is_ok());
    }

    #[test]
    fn test_check_sections_reports_missing() {
        let err = CapabilityManifest::check_sections(r#"{"filesystem": {}, "network": true}"#)
            .unwrap_err();
        assert!(err.to_string().contains("gpu"));
    }

    #[test]
    fn test_allows_host() {
        let mut m = CapabilityManifest::deny_all("WebSearch");
        assert!(m.allows_host("anything.example"));
        m.allowed_domains = Some(vec!["en.wikipedia.org".to_string()]);
        assert!(m.allows_host("en.wikipedia.org"));
        assert!(m.allows_host("EN.Wikipedia.org"));
        assert!(!m.allows_host("evil.example"));
    }

    #[test]
    fn test_fs_op_from_str() {
        assert_eq!("read".parse::<FsOp>().unwrap(), FsOp::Read);
        assert_eq!("WRITE".parse::<FsOp>().unwrap(), FsOp::Write);
        assert!("execute".parse::<FsOp>().is_err());
        assert_eq!(FsOp::Delete.to_string(), "delete");
    }
}
