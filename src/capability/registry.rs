//! Coarse capability allow-list.
//!
//! Maps a capability name (usually the skill name) to a descriptor with
//! a risk level and optional path patterns. The skill registry consults
//! it before a skill runs, independently of the per-skill manifest.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

/// Coarse descriptor for one capability.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CapabilityEntry {
    /// Resource class, e.g. `"network"` or `"filesystem"`.
    pub capability: String,
    pub risk_level: u8,
    /// Path patterns; `*` suffix is a prefix match, otherwise exact.
    #[serde(default)]
    pub paths: Vec<String>,
}

/// A named entry as it appears in the `[[capabilities]]` config table.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedCapability {
    pub name: String,
    #[serde(flatten)]
    pub entry: CapabilityEntry,
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityRegistry {
    entries: HashMap<String, CapabilityEntry>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the builtin `WebSearch` and `FileRead` entries.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(
            "WebSearch",
            CapabilityEntry {
                capability: "network".to_string(),
                risk_level: 1,
                paths: vec![],
            },
        );
        registry.insert(
            "FileRead",
            CapabilityEntry {
                capability: "filesystem".to_string(),
                risk_level: 2,
                paths: vec!["/workspace/read/*".to_string()],
            },
        );
        registry
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, name: &str, entry: CapabilityEntry) {
        self.entries.insert(name.to_string(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&CapabilityEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Coarse check. Unknown names are refused. When `path` is given, it
    /// must match one of the entry's patterns (an entry without patterns
    /// then refuses); without a path any known entry passes.
    pub fn check_capability(&self, name: &str, path: Option<&str>) -> bool {
        let Some(entry) = self.entries.get(name) else {
            debug!(capability = name, "Unknown capability");
            return false;
        };

        match path {
            Some(path) if !path.is_empty() => {
                entry.paths.iter().any(|allowed| path_matches(allowed, path))
            }
            _ => true,
        }
    }
}

/// Pattern match tolerant of a missing leading `/` on either side.
fn path_matches(allowed: &str, path: &str) -> bool {
    let path = path.replace('\\', "/");
    match allowed.strip_suffix('*') {
        Some(prefix) => {
            path.starts_with(prefix) || path.starts_with(prefix.trim_start_matches('/'))
        }
        None => {
            path == allowed
                || (allowed.starts_with('/') && path == allowed.trim_start_matches('/'))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_capability_refused() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(!registry.check_capability("Teleport", None));
        assert!(!registry.check_capability("Teleport", Some("/x")));
    }

    #[test]
    fn test_known_capability_without_path_passes() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(registry.check_capability("WebSearch", None));
        assert!(registry.check_capability("FileRead", None));
        assert!(registry.check_capability("FileRead", Some("")));
    }

    #[test]
    fn test_wildcard_with_and_without_leading_slash() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(registry.check_capability("FileRead", Some("/workspace/read/a.txt")));
        assert!(registry.check_capability("FileRead", Some("workspace/read/a.txt")));
        assert!(!registry.check_capability("FileRead", Some("/workspace/write/a.txt")));
    }

    #[test]
    fn test_exact_pattern() {
        let mut registry = CapabilityRegistry::new();
        registry.insert(
            "Conf",
            CapabilityEntry {
                capability: "filesystem".to_string(),
                risk_level: 3,
                paths: vec!["/etc/app.conf".to_string()],
            },
        );
        assert!(registry.check_capability("Conf", Some("/etc/app.conf")));
        assert!(registry.check_capability("Conf", Some("etc/app.conf")));
        assert!(!registry.check_capability("Conf", Some("/etc/app.conf.bak")));
    }

    #[test]
    fn test_path_given_but_no_patterns_refused() {
        let registry = CapabilityRegistry::with_defaults();
        assert!(!registry.check_capability("WebSearch", Some("/tmp/x")));
    }

    #[test]
    fn test_named_capability_from_toml() {
        let entry: NamedCapability = toml::from_str(
            r#"
name = "FileRead"
capability = "filesystem"
risk_level = 2
paths = ["/srv/data/*"]
"#,
        )
        .unwrap();
        assert_eq!(entry.name, "FileRead");
        assert_eq!(entry.entry.risk_level, 2);
        assert_eq!(entry.entry.paths, vec!["/srv/data/*"]);
    }
}
