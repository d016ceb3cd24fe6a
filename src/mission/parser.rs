//! Free-text mission → structured command.
//!
//! Classification is keyword based: the first action category whose
//! keyword list has a match wins, categories are tried in the fixed
//! order read, write, get, post. Nothing here performs I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Get,
    Post,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    File,
    Network,
    None,
}

/// Keyword lists per action, in match priority order.
const ACTION_KEYWORDS: &[(Action, &[&str])] = &[
    (Action::Read, &["прочита", "открой", "покажи", "read", "open", "show"]),
    (Action::Write, &["запиши", "сохрани", "write", "save"]),
    (
        Action::Get,
        &["найди", "найти", "запрос", "получи", "поиск", "get", "find", "query"],
    ),
    (Action::Post, &["отправь", "пост", "send", "post"]),
];

/// Drive-style absolute path, e.g. `C:\data\a.txt`.
static RE_DRIVE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([A-Za-z]:\\[^\s"']+)"#).unwrap());

/// POSIX absolute path standing alone as a token.
static RE_POSIX_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:^|\s)(/[^\s"']+)"#).unwrap());

/// `file: path`, `файл "path"` and similar.
static RE_FILE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:файл|file)[\s:]+['"]?([^\s'"]+)['"]?"#).unwrap()
});

static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)https?://[^\s"'<>]+"#).unwrap());

/// First single- or double-quoted segment.
static RE_QUOTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap());

/// Search keywords removed from a query, whole words only.
static RE_GET_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(найди|найти|запрос|получи|поиск|get|find|query)\b")
        .unwrap()
});

/// Structured intent derived from one mission text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedCommand {
    pub action: Action,
    pub target: Target,
    pub path: Option<String>,
    pub url: Option<String>,
    pub query: Option<String>,
    /// Quoted payload of a write or post mission.
    pub data: Option<String>,
}

impl ParsedCommand {
    /// Name of the skill that handles this command.
    pub fn selected_skill(&self) -> &'static str {
        match (self.target, self.action) {
            (Target::File, Action::Read) => "FileReader",
            (Target::File, Action::Write) => "FileWriter",
            (Target::Network, _) => "WebSearch",
            _ => "DefaultSkill",
        }
    }
}

/// Parses `mission` into a [`ParsedCommand`]. Deterministic: the same
/// text always yields the same command.
pub fn parse(mission: &str) -> ParsedCommand {
    let lower = mission.to_lowercase();
    let action = classify(&lower);

    let mut command = ParsedCommand {
        action,
        target: Target::None,
        path: None,
        url: None,
        query: None,
        data: None,
    };

    if matches!(action, Action::Read | Action::Write) {
        if let Some((path, end)) = extract_path(mission) {
            command.target = Target::File;
            command.path = Some(path);
            if action == Action::Write {
                command.data = quoted_after(mission, end);
            }
        }
    }

    if matches!(action, Action::Get | Action::Post) {
        if let Some(m) = RE_URL.find(mission) {
            command.target = Target::Network;
            command.url = Some(m.as_str().to_string());
            if action == Action::Post {
                command.data = quoted_after(mission, m.end());
            }
        }
    }

    if action == Action::Get {
        command.target = Target::Network;
        let stripped = RE_GET_KEYWORDS.replace_all(&lower, "");
        let query = stripped.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'');
        command.query = Some(if query.is_empty() {
            mission.to_string()
        } else {
            query.to_string()
        });
    }

    info!(
        action = ?command.action,
        target = ?command.target,
        path = ?command.path,
        url = ?command.url,
        query = ?command.query,
        skill = command.selected_skill(),
        "Parsed mission"
    );
    command
}

fn classify(lower: &str) -> Action {
    ACTION_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(action, _)| *action)
        .unwrap_or(Action::None)
}

/// Finds the target path and the byte offset where it ends.
fn extract_path(mission: &str) -> Option<(String, usize)> {
    if let Some(m) = RE_DRIVE_PATH.find(mission) {
        return Some((m.as_str().to_string(), m.end()));
    }
    if let Some(c) = RE_POSIX_PATH.captures(mission).and_then(|c| c.get(1)) {
        return Some((c.as_str().to_string(), c.end()));
    }
    RE_FILE_PATH
        .captures(mission)
        .and_then(|c| c.get(1))
        .map(|c| (c.as_str().to_string(), c.end()))
}

fn quoted_after(mission: &str, offset: usize) -> Option<String> {
    let rest = mission.get(offset..)?;
    RE_QUOTED.captures(rest).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_drive_path() {
        let cmd = parse(r"read C:\data\a.txt");
        assert_eq!(cmd.action, Action::Read);
        assert_eq!(cmd.target, Target::File);
        assert_eq!(cmd.path.as_deref(), Some(r"C:\data\a.txt"));
        assert_eq!(cmd.selected_skill(), "FileReader");
    }

    #[test]
    fn test_find_cats() {
        let cmd = parse("find cats");
        assert_eq!(cmd.action, Action::Get);
        assert_eq!(cmd.target, Target::Network);
        assert_eq!(cmd.query.as_deref(), Some("cats"));
        assert_eq!(cmd.selected_skill(), "WebSearch");
    }

    #[test]
    fn test_parse_is_idempotent() {
        for mission in [
            r"read C:\data\a.txt",
            "find cats",
            "write /tmp/out.txt 'hello world'",
            "hello there",
            "найди \"кубик рубика\"",
        ] {
            assert_eq!(parse(mission), parse(mission), "{mission}");
        }
    }

    #[test]
    fn test_russian_keywords() {
        let cmd = parse(r"прочитай файл C:\docs\notes.txt");
        assert_eq!(cmd.action, Action::Read);
        assert_eq!(cmd.path.as_deref(), Some(r"C:\docs\notes.txt"));

        let cmd = parse("найди \"илон маск\"");
        assert_eq!(cmd.action, Action::Get);
        assert_eq!(cmd.query.as_deref(), Some("илон маск"));
    }

    #[test]
    fn test_first_category_wins() {
        // "show" (read) beats "find" (get).
        let cmd = parse("show me what find returns");
        assert_eq!(cmd.action, Action::Read);
        assert_eq!(cmd.target, Target::None);
        assert_eq!(cmd.selected_skill(), "DefaultSkill");
    }

    #[test]
    fn test_loose_file_pattern() {
        let cmd = parse("open file: 'notes.txt'");
        assert_eq!(cmd.target, Target::File);
        assert_eq!(cmd.path.as_deref(), Some("notes.txt"));
    }

    #[test]
    fn test_posix_path_and_write_data() {
        let cmd = parse("write /tmp/out.txt 'hello world'");
        assert_eq!(cmd.action, Action::Write);
        assert_eq!(cmd.path.as_deref(), Some("/tmp/out.txt"));
        assert_eq!(cmd.data.as_deref(), Some("hello world"));
        assert_eq!(cmd.selected_skill(), "FileWriter");
    }

    #[test]
    fn test_write_without_data() {
        let cmd = parse(r"save C:\tmp\x.txt");
        assert_eq!(cmd.target, Target::File);
        assert_eq!(cmd.data, None);
    }

    #[test]
    fn test_get_with_only_keyword_falls_back_to_mission() {
        let cmd = parse("Find");
        assert_eq!(cmd.query.as_deref(), Some("Find"));
    }

    #[test]
    fn test_keyword_inside_word_not_stripped() {
        let cmd = parse("find getaway cars");
        assert_eq!(cmd.query.as_deref(), Some("getaway cars"));
    }

    #[test]
    fn test_url_missions() {
        let cmd = parse("get https://example.com/api?x=1");
        assert_eq!(cmd.target, Target::Network);
        assert_eq!(cmd.url.as_deref(), Some("https://example.com/api?x=1"));

        let cmd = parse(r#"send https://example.com/hook "ping""#);
        assert_eq!(cmd.action, Action::Post);
        assert_eq!(cmd.target, Target::Network);
        assert_eq!(cmd.data.as_deref(), Some("ping"));
    }

    #[test]
    fn test_post_without_url_is_not_network() {
        let cmd = parse("send my regards");
        assert_eq!(cmd.action, Action::Post);
        assert_eq!(cmd.target, Target::None);
        assert_eq!(cmd.selected_skill(), "DefaultSkill");
    }

    #[test]
    fn test_unrecognized_is_default() {
        let cmd = parse("hello there");
        assert_eq!(cmd.action, Action::None);
        assert_eq!(cmd.target, Target::None);
        assert_eq!(cmd.selected_skill(), "DefaultSkill");
    }
}
