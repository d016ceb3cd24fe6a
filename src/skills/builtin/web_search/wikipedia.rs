//! Wikipedia REST summary provider.
//!
//! Calls `GET https://{lang}.wikipedia.org/api/rest_v1/page/summary/{title}`
//! and answers with the `extract` field. The query is turned into a page
//! title differently for the native and the foreign edition.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use url::form_urlencoded;

use super::{SearchProvider, USER_AGENT};
use crate::operation::NetworkRequest;

/// Whole-query corrections for well-known names, checked first.
const NAME_CORRECTIONS: &[(&str, &str)] = &[
    ("илон маск", "Elon Musk"),
    ("битокин", "Bitcoin"),
    ("кубик рубика", "Rubik's Cube"),
];

/// Whole-word replacements applied before letter transliteration.
static RE_WORD_MAP: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        ("илон", "elon"),
        ("маск", "musk"),
        ("битокин", "bitcoin"),
        ("биткоин", "bitcoin"),
        ("рубик", "rubik"),
        ("кубик", "cube"),
    ]
    .into_iter()
    .map(|(ru, en)| (Regex::new(&format!(r"(?i)\b{ru}\b")).unwrap(), en))
    .collect()
});

/// How a query becomes a page title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleStyle {
    /// Every word capitalized (native edition).
    Capitalized,
    /// Known-name corrections, else Cyrillic transliterated to Latin
    /// (foreign edition).
    Transliterated,
}

#[derive(Deserialize)]
struct Summary {
    #[serde(default)]
    extract: String,
}

pub struct WikipediaProvider {
    lang: String,
    style: TitleStyle,
    name: String,
}

impl WikipediaProvider {
    pub fn new(lang: &str, style: TitleStyle) -> Self {
        Self {
            lang: lang.to_string(),
            style,
            name: format!("wikipedia-{lang}"),
        }
    }

    fn title(&self, query: &str) -> String {
        let title = match self.style {
            TitleStyle::Capitalized => query
                .split_whitespace()
                .map(capitalize)
                .collect::<Vec<_>>()
                .join(" "),
            TitleStyle::Transliterated => english_title(query),
        };
        title.replace(' ', "_")
    }
}

impl SearchProvider for WikipediaProvider {
    fn provider_name(&self) -> &str {
        &self.name
    }

    fn request(&self, query: &str) -> Option<NetworkRequest> {
        let title: String = form_urlencoded::byte_serialize(self.title(query).as_bytes()).collect();
        Some(
            NetworkRequest::get(format!(
                "https://{}.wikipedia.org/api/rest_v1/page/summary/{title}",
                self.lang
            ))
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json"),
        )
    }

    fn extract(&self, body: &str) -> anyhow::Result<String> {
        let summary: Summary = serde_json::from_str(body)?;
        Ok(summary.extract)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn english_title(query: &str) -> String {
    let lower = query.to_lowercase();
    if let Some((_, name)) = NAME_CORRECTIONS.iter().find(|(ru, _)| lower.contains(ru)) {
        return name.to_string();
    }

    let mut text = query.to_string();
    for (re, en) in RE_WORD_MAP.iter() {
        text = re.replace_all(&text, *en).into_owned();
    }
    transliterate(&text)
}

/// Lower-cases and maps Cyrillic letters to Latin; spaces, hyphens and
/// underscores all become `_`.
fn transliterate(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        let mapped = match c {
            'а' => "a",
            'б' => "b",
            'в' => "v",
            'г' => "g",
            'д' => "d",
            'е' => "e",
            'ё' => "yo",
            'ж' => "zh",
            'з' => "z",
            'и' => "i",
            'й' => "y",
            'к' => "k",
            'л' => "l",
            'м' => "m",
            'н' => "n",
            'о' => "o",
            'п' => "p",
            'р' => "r",
            'с' => "s",
            'т' => "t",
            'у' => "u",
            'ф' => "f",
            'х' => "kh",
            'ц' => "ts",
            'ч' => "ch",
            'ш' => "sh",
            'щ' => "shch",
            'ъ' | 'ь' => "",
            'ы' => "y",
            'э' => "e",
            'ю' => "yu",
            'я' => "ya",
            ' ' | '-' | '_' => "_",
            other => {
                out.push(other);
                continue;
            }
        };
        out.push_str(mapped);
    }
    out
}
