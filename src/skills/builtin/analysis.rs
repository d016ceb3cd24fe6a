//! Builtin skill: line, word and character statistics for a text.
//!
//! Pure computation, so it declares no capabilities and needs no
//! manifest.

use async_trait::async_trait;

use crate::skills::Skill;

pub struct SimpleAnalysisSkill;

/// Counts for one text. Lines are `\n`-separated; an empty text is one
/// empty line. Characters exclude the line separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStats {
    pub lines: usize,
    pub words: usize,
    pub chars: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        let mut stats = TextStats {
            lines: 0,
            words: 0,
            chars: 0,
        };
        for line in text.split('\n') {
            stats.lines += 1;
            stats.words += line.split_whitespace().count();
            stats.chars += line.chars().count();
        }
        stats
    }
}

#[async_trait]
impl Skill for SimpleAnalysisSkill {
    fn name(&self) -> &str {
        "SimpleAnalysis"
    }

    fn description(&self) -> &str {
        "Text statistics: lines, words, characters"
    }

    async fn execute(&self, input: &str) -> anyhow::Result<String> {
        let stats = TextStats::of(input);
        Ok(format!(
            "Analysis complete:\n• Lines: {}\n• Words: {}\n• Characters: {}",
            stats.lines, stats.words, stats.chars
        ))
    }
}
