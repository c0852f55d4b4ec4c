/*!
 * Script statistics and dialogue previews shown after parsing.
 */

use std::fmt;

use serde::Serialize;

use super::parser::{DialogueLine, ParsedScript};
use super::registry::canonical_key;

/// Per-character statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CharacterStats {
    pub name: String,
    pub key: String,
    pub line_count: usize,
    pub total_words: usize,
    /// First line of dialogue, empty when the character never speaks
    pub sample_line: String,
}

/// Overview of a parsed script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptSummary {
    pub character_count: usize,
    pub total_dialogue_lines: usize,
    pub characters: Vec<CharacterStats>,
}

impl ScriptSummary {
    pub fn from_parsed(parsed: &ParsedScript) -> Self {
        let characters = parsed
            .registry
            .characters()
            .map(|character| {
                let lines = parsed.dialogue.iter().filter(|line| line.character == character.key);
                let (total_words, sample_line) = lines.fold((0, None), |(words, sample), line| {
                    (words + line.text.split_whitespace().count(), sample.or_else(|| Some(line.text.clone())))
                });

                CharacterStats {
                    name: character.name.clone(),
                    key: character.key.clone(),
                    line_count: character.line_count,
                    total_words,
                    sample_line: sample_line.unwrap_or_default(),
                }
            })
            .collect::<Vec<_>>();

        Self {
            character_count: characters.len(),
            total_dialogue_lines: parsed.dialogue.len(),
            characters,
        }
    }
}

impl fmt::Display for ScriptSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Characters found: {}", self.character_count)?;
        writeln!(f, "Total dialogue lines: {}", self.total_dialogue_lines)?;
        for stats in &self.characters {
            writeln!(f, "- {}: {} lines, {} words", stats.name, stats.line_count, stats.total_words)?;
        }
        Ok(())
    }
}

/// First `max_lines` lines of a character, with a note about the rest
pub fn dialogue_preview(dialogue: &[DialogueLine], key: &str, max_lines: usize) -> String {
    let key = canonical_key(key);
    let lines: Vec<&str> = dialogue
        .iter()
        .filter(|line| line.character == key)
        .map(|line| line.text.as_str())
        .collect();

    let mut preview = lines.iter().take(max_lines).copied().collect::<Vec<_>>().join("\n");
    if lines.len() > max_lines {
        preview.push_str(&format!("\n... and {} more lines", lines.len() - max_lines));
    }
    preview
}
