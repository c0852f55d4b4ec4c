/*!
 * Script parser.
 *
 * Turns ordered page text into dialogue lines grouped by character. The
 * parser walks every line once, classifies it, and threads a single
 * "current character" cursor through the loop: a cue moves the cursor,
 * dialogue attaches to it, everything else leaves it alone.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::app_config::ParserConfig;
use crate::errors::ScriptError;

use super::classifier::{is_parenthetical, ClassifiedLine, LineClassifier, LineContext, LineKind, Lookahead};
use super::registry::{canonical_key, CharacterRegistry};

// @const: Inline parentheticals inside dialogue, e.g. "Fine (beat) fine."
static INLINE_PARENTHETICAL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());

/// Raw text of one source page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Zero-based position in the document
    pub index: usize,
    pub text: String,
}

impl Page {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// One playback unit of dialogue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogueLine {
    /// Canonical key of the speaking character
    pub character: String,

    /// Cleaned dialogue text
    pub text: String,

    /// Global reading-order position, starting at 1, no gaps
    pub sequence: u64,

    /// Page the line came from
    pub source_page: usize,
}

/// Result of a successful parse
#[derive(Debug, Clone)]
pub struct ParsedScript {
    /// All dialogue lines in reading order
    pub dialogue: Vec<DialogueLine>,

    /// Every character that was cued
    pub registry: CharacterRegistry,
}

impl ParsedScript {
    /// Dialogue of one character in ascending sequence order
    pub fn lines_for(&self, key: &str) -> Vec<DialogueLine> {
        let key = canonical_key(key);
        self.dialogue
            .iter()
            .filter(|line| line.character == key)
            .cloned()
            .collect()
    }
}

/// Parser state carried from one line to the next
#[derive(Debug, Default)]
struct ParseCursor {
    /// Character the next dialogue line attaches to
    current_character: Option<String>,

    /// Sequence number of the next dialogue line
    next_sequence: u64,

    /// Number of cues seen so far
    cues_seen: usize,
}

/// Screenplay parser
#[derive(Debug, Clone)]
pub struct ScriptParser {
    config: ParserConfig,
    classifier: LineClassifier,
}

impl Default for ScriptParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl ScriptParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            classifier: LineClassifier::new(config.max_cue_chars),
            config,
        }
    }

    /// Classify every line of every page.
    ///
    /// Lookahead for the heading/cue tie-break spans page boundaries since
    /// a cue at the bottom of a page is often followed by its dialogue on the
    /// next one.
    pub fn classify_pages(&self, pages: &[Page]) -> Vec<ClassifiedLine> {
        let raw_lines: Vec<(usize, usize, &str)> = pages
            .iter()
            .flat_map(|page| {
                page.text
                    .lines()
                    .enumerate()
                    .map(move |(line_index, text)| (page.index, line_index, text.trim()))
            })
            .collect();

        // Next line with speakable content after each position
        let mut next_meaningful: Vec<Option<usize>> = vec![None; raw_lines.len()];
        let mut upcoming = None;
        for i in (0..raw_lines.len()).rev() {
            next_meaningful[i] = upcoming;
            let text = raw_lines[i].2;
            if !is_parenthetical(text) && text.chars().any(char::is_alphanumeric) {
                upcoming = Some(i);
            }
        }

        let mut previous_kind = None;
        let mut classified = Vec::with_capacity(raw_lines.len());

        for (i, &(page_index, line_index, text)) in raw_lines.iter().enumerate() {
            let next = match next_meaningful[i] {
                Some(j) => Lookahead::Line(raw_lines[j].2),
                None => Lookahead::EndOfDocument,
            };
            let kind = self.classifier.classify(text, &LineContext::new(previous_kind, next));
            previous_kind = self.next_previous_kind(previous_kind, kind, text);

            classified.push(ClassifiedLine {
                text: text.to_string(),
                kind,
                page_index,
                line_index,
            });
        }

        classified
    }

    /// Parse pages into dialogue lines and a populated registry
    pub fn parse(&self, pages: &[Page]) -> Result<ParsedScript, ScriptError> {
        let mut cursor = ParseCursor {
            next_sequence: 1,
            ..Default::default()
        };
        let mut registry = CharacterRegistry::new();
        let mut dialogue = Vec::new();

        for line in self.classify_pages(pages) {
            if let Some(entry) = self.apply_line(&mut cursor, &mut registry, &line) {
                dialogue.push(entry);
            }
        }

        if cursor.cues_seen == 0 {
            return Err(ScriptError::EmptyScript);
        }

        debug!(
            "Parsed {} dialogue lines for {} characters",
            dialogue.len(),
            registry.len()
        );

        Ok(ParsedScript { dialogue, registry })
    }

    /// Apply one classified line to the cursor, returning the dialogue it produced
    fn apply_line(
        &self,
        cursor: &mut ParseCursor,
        registry: &mut CharacterRegistry,
        line: &ClassifiedLine,
    ) -> Option<DialogueLine> {
        match line.kind {
            LineKind::CharacterCue => {
                let name = self.classifier.cue_name(&line.text)?;
                let key = registry.register(name).key.clone();
                cursor.current_character = Some(key);
                cursor.cues_seen += 1;
                None
            }
            LineKind::Dialogue => {
                let key = cursor.current_character.clone()?;
                let text = self.clean_dialogue(&line.text)?;
                // The cursor key always comes from `register`
                registry.attach_line(&key).ok()?;

                let entry = DialogueLine {
                    character: key,
                    text,
                    sequence: cursor.next_sequence,
                    source_page: line.page_index,
                };
                cursor.next_sequence += 1;
                Some(entry)
            }
            LineKind::SceneHeading | LineKind::StageDirection | LineKind::Blank => None,
        }
    }

    /// Track the previous meaningful kind.
    ///
    /// Parentheticals are transparent so "JOHN / (beat) / Hello." keeps
    /// the dialogue context. Blank lines only count when configured to end
    /// dialogue blocks.
    fn next_previous_kind(&self, previous: Option<LineKind>, kind: LineKind, text: &str) -> Option<LineKind> {
        match kind {
            LineKind::Blank if self.config.blank_line_ends_dialogue => Some(LineKind::Blank),
            LineKind::Blank => previous,
            LineKind::StageDirection if is_parenthetical(text) => previous,
            other => Some(other),
        }
    }

    /// Strip inline parentheticals and collapse whitespace.
    /// Returns `None` for fragments with nothing speakable left.
    fn clean_dialogue(&self, text: &str) -> Option<String> {
        let without_directions = INLINE_PARENTHETICAL_REGEX.replace_all(text, " ");
        let cleaned = without_directions.split_whitespace().collect::<Vec<_>>().join(" ");

        if cleaned.chars().count() < self.config.min_dialogue_chars.max(1) {
            return None;
        }
        if !cleaned.chars().any(char::is_alphanumeric) {
            return None;
        }
        Some(cleaned)
    }
}

/// Parse pages with the default parser configuration
pub fn parse(pages: &[Page]) -> Result<ParsedScript, ScriptError> {
    ScriptParser::default().parse(pages)
}
