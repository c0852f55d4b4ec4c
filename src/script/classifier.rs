/*!
 * Line classification for screenplay text.
 *
 * Every physical line of a script is labelled with one `LineKind`. Rules are
 * evaluated in priority order and the first match wins:
 *
 * 1. Blank or whitespace-only lines
 * 2. Scene headings (sluglines, page and scene numbers)
 * 3. Character cues (short upper-case names, optional colon or modifier)
 * 4. Stage directions (parentheticals, bracketed text, transitions)
 * 5. Dialogue when the previous meaningful line was a cue or dialogue
 *
 * The classifier holds no parser state, so each rule can be exercised one
 * line at a time.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

// @const: Sluglines such as "INT. OFFICE - DAY" or "INT./EXT. CAR"
static SLUGLINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:INT\.?\s*/\s*EXT\.?|EXT\.?\s*/\s*INT\.?|I/E\.?|INT\.|EXT\.|EST\.)(?:\s|$)").unwrap()
});

// @const: Page numbers ("12.") and numbered sluglines ("12 INT. HOUSE")
static NUMBERED_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+[A-Z]?\.?(?:$|\s+(?:INT|EXT|I/E|EST)\b)").unwrap()
});

// @const: Cue shape: upper-case name, optional "(V.O.)" style modifier, optional colon
static CUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\p{Lu}[\p{Lu}\d\s.'’\-]*)(?:\(([^()]*)\))?\s*:?$").unwrap()
});

// @const: Transitions and continuation markers
static TRANSITION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:FADE\s+(?:IN|OUT|TO)|CUT\s+TO|SMASH\s+CUT|MATCH\s+CUT|DISSOLVE\s+TO|WIPE\s+TO|CONTINUED|CONT'D)\b|\((?:CONT'D|MORE)\))").unwrap()
});

/// Upper-case phrases that look like cues but never name a speaker
const NON_SPEAKER_PHRASES: &[&str] = &[
    "THE END",
    "TITLE CARD",
    "MONTAGE",
    "SERIES OF SHOTS",
    "LATER",
    "MEANWHILE",
    "SAME TIME",
    "MOMENTS LATER",
    "FLASHBACK",
    "DREAM SEQUENCE",
    "VOICE OVER",
    "V.O.",
    "O.S.",
    "OFF SCREEN",
    "NARRATION",
];

/// Kind of a single script line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum LineKind {
    /// A speaker name introducing dialogue
    CharacterCue,
    /// Spoken text attached to the current speaker
    Dialogue,
    /// Slugline, page number or other structural heading
    SceneHeading,
    /// Action, parenthetical or transition; never spoken
    StageDirection,
    /// Empty line
    Blank,
}

/// A line with its classification and position in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    pub text: String,
    pub kind: LineKind,
    pub page_index: usize,
    pub line_index: usize,
}

/// What the classifier knows about the next meaningful line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookahead<'a> {
    /// Caller did not look ahead; cue-shaped lines are taken as cues
    #[default]
    Unknown,
    /// The next non-blank, non-parenthetical line
    Line(&'a str),
    /// Nothing meaningful follows
    EndOfDocument,
}

/// Context a line is classified in
#[derive(Debug, Clone, Copy, Default)]
pub struct LineContext<'a> {
    /// Kind of the previous meaningful line
    pub previous: Option<LineKind>,
    /// The line that follows, for the heading/cue tie-break
    pub next: Lookahead<'a>,
}

impl<'a> LineContext<'a> {
    pub fn new(previous: Option<LineKind>, next: Lookahead<'a>) -> Self {
        Self { previous, next }
    }

    /// Context carrying only the previous kind
    pub fn after(previous: LineKind) -> Self {
        Self {
            previous: Some(previous),
            next: Lookahead::Unknown,
        }
    }
}

/// Stateless line classifier
#[derive(Debug, Clone)]
pub struct LineClassifier {
    max_cue_chars: usize,
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(30)
    }
}

impl LineClassifier {
    /// Create a classifier accepting cue names up to `max_cue_chars` characters
    pub fn new(max_cue_chars: usize) -> Self {
        Self { max_cue_chars }
    }

    /// Classify one line
    pub fn classify(&self, line: &str, context: &LineContext<'_>) -> LineKind {
        let line = line.trim();

        if line.is_empty() {
            return LineKind::Blank;
        }

        if is_scene_heading(line) {
            return LineKind::SceneHeading;
        }

        if let Some(name) = self.cue_name(line) {
            if is_transition(name) {
                return LineKind::StageDirection;
            }
            if is_non_speaker_phrase(name) {
                return LineKind::SceneHeading;
            }
            return match context.next {
                Lookahead::Unknown => LineKind::CharacterCue,
                Lookahead::Line(next) if is_dialogue_shaped(next) => LineKind::CharacterCue,
                _ => LineKind::SceneHeading,
            };
        }

        if is_parenthetical(line) || is_transition(line) {
            return LineKind::StageDirection;
        }

        match context.previous {
            Some(LineKind::CharacterCue) | Some(LineKind::Dialogue) => LineKind::Dialogue,
            _ => LineKind::StageDirection,
        }
    }

    /// Name part of a cue-shaped line, without modifier or colon.
    ///
    /// Returns `None` when the line does not have the shape of a cue. Shape
    /// alone is not enough for a cue: see `classify` for the tie-break.
    pub fn cue_name<'l>(&self, line: &'l str) -> Option<&'l str> {
        let line = line.trim();
        let captures = CUE_REGEX.captures(line)?;
        let name = captures.get(1)?.as_str().trim();

        let length = name.chars().count();
        if length < 2 || length > self.max_cue_chars {
            return None;
        }

        Some(name)
    }
}

/// Sluglines and numbered lines
pub fn is_scene_heading(line: &str) -> bool {
    let line = line.trim();
    SLUGLINE_REGEX.is_match(line) || NUMBERED_LINE_REGEX.is_match(line)
}

/// Text fully enclosed in parentheses or brackets, e.g. "(whispering)"
pub fn is_parenthetical(line: &str) -> bool {
    let line = line.trim();
    (line.starts_with('(') && line.ends_with(')')) || (line.starts_with('[') && line.ends_with(']'))
}

/// Transitions like "CUT TO:" and continuation markers
pub fn is_transition(line: &str) -> bool {
    TRANSITION_REGEX.is_match(line.trim())
}

fn is_non_speaker_phrase(name: &str) -> bool {
    let upper = name.trim().to_uppercase();
    NON_SPEAKER_PHRASES.contains(&upper.as_str())
}

/// A line that reads like speech: has lower-case letters and is not a heading
/// or a parenthetical
fn is_dialogue_shaped(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line.chars().any(char::is_lowercase)
        && !is_parenthetical(line)
        && !is_scene_heading(line)
}
