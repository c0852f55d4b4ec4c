/*!
 * Script ingestion: from document text to dialogue grouped by character.
 *
 * - `extractor`: document to ordered page text
 * - `classifier`: per-line classification
 * - `parser`: page text to dialogue lines with a character cursor
 * - `registry`: discovered characters and their voices
 * - `summary`: statistics and previews for display
 */

pub mod classifier;
pub mod extractor;
pub mod parser;
pub mod registry;
pub mod summary;

pub use self::classifier::{ClassifiedLine, LineClassifier, LineContext, LineKind, Lookahead};
pub use self::extractor::{extractor_for, pages_from_text, PageExtractor, PdfTextExtractor, PlainTextExtractor};
pub use self::parser::{parse, DialogueLine, Page, ParsedScript, ScriptParser};
pub use self::registry::{canonical_key, Character, CharacterRegistry, SharedRegistry};
pub use self::summary::{dialogue_preview, CharacterStats, ScriptSummary};
