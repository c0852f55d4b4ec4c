/*!
 * Common test utilities for the scriptvox test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use scriptvox::providers::mock::reference_wav;
use scriptvox::script::{Page, CharacterRegistry, SharedRegistry};
use scriptvox::synthesis::VoiceReference;
use scriptvox::DialogueLine;

/// A short scene exercising headings, wrylies, transitions and modifiers.
///
/// Expected dialogue: JOHN 1, SARAH 2, JOHN 3, BARISTA 4, JOHN 5, SARAH 6.
pub const COFFEE_SHOP_SCRIPT: &str = "\
FADE IN:

INT. COFFEE SHOP - DAY

A small, busy coffee shop. JOHN sits alone, checking his watch.

                    JOHN
          I hope she shows up.

                    SARAH
          (breathless)
          John! Sorry I'm late.

                    JOHN
          No worries at all.

                    BARISTA (O.S.)
          Two lattes?

                    JOHN
          Make that two.

CUT TO:

EXT. STREET - LATER

                    SARAH (V.O.)
          That was the day everything changed.

FADE OUT.
";

/// Route library logs through the test harness, set RUST_LOG to see them
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Writes a reference voice clip of the given length
pub fn create_voice_file(dir: &Path, filename: &str, duration_secs: f32) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, reference_wav(duration_secs))?;
    Ok(file_path)
}

/// A single page holding the given lines
pub fn single_page(lines: &[&str]) -> Vec<Page> {
    vec![Page::new(0, lines.join("\n"))]
}

/// Dialogue lines of one character numbered 1..n
pub fn dialogue_lines(character: &str, texts: &[&str]) -> Vec<DialogueLine> {
    texts
        .iter()
        .enumerate()
        .map(|(i, text)| DialogueLine {
            character: character.to_string(),
            text: text.to_string(),
            sequence: i as u64 + 1,
            source_page: 0,
        })
        .collect()
}

/// Registry with the given characters, each with a one-second voice
pub fn voiced_registry(characters: &[&str]) -> SharedRegistry {
    let mut registry = CharacterRegistry::new();
    for character in characters {
        registry.register(character);
        let voice = VoiceReference::from_wav_bytes(reference_wav(1.0), None).expect("reference clip is valid");
        registry
            .assign_voice(character, voice)
            .expect("character was just registered");
    }
    registry.into_shared()
}
