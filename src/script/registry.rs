/*!
 * Character registry.
 *
 * Maps canonical character keys to `Character` records. The parser is the
 * only writer while a script is parsed; afterwards the registry is shared
 * read-mostly with the synthesis orchestrator through `SharedRegistry`.
 */

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::errors::RegistryError;
use crate::synthesis::VoiceReference;

/// Registry shared between the parser's caller, voice assignment and batches
pub type SharedRegistry = Arc<RwLock<CharacterRegistry>>;

/// A speaking character discovered in a script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Character {
    /// Display form, as first seen in the script
    pub name: String,

    /// Canonical key used for identity
    pub key: String,

    /// Number of dialogue lines attached so far
    pub line_count: usize,

    /// Assigned reference voice
    #[serde(skip)]
    pub voice_reference: Option<VoiceReference>,
}

impl Character {
    fn new(name: String, key: String) -> Self {
        Self {
            name,
            key,
            line_count: 0,
            voice_reference: None,
        }
    }

    pub fn has_voice(&self) -> bool {
        self.voice_reference.is_some()
    }
}

/// Canonical form of a character name: upper-case, trimmed, internal
/// whitespace collapsed, trailing punctuation removed.
pub fn canonical_key(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c == '’' || c.is_whitespace())
        .to_uppercase()
}

/// Display form of a character name: trimmed with whitespace collapsed
fn display_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Character registry keyed by canonical key, iterated in discovery order
#[derive(Debug, Clone, Default)]
pub struct CharacterRegistry {
    characters: Vec<Character>,
    index: HashMap<String, usize>,
}

impl CharacterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the registry for sharing with synthesis batches
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register a character by display name.
    ///
    /// Idempotent: when the canonical key already exists the existing entry is
    /// returned unchanged, otherwise a new one is created with no lines.
    pub fn register(&mut self, display: &str) -> &Character {
        let key = canonical_key(display);
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.characters.push(Character::new(display_name(display), key.clone()));
                let position = self.characters.len() - 1;
                self.index.insert(key, position);
                position
            }
        };
        &self.characters[position]
    }

    /// Count one more dialogue line for `key`; returns the new count
    pub fn attach_line(&mut self, key: &str) -> Result<usize, RegistryError> {
        let character = self.get_mut(key)?;
        character.line_count += 1;
        Ok(character.line_count)
    }

    /// Assign or replace the reference voice of a character
    pub fn assign_voice(&mut self, key: &str, reference: VoiceReference) -> Result<(), RegistryError> {
        let character = self.get_mut(key)?;
        character.voice_reference = Some(reference);
        Ok(())
    }

    /// Look up a character by key or by any name that canonicalizes to it
    pub fn get(&self, key: &str) -> Result<&Character, RegistryError> {
        let canonical = canonical_key(key);
        self.index
            .get(&canonical)
            .map(|&position| &self.characters[position])
            .ok_or(RegistryError::UnknownCharacter(canonical))
    }

    fn get_mut(&mut self, key: &str) -> Result<&mut Character, RegistryError> {
        let canonical = canonical_key(key);
        match self.index.get(&canonical) {
            Some(&position) => Ok(&mut self.characters[position]),
            None => Err(RegistryError::UnknownCharacter(canonical)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(&canonical_key(key))
    }

    /// Characters in the order they were first cued
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter()
    }

    pub fn keys(&self) -> Vec<String> {
        self.characters.iter().map(|c| c.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}
