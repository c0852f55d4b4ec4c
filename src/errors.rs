/*!
 * Error types for the scriptvox application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Errors that abort a whole script parse
#[derive(Error, Debug)]
pub enum ScriptError {
    /// The document produced no extractable text (e.g. a scanned PDF)
    #[error("Unreadable document: {0}")]
    UnreadableDocument(String),

    /// Parsing succeeded but no character cue was found anywhere
    #[error("No character cues found in script")]
    EmptyScript,
}

/// Errors raised by the character registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The key was never registered
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),
}

/// Errors raised while ingesting a reference voice sample
#[derive(Error, Debug)]
pub enum VoiceError {
    /// The sample is not usable as a voice reference
    #[error("Invalid voice sample: {0}")]
    InvalidVoiceSample(String),

    /// The sample could not be read from disk
    #[error("Failed to read voice sample: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors returned by a synthesis backend for a single line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SynthesisError {
    /// Network, timeout or server-side failure. Worth retrying.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The backend rejected the input (empty or too long text, bad voice)
    #[error("Validation error: {0}")]
    Validation(String),
}

impl SynthesisError {
    /// Whether the same request may succeed on another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The coarse error kind used in batch reports
    pub fn kind(&self) -> SynthesisErrorKind {
        match self {
            Self::Transport(_) => SynthesisErrorKind::Transport,
            Self::Validation(_) => SynthesisErrorKind::Validation,
        }
    }
}

/// Error classification carried by failed jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisErrorKind {
    Transport,
    Validation,
    /// The audio came back but could not be written to disk
    Output,
}

impl fmt::Display for SynthesisErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Validation => write!(f, "validation"),
            Self::Output => write!(f, "output"),
        }
    }
}

/// Errors that prevent a character batch from starting at all
#[derive(Error, Debug)]
pub enum BatchError {
    /// Batch requested before a voice was assigned to the character
    #[error("No voice reference assigned to character: {0}")]
    MissingVoiceReference(String),

    /// Error from the character registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// The staging directory could not be prepared
    #[error("Batch I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while writing a character archive
#[derive(Error, Debug)]
pub enum PackageError {
    /// The bundle holds no successfully synthesized files
    #[error("Nothing to package for character: {0}")]
    EmptyBundle(String),

    /// Error from a file operation
    #[error("Package I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the zip writer
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from script extraction or parsing
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Error from the character registry
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Error from voice ingestion
    #[error("Voice error: {0}")]
    Voice(#[from] VoiceError),

    /// Error from a synthesis batch
    #[error("Batch error: {0}")]
    Batch(#[from] BatchError),

    /// Error from packaging
    #[error("Package error: {0}")]
    Package(#[from] PackageError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
