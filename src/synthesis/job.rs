/*!
 * Synthesis job state and batch results.
 */

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::SynthesisErrorKind;
use crate::script::DialogueLine;

use super::voice::VoiceReference;

/// Lifecycle of a job. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Succeeded,
    Failed,
}

/// One line of dialogue to synthesize
#[derive(Debug, Clone)]
pub struct SynthesisJob {
    pub line: DialogueLine,
    /// Canonical key of the speaking character
    pub character: String,
    /// Voice captured when the job was created
    pub voice: VoiceReference,
    pub state: JobState,
    /// Attempts started so far
    pub attempt: u32,
    pub output_path: Option<PathBuf>,
    pub error: Option<SynthesisErrorKind>,
    pub message: Option<String>,
}

impl SynthesisJob {
    pub fn new(line: DialogueLine, voice: VoiceReference) -> Self {
        Self {
            character: line.character.clone(),
            line,
            voice,
            state: JobState::Pending,
            attempt: 0,
            output_path: None,
            error: None,
            message: None,
        }
    }

    pub fn sequence(&self) -> u64 {
        self.line.sequence
    }

    pub fn start(&mut self) {
        self.state = JobState::Running;
        self.attempt += 1;
    }

    /// Back to the queue after a retryable failure, remembering the error
    pub fn requeue(&mut self, kind: SynthesisErrorKind, message: impl Into<String>) {
        self.state = JobState::Pending;
        self.error = Some(kind);
        self.message = Some(message.into());
    }

    /// Give up on a queued retry, keeping the last error it saw
    pub fn abandon(&mut self, reason: &str) {
        let kind = self.error.unwrap_or(SynthesisErrorKind::Transport);
        let message = match self.message.take() {
            Some(message) => format!("{} ({})", message, reason),
            None => reason.to_string(),
        };
        self.fail(kind, message);
    }

    pub fn succeed(&mut self, path: PathBuf) {
        self.state = JobState::Succeeded;
        self.output_path = Some(path);
        self.error = None;
        self.message = None;
    }

    pub fn fail(&mut self, kind: SynthesisErrorKind, message: impl Into<String>) {
        self.state = JobState::Failed;
        self.error = Some(kind);
        self.message = Some(message.into());
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, JobState::Succeeded | JobState::Failed)
    }
}

/// A line that could not be synthesized
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLine {
    pub character: String,
    pub sequence: u64,
    pub kind: SynthesisErrorKind,
    pub message: String,
    pub attempts: u32,
}

/// Synthesized files of one character, always in ascending sequence order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AudioBundle {
    pub character: String,
    files: Vec<(u64, PathBuf)>,
}

impl AudioBundle {
    pub fn new(character: impl Into<String>) -> Self {
        Self {
            character: character.into(),
            files: Vec::new(),
        }
    }

    /// Add a file; the bundle stays sorted whatever the insertion order
    pub fn insert(&mut self, sequence: u64, path: PathBuf) {
        let position = self.files.partition_point(|(existing, _)| *existing < sequence);
        self.files.insert(position, (sequence, path));
    }

    pub fn files(&self) -> &[(u64, PathBuf)] {
        &self.files
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(_, path)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Outcome of one character batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Random id used to correlate log lines
    pub batch_id: String,
    pub character: String,
    pub bundle: AudioBundle,
    pub failures: Vec<FailedLine>,
    /// Lines never submitted because the batch was cancelled
    pub not_submitted: Vec<u64>,
    pub cancelled: bool,
}

impl BatchReport {
    pub fn total_lines(&self) -> usize {
        self.bundle.len() + self.failures.len() + self.not_submitted.len()
    }

    pub fn failed_sequences(&self) -> Vec<u64> {
        self.failures.iter().map(|f| f.sequence).collect()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.not_submitted.is_empty()
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} lines synthesized",
            self.character,
            self.bundle.len(),
            self.total_lines()
        )?;
        if !self.failures.is_empty() {
            write!(f, ", {} failed", self.failures.len())?;
        }
        if self.cancelled {
            write!(f, ", cancelled ({} not submitted)", self.not_submitted.len())?;
        }
        Ok(())
    }
}

/// Snapshot handed to progress callbacks after each finished job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    pub character: String,
    pub sequence: u64,
    pub state: JobState,
    pub completed: usize,
    pub total: usize,
}
