use anyhow::{anyhow, Context, Result};
use futures::future::join_all;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::{BatchError, RegistryError};
use crate::file_utils::FileManager;
use crate::packaging::AudioPackager;
use crate::providers::http::HttpSynthesisBackend;
use crate::providers::SynthesisBackend;
use crate::script::{
    canonical_key, extractor_for, DialogueLine, ParsedScript, ScriptParser, ScriptSummary, SharedRegistry,
};
use crate::synthesis::{BatchProgress, BatchReport, SynthesisOrchestrator, VoiceReference};

// @module: Application controller for script voicing

/// What to synthesize in one run
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    pub script: PathBuf,
    /// Character name and reference sample path
    pub voices: Vec<(String, PathBuf)>,
    /// Characters to synthesize; empty means every character with a voice
    pub characters: Vec<String>,
    pub output_dir: PathBuf,
}

/// A character that was not synthesized, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedCharacter {
    pub character: String,
    pub reason: String,
}

/// Outcome of a full run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<BatchReport>,
    pub archives: Vec<PathBuf>,
    pub skipped: Vec<SkippedCharacter>,
    /// Characters whose batch or packaging failed as a whole
    pub failed: Vec<SkippedCharacter>,
    pub report_path: Option<PathBuf>,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.reports {
            writeln!(f, "{}", report)?;
            for failure in &report.failures {
                writeln!(f, "  line {} failed ({}): {}", failure.sequence, failure.kind, failure.message)?;
            }
        }
        for skipped in &self.skipped {
            writeln!(f, "{}: skipped, {}", skipped.character, skipped.reason)?;
        }
        for failed in &self.failed {
            writeln!(f, "{}: {}", failed.character, failed.reason)?;
        }
        for archive in &self.archives {
            writeln!(f, "Archive: {}", archive.display())?;
        }
        Ok(())
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Backend shared by every batch
    backend: Arc<dyn SynthesisBackend>,
}

impl Controller {
    // @method: Create a controller talking to the configured HTTP backend
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let backend = HttpSynthesisBackend::from_config(&config.backend)
            .with_context(|| format!("Failed to create synthesis client for {}", config.backend.endpoint))?;
        let backend = Arc::new(backend);
        Ok(Self::with_backend(config, backend))
    }

    /// Create a controller with an explicit backend
    pub fn with_backend(config: Config, backend: Arc<dyn SynthesisBackend>) -> Self {
        Self { config, backend }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract and parse a script document
    pub async fn load_script(&self, script: &Path) -> Result<ParsedScript> {
        if !script.exists() {
            return Err(anyhow!("Script file does not exist: {:?}", script));
        }

        let pages = extractor_for(script)
            .extract_pages(script)
            .await
            .with_context(|| format!("Failed to extract text from {:?}", script))?;
        debug!("Extracted {} pages from {:?}", pages.len(), script);

        let parsed = ScriptParser::new(self.config.parser.clone())
            .parse(&pages)
            .with_context(|| format!("Failed to parse {:?}", script))?;
        info!(
            "Parsed {} dialogue lines for {} characters",
            parsed.dialogue.len(),
            parsed.registry.len()
        );
        Ok(parsed)
    }

    /// Parse a script and summarize its characters
    pub async fn summarize(&self, script: &Path) -> Result<ScriptSummary> {
        let parsed = self.load_script(script).await?;
        Ok(ScriptSummary::from_parsed(&parsed))
    }

    /// Ingest reference samples and attach them to characters
    pub async fn assign_voices(&self, registry: &SharedRegistry, voices: &[(String, PathBuf)]) -> Result<()> {
        for (name, path) in voices {
            let voice = VoiceReference::from_file(path)
                .await
                .with_context(|| format!("Failed to load voice sample {:?} for {}", path, name))?;
            info!("Voice {} ({:.1}s) assigned to {}", voice.id(), voice.duration_secs(), name);
            registry.write().assign_voice(name, voice)?;
        }
        Ok(())
    }

    /// Run the whole workflow: parse, assign voices, synthesize, package
    pub async fn run(&self, request: SynthesisRequest) -> Result<RunSummary> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(request, &multi_progress).await
    }

    async fn run_with_progress(&self, request: SynthesisRequest, multi_progress: &MultiProgress) -> Result<RunSummary> {
        let start_time = std::time::Instant::now();
        let parsed = self.load_script(&request.script).await?;
        let dialogue = parsed.dialogue;
        let registry = parsed.registry.into_shared();

        self.assign_voices(&registry, &request.voices).await?;
        let (targets, mut skipped) = select_characters(&registry, &request.characters)?;

        if let Err(e) = self.backend.test_connection().await {
            warn!("Synthesis backend did not answer the connection test: {}", e);
        }

        FileManager::ensure_dir(&request.output_dir)?;
        let staging_dir = request.output_dir.join(".staging");
        let orchestrator = SynthesisOrchestrator::new(
            Arc::clone(&self.backend),
            Arc::clone(&registry),
            &self.config.synthesis,
            &staging_dir,
        );

        // First Ctrl-C stops submitting new lines, in-flight lines still finish
        let cancel = orchestrator.cancellation_handle();
        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Cancellation requested, finishing in-flight lines");
                cancel.cancel();
            }
        });

        let results = self
            .run_batches(&orchestrator, &targets, &dialogue, &registry, multi_progress)
            .await;
        ctrl_c.abort();

        let packager = AudioPackager::new(&request.output_dir, self.config.synthesis.audio_extension.clone());
        let mut summary = RunSummary::default();
        let mut failed = Vec::new();
        for (key, result) in results {
            match result {
                Ok(report) => {
                    if !report.bundle.is_empty() {
                        match packager.package(&report.bundle) {
                            Ok(archive) => summary.archives.push(archive),
                            Err(e) => {
                                error!("Failed to package audio for {}: {}", key, e);
                                failed.push(SkippedCharacter {
                                    character: key.clone(),
                                    reason: format!("packaging failed: {}", e),
                                });
                            }
                        }
                    }
                    summary.reports.push(report);
                }
                Err(BatchError::MissingVoiceReference(character)) => {
                    skipped.push(SkippedCharacter {
                        character,
                        reason: "no voice reference assigned".to_string(),
                    });
                }
                Err(e) => {
                    error!("Batch for {} failed: {}", key, e);
                    failed.push(SkippedCharacter {
                        character: key,
                        reason: format!("batch failed: {}", e),
                    });
                }
            }
        }
        summary.skipped = skipped;
        summary.failed = failed;

        let report_path = FileManager::report_path(&request.output_dir, &request.script);
        let report_json = serde_json::to_string_pretty(&summary).context("Failed to serialize synthesis report")?;
        FileManager::write_to_file(&report_path, &report_json)?;
        summary.report_path = Some(report_path);

        self.clean_staging(&staging_dir, &summary);

        info!("Finished in {:.1}s", start_time.elapsed().as_secs_f32());
        Ok(summary)
    }

    /// Remove staged audio, except for characters whose audio never reached an archive
    fn clean_staging(&self, staging_dir: &Path, summary: &RunSummary) {
        if summary.failed.is_empty() {
            if let Err(e) = std::fs::remove_dir_all(staging_dir) {
                debug!("Could not remove staging directory {:?}: {}", staging_dir, e);
            }
            return;
        }

        for report in &summary.reports {
            if summary.failed.iter().any(|failed| failed.character == report.character) {
                continue;
            }
            let dir = staging_dir.join(FileManager::sanitize_file_component(&report.character));
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                debug!("Could not remove staging directory {:?}: {}", dir, e);
            }
        }
        warn!("Audio that could not be packaged is kept in {:?}", staging_dir);
    }

    /// Run one batch per character on the shared pool, one progress bar each
    async fn run_batches(
        &self,
        orchestrator: &SynthesisOrchestrator,
        targets: &[String],
        dialogue: &[DialogueLine],
        registry: &SharedRegistry,
        multi_progress: &MultiProgress,
    ) -> Vec<(String, Result<BatchReport, BatchError>)> {
        let batches = targets.iter().map(|key| {
            let line_count = registry.read().get(key).map(|c| c.line_count).unwrap_or(0);
            let progress_bar = multi_progress.add(ProgressBar::new(line_count as u64));
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} lines {msg}")
                .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} {msg}"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            progress_bar.set_style(style.progress_chars("█▓▒░"));
            progress_bar.set_message(key.clone());

            async move {
                let bar = progress_bar.clone();
                let on_progress = move |progress: &BatchProgress| bar.set_position(progress.completed as u64);
                let result = orchestrator
                    .synthesize_character_with_progress(key, dialogue, Some(&on_progress))
                    .await;
                progress_bar.finish_and_clear();
                (key.clone(), result)
            }
        });
        join_all(batches).await
    }
}

/// Split the requested characters into batch targets and skipped ones.
///
/// With an explicit selection every name must exist in the script; without
/// one every character with a voice is a target and the rest are skipped.
pub fn select_characters(
    registry: &SharedRegistry,
    requested: &[String],
) -> Result<(Vec<String>, Vec<SkippedCharacter>), RegistryError> {
    let registry = registry.read();

    if !requested.is_empty() {
        let mut targets: Vec<String> = Vec::with_capacity(requested.len());
        for name in requested {
            let key = registry.get(name)?.key.clone();
            if !targets.contains(&key) {
                targets.push(key);
            }
        }
        return Ok((targets, Vec::new()));
    }

    let (voiced, silent): (Vec<_>, Vec<_>) = registry.characters().partition(|c| c.has_voice());
    let skipped = silent
        .into_iter()
        .map(|c| SkippedCharacter {
            character: c.key.clone(),
            reason: "no voice reference assigned".to_string(),
        })
        .collect();
    Ok((voiced.into_iter().map(|c| c.key.clone()).collect(), skipped))
}

/// Parse `NAME=path` voice arguments
pub fn parse_voice_arg(arg: &str) -> Result<(String, PathBuf)> {
    let (name, path) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected NAME=sample.wav, got '{}'", arg))?;
    let name = name.trim();
    if canonical_key(name).is_empty() || path.trim().is_empty() {
        return Err(anyhow!("Expected NAME=sample.wav, got '{}'", arg));
    }
    Ok((name.to_string(), PathBuf::from(path.trim())))
}
