/*!
 * Per-character batch synthesis.
 *
 * Every batch puts one job per dialogue line, in ascending sequence order,
 * into its own FIFO queue. The dispatcher takes jobs off the front of that
 * queue and runs each one under a permit from a fair semaphore shared by all
 * batches of the orchestrator, so the number of backend calls in flight never
 * exceeds the pool size. A job that hits a retryable error gives its permit
 * back, waits out its backoff and joins the back of the queue, behind every
 * line still waiting.
 *
 * Jobs report through a channel to a single collector per batch, which
 * builds the bundle and the failure list once every submitted job is
 * terminal. Completion order is irrelevant: the bundle sorts by sequence.
 */

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::app_config::SynthesisConfig;
use crate::errors::{BatchError, SynthesisErrorKind};
use crate::file_utils::FileManager;
use crate::providers::SynthesisBackend;
use crate::script::{canonical_key, DialogueLine, SharedRegistry};

use super::job::{AudioBundle, BatchProgress, BatchReport, FailedLine, JobState, SynthesisJob};
use super::voice::VoiceReference;

/// Callback invoked by the collector after each job reaches a terminal state
pub type ProgressFn<'a> = &'a (dyn Fn(&BatchProgress) + Send + Sync);

/// Cooperative cancellation for the batches of an orchestrator.
///
/// Once cancelled no further job is submitted; jobs already holding a permit
/// run to completion and their output is kept. The flag stays set: batches
/// started afterwards on the same orchestrator submit nothing. Use
/// [`SynthesisOrchestrator::with_cancellation`] to cancel batches separately.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    flag: Arc<AtomicBool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Tunables for job execution
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Attempts per line, the first one included
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled for each further retry
    pub retry_backoff: Duration,
    pub audio_extension: String,
    /// Where synthesized audio is written before packaging
    pub staging_dir: PathBuf,
}

impl OrchestratorSettings {
    pub fn from_config(config: &SynthesisConfig, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            audio_extension: config.audio_extension.clone(),
            staging_dir: staging_dir.into(),
        }
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(10);
        self.retry_backoff * 2u32.pow(exponent)
    }

    fn staging_path(&self, job: &SynthesisJob) -> PathBuf {
        self.staging_dir
            .join(FileManager::sanitize_file_component(&job.character))
            .join(FileManager::staging_file_name(&job.character, job.sequence(), &self.audio_extension))
    }
}

/// Everything a spawned job needs, cheap to clone
#[derive(Clone)]
struct JobContext {
    backend: Arc<dyn SynthesisBackend>,
    settings: Arc<OrchestratorSettings>,
    results: mpsc::UnboundedSender<SynthesisJob>,
}

/// A job waiting in the batch queue.
///
/// Each entry carries a sender for the queue it sits in, so the queue closes
/// once no job is waiting, backing off or running.
struct QueuedJob {
    job: SynthesisJob,
    requeue: mpsc::UnboundedSender<QueuedJob>,
}

/// Hands its job to the collector when dropped.
///
/// A job whose task unwinds before reaching a terminal state is reported as
/// failed instead of vanishing from the batch.
struct ReportOnDrop {
    job: Option<SynthesisJob>,
    results: mpsc::UnboundedSender<SynthesisJob>,
}

impl Drop for ReportOnDrop {
    fn drop(&mut self) {
        if let Some(mut job) = self.job.take() {
            if !job.is_terminal() {
                job.fail(SynthesisErrorKind::Transport, "synthesis task stopped before finishing");
            }
            // The receiver only goes away if the batch future was dropped
            let _ = self.results.send(job);
        }
    }
}

/// Batch synthesis orchestrator
#[derive(Clone)]
pub struct SynthesisOrchestrator {
    backend: Arc<dyn SynthesisBackend>,
    registry: SharedRegistry,
    pool: Arc<Semaphore>,
    settings: Arc<OrchestratorSettings>,
    cancel: CancellationHandle,
}

impl SynthesisOrchestrator {
    /// Create an orchestrator with its own pool of `concurrent_jobs` permits
    pub fn new(
        backend: Arc<dyn SynthesisBackend>,
        registry: SharedRegistry,
        config: &SynthesisConfig,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        let pool = Arc::new(Semaphore::new(config.concurrent_jobs.max(1)));
        Self::with_pool(
            backend,
            registry,
            pool,
            OrchestratorSettings::from_config(config, staging_dir),
        )
    }

    /// Create an orchestrator that draws permits from an existing pool
    pub fn with_pool(
        backend: Arc<dyn SynthesisBackend>,
        registry: SharedRegistry,
        pool: Arc<Semaphore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            backend,
            registry,
            pool,
            settings: Arc::new(settings),
            cancel: CancellationHandle::default(),
        }
    }

    /// A copy sharing backend, registry and pool, cancelled through `cancel`
    pub fn with_cancellation(&self, cancel: CancellationHandle) -> Self {
        Self {
            cancel,
            ..self.clone()
        }
    }

    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancel.clone()
    }

    pub fn staging_dir(&self) -> &Path {
        &self.settings.staging_dir
    }

    /// Synthesize every line of one character
    pub async fn synthesize_character(&self, key: &str, lines: &[DialogueLine]) -> Result<BatchReport, BatchError> {
        self.synthesize_character_with_progress(key, lines, None).await
    }

    /// Synthesize every line of one character, reporting each finished job.
    ///
    /// Lines of other characters in `lines` are ignored. Fails before any job
    /// is submitted when the character is unknown or has no voice.
    pub async fn synthesize_character_with_progress(
        &self,
        key: &str,
        lines: &[DialogueLine],
        progress: Option<ProgressFn<'_>>,
    ) -> Result<BatchReport, BatchError> {
        let key = canonical_key(key);
        let voice = self.voice_snapshot(&key)?;
        let batch_id = Uuid::new_v4().to_string();

        let mut jobs: Vec<SynthesisJob> = lines
            .iter()
            .filter(|line| line.character == key)
            .map(|line| SynthesisJob::new(line.clone(), voice.clone()))
            .collect();
        jobs.sort_by_key(|job| job.sequence());

        let total = jobs.len();
        info!("[{}] Synthesizing {} lines for {} (voice {})", batch_id, total, key, voice.id());

        let staging = self.settings.staging_dir.join(FileManager::sanitize_file_component(&key));
        tokio::fs::create_dir_all(&staging).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let context = JobContext {
            backend: Arc::clone(&self.backend),
            settings: Arc::clone(&self.settings),
            results: tx,
        };

        let (not_submitted, (bundle, failures)) = tokio::join!(
            self.dispatch(jobs, context),
            Self::collect(&key, total, rx, progress)
        );

        let report = BatchReport {
            batch_id,
            character: key,
            bundle,
            failures,
            cancelled: !not_submitted.is_empty(),
            not_submitted,
        };
        info!("[{}] {}", report.batch_id, report);
        Ok(report)
    }

    /// Run independent batches for several characters on the shared pool
    pub async fn synthesize_characters(
        &self,
        keys: &[String],
        dialogue: &[DialogueLine],
    ) -> Vec<(String, Result<BatchReport, BatchError>)> {
        let batches = keys.iter().map(|key| async move {
            let result = self.synthesize_character(key, dialogue).await;
            (canonical_key(key), result)
        });
        join_all(batches).await
    }

    fn voice_snapshot(&self, key: &str) -> Result<VoiceReference, BatchError> {
        let registry = self.registry.read();
        let character = registry.get(key)?;
        character
            .voice_reference
            .clone()
            .ok_or_else(|| BatchError::MissingVoiceReference(key.to_string()))
    }

    /// Feed queued jobs to the pool in FIFO order; returns the sequences left unsubmitted
    async fn dispatch(&self, jobs: Vec<SynthesisJob>, context: JobContext) -> Vec<u64> {
        let (queue_tx, mut queue) = mpsc::unbounded_channel();
        for job in jobs {
            let _ = queue_tx.send(QueuedJob {
                job,
                requeue: queue_tx.clone(),
            });
        }
        drop(queue_tx);

        let mut not_submitted = Vec::new();
        while let Some(QueuedJob { mut job, requeue }) = queue.recv().await {
            if !self.cancel.is_cancelled() {
                if let Ok(permit) = Arc::clone(&self.pool).acquire_owned().await {
                    // Cancellation may have arrived while waiting for the permit
                    if !self.cancel.is_cancelled() {
                        tokio::spawn(run_job(job, permit, requeue, context.clone()));
                        continue;
                    }
                }
            }

            if job.attempt == 0 {
                not_submitted.push(job.sequence());
            } else {
                job.abandon("retry abandoned after cancellation");
                let _ = context.results.send(job);
            }
        }

        if !not_submitted.is_empty() {
            warn!("Batch cancelled, {} lines not submitted", not_submitted.len());
        }
        not_submitted
    }

    /// Drain job results until every submitted job has reported
    async fn collect(
        key: &str,
        total: usize,
        mut results: mpsc::UnboundedReceiver<SynthesisJob>,
        progress: Option<ProgressFn<'_>>,
    ) -> (AudioBundle, Vec<FailedLine>) {
        let mut bundle = AudioBundle::new(key);
        let mut failures = Vec::new();
        let mut completed = 0;

        // The channel closes once the dispatcher and every job dropped their sender
        while let Some(job) = results.recv().await {
            completed += 1;
            if let Some(callback) = progress {
                callback(&BatchProgress {
                    character: key.to_string(),
                    sequence: job.sequence(),
                    state: job.state,
                    completed,
                    total,
                });
            }

            match (job.state, job.output_path) {
                (JobState::Succeeded, Some(path)) => bundle.insert(job.line.sequence, path),
                _ => failures.push(FailedLine {
                    character: job.character,
                    sequence: job.line.sequence,
                    kind: job.error.unwrap_or(SynthesisErrorKind::Transport),
                    message: job.message.unwrap_or_default(),
                    attempts: job.attempt,
                }),
            }
        }

        failures.sort_by_key(|failure| failure.sequence);
        (bundle, failures)
    }
}

/// Run one attempt of a job, then report it or put it back in the queue
async fn run_job(
    job: SynthesisJob,
    permit: OwnedSemaphorePermit,
    requeue: mpsc::UnboundedSender<QueuedJob>,
    context: JobContext,
) {
    let mut guard = ReportOnDrop {
        job: Some(job),
        results: context.results.clone(),
    };
    let Some(job) = guard.job.as_mut() else {
        return;
    };

    job.start();
    debug!("Line {} of {}: attempt {}", job.sequence(), job.character, job.attempt);
    let outcome = context.backend.synthesize(&job.line.text, &job.voice).await;
    // Release the slot before writing or backing off so other work can run
    drop(permit);

    match outcome {
        Ok(audio) => {
            let path = context.settings.staging_path(job);
            match tokio::fs::write(&path, &audio).await {
                Ok(()) => job.succeed(path),
                Err(e) => job.fail(SynthesisErrorKind::Output, format!("failed to write {:?}: {}", path, e)),
            }
        }
        Err(error) if error.is_retryable() && job.attempt < context.settings.max_attempts => {
            let backoff = context.settings.backoff_for(job.attempt);
            warn!(
                "Line {} of {} failed ({}), retrying in {:?}",
                job.sequence(),
                job.character,
                error,
                backoff
            );
            job.requeue(error.kind(), error.to_string());
            tokio::time::sleep(backoff).await;

            if let Some(job) = guard.job.take() {
                let _ = requeue.send(QueuedJob {
                    job,
                    requeue: requeue.clone(),
                });
            }
        }
        Err(error) => {
            warn!("Line {} of {} failed: {}", job.sequence(), job.character, error);
            job.fail(error.kind(), error.to_string());
        }
    }
}
