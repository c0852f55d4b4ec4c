/*!
 * Speech synthesis: voice references, jobs and the batch orchestrator.
 */

pub mod job;
pub mod orchestrator;
pub mod voice;

pub use self::job::{AudioBundle, BatchProgress, BatchReport, FailedLine, JobState, SynthesisJob};
pub use self::orchestrator::{CancellationHandle, OrchestratorSettings, ProgressFn, SynthesisOrchestrator};
pub use self::voice::{VoiceReference, MIN_REFERENCE_SECS};
