/*!
 * End-to-end tests for batch synthesis and packaging
 */

use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Semaphore;
use zip::ZipArchive;

use scriptvox::app_config::SynthesisConfig;
use scriptvox::providers::mock::MockBackend;
use scriptvox::script::SharedRegistry;
use scriptvox::synthesis::{BatchProgress, OrchestratorSettings, SynthesisOrchestrator};
use scriptvox::AudioPackager;

use crate::common;

fn fast_config(concurrent_jobs: usize) -> SynthesisConfig {
    SynthesisConfig {
        concurrent_jobs,
        max_attempts: 3,
        retry_backoff_ms: 1,
        audio_extension: "wav".to_string(),
    }
}

fn orchestrator(backend: MockBackend, registry: SharedRegistry, dir: &Path, pool: usize) -> SynthesisOrchestrator {
    SynthesisOrchestrator::new(Arc::new(backend), registry, &fast_config(pool), dir.join(".staging"))
}

fn archive_entries(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(|name| name.to_string()).collect::<Vec<_>>()
}

/// One rejected line yields a gap-free archive and a failure report
#[tokio::test]
async fn test_batch_withRejectedLine_shouldPackageRemainingLines() {
    let dir = common::create_temp_dir().unwrap();
    let lines = common::dialogue_lines("JOHN", &["One.", "Two.", "Three.", "Four.", "Five."]);
    let backend = MockBackend::working().fail_validation_for("Three.");
    let orchestrator = orchestrator(backend, common::voiced_registry(&["JOHN"]), dir.path(), 4);

    let report = orchestrator.synthesize_character("JOHN", &lines).await.unwrap();
    assert_eq!(report.bundle.len(), 4);
    assert_eq!(report.failed_sequences(), vec![3]);
    assert!(!report.cancelled);

    let packager = AudioPackager::new(dir.path(), "wav");
    let archive = packager.package(&report.bundle).unwrap();
    assert_eq!(archive, dir.path().join("JOHN_all_lines.zip"));

    let mut entries = archive_entries(&archive);
    entries.sort();
    assert_eq!(
        entries,
        vec!["JOHN_line_001.wav", "JOHN_line_002.wav", "JOHN_line_003.wav", "JOHN_line_004.wav"]
    );

    // Line 4 of the script is the third file once line 3 drops out
    let third = std::fs::read(dir.path().join("JOHN").join("JOHN_line_003.wav")).unwrap();
    assert_eq!(third, MockBackend::audio_for("Four.").to_vec());
}

/// Completion order does not leak into bundle order
#[tokio::test]
async fn test_batch_withReverseCompletion_shouldKeepSequenceOrder() {
    let dir = common::create_temp_dir().unwrap();
    let texts = ["A.", "B.", "C.", "D."];
    let lines = common::dialogue_lines("SARAH", &texts);
    let backend = MockBackend::working()
        .with_delay("A.", 150)
        .with_delay("B.", 100)
        .with_delay("C.", 50);
    let orchestrator = orchestrator(backend, common::voiced_registry(&["SARAH"]), dir.path(), 4);

    let completed = Mutex::new(Vec::new());
    let on_progress = |progress: &BatchProgress| completed.lock().push(progress.sequence);
    let report = orchestrator
        .synthesize_character_with_progress("SARAH", &lines, Some(&on_progress))
        .await
        .unwrap();

    assert_eq!(*completed.lock(), vec![4, 3, 2, 1]);
    let sequences: Vec<u64> = report.bundle.files().iter().map(|(sequence, _)| *sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    let packager = AudioPackager::new(dir.path(), "wav");
    packager.package(&report.bundle).unwrap();
    for (index, text) in texts.iter().enumerate() {
        let path = dir.path().join("SARAH").join(format!("SARAH_line_{:03}.wav", index + 1));
        assert_eq!(std::fs::read(path).unwrap(), MockBackend::audio_for(text).to_vec());
    }
}

#[tokio::test]
async fn test_repackaging_shouldProduceIdenticalArchive() {
    let dir = common::create_temp_dir().unwrap();
    let lines = common::dialogue_lines("JOHN", &["Hello.", "Goodbye."]);
    let orchestrator = orchestrator(MockBackend::working(), common::voiced_registry(&["JOHN"]), dir.path(), 2);
    let report = orchestrator.synthesize_character("JOHN", &lines).await.unwrap();

    let packager = AudioPackager::new(dir.path().join("out"), "wav");
    let archive = packager.package(&report.bundle).unwrap();
    let first = std::fs::read(&archive).unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;
    packager.package(&report.bundle).unwrap();
    assert_eq!(first, std::fs::read(&archive).unwrap());
}

/// Two characters drawing from one pool of a single permit both finish
#[tokio::test]
async fn test_batches_sharingOnePool_shouldBothComplete() {
    let dir = common::create_temp_dir().unwrap();
    let registry = common::voiced_registry(&["JOHN", "SARAH"]);
    let backend = Arc::new(MockBackend::working().fail_transiently("Again?", 1));
    let pool = Arc::new(Semaphore::new(1));

    let john = SynthesisOrchestrator::with_pool(
        backend.clone(),
        registry.clone(),
        pool.clone(),
        OrchestratorSettings::from_config(&fast_config(1), dir.path().join(".staging")),
    );
    let sarah = john.clone();

    let john_lines = common::dialogue_lines("JOHN", &["Hi.", "Again?"]);
    let sarah_lines = common::dialogue_lines("SARAH", &["Hello.", "Yes."]);
    let (john_report, sarah_report) = tokio::join!(
        john.synthesize_character("JOHN", &john_lines),
        sarah.synthesize_character("SARAH", &sarah_lines)
    );

    let john_report = john_report.unwrap();
    let sarah_report = sarah_report.unwrap();
    assert!(john_report.is_complete_success());
    assert!(sarah_report.is_complete_success());
    assert_ne!(john_report.batch_id, sarah_report.batch_id);
    assert_eq!(backend.attempts_for("Again?"), 2);
    assert_eq!(backend.request_count(), 5);
    assert_eq!(pool.available_permits(), 1);
}

/// Backend calls in flight stay within the pool even across batches
#[tokio::test]
async fn test_batches_sharingOnePool_shouldStayWithinPoolSize() {
    let dir = common::create_temp_dir().unwrap();
    let registry = common::voiced_registry(&["JOHN", "SARAH"]);
    let backend = MockBackend::working().with_latency(20);
    let pool = Arc::new(Semaphore::new(3));
    let settings = OrchestratorSettings::from_config(&fast_config(3), dir.path().join(".staging"));

    let john = SynthesisOrchestrator::with_pool(Arc::new(backend.clone()), registry.clone(), pool.clone(), settings.clone());
    let sarah = SynthesisOrchestrator::with_pool(Arc::new(backend.clone()), registry, pool, settings);

    let john_lines = common::dialogue_lines("JOHN", &["a", "b", "c", "d", "e"]);
    let sarah_lines = common::dialogue_lines("SARAH", &["f", "g", "h", "i", "j"]);
    let (john_report, sarah_report) = tokio::join!(
        john.synthesize_character("JOHN", &john_lines),
        sarah.synthesize_character("SARAH", &sarah_lines)
    );

    assert_eq!(john_report.unwrap().bundle.len(), 5);
    assert_eq!(sarah_report.unwrap().bundle.len(), 5);
    assert_eq!(backend.peak_in_flight(), 3);
}
