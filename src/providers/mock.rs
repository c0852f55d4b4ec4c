/*!
 * Mock synthesis backend for testing.
 *
 * `MockBackend` answers every request with deterministic bytes
 * (`AUDIO:<text>`) unless a behaviour is scripted for that exact text:
 * - `fail_validation_for(text)` - always rejects the text
 * - `fail_transiently(text, n)` - transport error for the first `n` attempts
 * - `with_delay(text, ms)` - sleeps before answering
 *
 * `with_latency(ms)` delays every other request. The mock records the texts
 * it was asked for, in call order, and the peak number of calls in flight.
 */

use std::collections::HashMap;
use std::f32::consts::PI;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use crate::errors::SynthesisError;
use crate::providers::SynthesisBackend;
use crate::synthesis::VoiceReference;

/// Sample rate of generated reference clips
pub const REFERENCE_SAMPLE_RATE: u32 = 16_000;

/// Scripted behaviour for one text
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Rejected with a validation error on every attempt
    Invalid,
    /// Transport error for the first `failures` attempts, then success
    Transient { failures: u32 },
    /// Success after a delay
    Slow { delay_ms: u64 },
}

/// Mock backend for exercising batches without a server
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    behaviors: HashMap<String, MockBehavior>,
    /// Requests received so far, across clones
    request_count: Arc<AtomicUsize>,
    /// Attempts per text, across clones
    attempts: Arc<Mutex<HashMap<String, u32>>>,
    /// Voice ids seen, in request order
    voices_seen: Arc<Mutex<Vec<String>>>,
    /// Texts requested, in call order
    texts_seen: Arc<Mutex<Vec<String>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    /// Delay for texts without a scripted behaviour
    latency_ms: u64,
    offline: bool,
}

impl MockBackend {
    /// Create a mock that synthesizes every line
    pub fn working() -> Self {
        Self::default()
    }

    /// Create a mock whose connection test fails
    pub fn offline() -> Self {
        Self {
            offline: true,
            ..Self::default()
        }
    }

    pub fn fail_validation_for(mut self, text: impl Into<String>) -> Self {
        self.behaviors.insert(text.into(), MockBehavior::Invalid);
        self
    }

    pub fn fail_transiently(mut self, text: impl Into<String>, failures: u32) -> Self {
        self.behaviors.insert(text.into(), MockBehavior::Transient { failures });
        self
    }

    pub fn with_delay(mut self, text: impl Into<String>, delay_ms: u64) -> Self {
        self.behaviors.insert(text.into(), MockBehavior::Slow { delay_ms });
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Bytes returned for a successful request
    pub fn audio_for(text: &str) -> Bytes {
        Bytes::from(format!("AUDIO:{}", text))
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of attempts made for `text`
    pub fn attempts_for(&self, text: &str) -> u32 {
        self.attempts.lock().get(text).copied().unwrap_or(0)
    }

    pub fn voices_seen(&self) -> Vec<String> {
        self.voices_seen.lock().clone()
    }

    /// Requested texts in the order the calls started
    pub fn texts_seen(&self) -> Vec<String> {
        self.texts_seen.lock().clone()
    }

    /// Highest number of requests that were running at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn respond(&self, text: &str, attempt: u32) -> Result<Bytes, SynthesisError> {
        match self.behaviors.get(text) {
            Some(MockBehavior::Invalid) => Err(SynthesisError::Validation(format!("rejected text: {}", text))),
            Some(MockBehavior::Transient { failures }) if attempt <= *failures => Err(SynthesisError::Transport(
                format!("simulated outage (attempt {})", attempt),
            )),
            Some(MockBehavior::Slow { delay_ms }) => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(Self::audio_for(text))
            }
            _ => {
                if self.latency_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;
                }
                Ok(Self::audio_for(text))
            }
        }
    }
}

#[async_trait]
impl SynthesisBackend for MockBackend {
    async fn synthesize(&self, text: &str, voice: &VoiceReference) -> Result<Bytes, SynthesisError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.voices_seen.lock().push(voice.id().to_string());
        self.texts_seen.lock().push(text.to_string());
        let attempt = {
            let mut attempts = self.attempts.lock();
            let entry = attempts.entry(text.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);

        let result = self.respond(text, attempt).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn test_connection(&self) -> Result<(), SynthesisError> {
        if self.offline {
            Err(SynthesisError::Transport("mock backend is offline".to_string()))
        } else {
            Ok(())
        }
    }
}

fn encode_tone(duration_secs: f32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: REFERENCE_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let frames = (duration_secs * REFERENCE_SAMPLE_RATE as f32).round() as u32;
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for n in 0..frames {
            let t = n as f32 / REFERENCE_SAMPLE_RATE as f32;
            let sample = (t * 220.0 * 2.0 * PI).sin() * 0.3 * i16::MAX as f32;
            writer.write_sample(sample as i16)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// A 220 Hz mono 16-bit WAV clip usable as a voice reference.
///
/// Returns an empty buffer if encoding fails, which voice ingestion rejects.
pub fn reference_wav(duration_secs: f32) -> Vec<u8> {
    encode_tone(duration_secs).unwrap_or_default()
}
