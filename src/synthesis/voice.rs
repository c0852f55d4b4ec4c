/*!
 * Reference voice ingestion.
 *
 * A `VoiceReference` is the opaque handle a synthesis backend clones a voice
 * from. It is built from a raw WAV sample which is validated up front so that a
 * broken upload fails the assignment instead of every line of a batch.
 */

use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::errors::VoiceError;

/// Shortest usable reference sample
pub const MIN_REFERENCE_SECS: f32 = 1.0;

/// Validated reference voice sample
#[derive(Clone, PartialEq)]
pub struct VoiceReference {
    id: String,
    source: Option<PathBuf>,
    audio: Bytes,
    sample_rate: u32,
    channels: u16,
    duration_secs: f32,
}

impl VoiceReference {
    /// Ingest a WAV sample held in memory
    pub fn from_wav_bytes(audio: impl Into<Bytes>, source: Option<PathBuf>) -> Result<Self, VoiceError> {
        let audio: Bytes = audio.into();
        if audio.is_empty() {
            return Err(VoiceError::InvalidVoiceSample("sample is empty".to_string()));
        }

        let reader = hound::WavReader::new(Cursor::new(audio.as_ref()))
            .map_err(|e| VoiceError::InvalidVoiceSample(format!("not a readable WAV file: {}", e)))?;

        let spec = reader.spec();
        if spec.sample_rate == 0 || spec.channels == 0 {
            return Err(VoiceError::InvalidVoiceSample(format!(
                "unsupported format: {} Hz, {} channel(s)",
                spec.sample_rate, spec.channels
            )));
        }

        let frames = reader.duration();
        if frames == 0 {
            return Err(VoiceError::InvalidVoiceSample("sample contains no audio".to_string()));
        }

        let duration_secs = frames as f32 / spec.sample_rate as f32;
        if duration_secs < MIN_REFERENCE_SECS {
            return Err(VoiceError::InvalidVoiceSample(format!(
                "sample is {:.2}s long, at least {:.1}s is required",
                duration_secs, MIN_REFERENCE_SECS
            )));
        }

        let digest = Sha256::digest(audio.as_ref());
        let id = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect::<String>();

        Ok(Self {
            id,
            source,
            audio,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            duration_secs,
        })
    }

    /// Ingest a WAV sample from disk
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VoiceError> {
        let path = path.as_ref();
        let audio = tokio::fs::read(path).await?;
        Self::from_wav_bytes(audio, Some(path.to_path_buf()))
    }

    /// Content hash prefix identifying this sample
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Raw WAV bytes, cheap to clone
    pub fn audio(&self) -> Bytes {
        self.audio.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn duration_secs(&self) -> f32 {
        self.duration_secs
    }

    /// File name to send along with the sample
    pub fn file_name(&self) -> String {
        self.source
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| format!("{}.wav", self.id))
    }
}

// The audio payload is left out on purpose, it can be megabytes
impl fmt::Debug for VoiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceReference")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .field("duration_secs", &self.duration_secs)
            .finish()
    }
}
