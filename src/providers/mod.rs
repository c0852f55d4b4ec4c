/*!
 * Synthesis backend implementations.
 *
 * This module contains the clients that turn a line of text plus a reference
 * voice into audio:
 * - Http: a remote voice-cloning TTS server
 * - Mock: scripted in-process backend used by tests
 */

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

use crate::errors::SynthesisError;
use crate::synthesis::VoiceReference;

/// Common trait for all synthesis backends
///
/// Backends are shared by every job of every batch, so implementations must be
/// safe to call concurrently.
#[async_trait]
pub trait SynthesisBackend: Send + Sync + Debug {
    /// Synthesize `text` in the voice of `voice`
    ///
    /// # Arguments
    /// * `text` - One cleaned line of dialogue
    /// * `voice` - Reference sample to clone the voice from
    ///
    /// # Returns
    /// * `Result<Bytes, SynthesisError>` - Encoded audio, or a transport/validation error
    async fn synthesize(&self, text: &str, voice: &VoiceReference) -> Result<Bytes, SynthesisError>;

    /// Test the connection to the backend
    async fn test_connection(&self) -> Result<(), SynthesisError>;
}

pub mod http;
pub mod mock;
