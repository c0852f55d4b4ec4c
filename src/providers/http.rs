use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::app_config::BackendConfig;
use crate::errors::SynthesisError;
use crate::providers::SynthesisBackend;
use crate::synthesis::VoiceReference;

/// Client for a remote voice-cloning TTS server.
///
/// The server is expected to accept a multipart POST on `/synthesize` with a
/// `text` field and a `voice` file, and answer with the encoded audio.
#[derive(Debug, Clone)]
pub struct HttpSynthesisBackend {
    /// Base URL of the server, without trailing slash
    base_url: String,
    /// Optional bearer token
    api_key: Option<String>,
    /// HTTP client for making requests
    client: Client,
}

impl HttpSynthesisBackend {
    /// Create a client for `endpoint` with the given request timeout
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, SynthesisError> {
        let endpoint = endpoint.into();
        let client = Client::builder()
            .timeout(timeout)
            // Keep connections alive across the lines of a batch
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| SynthesisError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.is_empty()),
            client,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, SynthesisError> {
        Self::new(
            config.endpoint.clone(),
            Some(config.api_key.clone()),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }
}

/// Map a non-success status to an error, keeping the server message
pub(crate) fn classify_status(status: StatusCode, body: &str) -> SynthesisError {
    let message = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{}: {}", status, body.trim())
    };

    // 408 and 429 are the server asking us to come back later
    if status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
    {
        SynthesisError::Transport(message)
    } else {
        SynthesisError::Validation(message)
    }
}

fn transport_error(error: reqwest::Error) -> SynthesisError {
    if error.is_timeout() {
        SynthesisError::Transport(format!("request timed out: {}", error))
    } else if error.is_connect() {
        SynthesisError::Transport(format!("connection failed: {}", error))
    } else {
        SynthesisError::Transport(error.to_string())
    }
}

#[async_trait]
impl SynthesisBackend for HttpSynthesisBackend {
    async fn synthesize(&self, text: &str, voice: &VoiceReference) -> Result<Bytes, SynthesisError> {
        if text.trim().is_empty() {
            return Err(SynthesisError::Validation("text is empty".to_string()));
        }

        let url = format!("{}/synthesize", self.base_url);
        let voice_part = Part::bytes(voice.audio().to_vec())
            .file_name(voice.file_name())
            .mime_str("audio/wav")
            .map_err(|e| SynthesisError::Validation(format!("invalid voice part: {}", e)))?;

        let form = Form::new()
            .text("text", text.to_string())
            .text("voice_id", voice.id().to_string())
            .part("voice", voice_part);

        debug!("POST {} ({} chars, voice {})", url, text.chars().count(), voice.id());

        let response = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(status, &body);
            warn!("Synthesis request failed: {}", error);
            return Err(error);
        }

        let audio = response.bytes().await.map_err(transport_error)?;
        if audio.is_empty() {
            return Err(SynthesisError::Transport("server returned no audio".to_string()));
        }
        Ok(audio)
    }

    async fn test_connection(&self) -> Result<(), SynthesisError> {
        let response = self
            .authorize(self.client.get(&self.base_url))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_server_error() {
            return Err(classify_status(response.status(), ""));
        }
        Ok(())
    }
}
