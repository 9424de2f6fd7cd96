//! Speech-to-text over HTTP.
//!
//! Posts audio chunks to a whisper-style `/audio/transcriptions` endpoint
//! (faster-whisper-server, LocalAI, or the OpenAI API itself). Returns
//! plain transcript text.

use async_trait::async_trait;
use oxtutor_core::error::CollaboratorError;
use oxtutor_core::Transcriber;
use serde::Deserialize;
use tracing::debug;

/// Transcribes audio via an OpenAI-compatible transcription endpoint.
pub struct HttpTranscriber {
    endpoint: String,
    model: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    /// `endpoint` is the API base (e.g. `http://localhost:8000/v1`).
    /// An empty endpoint produces a transcriber that always errors,
    /// which callers treat as "transcription disabled".
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            client,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
    ) -> std::result::Result<String, CollaboratorError> {
        if self.endpoint.is_empty() {
            return Err(CollaboratorError::Transcription(
                "transcription endpoint not configured".into(),
            ));
        }

        let url = format!("{}/audio/transcriptions", self.endpoint);

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name("audio.webm")
            .mime_str("audio/webm")
            .map_err(|e| CollaboratorError::Transcription(e.to_string()))?;

        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        debug!(bytes = audio.len(), "Sending transcription request");

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CollaboratorError::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Transcription(format!(
                "status {status}: {error_body}"
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Transcription(format!("unparseable response: {e}")))?;

        Ok(parsed.text.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}
