//! Vision analysis for whiteboard snapshots and camera frames.
//!
//! Sends a base64 image to a multimodal model and gets back a plain-text
//! description of what the student has written or drawn. The observation
//! tools consume that text, never raw pixels.

use async_trait::async_trait;
use oxtutor_core::error::CollaboratorError;
use oxtutor_core::VisionAnalyzer;
use serde::Deserialize;
use tracing::debug;

const DEFAULT_PROMPT: &str = "You are observing a student's work surface during a tutoring \
session. Describe what is written or drawn: the problem being worked on, each step taken so \
far, and any errors you can see. Be factual and concise.";

/// Describes images via an OpenAI-compatible multimodal endpoint.
pub struct VisionDescriber {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl VisionDescriber {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            client,
        }
    }

    fn build_body(&self, image_base64: &str, context: &str) -> serde_json::Value {
        let prompt = if context.is_empty() {
            DEFAULT_PROMPT.to_string()
        } else {
            format!("{DEFAULT_PROMPT}\n\nSession context: {context}")
        };

        serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/png;base64,{image_base64}") }
                    }
                ]
            }],
            "temperature": 0.2,
            "max_tokens": 500,
        })
    }
}

#[async_trait]
impl VisionAnalyzer for VisionDescriber {
    async fn analyze(
        &self,
        image_base64: &str,
        context: &str,
    ) -> std::result::Result<String, CollaboratorError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_body(image_base64, context);

        debug!(model = %self.model, image_bytes = image_base64.len(), "Sending vision request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| CollaboratorError::Vision(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Vision(format!(
                "status {status}: {error_body}"
            )));
        }

        let api_response: VisionResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::Vision(format!("unparseable response: {e}")))?;

        let description = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if description.is_empty() {
            return Err(CollaboratorError::Vision("empty description".into()));
        }

        Ok(description)
    }
}

#[derive(Debug, Deserialize)]
struct VisionResponse {
    choices: Vec<VisionChoice>,
}

#[derive(Debug, Deserialize)]
struct VisionChoice {
    message: VisionMessage,
}

#[derive(Debug, Deserialize)]
struct VisionMessage {
    #[serde(default)]
    content: Option<String>,
}
