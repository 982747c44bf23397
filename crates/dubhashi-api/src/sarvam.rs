//! Sarvam speech-to-text backend.

use async_trait::async_trait;
use bytes::Bytes;
use serde::Deserialize;
use tracing::debug;

use crate::{TranscribeError, Transcriber};

const SPEECH_ENDPOINT: &str = "https://api.sarvam.ai/speech-to-text";
const DEFAULT_MODEL: &str = "saarika:v1";
const SUBSCRIPTION_HEADER: &str = "api-subscription-key";

/// Configuration for the Sarvam transcription client.
#[derive(Debug, Clone)]
pub struct SarvamConfig {
    /// Subscription key sent with every request
    pub api_key: String,

    /// Endpoint override (defaults to the hosted service)
    pub endpoint: Option<String>,

    /// Model to use (defaults to saarika:v1)
    pub model: Option<String>,
}

impl SarvamConfig {
    /// Create a new config with the given subscription key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: None,
            model: None,
        }
    }

    /// Set the endpoint to use.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Get the endpoint, using the default if not set.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(SPEECH_ENDPOINT)
    }

    /// Get the model name, using the default if not set.
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Sarvam speech-to-text API client.
#[derive(Debug, Clone)]
pub struct SarvamClient {
    client: reqwest::Client,
    config: SarvamConfig,
}

#[derive(Debug, Deserialize)]
struct SpeechToTextResponse {
    transcript: String,
}

impl SarvamClient {
    /// Create a new client with the given configuration.
    pub fn new(config: SarvamConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Create a client from just a subscription key with default settings.
    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(SarvamConfig::new(api_key))
    }
}

#[async_trait]
impl Transcriber for SarvamClient {
    async fn transcribe(
        &self,
        audio: Bytes,
        language_code: &str,
    ) -> Result<String, TranscribeError> {
        if self.config.api_key.is_empty() {
            return Err(TranscribeError::NoApiKey);
        }

        debug!(
            model = self.config.model(),
            audio_bytes = audio.len(),
            language_code,
            "Sending speech-to-text request"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name("recording.wav")
                    .mime_str("audio/wav")?,
            )
            .part(
                "language_code",
                reqwest::multipart::Part::text(language_code.to_string()),
            )
            .part(
                "model",
                reqwest::multipart::Part::text(self.config.model().to_string()),
            );

        let response = self
            .client
            .post(self.config.endpoint())
            .header(SUBSCRIPTION_HEADER, &self.config.api_key)
            .header("Accept", "application/json")
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranscribeError::Api(format!("{}: {}", status, body)));
        }

        let parsed: SpeechToTextResponse = serde_json::from_str(&body)
            .map_err(|e| TranscribeError::MalformedResponse(format!("{}; body: {}", e, body)))?;

        Ok(parsed.transcript)
    }

    fn name(&self) -> &str {
        "sarvam"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SarvamConfig::new("key");
        assert_eq!(config.endpoint(), SPEECH_ENDPOINT);
        assert_eq!(config.model(), "saarika:v1");

        let config = config
            .with_endpoint("http://localhost:9000/stt")
            .with_model("saarika:v2");
        assert_eq!(config.endpoint(), "http://localhost:9000/stt");
        assert_eq!(config.model(), "saarika:v2");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: SpeechToTextResponse =
            serde_json::from_str(r#"{"transcript": "नमस्ते", "language_code": "hi-IN"}"#).unwrap();
        assert_eq!(parsed.transcript, "नमस्ते");

        // Missing transcript is a malformed body, not an empty default.
        assert!(serde_json::from_str::<SpeechToTextResponse>(r#"{"status": "ok"}"#).is_err());
    }
}
