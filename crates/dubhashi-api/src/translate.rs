//! Translate-and-speak backend.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use dubhashi_core::{DEFAULT_LANGUAGE_CODE, DEFAULT_TARGET_NAME};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{SpeechTranslator, TranslateError};

const TRANSLATE_ENDPOINT: &str = "https://tts-api-kohl.vercel.app/translate_and_speak";
const DEFAULT_VOICE_MODEL: &str = "arvind";

/// Configuration for the translate-and-speak client.
#[derive(Debug, Clone, Default)]
pub struct TranslateConfig {
    /// Endpoint override (defaults to the hosted service)
    pub endpoint: Option<String>,

    /// Voice used for synthesis (defaults to arvind)
    pub voice_model: Option<String>,
}

impl TranslateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint to use.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the voice model to use.
    pub fn with_voice_model(mut self, voice_model: impl Into<String>) -> Self {
        self.voice_model = Some(voice_model.into());
        self
    }

    /// Get the endpoint, using the default if not set.
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(TRANSLATE_ENDPOINT)
    }

    /// Get the voice model, using the default if not set.
    pub fn voice_model(&self) -> &str {
        self.voice_model.as_deref().unwrap_or(DEFAULT_VOICE_MODEL)
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    text: &'a str,
    language: &'a str,
    target_language: &'a str,
    voice_model: &'a str,
}

/// Response from the translate-and-speak endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationReply {
    /// Text rendered in the target language
    pub translated_text: String,

    /// Base64-encoded synthesized speech, MP3 unless the service says
    /// otherwise
    pub audio_data: String,
}

impl TranslationReply {
    /// Decode the synthesized clip.
    pub fn audio_bytes(&self) -> Result<Vec<u8>, TranslateError> {
        Ok(BASE64.decode(self.audio_data.trim())?)
    }
}

/// Translate-and-speak API client.
#[derive(Debug, Clone)]
pub struct TranslateClient {
    client: reqwest::Client,
    config: TranslateConfig,
}

impl TranslateClient {
    /// Create a new client with the given configuration.
    pub fn new(config: TranslateConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SpeechTranslator for TranslateClient {
    async fn translate_and_speak(
        &self,
        text: &str,
        source_code: &str,
        target_language: &str,
    ) -> Result<TranslationReply, TranslateError> {
        // Empty selections fall back to the service defaults, loudly: a
        // silent fallback translates into the wrong language without the
        // user noticing.
        let language = if source_code.is_empty() {
            warn!(
                fallback = DEFAULT_LANGUAGE_CODE,
                "no source language given, using default"
            );
            DEFAULT_LANGUAGE_CODE
        } else {
            source_code
        };
        let target_language = if target_language.is_empty() {
            warn!(
                fallback = DEFAULT_TARGET_NAME,
                "no target language given, using default"
            );
            DEFAULT_TARGET_NAME
        } else {
            target_language
        };

        debug!(
            chars = text.len(),
            language,
            target_language,
            voice_model = self.config.voice_model(),
            "Sending translate-and-speak request"
        );

        let response = self
            .client
            .post(self.config.endpoint())
            .json(&TranslateRequest {
                text,
                language,
                target_language,
                voice_model: self.config.voice_model(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TranslateError::Api(format!("{}: {}", status, body)));
        }

        let reply: TranslationReply = serde_json::from_str(&body)
            .map_err(|e| TranslateError::MalformedResponse(format!("{}; body: {}", e, body)))?;

        Ok(reply)
    }

    fn name(&self) -> &str {
        "translate-and-speak"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = TranslateConfig::new();
        assert_eq!(config.endpoint(), TRANSLATE_ENDPOINT);
        assert_eq!(config.voice_model(), "arvind");

        let config = config.with_voice_model("meera");
        assert_eq!(config.voice_model(), "meera");
    }

    #[test]
    fn test_request_body_shape() {
        let request = TranslateRequest {
            text: "Hello, how are you?",
            language: "en-US",
            target_language: "hindi",
            voice_model: "arvind",
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["text"], "Hello, how are you?");
        assert_eq!(value["language"], "en-US");
        assert_eq!(value["target_language"], "hindi");
        assert_eq!(value["voice_model"], "arvind");
    }

    #[test]
    fn test_reply_audio_decoding() {
        let reply: TranslationReply = serde_json::from_str(
            r#"{"translated_text": "नमस्ते, आप कैसे हैं?", "audio_data": "aGVsbG8="}"#,
        )
        .unwrap();
        assert_eq!(reply.translated_text, "नमस्ते, आप कैसे हैं?");
        assert_eq!(reply.audio_bytes().unwrap(), b"hello");

        let bad = TranslationReply {
            translated_text: String::new(),
            audio_data: "not base64!".into(),
        };
        assert!(matches!(
            bad.audio_bytes(),
            Err(TranslateError::BadAudio(_))
        ));
    }
}
