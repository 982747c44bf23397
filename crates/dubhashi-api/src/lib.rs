//! HTTP clients for the hosted speech services.
//!
//! Two remote collaborators: a speech-to-text endpoint that accepts WAV
//! uploads, and a translate-and-speak endpoint that returns translated text
//! plus a base64-encoded speech clip. Both sit behind traits so the session
//! pipeline can be driven with fakes in tests.

mod sarvam;
mod translate;

use async_trait::async_trait;
pub use bytes::Bytes;
pub use sarvam::{SarvamClient, SarvamConfig};
use thiserror::Error;
pub use translate::{TranslateClient, TranslateConfig, TranslationReply};

/// Errors from the speech-to-text service.
#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error("no API key configured")]
    NoApiKey,

    /// Non-2xx status; the message carries the raw body for diagnostics
    #[error("speech API request failed: {0}")]
    Api(String),

    #[error("malformed speech API response: {0}")]
    MalformedResponse(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Errors from the translate-and-speak service.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Non-2xx status; the message carries the raw body for diagnostics
    #[error("translation API request failed: {0}")]
    Api(String),

    #[error("malformed translation API response: {0}")]
    MalformedResponse(String),

    #[error("synthesized audio is not valid base64: {0}")]
    BadAudio(#[from] base64::DecodeError),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Trait for speech-to-text backends.
///
/// Implement this trait to add new recognition backends (other hosted
/// services, test fakes, etc.)
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe recorded audio to text.
    ///
    /// # Arguments
    /// * `audio` - Finalized WAV bytes as reference-counted bytes. Cloning
    ///   `Bytes` is O(1).
    /// * `language_code` - Code the utterance was spoken in (e.g. "hi-IN")
    async fn transcribe(
        &self,
        audio: Bytes,
        language_code: &str,
    ) -> Result<String, TranscribeError>;

    /// Returns the name of this transcriber for logging/debugging.
    fn name(&self) -> &str;
}

/// Trait for translate-and-synthesize backends.
#[async_trait]
pub trait SpeechTranslator: Send + Sync {
    /// Translate `text` from `source_code` into `target_language` and return
    /// the translated text together with a synthesized clip.
    async fn translate_and_speak(
        &self,
        text: &str,
        source_code: &str,
        target_language: &str,
    ) -> Result<TranslationReply, TranslateError>;

    /// Returns the name of this translator for logging/debugging.
    fn name(&self) -> &str;
}
