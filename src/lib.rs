// Re-export from sub-crates
pub use dubhashi_api::{
    Bytes, SarvamClient, SarvamConfig, SpeechTranslator, TranscribeError, Transcriber,
    TranslateClient, TranslateConfig, TranslateError, TranslationReply,
};
pub use dubhashi_audio::{
    ActiveRecording, AudioInput, Playback, PlaybackError, PlaybackOutcome, Player, Recorder,
    RecorderError, Recording, RecordingHandle,
};
pub use dubhashi_core::{
    APP_NAME, APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LANGUAGE_CODE, DEFAULT_LOG_LEVEL,
    DEFAULT_TARGET_NAME, LANGUAGES, Language, LanguagePair, Participant, SessionEvent, TurnError,
    TurnMachine, TurnPhase, find_language,
};

// App-specific modules
pub mod history;
pub mod session;

// Version from this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
