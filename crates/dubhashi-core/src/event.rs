//! Session events emitted by the conversation pipeline.
//!
//! These describe everything a front-end needs to render the conversation
//! without reaching into session internals.

use crate::turn::{Participant, TurnPhase};

/// Events emitted by a conversation session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The turn phase changed
    PhaseChanged(TurnPhase),
    /// The speaker's utterance was transcribed
    TranscriptReady { speaker: Participant, text: String },
    /// The translation for the listener is ready
    TranslationReady { speaker: Participant, text: String },
    /// Synthesized speech finished playing
    PlaybackFinished,
    /// The turn was abandoned; `message` is the user-facing explanation
    TurnFailed { message: String },
}
