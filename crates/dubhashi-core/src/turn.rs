//! Turn state for the two-party conversation loop.

use thiserror::Error;

/// One side of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Participant {
    A,
    B,
}

impl Participant {
    /// The other side, i.e. the listener while this participant speaks.
    pub fn other(self) -> Self {
        match self {
            Participant::A => Participant::B,
            Participant::B => Participant::A,
        }
    }

    /// Short display label.
    pub fn label(self) -> &'static str {
        match self {
            Participant::A => "A",
            Participant::B => "B",
        }
    }
}

/// The current phase of the conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// No turn in progress
    Idle,
    /// Capturing the participant's utterance
    Recording(Participant),
    /// Transcribing and translating the captured audio
    Processing(Participant),
    /// Playing the synthesized translation
    Playing(Participant),
}

/// Rejected turn transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TurnError {
    /// A turn is already in flight for some participant
    #[error("another turn is already in progress")]
    Busy,
    /// Stop requested while this participant was not recording
    #[error("no recording in progress")]
    NotRecording,
    /// Playback requested outside the processing phase
    #[error("no turn is being processed")]
    NotProcessing,
    /// Completion reported outside the playing phase
    #[error("no playback in progress")]
    NotPlaying,
}

/// Tracks which participant holds the floor.
///
/// The machine is the single source of truth for the "one cycle in flight"
/// rule: every side effect in the pipeline (opening the microphone, calling
/// the remote services, starting playback) is gated on a successful
/// transition here. All transitions are synchronous and infallible in
/// memory; rejected ones return [`TurnError`] and leave the phase unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnMachine {
    phase: TurnPhase,
}

impl Default for TurnMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnMachine {
    pub fn new() -> Self {
        Self {
            phase: TurnPhase::Idle,
        }
    }

    /// The current phase.
    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_idle(&self) -> bool {
        self.phase == TurnPhase::Idle
    }

    /// The participant whose turn is in flight, if any.
    pub fn speaker(&self) -> Option<Participant> {
        match self.phase {
            TurnPhase::Idle => None,
            TurnPhase::Recording(p) | TurnPhase::Processing(p) | TurnPhase::Playing(p) => Some(p),
        }
    }

    /// `Idle -> Recording(p)`. Rejected while any turn is in flight, for
    /// either participant.
    pub fn start_recording(&mut self, participant: Participant) -> Result<(), TurnError> {
        if self.phase != TurnPhase::Idle {
            return Err(TurnError::Busy);
        }
        self.phase = TurnPhase::Recording(participant);
        Ok(())
    }

    /// `Recording(p) -> Processing(p)`. Rejected unless `p` is the
    /// participant currently recording.
    pub fn stop_recording(&mut self, participant: Participant) -> Result<(), TurnError> {
        if self.phase != TurnPhase::Recording(participant) {
            return Err(TurnError::NotRecording);
        }
        self.phase = TurnPhase::Processing(participant);
        Ok(())
    }

    /// `Processing(p) -> Playing(p)`.
    pub fn begin_playback(&mut self) -> Result<Participant, TurnError> {
        match self.phase {
            TurnPhase::Processing(p) => {
                self.phase = TurnPhase::Playing(p);
                Ok(p)
            }
            _ => Err(TurnError::NotProcessing),
        }
    }

    /// `Playing(p) -> Idle`, the normal end of a turn.
    pub fn finish_playback(&mut self) -> Result<(), TurnError> {
        match self.phase {
            TurnPhase::Playing(_) => {
                self.phase = TurnPhase::Idle;
                Ok(())
            }
            _ => Err(TurnError::NotPlaying),
        }
    }

    /// Forced termination: any state -> `Idle`. Used for pipeline failures,
    /// cancellation, and shutdown.
    pub fn reset(&mut self) {
        self.phase = TurnPhase::Idle;
    }
}
