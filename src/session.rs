//! Conversation session orchestration.
//!
//! Ties together:
//! - [`TurnMachine`] for who holds the floor
//! - [`AudioInput`] for microphone capture
//! - [`Transcriber`] and [`SpeechTranslator`] for the hosted services
//! - [`Playback`] for the synthesized reply
//!
//! ```text
//! tap mic ─▸ Recording ─▸ tap again ─▸ Processing ─▸ Playing ─▸ Idle
//!                              │  transcribe ▸ translate ▸ decode
//!                              └─ failure / cancel ──────────▸ Idle
//! ```
//!
//! One turn runs record → transcribe → translate → play, strictly in that
//! order, with at most one turn in flight. Cancellation (`stop`, `swap`,
//! changing a language, or shutdown) cancels the cycle's token, aborts the
//! pipeline task, releases the audio handles, and resets the machine to
//! idle. Each cycle also carries a generation number:
//! state is only mutated, and events only emitted, while the cycle is still
//! current, so a response that resolves after cancellation is never applied.

use std::sync::Arc;
use std::time::Duration;

use dubhashi_api::{Bytes, SpeechTranslator, TranscribeError, Transcriber, TranslateError};
use dubhashi_audio::{
    ActiveRecording, AudioInput, Playback, PlaybackError, PlaybackOutcome, RecorderError,
    Recording,
};
use dubhashi_core::{
    Language, LanguagePair, Participant, SessionEvent, TurnError, TurnMachine, TurnPhase,
};
use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::history::{HistoryEntry, HistoryStore};

/// Errors surfaced to the caller of session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Turn(#[from] TurnError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error("nothing to replay yet")]
    NothingToReplay,
}

/// Why a turn was abandoned; rendered into the one-shot user alert.
#[derive(Debug, Error)]
enum TurnFailure {
    #[error("could not transcribe speech: {0}")]
    Transcribe(#[from] TranscribeError),

    #[error("could not translate: {0}")]
    Translate(#[from] TranslateError),

    #[error("could not play translation: {0}")]
    Playback(#[from] PlaybackError),

    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// Session tuning knobs, typically derived from [`dubhashi_core::Config`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Recordings shorter than this are dropped without calling the services
    pub discard_duration: Duration,
    /// Record successful turns in the history store
    pub save_history: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            discard_duration: Duration::from_millis(500),
            save_history: true,
        }
    }
}

/// State shared between mic taps and the in-flight pipeline task.
struct Inner {
    machine: TurnMachine,
    languages: LanguagePair,
    recording: Option<Box<dyn ActiveRecording>>,
    /// Decoded clip from the last successful turn, kept for replay
    last_audio: Option<Vec<u8>>,
    /// Monotonic cycle counter; results from a stale cycle are discarded
    generation: u64,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

/// Handle to a running conversation session. Cheap to clone; all clones share
/// the same state.
#[derive(Clone)]
pub struct ConversationSession {
    inner: Arc<Mutex<Inner>>,
    input: Arc<dyn AudioInput>,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn SpeechTranslator>,
    playback: Arc<dyn Playback>,
    history: Option<Arc<HistoryStore>>,
    options: SessionOptions,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ConversationSession {
    /// Create a session and the receiver for its event stream.
    pub fn new(
        input: Arc<dyn AudioInput>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn SpeechTranslator>,
        playback: Arc<dyn Playback>,
        history: Option<HistoryStore>,
        options: SessionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let session = Self {
            inner: Arc::new(Mutex::new(Inner {
                machine: TurnMachine::new(),
                languages: LanguagePair::new(),
                recording: None,
                last_audio: None,
                generation: 0,
                cancel: CancellationToken::new(),
                task: None,
            })),
            input,
            transcriber,
            translator,
            playback,
            history: history.map(Arc::new),
            options,
            events,
        };
        (session, event_rx)
    }

    /// The current turn phase.
    pub async fn phase(&self) -> TurnPhase {
        self.inner.lock().await.machine.phase()
    }

    /// The language selected for `participant`, if any.
    pub async fn language(&self, participant: Participant) -> Option<Language> {
        self.inner.lock().await.languages.get(participant).cloned()
    }

    /// Select a participant's language. A new selection invalidates any turn
    /// still using the old pair.
    pub async fn set_language(&self, participant: Participant, language: Language) {
        self.cancel_turn().await;
        let mut inner = self.inner.lock().await;
        info!(
            participant = participant.label(),
            language = %language.name,
            "language selected"
        );
        inner.languages.set(participant, language);
    }

    /// Exchange the two participants' languages, invalidating any in-flight
    /// turn so its results cannot land on the new pair.
    pub async fn swap_languages(&self) {
        self.cancel_turn().await;
        let mut inner = self.inner.lock().await;
        inner.languages.swap();
        info!("languages swapped");
    }

    /// Tap the microphone for `participant`: starts recording when idle,
    /// stops and runs the pipeline when that participant is already
    /// recording. Taps while another participant's turn is in flight are
    /// rejected.
    pub async fn toggle_mic(&self, participant: Participant) -> Result<TurnPhase, SessionError> {
        let mut inner = self.inner.lock().await;
        match inner.machine.phase() {
            TurnPhase::Recording(p) if p == participant => {
                self.stop_and_process(&mut inner, participant)
            }
            _ => self.start_recording(&mut inner, participant),
        }
    }

    fn start_recording(
        &self,
        inner: &mut Inner,
        participant: Participant,
    ) -> Result<TurnPhase, SessionError> {
        inner.machine.start_recording(participant)?;
        match self.input.start() {
            Ok(handle) => {
                info!(participant = participant.label(), "recording started");
                inner.recording = Some(handle);
                self.emit(SessionEvent::PhaseChanged(inner.machine.phase()));
                Ok(inner.machine.phase())
            }
            Err(e) => {
                inner.machine.reset();
                self.emit(SessionEvent::TurnFailed {
                    message: format!("could not start recording: {e}"),
                });
                Err(e.into())
            }
        }
    }

    fn stop_and_process(
        &self,
        inner: &mut Inner,
        participant: Participant,
    ) -> Result<TurnPhase, SessionError> {
        inner.machine.stop_recording(participant)?;
        let Some(mut handle) = inner.recording.take() else {
            // The machine said we were recording; losing the handle is a bug
            // upstream. Recover by resetting.
            inner.machine.reset();
            return Err(RecorderError::NoActiveRecording.into());
        };

        let recording = match handle.finish() {
            Ok(recording) => recording,
            Err(e) => {
                inner.machine.reset();
                self.emit(SessionEvent::PhaseChanged(TurnPhase::Idle));
                self.emit(SessionEvent::TurnFailed {
                    message: format!("could not stop recording: {e}"),
                });
                return Err(e.into());
            }
        };

        if recording.duration() < self.options.discard_duration {
            info!(duration = ?recording.duration(), "discarding short recording");
            inner.machine.reset();
            self.emit(SessionEvent::PhaseChanged(TurnPhase::Idle));
            return Ok(TurnPhase::Idle);
        }

        // Snapshot the language pair now; the pipeline must not read it
        // later, so a swap mid-flight cannot leak into this turn.
        let source_code = inner.languages.source_code(participant);
        let target_name = inner.languages.target_name(participant);

        inner.generation += 1;
        let generation = inner.generation;
        let cancel = CancellationToken::new();
        inner.cancel = cancel.clone();

        self.emit(SessionEvent::PhaseChanged(inner.machine.phase()));

        let session = self.clone();
        inner.task = Some(tokio::spawn(run_turn(
            session,
            participant,
            recording,
            source_code,
            target_name,
            generation,
            cancel,
        )));

        Ok(TurnPhase::Processing(participant))
    }

    /// Forced termination: abort in-flight work, discard an open recording,
    /// stop playback, and return to idle. Does nothing when already idle.
    pub async fn cancel_turn(&self) {
        let task = {
            let mut inner = self.inner.lock().await;
            if inner.machine.is_idle() && inner.task.is_none() && inner.recording.is_none() {
                return;
            }
            info!(phase = ?inner.machine.phase(), "cancelling turn");
            inner.generation += 1;
            inner.cancel.cancel();
            // Dropping the handle releases the capture stream and discards
            // the audio.
            inner.recording = None;
            inner.machine.reset();
            inner.task.take()
        };

        self.playback.stop();
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }
        self.emit(SessionEvent::PhaseChanged(TurnPhase::Idle));
    }

    /// Replay the last synthesized clip. Rejected while a turn is in flight.
    pub async fn replay(&self) -> Result<(), SessionError> {
        let clip = {
            let inner = self.inner.lock().await;
            if !inner.machine.is_idle() {
                return Err(TurnError::Busy.into());
            }
            inner
                .last_audio
                .clone()
                .ok_or(SessionError::NothingToReplay)?
        };

        let playback = self.playback.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            match playback.play(clip).await {
                Ok(PlaybackOutcome::Finished) => {
                    events.send(SessionEvent::PlaybackFinished).ok();
                }
                Ok(PlaybackOutcome::Stopped) => {}
                Err(e) => {
                    error!("replay failed: {e}");
                    events
                        .send(SessionEvent::TurnFailed {
                            message: format!("could not replay audio: {e}"),
                        })
                        .ok();
                }
            }
        });
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        self.events.send(event).ok();
    }

    async fn run_pipeline(
        &self,
        speaker: Participant,
        recording: Recording,
        source_code: &str,
        target_name: &str,
        generation: u64,
    ) -> Result<(), TurnFailure> {
        let audio = Bytes::from(recording.into_data());
        info!(
            participant = speaker.label(),
            bytes = audio.len(),
            language = source_code,
            "transcribing utterance"
        );

        let transcript = self.transcriber.transcribe(audio, source_code).await?;
        {
            // Emitting under the lock means a concurrent cancel either
            // happens entirely before (we bail on the generation) or entirely
            // after this update.
            let inner = self.inner.lock().await;
            if inner.generation != generation {
                return Ok(());
            }
            info!(
                participant = speaker.label(),
                chars = transcript.len(),
                "transcript ready"
            );
            self.emit(SessionEvent::TranscriptReady {
                speaker,
                text: transcript.clone(),
            });
        }

        let reply = self
            .translator
            .translate_and_speak(&transcript, source_code, target_name)
            .await?;
        let clip = reply.audio_bytes()?;

        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return Ok(());
            }
            inner.machine.begin_playback()?;
            inner.last_audio = Some(clip.clone());
            self.emit(SessionEvent::TranslationReady {
                speaker,
                text: reply.translated_text.clone(),
            });
            self.emit(SessionEvent::PhaseChanged(TurnPhase::Playing(speaker)));
        }

        if self.options.save_history {
            if let Some(history) = &self.history {
                let entry = HistoryEntry::new(
                    transcript,
                    reply.translated_text,
                    source_code,
                    target_name,
                    Some(reply.audio_data),
                );
                if let Err(e) = history.append(&entry) {
                    warn!("failed to record history entry: {e}");
                }
            }
        }

        let outcome = self.playback.play(clip).await?;

        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation {
                return Ok(());
            }
            inner.machine.finish_playback()?;
            inner.task = None;
            if outcome == PlaybackOutcome::Finished {
                self.emit(SessionEvent::PlaybackFinished);
            }
            self.emit(SessionEvent::PhaseChanged(TurnPhase::Idle));
        }

        Ok(())
    }
}

/// Drives one turn's transcribe→translate→play pipeline. Runs as a spawned
/// task so mic taps stay responsive; the select aborts promptly on
/// cancellation, dropping whatever request is in flight.
async fn run_turn(
    session: ConversationSession,
    speaker: Participant,
    recording: Recording,
    source_code: String,
    target_name: String,
    generation: u64,
    cancel: CancellationToken,
) {
    let result = tokio::select! {
        _ = cancel.cancelled() => {
            info!(participant = speaker.label(), "turn cancelled");
            return;
        }
        result = session.run_pipeline(
            speaker,
            recording,
            &source_code,
            &target_name,
            generation,
        ) => result,
    };

    if let Err(failure) = result {
        let mut inner = session.inner.lock().await;
        if inner.generation != generation {
            return;
        }
        error!(
            participant = speaker.label(),
            error = %failure,
            "turn failed"
        );
        inner.machine.reset();
        inner.task = None;
        drop(inner);
        session.emit(SessionEvent::PhaseChanged(TurnPhase::Idle));
        session.emit(SessionEvent::TurnFailed {
            message: failure.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use dubhashi_api::TranslationReply;

    use super::*;

    struct FakeInput {
        duration: Duration,
    }

    impl AudioInput for FakeInput {
        fn start(&self) -> Result<Box<dyn ActiveRecording>, RecorderError> {
            Ok(Box::new(FakeRecording {
                duration: self.duration,
            }))
        }
    }

    struct FakeRecording {
        duration: Duration,
    }

    impl ActiveRecording for FakeRecording {
        fn finish(&mut self) -> Result<Recording, RecorderError> {
            Ok(Recording::new(
                vec![0u8; 1024],
                self.duration,
                44_100,
                2,
            ))
        }
    }

    struct FakeTranscriber {
        delay: Duration,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(
            &self,
            _audio: Bytes,
            _language_code: &str,
        ) -> Result<String, TranscribeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                Err(TranscribeError::Api(
                    "500 Internal Server Error: boom".into(),
                ))
            } else {
                Ok("Hello, how are you?".to_string())
            }
        }

        fn name(&self) -> &str {
            "fake-transcriber"
        }
    }

    struct FakeTranslator {
        delay: Duration,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SpeechTranslator for FakeTranslator {
        async fn translate_and_speak(
            &self,
            _text: &str,
            _source_code: &str,
            _target_language: &str,
        ) -> Result<TranslationReply, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(TranslationReply {
                translated_text: "नमस्ते, आप कैसे हैं?".to_string(),
                // "clip"
                audio_data: "Y2xpcA==".to_string(),
            })
        }

        fn name(&self) -> &str {
            "fake-translator"
        }
    }

    struct FakePlayback {
        plays: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Playback for FakePlayback {
        async fn play(&self, audio: Vec<u8>) -> Result<PlaybackOutcome, PlaybackError> {
            assert!(!audio.is_empty());
            self.plays.fetch_add(1, Ordering::SeqCst);
            Ok(PlaybackOutcome::Finished)
        }

        fn stop(&self) {}
    }

    struct Counters {
        transcribes: Arc<AtomicUsize>,
        translates: Arc<AtomicUsize>,
        plays: Arc<AtomicUsize>,
    }

    fn test_session(
        transcribe_delay: Duration,
        transcribe_fail: bool,
        translate_delay: Duration,
    ) -> (
        ConversationSession,
        mpsc::UnboundedReceiver<SessionEvent>,
        Counters,
    ) {
        test_session_with_recording(
            transcribe_delay,
            transcribe_fail,
            translate_delay,
            Duration::from_secs(2),
        )
    }

    fn test_session_with_recording(
        transcribe_delay: Duration,
        transcribe_fail: bool,
        translate_delay: Duration,
        recording_duration: Duration,
    ) -> (
        ConversationSession,
        mpsc::UnboundedReceiver<SessionEvent>,
        Counters,
    ) {
        let counters = Counters {
            transcribes: Arc::new(AtomicUsize::new(0)),
            translates: Arc::new(AtomicUsize::new(0)),
            plays: Arc::new(AtomicUsize::new(0)),
        };

        let (session, events) = ConversationSession::new(
            Arc::new(FakeInput {
                duration: recording_duration,
            }),
            Arc::new(FakeTranscriber {
                delay: transcribe_delay,
                fail: transcribe_fail,
                calls: counters.transcribes.clone(),
            }),
            Arc::new(FakeTranslator {
                delay: translate_delay,
                calls: counters.translates.clone(),
            }),
            Arc::new(FakePlayback {
                plays: counters.plays.clone(),
            }),
            None,
            SessionOptions::default(),
        );

        (session, events, counters)
    }

    async fn next_event(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed")
    }

    /// Wait for events until the session reports idle again.
    async fn drain_until_idle(
        events: &mut mpsc::UnboundedReceiver<SessionEvent>,
    ) -> Vec<SessionEvent> {
        let mut seen = Vec::new();
        loop {
            let event = next_event(events).await;
            let done = matches!(event, SessionEvent::PhaseChanged(TurnPhase::Idle));
            seen.push(event);
            if done {
                return seen;
            }
        }
    }

    #[tokio::test]
    async fn test_happy_path_turn_cycle() {
        let (session, mut events, counters) =
            test_session(Duration::ZERO, false, Duration::ZERO);

        session
            .set_language(Participant::A, Language::new("Hindi", "hi-IN"))
            .await;
        session
            .set_language(Participant::B, Language::new("Telugu", "te-IN"))
            .await;

        let phase = session.toggle_mic(Participant::A).await.unwrap();
        assert_eq!(phase, TurnPhase::Recording(Participant::A));

        let phase = session.toggle_mic(Participant::A).await.unwrap();
        assert_eq!(phase, TurnPhase::Processing(Participant::A));

        let seen = drain_until_idle(&mut events).await;
        let expected = [
            "Recording",
            "Processing",
            "TranscriptReady",
            "TranslationReady",
            "Playing",
            "PlaybackFinished",
            "Idle",
        ];
        let labels: Vec<&str> = seen
            .iter()
            .map(|event| match event {
                SessionEvent::PhaseChanged(TurnPhase::Recording(_)) => "Recording",
                SessionEvent::PhaseChanged(TurnPhase::Processing(_)) => "Processing",
                SessionEvent::PhaseChanged(TurnPhase::Playing(_)) => "Playing",
                SessionEvent::PhaseChanged(TurnPhase::Idle) => "Idle",
                SessionEvent::TranscriptReady { .. } => "TranscriptReady",
                SessionEvent::TranslationReady { .. } => "TranslationReady",
                SessionEvent::PlaybackFinished => "PlaybackFinished",
                SessionEvent::TurnFailed { .. } => "TurnFailed",
            })
            .collect();
        assert_eq!(labels, expected);

        assert_eq!(session.phase().await, TurnPhase::Idle);
        assert_eq!(counters.plays.load(Ordering::SeqCst), 1);
        assert_eq!(counters.transcribes.load(Ordering::SeqCst), 1);
        assert_eq!(counters.translates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mic_rejected_while_other_is_recording() {
        let (session, _events, _counters) =
            test_session(Duration::ZERO, false, Duration::ZERO);

        session.toggle_mic(Participant::A).await.unwrap();
        let err = session.toggle_mic(Participant::B).await.unwrap_err();
        assert!(matches!(err, SessionError::Turn(TurnError::Busy)));
        assert_eq!(
            session.phase().await,
            TurnPhase::Recording(Participant::A)
        );
    }

    #[tokio::test]
    async fn test_mic_rejected_while_processing() {
        let (session, _events, _counters) =
            test_session(Duration::from_secs(30), false, Duration::ZERO);

        session.toggle_mic(Participant::A).await.unwrap();
        session.toggle_mic(Participant::A).await.unwrap();
        assert_eq!(
            session.phase().await,
            TurnPhase::Processing(Participant::A)
        );

        for participant in [Participant::A, Participant::B] {
            let err = session.toggle_mic(participant).await.unwrap_err();
            assert!(matches!(err, SessionError::Turn(TurnError::Busy)));
        }

        session.cancel_turn().await;
    }

    #[tokio::test]
    async fn test_cancel_mid_processing_discards_stale_result() {
        let (session, mut events, counters) =
            test_session(Duration::from_secs(30), false, Duration::ZERO);

        session.toggle_mic(Participant::A).await.unwrap();
        session.toggle_mic(Participant::A).await.unwrap();

        session.cancel_turn().await;
        assert_eq!(session.phase().await, TurnPhase::Idle);

        // Recording, Processing, then the cancel's Idle; the aborted
        // transcription must contribute nothing.
        let seen = drain_until_idle(&mut events).await;
        assert!(
            seen.iter().all(|event| !matches!(
                event,
                SessionEvent::TranscriptReady { .. } | SessionEvent::TranslationReady { .. }
            )),
            "stale pipeline result was applied"
        );
        assert_eq!(counters.translates.load(Ordering::SeqCst), 0);
        assert_eq!(counters.plays.load(Ordering::SeqCst), 0);
        assert!(matches!(
            session.replay().await,
            Err(SessionError::NothingToReplay)
        ));
    }

    #[tokio::test]
    async fn test_transcription_error_returns_to_idle() {
        let (session, mut events, counters) =
            test_session(Duration::ZERO, true, Duration::ZERO);

        session.toggle_mic(Participant::A).await.unwrap();
        session.toggle_mic(Participant::A).await.unwrap();

        let seen = drain_until_idle(&mut events).await;
        assert!(
            seen.iter()
                .all(|event| !matches!(event, SessionEvent::TranslationReady { .. }))
        );

        // The failure event follows the phase reset.
        let failure = next_event(&mut events).await;
        assert!(matches!(failure, SessionEvent::TurnFailed { .. }));

        assert_eq!(session.phase().await, TurnPhase::Idle);
        assert_eq!(counters.translates.load(Ordering::SeqCst), 0);
        assert_eq!(counters.plays.load(Ordering::SeqCst), 0);
        // No partial translation state was applied.
        assert!(matches!(
            session.replay().await,
            Err(SessionError::NothingToReplay)
        ));
    }

    #[tokio::test]
    async fn test_swap_mid_flight_discards_result() {
        let (session, mut events, counters) =
            test_session(Duration::ZERO, false, Duration::from_secs(30));

        session
            .set_language(Participant::A, Language::new("Hindi", "hi-IN"))
            .await;
        session
            .set_language(Participant::B, Language::new("Telugu", "te-IN"))
            .await;

        session.toggle_mic(Participant::A).await.unwrap();
        session.toggle_mic(Participant::A).await.unwrap();

        // Wait until the transcript is applied, then swap while the
        // translation request is still in flight.
        loop {
            if matches!(
                next_event(&mut events).await,
                SessionEvent::TranscriptReady { .. }
            ) {
                break;
            }
        }
        session.swap_languages().await;

        assert_eq!(session.phase().await, TurnPhase::Idle);
        let seen = drain_until_idle(&mut events).await;
        assert!(
            seen.iter()
                .all(|event| !matches!(event, SessionEvent::TranslationReady { .. })),
            "stale translation was applied after swap"
        );
        assert_eq!(counters.plays.load(Ordering::SeqCst), 0);

        // The swap itself took effect.
        assert_eq!(
            session.language(Participant::A).await.unwrap().code,
            "te-IN"
        );
    }

    #[tokio::test]
    async fn test_short_recording_discarded() {
        let (session, mut events, counters) = test_session_with_recording(
            Duration::ZERO,
            false,
            Duration::ZERO,
            Duration::from_millis(100),
        );

        session.toggle_mic(Participant::B).await.unwrap();
        let phase = session.toggle_mic(Participant::B).await.unwrap();
        assert_eq!(phase, TurnPhase::Idle);

        drain_until_idle(&mut events).await;
        assert_eq!(counters.transcribes.load(Ordering::SeqCst), 0);
        assert_eq!(counters.plays.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_replay_after_successful_turn() {
        let (session, mut events, counters) =
            test_session(Duration::ZERO, false, Duration::ZERO);

        assert!(matches!(
            session.replay().await,
            Err(SessionError::NothingToReplay)
        ));

        session.toggle_mic(Participant::A).await.unwrap();
        session.toggle_mic(Participant::A).await.unwrap();
        drain_until_idle(&mut events).await;

        session.replay().await.unwrap();
        loop {
            if matches!(next_event(&mut events).await, SessionEvent::PlaybackFinished) {
                break;
            }
        }
        assert_eq!(counters.plays.load(Ordering::SeqCst), 2);
    }
}
