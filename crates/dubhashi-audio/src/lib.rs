//! Audio capture and playback for dubhashi.
//!
//! Capture records the microphone into an in-memory WAV buffer on a
//! dedicated thread; playback drives synthesized clips through the default
//! output device the same way. Both sit behind traits so the session
//! pipeline can be exercised without real devices.

mod capture;
mod playback;

pub use capture::{
    ActiveRecording, AudioInput, Recorder, RecorderError, Recording, RecordingHandle,
};
pub use playback::{Playback, PlaybackError, PlaybackOutcome, Player};
