//! Synthesized speech playback.
//!
//! The translate service hands back one clip per turn, nominally MP3. Only
//! one clip may be loaded at a time; loading a new one implicitly stops and
//! unloads the previous. Like capture, the rodio output stream is not
//! `Send`, so it lives on a dedicated thread behind a command channel.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::error;

const POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Error)]
pub enum PlaybackError {
    /// No output device available
    #[error("no output device available")]
    NoOutputDevice,
    /// The clip could not be decoded, even after the container fallback
    #[error("could not decode synthesized audio: {0}")]
    Decode(String),
    /// The player thread is gone
    #[error("audio player is no longer running")]
    Closed,
}

/// How a playback request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// The clip played to completion
    Finished,
    /// The clip was stopped or replaced before completing
    Stopped,
}

type PlayResult = Result<PlaybackOutcome, PlaybackError>;

/// Sink for synthesized speech.
#[async_trait]
pub trait Playback: Send + Sync {
    /// Play a clip, replacing whatever is currently loaded. Resolves once
    /// the clip finishes or is stopped.
    async fn play(&self, audio: Vec<u8>) -> PlayResult;

    /// Stop and unload the current clip, if any.
    fn stop(&self);
}

enum PlayerCommand {
    Play {
        audio: Vec<u8>,
        done: oneshot::Sender<PlayResult>,
    },
    Stop,
}

/// Plays clips through the default output device.
pub struct Player {
    commands: mpsc::Sender<PlayerCommand>,
}

impl Player {
    /// Spawn the player thread. Fails when no output device can be opened.
    pub fn new() -> Result<Self, PlaybackError> {
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        thread::Builder::new()
            .name("dubhashi-playback".into())
            .spawn(move || run_player(command_rx, ready_tx))
            .map_err(|_| PlaybackError::Closed)?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self { commands }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(PlaybackError::Closed),
        }
    }
}

#[async_trait]
impl Playback for Player {
    async fn play(&self, audio: Vec<u8>) -> PlayResult {
        let (done, done_rx) = oneshot::channel();
        self.commands
            .send(PlayerCommand::Play { audio, done })
            .map_err(|_| PlaybackError::Closed)?;
        done_rx.await.map_err(|_| PlaybackError::Closed)?
    }

    fn stop(&self) {
        self.commands.send(PlayerCommand::Stop).ok();
    }
}

fn run_player(
    commands: mpsc::Receiver<PlayerCommand>,
    ready: mpsc::Sender<Result<(), PlaybackError>>,
) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            error!("failed to open output device: {e}");
            ready.send(Err(PlaybackError::NoOutputDevice)).ok();
            return;
        }
    };
    ready.send(Ok(())).ok();

    let mut current: Option<(Sink, oneshot::Sender<PlayResult>)> = None;

    loop {
        // Poll for completion while a clip is loaded, otherwise block until
        // the next command arrives.
        let command = if current.is_some() {
            match commands.recv_timeout(POLL_INTERVAL) {
                Ok(command) => Some(command),
                Err(mpsc::RecvTimeoutError::Timeout) => None,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match commands.recv() {
                Ok(command) => Some(command),
                Err(_) => break,
            }
        };

        if current.as_ref().is_some_and(|(sink, _)| sink.empty()) {
            if let Some((_, done)) = current.take() {
                done.send(Ok(PlaybackOutcome::Finished)).ok();
            }
        }

        match command {
            Some(PlayerCommand::Play { audio, done }) => {
                // Loading a new clip implicitly stops and unloads the
                // previous one.
                if let Some((sink, previous)) = current.take() {
                    sink.stop();
                    previous.send(Ok(PlaybackOutcome::Stopped)).ok();
                }
                match decode_clip(audio) {
                    Ok(source) => match Sink::try_new(&handle) {
                        Ok(sink) => {
                            sink.append(source);
                            current = Some((sink, done));
                        }
                        Err(e) => {
                            error!("failed to open playback sink: {e}");
                            done.send(Err(PlaybackError::NoOutputDevice)).ok();
                        }
                    },
                    Err(e) => {
                        done.send(Err(e)).ok();
                    }
                }
            }
            Some(PlayerCommand::Stop) => {
                if let Some((sink, done)) = current.take() {
                    sink.stop();
                    done.send(Ok(PlaybackOutcome::Stopped)).ok();
                }
            }
            None => {}
        }
    }

    // Command channel gone; halt whatever is still playing.
    if let Some((sink, done)) = current.take() {
        sink.stop();
        done.send(Ok(PlaybackOutcome::Stopped)).ok();
    }
}

/// Decode a clip, MP3 first since that is what the service sends, then the
/// generic container probe before giving up.
fn decode_clip(audio: Vec<u8>) -> Result<Decoder<Cursor<Vec<u8>>>, PlaybackError> {
    let fallback = audio.clone();
    match Decoder::new_mp3(Cursor::new(audio)) {
        Ok(source) => Ok(source),
        Err(mp3_err) => Decoder::new(Cursor::new(fallback))
            .map_err(|probe_err| PlaybackError::Decode(format!("{mp3_err}; {probe_err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_clip() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut data = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut data), spec).unwrap();
            for n in 0..800 {
                let t = n as f32 / 8_000.0;
                let sample = (t * 440.0 * 2.0 * std::f32::consts::PI).sin();
                writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        data
    }

    #[test]
    fn test_decode_falls_back_to_container_probe() {
        // Not an MP3, so the first attempt fails and the probe catches it.
        let decoded = decode_clip(wav_clip());
        assert!(decoded.is_ok());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode_clip(vec![0u8; 128]).err().unwrap();
        assert!(matches!(err, PlaybackError::Decode(_)));
    }
}
