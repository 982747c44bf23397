//! Module for managing audio recording. There can only be one active
//! recording at a time. The cpal stream is not `Send`, so the capture runs on
//! its own thread and the handle talks to it over channels; that lets the
//! handle live inside async state and cross await points.

use std::io::{self, Cursor, Seek, SeekFrom, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample};
use hound::WavWriter;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum RecorderError {
    /// generic anyhow error
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
    /// No recording device available
    #[error("no input device available")]
    NoInputDevice,
    /// Device exists but cannot be opened
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    /// Sample format not supported
    #[error("sample format not supported: {0}")]
    SampleFormatNotSupported(String),
    /// A second session was requested while one is open
    #[error("a recording is already in progress")]
    AlreadyRecording,
    /// Stop was requested with nothing recording
    #[error("no recording in progress")]
    NoActiveRecording,
}

type Result<T> = std::result::Result<T, RecorderError>;
type WavWriterHandle = Arc<Mutex<Option<WavWriter<MemoryWriter>>>>;

/// Source of microphone recordings.
pub trait AudioInput: Send + Sync {
    /// Open a recording session. At most one may be active per source.
    fn start(&self) -> Result<Box<dyn ActiveRecording>>;
}

/// An in-progress capture. Dropping the handle discards the audio.
pub trait ActiveRecording: Send {
    /// Stop the capture, release the device, and return the finalized bytes.
    fn finish(&mut self) -> Result<Recording>;
}

/// A finalized in-memory WAV recording.
#[derive(Debug, Clone)]
pub struct Recording {
    data: Vec<u8>,
    duration: Duration,
    sample_rate: u32,
    channels: u16,
}

impl Recording {
    pub fn new(data: Vec<u8>, duration: Duration, sample_rate: u32, channels: u16) -> Self {
        Self {
            data,
            duration,
            sample_rate,
            channels,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }
}

/// A cheaply cloneable handle to the inner data that is being recorded. The
/// finalize method for the wav writer does not return the inner data, so we
/// store it behind an Arc<Mutex> to allow for cheap cloning and access to the
/// inner data.
#[derive(Clone)]
struct MemoryWriter {
    inner: Arc<Mutex<Cursor<Vec<u8>>>>,
}

impl MemoryWriter {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Cursor::new(Vec::with_capacity(8 * 1024)))),
        }
    }

    fn try_into_inner(self) -> Result<Vec<u8>> {
        // Attempt to own the inner arc
        let owned = Arc::try_unwrap(self.inner).map_err(|_| {
            RecorderError::Anyhow(anyhow!("Failed to unwrap inner Arc in MemoryWriter"))
        })?;
        // Extract the cursor, then the Vec
        Ok(owned.into_inner().into_inner())
    }
}

impl Seek for MemoryWriter {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.lock().seek(pos)
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

/// Records from the default input device.
pub struct Recorder {
    active: Arc<AtomicBool>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioInput for Recorder {
    fn start(&self) -> Result<Box<dyn ActiveRecording>> {
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(RecorderError::AlreadyRecording);
        }

        let started = match start_capture_thread() {
            Ok(started) => started,
            Err(e) => {
                self.active.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        Ok(Box::new(RecordingHandle {
            stop_tx: Some(started.stop_tx),
            data_rx: started.data_rx,
            started_at: Instant::now(),
            sample_rate: started.sample_rate,
            channels: started.channels,
            active: self.active.clone(),
        }))
    }
}

/// Handle to the active recording. Dropping it discards the audio; you must
/// call `finish` to receive the data.
pub struct RecordingHandle {
    // Presence of the sender indicates the recording has not been finalized.
    stop_tx: Option<mpsc::Sender<()>>,
    data_rx: mpsc::Receiver<Result<Vec<u8>>>,
    started_at: Instant,
    sample_rate: u32,
    channels: u16,
    active: Arc<AtomicBool>,
}

impl ActiveRecording for RecordingHandle {
    fn finish(&mut self) -> Result<Recording> {
        let Some(stop_tx) = self.stop_tx.take() else {
            return Err(RecorderError::NoActiveRecording);
        };
        let duration = self.started_at.elapsed();
        info!(duration = ?duration, "Ending recording");

        stop_tx.send(()).ok();
        let data = self
            .data_rx
            .recv()
            .map_err(|_| anyhow!("capture thread died before delivering audio"))?;
        self.active.store(false, Ordering::SeqCst);

        Ok(Recording::new(
            data?,
            duration,
            self.sample_rate,
            self.channels,
        ))
    }
}

impl Drop for RecordingHandle {
    fn drop(&mut self) {
        // Dropping the sender unblocks the capture thread; the audio is
        // discarded.
        if self.stop_tx.take().is_some() {
            self.active.store(false, Ordering::SeqCst);
        }
    }
}

struct CaptureStarted {
    stop_tx: mpsc::Sender<()>,
    data_rx: mpsc::Receiver<Result<Vec<u8>>>,
    sample_rate: u32,
    channels: u16,
}

fn start_capture_thread() -> Result<CaptureStarted> {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let (data_tx, data_rx) = mpsc::channel();
    let (ready_tx, ready_rx) = mpsc::channel();

    thread::Builder::new()
        .name("dubhashi-capture".into())
        .spawn(move || capture_thread(stop_rx, data_tx, ready_tx))
        .map_err(|e| anyhow!("failed to spawn capture thread: {e}"))?;

    match ready_rx.recv() {
        Ok(Ok((sample_rate, channels))) => Ok(CaptureStarted {
            stop_tx,
            data_rx,
            sample_rate,
            channels,
        }),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(RecorderError::Anyhow(anyhow!(
            "capture thread exited before reporting readiness"
        ))),
    }
}

fn capture_thread(
    stop_rx: mpsc::Receiver<()>,
    data_tx: mpsc::Sender<Result<Vec<u8>>>,
    ready_tx: mpsc::Sender<Result<(u32, u16)>>,
) {
    let (stream, writer, buffer, sample_rate, channels) = match open_stream() {
        Ok(opened) => opened,
        Err(e) => {
            ready_tx.send(Err(e)).ok();
            return;
        }
    };
    ready_tx.send(Ok((sample_rate, channels))).ok();

    // Block until the handle asks us to stop or is dropped.
    let _ = stop_rx.recv();

    stream.pause().ok();
    drop(stream);
    data_tx.send(finalize(writer, buffer)).ok();
}

#[allow(clippy::type_complexity)]
fn open_stream() -> Result<(cpal::Stream, WavWriterHandle, MemoryWriter, u32, u16)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(RecorderError::NoInputDevice)?;
    let config = preferred_input_config(&device)?;

    info!(
        device_name = %device.name().unwrap_or_else(|_| "<unknown>".into()),
        config = ?config,
        "Recording from device"
    );

    let spec = wav_spec_from_config(&config);

    let buffer = MemoryWriter::new();
    let writer =
        WavWriter::new(buffer.clone(), spec).map_err(|e| RecorderError::Anyhow(e.into()))?;
    let writer = Arc::new(Mutex::new(Some(writer)));

    // The input stream invokes the data callback on cpal's own thread.
    let writer_2 = writer.clone();

    let err_fn = move |err| {
        error!("an error occurred on stream: {}", err);
    };

    let sample_rate = config.sample_rate().0;
    let channels = config.channels();

    let stream = match config.sample_format() {
        cpal::SampleFormat::I8 => device.build_input_stream(
            &config.into(),
            move |data, _: &_| write_input_data::<i8, i8>(data, &writer_2),
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config.into(),
            move |data, _: &_| write_input_data::<i16, i16>(data, &writer_2),
            err_fn,
            None,
        ),
        cpal::SampleFormat::I32 => device.build_input_stream(
            &config.into(),
            move |data, _: &_| write_input_data::<i32, i32>(data, &writer_2),
            err_fn,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config.into(),
            move |data, _: &_| write_input_data::<f32, f32>(data, &writer_2),
            err_fn,
            None,
        ),
        sample_format => {
            return Err(RecorderError::SampleFormatNotSupported(format!(
                "{:?}",
                sample_format
            )));
        }
    }
    .map_err(map_build_stream_error)?;

    stream
        .play()
        .map_err(|_| anyhow!("failed to start stream"))?;

    Ok((stream, writer, buffer, sample_rate, channels))
}

fn finalize(writer: WavWriterHandle, buffer: MemoryWriter) -> Result<Vec<u8>> {
    // Finalize the writer so it writes the proper framing information.
    writer
        .lock()
        .take()
        .ok_or_else(|| anyhow!("recording already finalized"))?
        .finalize()
        .map_err(|e| RecorderError::Anyhow(anyhow!("Failed to finalize writer: {}", e)))?;
    // Now that its ended, we can grab out the actual data and return it.
    buffer.try_into_inner()
}

fn map_build_stream_error(err: cpal::BuildStreamError) -> RecorderError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            RecorderError::PermissionDenied("input device is not available".into())
        }
        other => RecorderError::Anyhow(anyhow!(other)),
    }
}

/// The speech endpoint is fed 44.1kHz stereo WAV; prefer that shape when the
/// device supports it, otherwise take the device default.
fn preferred_input_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig> {
    if let Ok(configs) = device.supported_input_configs() {
        for range in configs {
            if range.channels() == 2
                && range.min_sample_rate().0 <= 44_100
                && range.max_sample_rate().0 >= 44_100
            {
                return Ok(range.with_sample_rate(cpal::SampleRate(44_100)));
            }
        }
    }
    device
        .default_input_config()
        .map_err(|e| RecorderError::PermissionDenied(e.to_string()))
}

fn wav_spec_from_config(config: &cpal::SupportedStreamConfig) -> hound::WavSpec {
    hound::WavSpec {
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        bits_per_sample: (config.sample_format().sample_size() * 8) as _,
        sample_format: sample_format(config.sample_format()),
    }
}

fn sample_format(format: cpal::SampleFormat) -> hound::SampleFormat {
    if format.is_float() {
        hound::SampleFormat::Float
    } else {
        hound::SampleFormat::Int
    }
}

fn write_input_data<T, U>(input: &[T], writer: &WavWriterHandle)
where
    T: Sample,
    U: Sample + hound::Sample + FromSample<T>,
{
    if let Some(mut guard) = writer.try_lock() {
        if let Some(writer) = guard.as_mut() {
            for &sample in input.iter() {
                let sample: U = U::from_sample(sample);
                writer.write_sample(sample).ok();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_writer_roundtrip() {
        let buffer = MemoryWriter::new();
        let mut writer = buffer.clone();
        writer.write_all(b"abcdef").unwrap();
        writer.seek(SeekFrom::Start(0)).unwrap();
        writer.write_all(b"xy").unwrap();
        drop(writer);

        let data = buffer.try_into_inner().unwrap();
        assert_eq!(&data, b"xycdef");
    }

    #[test]
    fn test_recording_accessors() {
        let recording = Recording::new(vec![1, 2, 3], Duration::from_secs(2), 44_100, 2);
        assert_eq!(recording.data(), &[1, 2, 3]);
        assert_eq!(recording.duration(), Duration::from_secs(2));
        assert_eq!(recording.sample_rate(), 44_100);
        assert_eq!(recording.channels(), 2);
        assert_eq!(recording.into_data(), vec![1, 2, 3]);
    }
}
