use std::{
    collections::VecDeque,
    f32::consts::PI,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use crate::{KaraokeError, Result};

/// Samples kept for analysis when no explicit capacity is requested.
const DEFAULT_TAP_CAPACITY: usize = 8192;

/// Anything that can hand out a read-only tap on the audio being played.
pub trait TapProvider {
    /// Opens a new tap. Fails with [`KaraokeError::AnalysisUnavailable`] when
    /// the environment does not allow listening to the output.
    fn open(&self) -> Result<AudioTap>;
}

/// Output side of the playback path. Whatever plays the track forwards every
/// block it renders through [`write`](Self::write); the samples are copied
/// into the tap buffer and never modified.
#[derive(Debug, Clone)]
pub struct SharedOutput {
    sample_rate: u32,
    shared: Arc<Mutex<TapBuffer>>,
}

impl SharedOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self::with_capacity(sample_rate, DEFAULT_TAP_CAPACITY)
    }

    pub fn with_capacity(sample_rate: u32, capacity: usize) -> Self {
        Self {
            sample_rate,
            shared: Arc::new(Mutex::new(TapBuffer::new(capacity))),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Attaches a tap. Samples are only buffered while at least one tap is
    /// open.
    pub fn open_tap(&self) -> AudioTap {
        if let Ok(mut buffer) = self.shared.lock() {
            buffer.taps += 1;
        }
        AudioTap {
            sample_rate: self.sample_rate,
            shared: self.shared.clone(),
        }
    }

    /// Forwards a rendered block to any open tap.
    pub fn write(&self, samples: &[f32]) -> Result<()> {
        let mut buffer = lock(&self.shared)?;
        if buffer.taps == 0 {
            return Ok(());
        }
        buffer.push(samples);
        Ok(())
    }

    /// Number of taps currently attached.
    pub fn tap_count(&self) -> usize {
        self.shared.lock().map(|buffer| buffer.taps).unwrap_or(0)
    }
}

impl TapProvider for SharedOutput {
    fn open(&self) -> Result<AudioTap> {
        Ok(self.open_tap())
    }
}

/// Provider for environments where the output cannot be observed.
#[derive(Debug, Clone)]
pub struct NoTap {
    reason: String,
}

impl NoTap {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl TapProvider for NoTap {
    fn open(&self) -> Result<AudioTap> {
        Err(KaraokeError::AnalysisUnavailable(self.reason.clone()))
    }
}

/// Read-only view over the most recent output samples. Dropping the tap
/// detaches it; once the last tap is gone the buffer is released.
#[derive(Debug)]
pub struct AudioTap {
    sample_rate: u32,
    shared: Arc<Mutex<TapBuffer>>,
}

impl AudioTap {
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Copies the newest `out.len()` samples into `out`. Returns `false`
    /// without touching `out` when not enough audio has been buffered yet.
    pub fn latest(&self, out: &mut [f32]) -> Result<bool> {
        let buffer = lock(&self.shared)?;
        Ok(buffer.copy_latest(out))
    }
}

impl Drop for AudioTap {
    fn drop(&mut self) {
        if let Ok(mut buffer) = self.shared.lock() {
            buffer.taps = buffer.taps.saturating_sub(1);
            if buffer.taps == 0 {
                buffer.samples = VecDeque::new();
            }
        }
    }
}

#[derive(Debug)]
struct TapBuffer {
    capacity: usize,
    samples: VecDeque<f32>,
    taps: usize,
}

impl TapBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::new(),
            taps: 0,
        }
    }

    fn push(&mut self, samples: &[f32]) {
        let incoming = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };
        let overflow = (self.samples.len() + incoming.len()).saturating_sub(self.capacity);
        self.samples.drain(..overflow);
        self.samples.extend(incoming.iter().copied());
    }

    fn copy_latest(&self, out: &mut [f32]) -> bool {
        if out.is_empty() || self.samples.len() < out.len() {
            return false;
        }
        let start = self.samples.len() - out.len();
        for (slot, sample) in out.iter_mut().zip(self.samples.range(start..)) {
            *slot = *sample;
        }
        true
    }
}

fn lock(shared: &Arc<Mutex<TapBuffer>>) -> Result<MutexGuard<'_, TapBuffer>> {
    shared
        .lock()
        .map_err(|_| KaraokeError::msg("audio tap buffer has been poisoned"))
}

/// Mono PCM producer used to drive playback.
pub trait SignalSource {
    fn sample_rate(&self) -> u32;

    /// Fills `out` and returns how many samples were written. Fewer than
    /// `out.len()` means the source is exhausted.
    fn fill(&mut self, out: &mut [f32]) -> usize;

    /// Moves the read position to `sample`, counted from the start of the
    /// track. Positions past the end leave the source exhausted.
    fn seek(&mut self, sample: u64);

    fn rewind(&mut self) {
        self.seek(0);
    }
}

/// Synthetic kick drum loop at a fixed tempo, with a quiet pad underneath.
#[derive(Debug, Clone)]
pub struct KickPattern {
    sample_rate: u32,
    samples_per_beat: f32,
    position: u64,
    amplitude: f32,
    decay_seconds: f32,
}

impl KickPattern {
    pub fn new(bpm: f32, sample_rate: u32) -> Self {
        let bpm = bpm.max(1.0);
        Self {
            sample_rate,
            samples_per_beat: sample_rate as f32 * 60.0 / bpm,
            position: 0,
            amplitude: 0.8,
            decay_seconds: 0.015,
        }
    }

    fn sample_at(&self, position: u64) -> f32 {
        let rate = self.sample_rate as f32;
        let since_beat = (position as f32 % self.samples_per_beat) / rate;
        let kick = self.amplitude
            * (-since_beat / self.decay_seconds).exp()
            * (2.0 * PI * 55.0 * since_beat).sin();
        let pad = 0.02 * (2.0 * PI * 440.0 * position as f32 / rate).sin();
        kick + pad
    }
}

impl SignalSource for KickPattern {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fill(&mut self, out: &mut [f32]) -> usize {
        for slot in out.iter_mut() {
            *slot = self.sample_at(self.position);
            self.position += 1;
        }
        out.len()
    }

    fn seek(&mut self, sample: u64) {
        self.position = sample;
    }
}

/// Transport that actually renders the track.
pub trait PlaybackBackend {
    fn play(&mut self) -> Result<()>;

    /// Reloads the media before a retry.
    fn reload(&mut self) -> Result<()>;
}

/// Starts playback, retrying once after reloading the media. A second
/// failure is reported as [`KaraokeError::PlaybackFailed`], whose
/// [`user_message`](KaraokeError::user_message) asks the listener to retry.
///
/// Blocks the calling thread for `retry_delay` before the retry, so call it
/// before the frame loop starts.
pub fn start_playback<B>(backend: &mut B, retry_delay: Duration) -> Result<()>
where
    B: PlaybackBackend + ?Sized,
{
    let first = match backend.play() {
        Ok(()) => {
            tracing::info!("playback started");
            return Ok(());
        }
        Err(err) => err,
    };

    tracing::warn!(error = %first, "playback failed to start, reloading and retrying");
    if let Err(err) = backend.reload() {
        tracing::warn!(error = %err, "reload before retry failed");
    }
    if !retry_delay.is_zero() {
        std::thread::sleep(retry_delay);
    }

    match backend.play() {
        Ok(()) => {
            tracing::info!("playback started after reload");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, "playback retry failed");
            Err(KaraokeError::PlaybackFailed {
                attempts: 2,
                reason: err.to_string(),
            })
        }
    }
}
