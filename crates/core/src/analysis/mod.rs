//! Live tempo, energy and beat extraction.

mod beat;
mod spectrum;

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{audio::AudioTap, config::AnalysisConfig, Result};

pub use beat::{BeatOutcome, BeatTracker};
pub use spectrum::{band_energy, bin_index, ByteSpectrum};

/// Latest published audio features. Replaced whole on every analysed frame
/// so readers never observe a half-updated triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    /// Estimated tempo in beats per minute.
    pub tempo: u32,
    /// Smoothed bass-band magnitude on the 0-255 byte scale.
    pub energy: f32,
    /// Short pulse raised after every detected beat.
    pub beat_detected: bool,
}

impl FeatureSnapshot {
    pub fn with_tempo(tempo: u32) -> Self {
        Self {
            tempo,
            energy: 0.0,
            beat_detected: false,
        }
    }
}

impl Default for FeatureSnapshot {
    fn default() -> Self {
        Self::with_tempo(AnalysisConfig::default().default_tempo_bpm)
    }
}

/// Converts successive spectrum frames into a [`FeatureSnapshot`].
pub struct FeatureExtractor {
    config: AnalysisConfig,
    spectrum: ByteSpectrum,
    beats: BeatTracker,
    frame: Vec<f32>,
    snapshot: FeatureSnapshot,
}

impl FeatureExtractor {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        Self::with_tempo(config, config.default_tempo_bpm)
    }

    /// Creates an extractor seeded with an already known tempo.
    pub fn with_tempo(config: &AnalysisConfig, tempo: u32) -> Result<Self> {
        Ok(Self {
            spectrum: ByteSpectrum::new(config)?,
            beats: BeatTracker::with_tempo(config, tempo),
            frame: vec![0.0; config.fft_size],
            snapshot: FeatureSnapshot::with_tempo(tempo),
            config: config.clone(),
        })
    }

    /// Returns the features published by the most recent frame.
    pub fn snapshot(&self) -> FeatureSnapshot {
        self.snapshot
    }

    /// Analyses one display frame worth of audio pulled from `tap`.
    ///
    /// When the tap cannot supply a full transform window the frame is
    /// skipped and the previous energy and tempo are kept; only the beat
    /// pulse keeps expiring.
    pub fn analyse_tap(&mut self, tap: &AudioTap, now: Duration) -> Result<FeatureSnapshot> {
        if !tap.latest(&mut self.frame)? {
            self.snapshot.beat_detected = self.beats.beat_detected(now);
            return Ok(self.snapshot);
        }

        let sample_rate = tap.sample_rate();
        let frame = std::mem::take(&mut self.frame);
        let result = self.analyse_samples(&frame, sample_rate, now);
        self.frame = frame;
        result
    }

    /// Analyses exactly `fft_size` samples captured at `sample_rate`.
    pub fn analyse_samples(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        now: Duration,
    ) -> Result<FeatureSnapshot> {
        let bytes = self.spectrum.process(samples)?;
        let energy = band_energy(
            bytes,
            self.config.fft_size,
            sample_rate,
            self.config.bass_low_hz,
            self.config.bass_high_hz,
        );

        self.beats.observe(energy, now);
        self.snapshot = FeatureSnapshot {
            tempo: self.beats.tempo(),
            energy,
            beat_detected: self.beats.beat_detected(now),
        };

        Ok(self.snapshot)
    }
}

impl fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("spectrum", &self.spectrum)
            .field("beats", &self.beats.beat_count())
            .field("snapshot", &self.snapshot)
            .finish()
    }
}
