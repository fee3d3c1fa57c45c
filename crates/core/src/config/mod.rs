use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{KaraokeError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub sync: SyncConfig,
    pub typewriter: TypewriterConfig,
    pub playback: PlaybackConfig,
}

impl AppConfig {
    /// Loads a JSON configuration file. Missing sections and fields fall back
    /// to their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot operate with.
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.sync.validate()?;
        self.typewriter.validate()
    }
}

/// Settings for the live feature extractor.
///
/// Threshold and debounce are tuned to the bundled track and are not
/// calibrated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub fft_size: usize,
    pub smoothing_time_constant: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
    pub bass_low_hz: f32,
    pub bass_high_hz: f32,
    pub energy_threshold: f32,
    pub debounce_ms: u64,
    pub beat_pulse_ms: u64,
    pub beat_history: usize,
    /// Tempo is only estimated once the history holds more than this many
    /// beats.
    pub min_beats_for_tempo: usize,
    pub min_tempo_bpm: u32,
    pub max_tempo_bpm: u32,
    pub default_tempo_bpm: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            smoothing_time_constant: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
            bass_low_hz: 20.0,
            bass_high_hz: 200.0,
            energy_threshold: 120.0,
            debounce_ms: 300,
            beat_pulse_ms: 100,
            beat_history: 8,
            min_beats_for_tempo: 4,
            min_tempo_bpm: 60,
            max_tempo_bpm: 200,
            default_tempo_bpm: 120,
        }
    }
}

impl AnalysisConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn beat_pulse(&self) -> Duration {
        Duration::from_millis(self.beat_pulse_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(KaraokeError::InvalidInput(
                "fft_size must be a power of two of at least 32",
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing_time_constant) {
            return Err(KaraokeError::InvalidInput(
                "smoothing_time_constant must lie in [0, 1)",
            ));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(KaraokeError::InvalidInput(
                "min_decibels must be below max_decibels",
            ));
        }
        if self.bass_low_hz < 0.0 || self.bass_low_hz >= self.bass_high_hz {
            return Err(KaraokeError::InvalidInput(
                "bass band must be a non-empty, non-negative frequency range",
            ));
        }
        if self.beat_history < 2 {
            return Err(KaraokeError::InvalidInput(
                "beat_history must keep at least two beats",
            ));
        }
        if self.min_tempo_bpm >= self.max_tempo_bpm {
            return Err(KaraokeError::InvalidInput(
                "min_tempo_bpm must be below max_tempo_bpm",
            ));
        }
        if self.default_tempo_bpm == 0 {
            return Err(KaraokeError::InvalidInput("default_tempo_bpm must be positive"));
        }
        Ok(())
    }
}

/// Settings for the lyric synchronizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Tempo at which no extra compensation would be applied.
    pub reference_tempo_bpm: f32,
    /// BPM difference that corresponds to one second of offset.
    pub offset_divisor: f32,
    pub min_offset_seconds: f32,
    pub max_offset_seconds: f32,
    pub lines_before: usize,
    pub lines_after: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reference_tempo_bpm: 120.0,
            offset_divisor: 200.0,
            min_offset_seconds: 0.1,
            max_offset_seconds: 0.5,
            lines_before: 2,
            lines_after: 2,
        }
    }
}

impl SyncConfig {
    fn validate(&self) -> Result<()> {
        if self.offset_divisor <= 0.0 {
            return Err(KaraokeError::InvalidInput("offset_divisor must be positive"));
        }
        if self.min_offset_seconds > self.max_offset_seconds {
            return Err(KaraokeError::InvalidInput(
                "min_offset_seconds must not exceed max_offset_seconds",
            ));
        }
        Ok(())
    }
}

/// Settings for the character-by-character reveal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypewriterConfig {
    pub lead_in_ms: u64,
    /// Subdivisions per beat used for the base character delay.
    pub subdivisions_per_beat: f32,
    pub energy_divisor: f32,
    pub min_energy_multiplier: f32,
    pub max_energy_multiplier: f32,
    pub min_char_delay_ms: f32,
    pub max_char_delay_ms: f32,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            lead_in_ms: 150,
            subdivisions_per_beat: 4.0,
            energy_divisor: 100.0,
            min_energy_multiplier: 0.5,
            max_energy_multiplier: 1.5,
            min_char_delay_ms: 20.0,
            max_char_delay_ms: 80.0,
        }
    }
}

impl TypewriterConfig {
    pub fn lead_in(&self) -> Duration {
        Duration::from_millis(self.lead_in_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.subdivisions_per_beat <= 0.0 || self.energy_divisor <= 0.0 {
            return Err(KaraokeError::InvalidInput(
                "typewriter divisors must be positive",
            ));
        }
        if self.min_energy_multiplier > self.max_energy_multiplier {
            return Err(KaraokeError::InvalidInput(
                "min_energy_multiplier must not exceed max_energy_multiplier",
            ));
        }
        if self.min_char_delay_ms <= 0.0 || self.min_char_delay_ms > self.max_char_delay_ms {
            return Err(KaraokeError::InvalidInput(
                "character delay bounds must be positive and ordered",
            ));
        }
        Ok(())
    }
}

/// Settings for starting the playback collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub retry_delay_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { retry_delay_ms: 200 }
    }
}

impl PlaybackConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config =
            AppConfig::from_json_str(r#"{ "analysis": { "energy_threshold": 90.0 } }"#).unwrap();

        assert_eq!(config.analysis.energy_threshold, 90.0);
        assert_eq!(config.analysis.debounce_ms, 300);
        assert_eq!(config.typewriter.lead_in_ms, 150);
        assert_eq!(config.sync, SyncConfig::default());
    }

    #[test]
    fn rejects_inverted_tempo_band() {
        let err = AppConfig::from_json_str(
            r#"{ "analysis": { "min_tempo_bpm": 200, "max_tempo_bpm": 60 } }"#,
        )
        .unwrap_err();

        assert!(matches!(err, KaraokeError::InvalidInput(_)));
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = AppConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, KaraokeError::Json(_)));
    }
}
