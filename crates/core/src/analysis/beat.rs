use std::{collections::VecDeque, time::Duration};

use crate::{config::AnalysisConfig, timeline::Timer};

/// What a single [`BeatTracker::observe`] call decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeatOutcome {
    /// Energy stayed at or below the threshold.
    Quiet,
    /// Energy was high but the previous beat is too recent.
    Debounced,
    /// A new beat was recorded.
    Beat,
}

/// Debounced threshold-crossing beat detector with a rolling tempo estimate.
#[derive(Debug, Clone)]
pub struct BeatTracker {
    threshold: f32,
    debounce: Duration,
    pulse_length: Duration,
    capacity: usize,
    min_beats: usize,
    min_tempo: u32,
    max_tempo: u32,
    history: VecDeque<Duration>,
    last_beat: Option<Duration>,
    tempo: u32,
    pulse: Timer,
}

impl BeatTracker {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self::with_tempo(config, config.default_tempo_bpm)
    }

    /// Creates a tracker that starts from a previously published tempo.
    pub fn with_tempo(config: &AnalysisConfig, tempo: u32) -> Self {
        Self {
            threshold: config.energy_threshold,
            debounce: config.debounce(),
            pulse_length: config.beat_pulse(),
            capacity: config.beat_history,
            min_beats: config.min_beats_for_tempo,
            min_tempo: config.min_tempo_bpm,
            max_tempo: config.max_tempo_bpm,
            history: VecDeque::with_capacity(config.beat_history + 1),
            last_beat: None,
            tempo,
            pulse: Timer::new(),
        }
    }

    /// Feeds one bass energy reading taken at `now`.
    pub fn observe(&mut self, energy: f32, now: Duration) -> BeatOutcome {
        self.expire_pulse(now);

        if energy <= self.threshold {
            return BeatOutcome::Quiet;
        }

        if let Some(last) = self.last_beat {
            if now.saturating_sub(last) < self.debounce {
                return BeatOutcome::Debounced;
            }
        }

        self.last_beat = Some(now);
        self.history.push_back(now);
        if self.history.len() > self.capacity {
            self.history.pop_front();
        }
        self.pulse.arm(now, self.pulse_length);
        tracing::debug!(at_ms = now.as_millis() as u64, energy, "beat detected");

        self.update_tempo();
        BeatOutcome::Beat
    }

    /// Current tempo estimate in BPM.
    pub fn tempo(&self) -> u32 {
        self.tempo
    }

    /// Whether the pulse raised by the latest beat is still active at `now`.
    pub fn beat_detected(&mut self, now: Duration) -> bool {
        self.expire_pulse(now);
        self.pulse.is_armed()
    }

    pub fn beat_count(&self) -> usize {
        self.history.len()
    }

    fn expire_pulse(&mut self, now: Duration) {
        self.pulse.fire_if_due(now);
    }

    fn update_tempo(&mut self) {
        if self.history.len() <= self.min_beats {
            return;
        }

        let intervals: Vec<f64> = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(earlier, later)| later.saturating_sub(*earlier).as_secs_f64() * 1000.0)
            .collect();
        let average_ms = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if average_ms <= 0.0 {
            return;
        }

        let estimate = (60_000.0 / average_ms).round();
        if estimate > f64::from(self.min_tempo) && estimate < f64::from(self.max_tempo) {
            let estimate = estimate as u32;
            if estimate != self.tempo {
                tracing::debug!(from = self.tempo, to = estimate, "tempo updated");
            }
            self.tempo = estimate;
        } else {
            tracing::warn!(estimate, "discarding out of range tempo estimate");
        }
    }
}
