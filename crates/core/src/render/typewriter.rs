use std::time::Duration;

use crate::{config::TypewriterConfig, timeline::Timer};

/// Per-character delay derived from tempo alone: one character per
/// subdivision of a beat.
pub fn base_delay_ms(tempo: u32, config: &TypewriterConfig) -> f32 {
    60_000.0 / (tempo.max(1) as f32 * config.subdivisions_per_beat)
}

/// Energy scaling applied to the base delay.
pub fn energy_multiplier(energy: f32, config: &TypewriterConfig) -> f32 {
    (energy.max(0.0) / config.energy_divisor)
        .clamp(config.min_energy_multiplier, config.max_energy_multiplier)
}

/// Delay between two revealed characters, bounded so the animation stays
/// visible without flickering.
pub fn char_delay_ms(tempo: u32, energy: f32, config: &TypewriterConfig) -> f32 {
    (base_delay_ms(tempo, config) * energy_multiplier(energy, config))
        .clamp(config.min_char_delay_ms, config.max_char_delay_ms)
}

/// Character-by-character reveal of the active line.
///
/// The owner drives it by calling [`sync`](Self::sync) or
/// [`tick`](Self::tick) every frame; nothing runs between calls.
#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    config: TypewriterConfig,
    reveal: Option<Reveal>,
}

#[derive(Debug, Clone)]
struct Reveal {
    index: usize,
    text: String,
    char_count: usize,
    delay_ms: f64,
    lead_in: Timer,
    started_at: Option<Duration>,
    shown: usize,
}

impl Typewriter {
    pub fn new(config: TypewriterConfig) -> Self {
        Self {
            config,
            reveal: None,
        }
    }

    /// Makes `text` (line `index`) the animated line and advances the reveal
    /// to `now`. A different line or text restarts from empty; the same line
    /// keeps its progress and speed.
    pub fn sync(&mut self, index: usize, text: &str, tempo: u32, energy: f32, now: Duration) {
        let same_line = self
            .reveal
            .as_ref()
            .map(|reveal| reveal.index == index && reveal.text == text)
            .unwrap_or(false);

        if !same_line {
            let delay_ms = f64::from(char_delay_ms(tempo, energy, &self.config));
            let mut lead_in = Timer::new();
            lead_in.arm(now, self.config.lead_in());
            self.reveal = Some(Reveal {
                index,
                text: text.to_string(),
                char_count: text.chars().count(),
                delay_ms,
                lead_in,
                started_at: None,
                shown: 0,
            });
        }

        self.tick(now);
    }

    /// Advances the reveal to `now`.
    pub fn tick(&mut self, now: Duration) {
        let Some(reveal) = self.reveal.as_mut() else {
            return;
        };

        if reveal.started_at.is_none() {
            let due = reveal.lead_in.due();
            if reveal.lead_in.fire_if_due(now) {
                reveal.started_at = due;
            }
        }

        if let Some(started_at) = reveal.started_at {
            let elapsed_ms = now.saturating_sub(started_at).as_secs_f64() * 1000.0;
            let ticks = ((elapsed_ms + 1e-6) / reveal.delay_ms).floor() as usize;
            reveal.shown = ticks.min(reveal.char_count);
        }
    }

    /// Cancels any in-flight reveal.
    pub fn deactivate(&mut self) {
        self.reveal = None;
    }

    pub fn is_active(&self) -> bool {
        self.reveal.is_some()
    }

    /// Index of the line being revealed, if any.
    pub fn active_index(&self) -> Option<usize> {
        self.reveal.as_ref().map(|reveal| reveal.index)
    }

    /// Text revealed so far. Always a prefix of the target text.
    pub fn displayed(&self) -> &str {
        match &self.reveal {
            Some(reveal) => prefix_chars(&reveal.text, reveal.shown),
            None => "",
        }
    }

    pub fn is_complete(&self) -> bool {
        self.reveal
            .as_ref()
            .map(|reveal| reveal.shown == reveal.char_count)
            .unwrap_or(false)
    }

    /// Delay used for the current reveal.
    pub fn char_delay_ms(&self) -> Option<f64> {
        self.reveal.as_ref().map(|reveal| reveal.delay_ms)
    }
}

fn prefix_chars(text: &str, chars: usize) -> &str {
    match text.char_indices().nth(chars) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn config() -> TypewriterConfig {
        TypewriterConfig::default()
    }

    #[test]
    fn speed_follows_tempo_and_energy() {
        let config = config();
        assert!((base_delay_ms(120, &config) - 125.0).abs() < 1e-3);
        assert_eq!(energy_multiplier(100.0, &config), 1.0);
        // 125 ms is clamped to the slowest allowed delay.
        assert_eq!(char_delay_ms(120, 100.0, &config), 80.0);
        // 60000 / 800 = 75, times 0.5.
        assert!((char_delay_ms(200, 0.0, &config) - 37.5).abs() < 1e-3);
    }

    #[test]
    fn multiplier_and_delay_stay_bounded() {
        let config = config();
        for tempo in [0, 1, 61, 120, 199, 500, u32::MAX] {
            for energy in [-5.0, 0.0, 50.0, 120.0, 255.0, 10_000.0] {
                let multiplier = energy_multiplier(energy, &config);
                let delay = char_delay_ms(tempo, energy, &config);
                assert!((0.5..=1.5).contains(&multiplier));
                assert!((20.0..=80.0).contains(&delay), "delay {delay}");
            }
        }
    }

    #[test]
    fn waits_for_lead_in_before_revealing() {
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(3, "Hello", 200, 0.0, ms(1_000));
        assert_eq!(typewriter.displayed(), "");

        typewriter.tick(ms(1_149));
        assert_eq!(typewriter.displayed(), "");

        // Delay is 37.5 ms.
        typewriter.tick(ms(1_150 + 38));
        assert_eq!(typewriter.displayed(), "H");
    }

    #[test]
    fn full_reveal_takes_lead_in_plus_one_delay_per_char() {
        let text = "Ikaw ang ilaw sa dilim ko";
        let len = text.chars().count() as u64;
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(7, text, 120, 100.0, ms(0));
        let delay = typewriter.char_delay_ms().unwrap() as u64;
        assert_eq!(delay, 80);

        let done_at = 150 + len * delay;
        typewriter.tick(ms(done_at - 1));
        assert!(!typewriter.is_complete());
        typewriter.tick(ms(done_at));
        assert!(typewriter.is_complete());
        assert_eq!(typewriter.displayed(), text);
    }

    #[test]
    fn displayed_text_is_always_a_prefix() {
        let text = "Walang hanggan…";
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(27, text, 150, 180.0, ms(0));

        for now in (0..2_000).step_by(7) {
            typewriter.tick(ms(now));
            assert!(text.starts_with(typewriter.displayed()));
        }
        assert_eq!(typewriter.displayed(), text);
    }

    #[test]
    fn changing_line_restarts_from_empty() {
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(1, "first line", 120, 100.0, ms(0));
        typewriter.tick(ms(600));
        assert!(!typewriter.displayed().is_empty());

        typewriter.sync(2, "second", 120, 100.0, ms(600));
        assert_eq!(typewriter.displayed(), "");
        typewriter.tick(ms(600 + 150 + 80));
        assert_eq!(typewriter.displayed(), "s");
    }

    #[test]
    fn same_line_keeps_progress_when_features_change() {
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(1, "steady", 120, 100.0, ms(0));
        typewriter.sync(1, "steady", 190, 250.0, ms(150 + 160));

        assert_eq!(typewriter.displayed(), "st");
        assert_eq!(typewriter.char_delay_ms(), Some(80.0));
    }

    #[test]
    fn repeated_text_on_another_line_restarts() {
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(7, "Ikaw ang ilaw sa dilim ko", 120, 100.0, ms(0));
        typewriter.tick(ms(5_000));
        assert!(typewriter.is_complete());

        typewriter.sync(17, "Ikaw ang ilaw sa dilim ko", 120, 100.0, ms(5_000));
        assert_eq!(typewriter.displayed(), "");
    }

    #[test]
    fn deactivate_cancels_reveal() {
        let mut typewriter = Typewriter::new(config());
        typewriter.sync(1, "gone", 120, 100.0, ms(0));
        typewriter.deactivate();
        typewriter.tick(ms(10_000));

        assert!(!typewriter.is_active());
        assert_eq!(typewriter.displayed(), "");
    }
}
