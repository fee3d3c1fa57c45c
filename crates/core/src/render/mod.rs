//! Display frame composition: which lines are shown, how much of the active
//! line is revealed and how each line is styled.

mod typewriter;

use serde::Serialize;

use crate::{
    analysis::FeatureSnapshot,
    lyrics::LyricTable,
    mapping::{line_style, LineStyle},
    sync::{RenderWindow, VisualState},
    timeline::PlaybackState,
};

pub use typewriter::{base_delay_ms, char_delay_ms, energy_multiplier, Typewriter};

/// Shown before anything has been played.
pub const IDLE_PROMPT: &str = "Press play to start";

/// One line as it should appear on screen this frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayLine {
    pub index: usize,
    /// Text to draw. A prefix of `full_text` while the reveal runs.
    pub text: String,
    pub full_text: &'static str,
    pub state: VisualState,
    pub style: LineStyle,
    pub animating: bool,
}

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayFrame {
    pub lines: Vec<DisplayLine>,
    pub prompt: Option<&'static str>,
    pub diagnostics: Option<String>,
    pub features: FeatureSnapshot,
}

impl DisplayFrame {
    /// Frame shown before playback ever started: prompt only, nothing
    /// highlighted.
    pub fn idle(features: FeatureSnapshot) -> Self {
        Self {
            lines: Vec::new(),
            prompt: Some(IDLE_PROMPT),
            diagnostics: None,
            features,
        }
    }

    pub fn current(&self) -> Option<&DisplayLine> {
        self.lines
            .iter()
            .find(|line| line.state == VisualState::Current)
    }

    pub fn is_idle(&self) -> bool {
        self.prompt.is_some()
    }
}

/// Status text shown while playing.
pub fn diagnostics_line(features: &FeatureSnapshot) -> String {
    format!(
        "Tempo: {} BPM | Energy: {}",
        features.tempo,
        features.energy.round() as i64
    )
}

/// Builds the frame for `window`. Only the current line uses the
/// typewriter's partial text, and only while playing.
pub fn compose(
    table: &LyricTable,
    window: &RenderWindow,
    playback: &PlaybackState,
    features: FeatureSnapshot,
    typewriter: &Typewriter,
) -> DisplayFrame {
    let lines = window
        .lines(table)
        .map(|(index, line, state)| {
            let animating = playback.is_playing
                && state == VisualState::Current
                && typewriter.active_index() == Some(index);
            let text = if animating {
                typewriter.displayed().to_string()
            } else {
                line.text.to_string()
            };

            DisplayLine {
                index,
                text,
                full_text: line.text,
                state,
                style: line_style(state, &features, playback.is_playing),
                animating,
            }
        })
        .collect();

    DisplayFrame {
        lines,
        prompt: None,
        diagnostics: playback.is_playing.then(|| diagnostics_line(&features)),
        features,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{config::SyncConfig, sync::LyricSynchronizer};

    fn window_at(time: f32) -> (LyricTable, RenderWindow) {
        let sync = LyricSynchronizer::new(LyricTable::builtin(), SyncConfig::default());
        (*sync.table(), sync.window(time, 120))
    }

    #[test]
    fn only_current_line_is_partial_while_playing() {
        let (table, window) = window_at(42.0);
        let mut typewriter = Typewriter::default();
        let current = table.get(window.current_index).unwrap();
        typewriter.sync(window.current_index, current.text, 120, 100.0, Duration::ZERO);

        let frame = compose(
            &table,
            &window,
            &PlaybackState::new(42.0, true),
            FeatureSnapshot::default(),
            &typewriter,
        );

        assert_eq!(frame.lines.len(), 5);
        let active = frame.current().unwrap();
        assert!(active.animating);
        assert_eq!(active.text, "");
        assert!(frame
            .lines
            .iter()
            .filter(|line| line.state != VisualState::Current)
            .all(|line| line.text == line.full_text));
        assert_eq!(frame.diagnostics.as_deref(), Some("Tempo: 120 BPM | Energy: 0"));
    }

    #[test]
    fn paused_frame_shows_full_text_without_diagnostics() {
        let (table, window) = window_at(42.0);
        let frame = compose(
            &table,
            &window,
            &PlaybackState::new(42.0, false),
            FeatureSnapshot::default(),
            &Typewriter::default(),
        );

        let active = frame.current().unwrap();
        assert!(!active.animating);
        assert_eq!(active.text, "Ikaw ang ilaw sa dilim ko");
        assert!(frame.diagnostics.is_none());
        assert!(!frame.is_idle());
    }

    #[test]
    fn idle_frame_highlights_nothing() {
        let frame = DisplayFrame::idle(FeatureSnapshot::default());
        assert!(frame.current().is_none());
        assert_eq!(frame.prompt, Some(IDLE_PROMPT));
    }

    #[test]
    fn diagnostics_round_energy() {
        let features = FeatureSnapshot {
            tempo: 128,
            energy: 131.6,
            beat_detected: true,
        };
        assert_eq!(diagnostics_line(&features), "Tempo: 128 BPM | Energy: 132");
    }
}
