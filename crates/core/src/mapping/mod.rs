use serde::{Deserialize, Serialize};

use crate::{analysis::FeatureSnapshot, sync::VisualState};

/// Presentation parameters for one lyric line. Units follow CSS so a web or
/// native front end can apply them directly.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub font_size_px: f32,
    pub opacity: f32,
    /// Upward offset of the line.
    pub lift_px: f32,
    pub scale: f32,
    pub letter_spacing_px: f32,
    /// Alpha of the tight white glow.
    pub glow_inner: f32,
    /// Alpha of the wide white glow.
    pub glow_outer: f32,
    pub brightness: f32,
    /// Beat pulse animation should run this frame.
    pub pulse: bool,
}

impl LineStyle {
    const PAST: Self = Self {
        font_size_px: 24.0,
        opacity: 0.5,
        lift_px: 0.0,
        scale: 1.0,
        letter_spacing_px: 1.0,
        glow_inner: 0.0,
        glow_outer: 0.0,
        brightness: 1.0,
        pulse: false,
    };

    const FUTURE: Self = Self {
        font_size_px: 30.0,
        opacity: 0.7,
        ..Self::PAST
    };
}

/// Routes the published features to line styling.
pub fn line_style(state: VisualState, features: &FeatureSnapshot, is_playing: bool) -> LineStyle {
    match state {
        VisualState::Past => LineStyle::PAST,
        VisualState::Future => LineStyle::FUTURE,
        VisualState::Current => {
            let energy = features.energy.max(0.0);
            LineStyle {
                font_size_px: 60.0,
                opacity: 1.0,
                lift_px: 15.0,
                scale: if features.beat_detected { 1.05 } else { 1.0 },
                letter_spacing_px: 2.0,
                glow_inner: (energy / 200.0).min(1.0),
                glow_outer: (energy / 400.0).min(1.0),
                brightness: 1.0 + energy / 300.0,
                pulse: is_playing && features.beat_detected,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(energy: f32, beat_detected: bool) -> FeatureSnapshot {
        FeatureSnapshot {
            tempo: 120,
            energy,
            beat_detected,
        }
    }

    #[test]
    fn current_line_glows_with_energy() {
        let style = line_style(VisualState::Current, &features(150.0, false), true);

        assert!((style.glow_inner - 0.75).abs() < 1e-6);
        assert!((style.glow_outer - 0.375).abs() < 1e-6);
        assert!((style.brightness - 1.5).abs() < 1e-6);
        assert_eq!(style.scale, 1.0);
        assert!(!style.pulse);
    }

    #[test]
    fn beat_pulses_only_while_playing() {
        let playing = line_style(VisualState::Current, &features(0.0, true), true);
        let paused = line_style(VisualState::Current, &features(0.0, true), false);

        assert!(playing.pulse);
        assert_eq!(playing.scale, 1.05);
        assert!(!paused.pulse);
    }

    #[test]
    fn surrounding_lines_ignore_features() {
        let loud = features(255.0, true);
        assert_eq!(line_style(VisualState::Past, &loud, true), LineStyle::PAST);
        assert_eq!(line_style(VisualState::Future, &loud, true), LineStyle::FUTURE);
        assert!(LineStyle::PAST.font_size_px < LineStyle::FUTURE.font_size_px);
    }
}
