use std::{fmt, time::Duration};

use crate::{
    analysis::{FeatureExtractor, FeatureSnapshot},
    audio::{AudioTap, TapProvider},
    config::AppConfig,
    lyrics::LyricTable,
    render::{compose, DisplayFrame, Typewriter},
    sync::LyricSynchronizer,
    timeline::PlaybackState,
    Result,
};

/// Analysis attached to a live tap. Exists only while playback runs;
/// dropping it releases the tap.
struct AnalysisSession {
    tap: AudioTap,
    extractor: FeatureExtractor,
}

impl AnalysisSession {
    fn activate(provider: &dyn TapProvider, config: &AppConfig, tempo: u32) -> Result<Self> {
        let tap = provider.open()?;
        let extractor = FeatureExtractor::with_tempo(&config.analysis, tempo)?;
        tracing::info!(sample_rate = tap.sample_rate(), "audio analysis attached");
        Ok(Self { tap, extractor })
    }

    fn analyse(&mut self, now: Duration) -> Result<FeatureSnapshot> {
        self.extractor.analyse_tap(&self.tap, now)
    }
}

impl Drop for AnalysisSession {
    fn drop(&mut self) {
        tracing::info!("audio analysis released");
    }
}

/// Ties playback signals, live analysis, lyric selection and the typewriter
/// together. Call [`update`](Self::update) once per display frame.
pub struct KaraokeSession {
    config: AppConfig,
    provider: Box<dyn TapProvider>,
    synchronizer: LyricSynchronizer,
    typewriter: Typewriter,
    analysis: Option<AnalysisSession>,
    analysis_failed: bool,
    features: FeatureSnapshot,
}

impl KaraokeSession {
    pub fn new(config: AppConfig, provider: Box<dyn TapProvider>) -> Self {
        Self::with_table(config, provider, LyricTable::builtin())
    }

    pub fn with_table(config: AppConfig, provider: Box<dyn TapProvider>, table: LyricTable) -> Self {
        Self {
            synchronizer: LyricSynchronizer::new(table, config.sync.clone()),
            typewriter: Typewriter::new(config.typewriter.clone()),
            features: FeatureSnapshot::with_tempo(config.analysis.default_tempo_bpm),
            config,
            provider,
            analysis: None,
            analysis_failed: false,
        }
    }

    /// Latest published features.
    pub fn features(&self) -> FeatureSnapshot {
        self.features
    }

    /// Whether a live tap is currently attached.
    pub fn is_analysing(&self) -> bool {
        self.analysis.is_some()
    }

    pub fn synchronizer(&self) -> &LyricSynchronizer {
        &self.synchronizer
    }

    /// Advances every cooperative task to `now` and returns the frame to
    /// draw. `now` is a monotonic timestamp; `playback` comes from the
    /// playback collaborator.
    pub fn update(&mut self, now: Duration, playback: PlaybackState) -> DisplayFrame {
        self.update_analysis(now, playback.is_playing);

        if playback.is_idle() {
            self.typewriter.deactivate();
            return DisplayFrame::idle(self.features);
        }

        let window = self
            .synchronizer
            .window(playback.current_time, self.features.tempo);
        let table = *self.synchronizer.table();

        match table.get(window.current_index) {
            Some(line) if playback.is_playing => self.typewriter.sync(
                window.current_index,
                line.text,
                self.features.tempo,
                self.features.energy,
                now,
            ),
            _ => self.typewriter.deactivate(),
        }

        compose(&table, &window, &playback, self.features, &self.typewriter)
    }

    /// Detaches analysis and cancels the reveal, as when playback stops.
    pub fn shutdown(&mut self) {
        self.deactivate_analysis();
        self.typewriter.deactivate();
    }

    fn update_analysis(&mut self, now: Duration, is_playing: bool) {
        if !is_playing {
            self.analysis_failed = false;
            self.deactivate_analysis();
            return;
        }

        if self.analysis.is_none() && !self.analysis_failed {
            match AnalysisSession::activate(self.provider.as_ref(), &self.config, self.features.tempo)
            {
                Ok(session) => self.analysis = Some(session),
                Err(err) => {
                    tracing::warn!(error = %err, "audio analysis not available, using defaults");
                    self.analysis_failed = true;
                }
            }
        }

        if let Some(session) = self.analysis.as_mut() {
            match session.analyse(now) {
                Ok(snapshot) => self.features = snapshot,
                Err(err) => tracing::warn!(error = %err, "skipping analysis frame"),
            }
        }
    }

    fn deactivate_analysis(&mut self) {
        if self.analysis.take().is_some() {
            self.features = FeatureSnapshot::with_tempo(self.features.tempo);
        }
    }
}

impl Drop for KaraokeSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for KaraokeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KaraokeSession")
            .field("analysing", &self.analysis.is_some())
            .field("analysis_failed", &self.analysis_failed)
            .field("features", &self.features)
            .field("typewriter", &self.typewriter.is_active())
            .finish()
    }
}
