//! Core library for the karaoke player.
//!
//! The crate turns two signals from a playback collaborator, the current
//! playback time and a play/pause flag, plus a read-only tap on the audio
//! being played into display frames: a small window of lyric lines around
//! the one being sung, a tempo-paced typewriter reveal of that line and
//! energy-driven styling. Each module owns one subsystem (live analysis,
//! lyric selection, reveal timing, styling) and [`KaraokeSession`] wires
//! them together behind a single per-frame `update` call.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod lyrics;
pub mod mapping;
pub mod render;
pub mod session;
pub mod sync;
pub mod timeline;

pub use analysis::{BeatTracker, FeatureExtractor, FeatureSnapshot};
pub use audio::{
    start_playback, AudioTap, KickPattern, NoTap, PlaybackBackend, SharedOutput, SignalSource,
    TapProvider,
};
pub use config::{AnalysisConfig, AppConfig, PlaybackConfig, SyncConfig, TypewriterConfig};
pub use error::{KaraokeError, Result};
pub use lyrics::{LyricLine, LyricTable, Section};
pub use mapping::LineStyle;
pub use render::{DisplayFrame, DisplayLine, Typewriter};
pub use session::KaraokeSession;
pub use sync::{LyricSynchronizer, RenderWindow, VisualState};
pub use timeline::{PlaybackClock, PlaybackState, Timer};
