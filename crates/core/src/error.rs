/// Result alias that carries the custom [`KaraokeError`] type.
pub type Result<T> = std::result::Result<T, KaraokeError>;

/// Message shown to the listener when playback could not be started even
/// after the automatic retry.
pub const PLAYBACK_FAILED_MESSAGE: &str =
    "Unable to play audio. Please check if the audio file is accessible and try again.";

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum KaraokeError {
    /// Free-form failure, mostly used for poisoned locks and app-level
    /// conversions.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// A caller handed over data the engine cannot work with.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// JSON could not be parsed or produced.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The FFT backend rejected the buffers it was given.
    #[error("spectrum transform failed: {0}")]
    Fft(#[from] realfft::FftError),
    /// The live audio tap could not be opened. Non-fatal: the engine keeps
    /// its default tempo and energy.
    #[error("audio analysis not available: {0}")]
    AnalysisUnavailable(String),
    /// Playback failed to start after `attempts` tries.
    #[error("playback failed after {attempts} attempts: {reason}")]
    PlaybackFailed { attempts: u32, reason: String },
}

impl KaraokeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Message suitable for showing to the listener, without the diagnostic
    /// detail carried by the variant.
    pub fn user_message(&self) -> String {
        match self {
            Self::PlaybackFailed { .. } => PLAYBACK_FAILED_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl From<&str> for KaraokeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for KaraokeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
