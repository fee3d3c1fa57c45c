use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Playback signals handed to the engine on every update. Owned by the
/// playback collaborator; the engine only reads it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Seconds since the start of the track.
    pub current_time: f32,
    pub is_playing: bool,
}

impl PlaybackState {
    pub fn new(current_time: f32, is_playing: bool) -> Self {
        Self {
            current_time,
            is_playing,
        }
    }

    /// Nothing has been played yet.
    pub fn is_idle(&self) -> bool {
        !self.is_playing && self.current_time == 0.0
    }
}

/// Transport clock used by playback collaborators that have no clock of
/// their own.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    position: Duration,
    playing: bool,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// Stops playback and rewinds to the start.
    pub fn stop(&mut self) {
        self.playing = false;
        self.position = Duration::ZERO;
    }

    pub fn seek(&mut self, position: Duration) {
        self.position = position;
    }

    /// Moves the position forward while playing.
    pub fn advance(&mut self, delta: Duration) {
        if self.playing {
            self.position += delta;
        }
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState::new(self.position.as_secs_f32(), self.playing)
    }
}

/// One-shot deadline polled cooperatively. Timestamps are offsets from an
/// arbitrary monotonic origin chosen by the owner.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    due: Option<Duration>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms (or re-arms) the timer to fire `delay` after `now`.
    pub fn arm(&mut self, now: Duration, delay: Duration) {
        self.due = Some(now + delay);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.due.is_some()
    }

    pub fn due(&self) -> Option<Duration> {
        self.due
    }

    /// Returns `true` exactly once when the deadline has been reached, and
    /// disarms the timer.
    pub fn fire_if_due(&mut self, now: Duration) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}
