//! Maps playback time onto the active lyric line.

use std::{cmp::Ordering, ops::Range};

use serde::Serialize;

use crate::{
    config::SyncConfig,
    lyrics::{LyricLine, LyricTable},
};

/// How a line relates to the active one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualState {
    Past,
    Current,
    Future,
}

impl VisualState {
    pub fn of(index: usize, current: usize) -> Self {
        match index.cmp(&current) {
            Ordering::Less => Self::Past,
            Ordering::Equal => Self::Current,
            Ordering::Greater => Self::Future,
        }
    }
}

/// Contiguous slice of the table shown around the active line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderWindow {
    pub current_index: usize,
    pub range: Range<usize>,
}

impl RenderWindow {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Lines in the window paired with their table index and visual state.
    pub fn lines<'a>(
        &'a self,
        table: &'a LyricTable,
    ) -> impl Iterator<Item = (usize, &'static LyricLine, VisualState)> + 'a {
        self.range.clone().filter_map(move |index| {
            table
                .get(index)
                .map(|line| (index, line, VisualState::of(index, self.current_index)))
        })
    }
}

/// Tempo-compensated lyric selection.
#[derive(Debug, Clone)]
pub struct LyricSynchronizer {
    table: LyricTable,
    config: SyncConfig,
}

impl LyricSynchronizer {
    pub fn new(table: LyricTable, config: SyncConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &LyricTable {
        &self.table
    }

    /// Seconds added to the playback time before lookup. Faster songs get
    /// less lead, slower songs more.
    pub fn offset(&self, tempo: u32) -> f32 {
        let raw = (self.config.reference_tempo_bpm - tempo as f32) / self.config.offset_divisor;
        raw.clamp(self.config.min_offset_seconds, self.config.max_offset_seconds)
    }

    /// Index of the line that should be highlighted at `current_time`.
    pub fn active_index(&self, current_time: f32, tempo: u32) -> usize {
        active_index(self.table.lines(), current_time + self.offset(tempo))
    }

    pub fn window(&self, current_time: f32, tempo: u32) -> RenderWindow {
        let current_index = self.active_index(current_time, tempo);
        RenderWindow {
            current_index,
            range: self.window_around(current_index),
        }
    }

    fn window_around(&self, index: usize) -> Range<usize> {
        let len = self.table.len();
        let start = index.saturating_sub(self.config.lines_before).min(len);
        let end = (index + self.config.lines_after + 1).min(len);
        start..end
    }
}

/// Last line whose time is at or before `time`, scanning forward and
/// stopping at the first later line. Ties resolve to the last tied line.
/// Falls back to 0 when nothing qualifies.
pub fn active_index(lines: &[LyricLine], time: f32) -> usize {
    let mut index = 0;
    for (i, line) in lines.iter().enumerate() {
        if time >= line.time {
            index = i;
        } else {
            break;
        }
    }
    index
}

/// Binary-search variant of [`active_index`] for large tables. Only valid
/// when `time` never decreases along `lines`.
pub fn active_index_sorted(lines: &[LyricLine], time: f32) -> usize {
    lines.partition_point(|line| line.time <= time).saturating_sub(1)
}
