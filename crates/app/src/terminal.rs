use std::io::{self, Write};

use karaoke_core::DisplayFrame;

/// Minimal text presentation layer. A finished line scrolls up as plain
/// text and the active line is redrawn in place while it is being revealed.
#[derive(Debug, Default)]
pub struct TextRenderer {
    current: Option<(usize, &'static str)>,
    last_line: String,
    showing_prompt: bool,
}

impl TextRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, frame: &DisplayFrame) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.draw_to(&mut out, frame)?;
        out.flush()
    }

    /// Moves past the line being redrawn in place.
    pub fn finish(&mut self) -> io::Result<()> {
        let mut out = io::stdout().lock();
        self.settle_current(&mut out)?;
        out.flush()
    }

    fn draw_to(&mut self, out: &mut impl Write, frame: &DisplayFrame) -> io::Result<()> {
        if let Some(prompt) = frame.prompt {
            if !self.showing_prompt {
                self.settle_current(out)?;
                writeln!(out, "{prompt}")?;
                self.showing_prompt = true;
            }
            return Ok(());
        }
        self.showing_prompt = false;

        let Some(active) = frame.current() else {
            return Ok(());
        };

        if self.current.map(|(index, _)| index) != Some(active.index) {
            self.settle_current(out)?;
            self.current = Some((active.index, active.full_text));
        }

        let marker = if active.style.pulse { '*' } else { '>' };
        let status = frame.diagnostics.as_deref().unwrap_or("paused");
        let rendered = format!(" {marker} {:<42} [{status}]", active.text);
        if rendered != self.last_line {
            write!(out, "\r{rendered}")?;
            self.last_line = rendered;
        }
        Ok(())
    }

    /// Rewrites the line that just left the current slot with its full text
    /// and ends it, so every lyric is printed once.
    fn settle_current(&mut self, out: &mut impl Write) -> io::Result<()> {
        if let Some((_, text)) = self.current.take() {
            let width = self.last_line.chars().count();
            writeln!(out, "\r{:<width$}", format!("   {text}"))?;
        }
        self.last_line.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use karaoke_core::{AppConfig, KaraokeSession, NoTap, PlaybackState};

    use super::*;

    fn settled_lines(output: &[u8]) -> Vec<String> {
        String::from_utf8_lossy(output)
            .split('\n')
            .map(|row| row.rsplit('\r').next().unwrap_or("").trim().to_string())
            .filter(|row| !row.is_empty())
            .collect()
    }

    #[test]
    fn each_finished_lyric_is_printed_once() {
        let mut session = KaraokeSession::new(AppConfig::default(), Box::new(NoTap::new("none")));
        let mut renderer = TextRenderer::new();
        let mut output = Vec::new();

        for (step, time) in [40.0, 41.0, 45.0, 46.0, 50.0, 55.0].into_iter().enumerate() {
            let now = Duration::from_millis(step as u64 * 1_000);
            let frame = session.update(now, PlaybackState::new(time, true));
            renderer.draw_to(&mut output, &frame).unwrap();
        }
        renderer.settle_current(&mut output).unwrap();

        let lines = settled_lines(&output);
        assert_eq!(
            lines,
            vec![
                "Ikaw ang ilaw sa dilim ko",
                "Gabing malamlam ay lumiwanag",
                "Puso ko'y sayo nang nakaukit",
                "Walang hanggan ang ating pag-ibig",
            ]
        );
    }

    #[test]
    fn prompt_is_printed_once() {
        let mut session = KaraokeSession::new(AppConfig::default(), Box::new(NoTap::new("none")));
        let mut renderer = TextRenderer::new();
        let mut output = Vec::new();

        for _ in 0..3 {
            let frame = session.update(Duration::ZERO, PlaybackState::new(0.0, false));
            renderer.draw_to(&mut output, &frame).unwrap();
        }

        assert_eq!(settled_lines(&output), vec!["Press play to start"]);
    }
}
