mod terminal;
mod wav;

use std::{
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use clap::{Parser, Subcommand};
use karaoke_core::{
    start_playback, AppConfig, FeatureExtractor, KaraokeError, KaraokeSession, KickPattern,
    LyricSynchronizer, LyricTable, PlaybackBackend, PlaybackClock, SharedOutput, SignalSource,
    VisualState,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::{terminal::TextRenderer, wav::WavSource};

fn main() -> karaoke_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Play {
            bpm,
            wav,
            start,
            seconds,
            fps,
        } => run_play(config, bpm, wav.as_deref(), start, seconds, fps),
        Commands::Lyrics { time, tempo } => run_lyrics(&config, time, tempo),
        Commands::Analyse { input, output } => run_analyse(&config, &input, output.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> karaoke_core::Result<AppConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            AppConfig::from_json_file(path)
        }
        None => Ok(AppConfig::default()),
    }
}

/// Stand-in for a real audio device: advances a clock and pushes the
/// rendered audio into the shared output.
struct Transport {
    clock: PlaybackClock,
    source: Box<dyn SignalSource>,
    output: SharedOutput,
    block: Vec<f32>,
    /// Track position, in samples, that playback time zero maps to.
    start_sample: u64,
    rendered_samples: u64,
    exhausted: bool,
}

impl Transport {
    fn new(source: Box<dyn SignalSource>) -> Self {
        let output = SharedOutput::new(source.sample_rate());
        Self {
            clock: PlaybackClock::new(),
            source,
            output,
            block: Vec::new(),
            start_sample: 0,
            rendered_samples: 0,
            exhausted: false,
        }
    }

    /// Renders audio up to `elapsed` of playback time.
    fn render_until(&mut self, elapsed: Duration) -> karaoke_core::Result<()> {
        if !self.clock.is_playing() || self.exhausted {
            return Ok(());
        }

        let rate = u64::from(self.source.sample_rate());
        let target = self.start_sample + (elapsed.as_secs_f64() * rate as f64) as u64;
        let pending = target.saturating_sub(self.rendered_samples) as usize;
        if pending == 0 {
            return Ok(());
        }

        self.block.resize(pending, 0.0);
        let written = self.source.fill(&mut self.block);
        self.output.write(&self.block[..written])?;
        self.rendered_samples += written as u64;
        self.clock
            .advance(Duration::from_secs_f64(written as f64 / rate as f64));
        self.exhausted = written < pending;
        Ok(())
    }

    /// Moves both the audio and the clock to `position`. Playback time
    /// measured by [`render_until`](Self::render_until) restarts from there.
    fn seek(&mut self, position: Duration) {
        let rate = f64::from(self.source.sample_rate());
        let sample = (position.as_secs_f64() * rate) as u64;
        self.source.seek(sample);
        self.clock.seek(position);
        self.start_sample = sample;
        self.rendered_samples = sample;
        self.exhausted = false;
    }
}

impl PlaybackBackend for Transport {
    fn play(&mut self) -> karaoke_core::Result<()> {
        if self.exhausted {
            return Err(KaraokeError::msg("audio source is exhausted"));
        }
        self.clock.play();
        Ok(())
    }

    fn reload(&mut self) -> karaoke_core::Result<()> {
        self.clock.stop();
        self.source.rewind();
        self.start_sample = 0;
        self.rendered_samples = 0;
        self.exhausted = false;
        Ok(())
    }
}

fn run_play(
    config: AppConfig,
    bpm: f32,
    wav: Option<&Path>,
    start: f32,
    seconds: f32,
    fps: u32,
) -> karaoke_core::Result<()> {
    let source: Box<dyn SignalSource> = match wav {
        Some(path) => Box::new(WavSource::open(path)?),
        None => Box::new(KickPattern::new(bpm, 48_000)),
    };
    tracing::info!(bpm, ?wav, start, seconds, fps, "starting playback");

    let mut transport = Transport::new(source);
    let mut session = KaraokeSession::new(config.clone(), Box::new(transport.output.clone()));
    let mut screen = TextRenderer::new();
    screen.draw(&session.update(Duration::ZERO, transport.clock.state()))?;

    if let Err(err) = start_playback(&mut transport, config.playback.retry_delay()) {
        eprintln!("{}", err.user_message());
        return Err(err);
    }
    if start > 0.0 {
        transport.seek(Duration::from_secs_f32(start));
    }

    let frame_period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let limit = Duration::from_secs_f32(seconds.max(0.0));
    let started = Instant::now();

    loop {
        let now = started.elapsed();
        transport.render_until(now)?;
        let frame = session.update(now, transport.clock.state());
        screen.draw(&frame)?;

        if transport.exhausted || transport.clock.position() >= limit {
            break;
        }
        thread::sleep(frame_period);
    }

    transport.clock.stop();
    screen.draw(&session.update(started.elapsed(), transport.clock.state()))?;
    screen.finish()?;
    tracing::info!(tempo = session.features().tempo, "playback finished");
    Ok(())
}

fn run_lyrics(config: &AppConfig, time: f32, tempo: u32) -> karaoke_core::Result<()> {
    let sync = LyricSynchronizer::new(LyricTable::builtin(), config.sync.clone());
    let window = sync.window(time, tempo);
    let table = *sync.table();

    println!(
        "time {time:.2}s, tempo {tempo} BPM, offset {:.2}s",
        sync.offset(tempo)
    );
    for (_, line, state) in window.lines(&table) {
        let marker = match state {
            VisualState::Past => "  ",
            VisualState::Current => "> ",
            VisualState::Future => "  ",
        };
        println!("{marker}{:>6.1}  {}", line.time, line.text);
    }
    Ok(())
}

/// Result of running the live extractor over a file at display rate.
#[derive(Debug, Serialize)]
struct AnalysisReport {
    sample_rate: u32,
    duration_seconds: f32,
    frames: usize,
    beats: Vec<f32>,
    tempo_bpm: u32,
    mean_energy: f32,
}

fn run_analyse(
    config: &AppConfig,
    input: &Path,
    output: Option<&Path>,
) -> karaoke_core::Result<()> {
    tracing::info!(?input, ?output, "analysing audio file");
    let (samples, sample_rate) = wav::load_mono(input)?;
    let report = analyse_offline(config, &samples, sample_rate)?;
    tracing::info!(
        beats = report.beats.len(),
        tempo = report.tempo_bpm,
        "analysis complete"
    );

    let json = serde_json::to_string_pretty(&report)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn analyse_offline(
    config: &AppConfig,
    samples: &[f32],
    sample_rate: u32,
) -> karaoke_core::Result<AnalysisReport> {
    const FRAME_RATE: f64 = 60.0;

    let window = config.analysis.fft_size;
    let mut extractor = FeatureExtractor::new(&config.analysis)?;
    let duration = samples.len() as f64 / f64::from(sample_rate.max(1));
    let mut beats = Vec::new();
    let mut energy_sum = 0.0;
    let mut frames = 0;
    let mut pulse = false;

    let mut frame = 0_u64;
    loop {
        let seconds = frame as f64 / FRAME_RATE;
        if seconds > duration {
            break;
        }
        frame += 1;

        let end = (seconds * f64::from(sample_rate)) as usize;
        if end < window || end > samples.len() {
            continue;
        }

        let now = Duration::from_secs_f64(seconds);
        let snapshot = extractor.analyse_samples(&samples[end - window..end], sample_rate, now)?;
        if snapshot.beat_detected && !pulse {
            beats.push(seconds as f32);
        }
        pulse = snapshot.beat_detected;
        energy_sum += snapshot.energy;
        frames += 1;
    }

    Ok(AnalysisReport {
        sample_rate,
        duration_seconds: duration as f32,
        frames,
        beats,
        tempo_bpm: extractor.snapshot().tempo,
        mean_energy: if frames > 0 {
            energy_sum / frames as f32
        } else {
            0.0
        },
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Karaoke player with tempo-adaptive lyrics", long_about = None)]
struct Cli {
    /// JSON configuration file overriding the built-in defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play the song in real time and render the lyrics in the terminal.
    Play {
        /// Tempo of the synthetic kick track used when no WAV file is given.
        #[arg(long, default_value_t = 128.0)]
        bpm: f32,
        /// WAV file to play instead of the synthetic kick track.
        #[arg(long)]
        wav: Option<PathBuf>,
        /// Track position in seconds to start playing from.
        #[arg(long, default_value_t = 0.0)]
        start: f32,
        /// Stop after this many seconds of playback.
        #[arg(long, default_value_t = 170.0)]
        seconds: f32,
        /// Display refresh rate driving analysis and animation.
        #[arg(long, default_value_t = 60)]
        fps: u32,
    },
    /// Show the lyric window selected at a playback time.
    Lyrics {
        /// Playback time in seconds.
        #[arg(long)]
        time: f32,
        /// Tempo used for the lag compensation offset.
        #[arg(long, default_value_t = 120)]
        tempo: u32,
    },
    /// Run the beat tracker over a WAV file and write a JSON report.
    Analyse {
        /// Path to the WAV file that should be analysed.
        input: PathBuf,
        /// Output path for the report. Printed to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offline_analysis_finds_synthetic_tempo() {
        let mut config = AppConfig::default();
        config.analysis.smoothing_time_constant = 0.0;
        let mut kick = KickPattern::new(120.0, 48_000);
        let mut samples = vec![0.0; 48_000 * 4];
        kick.fill(&mut samples);

        let report = analyse_offline(&config, &samples, 48_000).unwrap();

        assert!(report.beats.len() >= 5, "beats: {:?}", report.beats);
        assert!((110..=130).contains(&report.tempo_bpm), "tempo {}", report.tempo_bpm);
    }

    #[test]
    fn transport_renders_in_step_with_clock() {
        let mut transport = Transport::new(Box::new(KickPattern::new(120.0, 1_000)));
        let tap = transport.output.open_tap();
        transport.play().unwrap();
        transport.render_until(Duration::from_millis(250)).unwrap();

        assert_eq!(transport.clock.position(), Duration::from_millis(250));
        assert!(tap.latest(&mut [0.0; 250]).unwrap());
    }

    #[test]
    fn reload_rewinds_audio_and_clock_together() {
        let mut transport = Transport::new(Box::new(KickPattern::new(120.0, 1_000)));
        let tap = transport.output.open_tap();
        transport.play().unwrap();
        transport.render_until(Duration::from_millis(250)).unwrap();

        transport.reload().unwrap();
        transport.play().unwrap();
        transport.render_until(Duration::from_millis(20)).unwrap();

        let mut after_reload = [0.0; 20];
        assert!(tap.latest(&mut after_reload).unwrap());
        let mut track_start = [0.0; 20];
        KickPattern::new(120.0, 1_000).fill(&mut track_start);

        assert_eq!(transport.clock.position(), Duration::from_millis(20));
        assert_eq!(after_reload, track_start);
    }

    struct ShortTrack {
        remaining: usize,
    }

    impl SignalSource for ShortTrack {
        fn sample_rate(&self) -> u32 {
            1_000
        }

        fn fill(&mut self, out: &mut [f32]) -> usize {
            let count = self.remaining.min(out.len());
            out[..count].fill(0.5);
            self.remaining -= count;
            count
        }

        fn seek(&mut self, sample: u64) {
            self.remaining = 100_usize.saturating_sub(sample as usize);
        }
    }

    #[test]
    fn retry_succeeds_after_track_ran_out() {
        let mut transport = Transport::new(Box::new(ShortTrack { remaining: 100 }));
        transport.play().unwrap();
        transport.render_until(Duration::from_millis(200)).unwrap();
        assert!(transport.exhausted);
        assert!(transport.play().is_err());

        start_playback(&mut transport, Duration::ZERO).unwrap();
        assert!(transport.clock.is_playing());
        assert_eq!(transport.clock.position(), Duration::ZERO);
    }

    #[test]
    fn seek_moves_audio_and_clock() {
        let mut transport = Transport::new(Box::new(KickPattern::new(120.0, 1_000)));
        let tap = transport.output.open_tap();
        transport.play().unwrap();
        transport.seek(Duration::from_millis(500));
        transport.render_until(Duration::from_millis(20)).unwrap();

        let mut rendered = [0.0; 20];
        assert!(tap.latest(&mut rendered).unwrap());
        let mut expected = [0.0; 20];
        let mut reference = KickPattern::new(120.0, 1_000);
        reference.seek(500);
        reference.fill(&mut expected);

        assert_eq!(transport.clock.position(), Duration::from_millis(520));
        assert_eq!(rendered, expected);
    }

    #[test]
    fn cli_parses_play_defaults() {
        let cli = Cli::parse_from(["karaoke", "play"]);
        match cli.command {
            Commands::Play {
                bpm,
                fps,
                wav,
                start,
                ..
            } => {
                assert_eq!(bpm, 128.0);
                assert_eq!(start, 0.0);
                assert_eq!(fps, 60);
                assert!(wav.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
