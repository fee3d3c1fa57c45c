use std::path::Path;

use karaoke_core::{KaraokeError, Result, SignalSource};

/// Decodes a WAV file into mono `f32` samples.
pub fn load_mono(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|err| KaraokeError::msg(format!("failed to open {}: {err}", path.display())))?;
    let spec = reader.spec();
    let channels = usize::from(spec.channels.max(1));

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| decode_error(path, err))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|err| decode_error(path, err))?
        }
    };

    let mono = interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect();

    tracing::debug!(
        path = %path.display(),
        sample_rate = spec.sample_rate,
        channels,
        "decoded wav file"
    );
    Ok((mono, spec.sample_rate))
}

fn decode_error(path: &Path, err: hound::Error) -> KaraokeError {
    KaraokeError::msg(format!("failed to decode {}: {err}", path.display()))
}

/// Plays back a decoded WAV file.
#[derive(Debug)]
pub struct WavSource {
    samples: Vec<f32>,
    sample_rate: u32,
    position: usize,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self> {
        let (samples, sample_rate) = load_mono(path)?;
        if samples.is_empty() {
            return Err(KaraokeError::InvalidInput("wav file contains no audio"));
        }
        Ok(Self {
            samples,
            sample_rate,
            position: 0,
        })
    }
}

impl SignalSource for WavSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn fill(&mut self, out: &mut [f32]) -> usize {
        let remaining = &self.samples[self.position..];
        let count = remaining.len().min(out.len());
        out[..count].copy_from_slice(&remaining[..count]);
        self.position += count;
        count
    }

    fn seek(&mut self, sample: u64) {
        self.position = usize::try_from(sample)
            .unwrap_or(usize::MAX)
            .min(self.samples.len());
    }
}
