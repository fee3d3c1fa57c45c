use std::{f32::consts::PI, fmt, sync::Arc};

use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{config::AnalysisConfig, KaraokeError, Result};

/// Byte-scaled magnitude spectrum in the style of a browser analyser node:
/// Blackman window, smoothing across frames, decibel conversion and a linear
/// mapping of `[min_decibels, max_decibels]` onto `0..=255`.
pub struct ByteSpectrum {
    size: usize,
    smoothing: f32,
    min_decibels: f32,
    max_decibels: f32,
    window: Vec<f32>,
    plan: Arc<dyn RealToComplex<f32>>,
    input: Vec<f32>,
    spectrum: Vec<Complex32>,
    scratch: Vec<Complex32>,
    smoothed: Vec<f32>,
    bytes: Vec<u8>,
}

impl ByteSpectrum {
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let size = config.fft_size;
        if size < 2 {
            return Err(KaraokeError::InvalidInput(
                "spectrum requires at least two samples per frame",
            ));
        }

        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let input = plan.make_input_vec();
        let spectrum = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        Ok(Self {
            size,
            smoothing: config.smoothing_time_constant,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
            window: (0..size).map(|i| blackman_value(i, size)).collect(),
            plan,
            input,
            spectrum,
            scratch,
            smoothed: vec![0.0; size / 2],
            bytes: vec![0; size / 2],
        })
    }

    /// Number of time-domain samples consumed per frame.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Transforms one frame of exactly [`size`](Self::size) samples and
    /// returns the updated byte magnitudes.
    pub fn process(&mut self, samples: &[f32]) -> Result<&[u8]> {
        if samples.len() != self.size {
            return Err(KaraokeError::InvalidInput(
                "spectrum frame length must match the transform size",
            ));
        }

        for ((slot, sample), weight) in self.input.iter_mut().zip(samples).zip(&self.window) {
            *slot = sample * weight;
        }

        self.plan
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)?;

        let scale = 1.0 / self.size as f32;
        let range = self.max_decibels - self.min_decibels;
        for (bin, (smoothed, byte)) in self.smoothed.iter_mut().zip(&mut self.bytes).enumerate() {
            let magnitude = self.spectrum[bin].norm() * scale;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            // log10(0) is -inf which clamps to zero below.
            let decibels = 20.0 * smoothed.log10();
            let scaled = (255.0 / range) * (decibels - self.min_decibels);
            *byte = scaled.floor().clamp(0.0, 255.0) as u8;
        }

        Ok(self.bytes.as_slice())
    }
}

impl fmt::Debug for ByteSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteSpectrum")
            .field("size", &self.size)
            .field("smoothing", &self.smoothing)
            .finish()
    }
}

/// Maps a frequency to its bin index: `floor(hz * size / sample_rate)`.
pub fn bin_index(frequency_hz: f32, fft_size: usize, sample_rate: u32) -> usize {
    if sample_rate == 0 {
        return 0;
    }
    (frequency_hz * fft_size as f32 / sample_rate as f32).floor().max(0.0) as usize
}

/// Mean byte magnitude over `[bin(low_hz), bin(high_hz))`, clipped to the
/// available bins. An empty band has zero energy.
pub fn band_energy(
    bytes: &[u8],
    fft_size: usize,
    sample_rate: u32,
    low_hz: f32,
    high_hz: f32,
) -> f32 {
    let start = bin_index(low_hz, fft_size, sample_rate).min(bytes.len());
    let end = bin_index(high_hz, fft_size, sample_rate).min(bytes.len());
    if end <= start {
        return 0.0;
    }

    let sum: u32 = bytes[start..end].iter().map(|&byte| u32::from(byte)).sum();
    sum as f32 / (end - start) as f32
}

fn blackman_value(index: usize, len: usize) -> f32 {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let x = index as f32 / len as f32;

    a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| amplitude * (2.0 * PI * frequency * n as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn unsmoothed() -> AnalysisConfig {
        AnalysisConfig {
            smoothing_time_constant: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn maps_bass_band_to_bins() {
        assert_eq!(bin_index(20.0, 2048, 48_000), 0);
        assert_eq!(bin_index(200.0, 2048, 48_000), 8);
        assert_eq!(bin_index(200.0, 2048, 44_100), 9);
    }

    #[test]
    fn silence_has_no_energy() {
        let mut spectrum = ByteSpectrum::new(&unsmoothed()).unwrap();
        let bytes = spectrum.process(&vec![0.0; 2048]).unwrap();

        assert!(bytes.iter().all(|&byte| byte == 0));
        assert_eq!(band_energy(bytes, 2048, 48_000, 20.0, 200.0), 0.0);
    }

    #[test]
    fn loud_bass_tone_exceeds_beat_threshold() {
        let mut spectrum = ByteSpectrum::new(&unsmoothed()).unwrap();
        let bytes = spectrum.process(&sine(60.0, 0.9, 48_000, 2048)).unwrap();
        let bass = band_energy(bytes, 2048, 48_000, 20.0, 200.0);

        assert!(bass > 120.0, "bass energy was {bass}");
    }

    #[test]
    fn treble_tone_leaves_bass_band_quiet() {
        let mut spectrum = ByteSpectrum::new(&unsmoothed()).unwrap();
        let bytes = spectrum.process(&sine(5_000.0, 0.9, 48_000, 2048)).unwrap();
        let bass = band_energy(bytes, 2048, 48_000, 20.0, 200.0);

        assert!(bass < 120.0, "bass energy was {bass}");
    }

    #[test]
    fn smoothing_decays_after_signal_stops() {
        let mut spectrum = ByteSpectrum::new(&AnalysisConfig::default()).unwrap();
        let tone = sine(60.0, 0.9, 48_000, 2048);
        for _ in 0..20 {
            spectrum.process(&tone).unwrap();
        }
        let loud = band_energy(spectrum.process(&tone).unwrap(), 2048, 48_000, 20.0, 200.0);
        let fading = band_energy(
            spectrum.process(&vec![0.0; 2048]).unwrap(),
            2048,
            48_000,
            20.0,
            200.0,
        );

        assert!(fading > 0.0);
        assert!(fading < loud);
    }

    #[test]
    fn rejects_mismatched_frame_length() {
        let mut spectrum = ByteSpectrum::new(&unsmoothed()).unwrap();
        assert!(spectrum.process(&[0.0; 16]).is_err());
    }
}
