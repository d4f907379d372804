//! Per-pitch adaptive spectral analysis.
//!
//! Each pitch gets its own window length, chosen as a whole number of the
//! pitch's periods so that the pitch lands exactly on a DFT bin. The bin
//! index is that whole number (the "multiplier").

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::analysis::align_channels;
use super::decode::StereoBuffer;
use super::pitch::{frequency, min_bin_floor};
use super::window::{generate_window, odd_symmetric_window};
use crate::config::AnalysisConfig;
use crate::error::{ConvertError, Result};

/// Converged window length for one pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinResolution {
    pub bin_size: usize,
    /// Periods per window; also the DFT bin index of the pitch.
    pub multiplier: u32,
}

/// Magnitude series of one pitch's fundamental on both channels.
#[derive(Debug, Clone)]
pub struct PitchSpectrum {
    pub pitch: u8,
    pub bin_size: usize,
    pub bin_index: u32,
    pub hop: usize,
    /// Seconds between consecutive samples of `left`/`right`.
    pub dt: f64,
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    /// Largest value over both channels.
    pub peak: f32,
}

impl PitchSpectrum {
    pub fn len(&self) -> usize {
        self.left.len().max(self.right.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn recompute_peak(&mut self) {
        self.peak = self
            .left
            .iter()
            .chain(self.right.iter())
            .copied()
            .fold(0.0f32, f32::max);
    }
}

/// Smallest window reachable from `base_multiplier` in `multiplier_step`
/// increments that is at least the pitch's resolution floor.
pub fn resolve_bin_size(pitch: u8, sample_rate: u32, cfg: &AnalysisConfig) -> Result<BinResolution> {
    if sample_rate == 0 {
        return Err(ConvertError::InvalidConfig("sample rate must be positive".into()));
    }
    let period = sample_rate as f64 / frequency(pitch);
    let floor = min_bin_floor(pitch, cfg.floor_slope, cfg.floor_intercept);

    let mut multiplier = cfg.base_multiplier;
    let mut bin_size = (period * multiplier as f64).round() as usize;

    while (bin_size as f64) < floor || bin_size == 0 {
        let degenerate = ConvertError::DegenerateBinSize {
            pitch,
            bin_size,
            floor,
            step: cfg.multiplier_step,
        };
        if cfg.multiplier_step == 0 {
            return Err(degenerate);
        }
        multiplier = multiplier
            .checked_add(cfg.multiplier_step)
            .ok_or(degenerate)?;
        bin_size = (period * multiplier as f64).round() as usize;
    }

    Ok(BinResolution {
        bin_size,
        multiplier,
    })
}

/// Number of whole windows that fit in `len` samples.
pub fn frame_count(len: usize, bin_size: usize, hop: usize) -> usize {
    if bin_size == 0 || len < bin_size {
        0
    } else {
        (len - bin_size) / hop.max(1) + 1
    }
}

/// Sample advance between windows, never less than one sample.
pub fn hop_size(bin_size: usize, overlap: f64) -> usize {
    ((bin_size as f64 * (1.0 - overlap)).round() as usize).max(1)
}

/// Windowed, length-normalized DFT magnitudes over consecutive frames.
///
/// Yields the lower half of each frame's spectrum. Trailing samples that do
/// not fill a whole window are skipped. Cloning continues from the current
/// position; [`ShortTimeTransform::restart`] rewinds to the first frame.
#[derive(Clone)]
pub struct ShortTimeTransform<'a> {
    samples: &'a [i16],
    window: &'a [f32],
    fft: Arc<dyn Fft<f32>>,
    hop: usize,
    pos: usize,
}

impl<'a> ShortTimeTransform<'a> {
    pub fn new(samples: &'a [i16], window: &'a [f32], hop: usize, fft: Arc<dyn Fft<f32>>) -> Self {
        debug_assert_eq!(fft.len(), window.len());
        Self {
            samples,
            window,
            fft,
            hop: hop.max(1),
            pos: 0,
        }
    }

    pub fn bin_size(&self) -> usize {
        self.window.len()
    }

    pub fn hop(&self) -> usize {
        self.hop
    }

    pub fn frame_count(&self) -> usize {
        frame_count(self.samples.len(), self.bin_size(), self.hop)
    }

    pub fn restart(&mut self) {
        self.pos = 0;
    }

    /// Magnitude of a single bin across every frame, from the first.
    pub fn column(&mut self, bin: usize) -> Vec<f32> {
        self.restart();
        let n = self.bin_size();
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        let mut out = Vec::with_capacity(self.frame_count());
        while self.fill_next(&mut buffer, &mut scratch) {
            out.push(buffer[bin].norm() / n as f32);
        }
        out
    }

    fn fill_next(&mut self, buffer: &mut [Complex<f32>], scratch: &mut [Complex<f32>]) -> bool {
        let n = self.bin_size();
        if n == 0 || self.pos + n > self.samples.len() {
            return false;
        }
        let segment = &self.samples[self.pos..self.pos + n];
        for ((slot, &s), &w) in buffer.iter_mut().zip(segment).zip(self.window) {
            *slot = Complex::new(s as f32 * w, 0.0);
        }
        self.fft.process_with_scratch(buffer, scratch);
        self.pos += self.hop;
        true
    }
}

impl Iterator for ShortTimeTransform<'_> {
    type Item = Vec<f32>;

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.bin_size();
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); self.fft.get_inplace_scratch_len()];
        if !self.fill_next(&mut buffer, &mut scratch) {
            return None;
        }
        Some(buffer[..n / 2].iter().map(|c| c.norm() / n as f32).collect())
    }
}

/// Builds a transform over one channel. Plans are cached by `planner`, so
/// passes sharing a bin size share one FFT.
pub fn short_time_transform<'a>(
    samples: &'a [i16],
    window: &'a [f32],
    overlap: f64,
    planner: &mut FftPlanner<f32>,
) -> ShortTimeTransform<'a> {
    let fft = planner.plan_fft_forward(window.len());
    ShortTimeTransform::new(samples, window, hop_size(window.len(), overlap), fft)
}

/// Analyzes one pitch on both channels of `audio`.
pub fn analyze_pitch(audio: &StereoBuffer, pitch: u8, cfg: &AnalysisConfig) -> Result<PitchSpectrum> {
    let BinResolution {
        bin_size,
        multiplier,
    } = resolve_bin_size(pitch, audio.sample_rate, cfg)?;
    let hop = hop_size(bin_size, cfg.overlap);
    let bin = multiplier as usize;

    let (mut left, mut right) = if bin >= bin_size / 2 {
        // Pitch sits at or above Nyquist for this sample rate.
        let frames = frame_count(audio.frames(), bin_size, hop);
        log::debug!("Pitch {} is above Nyquist, emitting {} silent frames", pitch, frames);
        (vec![0.0f32; frames], vec![0.0f32; frames])
    } else {
        let mut planner = FftPlanner::<f32>::new();
        let window = generate_window(cfg.window, bin_size);

        let mut left_pass = short_time_transform(&audio.left, &window, cfg.overlap, &mut planner);
        debug_assert_eq!(left_pass.hop(), hop);
        let mut left = left_pass.column(bin);
        let mut right = short_time_transform(&audio.right, &window, cfg.overlap, &mut planner).column(bin);

        if let Some(amplitude) = cfg.sharpening {
            let odd = odd_symmetric_window(bin_size, amplitude);
            let odd_left = short_time_transform(&audio.left, &odd, cfg.overlap, &mut planner).column(bin);
            let odd_right = short_time_transform(&audio.right, &odd, cfg.overlap, &mut planner).column(bin);
            subtract_in_place(&mut left, &odd_left);
            subtract_in_place(&mut right, &odd_right);
        }
        (left, right)
    };

    for v in left.iter_mut().chain(right.iter_mut()) {
        *v = v.max(0.0);
    }
    align_channels(&mut left, &mut right, cfg.channel_policy);

    let mut spectrum = PitchSpectrum {
        pitch,
        bin_size,
        bin_index: multiplier,
        hop,
        dt: hop as f64 / audio.sample_rate as f64,
        left,
        right,
        peak: 0.0,
    };
    spectrum.recompute_peak();

    log::debug!(
        "Pitch {:3}: bin_size={} bin={} hop={} frames={} peak={:.3}",
        pitch,
        bin_size,
        multiplier,
        hop,
        spectrum.len(),
        spectrum.peak
    );

    Ok(spectrum)
}

fn subtract_in_place(primary: &mut [f32], secondary: &[f32]) {
    for (p, s) in primary.iter_mut().zip(secondary) {
        *p -= s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::ChannelPolicy;
    use crate::audio::window::WindowKind;
    use std::f64::consts::PI;

    fn config() -> AnalysisConfig {
        AnalysisConfig {
            floor_slope: 32.0,
            floor_intercept: 128.0,
            overlap: 0.5,
            base_multiplier: 24,
            multiplier_step: 24,
            pitch_count: 128,
            window: WindowKind::Hann,
            sharpening: Some(0.166),
            channel_policy: ChannelPolicy::Pad,
            workers: 1,
        }
    }

    fn sine(freq: f64, sample_rate: u32, frames: usize, amplitude: f64) -> Vec<i16> {
        (0..frames)
            .map(|i| {
                let t = i as f64 / sample_rate as f64;
                (amplitude * (2.0 * PI * freq * t).sin()).round() as i16
            })
            .collect()
    }

    #[test]
    fn bin_size_is_smallest_above_floor() {
        let cfg = config();
        for pitch in 0..128u8 {
            let res = resolve_bin_size(pitch, 48000, &cfg).unwrap();
            let floor = min_bin_floor(pitch, cfg.floor_slope, cfg.floor_intercept);
            assert!(res.bin_size as f64 >= floor, "pitch {}", pitch);
            if res.multiplier > cfg.base_multiplier {
                let period = 48000.0 / frequency(pitch);
                let previous = (period * (res.multiplier - cfg.multiplier_step) as f64).round();
                assert!(previous < floor, "pitch {} not minimal", pitch);
            }
        }
    }

    #[test]
    fn bin_size_tracks_period() {
        let cfg = config();
        for pitch in [0u8, 33, 60, 69, 100, 127] {
            let res = resolve_bin_size(pitch, 48000, &cfg).unwrap();
            let exact = 48000.0 / frequency(pitch) * res.multiplier as f64;
            assert!((res.bin_size as f64 - exact).abs() <= 0.5);
        }
    }

    #[test]
    fn high_pitches_step_the_multiplier() {
        let cfg = config();
        // 24 periods of pitch 127 is ~92 samples, under the floor of 160
        let res = resolve_bin_size(127, 48000, &cfg).unwrap();
        assert_eq!(res.multiplier, 48);
        let res = resolve_bin_size(60, 48000, &cfg).unwrap();
        assert_eq!(res.multiplier, 24);
    }

    #[test]
    fn bin_size_ignores_analysed_pitch_count() {
        let mut narrow = config();
        narrow.pitch_count = 100;
        let full = resolve_bin_size(99, 48000, &config()).unwrap();
        let limited = resolve_bin_size(99, 48000, &narrow).unwrap();
        assert_eq!(limited, full);
        // floor for pitch 99 is 32 * 29 + 128 = 1056, so 72 periods are needed
        assert_eq!(full.multiplier, 72);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        let err = resolve_bin_size(60, 0, &config()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn zero_step_cannot_converge() {
        let mut cfg = config();
        cfg.base_multiplier = 1;
        cfg.multiplier_step = 0;
        let err = resolve_bin_size(127, 48000, &cfg).unwrap_err();
        assert!(matches!(err, ConvertError::DegenerateBinSize { pitch: 127, .. }));
    }

    #[test]
    fn transform_discards_partial_window() {
        let samples = vec![0i16; 1000];
        let window = generate_window(WindowKind::Hann, 256);
        let stft = short_time_transform(&samples, &window, 0.5, &mut FftPlanner::new());
        assert_eq!(stft.hop(), 128);
        // windows start at 0, 128, ..., 640; one at 768 would end past 1000
        assert_eq!(stft.frame_count(), 6);
        let frames: Vec<Vec<f32>> = stft.collect();
        assert_eq!(frames.len(), 6);
        assert!(frames.iter().all(|f| f.len() == 128));
    }

    #[test]
    fn one_window_plus_partial_tail_is_one_frame() {
        let samples = vec![0i16; 256 + 127];
        let window = generate_window(WindowKind::Hann, 256);
        let stft = short_time_transform(&samples, &window, 0.5, &mut FftPlanner::new());
        assert_eq!(stft.frame_count(), 1);
        assert_eq!(stft.count(), 1);

        assert_eq!(frame_count(256 + 128, 256, 128), 2);
        assert_eq!(frame_count(255, 256, 128), 0);
    }

    #[test]
    fn column_rereads_from_first_frame() {
        let samples = sine(1000.0, 48000, 4800, 16000.0);
        let window = generate_window(WindowKind::Hann, 480);
        let mut stft = short_time_transform(&samples, &window, 0.5, &mut FftPlanner::new());
        let first = stft.column(10);
        assert_eq!(first.len(), stft.frame_count());
        assert_eq!(stft.column(10), first);
    }

    #[test]
    fn transform_is_restartable() {
        let samples = sine(1000.0, 48000, 4096, 10000.0);
        let window = generate_window(WindowKind::Hann, 480);
        let mut stft = short_time_transform(&samples, &window, 0.25, &mut FftPlanner::new());
        let first: Vec<Vec<f32>> = stft.by_ref().collect();
        assert!(stft.next().is_none());
        stft.restart();
        let second: Vec<Vec<f32>> = stft.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn transform_peaks_at_tone_bin() {
        // 10 periods of 1 kHz in a 480-sample window
        let samples = sine(1000.0, 48000, 4800, 16000.0);
        let window = generate_window(WindowKind::Hann, 480);
        let frame = short_time_transform(&samples, &window, 0.5, &mut FftPlanner::new())
            .next()
            .unwrap();
        let argmax = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(argmax, 10);
        // Hann halves the mean gain and the real tone splits across +/- bins
        assert!((frame[10] - 4000.0).abs() < 40.0);
    }

    #[test]
    fn short_input_yields_empty_series() {
        let audio = StereoBuffer {
            left: vec![100; 64],
            right: vec![100; 64],
            sample_rate: 48000,
        };
        let spectrum = analyze_pitch(&audio, 40, &config()).unwrap();
        assert!(spectrum.is_empty());
        assert_eq!(spectrum.peak, 0.0);
    }

    #[test]
    fn tuned_pitch_dominates_distant_pitch() {
        let samples = sine(frequency(60), 48000, 48000, 32767.0);
        let audio = StereoBuffer {
            left: samples.clone(),
            right: samples,
            sample_rate: 48000,
        };
        let cfg = config();
        let tuned = analyze_pitch(&audio, 60, &cfg).unwrap();
        let distant = analyze_pitch(&audio, 20, &cfg).unwrap();
        assert!(tuned.peak > 1000.0);
        assert!(distant.peak < tuned.peak * 1e-3);
        assert_eq!(tuned.left.len(), tuned.right.len());
        assert_eq!(tuned.bin_index, 24);
    }

    #[test]
    fn sharpening_never_raises_magnitudes() {
        let mut samples = sine(frequency(69), 48000, 24000, 8000.0);
        // burst in the second half
        for s in samples.iter_mut().skip(12000).take(600) {
            *s = s.saturating_mul(4);
        }
        let audio = StereoBuffer {
            left: samples.clone(),
            right: samples,
            sample_rate: 48000,
        };
        let mut plain_cfg = config();
        plain_cfg.sharpening = None;
        let plain = analyze_pitch(&audio, 69, &plain_cfg).unwrap();
        let sharp = analyze_pitch(&audio, 69, &config()).unwrap();
        assert_eq!(plain.len(), sharp.len());
        for (p, s) in plain.left.iter().zip(&sharp.left) {
            assert!(*s <= *p + 1e-3);
            assert!(*s >= 0.0);
        }
    }

    #[test]
    fn pitch_above_nyquist_is_silent() {
        let samples = sine(3000.0, 8000, 8000, 20000.0);
        let audio = StereoBuffer {
            left: samples.clone(),
            right: samples,
            sample_rate: 8000,
        };
        // pitch 120 is ~8.4 kHz, beyond the 4 kHz Nyquist limit
        let spectrum = analyze_pitch(&audio, 120, &config()).unwrap();
        assert!(!spectrum.is_empty());
        assert!(spectrum.left.iter().all(|&v| v == 0.0));
        assert_eq!(spectrum.peak, 0.0);
    }
}
