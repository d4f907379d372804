//! Analysis windows.
//!
//! The even windows are periodic (DFT-even), matching how spectrogram tools
//! lay them over FFT frames. The odd-symmetric window drives the sharpening
//! pass.

use serde::Deserialize;
use std::f64::consts::PI;

/// Shape parameter of the odd-symmetric window.
const ODD_SHAPE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WindowKind {
    #[default]
    Hann,
    Hamming,
    Blackman,
}

pub fn generate_window(kind: WindowKind, size: usize) -> Vec<f32> {
    if size == 0 {
        return Vec::new();
    }
    let n = size as f64;
    (0..size)
        .map(|i| {
            let x = 2.0 * PI * i as f64 / n;
            let w = match kind {
                WindowKind::Hann => 0.5 - 0.5 * x.cos(),
                WindowKind::Hamming => 0.54 - 0.46 * x.cos(),
                WindowKind::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            };
            w as f32
        })
        .collect()
}

/// Antisymmetric window `u * exp(-b^2 u^2)` sampled from `u = 1` down towards
/// `u = -1`, peak-normalized and scaled by `amplitude`.
pub fn odd_symmetric_window(size: usize, amplitude: f32) -> Vec<f32> {
    if size == 0 {
        return Vec::new();
    }
    let n = size as f64;
    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let u = (n - 2.0 * i as f64) / n;
            u * (-(ODD_SHAPE * ODD_SHAPE) * u * u).exp()
        })
        .collect();
    let peak = raw.iter().copied().fold(f64::MIN, f64::max);
    if peak <= 0.0 {
        return vec![0.0; size];
    }
    raw.iter()
        .map(|&w| (w / peak * amplitude as f64) as f32)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_is_periodic() {
        let w = generate_window(WindowKind::Hann, 8);
        assert_eq!(w.len(), 8);
        assert!(w[0].abs() < 1e-7);
        assert!((w[4] - 1.0).abs() < 1e-6);
        // periodic: w[i] == w[n - i]
        assert!((w[1] - w[7]).abs() < 1e-6);
    }

    #[test]
    fn hamming_and_blackman_endpoints() {
        let h = generate_window(WindowKind::Hamming, 16);
        assert!((h[0] - 0.08).abs() < 1e-6);
        let b = generate_window(WindowKind::Blackman, 16);
        assert!(b[0].abs() < 1e-6);
        assert!((b[8] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn odd_window_is_antisymmetric_and_normalized() {
        let w = odd_symmetric_window(64, 1.0);
        let max = w.iter().copied().fold(f32::MIN, f32::max);
        assert!((max - 1.0).abs() < 1e-6);
        // sample i sits at u = (n - 2i)/n, its mirror at index n - i
        for i in 1..32 {
            assert!((w[i] + w[64 - i]).abs() < 1e-6, "index {}", i);
        }
        assert!(w[32].abs() < 1e-7);
    }

    #[test]
    fn odd_window_scales_with_amplitude() {
        let w = odd_symmetric_window(100, 0.166);
        let max = w.iter().copied().fold(f32::MIN, f32::max);
        assert!((max - 0.166).abs() < 1e-6);
    }

    #[test]
    fn empty_windows() {
        assert!(generate_window(WindowKind::Hann, 0).is_empty());
        assert!(odd_symmetric_window(0, 1.0).is_empty());
    }
}
