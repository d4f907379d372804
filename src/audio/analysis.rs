use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::decode::StereoBuffer;
use super::spectral::{analyze_pitch, PitchSpectrum};
use crate::config::AnalysisConfig;
use crate::error::{ConvertError, Result};

/// How to reconcile left/right series of different lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelPolicy {
    /// Extend the shorter channel with trailing zeros.
    #[default]
    Pad,
    /// Cut the longer channel to the shorter length.
    Truncate,
}

/// Outcome of global normalization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// Every magnitude was divided by this scalar.
    Scaled(f32),
    /// The global maximum was zero; all magnitudes are zero.
    Silent,
}

pub fn align_channels(left: &mut Vec<f32>, right: &mut Vec<f32>, policy: ChannelPolicy) {
    if left.len() == right.len() {
        return;
    }
    log::debug!(
        "Channel length mismatch ({} vs {}), applying {:?}",
        left.len(),
        right.len(),
        policy
    );
    match policy {
        ChannelPolicy::Pad => {
            let len = left.len().max(right.len());
            left.resize(len, 0.0);
            right.resize(len, 0.0);
        }
        ChannelPolicy::Truncate => {
            let len = left.len().min(right.len());
            left.truncate(len);
            right.truncate(len);
        }
    }
}

/// Runs the per-pitch analysis on a pool of `cfg.workers` threads.
///
/// Any failing pitch aborts the whole batch.
pub fn analyze_all(
    audio: &StereoBuffer,
    cfg: &AnalysisConfig,
    progress: &ProgressBar,
) -> Result<BTreeMap<u8, PitchSpectrum>> {
    if audio.frames() == 0 {
        return Err(ConvertError::EmptyInput);
    }
    if audio.sample_rate == 0 {
        return Err(ConvertError::InvalidConfig("sample rate must be positive".into()));
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(cfg.workers)
        .build()
        .map_err(|e| ConvertError::InvalidConfig(format!("worker pool: {}", e)))?;

    log::info!(
        "Analyzing {} pitches on {} worker(s)...",
        cfg.pitch_count,
        cfg.workers
    );

    pool.install(|| {
        (0..cfg.pitch_count)
            .into_par_iter()
            .map(|p| {
                let pitch = p as u8;
                let spectrum = analyze_pitch(audio, pitch, cfg);
                progress.inc(1);
                spectrum.map(|s| (pitch, s))
            })
            .collect()
    })
}

/// Divides every magnitude by the global maximum.
///
/// The maximum is reduced sequentially from the per-pitch peaks before any
/// rescaling starts; rescaling then runs in parallel per pitch.
pub fn normalize(spectra: &mut BTreeMap<u8, PitchSpectrum>) -> Normalization {
    let scalar = spectra.values().map(|s| s.peak).fold(0.0f32, f32::max);

    if !(scalar > 0.0) {
        log::warn!("All channels are silent; every velocity will be zero");
        spectra.par_iter_mut().for_each(|(_, s)| {
            s.left.iter_mut().chain(s.right.iter_mut()).for_each(|v| *v = 0.0);
            s.peak = 0.0;
        });
        return Normalization::Silent;
    }

    log::info!("Normalizing by global maximum {:.4}", scalar);
    spectra.par_iter_mut().for_each(|(_, s)| {
        for v in s.left.iter_mut().chain(s.right.iter_mut()) {
            *v = (*v / scalar).min(1.0);
        }
        s.recompute_peak();
    });

    Normalization::Scaled(scalar)
}
