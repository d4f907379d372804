use serde::Deserialize;
use std::path::PathBuf;

use crate::audio::analysis::ChannelPolicy;
use crate::audio::window::WindowKind;
use crate::error::{ConvertError, Result};
use crate::schedule::velocity::VelocityCurve;
use crate::schedule::SchedulerKind;

/// Parameters of the per-pitch spectral analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Slope of the resolution floor line (bins per pitch step below the top).
    pub floor_slope: f64,
    /// Intercept of the resolution floor line.
    pub floor_intercept: f64,
    /// Fraction of each window shared with the next one, in [0, 0.99).
    pub overlap: f64,
    pub base_multiplier: u32,
    pub multiplier_step: u32,
    pub pitch_count: usize,
    pub window: WindowKind,
    /// Amplitude of the odd-symmetric sharpening pass, `None` when disabled.
    pub sharpening: Option<f32>,
    pub channel_policy: ChannelPolicy,
    pub workers: usize,
}

/// Parameters of the event scheduling pass.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub strategy: SchedulerKind,
    /// Number of velocity-banded tracks, not counting the solo track.
    pub track_count: usize,
    /// Velocity span divided evenly among the banded tracks.
    pub velocity_range: f64,
    /// Events with a velocity at or below this value are dropped.
    pub audibility_threshold: u8,
    pub velocity_curve: VelocityCurve,
    pub ticks_per_quarter: u16,
    pub bpm: f64,
}

impl ScheduleConfig {
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_quarter as f64 * self.bpm / 60.0
    }

    pub fn to_ticks(&self, seconds: f64) -> u64 {
        (seconds * self.ticks_per_second()).round().max(0.0) as u64
    }
}

#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub analysis: AnalysisConfig,
    pub schedule: ScheduleConfig,
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        let s = &self.schedule;

        if !(0.0..0.99).contains(&a.overlap) {
            return Err(invalid(format!("overlap {} outside [0, 0.99)", a.overlap)));
        }
        if a.pitch_count == 0 || a.pitch_count > 128 {
            return Err(invalid(format!("pitch count {} outside 1..=128", a.pitch_count)));
        }
        if a.base_multiplier == 0 {
            return Err(invalid("base multiplier must be at least 1".into()));
        }
        if a.workers == 0 {
            return Err(invalid("worker count must be at least 1".into()));
        }
        if let Some(amp) = a.sharpening {
            if !amp.is_finite() || amp < 0.0 {
                return Err(invalid(format!("sharpening amplitude {} must be >= 0", amp)));
            }
        }
        if s.track_count == 0 {
            return Err(invalid("track count must be at least 1".into()));
        }
        if !(s.velocity_range > 0.0) {
            return Err(invalid(format!("velocity range {} must be positive", s.velocity_range)));
        }
        if !(s.bpm > 0.0) {
            return Err(invalid(format!("bpm {} must be positive", s.bpm)));
        }
        if s.ticks_per_quarter == 0 || s.ticks_per_quarter > 0x7FFF {
            return Err(invalid(format!(
                "ticks per quarter note {} outside 1..=32767",
                s.ticks_per_quarter
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> ConvertError {
    ConvertError::InvalidConfig(msg)
}

/// On-disk configuration (`wavemidi.toml`).
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub analysis: FileAnalysisConfig,
    #[serde(default)]
    pub schedule: FileScheduleConfig,
}

#[derive(Debug, Deserialize)]
pub struct FileAnalysisConfig {
    #[serde(default = "default_floor_slope")]
    pub floor_slope: f64,
    #[serde(default = "default_floor_intercept")]
    pub floor_intercept: f64,
    #[serde(default = "default_overlap")]
    pub overlap: f64,
    #[serde(default = "default_base_multiplier")]
    pub base_multiplier: u32,
    #[serde(default = "default_multiplier_step")]
    pub multiplier_step: u32,
    #[serde(default = "default_pitch_count")]
    pub pitch_count: usize,
    #[serde(default)]
    pub window: WindowKind,
    #[serde(default = "default_sharpen")]
    pub sharpen: bool,
    #[serde(default = "default_sharpen_amp")]
    pub sharpen_amp: f32,
    #[serde(default)]
    pub channel_policy: ChannelPolicy,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Deserialize)]
pub struct FileScheduleConfig {
    #[serde(default)]
    pub scheduler: SchedulerKind,
    #[serde(default = "default_tracks")]
    pub tracks: usize,
    #[serde(default = "default_velocity_range")]
    pub velocity_range: f64,
    #[serde(default)]
    pub threshold: u8,
    #[serde(default)]
    pub velocity_curve: VelocityCurve,
    #[serde(default = "default_ppqn")]
    pub ppqn: u16,
    #[serde(default = "default_bpm")]
    pub bpm: f64,
}

impl Default for FileAnalysisConfig {
    fn default() -> Self {
        Self {
            floor_slope: default_floor_slope(),
            floor_intercept: default_floor_intercept(),
            overlap: default_overlap(),
            base_multiplier: default_base_multiplier(),
            multiplier_step: default_multiplier_step(),
            pitch_count: default_pitch_count(),
            window: WindowKind::default(),
            sharpen: default_sharpen(),
            sharpen_amp: default_sharpen_amp(),
            channel_policy: ChannelPolicy::default(),
            workers: default_workers(),
        }
    }
}

impl Default for FileScheduleConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerKind::default(),
            tracks: default_tracks(),
            velocity_range: default_velocity_range(),
            threshold: 0,
            velocity_curve: VelocityCurve::default(),
            ppqn: default_ppqn(),
            bpm: default_bpm(),
        }
    }
}

pub fn default_floor_slope() -> f64 { 32.0 }
pub fn default_floor_intercept() -> f64 { 128.0 }
pub fn default_overlap() -> f64 { 0.5 }
pub fn default_base_multiplier() -> u32 { 24 }
pub fn default_multiplier_step() -> u32 { 24 }
pub fn default_pitch_count() -> usize { 128 }
pub fn default_sharpen() -> bool { true }
pub fn default_sharpen_amp() -> f32 { 0.166 }
pub fn default_tracks() -> usize { 31 }
pub fn default_velocity_range() -> f64 { 82.0 }
pub fn default_ppqn() -> u16 { 30000 }
pub fn default_bpm() -> f64 { 120.0 }

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| (n.get() / 2).max(1))
        .unwrap_or(1)
}

pub fn load_config(path: &PathBuf) -> Option<FileConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(err) => {
            log::warn!("Ignoring malformed config {}: {}", path.display(), err);
            None
        }
    }
}
