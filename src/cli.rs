use clap::Parser;
use std::path::PathBuf;

use wavemidi::audio::analysis::ChannelPolicy;
use wavemidi::audio::window::WindowKind;
use wavemidi::config::{self, AnalysisConfig, ConvertConfig, FileConfig, ScheduleConfig};
use wavemidi::schedule::velocity::VelocityCurve;
use wavemidi::schedule::SchedulerKind;

#[derive(Parser, Debug)]
#[command(name = "wavemidi", about = "Convert an audio recording into a multi-track MIDI file")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Output MIDI file [default: input with a .mid extension]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file [default: ./wavemidi.toml or ~/.config/wavemidi/config.toml]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Intercept of the minimum bin size line (floor = m * (128 - pitch) + b)
    #[arg(short = 'b', long, default_value_t = config::default_floor_intercept())]
    pub floor_intercept: f64,

    /// Slope of the minimum bin size line
    #[arg(short = 'm', long, default_value_t = config::default_floor_slope())]
    pub floor_slope: f64,

    /// Overlap between analysis windows (0.0-0.99). Higher means more notes per second.
    #[arg(long, default_value_t = config::default_overlap())]
    pub overlap: f64,

    /// Number of velocity-banded tracks (plus one solo track)
    #[arg(short, long, default_value_t = config::default_tracks())]
    pub tracks: usize,

    /// Starting periods-per-window multiplier
    #[arg(long, default_value_t = config::default_base_multiplier())]
    pub base_mult: u32,

    /// Added to the multiplier until the minimum bin size is reached
    #[arg(long, default_value_t = config::default_multiplier_step())]
    pub mult_step: u32,

    /// Skip the odd-window transient sharpening pass
    #[arg(long)]
    pub no_sharpen: bool,

    /// Amplitude of the odd-window sharpening pass
    #[arg(long, default_value_t = config::default_sharpen_amp())]
    pub sharpen_amp: f32,

    /// Number of pitches analysed, starting from pitch 0
    #[arg(short = 'n', long, default_value_t = config::default_pitch_count())]
    pub pitches: usize,

    /// Analysis threads. More threads use more memory.
    #[arg(short = 'j', long, default_value_t = config::default_workers())]
    pub workers: usize,

    /// Ticks per quarter note of the output file
    #[arg(long, default_value_t = config::default_ppqn())]
    pub ppqn: u16,

    /// Tempo of the output file
    #[arg(long, default_value_t = config::default_bpm())]
    pub bpm: f64,

    /// Velocity span divided among the banded tracks
    #[arg(long, default_value_t = config::default_velocity_range())]
    pub velocity_range: f64,

    /// Drop notes whose velocity is at or below this value
    #[arg(long, default_value_t = 0)]
    pub threshold: u8,

    /// Analysis window shape
    #[arg(long, value_enum, default_value_t = WindowKind::Hann)]
    pub window: WindowKind,

    /// Event scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulerKind::Sorted)]
    pub scheduler: SchedulerKind,

    /// Amplitude to velocity mapping
    #[arg(long, value_enum, default_value_t = VelocityCurve::Sqrt)]
    pub velocity_curve: VelocityCurve,

    /// How to reconcile left/right series of different lengths
    #[arg(long, value_enum, default_value_t = ChannelPolicy::Pad)]
    pub channel_policy: ChannelPolicy,

    /// Run both schedulers and fail if they disagree
    #[arg(long)]
    pub cross_check: bool,

    /// Also write the scheduled events as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Plot minimum vs. actual bin size per pitch to an SVG file
    #[arg(long)]
    pub plot_bins: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    /// Fills in values left at their defaults from a config file.
    pub fn merge_file_config(&mut self, cfg: FileConfig) {
        let a = cfg.analysis;
        let s = cfg.schedule;

        if self.floor_intercept == config::default_floor_intercept() { self.floor_intercept = a.floor_intercept; }
        if self.floor_slope == config::default_floor_slope() { self.floor_slope = a.floor_slope; }
        if self.overlap == config::default_overlap() { self.overlap = a.overlap; }
        if self.base_mult == config::default_base_multiplier() { self.base_mult = a.base_multiplier; }
        if self.mult_step == config::default_multiplier_step() { self.mult_step = a.multiplier_step; }
        if !self.no_sharpen { self.no_sharpen = !a.sharpen; }
        if self.sharpen_amp == config::default_sharpen_amp() { self.sharpen_amp = a.sharpen_amp; }
        if self.pitches == config::default_pitch_count() { self.pitches = a.pitch_count; }
        if self.workers == config::default_workers() { self.workers = a.workers; }
        if self.window == WindowKind::default() { self.window = a.window; }
        if self.channel_policy == ChannelPolicy::default() { self.channel_policy = a.channel_policy; }

        if self.tracks == config::default_tracks() { self.tracks = s.tracks; }
        if self.ppqn == config::default_ppqn() { self.ppqn = s.ppqn; }
        if self.bpm == config::default_bpm() { self.bpm = s.bpm; }
        if self.velocity_range == config::default_velocity_range() { self.velocity_range = s.velocity_range; }
        if self.threshold == 0 { self.threshold = s.threshold; }
        if self.scheduler == SchedulerKind::default() { self.scheduler = s.scheduler; }
        if self.velocity_curve == VelocityCurve::default() { self.velocity_curve = s.velocity_curve; }
    }

    pub fn to_config(&self) -> ConvertConfig {
        ConvertConfig {
            analysis: AnalysisConfig {
                floor_slope: self.floor_slope,
                floor_intercept: self.floor_intercept,
                overlap: self.overlap,
                base_multiplier: self.base_mult,
                multiplier_step: self.mult_step,
                pitch_count: self.pitches,
                window: self.window,
                sharpening: (!self.no_sharpen).then_some(self.sharpen_amp),
                channel_policy: self.channel_policy,
                workers: self.workers,
            },
            schedule: ScheduleConfig {
                strategy: self.scheduler,
                track_count: self.tracks,
                velocity_range: self.velocity_range,
                audibility_threshold: self.threshold,
                velocity_curve: self.velocity_curve,
                ticks_per_quarter: self.ppqn,
                bpm: self.bpm,
            },
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.input.with_extension("mid"))
    }
}
