use serde::Deserialize;

pub const MAX_VELOCITY: u8 = 127;

/// Mapping from normalized amplitude to note velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VelocityCurve {
    /// `sqrt(amplitude) * 128`, a rough loudness curve.
    #[default]
    Sqrt,
    /// Square-root curve attenuated towards low pitches.
    PitchWeighted,
}

impl VelocityCurve {
    pub fn velocity(self, amplitude: f32, pitch: u8) -> u8 {
        let base = (amplitude.max(0.0) as f64).sqrt() * 128.0;
        let scaled = match self {
            VelocityCurve::Sqrt => base,
            VelocityCurve::PitchWeighted => base * pitch_weight(pitch),
        };
        // NaN casts to 0
        scaled.round().clamp(0.0, MAX_VELOCITY as f64) as u8
    }
}

/// Smoothstep-like gain, 0.2 at the bottom of the range rising to ~1.0 at
/// the top.
fn pitch_weight(pitch: u8) -> f64 {
    let x = pitch as f64 / 128.0;
    x.powf(1.8) * (3.0 - 2.0 * x) / 1.25 + 0.2
}

/// Banded track (1-based) for a left-channel velocity.
pub fn band_track(velocity: u8, velocity_range: f64, track_count: usize) -> usize {
    let width = velocity_range / track_count as f64;
    let band = (velocity as f64 / width).floor() as usize + 1;
    band.clamp(1, track_count)
}
