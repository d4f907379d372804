/// Reference pitch index for A4.
const A4_PITCH: f64 = 69.0;
const A4_HZ: f64 = 440.0;
/// Upper reference of the floor line, the full MIDI range regardless of how
/// many pitches are analysed.
const FLOOR_TOP: f64 = 128.0;

/// Equal-tempered frequency of a pitch index in Hz.
pub fn frequency(pitch: u8) -> f64 {
    A4_HZ * 2f64.powf((pitch as f64 - A4_PITCH) / 12.0)
}

/// Minimum analysis window length for a pitch.
///
/// Linear in the distance from the top of the analysed range, so low pitches
/// get long windows (frequency resolution) and high pitches short ones
/// (time resolution).
pub fn min_bin_floor(pitch: u8, slope: f64, intercept: f64) -> f64 {
    slope * (FLOOR_TOP - pitch as f64) + intercept
}
