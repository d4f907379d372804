//! Turns per-pitch magnitude series into time-ordered, multi-track events.
//!
//! Track 0 is the solo track and carries the right channel on MIDI channel 1.
//! Tracks `1..=track_count` carry the left channel on MIDI channel 0, banded
//! by velocity.
//!
//! Sample `k` of a pitch sounds from `sample_time(dt, k)` to
//! `sample_time(dt, k + 1)`. Both strategies derive every timestamp from that
//! closed form, so they agree exactly rather than within accumulated
//! rounding.

pub mod merge;
pub mod sorted;
pub mod track;
pub mod velocity;

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::audio::spectral::PitchSpectrum;
use crate::config::ScheduleConfig;
use crate::error::{ConvertError, Result};
use track::Track;
use velocity::band_track;

pub const SOLO_TRACK: usize = 0;
pub const SOLO_CHANNEL: u8 = 1;
pub const BAND_CHANNEL: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerKind {
    /// Precompute every event, then stable-sort each track by time.
    #[default]
    Sorted,
    /// Stream events through a k-way merge over the pitches.
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

/// Onset of sample `k`, centered half a hop into the series.
pub fn sample_time(dt: f64, k: usize) -> f64 {
    dt * 0.5 + k as f64 * dt
}

pub(crate) fn new_tracks(cfg: &ScheduleConfig) -> Vec<Track> {
    (0..=cfg.track_count)
        .map(|i| {
            let channel = if i == SOLO_TRACK { SOLO_CHANNEL } else { BAND_CHANNEL };
            Track::new(i, channel)
        })
        .collect()
}

/// Destination track and velocity of one sample, `None` when inaudible.
pub(crate) fn route(cfg: &ScheduleConfig, side: Side, amplitude: f32, pitch: u8) -> Option<(usize, u8)> {
    let velocity = cfg.velocity_curve.velocity(amplitude, pitch);
    if velocity <= cfg.audibility_threshold {
        return None;
    }
    let track = match side {
        Side::Right => SOLO_TRACK,
        Side::Left => band_track(velocity, cfg.velocity_range, cfg.track_count),
    };
    Some((track, velocity))
}

pub(crate) fn sample_at(series: &[f32], k: usize) -> f32 {
    series.get(k).copied().unwrap_or(0.0)
}

/// Schedules with the configured strategy.
pub fn schedule(spectra: &BTreeMap<u8, PitchSpectrum>, cfg: &ScheduleConfig) -> Vec<Track> {
    log::info!("Scheduling events ({:?})...", cfg.strategy);
    let tracks = match cfg.strategy {
        SchedulerKind::Sorted => sorted::schedule_sorted(spectra, cfg),
        SchedulerKind::Merge => merge::schedule_merge(spectra, cfg),
    };
    for t in &tracks {
        log::debug!("Track {:2}: {} events, ends at tick {}", t.index, t.events.len(), t.cursor());
    }
    let notes: usize = tracks.iter().map(|t| t.note_on_count()).sum();
    log::info!("Scheduled {} notes across {} tracks", notes, tracks.len());
    tracks
}

/// Runs both strategies and fails on the first diverging event.
pub fn cross_check(spectra: &BTreeMap<u8, PitchSpectrum>, cfg: &ScheduleConfig) -> Result<Vec<Track>> {
    let sorted = sorted::schedule_sorted(spectra, cfg);
    let merged = merge::schedule_merge(spectra, cfg);

    for (a, b) in sorted.iter().zip(&merged) {
        let first_diff = a
            .events
            .iter()
            .zip(&b.events)
            .position(|(x, y)| x != y)
            .or_else(|| (a.events.len() != b.events.len()).then(|| a.events.len().min(b.events.len())));
        if let Some(index) = first_diff {
            return Err(ConvertError::SchedulerMismatch {
                track: a.index,
                index,
            });
        }
    }
    log::info!("Sorted and merge schedulers agree");
    Ok(sorted)
}
