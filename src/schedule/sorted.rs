use std::collections::BTreeMap;

use super::track::Track;
use super::{new_tracks, route, sample_at, sample_time, Side};
use crate::audio::spectral::PitchSpectrum;
use crate::config::ScheduleConfig;

#[derive(Debug, Clone, Copy)]
struct Pending {
    time: f64,
    pitch: u8,
    velocity: u8,
    is_note_on: bool,
}

/// Precompute-and-sort scheduling.
///
/// Every audible sample becomes a note-on at its onset and a note-off one
/// step later. Each track's list is stable-sorted by time, so equal times
/// keep insertion order (ascending pitch, then sample order).
pub fn schedule_sorted(spectra: &BTreeMap<u8, PitchSpectrum>, cfg: &ScheduleConfig) -> Vec<Track> {
    let mut pending: Vec<Vec<Pending>> = vec![Vec::new(); cfg.track_count + 1];

    for spectrum in spectra.values() {
        let pitch = spectrum.pitch;
        for k in 0..spectrum.len() {
            let start = sample_time(spectrum.dt, k);
            let end = sample_time(spectrum.dt, k + 1);

            let samples = [
                (Side::Left, sample_at(&spectrum.left, k)),
                (Side::Right, sample_at(&spectrum.right, k)),
            ];
            for (side, amplitude) in samples {
                if let Some((track, velocity)) = route(cfg, side, amplitude, pitch) {
                    pending[track].push(Pending {
                        time: start,
                        pitch,
                        velocity,
                        is_note_on: true,
                    });
                    pending[track].push(Pending {
                        time: end,
                        pitch,
                        velocity: 0,
                        is_note_on: false,
                    });
                }
            }
        }
    }

    let mut tracks = new_tracks(cfg);
    for (track, mut events) in tracks.iter_mut().zip(pending) {
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        for e in events {
            let tick = cfg.to_ticks(e.time);
            if e.is_note_on {
                track.note_on(tick, e.pitch, e.velocity);
            } else {
                track.note_off(tick, e.pitch);
            }
        }
    }
    tracks
}
