use std::collections::BTreeMap;

use super::track::Track;
use super::{new_tracks, route, sample_at, sample_time, Side};
use crate::audio::spectral::PitchSpectrum;
use crate::config::ScheduleConfig;

/// One pitch's position in the merge.
struct Lane<'a> {
    spectrum: &'a PitchSpectrum,
    next: usize,
    /// Absolute time of the next sample; `INFINITY` once done. The time
    /// remaining for this lane is `deadline - elapsed`.
    deadline: f64,
}

impl Lane<'_> {
    fn is_done(&self) -> bool {
        self.deadline == f64::INFINITY
    }
}

/// A sample popped from the merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeStep {
    pub pitch: u8,
    pub sample: usize,
    pub time: f64,
    pub left: f32,
    pub right: f32,
}

/// Chronological k-way merge over every pitch's samples.
///
/// Each series is extended by one terminal zero sample, so every lane yields
/// `len + 1` steps and is then marked done. Equal times resolve to the lowest
/// pitch.
pub struct KWayMerge<'a> {
    lanes: Vec<Lane<'a>>,
    done: usize,
    elapsed: f64,
}

impl<'a> KWayMerge<'a> {
    pub fn new(spectra: &'a BTreeMap<u8, PitchSpectrum>) -> Self {
        let lanes = spectra
            .values()
            .map(|spectrum| Lane {
                spectrum,
                next: 0,
                deadline: sample_time(spectrum.dt, 0),
            })
            .collect();
        Self {
            lanes,
            done: 0,
            elapsed: 0.0,
        }
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn remaining_lanes(&self) -> usize {
        self.lanes.len() - self.done
    }
}

impl Iterator for KWayMerge<'_> {
    type Item = MergeStep;

    fn next(&mut self) -> Option<MergeStep> {
        if self.done == self.lanes.len() {
            return None;
        }

        // Lanes are in pitch order and min_by keeps the first of equal keys.
        let (index, _) = self
            .lanes
            .iter()
            .enumerate()
            .filter(|(_, lane)| !lane.is_done())
            .min_by(|(_, a), (_, b)| a.deadline.total_cmp(&b.deadline))?;

        let lane = &mut self.lanes[index];
        let spectrum = lane.spectrum;
        let sample = lane.next;
        self.elapsed = lane.deadline;

        let step = MergeStep {
            pitch: spectrum.pitch,
            sample,
            time: lane.deadline,
            left: sample_at(&spectrum.left, sample),
            right: sample_at(&spectrum.right, sample),
        };

        lane.next += 1;
        if sample >= spectrum.len() {
            lane.deadline = f64::INFINITY;
            self.done += 1;
        } else {
            lane.deadline = sample_time(spectrum.dt, sample + 1);
        }

        Some(step)
    }
}

/// Streaming k-way merge scheduling.
///
/// At each step the pitch's previous note (if any) is released on the track
/// it was played on, then the current sample is played if audible.
pub fn schedule_merge(spectra: &BTreeMap<u8, PitchSpectrum>, cfg: &ScheduleConfig) -> Vec<Track> {
    let mut tracks = new_tracks(cfg);
    let mut sounding_left: BTreeMap<u8, usize> = BTreeMap::new();
    let mut sounding_right: BTreeMap<u8, usize> = BTreeMap::new();

    let mut merge = KWayMerge::new(spectra);
    for step in merge.by_ref() {
        let tick = cfg.to_ticks(step.time);

        let sides = [
            (Side::Left, step.left, &mut sounding_left),
            (Side::Right, step.right, &mut sounding_right),
        ];
        for (side, amplitude, sounding) in sides {
            if let Some(track) = sounding.remove(&step.pitch) {
                tracks[track].note_off(tick, step.pitch);
            }
            if let Some((track, velocity)) = route(cfg, side, amplitude, step.pitch) {
                tracks[track].note_on(tick, step.pitch, velocity);
                sounding.insert(step.pitch, track);
            }
        }
    }

    debug_assert_eq!(merge.remaining_lanes(), 0);
    debug_assert!(sounding_left.is_empty() && sounding_right.is_empty());
    log::debug!("Merge finished at {:.3}s", merge.elapsed());
    tracks
}
