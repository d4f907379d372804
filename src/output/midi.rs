//! Standard MIDI File export.
//!
//! Track 0 (the solo track) opens with tempo and controller setup: all
//! controllers reset, channel 0 panned hard left and channel 1 hard right.

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::Path;

use crate::config::ScheduleConfig;
use crate::error::{ConvertError, Result};
use crate::schedule::track::Track;
use crate::schedule::{BAND_CHANNEL, SOLO_CHANNEL};

const CC_PAN: u8 = 10;
const CC_RESET_ALL: u8 = 121;
const MAX_DELTA: u32 = 0x0FFF_FFFF;
const MAX_TEMPO: u32 = 0x00FF_FFFF;

/// Builds an in-memory SMF (format 1) from scheduled tracks.
pub fn build_smf<'a>(tracks: &[Track], cfg: &ScheduleConfig) -> Result<Smf<'a>> {
    if cfg.ticks_per_quarter == 0 || cfg.ticks_per_quarter > 0x7FFF {
        return Err(ConvertError::Midi(format!(
            "ticks per quarter note {} does not fit the header",
            cfg.ticks_per_quarter
        )));
    }
    let header = Header::new(
        Format::Parallel,
        Timing::Metrical(u15::from(cfg.ticks_per_quarter)),
    );
    let mut smf = Smf::new(header);

    for track in tracks {
        let mut events: Vec<TrackEvent<'a>> = Vec::with_capacity(track.events.len() + 5);
        if track.index == 0 {
            events.extend(setup_events(cfg.bpm)?);
        }

        for e in &track.events {
            if e.delta_ticks > MAX_DELTA {
                return Err(ConvertError::Midi(format!(
                    "track {}: delta of {} ticks exceeds the SMF limit",
                    track.index, e.delta_ticks
                )));
            }
            let message = if e.is_note_on {
                MidiMessage::NoteOn {
                    key: u7::from(e.pitch),
                    vel: u7::from(e.velocity),
                }
            } else {
                MidiMessage::NoteOff {
                    key: u7::from(e.pitch),
                    vel: u7::from(0),
                }
            };
            events.push(TrackEvent {
                delta: u28::from(e.delta_ticks),
                kind: TrackEventKind::Midi {
                    channel: u4::from(e.channel),
                    message,
                },
            });
        }

        events.push(TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        smf.tracks.push(events);
    }

    Ok(smf)
}

fn setup_events<'a>(bpm: f64) -> Result<Vec<TrackEvent<'a>>> {
    let tempo = (60_000_000.0 / bpm).round();
    if !(tempo >= 1.0 && tempo <= MAX_TEMPO as f64) {
        return Err(ConvertError::Midi(format!("bpm {} is out of range", bpm)));
    }

    let controller = |channel: u8, controller: u8, value: u8| TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Midi {
            channel: u4::from(channel),
            message: MidiMessage::Controller {
                controller: u7::from(controller),
                value: u7::from(value),
            },
        },
    };

    Ok(vec![
        TrackEvent {
            delta: u28::from(0),
            kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo as u32))),
        },
        controller(BAND_CHANNEL, CC_RESET_ALL, 0),
        controller(BAND_CHANNEL, CC_PAN, 0),
        controller(SOLO_CHANNEL, CC_PAN, 127),
    ])
}

pub fn write_midi(path: &Path, tracks: &[Track], cfg: &ScheduleConfig) -> Result<()> {
    let smf = build_smf(tracks, cfg)?;
    smf.save(path)?;
    log::info!("Wrote {} tracks to {}", smf.tracks.len(), path.display());
    Ok(())
}
