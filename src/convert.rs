use indicatif::ProgressBar;

use crate::audio::analysis::{analyze_all, normalize, Normalization};
use crate::audio::decode::StereoBuffer;
use crate::config::ConvertConfig;
use crate::error::Result;
use crate::schedule::track::Track;
use crate::schedule::{cross_check, schedule};

#[derive(Debug)]
pub struct Conversion {
    pub tracks: Vec<Track>,
    pub normalization: Normalization,
}

/// Analysis, normalization and scheduling for a whole buffer.
///
/// Scheduling only starts once every pitch has been analysed, since the
/// normalization scalar depends on all of them.
pub fn convert(
    audio: &StereoBuffer,
    cfg: &ConvertConfig,
    verify: bool,
    progress: &ProgressBar,
) -> Result<Conversion> {
    cfg.validate()?;

    let mut spectra = analyze_all(audio, &cfg.analysis, progress)?;
    progress.finish_and_clear();

    let normalization = normalize(&mut spectra);

    let tracks = if verify {
        cross_check(&spectra, &cfg.schedule)?
    } else {
        schedule(&spectra, &cfg.schedule)
    };

    Ok(Conversion {
        tracks,
        normalization,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::ChannelPolicy;
    use crate::audio::pitch::frequency;
    use crate::audio::window::WindowKind;
    use crate::config::{AnalysisConfig, ScheduleConfig};
    use crate::error::ConvertError;
    use crate::schedule::velocity::VelocityCurve;
    use crate::schedule::{SchedulerKind, SOLO_TRACK};
    use std::f64::consts::PI;

    fn config(pitch_count: usize) -> ConvertConfig {
        ConvertConfig {
            analysis: AnalysisConfig {
                floor_slope: 32.0,
                floor_intercept: 128.0,
                overlap: 0.5,
                base_multiplier: 24,
                multiplier_step: 24,
                pitch_count,
                window: WindowKind::Hann,
                sharpening: Some(0.166),
                channel_policy: ChannelPolicy::Pad,
                workers: 2,
            },
            schedule: ScheduleConfig {
                strategy: SchedulerKind::Sorted,
                track_count: 31,
                velocity_range: 82.0,
                audibility_threshold: 0,
                velocity_curve: VelocityCurve::Sqrt,
                ticks_per_quarter: 30000,
                bpm: 120.0,
            },
        }
    }

    fn tone(pitch: u8, seconds: f64, amplitude: f64) -> StereoBuffer {
        let frames = (48000.0 * seconds) as usize;
        let left: Vec<i16> = (0..frames)
            .map(|i| {
                let t = i as f64 / 48000.0;
                (amplitude * (2.0 * PI * frequency(pitch) * t).sin()).round() as i16
            })
            .collect();
        StereoBuffer {
            right: left.clone(),
            left,
            sample_rate: 48000,
        }
    }

    #[test]
    fn silent_stereo_emits_no_notes() {
        let audio = StereoBuffer {
            left: vec![0; 48000],
            right: vec![0; 48000],
            sample_rate: 48000,
        };
        let result = convert(&audio, &config(4), true, &ProgressBar::hidden()).unwrap();
        assert_eq!(result.normalization, Normalization::Silent);
        assert_eq!(result.tracks.len(), 32);
        assert!(result.tracks.iter().all(|t| t.note_on_count() == 0));
    }

    #[test]
    fn tone_lands_on_its_pitch() {
        let audio = tone(69, 1.0, 30000.0);
        let result = convert(&audio, &config(80), true, &ProgressBar::hidden()).unwrap();
        assert!(matches!(result.normalization, Normalization::Scaled(s) if s > 0.0));

        // the loudest right-channel note is the tone's own pitch
        let loudest = result.tracks[SOLO_TRACK]
            .events
            .iter()
            .filter(|e| e.is_note_on)
            .max_by_key(|e| e.velocity)
            .map(|e| (e.pitch, e.velocity));
        assert_eq!(loudest, Some((69, 127)));

        for track in &result.tracks {
            let sum: u64 = track.events.iter().map(|e| e.delta_ticks as u64).sum();
            assert_eq!(sum, track.cursor());
        }
    }

    #[test]
    fn invalid_config_fails_before_analysis() {
        let mut cfg = config(4);
        cfg.schedule.track_count = 0;
        let err = convert(&tone(60, 0.1, 1000.0), &cfg, false, &ProgressBar::hidden()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidConfig(_)));
    }

    #[test]
    fn failed_conversion_is_reportable() {
        // one period per window never reaches the floor for high pitches
        let mut cfg = config(128);
        cfg.analysis.multiplier_step = 0;
        cfg.analysis.base_multiplier = 1;
        let result = convert(&tone(60, 0.1, 1000.0), &cfg, false, &ProgressBar::hidden());
        let err = result.unwrap_err();
        assert!(matches!(err, ConvertError::DegenerateBinSize { step: 0, .. }));
        assert!(err.to_string().starts_with("Bin size search for pitch"));
    }

    #[test]
    fn conversion_debug_lists_outcome() {
        let audio = StereoBuffer {
            left: vec![0; 4800],
            right: vec![0; 4800],
            sample_rate: 48000,
        };
        let result = convert(&audio, &config(2), false, &ProgressBar::hidden()).unwrap();
        assert!(format!("{:?}", result).contains("Silent"));
    }
}
