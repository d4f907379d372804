use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

use crate::audio::pitch::min_bin_floor;
use crate::audio::spectral::resolve_bin_size;
use crate::config::AnalysisConfig;
use crate::error::{ConvertError, Result};

fn plot_error(err: impl Display) -> ConvertError {
    ConvertError::Plot(err.to_string())
}

/// Resolution floor and converged bin size for every analysed pitch.
pub fn bin_size_curves(sample_rate: u32, cfg: &AnalysisConfig) -> Result<Vec<(u8, f64, usize)>> {
    (0..cfg.pitch_count)
        .map(|p| {
            let pitch = p as u8;
            let floor = min_bin_floor(pitch, cfg.floor_slope, cfg.floor_intercept);
            let res = resolve_bin_size(pitch, sample_rate, cfg)?;
            Ok((pitch, floor, res.bin_size))
        })
        .collect()
}

/// Renders floor vs. actual bin size per pitch as an SVG line chart.
pub fn plot_bin_sizes(path: &Path, sample_rate: u32, cfg: &AnalysisConfig) -> Result<()> {
    let curves = bin_size_curves(sample_rate, cfg)?;
    let y_max = curves
        .iter()
        .map(|&(_, floor, bin)| floor.max(bin as f64))
        .fold(1.0f64, f64::max)
        * 1.05;

    let root = SVGBackend::new(path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Bin size per pitch @ {} Hz", sample_rate),
            ("sans-serif", 20),
        )
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..cfg.pitch_count as f64, 0f64..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Pitch")
        .y_desc("Samples")
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(
            curves.iter().map(|&(p, _, bin)| (p as f64, bin as f64)),
            BLUE.stroke_width(2),
        ))
        .map_err(plot_error)?
        .label("bin size")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

    chart
        .draw_series(LineSeries::new(
            curves.iter().map(|&(p, floor, _)| (p as f64, floor)),
            RED.stroke_width(1),
        ))
        .map_err(plot_error)?
        .label("floor")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    log::info!("Wrote bin size plot to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analysis::ChannelPolicy;
    use crate::audio::window::WindowKind;

    #[test]
    fn curves_cover_every_pitch() {
        let cfg = AnalysisConfig {
            floor_slope: 32.0,
            floor_intercept: 128.0,
            overlap: 0.5,
            base_multiplier: 24,
            multiplier_step: 24,
            pitch_count: 128,
            window: WindowKind::Hann,
            sharpening: None,
            channel_policy: ChannelPolicy::Pad,
            workers: 1,
        };
        let curves = bin_size_curves(48000, &cfg).unwrap();
        assert_eq!(curves.len(), 128);
        assert!(curves.iter().all(|&(_, floor, bin)| bin as f64 >= floor));
    }

    #[test]
    fn unwritable_path_is_a_plot_error() {
        let cfg = AnalysisConfig {
            floor_slope: 32.0,
            floor_intercept: 128.0,
            overlap: 0.5,
            base_multiplier: 24,
            multiplier_step: 24,
            pitch_count: 12,
            window: WindowKind::Hann,
            sharpening: None,
            channel_policy: ChannelPolicy::Pad,
            workers: 1,
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("bins.svg");
        let err = plot_bin_sizes(&path, 48000, &cfg).unwrap_err();
        assert!(matches!(err, ConvertError::Plot(_)));
    }
}
