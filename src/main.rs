mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;

use cli::Cli;
use wavemidi::audio::analysis::Normalization;
use wavemidi::{audio, config, convert, output, plot};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect wavemidi.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = PathBuf::from("wavemidi.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("wavemidi").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("wavemidi").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            cli.merge_file_config(cfg);
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let cfg = cli.to_config();
    cfg.validate().context("Invalid parameters")?;
    let output = cli.output_path();

    log::info!("wavemidi - audio to MIDI converter");
    log::info!("Input: {}", cli.input.display());
    log::info!("Output: {}", output.display());
    log::info!(
        "Pitches: {}, tracks: {}+1, overlap: {:.2}, sharpening: {}",
        cfg.analysis.pitch_count,
        cfg.schedule.track_count,
        cfg.analysis.overlap,
        cfg.analysis
            .sharpening
            .map_or_else(|| "off".to_string(), |amp| format!("{:.3}", amp))
    );

    // 1. Decode audio
    log::info!("Decoding audio...");
    let audio = audio::decode::decode_audio(&cli.input)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;

    if let Some(ref path) = cli.plot_bins {
        plot::plot_bin_sizes(path, audio.sample_rate, &cfg.analysis)
            .with_context(|| format!("Failed to plot bin sizes to {}", path.display()))?;
    }

    // 2. Analyze, normalize and schedule
    let pb = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(cfg.analysis.pitch_count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} pitches ({eta} remaining)")
                .context("Invalid progress template")?
                .progress_chars("=>-"),
        );
        pb
    };

    let conversion = convert::convert(&audio, &cfg, cli.cross_check, &pb)?;
    if conversion.normalization == Normalization::Silent {
        log::warn!("Input is silent; the MIDI file will contain no notes");
    }

    // 3. Write outputs
    output::midi::write_midi(&output, &conversion.tracks, &cfg.schedule)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    if let Some(ref path) = cli.json {
        output::json::write_json(
            path,
            &conversion.tracks,
            cfg.schedule.ticks_per_quarter,
            cfg.schedule.bpm,
        )
        .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    log::info!("Done! Output: {}", output.display());
    Ok(())
}
