use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::schedule::track::Track;

#[derive(Serialize)]
struct Dump<'a> {
    ticks_per_quarter: u16,
    bpm: f64,
    tracks: &'a [Track],
}

/// Writes the scheduled tracks as pretty-printed JSON for inspection.
pub fn write_json(path: &Path, tracks: &[Track], ticks_per_quarter: u16, bpm: f64) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    let dump = Dump {
        ticks_per_quarter,
        bpm,
        tracks,
    };
    serde_json::to_writer_pretty(&mut writer, &dump).map_err(|e| ConvertError::Io(e.into()))?;
    writer.flush()?;
    log::info!("Wrote event dump to {}", path.display());
    Ok(())
}
