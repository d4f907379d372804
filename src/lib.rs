//! Converts audio recordings into multi-track MIDI by tracking the loudness
//! of every equal-tempered pitch's fundamental over time.

pub mod audio;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod plot;
pub mod schedule;

pub use config::ConvertConfig;
pub use convert::{convert, Conversion};
pub use error::{ConvertError, Result};
