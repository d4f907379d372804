use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Decoded audio contains no frames")]
    EmptyInput,

    #[error(
        "Bin size search for pitch {pitch} cannot reach floor {floor} \
         (bin size {bin_size}, multiplier step {step})"
    )]
    DegenerateBinSize {
        pitch: u8,
        bin_size: usize,
        floor: f64,
        step: u32,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Schedulers disagree on track {track} at event {index}")]
    SchedulerMismatch { track: usize, index: usize },

    #[error("Failed to decode audio: {0}")]
    Decode(#[from] symphonia::core::errors::Error),

    #[error("Failed to write MIDI: {0}")]
    Midi(String),

    #[error("Failed to draw plot: {0}")]
    Plot(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
