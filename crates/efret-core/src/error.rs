use thiserror::Error;

use crate::crosstalk::{CalibrationKind, Coefficient};

#[derive(Error, Debug)]
pub enum FretError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF decoding error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image format error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid image stack: {0}")]
    InvalidStack(String),

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize, usize),
        found: (usize, usize, usize),
    },

    #[error("Coefficient {coefficient} cannot be estimated from a {kind} registration")]
    ConfigurationMismatch {
        coefficient: Coefficient,
        kind: CalibrationKind,
    },

    #[error("No cell regions detected in registration '{name}'")]
    NoRegions { name: String },

    #[error("No usable samples left: {0}")]
    NoUsableSamples(String),

    #[error("Linear fit needs at least {needed} samples, got {found}")]
    InsufficientSamples { needed: usize, found: usize },

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),

    #[error("Frame index {index} out of range (total: {total})")]
    FrameIndexOutOfRange { index: usize, total: usize },

    #[error("Coefficient {0} missing from the crosstalk summary")]
    MissingCoefficient(Coefficient),

    #[error("Empty frame sequence")]
    EmptySequence,

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, FretError>;
