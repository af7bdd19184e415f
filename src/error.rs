use thiserror::Error;

/// Root error type for the sampling, filtering and analysis tools.
#[derive(Error, Debug)]
pub enum FireVaeError {
    /// Array or tensor dimensions do not match what an operation requires.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    /// An operation received an empty collection where it needs data.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// The matcher finished without ever accepting a candidate pair.
    #[error("no generated image improved on the initial (MSE, SSIM) sentinel")]
    NoBestMatch,

    /// Tensor data could not be moved back to the host.
    #[error("tensor error: {0}")]
    Tensor(String),

    /// Invalid caller-supplied argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Model or pipeline configuration could not be read or written.
    #[error("config error: {0}")]
    Config(String),

    /// Model weights could not be loaded.
    #[error("record error: {0}")]
    Record(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FireVaeError {
    pub(crate) fn shape(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        FireVaeError::Shape {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

pub type FireVaeResult<T> = Result<T, FireVaeError>;
