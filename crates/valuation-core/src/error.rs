use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    #[error("Segment index {index} out of range ({len} segments)")]
    SegmentOutOfRange { index: usize, len: usize },

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ValuationResult<T> = Result<T, ValuationError>;
