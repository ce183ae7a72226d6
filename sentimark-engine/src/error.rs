//! Error types for training, persistence and configuration

/// Errors that can occur while building, loading or configuring a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported smoothing kind: '{0}' (expected laplace, backoff or sgts)")]
    UnsupportedSmoothing(String),

    #[error("model order {order} exceeds the maximum of {max}")]
    OrderTooLarge { order: usize, max: usize },

    #[error("backoff discount must be in (0, 1], got {0}")]
    InvalidDiscount(f64),

    #[error("corpus changed between training passes: {0}")]
    CorpusChanged(String),

    #[error("invalid snapshot format: {0}")]
    Format(String),

    #[error("{what} shape mismatch: expected {expected:?}, found {actual:?}")]
    ShapeMismatch {
        what: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("settings parse error")]
    Settings(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
