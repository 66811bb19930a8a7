/// Result alias that carries the custom [`OrbError`] type.
pub type Result<T> = std::result::Result<T, OrbError>;

/// Common error type for the core crate.
///
/// Nothing on the per-frame path returns this type: frame drawing degrades
/// silently instead. Errors only surface from configuration, colour parsing
/// and frame recording.
#[derive(Debug, thiserror::Error)]
pub enum OrbError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// A configuration value is outside the range the engine accepts.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A colour string could not be parsed as `#rrggbb`.
    #[error("invalid colour `{0}`: expected #rrggbb")]
    InvalidColor(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Configuration file could not be parsed.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Frame could not be encoded.
    #[error("{0}")]
    Image(#[from] image::ImageError),
}

impl OrbError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    /// Shorthand for [`OrbError::InvalidConfig`].
    pub fn config<T: Into<String>>(msg: T) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl From<&str> for OrbError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for OrbError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
