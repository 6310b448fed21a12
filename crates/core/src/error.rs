/// Result alias that carries the custom [`BoothError`] type.
pub type Result<T> = std::result::Result<T, BoothError>;

/// Common error type for the core crate.
///
/// Capture and decode failures never show up here: they degrade to a `None`
/// frame or a placeholder box and are only logged.
#[derive(Debug, thiserror::Error)]
pub enum BoothError {
    /// Free-form message for failures without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Encoding the finished collage failed.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    /// A configuration file could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid shot plan: {0}")]
    InvalidPlan(String),
    #[error("invalid collage spec: {0}")]
    InvalidSpec(String),
    /// `start` was requested while a run is still in flight.
    #[error("capture sequence already running ({phase})")]
    InvalidStart { phase: String },
    /// The collage was requested before every shot was taken.
    #[error("collage not ready: {taken} of {expected} shots taken")]
    NotReady { taken: usize, expected: usize },
}

impl BoothError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for BoothError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for BoothError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
