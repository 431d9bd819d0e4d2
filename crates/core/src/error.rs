/// Result alias that carries the custom [`JudgeError`] type.
pub type Result<T> = std::result::Result<T, JudgeError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    /// A song attempt needs at least 2 s of lead-in and 2 s of tail.
    #[error("song duration {duration_ms} ms is too short (minimum 4000 ms)")]
    InvalidDuration { duration_ms: f64 },
    #[error("difficulty multiplier {0} must be finite and non-negative")]
    InvalidMultiplier(f64),
    #[error("unknown song `{0}`")]
    SongNotFound(String),
    #[error("unknown difficulty `{0}` (expected easy, medium or hard)")]
    InvalidDifficulty(String),
    #[error("lane {0} is out of range (0..=7)")]
    InvalidLane(u8),
    #[error("note time {scheduled_ms} ms with hold {hold_ms} ms is not a valid timing")]
    InvalidNoteTiming { scheduled_ms: f64, hold_ms: f64 },
    /// Free-form message for failures that do not warrant their own variant.
    #[error("{0}")]
    Message(String),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl JudgeError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for JudgeError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for JudgeError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
