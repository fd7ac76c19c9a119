use thiserror::Error;

/// Failures a user can see. Input errors leave all state untouched.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid search {query:?}: use only letters, digits, spaces, '-', '_' or '#'")]
    InvalidQuery { query: String },

    #[error("invalid count {0:?}: enter a positive whole number")]
    InvalidCount(String),

    #[error("a brew is already in progress")]
    Busy,

    #[error("image {index} of {count} could not be fetched from {url}: {reason}")]
    Unreachable {
        index: usize,
        count: usize,
        url: String,
        reason: String,
    },

    #[error("brew interrupted: {0}")]
    Interrupted(String),

    #[error("no item with id {0}")]
    UnknownItem(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl Error {
    /// Input errors are recovered locally; everything else came from outside.
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidQuery { .. } | Error::InvalidCount(_))
    }
}
