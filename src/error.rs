use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the trip/sync core.
///
/// `Validation` is blocking and user-visible; it is never retried or queued.
/// The remaining variants are infrastructure faults: interactive callers see
/// them once, background sync marks the item failed and retries on the next
/// flush trigger.
#[derive(Debug, Error)]
pub enum Error {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sync transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Validation errors must not be queued for retry.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
