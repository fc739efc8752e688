use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("venue error ({code}): {message}")]
    Venue { code: String, message: String },

    #[error("feed task stopped")]
    FeedStopped,
}
