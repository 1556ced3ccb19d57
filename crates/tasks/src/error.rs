use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("malformed action token: {token:?}")]
    InvalidAction { token: String },

    #[error("task title must not be empty")]
    EmptyTitle,
}

impl Error {
    #[must_use]
    pub fn invalid_action(token: impl Into<String>) -> Self {
        Self::InvalidAction {
            token: token.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
