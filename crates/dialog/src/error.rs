use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported attachment")]
    UnsupportedAttachment,

    #[error(transparent)]
    Store(#[from] taskling_tasks::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
