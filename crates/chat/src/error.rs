use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("tool server connection failed: {0}")]
    Connect(#[from] mcp::Error),

    #[error(transparent)]
    Model(#[from] crate::model::ModelError),
}

pub type Result<T> = std::result::Result<T, Error>;
