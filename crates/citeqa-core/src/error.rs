use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An injected capability (embedder, index, store, reranker) failed.
    #[error("{capability} failed: {source}")]
    Capability {
        capability: &'static str,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Adapter for `map_err`: tags an adapter failure with the capability name.
    pub fn capability(capability: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |e| Self::Capability { capability, source: e.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
