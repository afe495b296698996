use std::path::PathBuf;

use splice::SpliceError;
use thiserror::Error;

/// Errors raised while turning a recipe into an output document.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("cannot access '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid recipe {origin}: {source}")]
    Recipe {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    #[error(transparent)]
    Splice(#[from] SpliceError),
}

impl AssembleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssembleError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        AssembleError::InvalidRecipe(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AssembleError>;
