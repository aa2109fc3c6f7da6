use std::path::PathBuf;

/// Errors from the fallible edges of the crate: configuration files and
/// image loading. Rasterizer calls never fail.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no registered loader accepts {0}")]
    NoLoader(String),

    #[error("{loader} failed to decode {name}: {reason}")]
    Decode {
        loader: String,
        name: String,
        reason: String,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
