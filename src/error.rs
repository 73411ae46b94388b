//! Error types for Grid Strike.
//!
//! The engine's control operations never fail; these cover the edges that
//! touch the outside world: the config file, the high-score file, and
//! difficulty names coming from either of them.

use std::path::PathBuf;

use thiserror::Error;

/// A difficulty name that is not one of `easy`, `medium`, `hard`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown difficulty '{0}' (expected easy, medium or hard)")]
pub struct ParseDifficultyError(pub String);

/// Errors from the persisted high-score table.
#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("could not read high scores from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write high scores to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed high score file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not encode high scores: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Raised by stores that are not backed by a file.
    #[error("high score store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from loading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config.toml parse error in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
