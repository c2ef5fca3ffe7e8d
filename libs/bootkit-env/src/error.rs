use std::path::PathBuf;

/// Errors raised while assembling or reading an [`crate::Environment`].
#[derive(thiserror::Error, Debug)]
pub enum EnvError {
    #[error("invalid value for property '{key}': {source}")]
    InvalidProperty {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to bind properties under '{prefix}': {source}")]
    Bind {
        prefix: String,
        #[source]
        source: Box<figment::Error>,
    },
    #[error("invalid location pattern '{location}': {source}")]
    Pattern {
        location: String,
        #[source]
        source: glob::PatternError,
    },
    #[error("cannot read '{}': {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to load property source '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: Box<figment::Error>,
    },
    #[error("failed to read environment variables: {0}")]
    EnvVars(#[source] Box<figment::Error>),
    #[error("logging initialization failed: {0}")]
    Logging(String),
}
