use thiserror::Error;

/// Failures loading the keyfile, deckfile or statfile.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bad keyfile")]
    BadKeyfile,
    #[error("bad deckfile")]
    BadDeckfile,
    #[error("bad statfile")]
    BadStatfile,
    #[error("bad timeout")]
    BadTimeout,
}

/// A player message that failed to parse or validate against the wire grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("protocol error: {0}")]
pub struct ProtocolError(pub String);

impl ProtocolError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Top-level server failures that abort startup or the whole process.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to listen on one or more configured ports")]
    FailedListen,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
