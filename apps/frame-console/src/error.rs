use frame_client::{CommandError, ConfigError, SessionError, SessionPhase, TransportError};
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Session(#[from] SessionError),
    #[error("{0}")]
    Command(#[from] CommandError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(String),
    #[error("session is {0}; run `frame watch` to log in")]
    NotLoggedIn(SessionPhase),
    #[error("input closed before the session was established")]
    InputClosed,
}
