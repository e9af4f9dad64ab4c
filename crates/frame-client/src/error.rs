use crate::model::{CommandClass, SessionPhase};
use reqwest::StatusCode;
use thiserror::Error;

/// Classified failure of a single backend request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("server error ({status}): {body}")]
    Server { status: StatusCode, body: String },
    #[error("malformed response from {endpoint}: {detail}")]
    Parse {
        endpoint: &'static str,
        detail: String,
    },
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Server { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    /// The backend refused the request for lack of a valid session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            TransportError::Server { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }

    /// Short label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Network(_) => "network",
            TransportError::Server { .. } => "server",
            TransportError::Parse { .. } => "parse",
            TransportError::InvalidUrl(_) => "url",
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("operation requires phase {expected}, session is {actual}")]
    WrongPhase {
        expected: SessionPhase,
        actual: SessionPhase,
    },
    #[error("device '{0}' was not offered by the server")]
    UnknownDevice(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("commands require a logged in session")]
    NotLoggedIn,
    #[error("a {0} command is already in flight")]
    AlreadyInFlight(CommandClass),
    #[error("photo '{0}' is not in the current gallery")]
    NotInGallery(String),
    #[error("photo path '{0}' has no file name")]
    InvalidPath(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}
