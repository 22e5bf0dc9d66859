use thiserror::Error;

/// Every way a session or gateway call can fail.
///
/// Backend rejections keep the HTTP status so callers can show it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A required field was empty; nothing was sent.
    #[error("{0} is required")]
    Validation(&'static str),

    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The call needs a session and there is none; nothing was sent.
    #[error("not logged in")]
    AuthRequired,

    #[error("invalid credentials ({status})")]
    InvalidCredentials { status: u16 },

    #[error("signup failed ({status})")]
    SignupFailed { status: u16 },

    #[error("delete failed ({status})")]
    DeleteFailed { status: u16 },

    #[error("update failed ({status})")]
    UpdateFailed { status: u16 },

    /// A read was rejected by the backend.
    #[error("request failed ({status})")]
    RequestFailed { status: u16 },

    /// Exactly one record was expected and none came back.
    #[error("not found")]
    NotFound,

    #[error("malformed response: {0}")]
    Parse(String),

    /// The request could not be built (bad header value or URL).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The credential store could not persist or clear the session.
    #[error("credential storage failed: {0}")]
    Storage(String),
}

impl ClientError {
    /// Status code for backend rejections, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::InvalidCredentials { status }
            | Self::SignupFailed { status }
            | Self::DeleteFailed { status }
            | Self::UpdateFailed { status }
            | Self::RequestFailed { status } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
