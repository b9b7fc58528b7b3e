use shared::error::{ApiErrorBody, ErrorCode};
use thiserror::Error;

/// Failure of a single call against the back-office service.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("session expired or rejected by the server")]
    Unauthorized,
    #[error("not signed in")]
    NotSignedIn,
    #[error("server answered {status}: {}", message.as_deref().unwrap_or("no details"))]
    Api {
        status: u16,
        code: ErrorCode,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ClientError {
    pub fn from_body(status: u16, body: &ApiErrorBody) -> Self {
        let status = body.status_code().unwrap_or(status);
        ClientError::Api {
            status,
            code: ErrorCode::from_status(status),
            message: body.best_message().map(str::to_owned),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Api { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Text suitable for a failure notification: the server's own message
    /// when it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ClientError::Unauthorized => "Your session has expired. Please sign in again.".into(),
            ClientError::NotSignedIn => "Please sign in first.".into(),
            other => other.server_message().unwrap_or(fallback).to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("persisted session is not valid json: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_prefers_server_text() {
        let body = ApiErrorBody::new("Bad Request", "Insufficient balance", 400);
        let err = ClientError::from_body(400, &body);
        assert_eq!(err.user_message("Failed to process withdrawal"), "Insufficient balance");
        assert!(!err.is_unauthorized());
    }

    #[test]
    fn user_message_falls_back_without_body_text() {
        let err = ClientError::from_body(500, &ApiErrorBody::default());
        assert_eq!(err.user_message("Failed to load members"), "Failed to load members");
        match err {
            ClientError::Api { status, code, .. } => {
                assert_eq!(status, 500);
                assert_eq!(code, ErrorCode::Internal);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
