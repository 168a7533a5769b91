use reqwest::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum PoolCopilotError {
    /// Connection refused, DNS failure, timeout or a broken response body.
    #[error("error occurred while communicating with the API: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API request failed with status {status}: `{body}`")]
    Api { status: StatusCode, body: String },

    #[error("cannot decode json response: `{0}`")]
    Decode(#[from] serde_json::Error),

    #[error("could not authenticate with the provided API key")]
    InvalidKey,

    #[error("rate limit of the API token reached")]
    RateLimit,

    #[error("the API key must not be empty")]
    EmptyApiKey,

    #[error("the API key contains characters that cannot be sent in a header")]
    MalformedApiKey,

    #[error("invalid base url: `{0}`")]
    InvalidUrl(#[from] url::ParseError),

    #[error("invalid argument: `{0}`")]
    InvalidArgument(String),
}

impl PoolCopilotError {
    /// The HTTP status the API answered with, if the failure came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PoolCopilotError::Api { status, .. } => Some(*status),
            PoolCopilotError::Transport(err) => err.status(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, PoolCopilotError::Transport(err) if err.is_timeout())
    }

    /// True if the API rejected the credentials.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            PoolCopilotError::InvalidKey => true,
            _ => matches!(
                self.status(),
                Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN)
            ),
        }
    }
}

pub type Result<T> = std::result::Result<T, PoolCopilotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_exposes_status() {
        let err = PoolCopilotError::Api {
            status: StatusCode::UNAUTHORIZED,
            body: "nope".to_string(),
        };
        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        assert!(err.is_unauthorized());
        assert!(!err.is_timeout());
        assert_eq!(
            err.to_string(),
            "API request failed with status 401 Unauthorized: `nope`"
        );
    }

    #[test]
    fn invalid_key_is_unauthorized() {
        assert!(PoolCopilotError::InvalidKey.is_unauthorized());
        assert!(!PoolCopilotError::RateLimit.is_unauthorized());
        assert_eq!(PoolCopilotError::RateLimit.status(), None);
    }
}
