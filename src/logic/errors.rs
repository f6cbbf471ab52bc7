use thiserror::Error;

/// Failure obtaining the daemon address and API key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("no API key configured")]
    NotConfigured,
    #[error("access to credentials denied: {0}")]
    AccessDenied(String),
    #[error("malformed credentials: {0}")]
    Malformed(String),
}

/// Failure of a single gateway call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The daemon answered with a non-success HTTP status
    #[error("{endpoint} returned HTTP {status}")]
    Http { endpoint: String, status: u16 },
    /// The request never produced a response
    #[error("{endpoint}: {message}")]
    Transport { endpoint: String, message: String },
    /// The response body could not be decoded
    #[error("{endpoint}: malformed response: {message}")]
    Decode { endpoint: String, message: String },
    #[error(transparent)]
    MissingCredential(#[from] CredentialError),
    /// The refresh cycle this call belonged to was superseded
    #[error("refresh cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn http(endpoint: impl Into<String>, status: u16) -> Self {
        ApiError::Http {
            endpoint: endpoint.into(),
            status,
        }
    }

    pub fn transport(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Transport {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn decode(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Decode {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// HTTP status code, if the daemon answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 401 and 403 mean the API key was rejected
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    ConnectionRefused,
    Timeout,
    Unauthorized, // HTTP 401/403
    NotFound,     // HTTP 404
    ServerError,  // HTTP 500+
    NetworkError, // DNS, routing, etc.
    NotConfigured,
    Other,
}

/// Classify an error for the disconnected state
pub fn classify_error(error: &ApiError) -> ErrorType {
    match error {
        ApiError::Http { status, .. } => match status {
            401 | 403 => ErrorType::Unauthorized,
            404 => ErrorType::NotFound,
            500..=599 => ErrorType::ServerError,
            _ => ErrorType::Other,
        },
        ApiError::Transport { message, .. } => {
            let message = message.to_lowercase();
            if message.contains("connection refused") {
                ErrorType::ConnectionRefused
            } else if message.contains("timeout") || message.contains("timed out") {
                ErrorType::Timeout
            } else if message.contains("dns") || message.contains("network") {
                ErrorType::NetworkError
            } else {
                ErrorType::Other
            }
        }
        ApiError::MissingCredential(_) => ErrorType::NotConfigured,
        ApiError::Decode { .. } | ApiError::Cancelled => ErrorType::Other,
    }
}

/// Format error message for the status line - raw details, no decoration
pub fn format_error_message(error: &ApiError) -> String {
    match error {
        ApiError::Http { endpoint, status } if *status == 401 || *status == 403 => {
            format!("{} rejected the API key (HTTP {})", endpoint, status)
        }
        _ => error.to_string(),
    }
}
