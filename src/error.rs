use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DocError>;

#[derive(Debug, Error)]
pub enum DocError {
    #[error("{path}:{line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("{0}")]
    Configuration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no documents have been indexed yet")]
    IndexEmpty,
}

impl DocError {
    /// Stable name of the error kind, printed by the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            DocError::Parse { .. } => "ParseError",
            DocError::Configuration(_) => "ConfigurationError",
            DocError::Provider(_) => "ProviderError",
            DocError::Io { .. } => "IOError",
            DocError::IndexEmpty => "IndexEmptyError",
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DocError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        DocError::Configuration(message.into())
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, DocError::Provider(p) if p.is_unreachable())
    }
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("cannot reach {provider} at {endpoint}: {reason}")]
    Unreachable {
        provider: String,
        endpoint: String,
        reason: String,
    },

    #[error("{provider} returned {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("{provider} returned a malformed response: {reason}")]
    Malformed { provider: String, reason: String },
}

impl ProviderError {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ProviderError::Unreachable { .. })
    }

    pub fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        ProviderError::Malformed {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify a reqwest failure. Anything that kept us from getting a
    /// response (refused connection, timeout) counts as unreachable.
    pub fn from_reqwest(provider: &str, endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::malformed(provider, err.to_string())
        } else {
            ProviderError::Unreachable {
                provider: provider.to_string(),
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            }
        }
    }

    /// Turn a non-success HTTP response into an error, keeping the body.
    pub async fn from_response(provider: &str, response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        ProviderError::Http {
            provider: provider.to_string(),
            status,
            body: body.trim().to_string(),
        }
    }
}
