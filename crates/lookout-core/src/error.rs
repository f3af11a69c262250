use thiserror::Error;

/// Why a gateway call produced no usable response.
///
/// These never escape the dispatcher as panics or `Err` into presenters; they
/// travel to the reconciler as `Outcome::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayFailure {
    /// Connection refused, DNS failure, timeout or a dropped body.
    #[error("gateway unreachable: {0}")]
    Unreachable(String),

    /// The index answered with a non-success status.
    #[error("gateway rejected request (HTTP {status}): {message}")]
    Rejected { status: u16, code: Option<String>, message: String },

    /// The index answered 2xx but the body was not a search result.
    #[error("malformed gateway response: {0}")]
    Decode(String),
}

impl GatewayFailure {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, GatewayFailure::Unreachable(_))
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    Config(#[from] figment::Error),

    #[error(transparent)]
    Gateway(#[from] GatewayFailure),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
