use thiserror::Error;

pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("missing configuration value {0}")]
    MissingConfig(&'static str),
    #[error("configuration value {key} is invalid: {reason}")]
    Config { key: &'static str, reason: String },
    #[error("current location is not available")]
    MissingPosition,
    #[error("destination is empty")]
    EmptyDestination,
    #[error("{service} request failed: {message}")]
    Transport {
        service: &'static str,
        message: String,
    },
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("{service} returned a malformed response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
    #[error("destination {0:?} not found")]
    DestinationNotFound(String),
    #[error("routing error: {0}")]
    Routing(String),
    #[error("search was superseded by a newer one")]
    Superseded,
}

impl ScoutError {
    pub fn transport(service: &'static str, err: impl std::fmt::Display) -> Self {
        ScoutError::Transport {
            service,
            message: err.to_string(),
        }
    }

    pub fn malformed(service: &'static str, err: impl std::fmt::Display) -> Self {
        ScoutError::Malformed {
            service,
            message: err.to_string(),
        }
    }
}
