use stadium_parking_model::ParkingSiteID;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum DecodeError {
    #[error("Polyline ends in the middle of a value at byte {offset}")]
    Truncated { offset: usize },
    #[error("Polyline has invalid character {byte:#04x} at byte {offset}")]
    InvalidCharacter { offset: usize, byte: u8 },
    #[error("Polyline value starting at byte {offset} is too long")]
    Overflow { offset: usize },
}

/// Everything that can end a route query in the error state. The page shows the message; the
/// category is a stable tag for styling and analytics.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum QueryError {
    #[error("{0}")]
    AddressNotFound(String),
    #[error("Too many requests. Please try again later.")]
    RateLimited,
    #[error("Server error ({status}): {detail}")]
    Server { status: u16, detail: String },
    #[error("Your session has expired. Please log in again.")]
    Unauthorized,
    #[error("No usable parking proposals were found for this address")]
    NoValidProposals,
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Unexpected response status {0}")]
    UnexpectedStatus(u16),
    #[error("Unable to reach the server: {0}")]
    Network(String),
}

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum InvalidProposal {
    #[error("Proposal for parking site {0:?} has neither a walking nor a transit leg")]
    MissingLastMile(ParkingSiteID),
}

pub const ADDRESS_NOT_FOUND: &str =
    "The start address could not be found. Please check your input.";

impl QueryError {
    pub fn category(&self) -> &'static str {
        match self {
            QueryError::AddressNotFound(_) => "address_not_found",
            QueryError::RateLimited => "rate_limited",
            QueryError::Server { .. } => "server_error",
            QueryError::Unauthorized => "unauthorized",
            QueryError::NoValidProposals => "no_valid_proposals",
            QueryError::MalformedResponse(_) => "malformed_response",
            QueryError::UnexpectedStatus(_) => "unexpected_status",
            QueryError::Network(_) => "network_error",
        }
    }

    /// Maps a failed HTTP status and its body's detail message
    pub fn from_status(status: u16, detail: Option<String>) -> QueryError {
        match status {
            400 => {
                QueryError::AddressNotFound(detail.unwrap_or_else(|| ADDRESS_NOT_FOUND.to_string()))
            }
            401 => QueryError::Unauthorized,
            429 => QueryError::RateLimited,
            500..=599 => QueryError::Server {
                status,
                detail: detail.unwrap_or_else(|| "Internal server error".to_string()),
            },
            _ => QueryError::UnexpectedStatus(status),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::MalformedResponse(err.to_string())
    }
}
