/// Errors raised by the routing engine and its boundaries.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("malformed address: {0}")]
    MalformedAddress(String),

    #[error("sender {0} is not a direct neighbor")]
    UnknownSender(String),

    #[error("malformed advertisement: {0}")]
    MalformedPayload(String),

    #[error("could not reach neighbor {neighbor}: {reason}")]
    Transport { neighbor: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;
