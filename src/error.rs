use thiserror::Error;

/// Anything that can go wrong talking to a chain endpoint.
#[derive(Debug, Error)]
pub enum ChainQueryError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// JSON-RPC error object returned by the node.
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The response parsed but its contents could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl ChainQueryError {
    pub fn decode(msg: impl Into<String>) -> Self {
        ChainQueryError::Decode(msg.into())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("{0} decimal places cannot be represented")]
    Scale(u32),

    #[error("amount {0} is too large for a decimal")]
    Overflow(String),
}
