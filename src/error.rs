use std::time::Duration;
use thiserror::Error;

/// Failure of a single snapshot fetch attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport failure (connect, reset, body read)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP status outside 2xx
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Envelope decoded but `status_code` was not 200
    #[error("API returned status_code {status_code}: {message}")]
    Api { status_code: i64, message: String },

    /// Body did not decode as a snapshot envelope
    #[error("Deserialization failed: {0}")]
    Decode(String),

    /// Attempt exceeded the per-attempt timeout
    #[error("Fetch timed out after {0:?}")]
    Timeout(Duration),
}

/// Terminal result of the bootstrap retry loop.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Snapshot fetch failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: FetchError },
}

/// Streaming transport errors.
#[derive(Error, Debug)]
pub enum StreamError {
    /// Connect failed
    #[error("Connect failed: {0}")]
    Connect(String),

    /// WebSocket protocol or I/O error on an open connection
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection already closed
    #[error("Connection closed")]
    Closed,
}
