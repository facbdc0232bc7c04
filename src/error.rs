use thiserror::Error;

/// Errors surfaced by the portal client.
///
/// Every failure keeps its category so callers can tell "no connectivity"
/// apart from "need to log in again" and from "the portal changed shape".
/// Nothing is retried or swallowed internally.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure (connection, timeout, DNS).
    #[error("network error: {0}")]
    Network(String),

    /// The login page did not contain the anti-forgery token, so the login
    /// form cannot be submitted.
    #[error("verification token not found in login page")]
    Authentication,

    /// The consumption response did not have the expected nested structure.
    /// Raised also for an empty `Consumptions` array, so absence of data is
    /// never mistaken for zero consumption.
    #[error("unexpected consumption response shape: {0}")]
    UnexpectedResponseShape(String),

    /// DataFrame construction failed.
    #[error("dataframe error: {0}")]
    DataFrame(#[from] polars::error::PolarsError),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Network(format!("request timed out: {err}"))
        } else if err.is_connect() {
            Error::Network(format!("connection failed: {err}"))
        } else {
            Error::Network(err.to_string())
        }
    }
}
