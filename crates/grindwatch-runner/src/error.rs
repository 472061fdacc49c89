//! Error types for the runner binary.
//!
//! Uses `thiserror` for typed errors in the setup path. Steady-state
//! poll failures are handled inline by the loop (counted, logged) and
//! never surface through this type.

/// Errors that can occur while bringing the runner up.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    HttpClient(String),
}
