//! Error types for page-summary

use thiserror::Error;

/// Errors that can occur when fetching a page to summarize.
///
/// Extraction itself never fails; these only come from reading input or
/// retrieving the page.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to parse or validate the URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP request failed
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to read file
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// The server answered with an error status (>= 400)
    #[error("HTTP error status: {0}")]
    HttpStatus(u16),

    /// Invalid response (non-HTML content type)
    #[error("invalid content type: expected text/html, got {0}")]
    InvalidContentType(String),

    /// Request blocked due to SSRF protection
    #[cfg(feature = "http")]
    #[error("SSRF protection: {0}")]
    SsrfBlocked(String),
}

/// Result type alias for page-summary operations.
pub type Result<T> = std::result::Result<T, Error>;
