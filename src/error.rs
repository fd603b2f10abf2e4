//! Error taxonomy for the gateway and discovery layers.
//!
//! Extraction never errors (an empty record list is the documented signal),
//! so everything here belongs to the external-call side: searches, page
//! fetches and completion calls.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("gateway unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("could not parse {what}")]
    Parse { what: String },

    #[error("no usable candidate for '{term}'")]
    NoCandidate { term: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// Map a reqwest error to the taxonomy, preserving the timeout case
    /// since it drives per-candidate (not per-run) degradation.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout {
                url: url.to_string(),
            }
        } else {
            GatewayError::Http(err)
        }
    }
}
