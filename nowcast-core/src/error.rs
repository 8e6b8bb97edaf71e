//! Failure modes of the snapshot pipeline.

use reqwest::StatusCode;
use thiserror::Error;

/// A single resource could not be fetched, even after retrying.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },
}

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The document arrived but does not have the expected shape.
    #[error("Unexpected {document} document: {reason}")]
    Structural {
        document: &'static str,
        reason: String,
    },

    /// Neither a station observation nor a forecast period was available.
    #[error("No observation or forecast data available")]
    NoData,
}

impl WeatherError {
    pub(crate) fn structural(document: &'static str, reason: impl Into<String>) -> Self {
        Self::Structural {
            document,
            reason: reason.into(),
        }
    }

    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Structural { .. })
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let truncated = truncate_body(&body);
        assert_eq!(truncated.len(), 203);
        assert!(truncated.ends_with("..."));

        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn structural_errors_name_the_document() {
        let err = WeatherError::structural("points", "missing properties.forecast");
        assert!(err.is_structural());
        assert_eq!(
            err.to_string(),
            "Unexpected points document: missing properties.forecast"
        );
        assert!(!WeatherError::NoData.is_structural());
    }
}
