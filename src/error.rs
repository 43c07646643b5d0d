//! Error types shared by the hosted-service clients and the ingestion pipeline.

use reqwest::StatusCode;
use thiserror::Error;

use crate::extractor::ExtractError;

/// Failure talking to a hosted embedding, vector index, or completion API.
///
/// Every variant names the service so a message surfaced at the HTTP boundary
/// still says which upstream failed.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response (connect, timeout, body read).
    #[error("{service} request failed: {source}")]
    Transport {
        /// Upstream service label.
        service: &'static str,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The service answered with a non-success status.
    #[error("{service} returned {status}: {body}")]
    Status {
        /// Upstream service label.
        service: &'static str,
        /// HTTP status returned.
        status: StatusCode,
        /// Response body, or a placeholder when it could not be read.
        body: String,
    },
    /// The service answered 2xx but the payload was not what we expected.
    #[error("{service} response malformed: {detail}")]
    Malformed {
        /// Upstream service label.
        service: &'static str,
        /// Description of what was missing or invalid.
        detail: String,
    },
    /// The client could not be built from the supplied configuration.
    #[error("{service} configuration invalid: {detail}")]
    Config {
        /// Upstream service label.
        service: &'static str,
        /// Description of the invalid value.
        detail: String,
    },
}

impl ServiceError {
    pub(crate) fn transport(service: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { service, source }
    }

    pub(crate) fn malformed(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            service,
            detail: detail.into(),
        }
    }

    pub(crate) fn config(service: &'static str, detail: impl Into<String>) -> Self {
        Self::Config {
            service,
            detail: detail.into(),
        }
    }

    /// Converts a non-success response into a `Status` error, keeping the body for diagnostics.
    pub(crate) fn from_response(
        service: &'static str,
        response: reqwest::blocking::Response,
    ) -> Self {
        let status = response.status();
        let body = response
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        Self::Status {
            service,
            status,
            body,
        }
    }
}

/// Errors that abort a whole ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document could not be opened or the image directory created.
    #[error(transparent)]
    Extract(#[from] ExtractError),
    /// An embedding or upsert call failed; earlier pages remain indexed.
    #[error(transparent)]
    Service(#[from] ServiceError),
}
