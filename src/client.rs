//! Terminal client for the `/ask` endpoint.

use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Serialize;
use thiserror::Error;

use crate::document::Answer;

/// Endpoint the client talks to when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000/ask";

/// Shown for every failed round trip; causes are not distinguished.
pub const BACKEND_FAILURE: &str = "Failed to get response from backend. Please try again.";

/// Why a round trip failed.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be sent or the body not read.
    #[error("request to {url} failed: {source}")]
    Transport {
        /// Endpoint that was called.
        url: String,
        /// HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-200 status.
    #[error("backend returned {status}: {body}")]
    Backend {
        /// HTTP status.
        status: reqwest::StatusCode,
        /// Raw response body.
        body: String,
    },
}

/// Blocking client for a single backend URL.
pub struct AskClient {
    client: Client,
    url: String,
}

impl AskClient {
    /// Builds a client for `url`. No timeout: the request blocks until the
    /// backend answers.
    pub fn new(url: impl Into<String>) -> Result<Self, ClientError> {
        let url = url.into();
        let client = Client::builder()
            .timeout(None::<Duration>)
            .build()
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;
        Ok(Self { client, url })
    }

    /// Submits one question.
    pub fn ask(&self, query: &str) -> Result<Answer, ClientError> {
        let transport = |source| ClientError::Transport {
            url: self.url.clone(),
            source,
        };
        let resp = self
            .client
            .post(&self.url)
            .json(&AskBody { query })
            .send()
            .map_err(transport)?;
        if resp.status() != reqwest::StatusCode::OK {
            let status = resp.status();
            let body = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ClientError::Backend { status, body });
        }
        resp.json().map_err(transport)
    }
}

#[derive(Serialize)]
struct AskBody<'a> {
    query: &'a str,
}

/// Formats an answer for the terminal. `image_root` is where relative image
/// paths are resolved, so missing files can be flagged.
pub fn render_answer(answer: &Answer, image_root: &Path) -> String {
    let mut out = String::new();
    out.push_str("Response:\n");
    out.push_str(answer.response.trim_end());
    out.push('\n');
    if answer.images.is_empty() {
        out.push_str("\nNo relevant images found.\n");
        return out;
    }
    out.push_str("\nReference Images:\n");
    for (idx, image) in answer.images.iter().enumerate() {
        let _ = write!(out, "  Reference Image {}: {}", idx + 1, image);
        if !image_root.join(image).exists() {
            out.push_str(" (not found locally)");
        }
        out.push('\n');
    }
    out
}
