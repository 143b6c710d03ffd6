//! Clients for the two remote services the pipeline consumes.
//!
//! Both are thin REST wrappers over a shared [`reqwest::Client`] and a
//! shared [`crate::auth::Authenticator`]:
//!
//! 1. [`drive`] — the document store: metadata, copies, PDF export,
//!    uploads, permission grants
//! 2. [`docs`]  — the structural editor: document structure reads and
//!    atomic batched edits
//!
//! Neither client retries: every upstream failure surfaces as
//! [`BookletError::RemoteService`] with the original status, and the
//! orchestrator aborts the request. The clients only own transport and
//! payload shape; sequencing lives in [`crate::assemble`].

pub mod docs;
pub mod drive;

use crate::auth::Authenticator;
use crate::config::BookletConfig;
use crate::error::BookletError;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

pub use docs::{DocsClient, DocumentStructure, StripOutcome};
pub use drive::{DriveClient, FileMetadata, GOOGLE_DOC_MIME, PDF_MIME};

/// The shared client pair for one process.
///
/// Construct once and reuse: the HTTP connection pool and the cached
/// access token are both per-`RemoteClients`, so per-request construction
/// would pay a token mint on every call.
#[derive(Debug)]
pub struct RemoteClients {
    pub drive: DriveClient,
    pub docs: DocsClient,
}

impl RemoteClients {
    /// Build both clients from the configured key file and scopes.
    pub fn connect(config: &BookletConfig) -> Result<Self, BookletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| BookletError::Internal(format!("HTTP client construction: {e}")))?;

        let auth = Arc::new(Authenticator::from_key_file(
            &config.credentials_path,
            &config.scopes,
            http.clone(),
        )?);

        Ok(Self {
            drive: DriveClient::new(http.clone(), Arc::clone(&auth)),
            docs: DocsClient::new(http, auth),
        })
    }
}

/// Translate a non-success response into [`BookletError::RemoteService`],
/// extracting the Google error message when the body is the standard
/// `{"error": {"message": ...}}` envelope.
pub(crate) async fn error_from_response(
    stage: &'static str,
    response: reqwest::Response,
) -> BookletError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or(body);
    error!(stage, status, %message, "Remote service call failed");
    BookletError::RemoteService {
        status,
        stage,
        message,
    }
}

/// Map a transport-level failure (DNS, TLS, timeout) to the same error
/// variant with a 502, since no upstream status exists.
pub(crate) fn transport_error(stage: &'static str, err: reqwest::Error) -> BookletError {
    error!(stage, error = %err, "Remote service unreachable");
    BookletError::RemoteService {
        status: 502,
        stage,
        message: err.to_string(),
    }
}
