//! Error types for the doc2booklet library.
//!
//! One enum covers the whole pipeline because every failure is terminal:
//! no stage retries, no partial output is salvaged, the request either
//! produces a finished booklet or an error. The variants split along the
//! caller-facing taxonomy — bad input, wrong file type, upstream service
//! failure, empty export, missing local resource — so a front end can map
//! each to the right response code via [`BookletError::http_status`]
//! without string-matching messages.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the doc2booklet library.
#[derive(Debug, Error)]
pub enum BookletError {
    // ── Input errors (client-caused) ──────────────────────────────────────
    /// The source URL does not contain a recognisable `/d/<id>` segment.
    #[error("Invalid document URL: '{url}'\nExpected a link containing /d/<document-id>.")]
    InvalidReference { url: String },

    /// The referenced file exists but is not an editable Google Doc.
    #[error("Source file is not a Google Doc (mime type: {mime_type})")]
    WrongFileType { mime_type: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Remote service errors ─────────────────────────────────────────────
    /// The Drive or Docs API returned a non-success response.
    ///
    /// `status` is the upstream HTTP status, passed through to the caller;
    /// `message` is the Google error message when the body was parseable.
    #[error("Remote service error ({status}) during {stage}: {message}")]
    RemoteService {
        status: u16,
        stage: &'static str,
        message: String,
    },

    /// The token grant failed — bad key file, clock skew, revoked account.
    #[error("Authentication failed: {detail}")]
    AuthFailed { detail: String },

    // ── Artifact errors ───────────────────────────────────────────────────
    /// An export completed but produced zero bytes.
    #[error("Exported PDF for document '{doc_id}' is empty")]
    EmptyArtifact { doc_id: String },

    /// The merger was given no usable sources.
    #[error("No input pages: every PDF source was absent or empty")]
    NoInputPages,

    /// A PDF byte sequence could not be parsed or rewritten.
    #[error("PDF processing failed during {stage}: {detail}")]
    PdfProcessing { stage: &'static str, detail: String },

    // ── Local resource errors ─────────────────────────────────────────────
    /// A required local file (font, end-pages PDF, key file) is absent.
    #[error("Required file not found: '{path}'")]
    ResourceMissing { path: PathBuf },

    /// The stamp font file exists but could not be parsed.
    #[error("Font file '{path}' is not a usable TrueType font: {detail}")]
    FontUnusable { path: PathBuf, detail: String },

    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error. Logged with full context; the display
    /// string deliberately carries no internal detail beyond the message.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BookletError {
    /// HTTP response code a front end should return for this error.
    ///
    /// Client-caused errors map to 400, upstream failures pass through the
    /// original status, and everything else is a 500. A failed token grant
    /// is a 500, not a 401: the broken credential is the service's, and the
    /// caller can do nothing about it.
    pub fn http_status(&self) -> u16 {
        match self {
            BookletError::InvalidReference { .. }
            | BookletError::WrongFileType { .. }
            | BookletError::InvalidConfig(_) => 400,
            BookletError::RemoteService { status, .. } => *status,
            _ => 500,
        }
    }
}
