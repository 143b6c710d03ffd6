//! Result types returned by a completed assembly.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A reference to a document created remotely during assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteDocumentRef {
    /// Opaque id assigned by the document store.
    pub id: String,
    /// Display name at creation time.
    pub display_name: String,
    /// Mime type at creation time. Copies keep their source's type, so
    /// both intermediates are editable Google Docs.
    pub mime_type: String,
}

/// Everything a caller gets back from a successful run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblyOutput {
    /// Where the finished booklet was written: `<output_dir>/<source name>.pdf`.
    pub output_path: PathBuf,
    /// Display name of the source document.
    pub source_name: String,
    /// Page count of the finished booklet.
    pub total_pages: usize,
    /// Drive id of the uploaded copy, when upload was configured.
    pub uploaded_file_id: Option<String>,
    /// The intermediate remote copies created for this request (source copy
    /// and instantiated start pages), for callers that clean up afterwards.
    pub remote_copies: Vec<RemoteDocumentRef>,
    /// Timing breakdown.
    pub stats: AssemblyStats,
}

/// Wall-clock timings for the major phases of one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyStats {
    /// End-to-end duration.
    pub total_ms: u64,
    /// Time spent in remote calls (copy, edits, exports, upload).
    pub remote_ms: u64,
    /// Time spent merging and stamping locally.
    pub pdf_ms: u64,
    /// Bytes of the finished booklet.
    pub output_bytes: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_ref_round_trips_with_mime_type() {
        let doc_ref = RemoteDocumentRef {
            id: "abc123".into(),
            display_name: "My Story (PDF Copy)".into(),
            mime_type: "application/vnd.google-apps.document".into(),
        };
        let json = serde_json::to_string(&doc_ref).unwrap();
        assert!(json.contains(r#""mime_type":"application/vnd.google-apps.document""#));
        let back: RemoteDocumentRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back.mime_type, doc_ref.mime_type);
    }
}
