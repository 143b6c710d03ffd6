//! Document store client: metadata, copies, exports, uploads, sharing.
//!
//! ## Export transports
//!
//! The body PDF can be retrieved two ways (see
//! [`ExportStrategy`](crate::config::ExportStrategy)): streaming the
//! `files/{id}/export` media endpoint chunk by chunk, or fetching the
//! file's `exportLinks` PDF URL in one authenticated GET. The streamed
//! variant accumulates chunks until the transfer completes — there is no
//! fixed chunk size, the server decides the framing. Both return the
//! assembled bytes and fail with [`BookletError::EmptyArtifact`] on a
//! zero-byte result.

use crate::auth::Authenticator;
use crate::config::ExportStrategy;
use crate::error::BookletError;
use crate::remote::{error_from_response, transport_error};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/drive/v3";

/// Mime type Drive reports for an editable Google Doc.
pub const GOOGLE_DOC_MIME: &str = "application/vnd.google-apps.document";
/// Export target mime type.
pub const PDF_MIME: &str = "application/pdf";

/// The file metadata fields the pipeline reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub export_links: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

/// Drive REST client. Cheap to construct; shares its HTTP pool and token
/// cache with the Docs client.
#[derive(Debug)]
pub struct DriveClient {
    http: reqwest::Client,
    auth: Arc<Authenticator>,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, auth: Arc<Authenticator>) -> Self {
        Self { http, auth }
    }

    /// Fetch `name` and `mimeType` for a file.
    pub async fn file_metadata(&self, file_id: &str) -> Result<FileMetadata, BookletError> {
        self.metadata_fields(file_id, "name,mimeType", "resolve-metadata")
            .await
    }

    /// Fetch the per-format `exportLinks` map for a file.
    pub async fn export_links(&self, file_id: &str) -> Result<FileMetadata, BookletError> {
        self.metadata_fields(file_id, "exportLinks", "resolve-export-links")
            .await
    }

    async fn metadata_fields(
        &self,
        file_id: &str,
        fields: &str,
        stage: &'static str,
    ) -> Result<FileMetadata, BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{DRIVE_BASE}/files/{file_id}");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("fields", fields), ("supportsAllDrives", "true")])
            .send()
            .await
            .map_err(|e| transport_error(stage, e))?;

        if !response.status().is_success() {
            return Err(error_from_response(stage, response).await);
        }
        response
            .json()
            .await
            .map_err(|e| transport_error(stage, e))
    }

    /// Copy a file under a new name, optionally into a destination folder.
    /// Returns the new file's id. Creates a durable remote object.
    pub async fn copy_file(
        &self,
        file_id: &str,
        new_name: &str,
        parent_folder_id: Option<&str>,
    ) -> Result<String, BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{DRIVE_BASE}/files/{file_id}/copy");

        let mut body = serde_json::json!({ "name": new_name });
        if let Some(folder) = parent_folder_id {
            body["parents"] = serde_json::json!([folder]);
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true")])
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("duplicate-source", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("duplicate-source", response).await);
        }

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| transport_error("duplicate-source", e))?;
        info!(source = file_id, copy = %created.id, "Created document copy");
        Ok(created.id)
    }

    /// Export a document as PDF using the configured transport.
    pub async fn export_pdf(
        &self,
        file_id: &str,
        strategy: ExportStrategy,
    ) -> Result<Vec<u8>, BookletError> {
        let bytes = match strategy {
            ExportStrategy::Chunked => self.export_pdf_chunked(file_id).await?,
            ExportStrategy::DirectLink => self.export_pdf_direct_link(file_id).await?,
        };
        if bytes.is_empty() {
            return Err(BookletError::EmptyArtifact {
                doc_id: file_id.to_string(),
            });
        }
        info!(doc_id = file_id, bytes = bytes.len(), "Exported PDF");
        Ok(bytes)
    }

    /// Stream the export media endpoint, accumulating every chunk until the
    /// transfer reports completion.
    async fn export_pdf_chunked(&self, file_id: &str) -> Result<Vec<u8>, BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{DRIVE_BASE}/files/{file_id}/export");
        let response = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("mimeType", PDF_MIME)])
            .send()
            .await
            .map_err(|e| transport_error("export-body", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("export-body", response).await);
        }

        let mut buffer = Vec::with_capacity(
            response.content_length().unwrap_or(0) as usize,
        );
        let mut stream = response.bytes_stream();
        let mut chunks = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| transport_error("export-body", e))?;
            buffer.extend_from_slice(&chunk);
            chunks += 1;
        }
        debug!(doc_id = file_id, chunks, "Export download complete");
        Ok(buffer)
    }

    /// Look up the file's `exportLinks` and fetch the PDF link in one GET.
    async fn export_pdf_direct_link(&self, file_id: &str) -> Result<Vec<u8>, BookletError> {
        let meta = self.export_links(file_id).await?;
        let link =
            meta.export_links
                .get(PDF_MIME)
                .ok_or_else(|| BookletError::RemoteService {
                    status: 500,
                    stage: "export-body",
                    message: format!("file '{file_id}' reports no PDF export link"),
                })?;

        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(link)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| transport_error("export-body", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("export-body", response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("export-body", e))?;
        Ok(bytes.to_vec())
    }

    /// Upload a finished PDF into a folder. Returns the created file's id.
    ///
    /// Drive's single-call upload wants `multipart/related` with a JSON
    /// metadata part followed by the media part, which reqwest's form
    /// multipart cannot produce, so the body is assembled by hand.
    pub async fn upload_pdf(
        &self,
        name: &str,
        pdf: &[u8],
        parent_folder_id: Option<&str>,
    ) -> Result<String, BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{UPLOAD_BASE}/files");

        let mut metadata = serde_json::json!({ "name": name, "mimeType": PDF_MIME });
        if let Some(folder) = parent_folder_id {
            metadata["parents"] = serde_json::json!([folder]);
        }

        let boundary = "doc2booklet_upload";
        let body = multipart_related(boundary, &metadata.to_string(), pdf);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .query(&[("uploadType", "multipart"), ("supportsAllDrives", "true")])
            .header(
                reqwest::header::CONTENT_TYPE,
                format!("multipart/related; boundary={boundary}"),
            )
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error("upload-result", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("upload-result", response).await);
        }

        let created: CreatedFile = response
            .json()
            .await
            .map_err(|e| transport_error("upload-result", e))?;
        info!(file_id = %created.id, name, "Uploaded booklet");
        Ok(created.id)
    }

    /// Grant "anyone with the link may read" on a file.
    pub async fn share_with_link(&self, file_id: &str) -> Result<(), BookletError> {
        let token = self.auth.access_token().await?;
        let url = format!("{DRIVE_BASE}/files/{file_id}/permissions");
        let response = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .query(&[("supportsAllDrives", "true"), ("fields", "id")])
            .json(&serde_json::json!({ "type": "anyone", "role": "reader" }))
            .send()
            .await
            .map_err(|e| transport_error("share-start-pages", e))?;

        if !response.status().is_success() {
            return Err(error_from_response("share-start-pages", response).await);
        }
        debug!(file_id, "Granted anyone-with-link read access");
        Ok(())
    }
}

/// Assemble a two-part `multipart/related` body: JSON metadata, then media.
fn multipart_related(boundary: &str, metadata_json: &str, media: &[u8]) -> Vec<u8> {
    let mut head = String::new();
    let _ = write!(
        head,
        "--{boundary}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata_json}\r\n\
         --{boundary}\r\n\
         Content-Type: {PDF_MIME}\r\n\r\n"
    );
    let mut body = head.into_bytes();
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
