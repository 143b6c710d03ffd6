//! Start-pages generation: template copy + placeholder substitution.
//!
//! No independent algorithm lives here — it is a composition of the Drive
//! copy, the Docs placeholder batch, and a permission grant. The grant
//! exists so anyone following a link to the intermediate document (proof
//! readers checking the rendered title page) can open it without a share
//! request landing on the service account.

use crate::config::BookletConfig;
use crate::error::BookletError;
use crate::remote::RemoteClients;
use crate::request::SubmissionRequest;
use tracing::info;

/// Display name given to each instantiated start-pages copy.
const START_PAGES_NAME: &str = "Start Pages";

/// Instantiate the start-pages template for one request.
///
/// Copies the configured template into the destination folder, substitutes
/// the request's placeholder map, and opens link sharing. Returns the new
/// document's id; the caller exports and ultimately owns it.
pub async fn generate_start_pages(
    clients: &RemoteClients,
    request: &SubmissionRequest,
    config: &BookletConfig,
) -> Result<String, BookletError> {
    let doc_id = clients
        .drive
        .copy_file(
            &config.start_pages_template_id,
            START_PAGES_NAME,
            config.shared_folder_id.as_deref(),
        )
        .await?;

    clients
        .docs
        .replace_placeholders(&doc_id, &request.placeholder_map())
        .await?;

    clients.drive.share_with_link(&doc_id).await?;

    info!(doc_id = %doc_id, "Start pages generated");
    Ok(doc_id)
}
