//! The assembly orchestrator.
//!
//! One linear state machine per request, no branching loops:
//!
//! ```text
//! ValidateInput → ResolveSourceMeta → DuplicateSource → StripLeadingContent
//!   → AwaitEditVisible → ExportBody → GenerateStartPages → ExportStartPages
//!   → MergePdfs → StampPageNumbers → PersistLocally → [UploadResult] → Done
//! ```
//!
//! Every arrow is a hard dependency: the first failure aborts the request
//! with no retry and no partial output. The remote mutations (copy, range
//! delete, placeholder substitution) are not idempotent, so no stage may
//! be silently re-driven; recovery is a fresh request against the source
//! document.
//!
//! `AwaitEditVisible` is a bounded poll, not a sleep: the strip edit is
//! acknowledged synchronously but the export endpoint can serve a stale
//! rendering for a moment, so the orchestrator re-reads the structure
//! until the deletion shows up before requesting the export.

use crate::config::BookletConfig;
use crate::error::BookletError;
use crate::output::{AssemblyOutput, AssemblyStats, RemoteDocumentRef};
use crate::pipeline::extract::extract_document_id;
use crate::pipeline::merge::{merge_documents, page_count};
use crate::pipeline::stamp::{stamp_page_numbers, StampFont};
use crate::pipeline::startpages::generate_start_pages;
use crate::remote::{DocsClient, RemoteClients, StripOutcome, GOOGLE_DOC_MIME};
use crate::request::SubmissionRequest;
use std::path::PathBuf;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

/// Assemble a booklet for one request, constructing fresh remote clients.
///
/// This is the primary entry point for the library. Callers serving many
/// requests should build [`RemoteClients`] once and use
/// [`assemble_with_clients`] so the HTTP pool and the cached access token
/// are shared.
pub async fn assemble(
    request: &SubmissionRequest,
    config: &BookletConfig,
) -> Result<AssemblyOutput, BookletError> {
    // Validate the link before touching credentials so a malformed request
    // never reads the key file or opens a connection.
    extract_document_id(&request.source_url)?;
    let clients = RemoteClients::connect(config)?;
    assemble_with_clients(&clients, request, config).await
}

/// Assemble a booklet using pre-built remote clients.
pub async fn assemble_with_clients(
    clients: &RemoteClients,
    request: &SubmissionRequest,
    config: &BookletConfig,
) -> Result<AssemblyOutput, BookletError> {
    let total_start = Instant::now();
    let request = request.normalized();

    // ── Step 1: Validate input ───────────────────────────────────────────
    let doc_id = extract_document_id(&request.source_url)?;
    info!(doc_id = %doc_id, "Starting booklet assembly");

    // Local resources are checked before any remote object is created, so
    // a missing font or end-pages file cannot orphan remote copies.
    let font = StampFont::load(&config.font)?;
    let end_pdf: Option<Vec<u8>> = match &config.end_pages_path {
        Some(path) => Some(std::fs::read(path).map_err(|_| BookletError::ResourceMissing {
            path: path.clone(),
        })?),
        None => None,
    };

    // ── Step 2: Resolve source metadata (type guard) ─────────────────────
    let remote_start = Instant::now();
    let meta = clients.drive.file_metadata(&doc_id).await?;
    if meta.mime_type != GOOGLE_DOC_MIME {
        return Err(BookletError::WrongFileType {
            mime_type: meta.mime_type,
        });
    }
    info!(name = %meta.name, "Processing document");

    // ── Step 3: Duplicate the source ─────────────────────────────────────
    let copy_name = format!("{} (PDF Copy)", meta.name);
    let copy_id = clients
        .drive
        .copy_file(&doc_id, &copy_name, config.shared_folder_id.as_deref())
        .await?;
    let mut remote_copies = vec![RemoteDocumentRef {
        id: copy_id.clone(),
        display_name: copy_name,
        mime_type: GOOGLE_DOC_MIME.to_string(),
    }];

    // ── Step 4: Strip leading boilerplate ────────────────────────────────
    let outcome = clients.docs.delete_before_second_break(&copy_id).await?;

    // ── Step 5: Confirm the edit is visible before exporting ─────────────
    if let StripOutcome::Applied { breaks_remaining } = outcome {
        await_edit_visible(&clients.docs, &copy_id, breaks_remaining, config).await?;
    }

    // ── Step 6: Export the body ──────────────────────────────────────────
    let body_pdf = clients
        .drive
        .export_pdf(&copy_id, config.export_strategy)
        .await?;

    // ── Step 7: Generate and export the start pages ──────────────────────
    let start_id = generate_start_pages(clients, &request, config).await?;
    remote_copies.push(RemoteDocumentRef {
        id: start_id.clone(),
        display_name: "Start Pages".to_string(),
        mime_type: GOOGLE_DOC_MIME.to_string(),
    });
    let start_pdf = clients
        .drive
        .export_pdf(&start_id, config.export_strategy)
        .await?;
    let remote_ms = remote_start.elapsed().as_millis() as u64;

    // ── Step 8: Merge and stamp ──────────────────────────────────────────
    let pdf_start = Instant::now();
    let merged = merge_documents(&[Some(start_pdf), Some(body_pdf), end_pdf])?;
    let stamped = stamp_page_numbers(&merged, &font, config.numbering)?;
    let total_pages = page_count(&stamped)?;
    let pdf_ms = pdf_start.elapsed().as_millis() as u64;

    // ── Step 9: Persist locally (atomic: temp + rename) ──────────────────
    let output_path = config.output_dir.join(format!("{}.pdf", meta.name));
    write_atomic(&output_path, &stamped).await?;

    // ── Step 10: Optional upload ─────────────────────────────────────────
    let uploaded_file_id = match &config.upload_folder_id {
        Some(folder) => Some(
            clients
                .drive
                .upload_pdf(
                    &format!("{}.pdf", meta.name),
                    &stamped,
                    Some(folder.as_str()),
                )
                .await?,
        ),
        None => None,
    };

    let stats = AssemblyStats {
        total_ms: total_start.elapsed().as_millis() as u64,
        remote_ms,
        pdf_ms,
        output_bytes: stamped.len(),
    };
    info!(
        path = %output_path.display(),
        pages = total_pages,
        total_ms = stats.total_ms,
        "Booklet assembled"
    );

    Ok(AssemblyOutput {
        output_path,
        source_name: meta.name,
        total_pages,
        uploaded_file_id,
        remote_copies,
        stats,
    })
}

/// Poll the document structure until the strip edit is visible, bounded by
/// the configured attempt limit.
///
/// The deleted range contained the first page break, so visibility means
/// the break count has dropped to `breaks_remaining`. Exhausting the limit
/// is a warning, not an error: the export proceeds and at worst renders the
/// pre-edit document, which is the same exposure the fixed-delay scheme
/// had — the poll only ever narrows it.
async fn await_edit_visible(
    docs: &DocsClient,
    doc_id: &str,
    breaks_remaining: usize,
    config: &BookletConfig,
) -> Result<(), BookletError> {
    let poll = config.edit_poll;
    for attempt in 1..=poll.max_attempts {
        let structure = docs.get_document(doc_id).await?;
        let breaks = structure.page_break_offsets().len();
        if breaks <= breaks_remaining {
            debug!(doc_id, attempt, breaks, "Strip edit confirmed visible");
            return Ok(());
        }
        debug!(
            doc_id,
            attempt,
            breaks,
            expected = breaks_remaining,
            "Strip edit not yet visible"
        );
        sleep(Duration::from_millis(poll.interval_ms)).await;
    }
    warn!(
        doc_id,
        attempts = poll.max_attempts,
        "Strip edit not confirmed visible; exporting anyway"
    );
    Ok(())
}

/// Write the finished booklet via temp file + rename so a crash mid-write
/// never leaves a truncated PDF at the output path.
async fn write_atomic(path: &PathBuf, bytes: &[u8]) -> Result<(), BookletError> {
    let write_err = |source: std::io::Error| BookletError::OutputWriteFailed {
        path: path.clone(),
        source,
    };

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
