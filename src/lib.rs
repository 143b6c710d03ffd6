//! # doc2booklet
//!
//! Assemble a print-ready PDF booklet from a Google Doc.
//!
//! ## Why this crate?
//!
//! Turning a collaboratively written Google Doc into a finished booklet is
//! a dozen manual steps: copy the doc so the original stays untouched,
//! delete the working notes before the real content, export to PDF, build
//! a title-and-credits section from a template, glue on the fixed end
//! pages, and number the pages. This crate runs that sequence as one
//! pipeline against the Drive and Docs APIs plus local PDF rewriting.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Google Doc URL
//!  │
//!  ├─ 1. Extract    pull the document id out of the /d/<id> link
//!  ├─ 2. Duplicate  copy the doc into the working folder
//!  ├─ 3. Strip      delete everything before the second page break
//!  ├─ 4. Export     download the body as PDF (chunked or direct link)
//!  ├─ 5. Template   instantiate start pages ({{title}}, {{year}}, …)
//!  ├─ 6. Merge      [start, body, end] page-for-page via lopdf
//!  ├─ 7. Stamp      centred italic page numbers, first page skipped
//!  └─ 8. Output     downloads/<name>.pdf + optional Drive upload
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use doc2booklet::{assemble, BookletConfig, SubmissionRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BookletConfig::builder()
//!         .credentials_path("service_account.json")
//!         .start_pages_template_id("1niKJyWq-template-id")
//!         .shared_folder_id("0AE0-folder-id")
//!         .build()?;
//!
//!     let request = SubmissionRequest {
//!         source_url: "https://docs.google.com/document/d/ABC123/edit".into(),
//!         title: "My Story".into(),
//!         storyteller_names: vec!["Bob".into(), "Alice".into()],
//!         director_name: "Jane".into(),
//!         crew_id: None,
//!         dedication: "Thanks".into(),
//!     };
//!
//!     let output = assemble(&request, &config).await?;
//!     println!("{} ({} pages)", output.output_path.display(), output.total_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `doc2booklet` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! doc2booklet = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod assemble;
pub mod auth;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod remote;
pub mod request;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use assemble::{assemble, assemble_with_clients};
pub use config::{
    BookletConfig, BookletConfigBuilder, EditPoll, ExportStrategy, FontPolicy, NumberingPolicy,
};
pub use error::BookletError;
pub use output::{AssemblyOutput, AssemblyStats, RemoteDocumentRef};
pub use pipeline::extract::extract_document_id;
pub use pipeline::merge::merge_documents;
pub use pipeline::stamp::{stamp_page_numbers, StampFont};
pub use remote::RemoteClients;
pub use request::SubmissionRequest;
