//! Configuration for booklet assembly.
//!
//! Every knob lives in one [`BookletConfig`] value passed into the
//! orchestrator at construction — template ids, folder ids, and credential
//! paths are never process globals. Built via [`BookletConfigBuilder`] so
//! callers set only what differs from the defaults.

use crate::error::BookletError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// OAuth2 scopes the pipeline needs: file copies/exports and structural edits.
pub const DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/documents",
];

/// How the body PDF is retrieved from Drive.
///
/// Two strategies exist because Drive offers two export surfaces: the
/// `files/{id}/export` media endpoint (streamed, possibly in several
/// chunks) and the per-file `exportLinks` URL (one authenticated GET).
/// Both produce identical bytes; the link fetch needs an extra metadata
/// round-trip but survives proxies that mangle streamed responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExportStrategy {
    /// Stream the export media endpoint, accumulating chunks. (default)
    #[default]
    Chunked,
    /// Look up the file's `exportLinks` and fetch the PDF link directly.
    DirectLink,
}

/// Which pages receive a number label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NumberingPolicy {
    /// Label every page after the first with its 1-based number. (default)
    ///
    /// The first page is the booklet cover; numbering starts visibly at 2.
    #[default]
    SkipFirst,
    /// Label every page, first included, starting at 1.
    AllPages,
}

/// Where the stamp font comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FontPolicy {
    /// Load and embed the bundled italic TTF at this path.
    /// A missing file is a fatal [`BookletError::ResourceMissing`].
    Bundled(PathBuf),
    /// Use the built-in Times-Italic base-14 font; nothing is embedded.
    BuiltinItalic,
}

impl Default for FontPolicy {
    fn default() -> Self {
        FontPolicy::Bundled(PathBuf::from("fonts/Lora-Italic.ttf"))
    }
}

/// Bounded poll that confirms a structural edit is visible before export.
///
/// Replaces a fixed post-edit sleep: the Docs edit is acknowledged
/// synchronously but the Drive export can briefly serve a stale rendering.
/// The poll re-reads the document until the deletion shows up, bounded so a
/// stuck backend cannot block the request forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPoll {
    /// Maximum structure re-reads before giving up (the export then
    /// proceeds anyway, logged as a warning).
    pub max_attempts: u32,
    /// Delay between re-reads, in milliseconds.
    pub interval_ms: u64,
}

impl Default for EditPoll {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            interval_ms: 500,
        }
    }
}

/// Configuration for a booklet assembly run.
///
/// # Example
/// ```rust
/// use doc2booklet::BookletConfig;
///
/// let config = BookletConfig::builder()
///     .start_pages_template_id("1niKJyWq-template-id")
///     .shared_folder_id("0AE0-folder-id")
///     .output_dir("downloads")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookletConfig {
    /// Path to the service-account JSON key file. Default: `service_account.json`.
    pub credentials_path: PathBuf,

    /// OAuth2 scopes requested with the token grant. Default: drive + documents.
    pub scopes: Vec<String>,

    /// Drive id of the start-pages template document. Required.
    pub start_pages_template_id: String,

    /// Destination folder for the temporary copies (source copy and
    /// instantiated start pages). `None` leaves copies in the service
    /// account's root.
    pub shared_folder_id: Option<String>,

    /// Folder to upload the finished booklet into. `None` disables upload.
    pub upload_folder_id: Option<String>,

    /// Directory the finished booklet is written to. Default: `downloads`.
    pub output_dir: PathBuf,

    /// Fixed end-pages PDF appended after the body. `None` skips end pages.
    /// Default: `end_pages.pdf`.
    pub end_pages_path: Option<PathBuf>,

    /// Stamp font source. Default: bundled `fonts/Lora-Italic.ttf`.
    pub font: FontPolicy,

    /// Page-numbering policy. Default: skip the first page.
    pub numbering: NumberingPolicy,

    /// Body export transport. Default: chunked streaming.
    pub export_strategy: ExportStrategy,

    /// Edit-visibility poll bounds.
    pub edit_poll: EditPoll,

    /// HTTP timeout for each remote call, in seconds. Default: 120.
    ///
    /// Exports of long documents are the slow path; 120 s is generous
    /// without letting a stalled download block a worker indefinitely.
    pub request_timeout_secs: u64,
}

impl Default for BookletConfig {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("service_account.json"),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            start_pages_template_id: String::new(),
            shared_folder_id: None,
            upload_folder_id: None,
            output_dir: PathBuf::from("downloads"),
            end_pages_path: Some(PathBuf::from("end_pages.pdf")),
            font: FontPolicy::default(),
            numbering: NumberingPolicy::default(),
            export_strategy: ExportStrategy::default(),
            edit_poll: EditPoll::default(),
            request_timeout_secs: 120,
        }
    }
}

impl BookletConfig {
    /// Create a new builder for `BookletConfig`.
    pub fn builder() -> BookletConfigBuilder {
        BookletConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BookletConfig`].
#[derive(Debug)]
pub struct BookletConfigBuilder {
    config: BookletConfig,
}

impl BookletConfigBuilder {
    pub fn credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.credentials_path = path.into();
        self
    }

    pub fn scopes(mut self, scopes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn start_pages_template_id(mut self, id: impl Into<String>) -> Self {
        self.config.start_pages_template_id = id.into();
        self
    }

    pub fn shared_folder_id(mut self, id: impl Into<String>) -> Self {
        self.config.shared_folder_id = Some(id.into());
        self
    }

    pub fn upload_folder_id(mut self, id: impl Into<String>) -> Self {
        self.config.upload_folder_id = Some(id.into());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn end_pages_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.end_pages_path = Some(path.into());
        self
    }

    pub fn no_end_pages(mut self) -> Self {
        self.config.end_pages_path = None;
        self
    }

    pub fn font(mut self, policy: FontPolicy) -> Self {
        self.config.font = policy;
        self
    }

    pub fn numbering(mut self, policy: NumberingPolicy) -> Self {
        self.config.numbering = policy;
        self
    }

    pub fn export_strategy(mut self, strategy: ExportStrategy) -> Self {
        self.config.export_strategy = strategy;
        self
    }

    pub fn edit_poll(mut self, poll: EditPoll) -> Self {
        self.config.edit_poll = poll;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BookletConfig, BookletError> {
        let c = &self.config;
        if c.start_pages_template_id.is_empty() {
            return Err(BookletError::InvalidConfig(
                "start_pages_template_id must be set".into(),
            ));
        }
        if c.scopes.is_empty() {
            return Err(BookletError::InvalidConfig(
                "at least one OAuth scope is required".into(),
            ));
        }
        if c.edit_poll.max_attempts == 0 {
            return Err(BookletError::InvalidConfig(
                "edit_poll.max_attempts must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_template_id() {
        let err = BookletConfig::builder().build().unwrap_err();
        assert!(matches!(err, BookletError::InvalidConfig(_)));
    }

    #[test]
    fn builder_defaults() {
        let config = BookletConfig::builder()
            .start_pages_template_id("tmpl")
            .build()
            .unwrap();
        assert_eq!(config.numbering, NumberingPolicy::SkipFirst);
        assert_eq!(config.export_strategy, ExportStrategy::Chunked);
        assert_eq!(config.scopes.len(), 2);
        assert_eq!(config.end_pages_path, Some(PathBuf::from("end_pages.pdf")));
    }

    #[test]
    fn builder_rejects_empty_scopes() {
        let err = BookletConfig::builder()
            .start_pages_template_id("tmpl")
            .scopes(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, BookletError::InvalidConfig(_)));
    }

    #[test]
    fn no_end_pages_clears_default() {
        let config = BookletConfig::builder()
            .start_pages_template_id("tmpl")
            .no_end_pages()
            .build()
            .unwrap();
        assert!(config.end_pages_path.is_none());
    }
}
