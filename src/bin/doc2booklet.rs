//! CLI binary for doc2booklet.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `BookletConfig` + `SubmissionRequest` and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use doc2booklet::{
    assemble, BookletConfig, EditPoll, ExportStrategy, FontPolicy, NumberingPolicy,
    SubmissionRequest,
};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Assemble a booklet from a shared doc link
  doc2booklet --url "https://docs.google.com/document/d/ABC123/edit" \
      --title "My Story" --storyteller Alice --storyteller Bob \
      --director Jane --dedication "For everyone who listened"

  # Upload the result back to Drive as well
  doc2booklet --url ".../d/ABC123/edit" --title "My Story" \
      --upload-folder-id 0AE0YZ4clOzQ7Uk9PVA

  # Number every page (including the cover), using the built-in font
  doc2booklet --url ".../d/ABC123/edit" --number-all-pages --builtin-font

  # Fetch the body via the export link instead of the streamed endpoint
  doc2booklet --url ".../d/ABC123/edit" --export-strategy direct-link

ENVIRONMENT VARIABLES:
  Most flags have a DOC2BOOKLET_* fallback, e.g.:
  DOC2BOOKLET_CREDENTIALS     Service-account key file path
  DOC2BOOKLET_TEMPLATE_ID     Start-pages template document id
  DOC2BOOKLET_FOLDER_ID       Destination folder for working copies
  DOC2BOOKLET_OUTPUT_DIR      Where finished booklets are written

SETUP:
  1. Create a service account and share the template + folder with it.
  2. Save its JSON key:   service_account.json
  3. Assemble:            doc2booklet --url <doc link> --title <title> ...
"#;

/// Assemble a print-ready PDF booklet from a Google Doc.
#[derive(Parser, Debug)]
#[command(
    name = "doc2booklet",
    version,
    about = "Assemble a print-ready PDF booklet from a Google Doc",
    long_about = "Copy a Google Doc, strip the working notes before the second page break, \
wrap it in templated start pages and fixed end pages, stamp page numbers, and write the \
finished booklet as a single PDF.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Link to the source Google Doc (must contain /d/<id>).
    #[arg(long, env = "DOC2BOOKLET_URL")]
    url: String,

    /// Booklet title for the start pages.
    #[arg(long, env = "DOC2BOOKLET_TITLE", default_value = "")]
    title: String,

    /// Storyteller name; repeat the flag for several (rendered sorted).
    #[arg(long = "storyteller")]
    storyteller_names: Vec<String>,

    /// Director name for the start pages.
    #[arg(long, env = "DOC2BOOKLET_DIRECTOR", default_value = "")]
    director: String,

    /// Optional crew identifier for the start pages.
    #[arg(long, env = "DOC2BOOKLET_CREW_ID")]
    crew_id: Option<String>,

    /// Dedication text for the start pages.
    #[arg(long, env = "DOC2BOOKLET_DEDICATION", default_value = "")]
    dedication: String,

    /// Service-account JSON key file.
    #[arg(long, env = "DOC2BOOKLET_CREDENTIALS", default_value = "service_account.json")]
    credentials: PathBuf,

    /// Start-pages template document id.
    #[arg(long, env = "DOC2BOOKLET_TEMPLATE_ID")]
    template_id: String,

    /// Drive folder the working copies are created in.
    #[arg(long, env = "DOC2BOOKLET_FOLDER_ID")]
    folder_id: Option<String>,

    /// Upload the finished booklet into this Drive folder.
    #[arg(long, env = "DOC2BOOKLET_UPLOAD_FOLDER_ID")]
    upload_folder_id: Option<String>,

    /// Directory finished booklets are written to.
    #[arg(long, env = "DOC2BOOKLET_OUTPUT_DIR", default_value = "downloads")]
    output_dir: PathBuf,

    /// Fixed end-pages PDF appended after the body.
    #[arg(long, env = "DOC2BOOKLET_END_PAGES", default_value = "end_pages.pdf")]
    end_pages: PathBuf,

    /// Skip the end pages entirely.
    #[arg(long)]
    no_end_pages: bool,

    /// Bundled italic TTF used for page-number labels.
    #[arg(long, env = "DOC2BOOKLET_FONT", default_value = "fonts/Lora-Italic.ttf")]
    font: PathBuf,

    /// Use the built-in Times-Italic instead of the bundled font.
    #[arg(long)]
    builtin_font: bool,

    /// Number every page, including the first.
    #[arg(long)]
    number_all_pages: bool,

    /// Body export transport: chunked or direct-link.
    #[arg(long, env = "DOC2BOOKLET_EXPORT_STRATEGY", value_enum, default_value = "chunked")]
    export_strategy: ExportArg,

    /// Edit-visibility poll attempts before exporting anyway.
    #[arg(long, env = "DOC2BOOKLET_POLL_ATTEMPTS", default_value_t = 5)]
    poll_attempts: u32,

    /// Delay between edit-visibility polls, in milliseconds.
    #[arg(long, env = "DOC2BOOKLET_POLL_INTERVAL_MS", default_value_t = 500)]
    poll_interval_ms: u64,

    /// Per-call HTTP timeout in seconds.
    #[arg(long, env = "DOC2BOOKLET_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOC2BOOKLET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "DOC2BOOKLET_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ExportArg {
    Chunked,
    DirectLink,
}

impl From<ExportArg> for ExportStrategy {
    fn from(v: ExportArg) -> Self {
        match v {
            ExportArg::Chunked => ExportStrategy::Chunked,
            ExportArg::DirectLink => ExportStrategy::DirectLink,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Map flags onto the library config ───────────────────────────────
    let mut builder = BookletConfig::builder()
        .credentials_path(&cli.credentials)
        .start_pages_template_id(&cli.template_id)
        .output_dir(&cli.output_dir)
        .export_strategy(cli.export_strategy.clone().into())
        .edit_poll(EditPoll {
            max_attempts: cli.poll_attempts,
            interval_ms: cli.poll_interval_ms,
        })
        .request_timeout_secs(cli.timeout);

    if let Some(folder) = &cli.folder_id {
        builder = builder.shared_folder_id(folder);
    }
    if let Some(folder) = &cli.upload_folder_id {
        builder = builder.upload_folder_id(folder);
    }
    builder = if cli.no_end_pages {
        builder.no_end_pages()
    } else {
        builder.end_pages_path(&cli.end_pages)
    };
    builder = builder.font(if cli.builtin_font {
        FontPolicy::BuiltinItalic
    } else {
        FontPolicy::Bundled(cli.font.clone())
    });
    if cli.number_all_pages {
        builder = builder.numbering(NumberingPolicy::AllPages);
    }
    let config = builder.build().context("Invalid configuration")?;

    let request = SubmissionRequest {
        source_url: cli.url,
        title: cli.title,
        storyteller_names: cli.storyteller_names,
        director_name: cli.director,
        crew_id: cli.crew_id,
        dedication: cli.dedication,
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let output = assemble(&request, &config)
        .await
        .context("Booklet assembly failed")?;

    if !cli.quiet {
        eprintln!(
            "✔ {} — {} pages in {:.1}s",
            output.output_path.display(),
            output.total_pages,
            output.stats.total_ms as f64 / 1000.0
        );
        if let Some(id) = &output.uploaded_file_id {
            eprintln!("  uploaded as Drive file {id}");
        }
    }
    println!("{}", output.output_path.display());
    Ok(())
}
