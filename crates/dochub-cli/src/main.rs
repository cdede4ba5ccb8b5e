//! `dochub` CLI: command-line client for the dochub document service.
//!
//! Lists, searches, uploads and downloads documents, manages API keys and
//! offers an interactive table view. Every request goes through
//! `dochub-client`; failures are classified and printed with a hint on
//! whether retrying can help.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod browse;

use std::error::Error as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use dochub_client::error_info::{ErrorInfo, ErrorShape, Recovery, inspect_error};
use dochub_client::format::{
    content_type_extension, format_file_size, format_time_passed, format_timestamp,
};
use dochub_client::models::{Document, Principal, Scope};
use dochub_client::table::PaginatedTable;
use dochub_client::{ApiKeyPages, Dochub, DochubConfig, DochubError, DocumentPages};
use tracing::debug;

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

const BANNER_SMALL: &str = "▤ dochub";

// ── CLI structure ────────────────────────────────────────────────────

/// dochub: your documents, searchable.
#[derive(Parser)]
#[command(
    name = "dochub",
    version,
    about = "dochub CLI: upload, search and manage documents and API keys",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         DOCHUB_URL     Service address (default: http://localhost:8080)\n  \
         DOCHUB_TOKEN   Access token or API key secret\n  \
         DOCHUB_LOG     Log filter (default: warn)\n\n\
         {DIM}Examples:{RESET}\n  \
         dochub documents list --limit 10\n  \
         dochub documents upload invoice.pdf\n  \
         dochub api-keys create ci --scope write --scope read\n  \
         dochub browse documents"
    ),
)]
struct Cli {
    /// dochub service address.
    #[arg(long, env = "DOCHUB_URL", default_value = "http://localhost:8080")]
    url: String,

    /// Access token.
    #[arg(long, env = "DOCHUB_TOKEN")]
    token: Option<String>,

    /// Per-request timeout in seconds. Without it requests wait indefinitely.
    #[arg(long, env = "DOCHUB_TIMEOUT")]
    timeout: Option<u64>,

    /// Log filter, e.g. "debug" or "dochub_client=trace".
    #[arg(long, env = "DOCHUB_LOG", default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, default_value = "false")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Document operations.
    Documents {
        #[command(subcommand)]
        action: DocumentCommands,
    },
    /// API key operations.
    #[command(name = "api-keys")]
    ApiKeys {
        #[command(subcommand)]
        action: ApiKeyCommands,
    },
    /// Show where to log in.
    Login {
        /// Only print the URL, do not open a browser.
        #[arg(long, default_value = "false")]
        no_browser: bool,
    },
    /// Show who the configured token belongs to.
    Whoami,
    /// Page through a listing interactively.
    Browse {
        /// Listing to open.
        #[arg(value_enum)]
        view: BrowseView,
    },
}

#[derive(Subcommand)]
enum DocumentCommands {
    /// List documents, one page at a time.
    List {
        /// Zero-based page number.
        #[arg(long, default_value = "0")]
        page: u64,
        /// Rows per page (5, 10, 25, 50 or 100).
        #[arg(long, default_value = "25")]
        limit: u64,
    },
    /// Full-text search.
    Search {
        /// Search text.
        query: String,
    },
    /// Show one document with its labels and links.
    Show {
        /// Document ID.
        id: String,
    },
    /// Upload a file as a new document.
    Upload {
        /// File to upload.
        file: PathBuf,
        /// Document name (default: the file name).
        #[arg(long)]
        name: Option<String>,
        /// MIME type (default: guessed from the extension).
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Download a document's content.
    Download {
        /// Document ID.
        id: String,
        /// Revision to fetch (default: the latest).
        #[arg(long)]
        revision: Option<u64>,
        /// Output file (default: the document name in the current directory).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Run text recognition on a document.
    Ocr {
        /// Document ID.
        id: String,
    },
}

#[derive(Subcommand)]
enum ApiKeyCommands {
    /// List API keys.
    List {
        /// Zero-based page number.
        #[arg(long, default_value = "0")]
        page: u64,
        /// Rows per page (5, 10, 25, 50 or 100).
        #[arg(long, default_value = "25")]
        limit: u64,
    },
    /// Create an API key and print its secret once.
    Create {
        /// Key name.
        name: String,
        /// Scope to grant; repeat for several (default: read).
        #[arg(long = "scope")]
        scopes: Vec<Scope>,
        /// Grant no explicit scopes; the key inherits your permissions.
        #[arg(long, default_value = "false", conflicts_with = "scopes")]
        inherit: bool,
    },
    /// Delete one or more API keys.
    Delete {
        /// API key IDs.
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BrowseView {
    Documents,
    ApiKeys,
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_document(client: &Dochub, doc: &Document, labels: &[&str]) {
    let now = Utc::now();
    header("📄", &doc.name);
    kv_line("ID", &doc.id);
    kv_line(
        "Type",
        &format!("{} ({})", content_type_extension(&doc.content_type), doc.content_type),
    );
    kv_line("Size", &format_file_size(doc.size));
    kv_line("Revision", &doc.revision_number.to_string());
    kv_line(
        "Labels",
        &if labels.is_empty() {
            format!("{DIM}(none){RESET}")
        } else {
            labels.join(", ")
        },
    );
    kv_line(
        "Created",
        &format!(
            "{} {DIM}({}){RESET}",
            format_time_passed(now, doc.created_at),
            format_timestamp(doc.created_at)
        ),
    );
    kv_line(
        "Updated",
        &format!(
            "{} {DIM}({}){RESET}",
            format_time_passed(now, doc.updated_at),
            format_timestamp(doc.updated_at)
        ),
    );
    kv_line("Download", &client.download_url(doc));
    if doc.is_previewable() {
        kv_line("Preview", &client.preview_url(doc));
    }
    println!();
}

/// Print a classified error to stderr.
fn print_error_info(info: &ErrorInfo) {
    eprintln!();
    eprintln!("  {RED}{BOLD}✗ {}:{RESET} {}", info.title, info.message);
    if let Some(details) = info.details() {
        for line in details.lines() {
            eprintln!("    {DIM}{line}{RESET}");
        }
    }
    let hint = match info.recovery {
        Recovery::Retry => "Run the command again.",
        Recovery::Reload => "Check the request, then start over.",
    };
    eprintln!("  {DIM}{hint}{RESET}");
    eprintln!();
}

/// Classify an error chain: a client error anywhere in it decides the shape,
/// anything else is reported as an unknown error.
fn classify(err: &anyhow::Error) -> ErrorInfo {
    let shape = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<DochubError>())
        .map_or_else(
            || ErrorShape::Other {
                message: Some(err.to_string()),
                detail: err.source().map(|_| format!("{err:#}")),
            },
            DochubError::shape,
        );
    inspect_error(&shape)
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    let result = match build_client(&cli) {
        Ok(client) => run(client, cli.command).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!(error = %format!("{e:#}"), "command failed");
            print_error_info(&classify(&e));
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_client(cli: &Cli) -> Result<Dochub> {
    let client = Dochub::with_config(DochubConfig {
        base_url: cli.url.clone(),
        token: cli.token.clone(),
        timeout: cli.timeout.map(Duration::from_secs),
    })?;
    Ok(client)
}

async fn run(client: Dochub, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Documents { action } => cmd_documents(&client, action).await,
        Commands::ApiKeys { action } => cmd_api_keys(&client, action).await,
        Commands::Login { no_browser } => {
            cmd_login(&client, no_browser);
            Ok(())
        }
        Commands::Whoami => cmd_whoami(&client),
        Commands::Browse { view } => match view {
            BrowseView::Documents => browse::browse_documents(client).await,
            BrowseView::ApiKeys => browse::browse_api_keys(client).await,
        },
    }
}

// ── Documents ────────────────────────────────────────────────────────

async fn cmd_documents(client: &Dochub, action: DocumentCommands) -> Result<()> {
    match action {
        DocumentCommands::List { page, limit } => {
            let mut table = PaginatedTable::new("Documents", DocumentPages::new(client.clone()));
            table
                .load_page(page, limit)
                .await
                .with_context(|| format!("failed to list documents page {page}"))?;
            println!();
            browse::render(&table);
        }
        DocumentCommands::Search { query } => {
            let query = query.trim();
            let results = client
                .search_documents(query, 0, dochub_client::search::SEARCH_LIMIT)
                .await
                .with_context(|| format!("search for \"{query}\" failed"))?;
            println!();
            header("🔎", &format!("Search: {query}"));
            if results.items.is_empty() {
                println!("  {DIM}{}{RESET}", dochub_client::search::NO_RESULTS_MESSAGE);
            }
            for doc in &results.items {
                println!("  {CYAN}├─{RESET} {} {DIM}{}{RESET}", doc.name, doc.id);
            }
            println!();
        }
        DocumentCommands::Show { id } => {
            let doc = client
                .retrieve_document(&id)
                .await
                .with_context(|| format!("failed to fetch document {id}"))?;
            println!();
            print_document(client, &doc, &doc.label_names(&doc.embedded.labels));
        }
        DocumentCommands::Upload {
            file,
            name,
            content_type,
        } => cmd_upload(client, &file, name, content_type).await?,
        DocumentCommands::Download {
            id,
            revision,
            output,
        } => cmd_download(client, &id, revision, output).await?,
        DocumentCommands::Ocr { id } => {
            client
                .ocr_document(&id)
                .await
                .with_context(|| format!("failed to start text recognition for {id}"))?;
            success(&format!("Text recognition started for {id}"));
        }
    }
    Ok(())
}

async fn cmd_upload(
    client: &Dochub,
    file: &Path,
    name: Option<String>,
    content_type: Option<String>,
) -> Result<()> {
    let data = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = match name {
        Some(name) => name,
        None => file
            .file_name()
            .and_then(|n| n.to_str())
            .context("file name is not valid UTF-8, pass --name")?
            .to_owned(),
    };
    let content_type = content_type.unwrap_or_else(|| guess_content_type(file).to_owned());

    let doc = client
        .create_document(&name, &content_type, data)
        .await
        .with_context(|| format!("failed to upload {}", file.display()))?;
    success(&format!(
        "Uploaded {} ({}) as {}",
        doc.name,
        format_file_size(doc.size),
        doc.id
    ));
    Ok(())
}

async fn cmd_download(
    client: &Dochub,
    id: &str,
    revision: Option<u64>,
    output: Option<PathBuf>,
) -> Result<()> {
    let (revision, output) = match (revision, output) {
        (Some(revision), Some(output)) => (revision, output),
        (revision, output) => {
            let doc = client
                .retrieve_document(id)
                .await
                .with_context(|| format!("failed to fetch document {id}"))?;
            (
                revision.unwrap_or(doc.revision_number),
                output.unwrap_or_else(|| PathBuf::from(&doc.name)),
            )
        }
    };

    let bytes = client
        .download_document(id, revision)
        .await
        .with_context(|| format!("failed to download {id} revision {revision}"))?;
    let size = bytes.len() as u64;
    tokio::fs::write(&output, bytes)
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;
    success(&format!(
        "Saved {} to {}",
        format_file_size(size),
        output.display()
    ));
    Ok(())
}

// ── API keys ─────────────────────────────────────────────────────────

async fn cmd_api_keys(client: &Dochub, action: ApiKeyCommands) -> Result<()> {
    match action {
        ApiKeyCommands::List { page, limit } => {
            let mut table = PaginatedTable::new("API keys", ApiKeyPages::new(client.clone()));
            table
                .load_page(page, limit)
                .await
                .with_context(|| format!("failed to list API keys page {page}"))?;
            println!();
            browse::render(&table);
        }
        ApiKeyCommands::Create {
            name,
            scopes,
            inherit,
        } => {
            let scopes = match (inherit, scopes.is_empty()) {
                (true, _) => Vec::new(),
                (false, true) => Scope::DEFAULT.to_vec(),
                (false, false) => scopes,
            };
            let created = client
                .create_api_key(&name, &scopes)
                .await
                .with_context(|| format!("failed to create API key \"{name}\""))?;
            println!();
            header("🔑", "API key created");
            kv_line("ID", &created.api_key.id);
            kv_line("Name", &created.api_key.name);
            kv_line(
                "Scopes",
                &if created.api_key.scopes.is_some() {
                    created.api_key.scopes_label()
                } else {
                    format!("{DIM}(inherited){RESET}")
                },
            );
            kv_line("Secret", &format!("{BOLD}{}{RESET}", created.secret));
            println!();
            warning("Copy the secret now. It will not be shown again.");
            println!();
        }
        ApiKeyCommands::Delete { ids } => {
            for id in &ids {
                client
                    .delete_api_key(id)
                    .await
                    .with_context(|| format!("failed to delete API key {id}"))?;
                success(&format!("Deleted API key {id}"));
            }
        }
    }
    Ok(())
}

// ── Auth ─────────────────────────────────────────────────────────────

fn cmd_login(client: &Dochub, no_browser: bool) {
    let login_url = client.login_url();
    println!();
    header("🔐", "Login");
    println!();
    println!("  {CYAN}{login_url}{RESET}");
    println!();

    if !no_browser {
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open").arg(&login_url).spawn();
        }
        #[cfg(target_os = "linux")]
        {
            let _ = std::process::Command::new("xdg-open")
                .arg(&login_url)
                .spawn();
        }
        #[cfg(target_os = "windows")]
        {
            let _ = std::process::Command::new("cmd")
                .args(["/C", "start", &login_url])
                .spawn();
        }
    }

    println!("  {DIM}After logging in, create an API key and set it with:{RESET}");
    println!();
    println!("    {CYAN}export DOCHUB_TOKEN=<secret>{RESET}");
    println!();
}

fn cmd_whoami(client: &Dochub) -> Result<()> {
    let token = client
        .token()
        .context("no access token configured, set DOCHUB_TOKEN or pass --token")?;
    let principal = Principal::from_access_token(token)?;
    println!();
    println!("  {BANNER_SMALL} {DIM}{}{RESET}", client.base_url());
    println!();
    header("👤", &principal.username);
    kv_line("User ID", &principal.user_id);
    kv_line(
        "Claims",
        &if principal.claims.is_empty() {
            format!("{DIM}(none){RESET}")
        } else {
            principal.claims.join(", ")
        },
    );
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_is_guessed_from_extension() {
        assert_eq!(guess_content_type(Path::new("a/Scan.PDF")), "application/pdf");
        assert_eq!(guess_content_type(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(guess_content_type(Path::new("notes")), "application/octet-stream");
    }

    #[test]
    fn client_errors_are_classified_through_context() {
        let err = anyhow::Error::new(DochubError::Http {
            method: "GET".to_owned(),
            url: "http://localhost:8080/api/documents/x".to_owned(),
            status: 404,
            body: String::new(),
        })
        .context("failed to fetch document x");
        let info = classify(&err);
        assert_eq!(info.title, "Not found");
        assert_eq!(info.recovery, Recovery::Reload);
    }

    #[test]
    fn other_errors_are_unknown() {
        let err = anyhow::anyhow!("disk full").context("failed to write out.pdf");
        let info = classify(&err);
        assert_eq!(info.title, "failed to write out.pdf");
        assert_eq!(info.message, "An error has occured.");
        assert!(info.details().unwrap_or_default().contains("disk full"));
    }
}
