//! treestore - CGI file store backend for lazy-loading tree widgets
//!
//! Serves one request per invocation: the request is read from the CGI
//! environment (or the matching flags), answered on stdout, and diagnostics
//! go to stderr.

mod cgi;
mod filesystem;
mod protocol;

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;

use cgi::{Method, RequestEnv};
use filesystem::config::{StoreConfig, DEFAULT_MAX_DEPTH};
use filesystem::FileStoreService;
use protocol::StoreError;

#[derive(Parser, Debug)]
#[command(name = "treestore")]
#[command(version, about = "CGI file store backend for lazy-loading tree widgets", long_about = None)]
struct Cli {
    /// Directory every request is confined to
    #[arg(long, env = "DOCUMENT_ROOT")]
    document_root: Option<PathBuf>,

    /// Request method (GET lists, POST renames, DELETE removes)
    #[arg(long, env = "REQUEST_METHOD", default_value = "GET")]
    method: String,

    /// URL-encoded request parameters
    #[arg(long, env = "QUERY_STRING", default_value = "")]
    query_string: String,

    /// Length of the POST body on stdin
    #[arg(long, env = "CONTENT_LENGTH", hide = true)]
    content_length: Option<String>,

    /// Deepest directory nesting expanded by deep listings and searches
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Descend into symlinked directories during deep traversal
    #[arg(long)]
    follow_symlinks: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let output = run(cli).await;

    let mut stdout = tokio::io::stdout();
    if let Err(e) = stdout.write_all(output.as_bytes()).await {
        tracing::error!("Failed to write response: {}", e);
    }
    if let Err(e) = stdout.flush().await {
        tracing::error!("Failed to flush response: {}", e);
    }
}

async fn run(cli: Cli) -> String {
    let Some(document_root) = cli
        .document_root
        .filter(|root| !root.as_os_str().is_empty())
    else {
        tracing::error!("No DOCUMENT_ROOT available");
        return cgi::render_failure(&StoreError::ServerError(
            "CGI environment variables missing.".to_string(),
        ));
    };

    let method = Method::parse(&cli.method);
    let length = cli
        .content_length
        .as_deref()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(0);
    let body = match method {
        Method::Post if length > 0 => read_body(length).await,
        _ => None,
    };
    let env = RequestEnv::new(method, &cli.query_string, body.as_deref());

    let config = StoreConfig {
        document_root,
        follow_symlinks: cli.follow_symlinks,
        max_depth: cli.max_depth,
        ..Default::default()
    };
    tracing::debug!(
        document_root = %config.document_root.display(),
        method = ?env.method,
        "serving request"
    );
    let service = FileStoreService::new(config);

    match cgi::dispatch(&service, &env)
        .await
        .and_then(|response| cgi::render_success(&response))
    {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!("request failed: {}", e);
            cgi::render_failure(&e)
        }
    }
}

async fn read_body(length: u64) -> Option<String> {
    let mut body = String::new();
    match tokio::io::stdin().take(length).read_to_string(&mut body).await {
        Ok(_) => Some(body),
        Err(e) => {
            tracing::warn!("Failed to read request body: {}", e);
            None
        }
    }
}
