//! `bibliocat` — serve the book-metadata cataloging pipeline over HTTP.

use anyhow::Context;
use bibliocat::{CatalogConfig, Cataloger, OcrCredentials};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "bibliocat",
    version,
    about = "Catalog PDF books: rasterize front pages, OCR them, and extract bibliographic metadata"
)]
struct Cli {
    /// Address to bind.
    #[arg(long, env = "BIBLIOCAT_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "BIBLIOCAT_PORT", default_value_t = 7860)]
    port: u16,

    /// Working directory for staged PDFs. Cleared at the start of every run.
    #[arg(long, env = "BIBLIOCAT_WORKDIR", default_value = "pdf")]
    working_dir: PathBuf,

    /// Front pages to rasterize per book (1-10).
    #[arg(long, env = "BIBLIOCAT_PAGES", default_value_t = 3)]
    pages: usize,

    /// Completion model identifier.
    #[arg(long, env = "BIBLIOCAT_MODEL", default_value = bibliocat::config::DEFAULT_MODEL)]
    model: String,

    /// Endpoint of the document-text-detection service.
    #[arg(long, env = "OCR_ENDPOINT", default_value = bibliocat::config::DEFAULT_OCR_ENDPOINT)]
    ocr_endpoint: String,

    /// Path to the OCR credential file.
    #[arg(long, env = "OCR_CREDENTIALS")]
    ocr_credentials: Option<PathBuf>,

    /// OCR credential JSON passed inline (takes precedence over the path).
    #[arg(long, env = "OCR_CREDENTIALS_JSON", hide_env_values = true)]
    ocr_credentials_json: Option<String>,

    /// Bearer key for the completion service.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Sampling temperature for metadata extraction.
    #[arg(long, default_value_t = 0.3)]
    temperature: f32,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("bibliocat=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bibliocat=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut builder = CatalogConfig::builder()
        .working_dir(cli.working_dir)
        .pages_per_book(cli.pages)
        .model(cli.model)
        .ocr_endpoint(cli.ocr_endpoint)
        .temperature(cli.temperature);

    if let Some(json) = cli.ocr_credentials_json {
        builder = builder.ocr_credentials(OcrCredentials::Inline(json));
    } else if let Some(path) = cli.ocr_credentials {
        builder = builder.ocr_credentials(OcrCredentials::Path(path));
    }
    if let Some(key) = cli.api_key {
        builder = builder.completion_api_key(key);
    }

    let config = builder.build()?;
    let cataloger = Cataloger::new(config).context("failed to configure the cataloger")?;

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .context("invalid host/port")?;
    let app = bibliocat::server::router(Arc::new(cataloger));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
