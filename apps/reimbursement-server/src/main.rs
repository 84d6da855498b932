//! Reimbursement Analysis Server
//!
//! Accepts a reimbursement policy (PDF) and a ZIP bundle of invoices, asks a
//! language model to judge every invoice against the policy, and returns one
//! decision per invoice plus an overall status. Endpoints:
//!
//! - `GET /health`
//! - `POST /analyze_invoices` (multipart: `policy_file`, `invoice_zip`)
//!
//! ## Architecture
//!
//! The server is a thin HTTP shell over `reimbursement-engine`:
//!
//! - Multipart parsing and error-to-HTTP mapping live here
//! - Validation, extraction, model calls and aggregation live in the engine
//! - One `ReimbursementAnalyzer` is built at startup and shared by all requests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use clap::Parser;
use reimbursement_engine::{
    EngineConfig, GeminiClient, GeminiConfig, ModelClient, ReimbursementAnalyzer,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;

use api::{handle_analyze_invoices, handle_health};

const MIB: usize = 1024 * 1024;

/// Command-line arguments for the reimbursement server
#[derive(Parser, Debug)]
#[command(name = "reimbursement-server")]
#[command(about = "Analyze invoices against a reimbursement policy")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = reimbursement_engine::model::gemini::DEFAULT_MODEL)]
    model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_API_BASE", default_value = reimbursement_engine::model::gemini::DEFAULT_BASE_URL)]
    api_base: String,

    /// Invoices analysed at once per request
    #[arg(long, env = "ANALYZER_CONCURRENCY", default_value = "4")]
    concurrency: usize,

    /// Timeout for one model call, in seconds
    #[arg(long, env = "MODEL_TIMEOUT_SECS", default_value = "60")]
    model_timeout_secs: u64,

    /// Timeout for extracting text from one document, in seconds
    #[arg(long, env = "EXTRACTION_TIMEOUT_SECS", default_value = "30")]
    extraction_timeout_secs: u64,

    /// Maximum request body size in MiB
    #[arg(long, env = "MAX_UPLOAD_MB", default_value = "50")]
    max_upload_mb: usize,

    /// Maximum uncompressed size of one archive entry in MiB
    #[arg(long, env = "MAX_ENTRY_MB", default_value = "20")]
    max_entry_mb: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_concurrency(self.concurrency)
            .with_model_timeout(Duration::from_secs(self.model_timeout_secs))
            .with_extraction_timeout(Duration::from_secs(self.extraction_timeout_secs))
            .with_max_entry_size(self.max_entry_mb.saturating_mul(MIB as u64))
    }

    fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(MIB)
    }

    fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.api_base.clone(),
            timeout: Duration::from_secs(self.model_timeout_secs),
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<ReimbursementAnalyzer>,
}

/// Build the router with all routes and middleware
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handle_health))
        // Analysis
        .route("/analyze_invoices", post(handle_analyze_invoices))
        .route("/analyze_invoices/", post(handle_analyze_invoices))
        // Apply middleware
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reimbursement server on {}:{}", args.host, args.port);

    let model = GeminiClient::new(args.gemini_config()).context("Failed to create Gemini client")?;
    let model_name = model.model_name().to_string();
    let config = args.engine_config();

    // Create shared state
    let state = AppState {
        analyzer: Arc::new(ReimbursementAnalyzer::with_pdf_reader(
            config.clone(),
            Arc::new(model),
        )),
    };

    let app = app(state, args.max_upload_bytes());

    // Start server
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Model: {}", model_name);
    info!(
        "Concurrency: {}, model timeout: {}s, extraction timeout: {}s",
        config.effective_concurrency(),
        config.model_timeout.as_secs(),
        config.extraction_timeout.as_secs()
    );
    info!("Upload limit: {} MiB, entry limit: {} MiB", args.max_upload_mb, args.max_entry_mb);

    axum::serve(listener, app).await?;

    Ok(())
}
