//! Donation contract server
//!
//! Web front end around `contract-core`. A user points it at a Google Sheet
//! of donors and a Google Doc contract template, picks a donor, types the
//! donation amount and ITCMD rate, and downloads the filled contract as DOCX
//! or PDF.
//!
//! ## Endpoints
//!
//! - `GET /health`
//! - `GET /`, `POST /`: the web form and source loading
//! - `POST /contracts`, `GET /contracts/:filename`: generation and download
//! - `POST /api/contracts/preview`: substitution map as JSON

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use clap::Parser;
use contract_core::{ContractPlace, TokenStyle};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod contracts;
mod convert;
mod error;
mod handlers;
mod pages;
mod session;
mod sources;
mod state;

use config::{Settings, GOOGLE_DOCS_BASE_URL};
use state::AppState;

/// Command-line arguments for the contract server
#[derive(Parser, Debug)]
#[command(name = "contract-server")]
#[command(about = "Generates donation contracts from a Google Sheet and a Google Doc template")]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Folder for downloaded templates and generated contracts
    #[arg(long, env = "UPLOAD_FOLDER", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Session database (defaults to sessions.db inside the upload folder)
    #[arg(long, env = "CONTRACT_DATABASE_URL")]
    database_url: Option<String>,

    /// Hours a session may stay idle before it is discarded
    #[arg(long, env = "SESSION_TTL_HOURS", default_value = "168")]
    session_ttl_hours: u64,

    /// Office suite used for PDF conversion
    #[arg(long, env = "CONVERTER", default_value = "libreoffice")]
    converter: String,

    /// PDF conversion timeout in seconds
    #[arg(long, env = "CONVERT_TIMEOUT_SECS", default_value = "60")]
    convert_timeout_secs: u64,

    /// City printed on the place-and-date line
    #[arg(long, env = "CONTRACT_CITY", default_value = "Mossoró")]
    city: String,

    /// State abbreviation printed on the place-and-date line
    #[arg(long, env = "CONTRACT_STATE", default_value = "RN")]
    state: String,

    #[arg(long, env = "SHEETS_BASE_URL", default_value = GOOGLE_DOCS_BASE_URL)]
    sheets_base_url: String,

    #[arg(long, env = "DOCS_BASE_URL", default_value = GOOGLE_DOCS_BASE_URL)]
    docs_base_url: String,

    /// OAuth bearer token for documents that are not shared publicly
    #[arg(long, env = "GOOGLE_TOKEN", hide_env_values = true)]
    google_token: Option<String>,

    /// Text before each placeholder in the template, e.g. "<<"
    #[arg(long, env = "TOKEN_OPEN", default_value = "")]
    token_open: String,

    /// Text after each placeholder in the template, e.g. ">>"
    #[arg(long, env = "TOKEN_CLOSE", default_value = "")]
    token_close: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn settings(&self) -> Settings {
        let mut settings = Settings::for_upload_dir(self.upload_dir.clone());
        if let Some(url) = &self.database_url {
            settings.database_url = url.clone();
        }
        settings.session_ttl = Duration::from_secs(self.session_ttl_hours.saturating_mul(60 * 60));
        settings.converter_program = self.converter.clone();
        settings.convert_timeout = Duration::from_secs(self.convert_timeout_secs);
        settings.place = ContractPlace::new(self.city.clone(), self.state.clone());
        settings.sheets_base_url = self.sheets_base_url.clone();
        settings.docs_base_url = self.docs_base_url.clone();
        settings.google_token = self.google_token.clone().filter(|t| !t.is_empty());
        settings.token_style = TokenStyle::new(self.token_open.clone(), self.token_close.clone());
        settings
    }
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    // The preview API may be called from other origins
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Web form
        .route("/", get(handlers::index).post(handlers::load_sources))
        // Contract generation and download
        .route("/contracts", post(handlers::generate_contract))
        .route("/contracts/:filename", get(handlers::download_contract))
        // JSON API
        .route("/api/contracts/preview", post(handlers::preview_contract))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present, before env-backed arguments are read
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("contract_server={}", log_level).parse()?)
                .add_directive(format!("contract_core={}", log_level).parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Initializing contract server...");
    let settings = args.settings();
    let state = Arc::new(AppState::new(settings).await?);

    let app = router(state.clone());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);
    info!("Upload folder: {}", state.settings.upload_dir.display());
    info!(
        "PDF converter: {} (timeout {}s)",
        state.converter.program(),
        args.convert_timeout_secs
    );

    axum::serve(listener, app).await?;

    Ok(())
}
