//! Runtime settings shared by every handler

use std::path::{Path, PathBuf};
use std::time::Duration;

use contract_core::{ContractPlace, TokenStyle};

/// Sub-folder of the upload directory that receives generated contracts
pub const GENERATED_DIR: &str = "contratos_gerados";

pub const GOOGLE_DOCS_BASE_URL: &str = "https://docs.google.com";

/// Idle time after which a session is forgotten (one week)
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Settings {
    /// Downloaded templates live here, generated contracts in `GENERATED_DIR` below it
    pub upload_dir: PathBuf,
    pub database_url: String,
    /// Sessions idle for longer are treated as unknown and purged
    pub session_ttl: Duration,
    /// Office suite binary used for DOCX → PDF
    pub converter_program: String,
    pub convert_timeout: Duration,
    pub place: ContractPlace,
    pub sheets_base_url: String,
    pub docs_base_url: String,
    /// Bearer token sent with export requests, for non-public documents
    pub google_token: Option<String>,
    pub token_style: TokenStyle,
}

impl Settings {
    /// Defaults for a given upload directory
    pub fn for_upload_dir(upload_dir: impl Into<PathBuf>) -> Self {
        let upload_dir = upload_dir.into();
        Self {
            database_url: default_database_url(&upload_dir),
            upload_dir,
            session_ttl: DEFAULT_SESSION_TTL,
            converter_program: "libreoffice".to_string(),
            convert_timeout: Duration::from_secs(60),
            place: ContractPlace::default(),
            sheets_base_url: GOOGLE_DOCS_BASE_URL.to_string(),
            docs_base_url: GOOGLE_DOCS_BASE_URL.to_string(),
            google_token: None,
            token_style: TokenStyle::default(),
        }
    }

    pub fn generated_dir(&self) -> PathBuf {
        self.upload_dir.join(GENERATED_DIR)
    }
}

pub fn default_database_url(upload_dir: &Path) -> String {
    format!("sqlite:{}/sessions.db?mode=rwc", upload_dir.display())
}
