//! Application state for the contract server

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use crate::config::Settings;
use crate::convert::PdfConverter;
use crate::session::purge_expired;
use crate::sources::GoogleSources;

pub struct AppState {
    pub db: SqlitePool,
    pub settings: Settings,
    pub sources: GoogleSources,
    pub converter: PdfConverter,
}

impl AppState {
    pub async fn new(settings: Settings) -> Result<Self> {
        let generated = settings.generated_dir();
        std::fs::create_dir_all(&generated)
            .with_context(|| format!("creating {}", generated.display()))?;

        tracing::info!("Connecting to database: {}", settings.database_url);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&settings.database_url)
            .await?;

        Self::run_migrations(&pool).await?;

        let purged = purge_expired(&pool, settings.session_ttl).await?;
        tracing::info!("Purged {} expired sessions", purged);

        let sources = GoogleSources::new(
            settings.sheets_base_url.clone(),
            settings.docs_base_url.clone(),
            settings.google_token.clone(),
        );
        let converter =
            PdfConverter::new(settings.converter_program.clone(), settings.convert_timeout);

        Ok(Self {
            db: pool,
            settings,
            sources,
            converter,
        })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                data_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_sessions_updated_at ON sessions(updated_at)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}
