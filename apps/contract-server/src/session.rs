//! Server-side sessions
//!
//! The browser only holds an opaque id in the `contract_session` cookie; the
//! donor list, the template path and pending flash messages are kept as a
//! JSON blob in SQLite.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, SecondsFormat, Utc};
use contract_core::DonorRecord;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "contract_session";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

/// A one-shot message shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Last spreadsheet reference typed in the form
    #[serde(default)]
    pub sheet_url: String,
    /// Last template document reference typed in the form
    #[serde(default)]
    pub doc_url: String,
    #[serde(default)]
    pub donors: Option<Vec<DonorRecord>>,
    #[serde(default)]
    pub template_path: Option<PathBuf>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

impl SessionData {
    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flashes.push(Flash {
            level,
            message: message.into(),
        });
    }

    /// Record an error as a flash message
    pub fn flash_error(&mut self, err: &AppError) {
        warn!("{}", err);
        self.flash(err.flash_level(), err.user_message());
    }

    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }
}

/// Session id carried by the request's `Cookie` header, if well formed
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
        .map(|id| id.to_string())
}

/// Fixed-width UTC timestamp, so stored values compare in time order as text
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Sessions last touched before this instant have expired
fn expiry_cutoff(ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn is_expired(updated_at: &str, cutoff: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(updated_at) {
        Ok(at) => at.with_timezone(&Utc) < cutoff,
        Err(_) => true,
    }
}

/// Delete every session idle for longer than `ttl`
pub async fn purge_expired(db: &SqlitePool, ttl: Duration) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM sessions WHERE updated_at < ?")
        .bind(timestamp(expiry_cutoff(ttl)))
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

pub struct Session {
    id: String,
    pub data: SessionData,
    is_new: bool,
    ttl: Duration,
}

impl Session {
    /// Load the session named by the request cookie, or start a fresh one.
    ///
    /// Sessions idle for longer than `ttl` count as unknown.
    pub async fn load(db: &SqlitePool, headers: &HeaderMap, ttl: Duration) -> Result<Self, AppError> {
        let Some(id) = session_id_from_headers(headers) else {
            return Ok(Self::fresh(ttl));
        };

        let row: Option<(String, String)> =
            sqlx::query_as("SELECT data_json, updated_at FROM sessions WHERE id = ?")
                .bind(&id)
                .fetch_optional(db)
                .await?;

        let Some((data_json, updated_at)) = row else {
            debug!(session = %id, "Unknown session id, starting a new session");
            return Ok(Self::fresh(ttl));
        };

        if is_expired(&updated_at, expiry_cutoff(ttl)) {
            debug!(session = %id, updated_at = %updated_at, "Session expired, starting a new session");
            return Ok(Self::fresh(ttl));
        }

        let data = match serde_json::from_str(&data_json) {
            Ok(data) => data,
            Err(e) => {
                warn!(session = %id, "Discarding corrupt session data: {}", e);
                SessionData::default()
            }
        };

        Ok(Self {
            id,
            data,
            is_new: false,
            ttl,
        })
    }

    fn fresh(ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: SessionData::default(),
            is_new: true,
            ttl,
        }
    }

    /// Persist the session; last write wins
    pub async fn save(&self, db: &SqlitePool) -> Result<(), AppError> {
        let data_json = serde_json::to_string(&self.data)?;
        let now = timestamp(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO sessions (id, data_json, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data_json = excluded.data_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&self.id)
        .bind(&data_json)
        .bind(&now)
        .bind(&now)
        .execute(db)
        .await?;

        Ok(())
    }

    fn cookie(&self) -> HeaderValue {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, self.id);
        // A UUID only contains visible ASCII
        HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
    }

    /// Save and attach the session cookie to a response.
    ///
    /// Starting a session also sweeps out expired ones.
    pub async fn finish(self, db: &SqlitePool, response: impl IntoResponse) -> Result<Response, AppError> {
        self.save(db).await?;
        let mut response = response.into_response();
        if self.is_new {
            let purged = purge_expired(db, self.ttl).await?;
            if purged > 0 {
                debug!(purged, "Removed expired sessions");
            }
            response
                .headers_mut()
                .append(header::SET_COOKIE, self.cookie());
        }
        Ok(response)
    }
}
