//! Google Sheets / Google Docs export client
//!
//! Both documents are read through their public export endpoints: the donor
//! sheet as CSV, the contract template as DOCX.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use contract_core::DonorRecord;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use thiserror::Error;
use tracing::{debug, info, warn};

/// File name used when the export response does not name the document
pub const UNNAMED_TEMPLATE: &str = "documento_contrato_sem_nome";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Spreadsheet,
    Document,
}

impl SourceKind {
    fn path_segment(self) -> &'static str {
        match self {
            SourceKind::Spreadsheet => "spreadsheets",
            SourceKind::Document => "document",
        }
    }

    fn export_format(self) -> &'static str {
        match self {
            SourceKind::Spreadsheet => "csv",
            SourceKind::Document => "docx",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Spreadsheet => f.write_str("spreadsheet"),
            SourceKind::Document => f.write_str("document"),
        }
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("invalid {kind} reference: '{reference}'")]
    InvalidReference { kind: SourceKind, reference: String },

    #[error("{kind} {id} not found")]
    NotFound { kind: SourceKind, id: String },

    #[error("permission denied for {kind} {id}")]
    PermissionDenied { kind: SourceKind, id: String },

    #[error("{kind} export returned {status}: {body}")]
    Upstream {
        kind: SourceKind,
        status: u16,
        body: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn kind(&self) -> Option<SourceKind> {
        match self {
            SourceError::InvalidReference { kind, .. }
            | SourceError::NotFound { kind, .. }
            | SourceError::PermissionDenied { kind, .. }
            | SourceError::Upstream { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Pull the document id out of a full Google URL, or accept a bare id.
///
/// `https://docs.google.com/spreadsheets/d/ABC_123/edit#gid=0` → `ABC_123`
pub fn extract_document_id(kind: SourceKind, reference: &str) -> Result<String, SourceError> {
    let reference = reference.trim();
    let invalid = || SourceError::InvalidReference {
        kind,
        reference: reference.to_string(),
    };

    let marker = format!("/{}/d/", kind.path_segment());
    let candidate = match reference.find(&marker) {
        Some(pos) => reference[pos + marker.len()..]
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default(),
        None if reference.contains('/') => return Err(invalid()),
        None => reference,
    };

    let valid = !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(candidate.to_string())
    } else {
        Err(invalid())
    }
}

/// Parse a CSV export into donor rows.
///
/// The first row holds the column names. Cells are kept as text with their
/// surrounding whitespace; fully blank rows are skipped.
pub fn parse_donor_csv(data: &[u8]) -> Result<Vec<DonorRecord>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(data);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut donors = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let donor: DonorRecord = headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, cell)| (header.clone(), cell))
            .collect();
        donors.push(donor);
    }
    Ok(donors)
}

/// File name announced in a `Content-Disposition` header, without extension.
///
/// `filename*=UTF-8''…` (RFC 5987) wins over a plain `filename=`.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for param in value.split(';').map(str::trim) {
        let Some((key, val)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = val.trim().splitn(3, '\'').nth(2).unwrap_or(val.trim());
                extended = urlencoding::decode(encoded).ok().map(Cow::into_owned);
            }
            "filename" => plain = Some(val.trim().trim_matches('"').to_string()),
            _ => {}
        }
    }

    let name = extended.or(plain)?;
    let stem = match name.rsplit_once('.') {
        Some((stem, ext)) if ext.eq_ignore_ascii_case("docx") => stem.to_string(),
        _ => name,
    };
    if stem.trim().is_empty() {
        None
    } else {
        Some(stem)
    }
}

/// Replace anything but alphanumerics, space, `_` and `-` with `_`
pub fn sanitize_file_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Client for the Google export endpoints
pub struct GoogleSources {
    client: reqwest::Client,
    sheets_base_url: String,
    docs_base_url: String,
    token: Option<String>,
}

impl GoogleSources {
    /// Base URLs look like `https://docs.google.com` (no trailing slash needed)
    pub fn new(
        sheets_base_url: impl Into<String>,
        docs_base_url: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            sheets_base_url: sheets_base_url.into().trim_end_matches('/').to_string(),
            docs_base_url: docs_base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    pub fn export_url(&self, kind: SourceKind, id: &str) -> String {
        let base = match kind {
            SourceKind::Spreadsheet => &self.sheets_base_url,
            SourceKind::Document => &self.docs_base_url,
        };
        format!(
            "{}/{}/d/{}/export?format={}",
            base,
            kind.path_segment(),
            id,
            kind.export_format()
        )
    }

    async fn export(
        &self,
        kind: SourceKind,
        reference: &str,
    ) -> Result<reqwest::Response, SourceError> {
        let id = extract_document_id(kind, reference)?;
        let url = self.export_url(kind, &id);
        info!(%kind, url = %url, "Requesting export");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let resp = request.send().await?;

        let status = resp.status();
        match status.as_u16() {
            404 => return Err(SourceError::NotFound { kind, id }),
            401 | 403 => return Err(SourceError::PermissionDenied { kind, id }),
            _ if !status.is_success() => {
                let body = resp.text().await.unwrap_or_default();
                return Err(SourceError::Upstream {
                    kind,
                    status: status.as_u16(),
                    body,
                });
            }
            _ => {}
        }

        // Private documents answer with the sign-in page instead of an error status
        let is_html = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/html"));
        if is_html {
            warn!(%kind, %id, "Export returned an HTML page, document is not shared");
            return Err(SourceError::PermissionDenied { kind, id });
        }

        Ok(resp)
    }

    /// Fetch every donor row of the sheet
    pub async fn fetch_donors(&self, reference: &str) -> Result<Vec<DonorRecord>, SourceError> {
        let resp = self.export(SourceKind::Spreadsheet, reference).await?;
        let body = resp.bytes().await?;
        let donors = parse_donor_csv(&body)?;
        info!(count = donors.len(), "Loaded donor rows");
        Ok(donors)
    }

    /// Download the template as DOCX into `dest_dir`, returning the saved path
    pub async fn download_template(
        &self,
        reference: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf, SourceError> {
        let resp = self.export(SourceKind::Document, reference).await?;
        let name = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| UNNAMED_TEMPLATE.to_string());
        let body = resp.bytes().await?;

        let path = dest_dir.join(format!("{}.docx", sanitize_file_stem(&name)));
        tokio::fs::write(&path, &body).await?;
        debug!(bytes = body.len(), "Template written");
        info!(path = %path.display(), "Downloaded template '{}'", name);
        Ok(path)
    }
}
