//! HTTP handlers for the contract server

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{Html, Redirect, Response},
    Form, Json,
};
use contract_core::{prepare, ContractInputs, ContractPlace, DonorRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contracts::{
    attachment_disposition, content_type_for, generate, parse_decimal, validate_download_name, ContractForm,
    ContractRequest,
};
use crate::error::AppError;
use crate::pages::{render_index, render_success, IndexView};
use crate::session::{FlashLevel, Session};
use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "contract-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Handler: GET /
pub async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let mut session = Session::load(&state.db, &headers, state.settings.session_ttl).await?;

    // A template deleted from disk is forgotten
    if let Some(path) = &session.data.template_path {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            warn!(path = %path.display(), "Template file vanished, clearing it from the session");
            session.data.template_path = None;
        }
    }

    let flashes = session.data.take_flashes();
    let template_name = session
        .data
        .template_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());
    let donors: &[DonorRecord] = session.data.donors.as_deref().unwrap_or_default();

    let html = render_index(&IndexView {
        sheet_url: &session.data.sheet_url,
        doc_url: &session.data.doc_url,
        flashes: &flashes,
        donors,
        template_name,
    });

    session.finish(&state.db, Html(html)).await
}

/// Source form body
#[derive(Debug, Default, Deserialize)]
pub struct SourcesForm {
    #[serde(default)]
    pub sheet_url: String,
    #[serde(default)]
    pub doc_url: String,
}

/// Handler: POST /
pub async fn load_sources(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<SourcesForm>,
) -> Result<Response, AppError> {
    let mut session = Session::load(&state.db, &headers, state.settings.session_ttl).await?;
    let data = &mut session.data;
    data.sheet_url = form.sheet_url.trim().to_string();
    data.doc_url = form.doc_url.trim().to_string();

    if data.sheet_url.is_empty() || data.doc_url.is_empty() {
        data.flash(
            FlashLevel::Danger,
            "Por favor, forneça as URLs/IDs da Planilha Google e do Documento Google.",
        );
        data.donors = None;
        data.template_path = None;
        return session.finish(&state.db, Redirect::to("/")).await;
    }

    info!(sheet = %data.sheet_url, "Loading donor spreadsheet");
    let donors = match state.sources.fetch_donors(&data.sheet_url).await {
        Ok(donors) => Some(donors),
        Err(e) => {
            data.flash_error(&AppError::from(e));
            None
        }
    };

    info!(doc = %data.doc_url, "Downloading contract template");
    let template = match state
        .sources
        .download_template(&data.doc_url, &state.settings.upload_dir)
        .await
    {
        Ok(path) => Some(path),
        Err(e) => {
            data.flash_error(&AppError::from(e));
            None
        }
    };

    match (donors.is_some(), template.is_some()) {
        (true, true) => data.flash(FlashLevel::Success, "Planilha e Documento carregados com sucesso!"),
        (true, false) => data.flash(
            FlashLevel::Warning,
            "Planilha carregada, mas houve erro ao carregar o Documento.",
        ),
        (false, true) => data.flash(
            FlashLevel::Warning,
            "Documento carregado, mas houve erro ao carregar a Planilha.",
        ),
        (false, false) => {}
    }
    data.donors = donors;
    data.template_path = template;

    session.finish(&state.db, Redirect::to("/")).await
}

/// Handler: POST /contracts
pub async fn generate_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ContractForm>,
) -> Result<Response, AppError> {
    let mut session = Session::load(&state.db, &headers, state.settings.session_ttl).await?;

    let outcome = match ContractRequest::from_form(&form) {
        Ok(request) => {
            info!(
                donor_index = request.donor_index,
                amount = request.inputs.gross_amount,
                tax_rate = request.inputs.tax_rate_percent,
                format = request.format.label(),
                "Generating contract"
            );
            generate(&state, &session.data, &request).await
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(contract) => {
            info!(file = %contract.path.display(), "Contract ready");
            let html = render_success(&contract);
            session.finish(&state.db, Html(html)).await
        }
        Err(e) => {
            session.data.flash_error(&e);
            session.finish(&state.db, Redirect::to("/")).await
        }
    }
}

/// Handler: GET /contracts/:filename
pub async fn download_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let mut session = Session::load(&state.db, &headers, state.settings.session_ttl).await?;

    let result = match validate_download_name(&filename) {
        Ok(name) => {
            let path = state.settings.generated_dir().join(name);
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(AppError::FileNotFound(filename.clone()))
                }
                Err(e) => Err(AppError::Io(e)),
            }
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(bytes) => {
            info!(file = %filename, bytes = bytes.len(), "Serving contract");
            let disposition = HeaderValue::from_str(&attachment_disposition(&filename))
                .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
            let response = (
                [
                    (header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&filename))),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            );
            session.finish(&state.db, response).await
        }
        Err(e) => {
            session.data.flash_error(&e);
            session.finish(&state.db, Redirect::to("/")).await
        }
    }
}

/// A number given either as JSON number or as user-typed text (`"1.234,56"`)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    fn value(&self, field: &'static str) -> Result<f64, AppError> {
        match self {
            NumberInput::Number(n) => Ok(*n),
            NumberInput::Text(s) => parse_decimal(field, s),
        }
    }
}

/// Preview request body
#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    #[serde(default)]
    pub donor: DonorRecord,
    pub amount: NumberInput,
    pub tax_rate: NumberInput,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Preview response
#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub tax_amount: f64,
    pub net_amount: f64,
    pub substitutions: BTreeMap<String, String>,
}

/// Handler: POST /api/contracts/preview
pub async fn preview_contract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let inputs = ContractInputs::new(
        req.amount.value("amount")?,
        req.tax_rate.value("tax_rate")?,
    );
    let defaults = &state.settings.place;
    let place = ContractPlace::new(
        req.city.unwrap_or_else(|| defaults.city.clone()),
        req.state.unwrap_or_else(|| defaults.state.clone()),
    );

    let substitutions = prepare(&req.donor, inputs, &place);

    Ok(Json(PreviewResponse {
        success: true,
        tax_amount: inputs.tax_amount(),
        net_amount: inputs.net_amount(),
        substitutions,
    }))
}
