//! Error types for the contract server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use contract_core::ContractError;
use serde::Serialize;
use thiserror::Error;

use crate::convert::ConvertError;
use crate::session::FlashLevel;
use crate::sources::{SourceError, SourceKind};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Incomplete form: missing {0}")]
    IncompleteForm(&'static str),

    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("No donors loaded in this session")]
    NoDonors,

    #[error("Donor index {index} out of range ({count} donors)")]
    DonorIndexOutOfRange { index: usize, count: usize },

    #[error("Template file is missing")]
    TemplateMissing,

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("PDF conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session data error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::IncompleteForm(_) => (StatusCode::BAD_REQUEST, "INCOMPLETE_FORM"),
            AppError::InvalidNumber { .. } => (StatusCode::BAD_REQUEST, "INVALID_NUMBER"),
            AppError::NoDonors => (StatusCode::CONFLICT, "NO_DONORS"),
            AppError::DonorIndexOutOfRange { .. } => (StatusCode::BAD_REQUEST, "INVALID_DONOR"),
            AppError::TemplateMissing => (StatusCode::CONFLICT, "TEMPLATE_MISSING"),
            AppError::InvalidFileName(_) => (StatusCode::BAD_REQUEST, "INVALID_FILE_NAME"),
            AppError::FileNotFound(_) => (StatusCode::NOT_FOUND, "FILE_NOT_FOUND"),
            AppError::Source(SourceError::InvalidReference { .. }) => {
                (StatusCode::BAD_REQUEST, "INVALID_REFERENCE")
            }
            AppError::Source(SourceError::NotFound { .. }) => (StatusCode::NOT_FOUND, "SOURCE_NOT_FOUND"),
            AppError::Source(SourceError::PermissionDenied { .. }) => {
                (StatusCode::FORBIDDEN, "SOURCE_PERMISSION_DENIED")
            }
            AppError::Source(_) => (StatusCode::BAD_GATEWAY, "SOURCE_ERROR"),
            AppError::Convert(ConvertError::Timeout(_)) => {
                (StatusCode::GATEWAY_TIMEOUT, "CONVERT_TIMEOUT")
            }
            AppError::Convert(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONVERT_ERROR"),
            AppError::Contract(ContractError::InvalidTemplate(_))
            | AppError::Contract(ContractError::Archive(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_TEMPLATE")
            }
            AppError::Contract(_) | AppError::Io(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
            AppError::Database(_) | AppError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "SESSION_ERROR")
            }
        }
    }

    /// Severity used when the error is shown as a flash message
    pub fn flash_level(&self) -> FlashLevel {
        match self {
            AppError::NoDonors => FlashLevel::Warning,
            _ => FlashLevel::Danger,
        }
    }

    /// Message shown to the person using the web form
    pub fn user_message(&self) -> String {
        match self {
            AppError::IncompleteForm(_) => {
                "Dados incompletos recebidos para gerar o contrato. Tente novamente.".to_string()
            }
            AppError::InvalidNumber { .. } => {
                "Valores inválidos para índice, doação ou alíquota. Use números válidos.".to_string()
            }
            AppError::NoDonors => "Sessão expirada ou dados dos donatários não encontrados. \
                                   Por favor, recarregue a planilha."
                .to_string(),
            AppError::DonorIndexOutOfRange { index, .. } => {
                format!("Índice de donatário selecionado ({}) inválido.", index)
            }
            AppError::TemplateMissing => "Erro crítico: O arquivo de template DOCX não foi \
                                          encontrado. Verifique o download."
                .to_string(),
            AppError::InvalidFileName(_) | AppError::FileNotFound(_) => {
                "Erro: Arquivo de contrato não encontrado para download.".to_string()
            }
            AppError::Source(e) => source_message(e),
            AppError::Convert(e) => convert_message(e),
            AppError::Contract(ContractError::InvalidTemplate(msg)) => {
                format!("O template DOCX é inválido: {}", msg)
            }
            AppError::Contract(ContractError::Archive(e)) => {
                format!("O template DOCX não pôde ser lido: {}", e)
            }
            other => format!("Ocorreu um erro inesperado ao gerar o contrato: {}", other),
        }
    }
}

/// Portuguese noun for a source, with its article and the "found" participle
fn kind_label(kind: SourceKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        SourceKind::Spreadsheet => ("Planilha Google", "a", "encontrada"),
        SourceKind::Document => ("Documento Google", "o", "encontrado"),
    }
}

fn source_message(err: &SourceError) -> String {
    match err {
        SourceError::InvalidReference { kind, reference } => {
            let (noun, _, _) = kind_label(*kind);
            format!(
                "URL/ID inválido para {}: '{}'. Não foi possível extrair o ID.",
                noun, reference
            )
        }
        SourceError::NotFound { kind, id } => {
            let (noun, _, found) = kind_label(*kind);
            format!(
                "ERRO: {} com ID '{}' não {}. Verifique o ID/URL e o compartilhamento.",
                noun, id, found
            )
        }
        SourceError::PermissionDenied { kind, id } => {
            let (noun, article, _) = kind_label(*kind);
            format!(
                "ERRO: Permissão insuficiente para acessar {} {} (ID: {}). Verifique o compartilhamento.",
                article, noun, id
            )
        }
        other => match other.kind() {
            Some(kind) => {
                let (noun, article, _) = kind_label(kind);
                format!(
                    "ERRO INESPERADO ao acessar {} {}: {}. Verifique os logs.",
                    article, noun, other
                )
            }
            None => format!("ERRO INESPERADO ao acessar o Google: {}. Verifique os logs.", other),
        },
    }
}

fn convert_message(err: &ConvertError) -> String {
    match err {
        ConvertError::NotFound(program) => format!(
            "Erro ao converter para PDF: Ferramenta de conversão ('{}') não encontrada.",
            program
        ),
        ConvertError::Timeout(_) => {
            "A conversão para PDF demorou demais (timeout). Tente novamente.".to_string()
        }
        ConvertError::Failed { code, stderr } => {
            let mut msg = "Contrato DOCX gerado, mas houve um problema na finalização da \
                           conversão para PDF."
                .to_string();
            if !stderr.trim().is_empty() {
                msg.push_str(&format!(" Detalhe do conversor: {}", stderr.trim()));
            } else if let Some(code) = code {
                msg.push_str(&format!(" Código de erro do conversor: {}.", code));
            }
            msg
        }
        ConvertError::MissingOutput(_) => "Contrato DOCX gerado, mas o arquivo PDF não foi \
                                           encontrado após a conversão."
            .to_string(),
        ConvertError::Io(e) => format!("Erro inesperado durante conversão para PDF: {}", e),
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(code, "{}", self);
        }

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            code: code.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::IncompleteForm("amount").status_and_code(),
            (StatusCode::BAD_REQUEST, "INCOMPLETE_FORM")
        );
        assert_eq!(
            AppError::Source(SourceError::PermissionDenied {
                kind: SourceKind::Document,
                id: "x".into()
            })
            .status_and_code()
            .0,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Convert(ConvertError::Timeout(std::time::Duration::from_secs(60))).status_and_code().0,
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            AppError::DonorIndexOutOfRange { index: 7, count: 2 }.user_message(),
            "Índice de donatário selecionado (7) inválido."
        );
        assert_eq!(AppError::NoDonors.flash_level(), FlashLevel::Warning);
        assert!(AppError::Source(SourceError::NotFound {
            kind: SourceKind::Spreadsheet,
            id: "abc".into()
        })
        .user_message()
        .contains("Planilha Google com ID 'abc' não encontrada"));
    }

    #[test]
    fn test_convert_messages() {
        let failed = AppError::Convert(ConvertError::Failed {
            code: Some(1),
            stderr: "Error: source file could not be loaded\n".into(),
        });
        assert!(failed
            .user_message()
            .ends_with("Detalhe do conversor: Error: source file could not be loaded"));

        let silent = AppError::Convert(ConvertError::Failed {
            code: Some(77),
            stderr: String::new(),
        });
        assert!(silent.user_message().ends_with("Código de erro do conversor: 77."));

        let missing = AppError::Convert(ConvertError::MissingOutput(PathBuf::from("a.pdf")));
        assert_eq!(missing.flash_level(), FlashLevel::Danger);
    }
}
