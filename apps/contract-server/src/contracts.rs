//! Contract generation: form parsing, template filling, output files

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use contract_core::{fill_docx, prepare_on, ContractInputs, DonorField, DonorRecord, Substitutions};
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::AppError;
use crate::session::SessionData;
use crate::state::AppState;

/// File name part used when the donor row has no name
pub const UNNAMED_DONOR: &str = "donatario_sem_nome";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Docx,
    #[default]
    Pdf,
}

impl OutputFormat {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("docx") => OutputFormat::Docx,
            _ => OutputFormat::Pdf,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Docx => "DOCX",
            OutputFormat::Pdf => "PDF",
        }
    }
}

/// Parse a user-typed decimal, accepting `1.234,56` as well as `1234.56`.
///
/// With a comma present, dots are thousand separators; without one, the
/// dot is the decimal point.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<f64, AppError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') {
        trimmed.replace('.', "").replace(',', ".")
    } else {
        trimmed.to_string()
    };
    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppError::InvalidNumber {
            field,
            value: raw.to_string(),
        }),
    }
}

/// Raw generation form, every field optional so that gaps become a flash message
#[derive(Debug, Default, Deserialize)]
pub struct ContractForm {
    pub donor_index: Option<String>,
    pub amount: Option<String>,
    pub tax_rate: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractRequest {
    pub donor_index: usize,
    pub inputs: ContractInputs,
    pub format: OutputFormat,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, AppError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(AppError::IncompleteForm(field))
}

impl ContractRequest {
    pub fn from_form(form: &ContractForm) -> Result<Self, AppError> {
        let index = required(&form.donor_index, "donor_index")?;
        let amount = required(&form.amount, "amount")?;
        let tax_rate = required(&form.tax_rate, "tax_rate")?;

        let donor_index = index.parse().map_err(|_| AppError::InvalidNumber {
            field: "donor_index",
            value: index.to_string(),
        })?;

        Ok(Self {
            donor_index,
            inputs: ContractInputs::new(
                parse_decimal("amount", amount)?,
                parse_decimal("tax_rate", tax_rate)?,
            ),
            format: OutputFormat::parse(form.format.as_deref()),
        })
    }
}

/// `CONTRATO_{NAME}_{YYYYMMDD}` where every non-alphanumeric char of the name becomes `_`
pub fn contract_file_stem(donor: &DonorRecord, date: NaiveDate) -> String {
    let name = donor
        .text(DonorField::Name.column())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| UNNAMED_DONOR.to_string());
    let safe: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!("CONTRATO_{}_{}", safe, date.format("%Y%m%d"))
}

#[derive(Debug, Clone)]
pub struct GeneratedContract {
    pub file_name: String,
    pub path: PathBuf,
    pub donor_name: String,
    pub format: OutputFormat,
    pub replaced_runs: usize,
}

/// Fill the session's template for one donor and write the result under the
/// generated-contracts folder, converting to PDF when asked.
pub async fn generate(
    state: &AppState,
    session: &SessionData,
    request: &ContractRequest,
) -> Result<GeneratedContract, AppError> {
    let donors = session.donors.as_ref().ok_or(AppError::NoDonors)?;
    let donor = donors
        .get(request.donor_index)
        .ok_or(AppError::DonorIndexOutOfRange {
            index: request.donor_index,
            count: donors.len(),
        })?;
    let template_path = session
        .template_path
        .as_ref()
        .ok_or(AppError::TemplateMissing)?;

    let template = match tokio::fs::read(template_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::TemplateMissing)
        }
        Err(e) => return Err(e.into()),
    };

    let settings = &state.settings;
    let today = Local::now().date_naive();
    let map = prepare_on(donor, request.inputs, &settings.place, today);
    let subs = Substitutions::new(&map, &settings.token_style);
    let filled = fill_docx(&template, &subs)?;
    debug!(replaced_runs = filled.replaced_runs, "Template filled");

    let out_dir = settings.generated_dir();
    tokio::fs::create_dir_all(&out_dir).await?;
    let stem = contract_file_stem(donor, today);
    let docx_path = out_dir.join(format!("{}.docx", stem));
    tokio::fs::write(&docx_path, &filled.bytes).await?;
    info!(path = %docx_path.display(), "Contract DOCX written");

    let path = match request.format {
        OutputFormat::Docx => docx_path,
        OutputFormat::Pdf => state.converter.convert(&docx_path, &out_dir).await?,
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| stem.clone());

    Ok(GeneratedContract {
        file_name,
        path,
        donor_name: donor.field(DonorField::Name),
        format: request.format,
        replaced_runs: filled.replaced_runs,
    })
}

/// Reject anything that could escape the generated-contracts folder
pub fn validate_download_name(name: &str) -> Result<&str, AppError> {
    let bad = name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || name.contains('\0');
    if bad {
        Err(AppError::InvalidFileName(name.to_string()))
    } else {
        Ok(name)
    }
}

/// `Content-Disposition` for a download: an ASCII `filename` for old clients
/// plus the exact UTF-8 name in `filename*` (RFC 5987)
pub fn attachment_disposition(name: &str) -> String {
    let ascii: String = name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii,
        urlencoding::encode(name)
    )
}

pub fn content_type_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "pdf" => "application/pdf",
        Some(ext) if ext == "docx" => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        _ => "application/octet-stream",
    }
}
