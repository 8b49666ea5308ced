//! Donor records loaded from the spreadsheet, and the typed field table used
//! to turn them into contract placeholders.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Placeholder value for optional fields missing from a row
pub const NOT_AVAILABLE: &str = "N/D";

/// A single spreadsheet cell as delivered by the data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => f.write_str(s),
            CellValue::Integer(n) => write!(f, "{}", n),
            // Whole floats keep one decimal ("3.0"), matching how sheet exports print them
            CellValue::Float(x) if x.is_finite() && x.fract() == 0.0 => write!(f, "{:.1}", x),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Bool(true) => f.write_str("True"),
            CellValue::Bool(false) => f.write_str("False"),
            CellValue::Null => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

/// One row of the donor spreadsheet, keyed by column header.
///
/// Rows carry no identity of their own; a session refers to them by position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonorRecord {
    cells: BTreeMap<String, CellValue>,
}

impl DonorRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Builder-style insert, mostly for tests and fixtures
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    /// Raw textual value of a column; `None` when absent or null
    pub fn text(&self, column: &str) -> Option<String> {
        match self.cells.get(column)? {
            CellValue::Null => None,
            value => Some(value.to_string()),
        }
    }

    /// Display value for a known field: trimmed, defaulted and cased.
    pub fn field(&self, field: DonorField) -> String {
        let raw = self
            .text(field.column())
            .unwrap_or_else(|| field.default_value().to_string());
        field.casing().apply(raw.trim())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for DonorRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            cells: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Case transformation applied to a donor field after trimming
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Casing {
    Unchanged,
    Upper,
    Lower,
    /// First character upper-cased, the rest lower-cased
    Capitalize,
}

impl Casing {
    pub fn apply(self, value: &str) -> String {
        match self {
            Casing::Unchanged => value.to_string(),
            Casing::Upper => value.to_uppercase(),
            Casing::Lower => value.to_lowercase(),
            Casing::Capitalize => {
                let mut chars = value.chars();
                match chars.next() {
                    Some(first) => first
                        .to_uppercase()
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect(),
                    None => String::new(),
                }
            }
        }
    }
}

/// Donor columns that feed the contract, with their placeholder,
/// default and casing convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DonorField {
    Name,
    Nationality,
    MaritalStatus,
    Profession,
    Rg,
    Cpf,
    Address,
    CityState,
    PostalCode,
    Phone,
    Email,
    Bank,
    Branch,
    Account,
    AccountType,
}

impl DonorField {
    pub const ALL: [DonorField; 15] = [
        DonorField::Name,
        DonorField::Nationality,
        DonorField::MaritalStatus,
        DonorField::Profession,
        DonorField::Rg,
        DonorField::Cpf,
        DonorField::Address,
        DonorField::CityState,
        DonorField::PostalCode,
        DonorField::Phone,
        DonorField::Email,
        DonorField::Bank,
        DonorField::Branch,
        DonorField::Account,
        DonorField::AccountType,
    ];

    /// Spreadsheet column header
    pub fn column(self) -> &'static str {
        match self {
            DonorField::Name => "NOME",
            DonorField::Nationality => "NACIONALIDADE",
            DonorField::MaritalStatus => "ESTADO_CIVIL",
            DonorField::Profession => "PROFISSAO",
            DonorField::Rg => "RG",
            DonorField::Cpf => "CPF",
            DonorField::Address => "ENDERECO",
            DonorField::CityState => "CIDADE_UF",
            DonorField::PostalCode => "CEP",
            DonorField::Phone => "TELEFONE",
            DonorField::Email => "EMAIL",
            DonorField::Bank => "BANCO",
            DonorField::Branch => "AGENCIA",
            DonorField::Account => "CONTA",
            DonorField::AccountType => "OPERACAO",
        }
    }

    /// Template placeholder token
    pub fn placeholder(self) -> &'static str {
        match self {
            DonorField::Name => "NOME_DONATARIO",
            DonorField::Nationality => "NACIONALIDADE_DONATARIO",
            DonorField::MaritalStatus => "ESTADO_CIVIL_DONATARIO",
            DonorField::Profession => "PROFISSAO_DONATARIO",
            DonorField::Rg => "RG_DONATARIO",
            DonorField::Cpf => "CPF_DONATARIO",
            DonorField::Address => "ENDERECO_DONATARIO",
            DonorField::CityState => "CIDADE_UF_DONATARIO",
            DonorField::PostalCode => "CEP_DONATARIO",
            DonorField::Phone => "TELEFONE_DONATARIO",
            DonorField::Email => "EMAIL_DONATARIO",
            DonorField::Bank => "BANCO_DONATARIO",
            DonorField::Branch => "AGENCIA_DONATARIO",
            DonorField::Account => "CONTA_DONATARIO",
            DonorField::AccountType => "CONTA_TIPO",
        }
    }

    /// Value used when the column is absent from the row
    pub fn default_value(self) -> &'static str {
        match self {
            DonorField::Name | DonorField::Cpf => "",
            _ => NOT_AVAILABLE,
        }
    }

    pub fn casing(self) -> Casing {
        match self {
            DonorField::Name
            | DonorField::Rg
            | DonorField::Bank
            | DonorField::Branch
            | DonorField::Account => Casing::Upper,
            DonorField::Nationality
            | DonorField::MaritalStatus
            | DonorField::Profession
            | DonorField::Email
            | DonorField::AccountType => Casing::Lower,
            DonorField::Address | DonorField::CityState => Casing::Capitalize,
            DonorField::Cpf | DonorField::PostalCode | DonorField::Phone => Casing::Unchanged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_trims_and_cases() {
        let donor = DonorRecord::new()
            .with("NOME", "  Maria da Silva ")
            .with("PROFISSAO", "Professora")
            .with("ENDERECO", "RUA DAS FLORES, 12")
            .with("EMAIL", "Maria@Example.COM");

        assert_eq!(donor.field(DonorField::Name), "MARIA DA SILVA");
        assert_eq!(donor.field(DonorField::Profession), "professora");
        assert_eq!(donor.field(DonorField::Address), "Rua das flores, 12");
        assert_eq!(donor.field(DonorField::Email), "maria@example.com");
    }

    #[test]
    fn test_missing_fields_use_defaults_after_casing() {
        let donor = DonorRecord::new();
        assert_eq!(donor.field(DonorField::Rg), "N/D");
        assert_eq!(donor.field(DonorField::Nationality), "n/d");
        assert_eq!(donor.field(DonorField::CityState), "N/d");
        assert_eq!(donor.field(DonorField::Name), "");
        assert_eq!(donor.field(DonorField::Cpf), "");
    }

    #[test]
    fn test_null_cell_counts_as_missing() {
        let donor = DonorRecord::new().with("BANCO", CellValue::Null);
        assert_eq!(donor.field(DonorField::Bank), "N/D");
    }

    #[test]
    fn test_numeric_cells_render_as_text() {
        let donor = DonorRecord::new()
            .with("CPF", 12345678901i64)
            .with("AGENCIA", 1234.0);
        assert_eq!(donor.field(DonorField::Cpf), "12345678901");
        assert_eq!(donor.field(DonorField::Branch), "1234.0");
    }

    #[test]
    fn test_capitalize_handles_accents() {
        assert_eq!(Casing::Capitalize.apply("ÁGUA BRANCA/AL"), "Água branca/al");
        assert_eq!(Casing::Capitalize.apply(""), "");
    }

    #[test]
    fn test_record_deserializes_mixed_cells() {
        let json = r#"{"NOME":"Ana","CPF":123,"CONTA":45.5,"ATIVO":true,"RG":null}"#;
        let donor: DonorRecord = serde_json::from_str(json).unwrap();
        assert_eq!(donor.get("NOME"), Some(&CellValue::Text("Ana".into())));
        assert_eq!(donor.get("CPF"), Some(&CellValue::Integer(123)));
        assert_eq!(donor.get("CONTA"), Some(&CellValue::Float(45.5)));
        assert_eq!(donor.get("ATIVO"), Some(&CellValue::Bool(true)));
        assert_eq!(donor.get("RG"), Some(&CellValue::Null));
    }

    #[test]
    fn test_placeholders_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for field in DonorField::ALL {
            assert!(seen.insert(field.placeholder()), "{:?}", field);
        }
    }
}
