//! Contract data preparation
//!
//! Turns one donor row plus the donation inputs into the flat
//! placeholder → display string map consumed by template substitution.
//! Pure apart from logging and (in [`prepare`]) reading the local clock.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::date::local_date_text;
use crate::donor::{DonorField, DonorRecord};
use crate::error::SpellOutError;
use crate::money::{format_brl, format_percent};
use crate::spell;

/// Shown in place of a spelled-out amount that could not be generated
pub const SPELL_OUT_ERROR: &str = "[ERRO NA GERAÇÃO POR EXTENSO]";

pub const DEFAULT_CITY: &str = "Mossoró";
pub const DEFAULT_STATE: &str = "RN";

/// Placeholder tokens for the computed (non-donor) values
pub mod keys {
    pub const GROSS_AMOUNT_NUM: &str = "VALOR_BRUTO_DOACAO_NUM";
    pub const GROSS_AMOUNT_WORDS: &str = "VALOR_BRUTO_DOACAO_EXTENSO";
    pub const TAX_RATE_PERCENT: &str = "ALIQUOTA_ITCMD_PERCENTUAL";
    pub const TAX_AMOUNT_NUM: &str = "VALOR_ITCMD_NUM";
    pub const TAX_AMOUNT_WORDS: &str = "VALOR_ITCMD_EXTENSO";
    pub const NET_AMOUNT_NUM: &str = "VALOR_LIQUIDO_DOACAO_NUM";
    pub const NET_AMOUNT_WORDS: &str = "VALOR_LIQUIDO_DOACAO_EXTENSO";
    pub const PLACE_AND_DATE: &str = "LOCAL_DATA_COMPLETA";
}

/// Placeholder token → final display string, ordered by token
pub type SubstitutionMap = BTreeMap<String, String>;

/// Donation amount and ITCMD rate as entered by the user.
///
/// No range or sign validation happens here; zero and negative values are
/// computed like any other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractInputs {
    pub gross_amount: f64,
    /// Percent, e.g. `4.0` for 4%
    pub tax_rate_percent: f64,
}

impl ContractInputs {
    pub fn new(gross_amount: f64, tax_rate_percent: f64) -> Self {
        Self {
            gross_amount,
            tax_rate_percent,
        }
    }

    pub fn tax_amount(&self) -> f64 {
        self.gross_amount * self.tax_rate_percent / 100.0
    }

    pub fn net_amount(&self) -> f64 {
        self.gross_amount - self.tax_amount()
    }
}

/// City and state printed on the place-and-date line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractPlace {
    pub city: String,
    pub state: String,
}

impl ContractPlace {
    pub fn new(city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            state: state.into(),
        }
    }
}

impl Default for ContractPlace {
    fn default() -> Self {
        Self::new(DEFAULT_CITY, DEFAULT_STATE)
    }
}

/// Outcome of spelling out one amount
#[derive(Debug, Clone, PartialEq)]
pub enum SpelledAmount {
    Words(String),
    Degraded(SpellOutError),
}

impl SpelledAmount {
    pub fn of(value: f64) -> Self {
        match spell::currency(value) {
            Ok(words) => SpelledAmount::Words(words),
            Err(e) => SpelledAmount::Degraded(e),
        }
    }

    /// Text that goes into the contract
    pub fn display(&self) -> &str {
        match self {
            SpelledAmount::Words(words) => words,
            SpelledAmount::Degraded(_) => SPELL_OUT_ERROR,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SpelledAmount::Degraded(_))
    }
}

fn spelled(label: &str, value: f64) -> String {
    let amount = SpelledAmount::of(value);
    if let SpelledAmount::Degraded(e) = &amount {
        error!(field = label, value, "Failed to spell out amount: {}", e);
    }
    amount.display().to_string()
}

/// Build the substitution map using today's local date
pub fn prepare(donor: &DonorRecord, inputs: ContractInputs, place: &ContractPlace) -> SubstitutionMap {
    prepare_on(donor, inputs, place, Local::now().date_naive())
}

/// Build the substitution map for a given contract date
pub fn prepare_on(
    donor: &DonorRecord,
    inputs: ContractInputs,
    place: &ContractPlace,
    today: NaiveDate,
) -> SubstitutionMap {
    debug!(
        donor = %donor.field(DonorField::Name),
        gross_amount = inputs.gross_amount,
        tax_rate = inputs.tax_rate_percent,
        "Preparing contract data"
    );

    let tax_amount = inputs.tax_amount();
    let net_amount = inputs.net_amount();

    let mut map: SubstitutionMap = DonorField::ALL
        .iter()
        .map(|&field| (field.placeholder().to_string(), donor.field(field)))
        .collect();

    let computed = [
        (keys::GROSS_AMOUNT_NUM, format_brl(inputs.gross_amount)),
        (
            keys::GROSS_AMOUNT_WORDS,
            spelled(keys::GROSS_AMOUNT_WORDS, inputs.gross_amount),
        ),
        (keys::TAX_RATE_PERCENT, format_percent(inputs.tax_rate_percent)),
        (keys::TAX_AMOUNT_NUM, format_brl(tax_amount)),
        (keys::TAX_AMOUNT_WORDS, spelled(keys::TAX_AMOUNT_WORDS, tax_amount)),
        (keys::NET_AMOUNT_NUM, format_brl(net_amount)),
        (keys::NET_AMOUNT_WORDS, spelled(keys::NET_AMOUNT_WORDS, net_amount)),
        (
            keys::PLACE_AND_DATE,
            local_date_text(&place.city, &place.state, today),
        ),
    ];
    map.extend(computed.into_iter().map(|(k, v)| (k.to_string(), v)));

    debug!(entries = map.len(), "Substitution map prepared: {:?}", map);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn may_12() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 12).unwrap()
    }

    fn sample_donor() -> DonorRecord {
        DonorRecord::new()
            .with("NOME", " João Pereira ")
            .with("NACIONALIDADE", "BRASILEIRO")
            .with("ESTADO_CIVIL", "Casado")
            .with("PROFISSAO", "Agricultor")
            .with("RG", "123456 ssp/rn")
            .with("CPF", "123.456.789-00")
            .with("ENDERECO", "SÍTIO BOA VISTA, S/N")
            .with("CIDADE_UF", "MOSSORÓ/RN")
            .with("CEP", "59600-000")
            .with("TELEFONE", "(84) 99999-0000")
            .with("EMAIL", "Joao@Example.com")
            .with("BANCO", "Banco do Brasil")
            .with("AGENCIA", "1234-x")
            .with("CONTA", "56789-0")
            .with("OPERACAO", "Corrente")
    }

    #[test]
    fn test_full_map_golden() {
        let map = prepare_on(
            &sample_donor(),
            ContractInputs::new(1000.0, 4.0),
            &ContractPlace::default(),
            may_12(),
        );

        let expected: SubstitutionMap = [
            ("NOME_DONATARIO", "JOÃO PEREIRA"),
            ("NACIONALIDADE_DONATARIO", "brasileiro"),
            ("ESTADO_CIVIL_DONATARIO", "casado"),
            ("PROFISSAO_DONATARIO", "agricultor"),
            ("RG_DONATARIO", "123456 SSP/RN"),
            ("CPF_DONATARIO", "123.456.789-00"),
            ("ENDERECO_DONATARIO", "Sítio boa vista, s/n"),
            ("CIDADE_UF_DONATARIO", "Mossoró/rn"),
            ("CEP_DONATARIO", "59600-000"),
            ("TELEFONE_DONATARIO", "(84) 99999-0000"),
            ("EMAIL_DONATARIO", "joao@example.com"),
            ("BANCO_DONATARIO", "BANCO DO BRASIL"),
            ("AGENCIA_DONATARIO", "1234-X"),
            ("CONTA_DONATARIO", "56789-0"),
            ("CONTA_TIPO", "corrente"),
            ("VALOR_BRUTO_DOACAO_NUM", "1.000,00"),
            ("VALOR_BRUTO_DOACAO_EXTENSO", "mil reais"),
            ("ALIQUOTA_ITCMD_PERCENTUAL", "4,00%"),
            ("VALOR_ITCMD_NUM", "40,00"),
            ("VALOR_ITCMD_EXTENSO", "quarenta reais"),
            ("VALOR_LIQUIDO_DOACAO_NUM", "960,00"),
            ("VALOR_LIQUIDO_DOACAO_EXTENSO", "novecentos e sessenta reais"),
            ("LOCAL_DATA_COMPLETA", "Mossoró/RN, 12 de maio de 2025"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        assert_eq!(map, expected);
    }

    #[test]
    fn test_gross_amount_formatting() {
        let map = prepare_on(
            &DonorRecord::new(),
            ContractInputs::new(1234.5, 4.0),
            &ContractPlace::default(),
            may_12(),
        );
        assert_eq!(map[keys::GROSS_AMOUNT_NUM], "1.234,50");
        assert_eq!(map[keys::TAX_RATE_PERCENT], "4,00%");
        assert_eq!(map[keys::TAX_AMOUNT_NUM], "49,38");
    }

    #[test]
    fn test_tax_on_exact_half_cent() {
        let map = prepare_on(
            &DonorRecord::new(),
            ContractInputs::new(312.5, 1.0),
            &ContractPlace::default(),
            may_12(),
        );
        assert_eq!(map[keys::GROSS_AMOUNT_NUM], "312,50");
        assert_eq!(map[keys::TAX_AMOUNT_NUM], "3,12");
        assert_eq!(map[keys::NET_AMOUNT_NUM], "309,38");
    }

    #[test]
    fn test_missing_fields_render_sentinel() {
        let donor = DonorRecord::new().with("NOME", "Ana");
        let map = prepare_on(
            &donor,
            ContractInputs::new(10.0, 1.0),
            &ContractPlace::default(),
            may_12(),
        );
        assert_eq!(map["RG_DONATARIO"], "N/D");
        assert_eq!(map["BANCO_DONATARIO"], "N/D");
        assert_eq!(map["NACIONALIDADE_DONATARIO"], "n/d");
        assert_eq!(map["CPF_DONATARIO"], "");
    }

    #[test]
    fn test_spell_out_failure_degrades_single_field() {
        // 1e15 cannot be spelled out; 95% of it (tax) and the remainder can
        let map = prepare_on(
            &DonorRecord::new(),
            ContractInputs::new(1e15, 95.0),
            &ContractPlace::default(),
            may_12(),
        );
        assert_eq!(map[keys::GROSS_AMOUNT_WORDS], SPELL_OUT_ERROR);
        assert_ne!(map[keys::TAX_AMOUNT_WORDS], SPELL_OUT_ERROR);
        assert_ne!(map[keys::NET_AMOUNT_WORDS], SPELL_OUT_ERROR);
        assert_eq!(map[keys::GROSS_AMOUNT_NUM], "1.000.000.000.000.000,00");
        assert_eq!(map[keys::PLACE_AND_DATE], "Mossoró/RN, 12 de maio de 2025");
    }

    #[test]
    fn test_non_finite_amount_degrades_words_only() {
        let map = prepare_on(
            &DonorRecord::new(),
            ContractInputs::new(f64::NAN, 4.0),
            &ContractPlace::default(),
            may_12(),
        );
        assert_eq!(map[keys::GROSS_AMOUNT_WORDS], SPELL_OUT_ERROR);
        assert_eq!(map.len(), 23);
    }

    #[test]
    fn test_negative_and_zero_inputs_pass_through() {
        let map = prepare_on(
            &DonorRecord::new(),
            ContractInputs::new(-100.0, 0.0),
            &ContractPlace::default(),
            may_12(),
        );
        assert_eq!(map[keys::GROSS_AMOUNT_NUM], "-100,00");
        assert_eq!(map[keys::TAX_AMOUNT_NUM], "0,00");
        assert_eq!(map[keys::NET_AMOUNT_NUM], "-100,00");
        assert_eq!(map[keys::NET_AMOUNT_WORDS], "menos cem reais");
    }

    #[test]
    fn test_custom_place() {
        let map = prepare_on(
            &DonorRecord::new(),
            ContractInputs::new(1.0, 1.0),
            &ContractPlace::new("Natal", "RN"),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        );
        assert_eq!(map[keys::PLACE_AND_DATE], "Natal/RN, 31 de dezembro de 2024");
    }

    #[test]
    fn test_spelled_amount_reports_degradation() {
        assert!(SpelledAmount::of(f64::INFINITY).is_degraded());
        let ok = SpelledAmount::of(2.0);
        assert!(!ok.is_degraded());
        assert_eq!(ok.display(), "dois reais");
    }
}
