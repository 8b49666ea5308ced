//! Donation contract generation core
//!
//! This crate holds everything that does not need the network or a web
//! server:
//! - `donor`: spreadsheet rows and the typed donor field table
//! - `preparer`: donor row + amounts → placeholder substitution map
//! - `money` / `spell` / `date`: pt-BR numeric, spelled-out and date formatting
//! - `template` / `docx`: run-level placeholder substitution into DOCX templates

pub mod date;
pub mod docx;
pub mod donor;
pub mod error;
pub mod money;
pub mod preparer;
pub mod spell;
pub mod template;

pub use docx::{fill_docx, FilledDocument};
pub use donor::{CellValue, Casing, DonorField, DonorRecord, NOT_AVAILABLE};
pub use error::{ContractError, SpellOutError};
pub use preparer::{
    prepare, prepare_on, ContractInputs, ContractPlace, SpelledAmount, SubstitutionMap,
    SPELL_OUT_ERROR,
};
pub use template::{Substitutions, TokenStyle};
