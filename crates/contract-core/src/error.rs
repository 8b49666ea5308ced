use thiserror::Error;

/// Failure to render an amount as words.
///
/// Never escapes the preparer: the affected field is degraded to a sentinel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpellOutError {
    #[error("Cannot spell out non-finite amount: {0}")]
    NotFinite(f64),

    #[error("Amount {0} exceeds the largest spelled-out magnitude")]
    OutOfRange(f64),
}

#[derive(Error, Debug)]
pub enum ContractError {
    #[error("Invalid template archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Invalid template: {0}")]
    InvalidTemplate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
