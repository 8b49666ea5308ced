//! Place-and-date line for the contract ("Mossoró/RN, 12 de maio de 2025")

use chrono::{Datelike, NaiveDate};
use tracing::warn;

pub const MONTH_NAMES: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

/// Month name for a 1-based month number
pub fn month_name(month: u32) -> Option<&'static str> {
    let index = month.checked_sub(1)? as usize;
    MONTH_NAMES.get(index).copied()
}

/// Render the full place-and-date line for a calendar date
pub fn local_date_text(city: &str, state: &str, date: NaiveDate) -> String {
    local_date_from_parts(city, state, date.day(), date.month(), date.year())
}

/// Render the place-and-date line from raw date parts.
///
/// An out-of-range month falls back to a numeric `dd/mm/yyyy` date.
pub fn local_date_from_parts(city: &str, state: &str, day: u32, month: u32, year: i32) -> String {
    match month_name(month) {
        Some(name) => format!("{}/{}, {} de {} de {}", city, state, day, name, year),
        None => {
            warn!(month, "Invalid month for spelled-out date, using numeric format");
            format!("{}/{}, {:02}/{:02}/{:04}", city, state, day, month, year)
        }
    }
}
