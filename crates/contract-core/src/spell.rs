//! Brazilian Portuguese spelled-out numbers and currency amounts
//!
//! `currency(1234.56)` yields
//! `"mil, duzentos e trinta e quatro reais e cinquenta e seis centavos"`.

use crate::error::SpellOutError;

/// Integer parts at or above this are not spelled out (one quadrillion)
pub const SPELL_OUT_LIMIT: u64 = 1_000_000_000_000_000;

const UNITS: [&str; 20] = [
    "zero",
    "um",
    "dois",
    "três",
    "quatro",
    "cinco",
    "seis",
    "sete",
    "oito",
    "nove",
    "dez",
    "onze",
    "doze",
    "treze",
    "quatorze",
    "quinze",
    "dezesseis",
    "dezessete",
    "dezoito",
    "dezenove",
];

const TENS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta",
    "noventa",
];

const HUNDREDS: [&str; 10] = [
    "",
    "cento",
    "duzentos",
    "trezentos",
    "quatrocentos",
    "quinhentos",
    "seiscentos",
    "setecentos",
    "oitocentos",
    "novecentos",
];

/// (singular, plural) names for each power of one thousand above "mil"
const SCALES: [(&str, &str); 3] = [
    ("milhão", "milhões"),
    ("bilhão", "bilhões"),
    ("trilhão", "trilhões"),
];

fn below_hundred(n: u64) -> String {
    if n < 20 {
        UNITS[n as usize].to_string()
    } else if n % 10 == 0 {
        TENS[(n / 10) as usize].to_string()
    } else {
        format!("{} e {}", TENS[(n / 10) as usize], UNITS[(n % 10) as usize])
    }
}

fn below_thousand(n: u64) -> String {
    if n == 100 {
        return "cem".to_string();
    }
    let hundreds = n / 100;
    let rest = n % 100;
    match (hundreds, rest) {
        (0, _) => below_hundred(rest),
        (h, 0) => HUNDREDS[h as usize].to_string(),
        (h, r) => format!("{} e {}", HUNDREDS[h as usize], below_hundred(r)),
    }
}

fn group_words(value: u64, scale: usize) -> String {
    match scale {
        0 => below_thousand(value),
        1 if value == 1 => "mil".to_string(),
        1 => format!("{} mil", below_thousand(value)),
        _ => {
            let (singular, plural) = SCALES[scale - 2];
            let name = if value == 1 { singular } else { plural };
            format!("{} {}", below_thousand(value), name)
        }
    }
}

/// Spell out a non-negative integer in Brazilian Portuguese
pub fn cardinal(n: u64) -> Result<String, SpellOutError> {
    if n >= SPELL_OUT_LIMIT {
        return Err(SpellOutError::OutOfRange(n as f64));
    }
    if n == 0 {
        return Ok(UNITS[0].to_string());
    }

    // (value, scale) for each non-zero group of three digits, most significant first
    let mut groups = Vec::new();
    let mut rest = n;
    let mut scale = 0;
    while rest > 0 {
        let value = rest % 1000;
        if value > 0 {
            groups.push((value, scale));
        }
        rest /= 1000;
        scale += 1;
    }
    groups.reverse();

    let mut out = String::new();
    for (i, &(value, scale)) in groups.iter().enumerate() {
        if i > 0 {
            let is_last = i == groups.len() - 1;
            // "mil e duzentos", "mil e cinquenta", but "mil, duzentos e trinta"
            if is_last && (value < 100 || value % 100 == 0) {
                out.push_str(" e ");
            } else {
                out.push_str(", ");
            }
        }
        out.push_str(&group_words(value, scale));
    }
    Ok(out)
}

/// Spell out a monetary amount in reais and centavos.
///
/// Amounts are rounded to whole cents first. Negative amounts are prefixed
/// with "menos".
pub fn currency(value: f64) -> Result<String, SpellOutError> {
    if !value.is_finite() {
        return Err(SpellOutError::NotFinite(value));
    }

    let total_cents = (value.abs() * 100.0).round();
    if total_cents / 100.0 >= SPELL_OUT_LIMIT as f64 {
        return Err(SpellOutError::OutOfRange(value));
    }
    let total_cents = total_cents as u64;
    let reais = total_cents / 100;
    let centavos = total_cents % 100;

    let mut words = match (reais, centavos) {
        (0, 0) => "zero reais".to_string(),
        (0, c) => cents_words(c)?,
        (r, 0) => reais_words(r)?,
        (r, c) => format!("{} e {}", reais_words(r)?, cents_words(c)?),
    };

    if value < 0.0 && total_cents > 0 {
        words.insert_str(0, "menos ");
    }
    Ok(words)
}

fn reais_words(reais: u64) -> Result<String, SpellOutError> {
    let unit = if reais == 1 {
        "real"
    } else if reais % 1_000_000 == 0 {
        // "um milhão de reais"
        "de reais"
    } else {
        "reais"
    };
    Ok(format!("{} {}", cardinal(reais)?, unit))
}

fn cents_words(centavos: u64) -> Result<String, SpellOutError> {
    let unit = if centavos == 1 { "centavo" } else { "centavos" };
    Ok(format!("{} {}", cardinal(centavos)?, unit))
}
