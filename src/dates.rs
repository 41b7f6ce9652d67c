//! Date normalization for the heterogeneous date strings Brazilian
//! institutional sites publish.
//!
//! Sites in the source list show dates as `29/10/2025`, `29-10-2025`,
//! `2025-10-29`, long-form Portuguese (`29 de outubro de 2025`), often
//! behind labels like `Publicado em:`. Normalization tries, in order:
//!
//! 1. The source's configured numeric formats (first successful parse wins)
//! 2. The Portuguese long form, diacritic-insensitive (`março` == `marco`)
//! 3. A bare 4-digit year, normalized to January 1st ([`ItemDate::YearOnly`],
//!    low confidence — display code keeps showing the raw text)
//!
//! Anything else is [`ItemDate::Unknown`]. Normalization never fails:
//! unparsable input is a value, not an error.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::ItemDate;

/// Leading labels sites prepend to the actual date.
static LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\s*(publicado\s+em|publicada\s+em|publicação|postado\s+em|atualizado\s+em|data)\s*:?\s*",
    )
    .unwrap()
});

/// `<day> de <month-name> de <year>`, anywhere in the text.
static LONG_FORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{1,2})\s+de\s+(\p{L}+)\s+de\s+(\d{4})").unwrap());

/// Bare 4-digit year fallback.
static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

/// Normalize a scraped date string.
///
/// `formats` is the source's ordered list of `strftime` numeric formats.
pub fn normalize(raw: &str, formats: &[String]) -> ItemDate {
    let stripped = LABEL_RE.replace(raw, "");
    let cand = stripped.trim();
    if cand.is_empty() {
        return ItemDate::Unknown;
    }

    for fmt in formats {
        if let Ok(d) = NaiveDate::parse_from_str(cand, fmt) {
            return ItemDate::Day(d);
        }
    }

    if let Some(caps) = LONG_FORM_RE.captures(cand) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let year: i32 = caps[3].parse().unwrap_or(0);
        if let Some(month) = month_number(&caps[2]) {
            if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
                return ItemDate::Day(d);
            }
        }
    }

    if let Some(caps) = YEAR_RE.captures(cand) {
        let year: i32 = caps[1].parse().unwrap_or(0);
        if let Some(d) = NaiveDate::from_ymd_opt(year, 1, 1) {
            return ItemDate::YearOnly(d);
        }
    }

    ItemDate::Unknown
}

/// Map a Portuguese month name to its number, ignoring case and diacritics.
fn month_number(name: &str) -> Option<u32> {
    let folded: String = name.chars().map(fold_char).collect();
    let month = match folded.as_str() {
        "janeiro" => 1,
        "fevereiro" => 2,
        "marco" => 3,
        "abril" => 4,
        "maio" => 5,
        "junho" => 6,
        "julho" => 7,
        "agosto" => 8,
        "setembro" => 9,
        "outubro" => 10,
        "novembro" => 11,
        "dezembro" => 12,
        _ => return None,
    };
    Some(month)
}

/// Lowercase and strip the accents that occur in Portuguese month names.
fn fold_char(c: char) -> char {
    match c.to_lowercase().next().unwrap_or(c) {
        'á' | 'â' | 'ã' | 'à' => 'a',
        'ç' => 'c',
        'é' | 'ê' => 'e',
        'í' => 'i',
        'ó' | 'ô' | 'õ' => 'o',
        'ú' => 'u',
        other => other,
    }
}
