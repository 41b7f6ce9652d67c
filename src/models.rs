//! Data models for scraped news items.
//!
//! This module defines the core data structures flowing through the pipeline:
//! - [`RawItem`]: An item as extracted from a listing page, date still unparsed
//! - [`ItemDate`]: A normalized publication date, or an explicit unknown
//! - [`NewsItem`]: A [`RawItem`] tagged with its source and normalized date
//!
//! Everything here is transient: items are built, filtered, rendered and
//! discarded within a single run. Nothing is persisted across runs.

use chrono::NaiveDate;
use std::fmt;

use crate::config::SourceConfig;

/// One news entry as pulled from a source's listing page.
///
/// The date is still the raw text the site displayed (`"29/10/2025"`,
/// `"Publicado em: 29 de outubro de 2025"`, or empty when the listing
/// shows no date at all).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    /// Headline text, or a placeholder when the listing had none.
    pub title: String,
    /// Absolute URL of the story.
    pub link: String,
    /// Date text exactly as scraped; may be empty.
    pub date_text: String,
}

/// A publication date after normalization.
///
/// `Unknown` is deliberate and visible: items whose date could not be parsed
/// are never assigned a sentinel date that could be mistaken for real data.
/// A `YearOnly` match is a low-confidence approximation (January 1st of the
/// matched year); callers should keep displaying the raw text for those.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemDate {
    /// A full calendar date parsed from the raw text.
    Day(NaiveDate),
    /// Only a 4-digit year was found; normalized to January 1st.
    YearOnly(NaiveDate),
    /// Nothing parseable in the raw text.
    Unknown,
}

impl ItemDate {
    /// The calendar date behind this value, if any.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            ItemDate::Day(d) | ItemDate::YearOnly(d) => Some(*d),
            ItemDate::Unknown => None,
        }
    }

    /// Whether this date falls inside the recency window.
    ///
    /// `Unknown` always passes: sources without visible dates must not be
    /// silently dropped from the digest.
    pub fn is_recent(&self, cutoff: NaiveDate) -> bool {
        match self.as_date() {
            Some(d) => d >= cutoff,
            None => true,
        }
    }

    /// Sort key for digest ordering: newest first, `Unknown` strictly last.
    ///
    /// `None` orders before any `Some` under `Option`'s derived ordering, so
    /// a descending comparison on this key pushes unknown dates to the end.
    pub fn sort_key(&self) -> Option<NaiveDate> {
        self.as_date()
    }
}

impl fmt::Display for ItemDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemDate::Day(d) => write!(f, "{d}"),
            ItemDate::YearOnly(d) => write!(f, "~{}", d.format("%Y")),
            ItemDate::Unknown => write!(f, "?"),
        }
    }
}

/// A [`RawItem`] attributed to its source, with a normalized date.
///
/// Invariant: `title` and `link` are both non-empty. Extraction substitutes
/// placeholders before an item gets this far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsItem {
    /// Short code of the source this item came from (`"ITQ"`, `"ANTAQ"`...).
    pub source_id: String,
    pub title: String,
    pub link: String,
    /// Raw date text, kept for display.
    pub date_text: String,
    pub date: ItemDate,
}

impl NewsItem {
    /// Synthetic item representing a failed fetch for one source.
    ///
    /// Failed sources stay visible in the digest instead of vanishing
    /// silently; the item links back to the listing page that failed.
    pub fn fetch_error(source: &SourceConfig, err: &dyn fmt::Display) -> Self {
        NewsItem {
            source_id: source.id.clone(),
            title: format!("ERRO ao coletar {}: {}", source.name, err),
            link: source.url.clone(),
            date_text: String::new(),
            date: ItemDate::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unknown_is_always_recent() {
        let cutoff = date(2030, 1, 1);
        assert!(ItemDate::Unknown.is_recent(cutoff));
    }

    #[test]
    fn test_recency_boundary_is_inclusive() {
        let cutoff = date(2025, 10, 22);
        assert!(ItemDate::Day(date(2025, 10, 22)).is_recent(cutoff));
        assert!(!ItemDate::Day(date(2025, 10, 21)).is_recent(cutoff));
    }

    #[test]
    fn test_sort_key_orders_unknown_last() {
        let known = ItemDate::Day(date(1900, 1, 1)).sort_key();
        let unknown = ItemDate::Unknown.sort_key();
        // Descending sort on the key puts None after every Some.
        assert!(known > unknown);
    }

    #[test]
    fn test_year_only_carries_january_first() {
        let d = ItemDate::YearOnly(date(2023, 1, 1));
        assert_eq!(d.as_date(), Some(date(2023, 1, 1)));
    }
}
