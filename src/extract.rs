//! Item extraction and recency filtering.
//!
//! Given a listing page's markup and a source's declarative rule set, produce
//! normalized [`RawItem`]s. Two strategies, chosen by the rule variant:
//!
//! - **Selectors**: parse the DOM with `scraper`, walk item containers, and
//!   for each field try an ordered list of candidate CSS selectors — the
//!   first match with usable content wins.
//! - **Patterns**: run regexes over the raw markup for sites whose HTML is
//!   too broken for a DOM walk.
//!
//! Discard policy (applied uniformly to both strategies): a block that
//! yields neither a title nor a link is dropped; if exactly one of the two
//! is missing, the item is kept with a placeholder title or with the
//! listing URL as its link.

use chrono::{Duration, NaiveDate};
use itertools::{Either, Itertools};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument, warn};

use crate::config::{ExtractionRules, PatternRules, SelectorRules, SourceConfig, candidates};
use crate::dates;
use crate::models::{NewsItem, RawItem};

/// Placeholder when a block has a link but no visible headline.
pub const NO_TITLE: &str = "(no title)";

/// Extract all items from one listing page, deduplicated by link.
///
/// Listing pages frequently repeat the same story in carousels and
/// highlight boxes; the first occurrence wins. Items whose link fell back
/// to the listing URL carry no identity of their own, so they are never
/// deduplicated against each other.
#[instrument(level = "info", skip(html, source), fields(source = %source.id))]
pub fn extract_items(html: &str, source: &SourceConfig) -> Vec<RawItem> {
    let items = match &source.rules {
        ExtractionRules::Selectors(rules) => extract_with_selectors(html, rules, source),
        ExtractionRules::Patterns(rules) => extract_with_patterns(html, rules, source),
    };
    let items: Vec<RawItem> = items
        .into_iter()
        .enumerate()
        .unique_by(|(idx, item)| {
            if item.link == source.url {
                Either::Left(*idx)
            } else {
                Either::Right(item.link.clone())
            }
        })
        .map(|(_, item)| item)
        .collect();
    debug!(count = items.len(), "Extracted items");
    items
}

/// Resolve a possibly-relative link against a source's base URL.
///
/// Absolute `http(s)` targets pass through unchanged; anything else is
/// joined to the base with exactly one slash between the two parts.
pub fn resolve_link(href: &str, base: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!(
            "{}/{}",
            base.trim_end_matches('/'),
            href.trim_start_matches('/')
        )
    }
}

// ---- Structured-selector strategy ----

fn extract_with_selectors(html: &str, rules: &SelectorRules, source: &SourceConfig) -> Vec<RawItem> {
    let document = Html::parse_document(html);

    // Config validation already compiled these once; a failure here means
    // the selector text changed underneath us, so log and emit nothing.
    let item_selector = match Selector::parse(&rules.item) {
        Ok(sel) => sel,
        Err(e) => {
            warn!(source = %source.id, error = %e, "item selector failed to parse");
            return Vec::new();
        }
    };
    let title_selectors = parse_candidates(&rules.title, source);
    let link_selectors = parse_candidates(&rules.link, source);
    let date_selectors = parse_candidates(&rules.date, source);

    let mut items = Vec::new();
    for container in document.select(&item_selector) {
        let title = first_text(container, &title_selectors);
        let link = first_href(container, &link_selectors).map(|href| resolve_link(&href, source.link_base()));
        let date_text = first_text(container, &date_selectors).unwrap_or_default();

        if title.is_none() && link.is_none() {
            continue;
        }
        items.push(RawItem {
            title: title.unwrap_or_else(|| NO_TITLE.to_string()),
            link: link.unwrap_or_else(|| source.url.clone()),
            date_text,
        });
    }
    items
}

fn parse_candidates(list: &str, source: &SourceConfig) -> Vec<Selector> {
    candidates(list)
        .filter_map(|sel| match Selector::parse(sel) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(source = %source.id, selector = sel, error = %e, "skipping bad selector");
                None
            }
        })
        .collect()
}

/// First candidate selector whose first match has non-empty text.
fn first_text(container: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    for sel in selectors {
        if let Some(found) = container.select(sel).next() {
            let text = element_text(found);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// First candidate selector whose first match carries a non-empty `href`.
fn first_href(container: ElementRef<'_>, selectors: &[Selector]) -> Option<String> {
    for sel in selectors {
        if let Some(found) = container.select(sel).next() {
            if let Some(href) = found.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    return Some(href.to_string());
                }
            }
        }
    }
    None
}

/// Text content of an element with whitespace collapsed.
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---- Pattern-based strategy ----

fn extract_with_patterns(html: &str, rules: &PatternRules, source: &SourceConfig) -> Vec<RawItem> {
    let Some(item_re) = compile(&rules.item, "item", source) else {
        return Vec::new();
    };
    let title_re = compile(&rules.title, "title", source);
    let link_re = compile(&rules.link, "link", source);
    let date_re = if rules.date.is_empty() {
        None
    } else {
        compile(&rules.date, "date", source)
    };

    let mut items = Vec::new();
    for caps in item_re.captures_iter(html) {
        // Group 1 delimits the block when the pattern has one; otherwise
        // the whole match is the block.
        let block = caps
            .get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str())
            .unwrap_or_default();

        let title = title_re.as_ref().and_then(|re| first_capture(re, block));
        let link = link_re.as_ref().and_then(|re| first_capture(re, block));
        let date_text = date_re
            .as_ref()
            .and_then(|re| first_capture(re, block))
            .unwrap_or_default();

        if title.is_none() && link.is_none() {
            continue;
        }
        items.push(RawItem {
            title: title.unwrap_or_else(|| NO_TITLE.to_string()),
            link: link
                .map(|href| resolve_link(&href, source.link_base()))
                .unwrap_or_else(|| source.url.clone()),
            date_text,
        });
    }
    items
}

fn compile(pattern: &str, field: &str, source: &SourceConfig) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(source = %source.id, field, error = %e, "skipping bad pattern");
            None
        }
    }
}

/// First non-empty captured group across all matches of `re` in `text`.
///
/// Patterns without capture groups yield their whole match instead.
fn first_capture(re: &Regex, text: &str) -> Option<String> {
    for caps in re.captures_iter(text) {
        if caps.len() > 1 {
            for i in 1..caps.len() {
                if let Some(m) = caps.get(i) {
                    let s = m.as_str().trim();
                    if !s.is_empty() {
                        return Some(s.to_string());
                    }
                }
            }
        } else if let Some(m) = caps.get(0) {
            let s = m.as_str().trim();
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

// ---- Recency filter ----

/// Normalize dates and keep items inside the window.
///
/// The cutoff is inclusive: an item dated exactly `today - window_days`
/// stays in. Unknown dates always stay in. Relative order of retained
/// items is preserved.
pub fn filter_recent(
    items: Vec<RawItem>,
    source: &SourceConfig,
    window_days: i64,
    today: NaiveDate,
) -> Vec<NewsItem> {
    let cutoff = today - Duration::days(window_days);
    items
        .into_iter()
        .filter_map(|item| {
            let date = dates::normalize(&item.date_text, &source.date_formats);
            if date.is_recent(cutoff) {
                Some(NewsItem {
                    source_id: source.id.clone(),
                    title: item.title,
                    link: item.link,
                    date_text: item.date_text,
                    date,
                })
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ItemDate;

    fn selector_source(item: &str, title: &str, link: &str, date: &str) -> SourceConfig {
        SourceConfig {
            id: "ITQ".to_string(),
            name: "Porto do Itaqui".to_string(),
            url: "https://example.gov.br/noticias".to_string(),
            base_url: Some("https://example.gov.br/".to_string()),
            rules: ExtractionRules::Selectors(SelectorRules {
                item: item.to_string(),
                title: title.to_string(),
                link: link.to_string(),
                date: date.to_string(),
            }),
            date_formats: vec!["%d/%m/%Y".to_string()],
        }
    }

    fn pattern_source(item: &str, title: &str, link: &str, date: &str) -> SourceConfig {
        SourceConfig {
            id: "STS".to_string(),
            name: "Porto de Santos".to_string(),
            url: "https://example.gov.br/noticias".to_string(),
            base_url: Some("https://example.gov.br".to_string()),
            rules: ExtractionRules::Patterns(PatternRules {
                item: item.to_string(),
                title: title.to_string(),
                link: link.to_string(),
                date: date.to_string(),
            }),
            date_formats: vec!["%d/%m/%Y".to_string()],
        }
    }

    #[test]
    fn test_resolve_link() {
        assert_eq!(
            resolve_link("/noticias/123", "https://example.gov.br/"),
            "https://example.gov.br/noticias/123"
        );
        assert_eq!(
            resolve_link("noticias/123", "https://example.gov.br"),
            "https://example.gov.br/noticias/123"
        );
        assert_eq!(
            resolve_link("https://other.gov.br/n/1", "https://example.gov.br/"),
            "https://other.gov.br/n/1"
        );
    }

    #[test]
    fn test_selector_extraction() {
        let html = r#"
            <div class="card">
                <h3>Porto bate recorde de movimentação</h3>
                <a href="/noticias/recorde">leia mais</a>
                <span class="data">29/10/2025</span>
            </div>
            <div class="card">
                <h3>Novo terminal de GNL</h3>
                <a href="https://example.gov.br/noticias/gnl">leia mais</a>
                <span class="data">28/10/2025</span>
            </div>
        "#;
        let source = selector_source("div.card", "h2, h3", "a[href]", ".data");
        let items = extract_items(html, &source);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Porto bate recorde de movimentação");
        assert_eq!(items[0].link, "https://example.gov.br/noticias/recorde");
        assert_eq!(items[0].date_text, "29/10/2025");
        assert_eq!(items[1].link, "https://example.gov.br/noticias/gnl");
    }

    #[test]
    fn test_selector_candidate_order_first_nonempty_wins() {
        let html = r#"
            <div class="card">
                <h2></h2>
                <h3>Título real</h3>
                <a href="/n/1">x</a>
            </div>
        "#;
        let source = selector_source("div.card", "h2, h3", "a[href]", "");
        let items = extract_items(html, &source);
        assert_eq!(items[0].title, "Título real");
        assert_eq!(items[0].date_text, "");
    }

    #[test]
    fn test_selector_block_with_neither_field_is_dropped() {
        let html = r#"<div class="card"><p>banner sem conteúdo</p></div>"#;
        let source = selector_source("div.card", "h3", "a[href]", "");
        assert!(extract_items(html, &source).is_empty());
    }

    #[test]
    fn test_selector_missing_title_gets_placeholder() {
        let html = r#"<div class="card"><a href="/n/2">ver</a></div>"#;
        let source = selector_source("div.card", "h3", "a[href]", "");
        let items = extract_items(html, &source);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, NO_TITLE);
        assert_eq!(items[0].link, "https://example.gov.br/n/2");
    }

    #[test]
    fn test_selector_missing_link_falls_back_to_listing_url() {
        let html = r#"<div class="card"><h3>Sem link</h3></div>"#;
        let source = selector_source("div.card", "h3", "a[href]", "");
        let items = extract_items(html, &source);
        assert_eq!(items[0].link, "https://example.gov.br/noticias");
    }

    #[test]
    fn test_duplicate_links_are_deduped() {
        let html = r#"
            <div class="card"><h3>Destaque</h3><a href="/n/1">x</a></div>
            <div class="card"><h3>Destaque (repetido no carrossel)</h3><a href="/n/1">x</a></div>
        "#;
        let source = selector_source("div.card", "h3", "a[href]", "");
        let items = extract_items(html, &source);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Destaque");
    }

    #[test]
    fn test_placeholder_links_are_not_deduped() {
        // When a site's link selectors stop matching, every item falls back
        // to the listing URL; those must all survive, not collapse to one.
        let html = r#"
            <div class="card"><h3>Primeira nota</h3></div>
            <div class="card"><h3>Segunda nota</h3></div>
        "#;
        let source = selector_source("div.card", "h3", "a[href]", "");
        let items = extract_items(html, &source);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Primeira nota");
        assert_eq!(items[1].title, "Segunda nota");
        assert_eq!(items[0].link, source.url);
        assert_eq!(items[1].link, source.url);
    }

    #[test]
    fn test_pattern_extraction() {
        let html = r#"
            <li class="news"><h3>Edital publicado</h3><a href="/editais/9">+</a><em>29/10/2025</em></li>
            <li class="news"><h3>Audiência pública</h3><a href="https://example.gov.br/ap/2">+</a><em>28/10/2025</em></li>
        "#;
        let source = pattern_source(
            r#"(?s)<li class="news">(.*?)</li>"#,
            r#"<h3>([^<]+)</h3>"#,
            r#"href="([^"]+)""#,
            r#"(\d{2}/\d{2}/\d{4})"#,
        );
        let items = extract_items(html, &source);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Edital publicado");
        assert_eq!(items[0].link, "https://example.gov.br/editais/9");
        assert_eq!(items[1].date_text, "28/10/2025");
    }

    #[test]
    fn test_pattern_placeholders() {
        let html = r#"<li class="news"><h3>Só título</h3></li>"#;
        let source = pattern_source(
            r#"(?s)<li class="news">(.*?)</li>"#,
            r#"<h3>([^<]+)</h3>"#,
            r#"href="([^"]+)""#,
            "",
        );
        let items = extract_items(html, &source);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Só título");
        assert_eq!(items[0].link, "https://example.gov.br/noticias");
        assert_eq!(items[0].date_text, "");
    }

    #[test]
    fn test_pattern_block_with_neither_field_is_dropped() {
        let html = r#"<li class="news"><p>propaganda</p></li>"#;
        let source = pattern_source(
            r#"(?s)<li class="news">(.*?)</li>"#,
            r#"<h3>([^<]+)</h3>"#,
            r#"href="([^"]+)""#,
            "",
        );
        assert!(extract_items(html, &source).is_empty());
    }

    #[test]
    fn test_filter_inclusive_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 29).unwrap();
        let source = selector_source("div", "h3", "a", "");
        let items = vec![
            RawItem {
                title: "na janela".into(),
                link: "https://example.gov.br/n/1".into(),
                date_text: "22/10/2025".into(), // exactly today - 7
            },
            RawItem {
                title: "fora da janela".into(),
                link: "https://example.gov.br/n/2".into(),
                date_text: "21/10/2025".into(), // today - 8
            },
            RawItem {
                title: "sem data".into(),
                link: "https://example.gov.br/n/3".into(),
                date_text: "em breve".into(),
            },
        ];
        let kept = filter_recent(items, &source, 7, today);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].title, "na janela");
        assert_eq!(
            kept[0].date,
            ItemDate::Day(NaiveDate::from_ymd_opt(2025, 10, 22).unwrap())
        );
        assert_eq!(kept[1].title, "sem data");
        assert_eq!(kept[1].date, ItemDate::Unknown);
    }
}
