//! Grouping and digest rendering.
//!
//! Retained items are grouped by source (first-seen order preserved) and
//! sorted newest-first inside each group; items without a parseable date
//! sort last so they cannot pollute the top of a group with unverifiable
//! recency. Each digest is rendered twice: plain text and HTML.
//!
//! Rows display the raw scraped date text, not the normalized date. For
//! year-only matches the normalized value is a low-confidence January 1st,
//! and the raw text is the honest thing to show.
//!
//! All scraped fields are escaped in the HTML rendering. Titles and links
//! come from third-party sites and must not be able to break the table
//! markup or inject their own.

use crate::models::NewsItem;

const HTML_STYLE: &str = "<style>body{font-family:Arial,Helvetica,sans-serif;font-size:14px;color:#222}h2{margin:0 0 10px 0}h3{margin:16px 0 6px 0;color:#003366}table{border-collapse:collapse;width:100%;margin-top:6px}th,td{border:1px solid #ddd;padding:8px;vertical-align:top}th{background:#f5f5f5;text-align:left;font-weight:600}.muted{color:#666;font-size:13px}.datecell{white-space:nowrap;font-size:13px;color:#555}</style>";

const EMPTY_NOTICE: &str = "Nenhuma notícia recente encontrada.";

/// Group items by source id, preserving the order sources first appear,
/// and sort each group by normalized date descending with unknown dates
/// last (in their original relative order).
pub fn group_by_source(items: Vec<NewsItem>) -> Vec<(String, Vec<NewsItem>)> {
    let mut groups: Vec<(String, Vec<NewsItem>)> = Vec::new();
    for item in items {
        match groups.iter_mut().find(|(id, _)| *id == item.source_id) {
            Some((_, list)) => list.push(item),
            None => groups.push((item.source_id.clone(), vec![item])),
        }
    }
    for (_, list) in &mut groups {
        // Stable sort: ties and unknowns keep their appearance order.
        list.sort_by(|a, b| b.date.sort_key().cmp(&a.date.sort_key()));
    }
    groups
}

/// Render the plain-text digest.
pub fn render_text(groups: &[(String, Vec<NewsItem>)], window_days: i64) -> String {
    let mut out = vec![format!("Radar Portos — últimas {window_days} dias"), String::new()];
    if groups.is_empty() {
        out.push(EMPTY_NOTICE.to_string());
        out.push(String::new());
        return out.join("\n");
    }
    for (id, items) in groups {
        out.push(format!("== {id} =="));
        for item in items {
            out.push(format!("  - [{}] {}  {}", item.date_text, item.title, item.link));
        }
        out.push(String::new());
    }
    out.join("\n")
}

/// Render the HTML digest: one table per source, Date and Title/Link columns.
pub fn render_html(groups: &[(String, Vec<NewsItem>)], window_days: i64) -> String {
    let head = format!(
        "<h2>Radar Portos — últimas {window_days} dias</h2>\
         <p class=\"muted\">Monitor automático de notícias institucionais de portos e reguladores brasileiros. \
         Foco: sustentabilidade, descarbonização, energia, operações e investimentos.</p>"
    );

    let body = if groups.is_empty() {
        format!("<p>{EMPTY_NOTICE}</p>")
    } else {
        let mut blocks = Vec::new();
        for (id, items) in groups {
            let mut rows = Vec::new();
            for item in items {
                rows.push(format!(
                    "<tr><td class=\"datecell\">{}</td>\
                     <td><a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a></td></tr>",
                    escape_html(&item.date_text),
                    escape_html(&item.link),
                    escape_html(&item.title),
                ));
            }
            blocks.push(format!(
                "<h3>{}</h3><table><thead><tr><th>Data</th><th>Título / Link</th></tr></thead><tbody>{}</tbody></table>",
                escape_html(id),
                rows.join(""),
            ));
        }
        blocks.join("")
    };

    format!("<!DOCTYPE html><html><head>{HTML_STYLE}</head><body>{head}{body}</body></html>")
}

/// Minimal HTML entity escaping for untrusted scraped text.
fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
