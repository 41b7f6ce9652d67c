//! Source configuration loaded from the YAML sources file.
//!
//! Each monitored site is described declaratively: identity, listing URL,
//! and one of two extraction rule shapes:
//!
//! - `selectors`: CSS selectors for item containers and their title/link/date
//!   fields, applied to the parsed DOM
//! - `patterns`: regular expressions applied to the raw markup, for sites
//!   whose HTML is too irregular for selectors
//!
//! The file is read once at startup and validated up front (URLs parse,
//! selectors and patterns compile) so that a broken config aborts the run
//! before any network activity.
//!
//! # Example
//!
//! ```yaml
//! - id: ITQ
//!   name: Porto do Itaqui
//!   url: https://www.portodoitaqui.com/noticias
//!   rules:
//!     selectors:
//!       item: "div.card-noticia, article.noticia"
//!       title: "h2, h3, .titulo"
//!       link: "a[href]"
//!       date: ".data, time"
//!   date_formats: ["%d/%m/%Y", "%d-%m-%Y"]
//! ```

use serde::Deserialize;
use std::fmt;
use std::fs;
use tracing::{info, instrument};
use url::Url;

/// One monitored website plus its extraction rules.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Short code used as the grouping key in the digest (`"ITQ"`, `"ANTAQ"`).
    pub id: String,
    /// Human-readable name shown in error items.
    pub name: String,
    /// Listing page URL to fetch.
    pub url: String,
    /// Base for resolving relative links; defaults to `url`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// How to pull items out of the listing page.
    #[serde(with = "serde_yaml::with::singleton_map")]
    pub rules: ExtractionRules,
    /// Numeric date formats to try, in order (`strftime` syntax).
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,
}

impl SourceConfig {
    /// Base URL for relative-link resolution.
    pub fn link_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(&self.url)
    }
}

/// The two rule shapes a source may declare. The extractor dispatches on
/// the variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionRules {
    /// CSS-selector driven extraction over the parsed DOM.
    Selectors(SelectorRules),
    /// Regex driven extraction over the raw markup.
    Patterns(PatternRules),
}

/// CSS selector set. Each field is a comma-separated candidate list; the
/// first selector that matches an element with usable content wins.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectorRules {
    pub item: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub date: String,
}

/// Regex set. `item` enumerates candidate blocks (capture group 1 when
/// present, else the whole match); the field patterns run inside each block.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternRules {
    pub item: String,
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub date: String,
}

fn default_date_formats() -> Vec<String> {
    ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Split a comma-separated candidate list, dropping empty entries.
pub fn candidates(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Why the sources file could not be used. Always fatal: the run aborts
/// before any network activity.
#[derive(Debug)]
pub enum ConfigError {
    /// The file could not be read at all.
    Io(String, std::io::Error),
    /// The YAML did not parse into a source list.
    Yaml(serde_yaml::Error),
    /// The file parsed but a source declares something unusable.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "cannot read sources file {path}: {e}"),
            ConfigError::Yaml(e) => write!(f, "sources file is not valid YAML: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid source definition: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate the sources file.
#[instrument(level = "info")]
pub fn load_sources(path: &str) -> Result<Vec<SourceConfig>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_string(), e))?;
    let sources: Vec<SourceConfig> = serde_yaml::from_str(&text).map_err(ConfigError::Yaml)?;
    if sources.is_empty() {
        return Err(ConfigError::Invalid(format!("{path} lists no sources")));
    }
    for source in &sources {
        validate_source(source)?;
    }
    info!(count = sources.len(), path, "Loaded source definitions");
    Ok(sources)
}

fn validate_source(source: &SourceConfig) -> Result<(), ConfigError> {
    if source.id.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "source \"{}\" has an empty id",
            source.name
        )));
    }
    Url::parse(&source.url).map_err(|e| {
        ConfigError::Invalid(format!("source {}: bad url {}: {e}", source.id, source.url))
    })?;
    Url::parse(source.link_base()).map_err(|e| {
        ConfigError::Invalid(format!(
            "source {}: bad base_url {}: {e}",
            source.id,
            source.link_base()
        ))
    })?;
    match &source.rules {
        ExtractionRules::Selectors(rules) => {
            check_selector(&source.id, "item", &rules.item)?;
            check_selector(&source.id, "title", &rules.title)?;
            check_selector(&source.id, "link", &rules.link)?;
            if !rules.date.is_empty() {
                check_selector(&source.id, "date", &rules.date)?;
            }
        }
        ExtractionRules::Patterns(rules) => {
            check_pattern(&source.id, "item", &rules.item)?;
            check_pattern(&source.id, "title", &rules.title)?;
            check_pattern(&source.id, "link", &rules.link)?;
            if !rules.date.is_empty() {
                check_pattern(&source.id, "date", &rules.date)?;
            }
        }
    }
    Ok(())
}

fn check_selector(id: &str, field: &str, list: &str) -> Result<(), ConfigError> {
    if candidates(list).next().is_none() {
        return Err(ConfigError::Invalid(format!(
            "source {id}: {field} selector list is empty"
        )));
    }
    for sel in candidates(list) {
        // SelectorErrorKind borrows the input, so stringify it here.
        scraper::Selector::parse(sel).map_err(|e| {
            ConfigError::Invalid(format!("source {id}: bad {field} selector \"{sel}\": {e}"))
        })?;
    }
    Ok(())
}

fn check_pattern(id: &str, field: &str, pattern: &str) -> Result<(), ConfigError> {
    if pattern.trim().is_empty() {
        return Err(ConfigError::Invalid(format!(
            "source {id}: {field} pattern is empty"
        )));
    }
    regex::Regex::new(pattern).map_err(|e| {
        ConfigError::Invalid(format!("source {id}: bad {field} pattern: {e}"))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_variant_deserializes() {
        let yaml = r#"
- id: ITQ
  name: Porto do Itaqui
  url: https://www.portodoitaqui.com/noticias
  rules:
    selectors:
      item: "div.card"
      title: "h2, h3"
      link: "a[href]"
      date: ".data"
"#;
        let sources: Vec<SourceConfig> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "ITQ");
        assert!(matches!(sources[0].rules, ExtractionRules::Selectors(_)));
        // Defaults kick in when omitted.
        assert_eq!(sources[0].link_base(), "https://www.portodoitaqui.com/noticias");
        assert_eq!(sources[0].date_formats, default_date_formats());
    }

    #[test]
    fn test_patterns_variant_deserializes() {
        let yaml = r#"
- id: STS
  name: Porto de Santos
  url: https://www.portodesantos.com.br/noticias
  base_url: https://www.portodesantos.com.br
  rules:
    patterns:
      item: '(?s)<li class="news">(.*?)</li>'
      title: '<h3[^>]*>([^<]+)</h3>'
      link: 'href="([^"]+)"'
      date: '(\d{2}/\d{2}/\d{4})'
  date_formats: ["%d/%m/%Y"]
"#;
        let sources: Vec<SourceConfig> = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(sources[0].rules, ExtractionRules::Patterns(_)));
        assert_eq!(sources[0].link_base(), "https://www.portodesantos.com.br");
        for source in &sources {
            validate_source(source).unwrap();
        }
    }

    #[test]
    fn test_bad_selector_is_rejected() {
        let yaml = r#"
- id: BAD
  name: Broken
  url: https://example.gov.br/
  rules:
    selectors:
      item: "div[unclosed"
      title: "h2"
      link: "a"
"#;
        let sources: Vec<SourceConfig> = serde_yaml::from_str(yaml).unwrap();
        let err = validate_source(&sources[0]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let yaml = r#"
- id: BAD
  name: Broken
  url: https://example.gov.br/
  rules:
    patterns:
      item: '<li>(.*?'
      title: 'x'
      link: 'y'
"#;
        let sources: Vec<SourceConfig> = serde_yaml::from_str(yaml).unwrap();
        assert!(validate_source(&sources[0]).is_err());
    }

    #[test]
    fn test_candidates_trims_and_skips_empty() {
        let got: Vec<&str> = candidates(" h2 , , .titulo a ").collect();
        assert_eq!(got, vec!["h2", ".titulo a"]);
    }
}
