//! Static audit of a built portfolio page.
//!
//! Checks the markup against what search engines, social cards and the
//! interaction controllers expect to find. Every check produces a
//! [`Finding`]; a report passes when all findings pass.

use crate::dom::{Document, OverlayRule};
use crate::{DomContract, Error, Result};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

/// Who the site belongs to and where it lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteIdentity {
    pub author: String,
    /// Absolute canonical URL of the home page
    pub canonical_url: String,
    /// Phrase the meta description must contain
    pub description: String,
    pub expected_artworks: usize,
    pub json_ld_type: String,
    pub copyright_year: u32,
}

impl Default for SiteIdentity {
    fn default() -> Self {
        Self {
            author: "Stephanie Kleine".to_string(),
            canonical_url: "https://stephsart.github.io/".to_string(),
            description: "Contemporary paintings by Stephanie Kleine".to_string(),
            expected_artworks: 6,
            json_ld_type: "WebSite".to_string(),
            copyright_year: 2026,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub check: String,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub findings: Vec<Finding>,
}

impl AuditReport {
    pub fn passed(&self) -> bool {
        self.findings.iter().all(|f| f.passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| !f.passed)
    }

    pub fn finding(&self, check: &str) -> Option<&Finding> {
        self.findings.iter().find(|f| f.check == check)
    }

    /// `Err(AuditFailed(n))` when `n` checks failed
    pub fn into_result(self) -> Result<Self> {
        match self.failures().count() {
            0 => Ok(self),
            n => Err(Error::AuditFailed(n)),
        }
    }

    fn record(&mut self, check: &str, passed: bool, detail: impl Into<String>) {
        let detail = detail.into();
        if passed {
            log::debug!("audit {}: ok", check);
        } else {
            log::warn!("audit {}: {}", check, detail);
        }
        self.findings.push(Finding {
            check: check.to_string(),
            passed,
            detail,
        });
    }
}

fn css(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| Error::Selector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

fn attr_of(html: &Html, selector: &str, attr: &str) -> Result<Option<String>> {
    let sel = css(selector)?;
    Ok(html
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::to_string))
}

fn text_of(el: scraper::ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Audit `html`. Only selector errors fail the call; everything else ends
/// up as a finding.
pub fn audit_html(html: &str, identity: &SiteIdentity, contract: &DomContract) -> Result<AuditReport> {
    let parsed = Html::parse_document(html);
    let mut report = AuditReport::default();

    let artworks = parsed.select(&css(&contract.artwork)?).count();
    report.record(
        "artwork-count",
        artworks == identity.expected_artworks,
        format!("found {} artwork(s), expected {}", artworks, identity.expected_artworks),
    );

    let description = attr_of(&parsed, r#"meta[name="description"]"#, "content")?.unwrap_or_default();
    report.record(
        "meta-description",
        !description.is_empty() && description.contains(&identity.description),
        format!("content = {:?}", description),
    );

    for property in ["og:title", "og:description", "og:image", "og:url"] {
        let content = attr_of(&parsed, &format!(r#"meta[property="{}"]"#, property), "content")?;
        let present = content.as_deref().map_or(false, |c| !c.trim().is_empty());
        report.record(property, present, format!("content = {:?}", content));
    }
    let og_type = attr_of(&parsed, r#"meta[property="og:type"]"#, "content")?;
    report.record(
        "og:type",
        og_type.as_deref() == Some("website"),
        format!("content = {:?}", og_type),
    );

    check_json_ld(&parsed, identity, &mut report)?;
    check_canonical(&parsed, identity, &mut report)?;

    let footer_text = parsed
        .select(&css("footer")?)
        .map(text_of)
        .collect::<Vec<_>>()
        .join(" ");
    let footer_text = footer_text.split_whitespace().collect::<Vec<_>>().join(" ");
    let notice = format!("© {} {}", identity.copyright_year, identity.author);
    report.record(
        "footer-copyright",
        footer_text.contains(&notice),
        format!("expected {:?}", notice),
    );

    let images: Vec<_> = parsed
        .select(&css(&format!("{} img", contract.artwork_image))?)
        .collect();
    let missing_alt = images
        .iter()
        .filter(|img| img.value().attr("alt").map_or(true, |a| a.trim().is_empty()))
        .count();
    report.record(
        "artwork-alt",
        missing_alt == 0,
        format!("{} of {} image(s) without alt text", missing_alt, images.len()),
    );

    let close = parsed
        .select(&css(&format!("{} {}", contract.lightbox, contract.lightbox_close))?)
        .next();
    let close_ok = close.map_or(false, |el| {
        el.value().name() == "button" && el.value().attr("aria-label") == Some("Close lightbox")
    });
    report.record(
        "lightbox-close",
        close_ok,
        "close control must be a <button> labelled \"Close lightbox\"",
    );

    let hamburger = parsed.select(&css(&contract.hamburger)?).next();
    let hamburger_ok = hamburger.map_or(false, |el| {
        el.value().attr("aria-label") == Some("Toggle navigation") && el.value().attr("aria-expanded").is_some()
    });
    report.record(
        "hamburger",
        hamburger_ok,
        "toggle must be labelled \"Toggle navigation\" and carry aria-expanded",
    );

    check_skip_link(html, contract, &mut report)?;

    log::info!(
        "audit finished: {} check(s), {} failed",
        report.findings.len(),
        report.failures().count()
    );
    Ok(report)
}

fn check_json_ld(parsed: &Html, identity: &SiteIdentity, report: &mut AuditReport) -> Result<()> {
    let script = parsed
        .select(&css(r#"script[type="application/ld+json"]"#)?)
        .next()
        .map(|el| el.text().collect::<String>());
    let Some(script) = script else {
        report.record("json-ld", false, "no JSON-LD block");
        return Ok(());
    };
    let (passed, detail) = match serde_json::from_str::<serde_json::Value>(&script) {
        Ok(data) => {
            let context = data["@context"].as_str();
            let kind = data["@type"].as_str();
            let author = data["author"]["name"].as_str();
            let ok = context == Some("https://schema.org")
                && kind == Some(identity.json_ld_type.as_str())
                && author == Some(identity.author.as_str());
            (ok, format!("@context = {:?}, @type = {:?}, author.name = {:?}", context, kind, author))
        }
        Err(e) => (false, format!("invalid JSON: {}", e)),
    };
    report.record("json-ld", passed, detail);
    Ok(())
}

fn check_canonical(parsed: &Html, identity: &SiteIdentity, report: &mut AuditReport) -> Result<()> {
    let href = attr_of(parsed, r#"link[rel="canonical"]"#, "href")?;
    let expected = &identity.canonical_url;
    Url::parse(expected).map_err(|e| Error::ConfigError(format!("canonical_url {:?}: {}", expected, e)))?;
    // Exact href; only a trailing slash is allowed to differ.
    let passed = href
        .as_deref()
        .is_some_and(|h| h.trim_end_matches('/') == expected.trim_end_matches('/'));
    report.record("canonical", passed, format!("href = {:?}, expected {}", href, expected));
    Ok(())
}

fn check_skip_link(html: &str, contract: &DomContract, report: &mut AuditReport) -> Result<()> {
    let mut doc = Document::parse(html);
    doc.set_overlay_rules(
        contract
            .overlay_classes
            .iter()
            .map(|c| OverlayRule::new(c.clone(), contract.active_class.clone()))
            .collect(),
    );
    let skip = doc.query(".skip-link")?;
    let first = doc.tab_order().first().copied();
    report.record(
        "skip-link",
        skip.is_some() && skip == first,
        "the skip link must be the first focusable element",
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults() {
        let id = SiteIdentity::default();
        assert_eq!(id.expected_artworks, 6);
        assert_eq!(id.canonical_url, "https://stephsart.github.io/");
    }

    #[test]
    fn report_result_counts_failures() {
        let mut report = AuditReport::default();
        report.record("a", true, "");
        report.record("b", false, "broken");
        report.record("c", false, "broken");
        assert!(!report.passed());
        assert_eq!(report.finding("b").map(|f| f.passed), Some(false));
        assert!(matches!(report.into_result(), Err(Error::AuditFailed(2))));
    }

    #[test]
    fn malformed_json_ld_is_a_finding() {
        let html = r#"<html><head><script type="application/ld+json">{nope</script></head><body></body></html>"#;
        let report = audit_html(html, &SiteIdentity::default(), &DomContract::default()).unwrap();
        let f = report.finding("json-ld").unwrap();
        assert!(!f.passed);
        assert!(f.detail.starts_with("invalid JSON"));
    }

    #[test]
    fn canonical_must_match_href_exactly() {
        let check = |href: &str| {
            let html = format!(r#"<html><head><link rel="canonical" href="{}"></head><body></body></html>"#, href);
            let report = audit_html(&html, &SiteIdentity::default(), &DomContract::default()).unwrap();
            report.finding("canonical").unwrap().passed
        };
        assert!(check("https://stephsart.github.io/"));
        assert!(check("https://stephsart.github.io"));
        assert!(!check("https://STEPHSART.github.io/"));
        assert!(!check("http://stephsart.github.io/"));
    }

    #[test]
    fn unparseable_canonical_setting_is_a_config_error() {
        let identity = SiteIdentity {
            canonical_url: "not a url".into(),
            ..Default::default()
        };
        let err = audit_html("<html></html>", &identity, &DomContract::default()).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
