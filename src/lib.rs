//! Folio: headless toolkit for a static art-portfolio site
//!
//! The portfolio page is a gallery with a modal lightbox, a slide-out
//! navigation overlay and scroll-triggered fade-ins. This crate loads the
//! page's markup into a headless document and runs the page's interaction
//! controllers against it on a deterministic event loop, so focus handling
//! and overlay state can be exercised without a browser. Around that it
//! provides the site's build and verification tooling.
//!
//! # Features
//!
//! - **Headless page**: [`page::Page`] simulates clicks, key presses,
//!   scrolling and time, driving the lightbox, navigation and reveal
//!   controllers
//! - **Image pipeline** (`optimize`, default): responsive WebP variants plus a
//!   JPEG fallback per source image
//! - **Site audit**: checks the SEO and accessibility contract of a built page
//! - **Preview server** (`preview`, default): serves a built site locally
//!
//! # Example
//!
//! ```
//! use folio::page::Page;
//! use folio::PageConfig;
//!
//! # fn main() -> folio::Result<()> {
//! let html = r##"<html><body>
//!   <button id="hamburger" aria-label="Toggle navigation"></button>
//!   <nav id="nav-overlay" class="nav-overlay"><a href="#about">About</a></nav>
//!   <div class="gallery-grid"></div>
//!   <div id="lightbox" class="lightbox">
//!     <button class="lightbox-close" aria-label="Close lightbox">x</button>
//!     <img id="lightbox-img" src="" alt="">
//!   </div>
//!   <section id="about">About</section>
//! </body></html>"##;
//!
//! let mut page = Page::load(html, PageConfig::default())?;
//! let hamburger = page.query("#hamburger")?.unwrap();
//! page.click(hamburger);
//! assert_eq!(page.document().attr(hamburger, "aria-expanded"), Some("true"));
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub mod error;
pub use error::{Error, Result};

pub mod dom;
pub mod events;
pub mod scheduler;

// Block layout and viewport intersection
pub mod rendering;

// Accessibility export and device presets
pub mod platform;

// Lightbox, navigation and reveal controllers
pub mod controllers;

pub mod page;

// Build-time tooling
pub mod audit;
pub mod optimize;

pub mod preview;

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Selectors and class names of the page's DOM contract
///
/// The controllers resolve these once when the page loads. The defaults
/// match the portfolio markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomContract {
    pub lightbox: String,
    pub lightbox_image: String,
    pub lightbox_close: String,
    /// Optional caption panel inside the lightbox
    pub lightbox_info: String,
    pub gallery: String,
    pub artwork: String,
    pub artwork_image: String,
    pub artwork_info: String,
    pub hamburger: String,
    pub nav_overlay: String,
    /// Class marking an open overlay or toggle
    pub active_class: String,
    /// Class added by the reveal observer
    pub visible_class: String,
    /// Classes of overlays that only render while active
    pub overlay_classes: Vec<String>,
}

impl Default for DomContract {
    fn default() -> Self {
        Self {
            lightbox: "#lightbox".to_string(),
            lightbox_image: "#lightbox-img".to_string(),
            lightbox_close: ".lightbox-close".to_string(),
            lightbox_info: "#lightbox-info".to_string(),
            gallery: ".gallery-grid".to_string(),
            artwork: ".artwork".to_string(),
            artwork_image: ".artwork-image".to_string(),
            artwork_info: ".artwork-info".to_string(),
            hamburger: "#hamburger".to_string(),
            nav_overlay: "#nav-overlay".to_string(),
            active_class: "active".to_string(),
            visible_class: "visible".to_string(),
            overlay_classes: vec!["lightbox".to_string(), "nav-overlay".to_string()],
        }
    }
}

impl DomContract {
    /// Class name of the gallery grid, used by layout
    pub fn gallery_class(&self) -> &str {
        self.gallery.trim_start_matches('.')
    }
}

/// Configuration for a headless page run
///
/// The timing defaults reproduce the site's behaviour: the smooth scroll of
/// a navigation link starts 150ms after the menu begins to close, and
/// fade-ins are staggered by 150ms per entry.
///
/// # Examples
///
/// ```
/// let cfg = folio::PageConfig::default();
/// assert_eq!(cfg.scroll_delay_ms, 150);
/// assert_eq!(cfg.viewport.width, 1280);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    /// Viewport dimensions used for layout and intersection
    pub viewport: Viewport,
    /// Selectors the controllers bind to
    pub contract: DomContract,
    /// Delay before a navigation link scrolls to its target
    pub scroll_delay_ms: u64,
    /// Per-entry delay between fade-ins of one intersection batch
    pub reveal_stagger_ms: u64,
    /// Intersection ratio at which an artwork counts as visible
    pub reveal_threshold: f64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            contract: DomContract::default(),
            scroll_delay_ms: 150,
            reveal_stagger_ms: 150,
            reveal_threshold: 0.1,
        }
    }
}

/// Top-level configuration file (`folio.json`). Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub page: PageConfig,
    pub identity: audit::SiteIdentity,
    pub optimize: optimize::OptimizeConfig,
}

impl FolioConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: FolioConfig = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {}", path.display(), e)))?;
        log::debug!("loaded configuration from {}", path.display());
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.page.reveal_threshold) {
            return Err(Error::ConfigError(format!(
                "reveal_threshold must be within 0..=1, got {}",
                self.page.reveal_threshold
            )));
        }
        if self.page.viewport.width == 0 || self.page.viewport.height == 0 {
            return Err(Error::ConfigError("viewport must be non-empty".into()));
        }
        self.optimize.validate()
    }
}

/// A textual snapshot of the current page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextSnapshot {
    /// Page title
    pub title: String,
    /// Rendered text content, whitespace-collapsed
    pub text: String,
    /// Location the page was loaded from, if known
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PageConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.contract.gallery_class(), "gallery-grid");
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let cfg = FolioConfig::from_json(
            r#"{ "page": { "viewport": { "width": 375, "height": 667 } },
                 "optimize": { "widths": [320, 640] } }"#,
        )
        .unwrap();
        assert_eq!(cfg.page.viewport.width, 375);
        assert_eq!(cfg.page.scroll_delay_ms, 150);
        assert_eq!(cfg.page.contract.hamburger, "#hamburger");
        assert_eq!(cfg.optimize.widths, vec![320, 640]);
        assert_eq!(cfg.optimize.webp_quality, 80);
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let err = FolioConfig::from_json(r#"{ "page": { "reveal_threshold": 2.0 } }"#).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
