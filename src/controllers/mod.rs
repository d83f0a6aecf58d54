//! Interaction controllers of the portfolio page
//!
//! Each controller resolves its part of the DOM contract once, then reacts to
//! events dispatched by the page. Controllers share no state; the lightbox
//! and the navigation overlay follow the same focus-restoration pattern.

pub mod lightbox;
pub mod navigation;
pub mod reveal;

pub use lightbox::{LightboxController, LightboxState};
pub use navigation::{NavState, NavigationController};
pub use reveal::{IntersectionEntry, RevealObserver};

use crate::dom::{Document, NodeId};
use crate::{Error, Result};

/// Resolve a required element of the contract. A missing element means the
/// page is misconfigured, which is fatal.
pub(crate) fn require(doc: &Document, selector: &str) -> Result<NodeId> {
    doc.query(selector)?
        .ok_or_else(|| Error::MissingElement(selector.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_the_missing_selector() {
        let doc = Document::parse("<html><body><div id=here></div></body></html>");
        assert!(require(&doc, "#here").is_ok());
        match require(&doc, "#gone") {
            Err(Error::MissingElement(sel)) => assert_eq!(sel, "#gone"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
