//! Mobile navigation overlay.
//!
//! Two states, `Closed` and `Open`. The toggle control's `aria-expanded`
//! always mirrors the state. Leaving `Open` by Escape hands focus back to
//! the toggle; following a link closes the menu and smooth-scrolls to the
//! section once the closing transition has started.

use super::require;
use crate::dom::{Document, NodeId};
use crate::events::{Event, EventKind, Key};
use crate::scheduler::{Scheduler, ScrollBehavior, Task};
use crate::{DomContract, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NavState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug)]
pub struct NavigationController {
    hamburger: NodeId,
    overlay: NodeId,
    links: Vec<NodeId>,
    active_class: String,
    scroll_delay_ms: u64,
    state: NavState,
}

impl NavigationController {
    pub fn initialize(doc: &mut Document, contract: &DomContract, scroll_delay_ms: u64) -> Result<Self> {
        let hamburger = require(doc, &contract.hamburger)?;
        let overlay = require(doc, &contract.nav_overlay)?;
        let links = doc.query_all_within(overlay, "a")?;
        doc.set_attr(hamburger, "aria-expanded", "false");
        log::debug!("navigation bound: {} link(s)", links.len());

        Ok(Self {
            hamburger,
            overlay,
            links,
            active_class: contract.active_class.clone(),
            scroll_delay_ms,
            state: NavState::Closed,
        })
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == NavState::Open
    }

    pub fn hamburger(&self) -> NodeId {
        self.hamburger
    }

    pub fn overlay(&self) -> NodeId {
        self.overlay
    }

    pub fn links(&self) -> &[NodeId] {
        &self.links
    }

    pub fn handle_event(&mut self, doc: &mut Document, scheduler: &mut Scheduler, event: &mut Event) {
        let target = event.target;
        match event.kind.clone() {
            EventKind::Click => {
                if doc.contains(self.hamburger, target) {
                    self.toggle(doc);
                } else if let Some(link) = self.links.iter().copied().find(|l| doc.contains(*l, target)) {
                    event.prevent_default();
                    self.activate_link(doc, scheduler, link);
                }
            }
            EventKind::KeyDown { key: Key::Escape, .. } => {
                self.close_on_escape(doc);
            }
            EventKind::KeyDown { .. } => {}
        }
    }

    /// Flip the menu. Returns `true` when it is open afterwards.
    pub fn toggle(&mut self, doc: &mut Document) -> bool {
        let open = doc.toggle_class(self.hamburger, &self.active_class);
        if open {
            doc.add_class(self.overlay, &self.active_class);
        } else {
            doc.remove_class(self.overlay, &self.active_class);
        }
        doc.set_attr(self.hamburger, "aria-expanded", if open { "true" } else { "false" });
        self.state = if open { NavState::Open } else { NavState::Closed };
        log::debug!("navigation {:?}", self.state);

        if open {
            if let Some(first) = self.links.first() {
                doc.focus(*first);
            }
        }
        open
    }

    /// Close the menu and, when `link`'s `href` names an element on the
    /// page, schedule a smooth scroll to it. Returns the scroll target.
    pub fn activate_link(&mut self, doc: &mut Document, scheduler: &mut Scheduler, link: NodeId) -> Option<NodeId> {
        self.close_menu(doc);
        let href = doc.attr(link, "href").unwrap_or_default();
        // Anything that is not a selector for an existing element is skipped.
        let target = doc.query(href).ok().flatten();
        match target {
            Some(t) => {
                scheduler.set_timeout(
                    self.scroll_delay_ms,
                    Task::ScrollIntoView {
                        target: t,
                        behavior: ScrollBehavior::Smooth,
                    },
                );
            }
            None => log::debug!("navigation link `{}` has no in-page target", href),
        }
        target
    }

    /// Escape handler. Returns whether the menu was closed.
    pub fn close_on_escape(&mut self, doc: &mut Document) -> bool {
        if !self.is_open() {
            return false;
        }
        self.close_menu(doc);
        doc.focus(self.hamburger);
        true
    }

    pub fn close_menu(&mut self, doc: &mut Document) {
        self.state = NavState::Closed;
        doc.remove_class(self.hamburger, &self.active_class);
        doc.remove_class(self.overlay, &self.active_class);
        doc.set_attr(self.hamburger, "aria-expanded", "false");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::OverlayRule;

    const PAGE: &str = r##"<html><body>
        <button id="hamburger" class="hamburger" aria-label="Toggle navigation"><span></span></button>
        <nav id="nav-overlay" class="nav-overlay">
          <a href="#about">About</a>
          <a href="#gallery">Gallery</a>
          <a href="#nowhere">Nowhere</a>
          <a href="#">Top</a>
        </nav>
        <section id="about">About</section>
        <section id="gallery">Gallery</section>
    </body></html>"##;

    fn setup() -> (Document, Scheduler, NavigationController) {
        let mut doc = Document::parse(PAGE);
        doc.set_overlay_rules(vec![OverlayRule::new("nav-overlay", "active")]);
        let ctl = NavigationController::initialize(&mut doc, &DomContract::default(), 150).unwrap();
        (doc, Scheduler::new(), ctl)
    }

    #[test]
    fn initialize_writes_collapsed_state() {
        let (doc, _, ctl) = setup();
        assert_eq!(doc.attr(ctl.hamburger(), "aria-expanded"), Some("false"));
        assert_eq!(ctl.links().len(), 4);
        assert_eq!(ctl.state(), NavState::Closed);
    }

    #[test]
    fn toggle_parity_controls_state() {
        let (mut doc, _, mut ctl) = setup();
        for n in 1..=5 {
            ctl.toggle(&mut doc);
            let open = n % 2 == 1;
            assert_eq!(ctl.is_open(), open);
            assert_eq!(doc.attr(ctl.hamburger(), "aria-expanded"), Some(if open { "true" } else { "false" }));
            assert_eq!(doc.has_class(ctl.overlay(), "active"), open);
        }
    }

    #[test]
    fn opening_focuses_first_link() {
        let (mut doc, _, mut ctl) = setup();
        ctl.toggle(&mut doc);
        assert_eq!(doc.focused(), Some(ctl.links()[0]));
    }

    #[test]
    fn link_closes_menu_and_defers_smooth_scroll() {
        let (mut doc, mut sched, mut ctl) = setup();
        ctl.toggle(&mut doc);
        let about = doc.get_element_by_id("about").unwrap();
        let mut ev = Event::click(ctl.links()[0]);
        ctl.handle_event(&mut doc, &mut sched, &mut ev);

        assert!(ev.default_prevented());
        assert!(!ctl.is_open());
        assert_eq!(sched.pop_due(149), None);
        assert_eq!(
            sched.pop_due(150),
            Some(Task::ScrollIntoView { target: about, behavior: ScrollBehavior::Smooth })
        );
    }

    #[test]
    fn links_without_target_still_close_menu() {
        let (mut doc, mut sched, mut ctl) = setup();
        for idx in [2, 3] {
            ctl.toggle(&mut doc);
            let link = ctl.links()[idx];
            assert_eq!(ctl.activate_link(&mut doc, &mut sched, link), None);
            assert!(!ctl.is_open());
            assert!(!doc.has_class(ctl.overlay(), "active"));
        }
        assert!(sched.is_idle());
    }

    #[test]
    fn escape_only_acts_when_open() {
        let (mut doc, _, mut ctl) = setup();
        assert!(!ctl.close_on_escape(&mut doc));
        assert_eq!(doc.focused(), None);

        ctl.toggle(&mut doc);
        assert!(ctl.close_on_escape(&mut doc));
        assert_eq!(doc.focused(), Some(ctl.hamburger()));
        assert_eq!(doc.attr(ctl.hamburger(), "aria-expanded"), Some("false"));
    }
}
