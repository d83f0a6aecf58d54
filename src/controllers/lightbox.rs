//! Gallery lightbox with a single-stop focus trap.
//!
//! The controller remembers which gallery control opened the modal and hands
//! focus back to it on every closing path: the close button, a click on the
//! backdrop, or Escape anywhere on the page.

use super::require;
use crate::dom::{Document, NodeId, Selector};
use crate::events::{Event, EventKind, Key};
use crate::scheduler::{Scheduler, Task};
use crate::{DomContract, Error, Result};

/// Page-lifetime state of the lightbox
///
/// `trigger` is `Some` exactly while the lightbox is open; it is taken when
/// focus is handed back on close.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightboxState {
    pub is_open: bool,
    pub trigger: Option<NodeId>,
    pub displayed_src: Option<String>,
    pub displayed_alt: Option<String>,
    pub displayed_caption: Option<String>,
}

#[derive(Debug)]
pub struct LightboxController {
    lightbox: NodeId,
    image: NodeId,
    close_button: NodeId,
    gallery: NodeId,
    info: Option<NodeId>,
    artwork: Selector,
    artwork_image: Selector,
    artwork_info: Selector,
    active_class: String,
    state: LightboxState,
}

fn first_image(doc: &Document, node: NodeId) -> Option<NodeId> {
    doc.descendants(node)
        .into_iter()
        .find(|n| doc.tag(*n) == Some("img"))
}

impl LightboxController {
    /// Bind to the page. Gallery items holding a real image become
    /// keyboard-operable buttons; placeholders stay inert.
    pub fn initialize(doc: &mut Document, contract: &DomContract) -> Result<Self> {
        let lightbox = require(doc, &contract.lightbox)?;
        let close_button = doc
            .query_within(lightbox, &contract.lightbox_close)?
            .ok_or_else(|| {
                Error::MissingElement(format!("{} {}", contract.lightbox, contract.lightbox_close))
            })?;
        let image = require(doc, &contract.lightbox_image)?;
        let gallery = require(doc, &contract.gallery)?;
        let info = doc.query(&contract.lightbox_info)?;

        let artwork_image = Selector::parse(&contract.artwork_image)?;
        let items = doc.select_within(doc.root(), &artwork_image, true);
        let mut interactive = 0usize;
        for item in &items {
            if first_image(doc, *item).is_some() {
                doc.set_attr(*item, "role", "button");
                doc.set_attr(*item, "tabindex", "0");
                interactive += 1;
            }
        }
        log::debug!(
            "lightbox bound: {} gallery item(s), {} interactive",
            items.len(),
            interactive
        );

        Ok(Self {
            lightbox,
            image,
            close_button,
            gallery,
            info,
            artwork: Selector::parse(&contract.artwork)?,
            artwork_image,
            artwork_info: Selector::parse(&contract.artwork_info)?,
            active_class: contract.active_class.clone(),
            state: LightboxState::default(),
        })
    }

    pub fn state(&self) -> &LightboxState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    pub fn close_button(&self) -> NodeId {
        self.close_button
    }

    pub fn element(&self) -> NodeId {
        self.lightbox
    }

    /// Run this controller's listeners for `event`, in the order a page
    /// script registers them.
    pub fn handle_event(&mut self, doc: &mut Document, scheduler: &mut Scheduler, event: &mut Event) {
        let target = event.target;
        match event.kind.clone() {
            EventKind::Click => {
                // Delegated on the grid so items added later need no binding.
                if doc.contains(self.gallery, target) {
                    if let Some(item) = doc.closest(target, &self.artwork_image) {
                        self.open(doc, scheduler, item);
                    }
                }
                // Backdrop or close control; the enlarged image is neither.
                if target == self.lightbox || doc.contains(self.close_button, target) {
                    self.close(doc);
                }
            }
            EventKind::KeyDown { key, .. } => {
                if matches!(key, Key::Enter | Key::Space) && doc.contains(self.gallery, target) {
                    if let Some(item) = doc.closest(target, &self.artwork_image) {
                        event.prevent_default();
                        self.open(doc, scheduler, item);
                    }
                }
                if key == Key::Tab && self.state.is_open {
                    event.prevent_default();
                    doc.focus(self.close_button);
                }
                if key == Key::Escape && self.state.is_open {
                    self.close(doc);
                }
            }
        }
    }

    /// Show the image held by `source`. Returns `false` without touching
    /// any state when `source` has no image (a placeholder).
    pub fn open(&mut self, doc: &mut Document, scheduler: &mut Scheduler, source: NodeId) -> bool {
        let Some(img) = first_image(doc, source) else {
            log::debug!("ignoring activation of placeholder node {}", source.index());
            return false;
        };
        let src = doc.attr(img, "src").unwrap_or_default().to_string();
        let alt = doc.attr(img, "alt").unwrap_or_default().to_string();

        self.state.trigger = Some(source);
        doc.set_attr(self.image, "src", &src);
        doc.set_attr(self.image, "alt", &alt);

        if let Some(info) = self.info {
            let caption = doc
                .closest(source, &self.artwork)
                .and_then(|card| doc.select_within(card, &self.artwork_info, false).into_iter().next())
                .map(|n| doc.text_content(n).split_whitespace().collect::<Vec<_>>().join(" "));
            doc.set_text_content(info, caption.as_deref().unwrap_or_default());
            self.state.displayed_caption = caption;
        }

        doc.add_class(self.lightbox, &self.active_class);
        self.state.is_open = true;
        self.state.displayed_src = Some(src);
        self.state.displayed_alt = Some(alt);
        log::debug!("lightbox opened from node {}", source.index());

        // The close button only becomes focusable once the modal renders.
        scheduler.request_animation_frame(Task::Focus(self.close_button));
        true
    }

    /// Hide the modal and return focus to the element that opened it. Safe
    /// to call when already closed.
    pub fn close(&mut self, doc: &mut Document) {
        doc.remove_class(self.lightbox, &self.active_class);
        self.state.is_open = false;
        if let Some(trigger) = self.state.trigger.take() {
            doc.focus(trigger);
            log::debug!("lightbox closed, focus restored to node {}", trigger.index());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
        <div class="gallery-grid">
          <article class="artwork"><div class="artwork-image"><div class="placeholder-image">Soon</div></div></article>
          <article class="artwork">
            <div class="artwork-image"><img src="/images/lungs-800w.jpg" alt="Lungs filled with Blue Smoke"></div>
            <div class="artwork-info"><h3>Blue Lungs</h3> <p>Acrylic on Canvas</p></div>
          </article>
        </div>
        <div id="lightbox" class="lightbox">
          <button class="lightbox-close" aria-label="Close lightbox"><span class="icon">x</span></button>
          <img id="lightbox-img" src="" alt="">
          <div id="lightbox-info"></div>
        </div>
    </body></html>"#;

    fn setup() -> (Document, Scheduler, LightboxController) {
        let mut doc = Document::parse(PAGE);
        let ctl = LightboxController::initialize(&mut doc, &DomContract::default()).unwrap();
        (doc, Scheduler::new(), ctl)
    }

    fn items(doc: &Document) -> Vec<NodeId> {
        doc.query_all(".artwork-image").unwrap()
    }

    #[test]
    fn initialize_marks_only_real_images_interactive() {
        let (doc, _, _) = setup();
        let items = items(&doc);
        assert_eq!(doc.attr(items[0], "role"), None);
        assert_eq!(doc.attr(items[0], "tabindex"), None);
        assert_eq!(doc.attr(items[1], "role"), Some("button"));
        assert_eq!(doc.attr(items[1], "tabindex"), Some("0"));
    }

    #[test]
    fn initialize_fails_without_contract_elements() {
        let mut doc = Document::parse("<html><body><div class='gallery-grid'></div></body></html>");
        let err = LightboxController::initialize(&mut doc, &DomContract::default()).unwrap_err();
        assert!(matches!(err, Error::MissingElement(_)));
    }

    #[test]
    fn open_copies_image_and_schedules_focus() {
        let (mut doc, mut sched, mut ctl) = setup();
        let item = items(&doc)[1];
        assert!(ctl.open(&mut doc, &mut sched, item));

        let img = doc.get_element_by_id("lightbox-img").unwrap();
        assert_eq!(doc.attr(img, "src"), Some("/images/lungs-800w.jpg"));
        assert_eq!(doc.attr(img, "alt"), Some("Lungs filled with Blue Smoke"));
        assert!(doc.has_class(ctl.element(), "active"));
        assert_eq!(ctl.state().trigger, Some(item));
        assert_eq!(ctl.state().displayed_caption.as_deref(), Some("Blue Lungs Acrylic on Canvas"));
        assert_eq!(sched.take_frame(), vec![Task::Focus(ctl.close_button())]);
    }

    #[test]
    fn placeholder_is_a_no_op() {
        let (mut doc, mut sched, mut ctl) = setup();
        let placeholder = items(&doc)[0];
        assert!(!ctl.open(&mut doc, &mut sched, placeholder));
        assert_eq!(ctl.state(), &LightboxState::default());
        assert!(!doc.has_class(ctl.element(), "active"));
        assert!(sched.is_idle());
    }

    #[test]
    fn close_without_trigger_is_safe() {
        let (mut doc, _, mut ctl) = setup();
        ctl.close(&mut doc);
        ctl.close(&mut doc);
        assert!(!ctl.is_open());
        assert_eq!(doc.focused(), None);
    }

    #[test]
    fn clicking_enlarged_image_keeps_modal_open() {
        let (mut doc, mut sched, mut ctl) = setup();
        let item = items(&doc)[1];
        ctl.open(&mut doc, &mut sched, item);
        let img = doc.get_element_by_id("lightbox-img").unwrap();
        ctl.handle_event(&mut doc, &mut sched, &mut Event::click(img));
        assert!(ctl.is_open());

        let icon = doc.query(".lightbox-close .icon").unwrap().unwrap();
        ctl.handle_event(&mut doc, &mut sched, &mut Event::click(icon));
        assert!(!ctl.is_open());
        assert_eq!(ctl.state().trigger, None);
    }

    #[test]
    fn reopening_same_item_recopies_image() {
        let (mut doc, mut sched, mut ctl) = setup();
        let item = items(&doc)[1];
        ctl.open(&mut doc, &mut sched, item);
        let img = doc.get_element_by_id("lightbox-img").unwrap();
        doc.set_attr(img, "src", "tampered");
        assert!(ctl.open(&mut doc, &mut sched, item));
        assert_eq!(doc.attr(img, "src"), Some("/images/lungs-800w.jpg"));
        assert_eq!(ctl.state().trigger, Some(item));
    }

    #[test]
    fn enter_on_item_is_prevented_and_opens() {
        let (mut doc, mut sched, mut ctl) = setup();
        let item = items(&doc)[1];
        let mut ev = Event::key_down(item, Key::Enter, false);
        ctl.handle_event(&mut doc, &mut sched, &mut ev);
        assert!(ev.default_prevented());
        assert!(ctl.is_open());
    }
}
