//! Headless portfolio page.
//!
//! [`Page`] owns the document and plays the browser's part: it dispatches
//! input events to the controllers, performs default actions that were not
//! cancelled (sequential focus, link jumps, button activation), runs
//! deferred tasks on a virtual clock and feeds viewport intersections to the
//! reveal observer.

use crate::controllers::{LightboxController, NavigationController, RevealObserver};
use crate::dom::{Document, NodeId, OverlayRule, Selector};
use crate::events::{Event, EventKind, Key};
use crate::platform::{find_by_role, AccessibilityProvider, AccessibilityTree, DeviceMetrics, DocumentAccessibility};
use crate::rendering::{intersection_ratio, layout_document, Layout};
use crate::scheduler::{Scheduler, ScrollBehavior, Task};
use crate::{Error, PageConfig, Result, TextSnapshot};
use serde::Serialize;
use std::path::Path;

// Upper bound on frames `settle` will run before giving up.
const SETTLE_FRAME_LIMIT: usize = 10_000;
const FRAME_MS: u64 = 16;

/// A scroll performed by the page, either by a task or a fragment jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScrollRecord {
    pub target: NodeId,
    pub behavior: ScrollBehavior,
    pub at_ms: u64,
}

pub struct Page {
    config: PageConfig,
    document: Document,
    scheduler: Scheduler,
    lightbox: LightboxController,
    navigation: NavigationController,
    reveal: RevealObserver,
    link: Selector,
    scroll_y: i32,
    scroll_log: Vec<ScrollRecord>,
    url: String,
}

impl Page {
    /// Parse `html` and initialize the controllers, as the page script does
    /// on load. Fails when a required element of the contract is missing.
    pub fn load(html: &str, config: PageConfig) -> Result<Self> {
        let mut document = Document::parse(html);
        let contract = &config.contract;
        document.set_overlay_rules(
            contract
                .overlay_classes
                .iter()
                .map(|c| OverlayRule::new(c.clone(), contract.active_class.clone()))
                .collect(),
        );

        let lightbox = LightboxController::initialize(&mut document, contract)?;
        let navigation = NavigationController::initialize(&mut document, contract, config.scroll_delay_ms)?;
        let reveal = RevealObserver::initialize(&document, contract, config.reveal_threshold, config.reveal_stagger_ms)?;

        let mut page = Self {
            config,
            document,
            scheduler: Scheduler::new(),
            lightbox,
            navigation,
            reveal,
            link: Selector::parse("a[href]")?,
            scroll_y: 0,
            scroll_log: Vec::new(),
            url: String::new(),
        };
        page.update_intersections();
        log::info!("page loaded: {}", page.document.title());
        Ok(page)
    }

    pub fn load_file(path: impl AsRef<Path>, config: PageConfig) -> Result<Self> {
        let path = path.as_ref();
        let html = std::fs::read_to_string(path)
            .map_err(|e| Error::LoadError(format!("{}: {}", path.display(), e)))?;
        let mut page = Self::load(&html, config)?;
        page.url = format!("file://{}", path.display());
        Ok(page)
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for scripted changes such as inserting gallery items
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn lightbox(&self) -> &LightboxController {
        &self.lightbox
    }

    pub fn navigation(&self) -> &NavigationController {
        &self.navigation
    }

    pub fn reveal(&self) -> &RevealObserver {
        &self.reveal
    }

    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        self.document.query(selector)
    }

    pub fn query_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.document.query_all(selector)
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.document.focused()
    }

    pub fn get_by_role(&self, role: &str, name: &str) -> Option<NodeId> {
        find_by_role(&self.document, role, name)
    }

    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn scroll_y(&self) -> i32 {
        self.scroll_y
    }

    pub fn scroll_log(&self) -> &[ScrollRecord] {
        &self.scroll_log
    }

    pub fn layout(&self) -> Layout {
        layout_document(
            &self.document,
            self.config.viewport,
            self.config.contract.gallery_class(),
        )
    }

    // --- input ---

    /// Run every listener for `event`, then the default action unless a
    /// listener cancelled it.
    pub fn dispatch(&mut self, mut event: Event) -> Event {
        self.lightbox
            .handle_event(&mut self.document, &mut self.scheduler, &mut event);
        self.navigation
            .handle_event(&mut self.document, &mut self.scheduler, &mut event);
        if !event.default_prevented() {
            self.default_action(&event);
        }
        event
    }

    /// Click `node` like a pointer would: bring it into view, move focus to
    /// its nearest focusable ancestor, then dispatch the click.
    pub fn click(&mut self, node: NodeId) -> Event {
        self.scroll_into_view_if_needed(node);
        match self.document.focusable_ancestor(node) {
            Some(f) => {
                self.document.focus(f);
            }
            None => self.document.blur(),
        }
        self.dispatch(Event::click(node))
    }

    /// Click the first element matching `selector`
    pub fn click_selector(&mut self, selector: &str) -> Result<Event> {
        let node = self
            .query(selector)?
            .ok_or_else(|| Error::MissingElement(selector.to_string()))?;
        Ok(self.click(node))
    }

    /// Press `key` with focus where it currently is
    pub fn press_key(&mut self, key: Key) -> Event {
        self.key_down(key, false)
    }

    /// Press a key by its `KeyboardEvent.key` name, e.g. `"Escape"`
    pub fn press(&mut self, name: &str) -> Event {
        self.press_key(Key::from_name(name))
    }

    pub fn press_shift_tab(&mut self) -> Event {
        self.key_down(Key::Tab, true)
    }

    fn key_down(&mut self, key: Key, shift: bool) -> Event {
        let target = self
            .document
            .focused()
            .or_else(|| self.document.body())
            .unwrap_or_else(|| self.document.root());
        self.dispatch(Event::key_down(target, key, shift))
    }

    fn default_action(&mut self, event: &Event) {
        let target = event.target;
        match &event.kind {
            EventKind::Click => {
                let href = self
                    .document
                    .closest(target, &self.link)
                    .and_then(|a| self.document.attr(a, "href"))
                    .map(str::to_string);
                if let Some(href) = href.filter(|h| h.len() > 1 && h.starts_with('#')) {
                    if let Some(dest) = self.document.get_element_by_id(&href[1..]) {
                        self.perform_scroll(dest, ScrollBehavior::Instant);
                    }
                }
            }
            EventKind::KeyDown { key, shift } => match key {
                Key::Tab => self.move_focus(!shift),
                Key::Enter if self.activates_on_enter(target) => {
                    self.dispatch(Event::click(target));
                }
                Key::Space if self.document.tag(target) == Some("button") => {
                    self.dispatch(Event::click(target));
                }
                _ => {}
            },
        }
    }

    fn activates_on_enter(&self, node: NodeId) -> bool {
        match self.document.tag(node) {
            Some("button") => true,
            Some("a") => self.document.has_attr(node, "href"),
            _ => false,
        }
    }

    /// Sequential focus navigation over rendered, tabbable elements
    fn move_focus(&mut self, forward: bool) {
        let order = self.document.tab_order();
        if order.is_empty() {
            return;
        }
        let current = self
            .document
            .focused()
            .and_then(|f| order.iter().position(|n| *n == f));
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % order.len(),
            (Some(i), false) => (i + order.len() - 1) % order.len(),
            (None, true) => 0,
            (None, false) => order.len() - 1,
        };
        self.document.focus(order[next]);
    }

    // --- time ---

    /// Run the tasks queued for the next animation frame
    pub fn next_frame(&mut self) {
        for task in self.scheduler.take_frame() {
            self.run_task(task);
        }
    }

    /// Let `ms` of virtual time pass. Pending frames run first, then timers
    /// in due order; tasks queued meanwhile run if they fall in the window.
    pub fn advance(&mut self, ms: u64) {
        let until = self.scheduler.now_ms() + ms;
        loop {
            if self.scheduler.has_frame() {
                self.next_frame();
                continue;
            }
            match self.scheduler.pop_due(until) {
                Some(task) => self.run_task(task),
                None => break,
            }
        }
        self.scheduler.set_now(until);
    }

    /// Advance frame by frame until no work is pending
    pub fn settle(&mut self) {
        for _ in 0..SETTLE_FRAME_LIMIT {
            if self.scheduler.is_idle() {
                return;
            }
            self.advance(FRAME_MS);
        }
        log::warn!("page did not settle after {} frames", SETTLE_FRAME_LIMIT);
    }

    fn run_task(&mut self, task: Task) {
        match task {
            Task::Focus(node) => {
                self.document.focus(node);
            }
            Task::ScrollIntoView { target, behavior } => self.perform_scroll(target, behavior),
            Task::AddClass { node, class } => self.document.add_class(node, &class),
        }
    }

    // --- scrolling and viewport ---

    fn perform_scroll(&mut self, target: NodeId, behavior: ScrollBehavior) {
        self.scroll_into_view(target);
        self.scroll_log.push(ScrollRecord {
            target,
            behavior,
            at_ms: self.scheduler.now_ms(),
        });
    }

    pub fn scroll_to(&mut self, y: i32) {
        let layout = self.layout();
        let max = layout.document_height() as i32 - self.config.viewport.height as i32;
        self.scroll_y = y.clamp(0, max.max(0));
        self.deliver_intersections(&layout);
    }

    /// Align the top of `node` with the top of the viewport (as far as the
    /// document height allows)
    pub fn scroll_into_view(&mut self, node: NodeId) {
        if let Some(rect) = self.layout().rect(node).copied() {
            self.scroll_to(rect.y);
        }
    }

    /// Scroll only when `node` is outside the viewport. Content of
    /// overlays is fixed to the viewport and never scrolls.
    pub fn scroll_into_view_if_needed(&mut self, node: NodeId) {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.document.is_overlay(n) {
                return;
            }
            current = self.document.parent(n);
        }
        let layout = self.layout();
        let Some(rect) = layout.rect(node) else {
            return;
        };
        let top = self.scroll_y;
        let bottom = top + self.config.viewport.height as i32;
        if rect.y < top || rect.bottom() > bottom {
            self.scroll_to(rect.y);
        }
    }

    /// Switch to another device preset and re-run intersection
    pub fn emulate(&mut self, device: &DeviceMetrics) {
        self.config.viewport = device.viewport();
        self.scroll_to(self.scroll_y);
    }

    fn update_intersections(&mut self) {
        let layout = self.layout();
        self.deliver_intersections(&layout);
    }

    fn deliver_intersections(&mut self, layout: &Layout) {
        let scroll_y = self.scroll_y;
        let height = self.config.viewport.height;
        let entries = self.reveal.take_records(|n| {
            layout
                .rect(n)
                .map(|r| intersection_ratio(r, scroll_y, height))
                .unwrap_or(0.0)
        });
        if !entries.is_empty() {
            self.reveal.on_intersection(&mut self.scheduler, &entries);
        }
    }

    // --- inspection ---

    pub fn accessibility_tree(&self) -> AccessibilityTree {
        let layout = self.layout();
        DocumentAccessibility::new(&self.document)
            .with_layout(&layout)
            .export_tree()
    }

    pub fn render_text_snapshot(&self) -> TextSnapshot {
        let text = self
            .document
            .body()
            .map(|b| self.document.text_content(b))
            .unwrap_or_default();
        TextSnapshot {
            title: self.document.title(),
            text: text.split_whitespace().collect::<Vec<_>>().join(" "),
            url: self.url.clone(),
        }
    }
}
