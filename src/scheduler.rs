//! Deferred work for the page event loop.
//!
//! The controllers never block; anything that must happen "later" (focus on
//! the next frame, a scroll after the menu starts closing, staggered
//! fade-ins) is queued here as a [`Task`]. Time is virtual so a run is fully
//! deterministic: the owner advances the clock explicitly.

use crate::dom::NodeId;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ScrollBehavior {
    Instant,
    Smooth,
}

/// A unit of deferred work, executed by the page against its document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Focus(NodeId),
    ScrollIntoView {
        target: NodeId,
        behavior: ScrollBehavior,
    },
    AddClass {
        node: NodeId,
        class: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Timer {
    id: TimerId,
    due_ms: u64,
    task: Task,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    now_ms: u64,
    frames: VecDeque<Task>,
    timers: Vec<Timer>,
    next_id: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Queue `task` for the next animation frame
    pub fn request_animation_frame(&mut self, task: Task) {
        self.frames.push_back(task);
    }

    /// Queue `task` to run once `delay_ms` of virtual time has passed
    pub fn set_timeout(&mut self, delay_ms: u64, task: Task) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due_ms: self.now_ms + delay_ms,
            task,
        });
        id
    }

    pub fn clear_timeout(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }

    /// Take every task queued for the current frame. Tasks queued while
    /// these run belong to the following frame.
    pub fn take_frame(&mut self) -> Vec<Task> {
        self.frames.drain(..).collect()
    }

    pub fn has_frame(&self) -> bool {
        !self.frames.is_empty()
    }

    /// Pop the earliest timer due at or before `until_ms`, moving the clock
    /// to its due time. Timers due at the same time fire in creation order.
    pub fn pop_due(&mut self, until_ms: u64) -> Option<Task> {
        let (idx, _) = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= until_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.id.0))?;
        let timer = self.timers.remove(idx);
        self.now_ms = self.now_ms.max(timer.due_ms);
        Some(timer.task)
    }

    /// Move the clock forward without running anything
    pub fn set_now(&mut self, now_ms: u64) {
        self.now_ms = self.now_ms.max(now_ms);
    }

    pub fn is_idle(&self) -> bool {
        self.frames.is_empty() && self.timers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_focus() -> Task {
        Task::Focus(crate::dom::Document::parse("<p></p>").root())
    }

    #[test]
    fn timers_fire_in_due_then_creation_order() {
        let doc = crate::dom::Document::parse("<div id=a></div><div id=b></div>");
        let a = doc.get_element_by_id("a").unwrap();
        let b = doc.get_element_by_id("b").unwrap();
        let mut s = Scheduler::new();
        s.set_timeout(300, Task::Focus(a));
        s.set_timeout(150, Task::Focus(b));
        s.set_timeout(150, Task::Focus(a));

        assert_eq!(s.pop_due(100), None);
        assert_eq!(s.pop_due(500), Some(Task::Focus(b)));
        assert_eq!(s.now_ms(), 150);
        assert_eq!(s.pop_due(500), Some(Task::Focus(a)));
        assert_eq!(s.pop_due(500), Some(Task::Focus(a)));
        assert_eq!(s.now_ms(), 300);
        assert!(s.is_idle());
    }

    #[test]
    fn cleared_timer_never_fires() {
        let mut s = Scheduler::new();
        let id = s.set_timeout(10, root_focus());
        s.clear_timeout(id);
        assert_eq!(s.pop_due(u64::MAX), None);
    }

    #[test]
    fn frames_drain_once() {
        let mut s = Scheduler::new();
        s.request_animation_frame(root_focus());
        assert!(s.has_frame());
        assert_eq!(s.take_frame().len(), 1);
        assert!(s.take_frame().is_empty());
    }
}
