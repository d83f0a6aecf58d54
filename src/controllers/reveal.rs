//! Scroll-triggered fade-in of gallery artworks

use crate::dom::{Document, NodeId};
use crate::scheduler::{Scheduler, Task};
use crate::{DomContract, Result};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    pub target: NodeId,
    pub ratio: f64,
    pub is_intersecting: bool,
}

/// Observes artworks and adds the visible class to each one the first
/// time it scrolls into view. Entries of one batch are staggered by their
/// position in the batch.
#[derive(Debug)]
pub struct RevealObserver {
    observed: Vec<NodeId>,
    /// Last reported (crossed threshold, intersecting) per target
    last: HashMap<NodeId, (bool, bool)>,
    threshold: f64,
    stagger_ms: u64,
    visible_class: String,
}

impl RevealObserver {
    pub fn initialize(doc: &Document, contract: &DomContract, threshold: f64, stagger_ms: u64) -> Result<Self> {
        let observed = doc.query_all(&contract.artwork)?;
        log::debug!("reveal observing {} artwork(s)", observed.len());
        Ok(Self {
            observed,
            last: HashMap::new(),
            threshold,
            stagger_ms,
            visible_class: contract.visible_class.clone(),
        })
    }

    pub fn observed(&self) -> &[NodeId] {
        &self.observed
    }

    pub fn unobserve(&mut self, node: NodeId) {
        self.observed.retain(|n| *n != node);
        self.last.remove(&node);
    }

    /// Build the next batch of entries from the current ratios. The first
    /// batch reports every target; later ones only targets that crossed the
    /// threshold or started or stopped overlapping the viewport. Any
    /// overlap counts as intersecting, as with a browser observer.
    pub fn take_records(&mut self, ratio_of: impl Fn(NodeId) -> f64) -> Vec<IntersectionEntry> {
        let mut entries = Vec::new();
        for &target in &self.observed {
            let ratio = ratio_of(target);
            let is_intersecting = ratio > 0.0;
            let state = (is_intersecting && ratio >= self.threshold, is_intersecting);
            if self.last.insert(target, state) != Some(state) {
                entries.push(IntersectionEntry {
                    target,
                    ratio,
                    is_intersecting,
                });
            }
        }
        entries
    }

    /// Observer callback
    pub fn on_intersection(&mut self, scheduler: &mut Scheduler, entries: &[IntersectionEntry]) {
        for (index, entry) in entries.iter().enumerate() {
            if !entry.is_intersecting {
                continue;
            }
            scheduler.set_timeout(
                index as u64 * self.stagger_ms,
                Task::AddClass {
                    node: entry.target,
                    class: self.visible_class.clone(),
                },
            );
            self.unobserve(entry.target);
        }
    }
}
