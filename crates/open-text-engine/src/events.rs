//! Listener bookkeeping and one-shot deferred work.
//!
//! The host owns the real event sources. [`Listeners`] records which of them
//! the engine currently wants to hear from, and every registration is tied to
//! a [`Subscription`] guard so a listener can never outlive the state that
//! asked for it.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerTarget {
    ContainerScroll,
    WindowResize,
    SelectionChange,
    DocumentPointerMove,
    DocumentPointerUp,
}

/// Shared registry of active listener registrations.
#[derive(Debug, Clone, Default)]
pub struct Listeners {
    counts: Rc<RefCell<BTreeMap<ListenerTarget, usize>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, target: ListenerTarget) -> Subscription {
        *self.counts.borrow_mut().entry(target).or_insert(0) += 1;
        log::trace!("listener registered on {target:?}");
        Subscription {
            target,
            counts: Rc::clone(&self.counts),
        }
    }

    pub fn count(&self, target: ListenerTarget) -> usize {
        self.counts.borrow().get(&target).copied().unwrap_or(0)
    }

    pub fn is_listening(&self, target: ListenerTarget) -> bool {
        self.count(target) > 0
    }

    pub fn total(&self) -> usize {
        self.counts.borrow().values().sum()
    }
}

/// Deregisters its listener when dropped.
#[derive(Debug)]
#[must_use = "dropping a Subscription deregisters the listener immediately"]
pub struct Subscription {
    target: ListenerTarget,
    counts: Rc<RefCell<BTreeMap<ListenerTarget, usize>>>,
}

impl Subscription {
    pub fn target(&self) -> ListenerTarget {
        self.target
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut counts = self.counts.borrow_mut();
        if let Some(count) = counts.get_mut(&self.target) {
            *count -= 1;
            if *count == 0 {
                counts.remove(&self.target);
            }
        }
        log::trace!("listener on {:?} released", self.target);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredTask {
    /// Recompute overlay geometry once layout has settled.
    RecomputeGeometry,
}

/// Work to run on the next paint. Tasks run once and are idempotent, so a
/// task already pending is not queued twice.
#[derive(Debug, Default)]
pub struct TaskQueue {
    pending: VecDeque<DeferredTask>,
}

impl TaskQueue {
    pub fn schedule(&mut self, task: DeferredTask) {
        if !self.pending.contains(&task) {
            self.pending.push_back(task);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = DeferredTask> + '_ {
        self.pending.drain(..)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_subscription_deregisters_on_drop() {
        let listeners = Listeners::new();
        let first = listeners.subscribe(ListenerTarget::DocumentPointerMove);
        let second = listeners.subscribe(ListenerTarget::DocumentPointerMove);
        assert_eq!(listeners.count(ListenerTarget::DocumentPointerMove), 2);

        drop(first);
        assert!(listeners.is_listening(ListenerTarget::DocumentPointerMove));
        drop(second);
        assert!(!listeners.is_listening(ListenerTarget::DocumentPointerMove));
        assert_eq!(listeners.total(), 0);
    }

    #[test]
    fn test_clones_share_registry() {
        let listeners = Listeners::new();
        let view = listeners.clone();
        let _scroll = listeners.subscribe(ListenerTarget::ContainerScroll);
        assert_eq!(view.count(ListenerTarget::ContainerScroll), 1);
    }

    #[test]
    fn test_duplicate_tasks_collapse() {
        let mut queue = TaskQueue::default();
        queue.schedule(DeferredTask::RecomputeGeometry);
        queue.schedule(DeferredTask::RecomputeGeometry);
        assert_eq!(queue.len(), 1);

        let ran: Vec<_> = queue.drain().collect();
        assert_eq!(ran, vec![DeferredTask::RecomputeGeometry]);
        assert!(queue.is_empty());
    }
}
