//! Coalescing scopes: buffer deliveries per key, flush once.
//!
//! A re-entrant depth counter owned by the world. While the depth is
//! nonzero, deliveries accumulate into each key's Observation; the flush
//! happens when the outermost scope exits. The guard flushes from `Drop`,
//! so early returns and unwinding both flush exactly once.

use crate::key::ObserveKey;
use crate::registry::ListenerId;
use crate::world::World;
use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

pub(crate) struct CoalesceState {
    level: Cell<u32>,
    pending: RefCell<BTreeSet<ObserveKey>>,
    completion: RefCell<Vec<(ListenerId, Rc<dyn Fn()>)>>,
    next_id: Cell<u64>,
}

impl CoalesceState {
    pub(crate) fn new() -> Self {
        Self {
            level: Cell::new(0),
            pending: RefCell::new(BTreeSet::new()),
            completion: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }

    pub(crate) fn active(&self) -> bool {
        self.level.get() > 0
    }

    pub(crate) fn enter(&self) {
        self.level.set(self.level.get() + 1);
    }

    /// Decrement the depth; true when the outermost scope just exited.
    pub(crate) fn exit(&self) -> bool {
        let level = self.level.get();
        debug_assert!(level > 0, "coalesce exit without matching enter");
        self.level.set(level.saturating_sub(1));
        level == 1
    }

    pub(crate) fn mark_pending(&self, key: ObserveKey) {
        self.pending.borrow_mut().insert(key);
    }

    pub(crate) fn take_pending(&self) -> Vec<ObserveKey> {
        std::mem::take(&mut *self.pending.borrow_mut())
            .into_iter()
            .collect()
    }

    pub(crate) fn add_completion(&self, listener: Rc<dyn Fn()>) -> ListenerId {
        self.next_id.set(self.next_id.get() + 1);
        let id = ListenerId::new(self.next_id.get());
        self.completion.borrow_mut().push((id, listener));
        id
    }

    pub(crate) fn remove_completion(&self, id: ListenerId) -> bool {
        let mut completion = self.completion.borrow_mut();
        let before = completion.len();
        completion.retain(|(other, _)| *other != id);
        completion.len() < before
    }

    pub(crate) fn completion_snapshot(&self) -> Vec<Rc<dyn Fn()>> {
        self.completion
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect()
    }
}

/// RAII scope handle returned by [`World::coalesced`].
///
/// Dropping the guard exits the scope; the outermost drop flushes.
pub struct CoalesceGuard<'a> {
    world: &'a World,
}

impl<'a> CoalesceGuard<'a> {
    pub(crate) fn new(world: &'a World) -> Self {
        world.enter_coalesced();
        Self { world }
    }
}

impl Drop for CoalesceGuard<'_> {
    fn drop(&mut self) {
        self.world.exit_coalesced();
    }
}
