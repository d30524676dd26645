//! Observation bookkeeping: listener lists keyed by observation key.
//!
//! An Observation owns an ordered listener list and, while a coalescing
//! scope is active, a pending change accumulator. An Observation with no
//! listeners is removed immediately; the registry never holds empty
//! entries.

use crate::key::{Change, ObserveKey};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Listener callback. Receives the key it was registered on and the
/// changed predicates (deduplicated and order-independent when coalesced).
pub type ListenerFn = dyn Fn(&ObserveKey, &[Change]);

/// Token identifying one attached listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(value: u64) -> Self {
        ListenerId(value)
    }
}

struct Observation {
    listeners: Vec<(ListenerId, Rc<ListenerFn>)>,
    pending: BTreeSet<Change>,
}

/// All observations of one world.
#[derive(Default)]
pub(crate) struct ObservationMap {
    map: BTreeMap<ObserveKey, Observation>,
    next_id: u64,
}

impl ObservationMap {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Attach a listener, creating the Observation on first use.
    pub(crate) fn add_listener(&mut self, key: ObserveKey, listener: Rc<ListenerFn>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.map
            .entry(key)
            .or_insert_with(|| Observation {
                listeners: Vec::new(),
                pending: BTreeSet::new(),
            })
            .listeners
            .push((id, listener));
        id
    }

    /// Detach one listener, or the whole Observation when `listener` is
    /// `None`. Removes the Observation once it has no listeners. Returns
    /// whether anything was detached.
    pub(crate) fn remove_listener(
        &mut self,
        key: &ObserveKey,
        listener: Option<ListenerId>,
    ) -> bool {
        let Some(observation) = self.map.get_mut(key) else {
            return false;
        };
        match listener {
            Some(id) => {
                let before = observation.listeners.len();
                observation.listeners.retain(|(other, _)| *other != id);
                let removed = observation.listeners.len() < before;
                if observation.listeners.is_empty() {
                    self.map.remove(key);
                }
                removed
            }
            None => {
                self.map.remove(key);
                true
            }
        }
    }

    pub(crate) fn is_observed(&self, key: &ObserveKey, listener: Option<ListenerId>) -> bool {
        match (self.map.get(key), listener) {
            (Some(observation), Some(id)) => {
                observation.listeners.iter().any(|(other, _)| *other == id)
            }
            (Some(observation), None) => !observation.listeners.is_empty(),
            (None, _) => false,
        }
    }

    pub(crate) fn has(&self, key: &ObserveKey) -> bool {
        self.map.contains_key(key)
    }

    /// Snapshot of the listener list, for copy-before-iterate delivery.
    pub(crate) fn snapshot(&self, key: &ObserveKey) -> Option<Vec<Rc<ListenerFn>>> {
        self.map
            .get(key)
            .map(|observation| observation.listeners.iter().map(|(_, l)| l.clone()).collect())
    }

    /// Merge changes into the key's pending accumulator. Returns false if
    /// the key has no Observation (nothing to buffer).
    pub(crate) fn accumulate(&mut self, key: &ObserveKey, changes: &[Change]) -> bool {
        let Some(observation) = self.map.get_mut(key) else {
            return false;
        };
        observation.pending.extend(changes.iter().cloned());
        true
    }

    /// Take the accumulated changes and a listener snapshot for flushing.
    /// Returns `None` when the Observation disappeared during the scope.
    pub(crate) fn prepare_flush(
        &mut self,
        key: &ObserveKey,
    ) -> Option<(Vec<Rc<ListenerFn>>, Vec<Change>)> {
        let observation = self.map.get_mut(key)?;
        let changes: Vec<Change> = std::mem::take(&mut observation.pending)
            .into_iter()
            .collect();
        let listeners = observation
            .listeners
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        Some((listeners, changes))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn noop() -> Rc<ListenerFn> {
        Rc::new(|_, _| {})
    }

    #[test]
    fn empty_observation_is_removed_with_last_listener() {
        let mut map = ObservationMap::new();
        let key = ObserveKey::entity(300);
        let a = map.add_listener(key.clone(), noop());
        let b = map.add_listener(key.clone(), noop());
        assert!(map.remove_listener(&key, Some(a)));
        assert!(map.has(&key));
        assert!(map.remove_listener(&key, Some(b)));
        assert!(!map.has(&key));
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn removing_from_absent_key_is_a_noop() {
        let mut map = ObservationMap::new();
        let key = ObserveKey::entity(300);
        assert!(!map.remove_listener(&key, None));
        let id = map.add_listener(ObserveKey::entity(301), noop());
        assert!(!map.remove_listener(&key, Some(id)));
    }

    #[test]
    fn accumulate_only_buffers_registered_keys() {
        let mut map = ObservationMap::new();
        let key = ObserveKey::entity(300);
        assert!(!map.accumulate(&key, &[Change::Predicate(7)]));
        map.add_listener(key.clone(), noop());
        assert!(map.accumulate(&key, &[Change::Predicate(7)]));
        assert!(map.accumulate(&key, &[Change::Predicate(8), Change::Predicate(7)]));
        let (listeners, changes) = map.prepare_flush(&key).expect("flush data");
        assert_eq!(listeners.len(), 1);
        assert_eq!(changes, vec![Change::Predicate(7), Change::Predicate(8)]);
        let (_, drained) = map.prepare_flush(&key).expect("second flush");
        assert!(drained.is_empty());
    }

    #[test]
    fn snapshot_is_stable_under_mutation() {
        let mut map = ObservationMap::new();
        let key = ObserveKey::entity(300);
        let hits = Rc::new(Cell::new(0u32));
        for _ in 0..2 {
            let hits = hits.clone();
            map.add_listener(key.clone(), Rc::new(move |_, _| hits.set(hits.get() + 1)));
        }
        let snapshot = map.snapshot(&key).expect("snapshot");
        map.remove_listener(&key, None);
        for listener in snapshot {
            listener(&key, &[Change::Predicate(1)]);
        }
        assert_eq!(hits.get(), 2);
    }
}
