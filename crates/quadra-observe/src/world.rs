//! The observed world: one logical database instance.
//!
//! Owns the quad store, the observation registry, the coalescing state
//! and the class-extension view registry. Every mutation goes through the
//! intercepting methods here: the store mutates first, and only a
//! successful mutation triggers delivery.
//!
//! ## Delivery rules
//!
//! ```text
//! mutation (c, s, p, o)
//!   ├─ s observed            → deliver Predicate(p) to s
//!   ├─ s blank, unobserved   → annotation-axiom fallback:
//!   │      (source, prop, target)  exact statement key
//!   │      (source, prop, ─)       predicate granularity
//!   │      (source, ─, ─)          subject granularity, receives prop
//!   ├─ o observed, p has inverse → deliver Predicate(inverse) to o
//!   └─ p = rdf:type          → invalidate class-extension views
//! ```
//!
//! Listener invocation is synchronous and re-entrant safe: no interior
//! borrow is held while a listener runs, so listeners may mutate the
//! world, attach or detach freely.

use crate::coalesce::{CoalesceGuard, CoalesceState};
use crate::error::ObserveError;
use crate::key::{Change, ObserveKey, StatementKey, StatementSubject};
use crate::registry::{ListenerId, ObservationMap};
use crate::view::InstancesOfClass;
use quadra_store::{Datatype, Literal, PropertyKind, QuadStore, StorId, is_blank, vocab};
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

/// One logical database instance with observation semantics.
pub struct World {
    store: RefCell<QuadStore>,
    observations: RefCell<ObservationMap>,
    coalesce: CoalesceState,
    views: RefCell<BTreeMap<StorId, Vec<Weak<InstancesOfClass>>>>,
    active_context: Cell<Option<StorId>>,
    view_tokens: Cell<u64>,
}

impl World {
    pub fn new() -> Rc<Self> {
        Self::with_store(QuadStore::new())
    }

    pub fn with_store(store: QuadStore) -> Rc<Self> {
        Rc::new(Self {
            store: RefCell::new(store),
            observations: RefCell::new(ObservationMap::new()),
            coalesce: CoalesceState::new(),
            views: RefCell::new(BTreeMap::new()),
            active_context: Cell::new(None),
            view_tokens: Cell::new(0),
        })
    }

    // ── Store access ──

    /// Read access to the underlying store.
    pub fn store(&self) -> Ref<'_, QuadStore> {
        self.store.borrow()
    }

    /// Raw write access. Mutations made through this handle bypass
    /// delivery entirely; use the world's mutation methods instead unless
    /// that is exactly what is wanted.
    pub fn store_mut(&self) -> RefMut<'_, QuadStore> {
        self.store.borrow_mut()
    }

    pub fn new_entity(&self) -> StorId {
        self.store.borrow_mut().new_entity()
    }

    pub fn new_blank_node(&self) -> StorId {
        self.store.borrow_mut().new_blank_node()
    }

    pub fn new_context(&self) -> StorId {
        self.store.borrow_mut().new_context()
    }

    pub fn declare_object_property(&self, name: &str) -> Result<StorId, ObserveError> {
        Ok(self.store.borrow_mut().declare_object_property(name)?)
    }

    pub fn declare_data_property(&self, name: &str) -> Result<StorId, ObserveError> {
        Ok(self.store.borrow_mut().declare_data_property(name)?)
    }

    pub fn declare_annotation_property(&self, name: &str) -> Result<StorId, ObserveError> {
        Ok(self.store.borrow_mut().declare_annotation_property(name)?)
    }

    pub fn link_inverse(&self, a: StorId, b: StorId) -> Result<(), ObserveError> {
        Ok(self.store.borrow_mut().link_inverse(a, b)?)
    }

    pub fn commit(&self) {
        self.store.borrow_mut().commit();
    }

    /// Declared annotation property by name.
    pub fn annotation_property(&self, name: &str) -> Result<StorId, ObserveError> {
        let store = self.store.borrow();
        match store.props().by_name(name) {
            Some(info) if info.kind == PropertyKind::Annotation => Ok(info.storid),
            _ => Err(ObserveError::UnknownAttribute(name.to_string())),
        }
    }

    // ── Active provenance context ──

    pub fn active_context(&self) -> Option<StorId> {
        self.active_context.get()
    }

    /// Make `context` the active provenance context until the guard drops.
    #[must_use = "the context is only active while the guard is alive"]
    pub fn use_context(&self, context: StorId) -> ContextGuard<'_> {
        let previous = self.active_context.replace(Some(context));
        ContextGuard {
            world: self,
            previous,
        }
    }

    // ── Observation surface ──

    /// Attach a listener to `key`, creating the Observation on first use.
    pub fn observe<F>(&self, key: ObserveKey, listener: F) -> ListenerId
    where
        F: Fn(&ObserveKey, &[Change]) + 'static,
    {
        self.observations
            .borrow_mut()
            .add_listener(key, Rc::new(listener))
    }

    /// Detach one listener, or every listener of the key when `listener`
    /// is `None`. Absent keys and ids are a no-op returning false.
    pub fn unobserve(&self, key: &ObserveKey, listener: Option<ListenerId>) -> bool {
        self.observations.borrow_mut().remove_listener(key, listener)
    }

    pub fn is_observed(&self, key: &ObserveKey, listener: Option<ListenerId>) -> bool {
        self.observations.borrow().is_observed(key, listener)
    }

    /// Manual notification for values whose changes were not expressed as
    /// store mutations. Respects coalescing.
    pub fn emit(&self, key: &ObserveKey, changes: &[Change]) {
        self.deliver(key, changes);
    }

    // ── Coalescing ──

    /// Open a coalescing scope. Nested scopes are counted; the flush
    /// happens when the outermost guard drops.
    #[must_use = "the scope ends (and flushes) when the guard drops"]
    pub fn coalesced(&self) -> CoalesceGuard<'_> {
        CoalesceGuard::new(self)
    }

    pub fn add_completion_listener<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + 'static,
    {
        self.coalesce.add_completion(Rc::new(listener))
    }

    pub fn remove_completion_listener(&self, id: ListenerId) -> bool {
        self.coalesce.remove_completion(id)
    }

    pub(crate) fn enter_coalesced(&self) {
        self.coalesce.enter();
    }

    pub(crate) fn exit_coalesced(&self) {
        if self.coalesce.exit() {
            self.flush();
        }
    }

    fn flush(&self) {
        for key in self.coalesce.take_pending() {
            let Some((listeners, changes)) = self.observations.borrow_mut().prepare_flush(&key)
            else {
                continue;
            };
            if changes.is_empty() {
                continue;
            }
            for listener in listeners {
                listener(&key, &changes);
            }
        }
        for listener in self.coalesce.completion_snapshot() {
            listener();
        }
    }

    /// Deliver now, or buffer into the key's Observation while a
    /// coalescing scope is active. Keys without an Observation are
    /// skipped either way.
    pub(crate) fn deliver(&self, key: &ObserveKey, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        if self.coalesce.active() {
            if self.observations.borrow_mut().accumulate(key, changes) {
                self.coalesce.mark_pending(key.clone());
            }
        } else {
            let Some(listeners) = self.observations.borrow().snapshot(key) else {
                return;
            };
            for listener in listeners {
                listener(key, changes);
            }
        }
    }

    fn has_observation(&self, key: &ObserveKey) -> bool {
        self.observations.borrow().has(key)
    }

    // ── Intercepted mutation surface ──

    pub fn add_obj(
        &self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: StorId,
    ) -> Result<(), ObserveError> {
        self.store.borrow_mut().add_obj(c, s, p, o)?;
        self.after_obj_mutation(c, s, p, o);
        Ok(())
    }

    /// Replace every `(s, p, *)` object quad with the single new one.
    pub fn set_obj(
        &self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: StorId,
    ) -> Result<(), ObserveError> {
        self.store.borrow_mut().set_obj(c, s, p, o)?;
        self.after_obj_mutation(c, s, p, o);
        Ok(())
    }

    pub fn add_data(
        &self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: Literal,
        d: Datatype,
    ) -> Result<(), ObserveError> {
        self.store.borrow_mut().add_data(c, s, p, o, d)?;
        self.after_data_mutation(s, p);
        Ok(())
    }

    /// Replace every `(s, p, *)` data quad with the single new one.
    pub fn set_data(
        &self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: Literal,
        d: Datatype,
    ) -> Result<(), ObserveError> {
        self.store.borrow_mut().set_data(c, s, p, o, d)?;
        self.after_data_mutation(s, p);
        Ok(())
    }

    /// Delete object quads; `None` components are wildcards. Affected
    /// `(subject, predicate)` pairs are enumerated from the pre-deletion
    /// state and delivered after the deletion succeeds.
    pub fn del_obj(
        &self,
        c: Option<StorId>,
        s: Option<StorId>,
        p: Option<StorId>,
        o: Option<StorId>,
    ) -> Result<usize, ObserveError> {
        let plan = {
            let store = self.store.borrow();
            match (s, p) {
                (Some(subject), Some(predicate)) => DeletePlan::Subject {
                    subject,
                    predicates: vec![predicate],
                },
                (Some(subject), None) => DeletePlan::Subject {
                    subject,
                    predicates: store.obj_predicates_of_subject(subject),
                },
                (None, Some(predicate)) => DeletePlan::Pairs(
                    store
                        .obj_subjects_with_predicate(predicate, o)
                        .into_iter()
                        .map(|subject| (subject, predicate))
                        .collect(),
                ),
                (None, None) => DeletePlan::Pairs(store.obj_subject_predicate_pairs(o)),
            }
        };
        let removed = self.store.borrow_mut().del_obj(c, s, p, o)?;
        self.deliver_delete_plan(plan);
        if let (Some(predicate), Some(object)) = (p, o)
            && predicate == vocab::RDF_TYPE
        {
            self.invalidate_views_for_class(object, None);
        }
        Ok(removed)
    }

    /// Delete data quads; `None` components are wildcards. Same
    /// pre-deletion enumeration discipline as [`del_obj`](Self::del_obj).
    pub fn del_data(
        &self,
        c: Option<StorId>,
        s: Option<StorId>,
        p: Option<StorId>,
        o: Option<&Literal>,
        d: Option<&Datatype>,
    ) -> Result<usize, ObserveError> {
        let plan = {
            let store = self.store.borrow();
            match (s, p) {
                (Some(subject), Some(predicate)) => DeletePlan::Subject {
                    subject,
                    predicates: vec![predicate],
                },
                (Some(subject), None) => DeletePlan::Subject {
                    subject,
                    predicates: store.data_predicates_of_subject(subject),
                },
                (None, Some(predicate)) => DeletePlan::Pairs(
                    store
                        .data_subjects_with_predicate(predicate, o, d)
                        .into_iter()
                        .map(|subject| (subject, predicate))
                        .collect(),
                ),
                (None, None) => DeletePlan::Pairs(store.data_subject_predicate_pairs(o, d)),
            }
        };
        let removed = self.store.borrow_mut().del_data(c, s, p, o, d)?;
        self.deliver_delete_plan(plan);
        Ok(removed)
    }

    fn deliver_delete_plan(&self, plan: DeletePlan) {
        match plan {
            DeletePlan::Subject {
                subject,
                predicates,
            } => {
                if predicates.is_empty() {
                    return;
                }
                if self.has_observation(&ObserveKey::Entity(subject)) {
                    let changes: Vec<Change> =
                        predicates.into_iter().map(Change::Predicate).collect();
                    self.deliver(&ObserveKey::Entity(subject), &changes);
                } else if is_blank(subject) {
                    for predicate in predicates {
                        self.check_annotation_axiom(subject, predicate);
                    }
                }
            }
            DeletePlan::Pairs(pairs) => {
                for (subject, predicate) in pairs {
                    if self.has_observation(&ObserveKey::Entity(subject)) {
                        self.deliver(
                            &ObserveKey::Entity(subject),
                            &[Change::Predicate(predicate)],
                        );
                    }
                }
            }
        }
    }

    fn after_obj_mutation(&self, c: StorId, s: StorId, p: StorId, o: StorId) {
        if self.has_observation(&ObserveKey::Entity(s)) {
            self.deliver(&ObserveKey::Entity(s), &[Change::Predicate(p)]);
        } else if is_blank(s) {
            self.check_annotation_axiom(s, p);
        }

        let inverse = self.store.borrow().props().inverse_of(p);
        if let Some(inverse) = inverse
            && self.has_observation(&ObserveKey::Entity(o))
        {
            self.deliver(&ObserveKey::Entity(o), &[Change::Predicate(inverse)]);
        }

        if p == vocab::RDF_TYPE {
            self.invalidate_views_for_class(o, Some(c));
        }
    }

    fn after_data_mutation(&self, s: StorId, p: StorId) {
        if self.has_observation(&ObserveKey::Entity(s)) {
            self.deliver(&ObserveKey::Entity(s), &[Change::Predicate(p)]);
        } else if is_blank(s) {
            self.check_annotation_axiom(s, p);
        }
    }

    /// Fallback delivery for mutations on an unobserved blank node: if
    /// the node reifies a statement, deliver to that statement's keys,
    /// finest granularity first. The subject-only key receives the
    /// annotated property, not the mutated predicate.
    fn check_annotation_axiom(&self, node: StorId, p: StorId) {
        let resolved = {
            let store = self.store.borrow();
            if store.props().is_annotation_property(p) {
                resolve_axiom_statement(&store, node)
            } else {
                None
            }
        };
        let Some(statement) = resolved else {
            return;
        };
        self.deliver(
            &ObserveKey::Statement(statement.clone()),
            &[Change::Predicate(p)],
        );
        self.deliver(
            &ObserveKey::Statement(statement.without_target()),
            &[Change::Predicate(p)],
        );
        if let Some(annotated) = statement.predicate {
            self.deliver(
                &ObserveKey::Statement(statement.subject_only()),
                &[Change::Predicate(annotated)],
            );
        }
    }

    // ── Entity destruction ──

    /// Destroy an individual: delete every quad it subjects and every
    /// object quad referencing it, then invalidate class-extension views
    /// over its former classes. The surrounding ontology layer is
    /// responsible for any deeper cascade.
    pub fn destroy_entity(&self, id: StorId) -> Result<usize, ObserveError> {
        let ancestors: BTreeSet<StorId> = {
            let store = self.store.borrow();
            store
                .objs_sp(id, vocab::RDF_TYPE)
                .into_iter()
                .flat_map(|class| store.ancestor_classes(class))
                .collect()
        };
        let mut removed = self.del_obj(None, Some(id), None, None)?;
        removed += self.del_data(None, Some(id), None, None, None)?;
        removed += self.del_obj(None, None, None, Some(id))?;
        self.signal_views(&ancestors, None);
        Ok(removed)
    }

    // ── Class-extension view registry ──

    pub(crate) fn register_view(&self, class: StorId, view: Weak<InstancesOfClass>) {
        self.views.borrow_mut().entry(class).or_default().push(view);
    }

    pub(crate) fn unregister_view(&self, class: StorId) {
        let mut views = self.views.borrow_mut();
        if let Some(slot) = views.get_mut(&class) {
            slot.retain(|weak| weak.upgrade().is_some());
            if slot.is_empty() {
                views.remove(&class);
            }
        }
    }

    pub(crate) fn next_view_token(&self) -> u64 {
        self.view_tokens.set(self.view_tokens.get() + 1);
        self.view_tokens.get()
    }

    fn invalidate_views_for_class(&self, class: StorId, context: Option<StorId>) {
        if self.views.borrow().is_empty() {
            return;
        }
        let ancestors = self.store.borrow().ancestor_classes(class);
        self.signal_views(&ancestors, context);
    }

    /// Invalidation is an unordered, idempotent set operation over the
    /// views registered for any of the given classes.
    fn signal_views(&self, classes: &BTreeSet<StorId>, context: Option<StorId>) {
        let mut live: Vec<Rc<InstancesOfClass>> = Vec::new();
        {
            let mut views = self.views.borrow_mut();
            for class in classes {
                if let Some(slot) = views.get_mut(class) {
                    slot.retain(|weak| match weak.upgrade() {
                        Some(view) => {
                            live.push(view);
                            true
                        }
                        None => false,
                    });
                }
            }
            views.retain(|_, slot| !slot.is_empty());
        }
        for view in live {
            view.changed(self, context);
        }
    }
}

enum DeletePlan {
    Subject {
        subject: StorId,
        predicates: Vec<StorId>,
    },
    Pairs(Vec<(StorId, StorId)>),
}

/// Resolve the statement a reification node stands for, recursing while
/// the annotated source is itself a blank node. `None` when the node
/// carries no (or an unresolvable) `annotatedSource`.
fn resolve_axiom_statement(store: &QuadStore, node: StorId) -> Option<StatementKey> {
    let source = store.obj_sp_o(node, vocab::OWL_ANNOTATED_SOURCE)?;
    let subject = if is_blank(source) {
        StatementSubject::Nested(Box::new(resolve_axiom_statement(store, source)?))
    } else {
        StatementSubject::Entity(source)
    };
    Some(StatementKey {
        subject,
        predicate: store.obj_sp_o(node, vocab::OWL_ANNOTATED_PROPERTY),
        target: store.triple_sp_od(node, vocab::OWL_ANNOTATED_TARGET),
    })
}

/// Restores the previously active context on drop.
pub struct ContextGuard<'a> {
    world: &'a World,
    previous: Option<StorId>,
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.world.active_context.set(self.previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadra_store::DEFAULT_CONTEXT;
    use std::cell::RefCell as StdRefCell;

    type Log = Rc<StdRefCell<Vec<(ObserveKey, Vec<Change>)>>>;

    fn recording_listener(log: &Log) -> impl Fn(&ObserveKey, &[Change]) + 'static {
        let log = log.clone();
        move |key, changes| log.borrow_mut().push((key.clone(), changes.to_vec()))
    }

    #[test]
    fn subject_listener_receives_the_predicate() {
        let world = World::new();
        let s = world.new_entity();
        let p = world.declare_object_property("partOf").expect("declare");
        let o = world.new_entity();

        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(s), recording_listener(&log));
        world.add_obj(DEFAULT_CONTEXT, s, p, o).expect("add");

        assert_eq!(
            log.borrow().as_slice(),
            &[(ObserveKey::entity(s), vec![Change::Predicate(p)])]
        );
    }

    #[test]
    fn object_listener_receives_the_declared_inverse() {
        let world = World::new();
        let part_of = world.declare_object_property("partOf").expect("declare");
        let has_part = world.declare_object_property("hasPart").expect("declare");
        world.link_inverse(part_of, has_part).expect("link");
        let s = world.new_entity();
        let o = world.new_entity();

        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(o), recording_listener(&log));
        world.add_obj(DEFAULT_CONTEXT, s, part_of, o).expect("add");

        assert_eq!(
            log.borrow().as_slice(),
            &[(ObserveKey::entity(o), vec![Change::Predicate(has_part)])]
        );
    }

    #[test]
    fn no_inverse_means_no_object_side_delivery() {
        let world = World::new();
        let p = world.declare_object_property("partOf").expect("declare");
        let s = world.new_entity();
        let o = world.new_entity();

        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(o), recording_listener(&log));
        world.add_obj(DEFAULT_CONTEXT, s, p, o).expect("add");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn coalescing_unions_changes_and_invokes_once() {
        let world = World::new();
        let s = world.new_entity();
        let p1 = world.declare_object_property("first").expect("declare");
        let p2 = world.declare_object_property("second").expect("declare");

        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(s), recording_listener(&log));
        {
            let _scope = world.coalesced();
            world.add_obj(DEFAULT_CONTEXT, s, p1, 500).expect("add");
            {
                let _inner = world.coalesced();
                world.add_obj(DEFAULT_CONTEXT, s, p2, 501).expect("add");
            }
            assert!(log.borrow().is_empty());
        }

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log[0].1,
            vec![Change::Predicate(p1), Change::Predicate(p2)]
        );
    }

    #[test]
    fn empty_coalescing_scope_invokes_nothing() {
        let world = World::new();
        let s = world.new_entity();
        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(s), recording_listener(&log));

        let completed = Rc::new(Cell::new(0u32));
        {
            let completed = completed.clone();
            world.add_completion_listener(move || completed.set(completed.get() + 1));
        }
        {
            let _scope = world.coalesced();
        }
        assert!(log.borrow().is_empty());
        assert_eq!(completed.get(), 1);
    }

    #[test]
    fn early_exit_from_a_scope_still_flushes_once() {
        let world = World::new();
        let s = world.new_entity();
        let p = world.declare_object_property("partOf").expect("declare");
        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(s), recording_listener(&log));

        let run = |world: &Rc<World>| -> Result<(), ObserveError> {
            let _scope = world.coalesced();
            world.add_obj(DEFAULT_CONTEXT, s, p, 500)?;
            world.add_obj(DEFAULT_CONTEXT, s, 0, 0)?; // fails, returns early
            Ok(())
        };
        assert!(run(&world).is_err());
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn listener_detaching_itself_does_not_skip_others() {
        let world = World::new();
        let s = world.new_entity();
        let p = world.declare_object_property("partOf").expect("declare");
        let key = ObserveKey::entity(s);

        let first_hits = Rc::new(Cell::new(0u32));
        let second_hits = Rc::new(Cell::new(0u32));
        let self_id: Rc<Cell<Option<ListenerId>>> = Rc::default();

        let id = {
            let world = Rc::downgrade(&world);
            let self_id = self_id.clone();
            let first_hits = first_hits.clone();
            let key = key.clone();
            move |_: &ObserveKey, _: &[Change]| {
                first_hits.set(first_hits.get() + 1);
                if let (Some(world), Some(id)) = (world.upgrade(), self_id.get()) {
                    world.unobserve(&key, Some(id));
                }
            }
        };
        let id = world.observe(key.clone(), id);
        self_id.set(Some(id));
        {
            let second_hits = second_hits.clone();
            world.observe(key.clone(), move |_, _| {
                second_hits.set(second_hits.get() + 1)
            });
        }

        world.add_obj(DEFAULT_CONTEXT, s, p, 500).expect("add");
        assert_eq!((first_hits.get(), second_hits.get()), (1, 1));

        world.add_obj(DEFAULT_CONTEXT, s, p, 501).expect("add");
        assert_eq!((first_hits.get(), second_hits.get()), (1, 2));
    }

    #[test]
    fn failed_mutation_delivers_nothing() {
        let world = World::new();
        let s = world.new_entity();
        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(s), recording_listener(&log));
        assert!(world.add_obj(0, s, 6, 11).is_err());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn wildcard_delete_enumerates_pre_deletion_state() {
        let world = World::new();
        let s = world.new_entity();
        let p1 = world.declare_object_property("first").expect("declare");
        let p2 = world.declare_object_property("second").expect("declare");
        world.add_obj(DEFAULT_CONTEXT, s, p1, 500).expect("add");
        world.add_obj(DEFAULT_CONTEXT, s, p2, 501).expect("add");

        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(s), recording_listener(&log));
        let removed = world.del_obj(None, Some(s), None, None).expect("delete");
        assert_eq!(removed, 2);

        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log[0].1,
            vec![Change::Predicate(p1), Change::Predicate(p2)]
        );
    }

    #[test]
    fn subjectless_delete_notifies_every_affected_subject() {
        let world = World::new();
        let p = world.declare_object_property("partOf").expect("declare");
        let a = world.new_entity();
        let b = world.new_entity();
        world.add_obj(DEFAULT_CONTEXT, a, p, 500).expect("add");
        world.add_obj(DEFAULT_CONTEXT, b, p, 500).expect("add");

        let log: Log = Rc::default();
        world.observe(ObserveKey::entity(a), recording_listener(&log));
        world.observe(ObserveKey::entity(b), recording_listener(&log));
        world.del_obj(None, None, Some(p), Some(500)).expect("delete");

        let log = log.borrow();
        assert_eq!(log.len(), 2);
        assert!(log.iter().any(|(key, _)| *key == ObserveKey::entity(a)));
        assert!(log.iter().any(|(key, _)| *key == ObserveKey::entity(b)));
    }

    #[test]
    fn emit_respects_coalescing() {
        let world = World::new();
        let key = ObserveKey::token("derived:total");
        let log: Log = Rc::default();
        world.observe(key.clone(), recording_listener(&log));

        {
            let _scope = world.coalesced();
            world.emit(&key, &[Change::Predicate(1)]);
            world.emit(&key, &[Change::Predicate(2)]);
            world.emit(&key, &[Change::Predicate(1)]);
            assert!(log.borrow().is_empty());
        }
        let log = log.borrow();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1, vec![Change::Predicate(1), Change::Predicate(2)]);
    }

    #[test]
    fn use_context_nests_and_restores() {
        let world = World::new();
        let ctx2 = world.new_context();
        let ctx3 = world.new_context();
        assert_eq!(world.active_context(), None);
        {
            let _outer = world.use_context(ctx2);
            assert_eq!(world.active_context(), Some(ctx2));
            {
                let _inner = world.use_context(ctx3);
                assert_eq!(world.active_context(), Some(ctx3));
            }
            assert_eq!(world.active_context(), Some(ctx2));
        }
        assert_eq!(world.active_context(), None);
    }
}
