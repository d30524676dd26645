//! Annotated relations: blank-node reification behind a simple key.
//!
//! An `AnnotatedRelation` addresses a logical statement
//! `(subject, predicate, target)`; the subject may itself be an annotated
//! relation (annotations on annotations). Per provenance context the
//! relation owns at most one reifying blank node, created lazily on the
//! first annotation write together with its four baseline quads:
//!
//! ```text
//! node rdf:type              owl:Axiom
//! node owl:annotatedSource   subject
//! node owl:annotatedProperty predicate
//! node owl:annotatedTarget   target        (object- or literal-valued)
//! ```
//!
//! Removing the last annotation value prunes the node: once its quad
//! count drops back to the baseline it is deleted and forgotten.

use crate::error::ObserveError;
use crate::key::{ObserveKey, StatementKey, StatementSubject};
use crate::registry::ListenerId;
use crate::world::World;
use quadra_store::{DEFAULT_CONTEXT, REIFICATION_BASELINE, StorId, Target, vocab};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::{Rc, Weak};

/// Subject position of an annotated relation.
#[derive(Clone)]
pub enum RelationSubject {
    Entity(StorId),
    Nested(Rc<AnnotatedRelation>),
}

impl From<StorId> for RelationSubject {
    fn from(id: StorId) -> Self {
        RelationSubject::Entity(id)
    }
}

impl From<Rc<AnnotatedRelation>> for RelationSubject {
    fn from(relation: Rc<AnnotatedRelation>) -> Self {
        RelationSubject::Nested(relation)
    }
}

/// A logical statement addressable for annotation.
pub struct AnnotatedRelation {
    world: Weak<World>,
    subject: RelationSubject,
    predicate: StorId,
    target: Target,
    /// Entity standing in for the subject when writing reification quads:
    /// the subject itself, or the nested relation's reifying node.
    subject_storid: Option<StorId>,
    home_context: StorId,
    bnodes: RefCell<Vec<StorId>>,
    context_nodes: RefCell<BTreeMap<StorId, StorId>>,
    cache: RefCell<BTreeMap<StorId, Vec<Target>>>,
    cache_listener: Cell<Option<ListenerId>>,
}

impl AnnotatedRelation {
    /// Address a statement, discovering any reifying nodes it already has.
    pub fn new(
        world: &Rc<World>,
        subject: impl Into<RelationSubject>,
        predicate: StorId,
        target: impl Into<Target>,
    ) -> Rc<Self> {
        let subject = subject.into();
        let target = target.into();

        let (subject_storid, home_context) = {
            let store = world.store();
            match &subject {
                RelationSubject::Entity(id) => {
                    let statement_context = match &target {
                        Target::Entity(o) => store.obj_context(*id, predicate, *o),
                        Target::Literal { value, datatype } => {
                            store.data_context(*id, predicate, value, datatype)
                        }
                    };
                    let home = statement_context
                        .or(world.active_context())
                        .unwrap_or(DEFAULT_CONTEXT);
                    (Some(*id), home)
                }
                RelationSubject::Nested(nested) => {
                    // Prefer the nested node that actually carries this
                    // statement's quad; its context is the home context.
                    let mut chosen = None;
                    for node in nested.bnodes() {
                        let context = match &target {
                            Target::Entity(o) => store.obj_context(node, predicate, *o),
                            Target::Literal { value, datatype } => {
                                store.data_context(node, predicate, value, datatype)
                            }
                        };
                        if let Some(context) = context {
                            chosen = Some((node, context));
                            break;
                        }
                    }
                    match chosen {
                        Some((node, context)) => (Some(node), context),
                        None => (
                            nested.bnodes().first().copied(),
                            nested.home_context(),
                        ),
                    }
                }
            }
        };

        let relation = Rc::new(Self {
            world: Rc::downgrade(world),
            subject,
            predicate,
            target,
            subject_storid,
            home_context,
            bnodes: RefCell::new(Vec::new()),
            context_nodes: RefCell::new(BTreeMap::new()),
            cache: RefCell::new(BTreeMap::new()),
            cache_listener: Cell::new(None),
        });
        relation.discover_nodes(world);

        let weak = Rc::downgrade(&relation);
        let listener = world.observe(
            ObserveKey::Statement(relation.statement_key()),
            move |_, _| {
                if let Some(relation) = weak.upgrade() {
                    relation.cache.borrow_mut().clear();
                }
            },
        );
        relation.cache_listener.set(Some(listener));
        relation
    }

    fn discover_nodes(&self, world: &Rc<World>) {
        let Some(subject_storid) = self.subject_storid else {
            return;
        };
        let store = world.store();
        for node in
            store.obj_subjects_with_predicate(vocab::OWL_ANNOTATED_SOURCE, Some(subject_storid))
        {
            if !store.has_obj(node, vocab::OWL_ANNOTATED_PROPERTY, self.predicate) {
                continue;
            }
            let matches_target = match &self.target {
                Target::Entity(o) => store.has_obj(node, vocab::OWL_ANNOTATED_TARGET, *o),
                Target::Literal { value, datatype } => {
                    store.has_data(node, vocab::OWL_ANNOTATED_TARGET, value, datatype)
                }
            };
            if !matches_target {
                continue;
            }
            self.bnodes.borrow_mut().push(node);
            if let Some(context) =
                store.obj_context(node, vocab::OWL_ANNOTATED_SOURCE, subject_storid)
            {
                self.context_nodes.borrow_mut().insert(context, node);
            }
        }
    }

    // ── Identity ──

    pub fn predicate(&self) -> StorId {
        self.predicate
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn home_context(&self) -> StorId {
        self.home_context
    }

    /// Reifying nodes currently known for this relation.
    pub fn bnodes(&self) -> Vec<StorId> {
        self.bnodes.borrow().clone()
    }

    pub fn node_in_context(&self, context: StorId) -> Option<StorId> {
        self.context_nodes.borrow().get(&context).copied()
    }

    /// The statement key this relation is observed under. Nested subjects
    /// resolve structurally, matching the interceptor's axiom fallback.
    pub fn statement_key(&self) -> StatementKey {
        let subject = match &self.subject {
            RelationSubject::Entity(id) => StatementSubject::Entity(*id),
            RelationSubject::Nested(nested) => {
                StatementSubject::Nested(Box::new(nested.statement_key()))
            }
        };
        StatementKey::new(subject, Some(self.predicate), Some(self.target.clone()))
    }

    fn world(&self) -> Result<Rc<World>, ObserveError> {
        self.world.upgrade().ok_or(ObserveError::WorldDropped)
    }

    // ── Reification nodes ──

    /// The reifying node for `context`, creating it (and its baseline
    /// quads) on first use. Fails with `InvalidRelation` before writing
    /// anything when the subject or predicate does not resolve.
    pub fn node_for_context(&self, context: StorId) -> Result<StorId, ObserveError> {
        let world = self.world()?;
        let existing = self.context_nodes.borrow().get(&context).copied();
        if let Some(node) = existing {
            let intact = world
                .store()
                .has_obj(node, vocab::RDF_TYPE, vocab::OWL_AXIOM);
            if !intact {
                // Pruned elsewhere; reify again under the same identifier.
                self.write_baseline(&world, context, node)?;
                let known = self.bnodes.borrow().contains(&node);
                if !known {
                    self.bnodes.borrow_mut().push(node);
                }
            }
            return Ok(node);
        }

        self.validate(&world)?;
        let node = world.new_blank_node();
        self.write_baseline(&world, context, node)?;
        self.bnodes.borrow_mut().push(node);
        self.context_nodes.borrow_mut().insert(context, node);
        Ok(node)
    }

    fn validate(&self, world: &World) -> Result<(), ObserveError> {
        let Some(subject_storid) = self.subject_storid else {
            return Err(ObserveError::InvalidRelation(
                "nested subject has no reification node".to_string(),
            ));
        };
        let store = world.store();
        if !store.entity_exists(subject_storid) {
            return Err(ObserveError::InvalidRelation(format!(
                "unknown subject entity {subject_storid}"
            )));
        }
        if store.props().get(self.predicate).is_none() {
            return Err(ObserveError::InvalidRelation(format!(
                "undeclared predicate {}",
                self.predicate
            )));
        }
        Ok(())
    }

    fn write_baseline(
        &self,
        world: &World,
        context: StorId,
        node: StorId,
    ) -> Result<(), ObserveError> {
        let subject_storid = self.subject_storid.ok_or_else(|| {
            ObserveError::InvalidRelation("nested subject has no reification node".to_string())
        })?;
        world.add_obj(context, node, vocab::RDF_TYPE, vocab::OWL_AXIOM)?;
        world.add_obj(context, node, vocab::OWL_ANNOTATED_SOURCE, subject_storid)?;
        world.add_obj(context, node, vocab::OWL_ANNOTATED_PROPERTY, self.predicate)?;
        match &self.target {
            Target::Entity(o) => {
                world.add_obj(context, node, vocab::OWL_ANNOTATED_TARGET, *o)?;
            }
            Target::Literal { value, datatype } => {
                world.add_data(
                    context,
                    node,
                    vocab::OWL_ANNOTATED_TARGET,
                    value.clone(),
                    datatype.clone(),
                )?;
            }
        }
        Ok(())
    }

    /// Delete all of a node's quads and forget it. Safe to call again for
    /// a node already pruned elsewhere.
    pub fn remove_node(&self, node: StorId) -> Result<(), ObserveError> {
        let world = self.world()?;
        world.del_obj(None, Some(node), None, None)?;
        world.del_data(None, Some(node), None, None, None)?;
        self.bnodes.borrow_mut().retain(|other| *other != node);
        self.context_nodes
            .borrow_mut()
            .retain(|_, other| *other != node);
        Ok(())
    }

    // ── Annotation values ──

    fn require_annotation_property(
        &self,
        world: &World,
        property: StorId,
    ) -> Result<(), ObserveError> {
        let declared = world.store().props().is_annotation_property(property);
        if declared {
            Ok(())
        } else {
            Err(ObserveError::UnknownAttribute(property.to_string()))
        }
    }

    /// Attach one annotation value, reifying in the active provenance
    /// context (or the relation's home context when none is active).
    pub fn add_value(
        &self,
        property: StorId,
        value: impl Into<Target>,
    ) -> Result<(), ObserveError> {
        let world = self.world()?;
        self.require_annotation_property(&world, property)?;
        let context = world.active_context().unwrap_or(self.home_context);
        let node = self.node_for_context(context)?;
        match value.into() {
            Target::Entity(o) => world.add_obj(context, node, property, o)?,
            Target::Literal { value, datatype } => {
                world.add_data(context, node, property, value, datatype)?
            }
        }
        self.cache.borrow_mut().clear();
        Ok(())
    }

    /// Remove one annotation value from every node holding it, pruning
    /// nodes that drop back to the reification baseline. Returns whether
    /// anything was removed.
    pub fn remove_value(
        &self,
        property: StorId,
        value: impl Into<Target>,
    ) -> Result<bool, ObserveError> {
        let world = self.world()?;
        self.require_annotation_property(&world, property)?;
        let value = value.into();
        let nodes = self.bnodes();
        let mut removed = false;
        for node in nodes {
            let present = match &value {
                Target::Entity(o) => world.store().has_obj(node, property, *o),
                Target::Literal { value, datatype } => {
                    world.store().has_data(node, property, value, datatype)
                }
            };
            if !present {
                continue;
            }
            match &value {
                Target::Entity(o) => {
                    world.del_obj(None, Some(node), Some(property), Some(*o))?;
                }
                Target::Literal { value, datatype } => {
                    world.del_data(None, Some(node), Some(property), Some(value), Some(datatype))?;
                }
            }
            removed = true;
            let remaining = world.store().quad_count_of_subject(node);
            if remaining <= REIFICATION_BASELINE {
                self.remove_node(node)?;
            }
        }
        self.cache.borrow_mut().clear();
        Ok(removed)
    }

    /// Replace the value set for `property`: missing values are added,
    /// surplus values removed.
    pub fn set_values(
        &self,
        property: StorId,
        values: Vec<Target>,
    ) -> Result<(), ObserveError> {
        let current: BTreeSet<Target> = self.values(property)?.into_iter().collect();
        let wanted: BTreeSet<Target> = values.into_iter().collect();
        for added in wanted.difference(&current) {
            self.add_value(property, added.clone())?;
        }
        for removed in current.difference(&wanted) {
            self.remove_value(property, removed.clone())?;
        }
        Ok(())
    }

    /// Union, across the relation's nodes, of the values attached via
    /// `property`. Materialized lazily and cached; the cache is cleared
    /// through the ordinary delivery mechanism.
    pub fn values(&self, property: StorId) -> Result<Vec<Target>, ObserveError> {
        let world = self.world()?;
        self.require_annotation_property(&world, property)?;
        let cached = self.cache.borrow().get(&property).cloned();
        if let Some(values) = cached {
            return Ok(values);
        }
        let mut out = Vec::new();
        {
            let store = world.store();
            for node in self.bnodes.borrow().iter() {
                for o in store.objs_sp(*node, property) {
                    out.push(Target::Entity(o));
                }
                for (value, datatype) in store.datas_sp(*node, property) {
                    out.push(Target::Literal { value, datatype });
                }
            }
        }
        self.cache.borrow_mut().insert(property, out.clone());
        Ok(out)
    }

    /// Annotation properties with at least one value on this relation.
    pub fn annotation_properties(&self) -> Result<BTreeSet<StorId>, ObserveError> {
        let world = self.world()?;
        let store = world.store();
        let mut out = BTreeSet::new();
        for node in self.bnodes.borrow().iter() {
            for predicate in store.predicates_of_subject(*node) {
                let baseline = matches!(
                    predicate,
                    vocab::RDF_TYPE
                        | vocab::OWL_ANNOTATED_SOURCE
                        | vocab::OWL_ANNOTATED_PROPERTY
                        | vocab::OWL_ANNOTATED_TARGET
                );
                if !baseline {
                    out.insert(predicate);
                }
            }
        }
        Ok(out)
    }

    // ── Name-keyed convenience ──

    pub fn values_named(&self, name: &str) -> Result<Vec<Target>, ObserveError> {
        let property = self.world()?.annotation_property(name)?;
        self.values(property)
    }

    pub fn add_value_named(
        &self,
        name: &str,
        value: impl Into<Target>,
    ) -> Result<(), ObserveError> {
        let property = self.world()?.annotation_property(name)?;
        self.add_value(property, value)
    }

    pub fn remove_value_named(
        &self,
        name: &str,
        value: impl Into<Target>,
    ) -> Result<bool, ObserveError> {
        let property = self.world()?.annotation_property(name)?;
        self.remove_value(property, value)
    }

    pub fn set_values_named(
        &self,
        name: &str,
        values: Vec<Target>,
    ) -> Result<(), ObserveError> {
        let property = self.world()?.annotation_property(name)?;
        self.set_values(property, values)
    }
}

impl Drop for AnnotatedRelation {
    fn drop(&mut self) {
        if let (Some(listener), Some(world)) = (self.cache_listener.get(), self.world.upgrade()) {
            world.unobserve(
                &ObserveKey::Statement(self.statement_key()),
                Some(listener),
            );
        }
    }
}
