//! Canonical in-memory quad tables.
//!
//! This is the storage boundary for Quadra:
//! - two tables (`objs`, `datas`) in insertion order
//! - raw mutation primitives (add / set / wildcard delete)
//! - the lookup queries the observation layer consumes
//! - identifier allocation, the property registry, content digests
//!
//! No notification logic lives here. The observation layer wraps these
//! primitives; callers that mutate the store directly bypass delivery.

use crate::error::StoreError;
use crate::ids::{DEFAULT_CONTEXT, FIRST_USER_ID, StorId, vocab};
use crate::literal::{Datatype, Literal, Target};
use crate::quad::{DataQuad, ObjQuad};
use crate::registry::{PropertyInfo, PropertyKind, PropertyRegistry};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Canonical quad store for one logical database instance.
#[derive(Debug, Clone)]
pub struct QuadStore {
    objs: Vec<ObjQuad>,
    datas: Vec<DataQuad>,
    props: PropertyRegistry,
    next_entity: StorId,
    next_blank: StorId,
    next_context: StorId,
    uncommitted: u64,
}

impl Default for QuadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadStore {
    pub fn new() -> Self {
        Self {
            objs: Vec::new(),
            datas: Vec::new(),
            props: PropertyRegistry::new(),
            next_entity: FIRST_USER_ID,
            next_blank: -1,
            next_context: DEFAULT_CONTEXT + 1,
            uncommitted: 0,
        }
    }

    // ── Identifier allocation ──

    /// Allocate a fresh named-entity identifier.
    pub fn new_entity(&mut self) -> StorId {
        let id = self.next_entity;
        self.next_entity += 1;
        id
    }

    /// Allocate a fresh blank-node identifier (negative, decreasing).
    pub fn new_blank_node(&mut self) -> StorId {
        let id = self.next_blank;
        self.next_blank -= 1;
        id
    }

    /// Allocate a fresh provenance-context identifier.
    pub fn new_context(&mut self) -> StorId {
        let id = self.next_context;
        self.next_context += 1;
        id
    }

    /// Whether `id` has been allocated or appears anywhere in the tables.
    pub fn entity_exists(&self, id: StorId) -> bool {
        if id == 0 {
            return false;
        }
        if id > 0 {
            id < self.next_entity || self.props.get(id).is_some() || self.appears_in_quads(id)
        } else {
            id > self.next_blank || self.appears_in_quads(id)
        }
    }

    fn appears_in_quads(&self, id: StorId) -> bool {
        self.objs
            .iter()
            .any(|q| q.s == id || q.p == id || q.o == id)
            || self.datas.iter().any(|q| q.s == id || q.p == id)
    }

    // ── Property declarations ──

    pub fn props(&self) -> &PropertyRegistry {
        &self.props
    }

    pub fn declare_object_property(&mut self, name: &str) -> Result<StorId, StoreError> {
        self.declare_property(name, PropertyKind::Object, vocab::OWL_OBJECT_PROPERTY)
    }

    pub fn declare_data_property(&mut self, name: &str) -> Result<StorId, StoreError> {
        self.declare_property(name, PropertyKind::Data, vocab::OWL_DATA_PROPERTY)
    }

    pub fn declare_annotation_property(&mut self, name: &str) -> Result<StorId, StoreError> {
        self.declare_property(name, PropertyKind::Annotation, vocab::OWL_ANNOTATION_PROPERTY)
    }

    fn declare_property(
        &mut self,
        name: &str,
        kind: PropertyKind,
        type_entity: StorId,
    ) -> Result<StorId, StoreError> {
        if let Some(info) = self.props.by_name(name) {
            if info.kind == kind {
                return Ok(info.storid);
            }
            return Err(StoreError::PropertyKindMismatch(format!(
                "{name} is already declared as {:?}",
                info.kind
            )));
        }
        let storid = self.new_entity();
        self.props.declare(PropertyInfo {
            storid,
            name: name.to_string(),
            kind,
            inverse: None,
        })?;
        self.add_obj(DEFAULT_CONTEXT, storid, vocab::RDF_TYPE, type_entity)?;
        Ok(storid)
    }

    /// Link two declared object properties as inverses.
    pub fn link_inverse(&mut self, a: StorId, b: StorId) -> Result<(), StoreError> {
        self.props.link_inverse(a, b)
    }

    pub(crate) fn declare_row(&mut self, info: PropertyInfo) -> Result<(), StoreError> {
        self.props.declare(info)
    }

    // ── Mutation primitives ──

    fn validate_obj(&self, c: StorId, s: StorId, p: StorId, o: StorId) -> Result<(), StoreError> {
        if c <= 0 {
            return Err(StoreError::InvalidId(format!("context {c}")));
        }
        if s == 0 || o == 0 {
            return Err(StoreError::InvalidId("subject/object must be nonzero".into()));
        }
        if p <= 0 {
            return Err(StoreError::InvalidId(format!("predicate {p}")));
        }
        Ok(())
    }

    fn validate_data(&self, c: StorId, s: StorId, p: StorId) -> Result<(), StoreError> {
        if c <= 0 {
            return Err(StoreError::InvalidId(format!("context {c}")));
        }
        if s == 0 {
            return Err(StoreError::InvalidId("subject must be nonzero".into()));
        }
        if p <= 0 {
            return Err(StoreError::InvalidId(format!("predicate {p}")));
        }
        Ok(())
    }

    pub fn add_obj(
        &mut self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: StorId,
    ) -> Result<(), StoreError> {
        self.validate_obj(c, s, p, o)?;
        self.objs.push(ObjQuad { c, s, p, o });
        self.uncommitted += 1;
        Ok(())
    }

    /// Replace every `(s, p, *)` row with the single new row in `c`.
    pub fn set_obj(
        &mut self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: StorId,
    ) -> Result<(), StoreError> {
        self.validate_obj(c, s, p, o)?;
        self.objs.retain(|q| !(q.s == s && q.p == p));
        self.objs.push(ObjQuad { c, s, p, o });
        self.uncommitted += 1;
        Ok(())
    }

    /// Delete object quads matching the given components; `None` matches
    /// anything. Returns the number of rows removed.
    pub fn del_obj(
        &mut self,
        c: Option<StorId>,
        s: Option<StorId>,
        p: Option<StorId>,
        o: Option<StorId>,
    ) -> Result<usize, StoreError> {
        let before = self.objs.len();
        self.objs.retain(|q| {
            !(c.is_none_or(|v| q.c == v)
                && s.is_none_or(|v| q.s == v)
                && p.is_none_or(|v| q.p == v)
                && o.is_none_or(|v| q.o == v))
        });
        let removed = before - self.objs.len();
        if removed > 0 {
            self.uncommitted += 1;
        }
        Ok(removed)
    }

    pub fn add_data(
        &mut self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: Literal,
        d: Datatype,
    ) -> Result<(), StoreError> {
        self.validate_data(c, s, p)?;
        self.datas.push(DataQuad { c, s, p, o, d });
        self.uncommitted += 1;
        Ok(())
    }

    /// Replace every `(s, p, *)` data row with the single new row in `c`.
    pub fn set_data(
        &mut self,
        c: StorId,
        s: StorId,
        p: StorId,
        o: Literal,
        d: Datatype,
    ) -> Result<(), StoreError> {
        self.validate_data(c, s, p)?;
        self.datas.retain(|q| !(q.s == s && q.p == p));
        self.datas.push(DataQuad { c, s, p, o, d });
        self.uncommitted += 1;
        Ok(())
    }

    /// Delete data quads matching the given components; `None` matches
    /// anything. Returns the number of rows removed.
    pub fn del_data(
        &mut self,
        c: Option<StorId>,
        s: Option<StorId>,
        p: Option<StorId>,
        o: Option<&Literal>,
        d: Option<&Datatype>,
    ) -> Result<usize, StoreError> {
        let before = self.datas.len();
        self.datas.retain(|q| {
            !(c.is_none_or(|v| q.c == v)
                && s.is_none_or(|v| q.s == v)
                && p.is_none_or(|v| q.p == v)
                && o.is_none_or(|v| &q.o == v)
                && d.is_none_or(|v| &q.d == v))
        });
        let removed = before - self.datas.len();
        if removed > 0 {
            self.uncommitted += 1;
        }
        Ok(removed)
    }

    // ── Lookup queries ──

    /// First object for subject and predicate.
    pub fn obj_sp_o(&self, s: StorId, p: StorId) -> Option<StorId> {
        self.objs
            .iter()
            .find(|q| q.s == s && q.p == p)
            .map(|q| q.o)
    }

    /// All objects for subject and predicate, in store order.
    pub fn objs_sp(&self, s: StorId, p: StorId) -> Vec<StorId> {
        self.objs
            .iter()
            .filter(|q| q.s == s && q.p == p)
            .map(|q| q.o)
            .collect()
    }

    /// First literal for subject and predicate.
    pub fn data_sp_ov(&self, s: StorId, p: StorId) -> Option<(Literal, Datatype)> {
        self.datas
            .iter()
            .find(|q| q.s == s && q.p == p)
            .map(|q| (q.o.clone(), q.d.clone()))
    }

    /// All literals for subject and predicate, in store order.
    pub fn datas_sp(&self, s: StorId, p: StorId) -> Vec<(Literal, Datatype)> {
        self.datas
            .iter()
            .filter(|q| q.s == s && q.p == p)
            .map(|q| (q.o.clone(), q.d.clone()))
            .collect()
    }

    /// First object- or literal-valued target for subject and predicate.
    pub fn triple_sp_od(&self, s: StorId, p: StorId) -> Option<Target> {
        if let Some(o) = self.obj_sp_o(s, p) {
            return Some(Target::Entity(o));
        }
        self.data_sp_ov(s, p)
            .map(|(value, datatype)| Target::Literal { value, datatype })
    }

    pub fn has_obj(&self, s: StorId, p: StorId, o: StorId) -> bool {
        self.objs.iter().any(|q| q.s == s && q.p == p && q.o == o)
    }

    pub fn has_data(&self, s: StorId, p: StorId, o: &Literal, d: &Datatype) -> bool {
        self.datas
            .iter()
            .any(|q| q.s == s && q.p == p && &q.o == o && &q.d == d)
    }

    /// Context of the first object quad matching `(s, p, o)`.
    pub fn obj_context(&self, s: StorId, p: StorId, o: StorId) -> Option<StorId> {
        self.objs
            .iter()
            .find(|q| q.s == s && q.p == p && q.o == o)
            .map(|q| q.c)
    }

    /// Context of the first data quad matching `(s, p, o, d)`.
    pub fn data_context(
        &self,
        s: StorId,
        p: StorId,
        o: &Literal,
        d: &Datatype,
    ) -> Option<StorId> {
        self.datas
            .iter()
            .find(|q| q.s == s && q.p == p && &q.o == o && &q.d == d)
            .map(|q| q.c)
    }

    /// Distinct predicates attached to a subject in the objs table, in
    /// first-occurrence order.
    pub fn obj_predicates_of_subject(&self, s: StorId) -> Vec<StorId> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in &self.objs {
            if q.s == s && seen.insert(q.p) {
                out.push(q.p);
            }
        }
        out
    }

    /// Distinct predicates attached to a subject in the datas table, in
    /// first-occurrence order.
    pub fn data_predicates_of_subject(&self, s: StorId) -> Vec<StorId> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in &self.datas {
            if q.s == s && seen.insert(q.p) {
                out.push(q.p);
            }
        }
        out
    }

    /// Distinct predicates attached to a subject, both tables.
    pub fn predicates_of_subject(&self, s: StorId) -> BTreeSet<StorId> {
        let mut out: BTreeSet<StorId> = self
            .objs
            .iter()
            .filter(|q| q.s == s)
            .map(|q| q.p)
            .collect();
        out.extend(self.datas.iter().filter(|q| q.s == s).map(|q| q.p));
        out
    }

    /// Total quad count for a subject, both tables.
    pub fn quad_count_of_subject(&self, s: StorId) -> usize {
        self.objs.iter().filter(|q| q.s == s).count()
            + self.datas.iter().filter(|q| q.s == s).count()
    }

    // ── Pre-deletion enumeration ──

    /// Distinct `(s, p)` pairs in the objs table, optionally filtered by
    /// object, in first-occurrence order.
    pub fn obj_subject_predicate_pairs(&self, o: Option<StorId>) -> Vec<(StorId, StorId)> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in &self.objs {
            if o.is_none_or(|v| q.o == v) && seen.insert((q.s, q.p)) {
                out.push((q.s, q.p));
            }
        }
        out
    }

    /// Distinct subjects carrying predicate `p` in the objs table,
    /// optionally filtered by object.
    pub fn obj_subjects_with_predicate(&self, p: StorId, o: Option<StorId>) -> Vec<StorId> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in &self.objs {
            if q.p == p && o.is_none_or(|v| q.o == v) && seen.insert(q.s) {
                out.push(q.s);
            }
        }
        out
    }

    /// Distinct `(s, p)` pairs in the datas table, optionally filtered by
    /// literal and datatype.
    pub fn data_subject_predicate_pairs(
        &self,
        o: Option<&Literal>,
        d: Option<&Datatype>,
    ) -> Vec<(StorId, StorId)> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in &self.datas {
            if o.is_none_or(|v| &q.o == v) && d.is_none_or(|v| &q.d == v) && seen.insert((q.s, q.p))
            {
                out.push((q.s, q.p));
            }
        }
        out
    }

    /// Distinct subjects carrying predicate `p` in the datas table,
    /// optionally filtered by literal and datatype.
    pub fn data_subjects_with_predicate(
        &self,
        p: StorId,
        o: Option<&Literal>,
        d: Option<&Datatype>,
    ) -> Vec<StorId> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for q in &self.datas {
            if q.p == p
                && o.is_none_or(|v| &q.o == v)
                && d.is_none_or(|v| &q.d == v)
                && seen.insert(q.s)
            {
                out.push(q.s);
            }
        }
        out
    }

    // ── Class hierarchy ──

    /// Reflexive-transitive closure downward over `rdfs:subClassOf`.
    pub fn descendant_classes(&self, class: StorId) -> BTreeSet<StorId> {
        self.closure(class, |store, current| {
            store
                .objs
                .iter()
                .filter(|q| q.p == vocab::RDFS_SUBCLASSOF && q.o == current)
                .map(|q| q.s)
                .collect()
        })
    }

    /// Reflexive-transitive closure upward over `rdfs:subClassOf`.
    pub fn ancestor_classes(&self, class: StorId) -> BTreeSet<StorId> {
        self.closure(class, |store, current| {
            store
                .objs
                .iter()
                .filter(|q| q.p == vocab::RDFS_SUBCLASSOF && q.s == current)
                .map(|q| q.o)
                .collect()
        })
    }

    fn closure(
        &self,
        start: StorId,
        step: impl Fn(&Self, StorId) -> Vec<StorId>,
    ) -> BTreeSet<StorId> {
        let mut out = BTreeSet::from([start]);
        let mut work = vec![start];
        while let Some(current) = work.pop() {
            for next in step(self, current) {
                if out.insert(next) {
                    work.push(next);
                }
            }
        }
        out
    }

    // ── Instance queries ──

    /// Subjects of `rdf:type` quads whose object is in `classes`, in store
    /// order, optionally restricted to one context.
    pub fn instances_of(
        &self,
        classes: &BTreeSet<StorId>,
        context: Option<StorId>,
    ) -> Vec<StorId> {
        self.objs
            .iter()
            .filter(|q| q.p == vocab::RDF_TYPE && classes.contains(&q.o))
            .filter(|q| context.is_none_or(|c| q.c == c))
            .map(|q| q.s)
            .collect()
    }

    /// As [`instances_of`](Self::instances_of), sorted by each subject's
    /// value for `order_by` (optionally restricted to one language tag).
    /// Subjects without a value sort last; ties keep store order.
    pub fn instances_of_ordered(
        &self,
        classes: &BTreeSet<StorId>,
        context: Option<StorId>,
        order_by: StorId,
        lang: Option<&str>,
    ) -> Vec<StorId> {
        let mut members = self.instances_of(classes, context);
        members.sort_by(|a, b| {
            let ka = self.order_value(*a, order_by, lang);
            let kb = self.order_value(*b, order_by, lang);
            match (ka, kb) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
        members
    }

    fn order_value(&self, s: StorId, p: StorId, lang: Option<&str>) -> Option<Literal> {
        self.datas
            .iter()
            .find(|q| {
                q.s == s
                    && q.p == p
                    && match lang {
                        Some(tag) => q.d.lang() == Some(tag),
                        None => true,
                    }
            })
            .map(|q| q.o.clone())
    }

    // ── Lifecycle ──

    /// Whether mutations happened since the last commit.
    pub fn has_changes(&self) -> bool {
        self.uncommitted > 0
    }

    /// Number of mutation calls since the last commit.
    pub fn pending_changes(&self) -> u64 {
        self.uncommitted
    }

    /// Mark the current state as committed.
    pub fn commit(&mut self) {
        self.uncommitted = 0;
    }

    /// Deterministic digest over the canonical (sorted) quad content.
    ///
    /// Insertion order does not influence the digest; two stores holding
    /// the same rows hash identically.
    pub fn content_digest(&self) -> String {
        let mut rows: Vec<String> = self
            .objs
            .iter()
            .map(|q| format!("o:{}:{}:{}:{}", q.c, q.s, q.p, q.o))
            .collect();
        for q in &self.datas {
            rows.push(format!(
                "d:{}:{}:{}:{}:{}",
                q.c,
                q.s,
                q.p,
                encode_literal(&q.o),
                encode_datatype(&q.d)
            ));
        }
        rows.sort();
        let mut hasher = Sha256::new();
        for row in &rows {
            hasher.update(row.as_bytes());
            hasher.update(b"\n");
        }
        format!("{:x}", hasher.finalize())
    }

    // ── Raw row access (persistence, digests, tests) ──

    pub fn obj_rows(&self) -> &[ObjQuad] {
        &self.objs
    }

    pub fn data_rows(&self) -> &[DataQuad] {
        &self.datas
    }

    pub(crate) fn push_obj_row(&mut self, row: ObjQuad) {
        self.objs.push(row);
    }

    pub(crate) fn push_data_row(&mut self, row: DataQuad) {
        self.datas.push(row);
    }

    pub(crate) fn recompute_counters(&mut self) {
        let mut max_entity = FIRST_USER_ID - 1;
        let mut min_blank: StorId = 0;
        let mut max_context = DEFAULT_CONTEXT;
        let mut track = |id: StorId| {
            if id > max_entity {
                max_entity = id;
            }
            if id < min_blank {
                min_blank = id;
            }
        };
        for q in &self.objs {
            track(q.s);
            track(q.p);
            track(q.o);
            max_context = max_context.max(q.c);
        }
        for q in &self.datas {
            track(q.s);
            track(q.p);
            max_context = max_context.max(q.c);
        }
        for info in self.props.rows() {
            if info.storid > max_entity {
                max_entity = info.storid;
            }
        }
        self.next_entity = max_entity + 1;
        self.next_blank = min_blank - 1;
        self.next_context = max_context + 1;
        self.uncommitted = 0;
    }
}

fn encode_literal(value: &Literal) -> String {
    match value {
        Literal::Int(v) => format!("i{v}"),
        Literal::Double(v) => format!("f{:016x}", v.to_bits()),
        Literal::Str(v) => format!("s{v}"),
    }
}

fn encode_datatype(datatype: &Datatype) -> String {
    match datatype {
        Datatype::Plain => "p".to_string(),
        Datatype::Id(id) => format!("t{id}"),
        Datatype::Lang(tag) => format!("l{tag}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::is_blank;

    fn store_with_hierarchy() -> (QuadStore, StorId, StorId, StorId) {
        let mut store = QuadStore::new();
        let animal = store.new_entity();
        let bird = store.new_entity();
        let owl = store.new_entity();
        store
            .add_obj(DEFAULT_CONTEXT, bird, vocab::RDFS_SUBCLASSOF, animal)
            .expect("bird subclass");
        store
            .add_obj(DEFAULT_CONTEXT, owl, vocab::RDFS_SUBCLASSOF, bird)
            .expect("owl subclass");
        (store, animal, bird, owl)
    }

    #[test]
    fn set_obj_replaces_across_contexts() {
        let mut store = QuadStore::new();
        let ctx2 = store.new_context();
        let s = store.new_entity();
        let p = store.declare_object_property("partOf").expect("declare");
        store.add_obj(DEFAULT_CONTEXT, s, p, 500).expect("add");
        store.add_obj(ctx2, s, p, 501).expect("add");
        store.set_obj(ctx2, s, p, 502).expect("set");
        assert_eq!(store.objs_sp(s, p), vec![502]);
    }

    #[test]
    fn wildcard_delete_reports_removed_count() {
        let mut store = QuadStore::new();
        let s = store.new_entity();
        let p = store.declare_object_property("partOf").expect("declare");
        store.add_obj(DEFAULT_CONTEXT, s, p, 500).expect("add");
        store.add_obj(DEFAULT_CONTEXT, s, p, 501).expect("add");
        store.add_obj(DEFAULT_CONTEXT, 500, p, 501).expect("add");
        let removed = store.del_obj(None, Some(s), None, None).expect("delete");
        assert_eq!(removed, 2);
        assert!(store.objs_sp(s, p).is_empty());
        assert_eq!(store.obj_sp_o(500, p), Some(501));
    }

    #[test]
    fn closure_queries_are_reflexive_and_transitive() {
        let (store, animal, bird, owl) = store_with_hierarchy();
        assert_eq!(
            store.descendant_classes(animal),
            BTreeSet::from([animal, bird, owl])
        );
        assert_eq!(
            store.ancestor_classes(owl),
            BTreeSet::from([animal, bird, owl])
        );
        assert_eq!(store.descendant_classes(owl), BTreeSet::from([owl]));
    }

    #[test]
    fn instances_respect_context_filter_and_store_order() {
        let (mut store, animal, bird, owl) = store_with_hierarchy();
        let ctx2 = store.new_context();
        let a = store.new_entity();
        let b = store.new_entity();
        let c = store.new_entity();
        store
            .add_obj(DEFAULT_CONTEXT, b, vocab::RDF_TYPE, bird)
            .expect("type b");
        store
            .add_obj(ctx2, a, vocab::RDF_TYPE, owl)
            .expect("type a");
        store
            .add_obj(DEFAULT_CONTEXT, c, vocab::RDF_TYPE, animal)
            .expect("type c");

        let classes = store.descendant_classes(animal);
        assert_eq!(store.instances_of(&classes, None), vec![b, a, c]);
        assert_eq!(store.instances_of(&classes, Some(ctx2)), vec![a]);
    }

    #[test]
    fn ordered_instances_sort_by_value_with_lang_filter() {
        let (mut store, animal, _, _) = store_with_hierarchy();
        let label = store.declare_data_property("displayName").expect("declare");
        let a = store.new_entity();
        let b = store.new_entity();
        let c = store.new_entity();
        for id in [a, b, c] {
            store
                .add_obj(DEFAULT_CONTEXT, id, vocab::RDF_TYPE, animal)
                .expect("type");
        }
        store
            .add_data(
                DEFAULT_CONTEXT,
                a,
                label,
                Literal::from("zebra"),
                Datatype::Lang("en".to_string()),
            )
            .expect("label a");
        store
            .add_data(
                DEFAULT_CONTEXT,
                b,
                label,
                Literal::from("aigle"),
                Datatype::Lang("fr".to_string()),
            )
            .expect("label b");
        store
            .add_data(
                DEFAULT_CONTEXT,
                b,
                label,
                Literal::from("eagle"),
                Datatype::Lang("en".to_string()),
            )
            .expect("label b en");

        let classes = store.descendant_classes(animal);
        // English labels: eagle < zebra, unlabelled c sorts last.
        assert_eq!(
            store.instances_of_ordered(&classes, None, label, Some("en")),
            vec![b, a, c]
        );
    }

    #[test]
    fn content_digest_ignores_insertion_order() {
        let mut first = QuadStore::new();
        let mut second = QuadStore::new();
        first.add_obj(1, 300, 6, 11).expect("add");
        first
            .add_data(1, 300, 20, Literal::from("x"), Datatype::Plain)
            .expect("add");
        second
            .add_data(1, 300, 20, Literal::from("x"), Datatype::Plain)
            .expect("add");
        second.add_obj(1, 300, 6, 11).expect("add");
        assert_eq!(first.content_digest(), second.content_digest());

        first.add_obj(1, 301, 6, 11).expect("add");
        assert_ne!(first.content_digest(), second.content_digest());
    }

    #[test]
    fn commit_clears_pending_changes() {
        let mut store = QuadStore::new();
        assert!(!store.has_changes());
        store.add_obj(1, 300, 6, 11).expect("add");
        assert!(store.has_changes());
        store.commit();
        assert!(!store.has_changes());
    }

    #[test]
    fn blank_nodes_are_negative_and_tracked_by_entity_exists() {
        let mut store = QuadStore::new();
        let b1 = store.new_blank_node();
        let b2 = store.new_blank_node();
        assert!(is_blank(b1) && is_blank(b2));
        assert_eq!(b2, b1 - 1);
        assert!(store.entity_exists(b1));
        assert!(store.entity_exists(b2));
        assert!(!store.entity_exists(b2 - 1));
        assert!(store.entity_exists(vocab::RDF_TYPE));
        assert!(!store.entity_exists(0));
    }
}
