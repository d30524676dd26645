//! Entity identifiers and the fixed OWL vocabulary.
//!
//! Every class, property, individual and provenance context is named by a
//! `StorId`. Positive identifiers name regular entities; negative
//! identifiers are blank nodes, used only to group the reification quads of
//! one annotated statement. Zero is reserved and never allocated.

/// Internal integer entity identifier.
pub type StorId = i64;

/// Whether `id` names a blank node.
pub fn is_blank(id: StorId) -> bool {
    id < 0
}

/// First identifier handed out for user entities.
///
/// Everything below this is reserved for the fixed vocabulary.
pub const FIRST_USER_ID: StorId = 300;

/// The provenance context a fresh store starts with.
pub const DEFAULT_CONTEXT: StorId = 1;

/// Well-known vocabulary identifiers.
///
/// These are pinned so that quad tables are portable across stores without
/// a resource lookup.
pub mod vocab {
    use super::StorId;

    pub const RDF_TYPE: StorId = 6;
    pub const RDFS_SUBCLASSOF: StorId = 9;
    pub const OWL_CLASS: StorId = 11;
    pub const OWL_NAMED_INDIVIDUAL: StorId = 12;
    pub const OWL_OBJECT_PROPERTY: StorId = 13;
    pub const OWL_DATA_PROPERTY: StorId = 14;
    pub const OWL_ANNOTATION_PROPERTY: StorId = 15;
    pub const OWL_AXIOM: StorId = 16;
    pub const OWL_ANNOTATED_SOURCE: StorId = 17;
    pub const OWL_ANNOTATED_PROPERTY: StorId = 18;
    pub const OWL_ANNOTATED_TARGET: StorId = 19;
    pub const RDFS_LABEL: StorId = 20;
    pub const RDFS_COMMENT: StorId = 21;
}

/// The four predicates every reifying blank node carries.
///
/// A node whose quad count drops back to this baseline holds no annotation
/// values and is eligible for deletion.
pub const REIFICATION_BASELINE: usize = 4;
