//! # quadra-store
//!
//! Canonical quad tables for OWL-style ontologies.
//!
//! This crate is the storage boundary consumed by `quadra-observe`:
//! identifiers and the fixed vocabulary, typed literals, the in-memory
//! `objs`/`datas` tables with their raw mutation primitives and lookup
//! queries, the property registry, JSONL persistence, content digests,
//! and the parallel read helper.
//!
//! ## Data model
//!
//! ```text
//! JSONL (on disk, one row per line)
//!     ↕  load / save
//! QuadStore
//!     objs  (c, s, p, o)        object-valued quads, insertion order
//!     datas (c, s, p, o, d)     literal-valued quads, insertion order
//!     props                     declared properties: kind + inverse
//! ```
//!
//! Identifiers are integers; negative identifiers are blank nodes. No
//! notification logic lives here: the observation layer wraps these
//! primitives.

pub mod error;
pub mod ids;
pub mod jsonl;
pub mod literal;
pub mod parallel;
pub mod quad;
pub mod registry;
pub mod store;

pub use error::StoreError;
pub use ids::{DEFAULT_CONTEXT, FIRST_USER_ID, REIFICATION_BASELINE, StorId, is_blank, vocab};
pub use jsonl::QuadRow;
pub use literal::{Datatype, Literal, Target};
pub use parallel::{ReadHandle, read_parallel};
pub use quad::{DataQuad, ObjQuad};
pub use registry::{PropertyInfo, PropertyKind, PropertyRegistry};
pub use store::QuadStore;
