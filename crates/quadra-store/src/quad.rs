//! Quad row types.
//!
//! Field names mirror the canonical table columns: context, subject,
//! predicate, object, datatype.

use crate::ids::StorId;
use crate::literal::{Datatype, Literal};
use serde::{Deserialize, Serialize};

/// An object-valued quad: subject, predicate and object are all entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjQuad {
    pub c: StorId,
    pub s: StorId,
    pub p: StorId,
    pub o: StorId,
}

/// A literal-valued quad.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQuad {
    pub c: StorId,
    pub s: StorId,
    pub p: StorId,
    pub o: Literal,
    pub d: Datatype,
}
