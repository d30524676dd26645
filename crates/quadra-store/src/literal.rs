//! Typed literal values and their datatype tags.
//!
//! Literals key observation statements, so equality, hashing and ordering
//! must be total. Doubles compare by bit pattern for equality and by
//! `total_cmp` for ordering; a literal that is bitwise the same is the same
//! value.

use crate::ids::StorId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A literal value stored in the datas table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Literal {
    Int(i64),
    Double(f64),
    Str(String),
}

impl Literal {
    /// Numeric view of the literal, when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Int(v) => Some(*v as f64),
            Literal::Double(v) => Some(*v),
            Literal::Str(_) => None,
        }
    }

    fn variant_rank(&self) -> u8 {
        match self {
            Literal::Int(_) => 0,
            Literal::Double(_) => 1,
            Literal::Str(_) => 2,
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Literal::Int(a), Literal::Int(b)) => a == b,
            (Literal::Double(a), Literal::Double(b)) => a.to_bits() == b.to_bits(),
            (Literal::Str(a), Literal::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Literal {}

impl Hash for Literal {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            Literal::Int(v) => v.hash(state),
            Literal::Double(v) => v.to_bits().hash(state),
            Literal::Str(v) => v.hash(state),
        }
    }
}

impl Ord for Literal {
    fn cmp(&self, other: &Self) -> Ordering {
        // Numbers sort among themselves regardless of representation;
        // strings sort after numbers.
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a
                .total_cmp(&b)
                .then_with(|| self.variant_rank().cmp(&other.variant_rank())),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self, other) {
                (Literal::Str(a), Literal::Str(b)) => a.cmp(b),
                _ => Ordering::Equal,
            },
        }
    }
}

impl PartialOrd for Literal {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for Literal {
    fn from(v: i64) -> Self {
        Literal::Int(v)
    }
}

impl From<f64> for Literal {
    fn from(v: f64) -> Self {
        Literal::Double(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::Str(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::Str(v)
    }
}

/// Datatype tag of a data quad.
///
/// `Plain` is an untyped literal, `Id` points at a datatype entity, and
/// `Lang` is a language-tagged string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Datatype {
    Plain,
    Id(StorId),
    Lang(String),
}

impl Datatype {
    /// The language tag, when this is a language-tagged datatype.
    pub fn lang(&self) -> Option<&str> {
        match self {
            Datatype::Lang(tag) => Some(tag),
            _ => None,
        }
    }
}

/// An object position that is either another entity or a literal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Target {
    Entity(StorId),
    Literal { value: Literal, datatype: Datatype },
}

impl Target {
    pub fn entity(id: StorId) -> Self {
        Target::Entity(id)
    }

    pub fn literal(value: impl Into<Literal>, datatype: Datatype) -> Self {
        Target::Literal {
            value: value.into(),
            datatype,
        }
    }

    /// Plain string literal target.
    pub fn string(value: impl Into<String>) -> Self {
        Target::literal(Literal::Str(value.into()), Datatype::Plain)
    }

    pub fn as_entity(&self) -> Option<StorId> {
        match self {
            Target::Entity(id) => Some(*id),
            Target::Literal { .. } => None,
        }
    }
}

impl From<StorId> for Target {
    fn from(id: StorId) -> Self {
        Target::Entity(id)
    }
}
