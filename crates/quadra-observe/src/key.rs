//! Observation keys and change payloads.
//!
//! A key names what a listener watches: an entity, an annotatable
//! statement at one of three granularities, or an opaque token for values
//! that are not entities (derived views observe themselves through a
//! token). Keys are compared by value and order deterministically.

use quadra_store::{StorId, Target};
use serde::{Deserialize, Serialize};

/// What changed, as delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Change {
    /// A quad with this predicate was added, replaced or deleted. For
    /// object-side deliveries this is the declared inverse predicate.
    Predicate(StorId),
    /// Synthetic signal: the membership of an observed class-extension
    /// view may have changed.
    InverseOfType,
}

/// The subject position of a statement key: an entity, or a nested
/// statement (an annotation on an annotation).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatementSubject {
    Entity(StorId),
    Nested(Box<StatementKey>),
}

impl From<StorId> for StatementSubject {
    fn from(id: StorId) -> Self {
        StatementSubject::Entity(id)
    }
}

/// An annotatable statement at one of three granularities.
///
/// `predicate` and `target` narrow the key: `(s, p, target)` matches one
/// exact statement, `(s, p, None)` any statement with that subject and
/// predicate, `(s, None, None)` any statement about the subject. The
/// delivery fallback tries these finest to coarsest.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementKey {
    pub subject: StatementSubject,
    pub predicate: Option<StorId>,
    pub target: Option<Target>,
}

impl StatementKey {
    pub fn new(
        subject: impl Into<StatementSubject>,
        predicate: Option<StorId>,
        target: Option<Target>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            target,
        }
    }

    /// The same statement with the target position cleared.
    pub fn without_target(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            predicate: self.predicate,
            target: None,
        }
    }

    /// The subject-only granularity of this statement.
    pub fn subject_only(&self) -> Self {
        Self {
            subject: self.subject.clone(),
            predicate: None,
            target: None,
        }
    }
}

/// What an Observation is registered on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObserveKey {
    Entity(StorId),
    Statement(StatementKey),
    Token(String),
}

impl ObserveKey {
    pub fn entity(id: StorId) -> Self {
        ObserveKey::Entity(id)
    }

    pub fn statement(
        subject: impl Into<StatementSubject>,
        predicate: Option<StorId>,
        target: Option<Target>,
    ) -> Self {
        ObserveKey::Statement(StatementKey::new(subject, predicate, target))
    }

    pub fn token(value: impl Into<String>) -> Self {
        ObserveKey::Token(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn granularities_of_the_same_statement_are_distinct_keys() {
        let exact = ObserveKey::statement(300, Some(301), Some(Target::entity(302)));
        let by_predicate = ObserveKey::statement(300, Some(301), None);
        let by_subject = ObserveKey::statement(300, None, None);
        assert_ne!(exact, by_predicate);
        assert_ne!(by_predicate, by_subject);
        assert_ne!(exact, by_subject);
    }

    #[test]
    fn nested_statement_keys_compare_structurally() {
        let inner = StatementKey::new(300, Some(301), Some(Target::string("v")));
        let a = ObserveKey::statement(
            StatementSubject::Nested(Box::new(inner.clone())),
            Some(305),
            None,
        );
        let b = ObserveKey::statement(StatementSubject::Nested(Box::new(inner)), Some(305), None);
        assert_eq!(a, b);
    }

    #[test]
    fn statement_key_narrowing_helpers() {
        let exact = StatementKey::new(300, Some(301), Some(Target::entity(302)));
        assert_eq!(exact.without_target().target, None);
        assert_eq!(exact.without_target().predicate, Some(301));
        assert_eq!(exact.subject_only().predicate, None);
    }
}
