//! Property registry: declared properties, their kinds and inverses.
//!
//! The observation layer consults this registry to decide whether a
//! predicate is an annotation property (annotation-axiom fallback) and
//! whether it has a declared inverse (object-side delivery).

use crate::error::StoreError;
use crate::ids::StorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What kind of property a declared identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyKind {
    Object,
    Data,
    Annotation,
}

/// One declared property row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyInfo {
    pub storid: StorId,
    pub name: String,
    pub kind: PropertyKind,
    /// Declared inverse, object properties only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<StorId>,
}

/// Declared properties, indexed by identifier and by name.
#[derive(Debug, Clone, Default)]
pub struct PropertyRegistry {
    by_id: BTreeMap<StorId, PropertyInfo>,
    by_name: BTreeMap<String, StorId>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a property. Re-declaring identical data is a no-op;
    /// conflicting data is an error.
    pub fn declare(&mut self, info: PropertyInfo) -> Result<(), StoreError> {
        if let Some(existing) = self.by_id.get(&info.storid) {
            if *existing == info {
                return Ok(());
            }
            return Err(StoreError::DuplicateProperty(format!(
                "{} (storid {})",
                info.name, info.storid
            )));
        }
        if let Some(other) = self.by_name.get(&info.name) {
            return Err(StoreError::DuplicateProperty(format!(
                "{} already names storid {other}",
                info.name
            )));
        }
        self.by_name.insert(info.name.clone(), info.storid);
        self.by_id.insert(info.storid, info);
        Ok(())
    }

    /// Link two object properties as inverses of each other.
    pub fn link_inverse(&mut self, a: StorId, b: StorId) -> Result<(), StoreError> {
        for (prop, other) in [(a, b), (b, a)] {
            let info = self
                .by_id
                .get_mut(&prop)
                .ok_or_else(|| StoreError::UnknownProperty(format!("storid {prop}")))?;
            if info.kind != PropertyKind::Object {
                return Err(StoreError::PropertyKindMismatch(format!(
                    "{} is not an object property",
                    info.name
                )));
            }
            info.inverse = Some(other);
        }
        Ok(())
    }

    pub fn get(&self, storid: StorId) -> Option<&PropertyInfo> {
        self.by_id.get(&storid)
    }

    pub fn by_name(&self, name: &str) -> Option<&PropertyInfo> {
        self.by_name.get(name).and_then(|id| self.by_id.get(id))
    }

    /// Whether `storid` is a declared annotation property.
    pub fn is_annotation_property(&self, storid: StorId) -> bool {
        self.get(storid)
            .is_some_and(|info| info.kind == PropertyKind::Annotation)
    }

    /// Declared inverse of `storid`, if any.
    pub fn inverse_of(&self, storid: StorId) -> Option<StorId> {
        self.get(storid).and_then(|info| info.inverse)
    }

    /// All declared rows in identifier order.
    pub fn rows(&self) -> impl Iterator<Item = &PropertyInfo> {
        self.by_id.values()
    }
}
