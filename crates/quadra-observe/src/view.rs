//! Class-extension views: lazily cached instance lists.
//!
//! A view is bound to a class and resolves to the individuals asserted
//! (directly or via a descendant class) to belong to it. The member list
//! is computed on demand and invalidated, not recomputed, by any event
//! that could change membership: a type assertion naming the class or a
//! descendant, or destruction of a member individual.
//!
//! Views register weakly in the world's per-class registry and
//! deregister explicitly on drop; nothing relies on collection timing.

use crate::error::ObserveError;
use crate::key::{Change, ObserveKey};
use crate::world::World;
use quadra_store::{DEFAULT_CONTEXT, StorId, vocab};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::{Rc, Weak};

/// Optional view filters and ordering.
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    /// Only count type assertions from this provenance context.
    pub context: Option<StorId>,
    /// Sort members by their value for this property.
    pub order_by: Option<StorId>,
    /// Restrict the ordering values to one language tag.
    pub lang: Option<String>,
    /// Register in the world so membership changes are signalled through
    /// the view's token key.
    pub observed: bool,
}

/// All instances of a class, including instances of its descendants.
pub struct InstancesOfClass {
    world: Weak<World>,
    class: StorId,
    options: ViewOptions,
    /// Descendant set snapshot taken at construction.
    descendants: BTreeSet<StorId>,
    cached: RefCell<Option<Vec<StorId>>>,
    token: ObserveKey,
}

impl InstancesOfClass {
    pub fn new(world: &Rc<World>, class: StorId, options: ViewOptions) -> Rc<Self> {
        let descendants = world.store().descendant_classes(class);
        let token = ObserveKey::token(format!("instances:{class}:{}", world.next_view_token()));
        let view = Rc::new(Self {
            world: Rc::downgrade(world),
            class,
            options,
            descendants,
            cached: RefCell::new(None),
            token,
        });
        if view.options.observed {
            world.register_view(class, Rc::downgrade(&view));
        }
        view
    }

    pub fn class(&self) -> StorId {
        self.class
    }

    /// The token key external listeners observe for membership signals.
    pub fn key(&self) -> &ObserveKey {
        &self.token
    }

    /// Resolved member list, computing it on first use after an
    /// invalidation. An empty list is returned once the world is gone.
    pub fn resolve(&self) -> Vec<StorId> {
        let cached = self.cached.borrow().clone();
        if let Some(members) = cached {
            return members;
        }
        let Some(world) = self.world.upgrade() else {
            return Vec::new();
        };
        let members = {
            let store = world.store();
            match self.options.order_by {
                Some(property) => store.instances_of_ordered(
                    &self.descendants,
                    self.options.context,
                    property,
                    self.options.lang.as_deref(),
                ),
                None => store.instances_of(&self.descendants, self.options.context),
            }
        };
        *self.cached.borrow_mut() = Some(members.clone());
        members
    }

    /// Clear the cache without recomputing.
    pub fn invalidate(&self) {
        *self.cached.borrow_mut() = None;
    }

    pub fn is_resolved(&self) -> bool {
        self.cached.borrow().is_some()
    }

    /// Assert the class on `individual`; a no-op when already asserted.
    pub fn add(&self, individual: StorId) -> Result<(), ObserveError> {
        let Some(world) = self.world.upgrade() else {
            return Err(ObserveError::WorldDropped);
        };
        let context = self.options.context.unwrap_or(DEFAULT_CONTEXT);
        let already = world
            .store()
            .has_obj(individual, vocab::RDF_TYPE, self.class);
        if !already {
            world.add_obj(context, individual, vocab::RDF_TYPE, self.class)?;
        }
        Ok(())
    }

    /// Destroy `individual` entirely. The deeper destruction cascade is
    /// the surrounding ontology layer's concern.
    pub fn remove(&self, individual: StorId) -> Result<usize, ObserveError> {
        let Some(world) = self.world.upgrade() else {
            return Err(ObserveError::WorldDropped);
        };
        world.destroy_entity(individual)
    }

    /// Membership may have changed: invalidate and, when observed, signal
    /// through the token key. A context-filtered view ignores changes
    /// scoped to other contexts.
    pub(crate) fn changed(&self, world: &World, context: Option<StorId>) {
        if let (Some(view_context), Some(changed_context)) = (self.options.context, context)
            && view_context != changed_context
        {
            return;
        }
        self.invalidate();
        if self.options.observed {
            world.deliver(&self.token, &[Change::InverseOfType]);
        }
    }
}

impl Drop for InstancesOfClass {
    fn drop(&mut self) {
        if self.options.observed
            && let Some(world) = self.world.upgrade()
        {
            world.unregister_view(self.class);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world_with_classes() -> (Rc<World>, StorId, StorId) {
        let world = World::new();
        let animal = world.new_entity();
        let bird = world.new_entity();
        world
            .add_obj(DEFAULT_CONTEXT, bird, vocab::RDFS_SUBCLASSOF, animal)
            .expect("subclass");
        (world, animal, bird)
    }

    #[test]
    fn resolve_is_lazy_and_cached() {
        let (world, animal, bird) = world_with_classes();
        let view = InstancesOfClass::new(&world, animal, ViewOptions::default());
        assert!(!view.is_resolved());

        let a = world.new_entity();
        world
            .add_obj(DEFAULT_CONTEXT, a, vocab::RDF_TYPE, bird)
            .expect("type");
        assert_eq!(view.resolve(), vec![a]);
        assert!(view.is_resolved());
    }

    #[test]
    fn type_assertion_on_descendant_invalidates_the_view() {
        let (world, animal, bird) = world_with_classes();
        let view = InstancesOfClass::new(
            &world,
            animal,
            ViewOptions {
                observed: true,
                ..ViewOptions::default()
            },
        );
        assert!(view.resolve().is_empty());

        let a = world.new_entity();
        world
            .add_obj(DEFAULT_CONTEXT, a, vocab::RDF_TYPE, bird)
            .expect("type");
        assert!(!view.is_resolved());
        assert_eq!(view.resolve(), vec![a]);
    }

    #[test]
    fn unobserved_views_are_not_registered() {
        let (world, animal, bird) = world_with_classes();
        let view = InstancesOfClass::new(&world, animal, ViewOptions::default());
        view.resolve();

        let a = world.new_entity();
        world
            .add_obj(DEFAULT_CONTEXT, a, vocab::RDF_TYPE, bird)
            .expect("type");
        // Not registered, so the cache is stale until invalidated by hand.
        assert!(view.is_resolved());
        view.invalidate();
        assert_eq!(view.resolve(), vec![a]);
    }

    #[test]
    fn context_filtered_view_ignores_other_contexts() {
        let (world, animal, bird) = world_with_classes();
        let ctx2 = world.new_context();
        let view = InstancesOfClass::new(
            &world,
            animal,
            ViewOptions {
                context: Some(DEFAULT_CONTEXT),
                observed: true,
                ..ViewOptions::default()
            },
        );
        assert!(view.resolve().is_empty());

        let a = world.new_entity();
        world.add_obj(ctx2, a, vocab::RDF_TYPE, bird).expect("type");
        // Assertion in another context: cache untouched.
        assert!(view.is_resolved());

        let b = world.new_entity();
        world
            .add_obj(DEFAULT_CONTEXT, b, vocab::RDF_TYPE, bird)
            .expect("type");
        assert!(!view.is_resolved());
        assert_eq!(view.resolve(), vec![b]);
    }

    #[test]
    fn dropping_a_view_deregisters_it() {
        let (world, animal, bird) = world_with_classes();
        {
            let view = InstancesOfClass::new(
                &world,
                animal,
                ViewOptions {
                    observed: true,
                    ..ViewOptions::default()
                },
            );
            view.resolve();
        }
        // The registry entry is pruned; later assertions must not touch
        // the dead view.
        let a = world.new_entity();
        world
            .add_obj(DEFAULT_CONTEXT, a, vocab::RDF_TYPE, bird)
            .expect("type");
    }
}
