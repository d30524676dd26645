//! # quadra-observe
//!
//! Change observation and annotation reification over `quadra-store`.
//!
//! External code reacts to fine-grained mutations of the quad store
//! without the store learning application semantics; qualified statements
//! are stored through blank-node reification while staying addressable
//! through a simple key.
//!
//! ## Architecture
//!
//! ```text
//! World                 ← intercepted mutation surface + delivery
//!   ├─ ObservationMap   ← key → ordered listener list
//!   ├─ CoalesceState    ← re-entrant scope, buffered flush
//!   ├─ view registry    ← class → weak InstancesOfClass entries
//!   └─ QuadStore        ← canonical tables (quadra-store)
//!
//! AnnotatedRelation     ← per-context reifying blank nodes
//! InstancesOfClass      ← lazily cached class extension
//! ```
//!
//! All delivery is synchronous and re-entrant safe; a single caller
//! serializes the mutation path. See `quadra_store::read_parallel` for
//! the read-only fan-out that stays outside delivery entirely.

pub mod annotate;
pub mod coalesce;
pub mod error;
pub mod key;
pub mod registry;
pub mod view;
pub mod world;

pub use annotate::{AnnotatedRelation, RelationSubject};
pub use coalesce::CoalesceGuard;
pub use error::ObserveError;
pub use key::{Change, ObserveKey, StatementKey, StatementSubject};
pub use registry::{ListenerFn, ListenerId};
pub use view::{InstancesOfClass, ViewOptions};
pub use world::{ContextGuard, World};
