//! Parallel fan-out for independent read-only queries.
//!
//! Workers draw jobs from a shared queue, each against its own read
//! handle, and results are re-joined in input order on the calling
//! thread. The store must have no uncommitted writes: mixing parallel
//! reads with a dirty store is a precondition violation, checked before
//! any thread is spawned. No notification delivery happens here.

use crate::error::StoreError;
use crate::store::QuadStore;
use std::sync::Mutex;
use std::thread;

/// A per-worker read handle over a committed store.
pub struct ReadHandle<'a> {
    store: &'a QuadStore,
}

impl<'a> ReadHandle<'a> {
    fn new(store: &'a QuadStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a QuadStore {
        self.store
    }
}

/// Run the given queries across `workers` scoped threads.
///
/// Returns results in the order the queries were given. A panicking
/// query propagates to the caller after the remaining workers finish.
pub fn read_parallel<T, F>(
    store: &QuadStore,
    queries: Vec<F>,
    workers: usize,
) -> Result<Vec<T>, StoreError>
where
    T: Send,
    F: FnOnce(&ReadHandle<'_>) -> T + Send,
{
    if store.has_changes() {
        return Err(StoreError::PreconditionViolation(
            "parallel reads require a committed store; commit pending writes first".to_string(),
        ));
    }

    let total = queries.len();
    if total == 0 {
        return Ok(Vec::new());
    }

    // Reversed so pop() hands jobs out in input order.
    let jobs: Mutex<Vec<(usize, F)>> = Mutex::new(queries.into_iter().enumerate().rev().collect());
    let worker_count = workers.max(1).min(total);

    let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
    thread::scope(|scope| {
        let handles: Vec<_> = (0..worker_count)
            .map(|_| {
                scope.spawn(|| {
                    let handle = ReadHandle::new(store);
                    let mut local = Vec::new();
                    while let Some((index, query)) = next_job(&jobs) {
                        local.push((index, query(&handle)));
                    }
                    local
                })
            })
            .collect();
        for worker in handles {
            match worker.join() {
                Ok(local) => {
                    for (index, value) in local {
                        slots[index] = Some(value);
                    }
                }
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
    });

    debug_assert!(slots.iter().all(Option::is_some));
    Ok(slots.into_iter().flatten().collect())
}

fn next_job<F>(jobs: &Mutex<Vec<(usize, F)>>) -> Option<(usize, F)> {
    // Poisoning only happens after another worker panicked; that panic is
    // re-raised on join, so the queue content is still safe to drain.
    let mut guard = jobs.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.pop()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{DEFAULT_CONTEXT, vocab};

    #[test]
    fn results_come_back_in_input_order() {
        let mut store = QuadStore::new();
        let class = store.new_entity();
        let individuals: Vec<_> = (0..8).map(|_| store.new_entity()).collect();
        for id in &individuals {
            store
                .add_obj(DEFAULT_CONTEXT, *id, vocab::RDF_TYPE, class)
                .expect("type");
        }
        store.commit();

        let queries: Vec<_> = individuals
            .iter()
            .map(|id| {
                let id = *id;
                move |handle: &ReadHandle<'_>| handle.store().obj_sp_o(id, vocab::RDF_TYPE)
            })
            .collect();
        let results = read_parallel(&store, queries, 3).expect("parallel read");
        assert_eq!(results.len(), individuals.len());
        assert!(results.iter().all(|r| *r == Some(class)));
    }

    #[test]
    fn uncommitted_store_is_rejected_before_spawning() {
        let mut store = QuadStore::new();
        store.add_obj(1, 300, 6, 11).expect("add");
        let queries = vec![|handle: &ReadHandle<'_>| handle.store().obj_rows().len()];
        let err = read_parallel(&store, queries, 2).expect_err("dirty store");
        assert!(matches!(err, StoreError::PreconditionViolation(_)));
    }

    #[test]
    fn empty_query_set_is_a_noop() {
        let store = QuadStore::new();
        let queries: Vec<fn(&ReadHandle<'_>) -> usize> = Vec::new();
        let results = read_parallel(&store, queries, 4).expect("empty");
        assert!(results.is_empty());
    }
}
