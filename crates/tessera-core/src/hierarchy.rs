//! Memoized subtype lookups.
//!
//! Answers from the wrapped hierarchy are treated as fixed facts until
//! [`MemoizedHierarchy::reset`] is called, which a run does between
//! partitions.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tessera_ir::introspect::TypeHierarchy;

type Cache = Mutex<HashMap<String, BTreeSet<String>>>;

pub struct MemoizedHierarchy {
    inner: Arc<dyn TypeHierarchy>,
    concrete: Cache,
    supertypes: Cache,
    misses: AtomicUsize,
}

impl MemoizedHierarchy {
    pub fn new(inner: Arc<dyn TypeHierarchy>) -> Self {
        Self {
            inner,
            concrete: Mutex::new(HashMap::new()),
            supertypes: Mutex::new(HashMap::new()),
            misses: AtomicUsize::new(0),
        }
    }

    /// Forget every cached answer.
    pub fn reset(&self) {
        lock(&self.concrete).clear();
        lock(&self.supertypes).clear();
    }

    /// Number of cached answers across both lookups.
    pub fn cached_entries(&self) -> usize {
        lock(&self.concrete).len() + lock(&self.supertypes).len()
    }

    /// Lookups forwarded to the wrapped hierarchy so far.
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    fn lookup(
        &self,
        cache: &Cache,
        type_name: &str,
        compute: impl FnOnce(&dyn TypeHierarchy) -> BTreeSet<String>,
    ) -> BTreeSet<String> {
        if let Some(hit) = lock(cache).get(type_name) {
            return hit.clone();
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        let answer = compute(self.inner.as_ref());
        lock(cache).insert(type_name.to_string(), answer.clone());
        answer
    }
}

impl TypeHierarchy for MemoizedHierarchy {
    fn concrete_types_of(&self, type_name: &str) -> BTreeSet<String> {
        self.lookup(&self.concrete, type_name, |h| h.concrete_types_of(type_name))
    }

    fn supertypes_of(&self, type_name: &str) -> BTreeSet<String> {
        self.lookup(&self.supertypes, type_name, |h| h.supertypes_of(type_name))
    }
}

fn lock(cache: &Cache) -> std::sync::MutexGuard<'_, HashMap<String, BTreeSet<String>>> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
