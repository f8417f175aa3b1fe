//! Dependency-tracking memoization
//!
//! A [`MemoizedSelector`] wraps a derivation `f(&Session, &args)`. Each run
//! records which entity tables `f` read (through the session's access
//! tracking) and the table objects it saw. A later call with equal args is
//! answered from cache as long as every one of those tables is still the
//! same object in the new state. Tables `f` never read do not matter.
//!
//! # Identity contract
//!
//! The default table check is `Arc::ptr_eq`. That is sound because a table
//! is never changed in place: any write produces a new `Table`, and tables
//! a write does not touch are carried over as the same `Arc`.
//!
//! # Cache
//!
//! One entry: the last args, the last result, and the accessed tables.
//! Errors are returned to the caller and never cached.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use strata_orm_core::OrmResult;
use strata_orm_engine::{Schema, Session};
use strata_orm_storage::{StoreState, Table};

use crate::Selector;

/// Equality on selector arguments.
pub type ArgsEq<A> = Arc<dyn Fn(&A, &A) -> bool + Send + Sync>;

/// Equality on table objects.
pub type TableEq = Arc<dyn Fn(&Arc<Table>, &Arc<Table>) -> bool + Send + Sync>;

fn same_object(a: &Arc<Table>, b: &Arc<Table>) -> bool {
    Arc::ptr_eq(a, b)
}

fn equal_args<A: PartialEq>(a: &A, b: &A) -> bool {
    a == b
}

/// Equality predicates used by a [`MemoizedSelector`].
pub struct MemoizeOptions<A> {
    args_eq: ArgsEq<A>,
    table_eq: TableEq,
}

impl<A> MemoizeOptions<A> {
    /// Options with a custom argument check and identity on tables.
    ///
    /// For argument types without `PartialEq`.
    pub fn with_args_eq<F>(args_eq: F) -> Self
    where
        F: Fn(&A, &A) -> bool + Send + Sync + 'static,
    {
        MemoizeOptions {
            args_eq: Arc::new(args_eq),
            table_eq: Arc::new(same_object),
        }
    }

    /// Replace the argument check.
    pub fn args_eq<F>(mut self, args_eq: F) -> Self
    where
        F: Fn(&A, &A) -> bool + Send + Sync + 'static,
    {
        self.args_eq = Arc::new(args_eq);
        self
    }

    /// Replace the table check.
    ///
    /// Anything weaker than identity must still notice every content change.
    pub fn table_eq<F>(mut self, table_eq: F) -> Self
    where
        F: Fn(&Arc<Table>, &Arc<Table>) -> bool + Send + Sync + 'static,
    {
        self.table_eq = Arc::new(table_eq);
        self
    }
}

impl<A: PartialEq + 'static> Default for MemoizeOptions<A> {
    fn default() -> Self {
        MemoizeOptions {
            args_eq: Arc::new(equal_args::<A>),
            table_eq: Arc::new(same_object),
        }
    }
}

impl<A> Clone for MemoizeOptions<A> {
    fn clone(&self) -> Self {
        MemoizeOptions {
            args_eq: self.args_eq.clone(),
            table_eq: self.table_eq.clone(),
        }
    }
}

impl<A> fmt::Debug for MemoizeOptions<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizeOptions").finish_non_exhaustive()
    }
}

struct CacheEntry<A, R> {
    args: A,
    result: Arc<R>,
    /// Tables read by the run that produced `result`. `None`: the state had
    /// no table for that entity.
    accessed: Vec<(String, Option<Arc<Table>>)>,
}

/// Memoized derivation over store states.
pub struct MemoizedSelector<A, R, F> {
    schema: Arc<Schema>,
    func: F,
    options: MemoizeOptions<A>,
    cache: Mutex<Option<CacheEntry<A, R>>>,
    recomputations: AtomicUsize,
}

impl<A, R, F> MemoizedSelector<A, R, F>
where
    A: Clone,
    F: Fn(&Session, &A) -> OrmResult<R>,
{
    /// Wrap `func` with the default equality checks.
    pub fn new(schema: Arc<Schema>, func: F) -> Self
    where
        A: PartialEq + 'static,
    {
        Self::with_options(schema, func, MemoizeOptions::default())
    }

    /// Wrap `func` with custom equality checks.
    pub fn with_options(schema: Arc<Schema>, func: F, options: MemoizeOptions<A>) -> Self {
        MemoizedSelector {
            schema,
            func,
            options,
            cache: Mutex::new(None),
            recomputations: AtomicUsize::new(0),
        }
    }

    /// Result of `func` against `state`, from cache when nothing it read
    /// last time has changed.
    pub fn select(&self, state: &StoreState, args: &A) -> OrmResult<Arc<R>> {
        if let Some(hit) = self.lookup(state, args) {
            tracing::trace!("selector cache hit");
            return Ok(hit);
        }

        let session = Session::new(self.schema.clone(), state.clone());
        let result = Arc::new((self.func)(&session, args)?);
        let accessed: Vec<(String, Option<Arc<Table>>)> = session
            .accessed_entities()
            .into_iter()
            .map(|entity| {
                let table = state.table(&entity).cloned();
                (entity, table)
            })
            .collect();

        let n = self.recomputations.fetch_add(1, Ordering::Relaxed) + 1;
        let entities: Vec<&str> = accessed.iter().map(|(e, _)| e.as_str()).collect();
        tracing::debug!(recomputations = n, accessed = ?entities, "selector recomputed");

        *self.cache.lock() = Some(CacheEntry {
            args: args.clone(),
            result: result.clone(),
            accessed,
        });
        Ok(result)
    }

    /// Number of times `func` ran to completion.
    pub fn recomputations(&self) -> usize {
        self.recomputations.load(Ordering::Relaxed)
    }

    /// Reset the recomputation counter.
    pub fn reset_recomputations(&self) {
        self.recomputations.store(0, Ordering::Relaxed);
    }

    /// Drop the cached entry.
    pub fn clear_cache(&self) {
        *self.cache.lock() = None;
    }

    /// Schema sessions are opened with.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Entities read by the cached run, if any.
    pub fn dependencies(&self) -> Vec<String> {
        self.cache
            .lock()
            .as_ref()
            .map(|entry| entry.accessed.iter().map(|(e, _)| e.clone()).collect())
            .unwrap_or_default()
    }

    fn lookup(&self, state: &StoreState, args: &A) -> Option<Arc<R>> {
        let cache = self.cache.lock();
        let entry = cache.as_ref()?;
        if !(self.options.args_eq)(&entry.args, args) {
            return None;
        }
        let unchanged = entry
            .accessed
            .iter()
            .all(|(entity, seen)| match (seen, state.table(entity)) {
                (Some(seen), Some(now)) => (self.options.table_eq)(seen, now),
                (None, None) => true,
                _ => false,
            });
        unchanged.then(|| entry.result.clone())
    }
}

impl<A, R, F> Selector<A> for MemoizedSelector<A, R, F>
where
    A: Clone,
    F: Fn(&Session, &A) -> OrmResult<R>,
{
    type Output = Arc<R>;

    fn select(&self, state: &StoreState, args: &A) -> OrmResult<Arc<R>> {
        MemoizedSelector::select(self, state, args)
    }
}

impl<A, R, F> fmt::Debug for MemoizedSelector<A, R, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizedSelector")
            .field("recomputations", &self.recomputations.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
