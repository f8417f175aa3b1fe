//! Memoized selectors for the Strata ORM
//!
//! Derived views over a [`StoreState`] that recompute only when a table
//! they actually read has been replaced.
//!
//! ```ignore
//! let titles = create_selector(schema.clone(), |session: &Session, _: &()| {
//!     session.class("Book")?.access_list(session)
//! });
//! let a = titles.select(&state, &())?;
//! let b = titles.select(&state_after_tag_write, &())?; // cached, same Arc
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compose;
pub mod memoize;

pub use compose::{ComposedSelector, InputSelectors};
pub use memoize::{ArgsEq, MemoizeOptions, MemoizedSelector, TableEq};

use std::sync::Arc;

use strata_orm_core::OrmResult;
use strata_orm_engine::{Schema, Session};
use strata_orm_storage::StoreState;

/// Anything that derives a value from a store state and arguments.
///
/// Implemented by memoized and composed selectors, and by plain functions
/// `Fn(&StoreState, &A) -> T` so those can serve as composition inputs.
pub trait Selector<A> {
    /// Derived value.
    type Output;

    /// Derive the value for `state` and `args`.
    fn select(&self, state: &StoreState, args: &A) -> OrmResult<Self::Output>;
}

impl<A, T, F> Selector<A> for F
where
    F: Fn(&StoreState, &A) -> T,
{
    type Output = T;

    fn select(&self, state: &StoreState, args: &A) -> OrmResult<T> {
        Ok(self(state, args))
    }
}

/// Memoize a single derivation `f(&Session, &args)`.
pub fn create_selector<A, R, F>(schema: Arc<Schema>, f: F) -> MemoizedSelector<A, R, F>
where
    A: Clone + PartialEq + 'static,
    F: Fn(&Session, &A) -> OrmResult<R>,
{
    MemoizedSelector::new(schema, f)
}

/// Memoize a single derivation with custom equality checks.
pub fn create_selector_with_options<A, R, F>(
    schema: Arc<Schema>,
    f: F,
    options: MemoizeOptions<A>,
) -> MemoizedSelector<A, R, F>
where
    A: Clone,
    F: Fn(&Session, &A) -> OrmResult<R>,
{
    MemoizedSelector::with_options(schema, f, options)
}

/// Compose input selectors with a memoized combining function.
///
/// The combiner receives the tuple of input outputs.
pub fn create_selector_with<A, I, R, F>(
    schema: Arc<Schema>,
    inputs: I,
    combiner: F,
) -> ComposedSelector<A, I, R, F>
where
    I: InputSelectors<A>,
    I::Values: Clone + PartialEq + 'static,
    F: Fn(&Session, &I::Values) -> OrmResult<R>,
{
    ComposedSelector::new(inputs, MemoizedSelector::new(schema, combiner))
}
