//! Selector composition
//!
//! A [`ComposedSelector`] runs a tuple of input selectors, then feeds their
//! outputs (as one tuple) to a memoized combining function. Only the
//! combiner's own table reads are tracked; inputs keep whatever caching
//! they have themselves.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use strata_orm_core::OrmResult;
use strata_orm_engine::Session;
use strata_orm_storage::StoreState;

use crate::memoize::MemoizedSelector;
use crate::Selector;

/// A tuple of selectors over the same arguments.
pub trait InputSelectors<A> {
    /// Tuple of the input outputs.
    type Values;

    /// Run every input, in order.
    fn select_all(&self, state: &StoreState, args: &A) -> OrmResult<Self::Values>;
}

macro_rules! impl_input_selectors {
    ($($name:ident : $idx:tt),+) => {
        impl<A, $($name),+> InputSelectors<A> for ($($name,)+)
        where
            $($name: Selector<A>,)+
        {
            type Values = ($(<$name as Selector<A>>::Output,)+);

            fn select_all(&self, state: &StoreState, args: &A) -> OrmResult<Self::Values> {
                Ok(($(self.$idx.select(state, args)?,)+))
            }
        }
    };
}

impl_input_selectors!(S1: 0);
impl_input_selectors!(S1: 0, S2: 1);
impl_input_selectors!(S1: 0, S2: 1, S3: 2);
impl_input_selectors!(S1: 0, S2: 1, S3: 2, S4: 3);

/// Input selectors feeding a memoized combiner.
pub struct ComposedSelector<A, I, R, F>
where
    I: InputSelectors<A>,
{
    inputs: I,
    combiner: MemoizedSelector<I::Values, R, F>,
    _args: PhantomData<fn(&A)>,
}

impl<A, I, R, F> ComposedSelector<A, I, R, F>
where
    I: InputSelectors<A>,
    I::Values: Clone,
    F: Fn(&Session, &I::Values) -> OrmResult<R>,
{
    pub(crate) fn new(inputs: I, combiner: MemoizedSelector<I::Values, R, F>) -> Self {
        ComposedSelector {
            inputs,
            combiner,
            _args: PhantomData,
        }
    }

    /// Run the inputs, then the combiner (from cache when possible).
    pub fn select(&self, state: &StoreState, args: &A) -> OrmResult<Arc<R>> {
        let values = self.inputs.select_all(state, args)?;
        self.combiner.select(state, &values)
    }

    /// The memoized combining stage.
    pub fn combiner(&self) -> &MemoizedSelector<I::Values, R, F> {
        &self.combiner
    }

    /// Number of times the combiner ran.
    pub fn recomputations(&self) -> usize {
        self.combiner.recomputations()
    }
}

impl<A, I, R, F> Selector<A> for ComposedSelector<A, I, R, F>
where
    I: InputSelectors<A>,
    I::Values: Clone,
    F: Fn(&Session, &I::Values) -> OrmResult<R>,
{
    type Output = Arc<R>;

    fn select(&self, state: &StoreState, args: &A) -> OrmResult<Arc<R>> {
        ComposedSelector::select(self, state, args)
    }
}

impl<A, I, R, F> fmt::Debug for ComposedSelector<A, I, R, F>
where
    I: InputSelectors<A>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedSelector")
            .field("combiner", &self.combiner)
            .finish_non_exhaustive()
    }
}
