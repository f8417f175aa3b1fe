//! ORM Comprehensive Test Suite
//!
//! End-to-end checks of the public `strata_orm` surface.
//!
//! ## Test Tiers
//!
//! - **Tier 1**: Immutability and structural sharing
//! - **Tier 2**: Facade message contract (shapes, relation diffing, equality)
//! - **Tier 3**: Reducer behaviour (round-trip, failures, custom messages)
//! - **Tier 4**: Memoized selector soundness
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test orm_comprehensive
//! ```

// Test modules
mod test_utils;

// Tier 1: Immutability
mod tier1_immutability;

// Tier 2: Message contract
mod tier2_message_contract;

// Tier 3: Reducer behaviour
mod tier3_reducer;

// Tier 4: Selector soundness
mod tier4_selector_soundness;
