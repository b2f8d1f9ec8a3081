//! # Decision-flow cache
//!
//! Fetches, caches and renders the decision-flow document of each form.
//!
//! ## Load algorithm
//!
//! 1. A load already running for the form makes the call a no-op.
//! 2. Unless forced, a cached document younger than the cache timeout is
//!    rendered without a network call. Expiry is checked on access only.
//! 3. Without a process instance for the form a placeholder is rendered and
//!    nothing is fetched.
//! 4. Otherwise the document is fetched. Transport and server failures are
//!    retried within the [`RetryPolicy`] budget, waiting `base × attempt`
//!    between attempts, before the error view is rendered.

pub mod cache;
pub mod manager;
pub mod retry;

pub use cache::{CacheEntry, DecisionFlowCache, FlowState};
pub use manager::{DecisionFlowManager, LoadOutcome};
pub use retry::RetryPolicy;
