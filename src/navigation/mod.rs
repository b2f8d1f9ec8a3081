//! # Navigation
//!
//! Reacts to wizard page transitions. After the debounce window settles the
//! current page is resolved and compared with the form's evaluation step:
//!
//! - the evaluation page gets the evaluation control
//! - the page after it (the summary page) shows and loads the decision flow,
//!   when the form has both process tracking and decision-flow display on
//! - every other page hides the decision flow, keeping its cached document

pub mod coordinator;
pub mod debounce;
pub mod page;

pub use coordinator::{NavigationAction, NavigationCoordinator};
pub use debounce::Debouncer;
pub use page::{HostPageResolver, PageResolver};
