//! # Field extraction
//!
//! Turns the host form's field state into named evaluation variables.
//! [`snapshot`] models the field state, [`strategy`] the ordered lookup
//! strategies and [`extractor`] the mapping-driven extraction.

pub mod extractor;
pub mod snapshot;
pub mod strategy;

pub use extractor::{ExtractionError, RawVariable, RawVariables, VariableExtractor};
pub use snapshot::{ElementKind, FieldElement, FieldNaming, FormSnapshot};
pub use strategy::LookupStrategy;
