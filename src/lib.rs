//! # dmnform: Decision-Service Wizard Orchestration
//!
//! dmnform drives a multi-step wizard form through a remote business-rule
//! ("decision") evaluation service, and caches the decision-flow document that
//! explains how an evaluation was reached.
//!
//! ## Components
//!
//! ### 1. Field Extraction
//! Form field values become named, typed evaluation variables:
//! - Field snapshot and lookup strategies ([`field`])
//! - Type validation and coercion ([`validator`])
//!
//! ### 2. Evaluation Dispatch
//! One evaluation per form at a time, with results written back into the form:
//! - Dispatcher ([`dispatcher`])
//! - Decision service client ([`client`])
//!
//! ### 3. Decision-Flow Cache
//! The decision-flow document of each form, fetched with bounded retries and
//! served from a time-bounded cache ([`decision_flow`]).
//!
//! ### 4. Navigation
//! Page transitions decide where the evaluation control sits and when the
//! decision flow is shown, loaded or hidden ([`navigation`]).
//!
//! ## Processing Pipeline
//!
//! ```text
//! page transition → Navigation ─┬─ evaluation page → control placed
//!                               ├─ summary page    → Decision-Flow load → render
//!                               └─ other pages     → hide
//!
//! evaluate request → extract → validate → POST evaluate → apply results → reload flow
//! ```
//!
//! ## Wiring
//!
//! An [`Orchestrator`] is built once per page load from an
//! [`OrchestratorConfig`], a [`client::DecisionClient`] and the host page
//! ([`host::FormHost`], [`host::FlowSurface`]). The host registers its forms
//! and publishes [`event_bus::FormEvent`]s; everything else follows from those
//! events.

pub mod client;
pub mod config;
pub mod decision_flow;
pub mod dispatcher;
pub mod error;
pub mod event_bus;
pub mod field;
pub mod host;
pub mod inflight;
pub mod navigation;
pub mod orchestrator;
pub mod registry;
pub mod timestamp;
pub mod types;
pub mod validator;

// Re-exports
pub use config::OrchestratorConfig;
pub use error::*;
pub use orchestrator::Orchestrator;
pub use types::{ConfigId, FormConfiguration, FormId, VariableType};

#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
