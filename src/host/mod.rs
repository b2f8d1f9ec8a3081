//! # Host boundary
//!
//! Everything the orchestrator reads from or writes to the host page goes
//! through these traits: field state, the evaluation control, the
//! result-display area and the decision-flow container. [`memory::MemoryHost`]
//! is an in-memory implementation used by the CLI and by tests.

pub mod memory;

use std::collections::HashMap;

use serde::Serialize;

use crate::{field::FormSnapshot, timestamp::Timestamp, types::FormId};

pub use memory::MemoryHost;

/// Raw inputs for working out which wizard page is showing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSignals {
    /// Query parameters of the current page address.
    pub query: HashMap<String, String>,
    /// Number of page-break markers currently visible.
    pub visible_page_breaks: usize,
}

/// A result written into a form field after an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedResult {
    pub result: String,
    pub field_id: String,
    pub value: String,
}

/// Content of the result-display area next to the evaluation control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ResultNotice {
    Applied(Vec<AppliedResult>),
    Failed(String),
    Busy(String),
}

/// What the decision-flow container shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FlowView {
    Loading { attempt: u32 },
    /// No process instance yet, so there is nothing to fetch.
    AwaitingProcess,
    NoData,
    Content {
        html: String,
        fetched_at: Timestamp,
        refreshable: bool,
    },
    Error { attempts: u32, refreshable: bool },
}

/// Field state and the evaluation control of the host wizard.
pub trait FormHost: Send + Sync {
    /// Field state as of now.
    fn snapshot(&self, form_id: FormId) -> FormSnapshot;

    /// Labels of required fields the host considers incomplete.
    fn incomplete_fields(&self, form_id: FormId) -> Vec<String>;

    /// Sets a field's value and marks it changed.
    fn write_field(&self, form_id: FormId, field_id: &str, value: &str);

    fn page_signals(&self, form_id: FormId) -> PageSignals;

    fn control_label(&self, form_id: FormId) -> String;

    fn set_control(&self, form_id: FormId, enabled: bool, label: &str);

    /// Shows the evaluation control on the current page, or hides it.
    fn place_control(&self, form_id: FormId, visible: bool);

    fn show_result(&self, form_id: FormId, notice: ResultNotice);
}

/// The decision-flow container of a form.
pub trait FlowSurface: Send + Sync {
    fn render(&self, form_id: FormId, view: FlowView);

    fn set_visible(&self, form_id: FormId, visible: bool);
}
