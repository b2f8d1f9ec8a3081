//! # Form model
//!
//! Identifiers and the per-form configuration handed over by the host page.
//! A [`FormConfiguration`] is read-only once registered: the orchestrator
//! only ever hands out shared `Arc` references to it.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Identifier of a wizard form on the host page.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FormId(pub u32);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FormId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier of the remote decision configuration evaluated for a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigId(pub i64);

impl fmt::Display for ConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Declared type of an evaluation variable.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum VariableType {
    #[default]
    #[serde(alias = "string")]
    String,
    #[serde(alias = "integer")]
    Integer,
    #[serde(alias = "double")]
    Double,
    #[serde(alias = "boolean")]
    Boolean,
}

/// Association between an evaluation variable and the form field it is read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub source_field_id: String,
    #[serde(default, rename = "type")]
    pub variable_type: VariableType,
}

impl FieldMapping {
    pub fn new(source_field_id: impl Into<String>, variable_type: VariableType) -> Self {
        Self {
            source_field_id: source_field_id.into(),
            variable_type,
        }
    }
}

/// Association between an evaluation output and the form field it is written to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMapping {
    pub target_field_id: String,
}

impl ResultMapping {
    pub fn new(target_field_id: impl Into<String>) -> Self {
        Self {
            target_field_id: target_field_id.into(),
        }
    }
}

/// Per-form configuration provided by the admin layer when the host page renders.
///
/// Mappings are kept in `BTreeMap`s so extraction and result application visit
/// variables in a stable order, which keeps aggregated error messages deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormConfiguration {
    pub form_id: FormId,
    pub config_id: ConfigId,
    #[serde(default)]
    pub field_mappings: BTreeMap<String, FieldMapping>,
    #[serde(default)]
    pub result_mappings: BTreeMap<String, ResultMapping>,
    #[serde(default = "default_evaluation_step")]
    pub evaluation_step: u32,
    #[serde(default)]
    pub use_process: bool,
    #[serde(default)]
    pub show_decision_flow: bool,
}

fn default_evaluation_step() -> u32 {
    1
}

impl FormConfiguration {
    pub fn new(form_id: impl Into<FormId>, config_id: i64) -> Self {
        Self {
            form_id: form_id.into(),
            config_id: ConfigId(config_id),
            field_mappings: BTreeMap::new(),
            result_mappings: BTreeMap::new(),
            evaluation_step: default_evaluation_step(),
            use_process: false,
            show_decision_flow: false,
        }
    }

    pub fn with_field(
        mut self,
        variable: impl Into<String>,
        source_field_id: impl Into<String>,
        variable_type: VariableType,
    ) -> Self {
        self.field_mappings.insert(
            variable.into(),
            FieldMapping::new(source_field_id, variable_type),
        );
        self
    }

    pub fn with_result(
        mut self,
        result: impl Into<String>,
        target_field_id: impl Into<String>,
    ) -> Self {
        self.result_mappings
            .insert(result.into(), ResultMapping::new(target_field_id));
        self
    }

    pub fn with_evaluation_step(mut self, step: u32) -> Self {
        self.evaluation_step = step;
        self
    }

    pub fn with_decision_flow(mut self, use_process: bool, show_decision_flow: bool) -> Self {
        self.use_process = use_process;
        self.show_decision_flow = show_decision_flow;
        self
    }

    /// The page right after the evaluation step, where the decision flow is shown.
    pub fn summary_step(&self) -> u32 {
        self.evaluation_step.saturating_add(1)
    }

    pub fn decision_flow_enabled(&self) -> bool {
        self.show_decision_flow && self.use_process
    }

    pub fn validate(&self) -> Result<(), FormConfigError> {
        if self.evaluation_step == 0 {
            return Err(FormConfigError::InvalidEvaluationStep(self.form_id));
        }
        for (variable, mapping) in &self.field_mappings {
            if mapping.source_field_id.trim().is_empty() {
                return Err(FormConfigError::EmptyFieldMapping {
                    form_id: self.form_id,
                    name: variable.clone(),
                });
            }
        }
        for (result, mapping) in &self.result_mappings {
            if mapping.target_field_id.trim().is_empty() {
                return Err(FormConfigError::EmptyResultMapping {
                    form_id: self.form_id,
                    name: result.clone(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FormConfigError {
    #[error("Form {0}: evaluation step must be 1 or greater")]
    InvalidEvaluationStep(FormId),
    #[error("Form {form_id}: variable '{name}' has no source field")]
    EmptyFieldMapping { form_id: FormId, name: String },
    #[error("Form {form_id}: result '{name}' has no target field")]
    EmptyResultMapping { form_id: FormId, name: String },
}

/// Typed variables built fresh for one evaluation attempt.
pub type EvaluationVariables = HashMap<String, Value>;
