//! # Evaluation Dispatcher
//!
//! Runs one evaluation for a form:
//!
//! ```text
//! busy guard → form completeness → extract → validate → POST evaluate → apply results
//! ```
//!
//! At most one evaluation per form is in flight; a second request while one is
//! running is refused with [`EvaluationError::Busy`], never queued. The
//! evaluation control is disabled for the duration of the call and restored
//! by a drop guard, so success, failure and cancellation all leave it usable.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    client::{ClientError, DecisionClient, EvaluateRequest, EvaluateResponse, FailureKind},
    decision_flow::DecisionFlowManager,
    field::{ExtractionError, VariableExtractor},
    host::{AppliedResult, FormHost, ResultNotice},
    inflight::InFlightSet,
    registry::FormRegistry,
    types::{FormConfiguration, FormId, VariableType},
    validator::{self, TypeMismatch},
};

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Form {0} is not registered")]
    UnknownForm(FormId),
    #[error("An evaluation is already running for form {0}")]
    Busy(FormId),
    #[error("Required fields are incomplete: {}", .0.join(", "))]
    Incomplete(Vec<String>),
    #[error("Missing values for: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
    #[error("Invalid values: {}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    TypeMismatch(Vec<TypeMismatch>),
    #[error("Evaluation failed ({kind})")]
    Remote {
        kind: FailureKind,
        #[source]
        source: ClientError,
    },
}

impl From<ClientError> for EvaluationError {
    fn from(source: ClientError) -> Self {
        EvaluationError::Remote {
            kind: source.kind(),
            source,
        }
    }
}

impl From<ExtractionError> for EvaluationError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::Missing(names) => EvaluationError::MissingVariables(names),
        }
    }
}

fn describe(variable_type: VariableType) -> &'static str {
    match variable_type {
        VariableType::String => "text",
        VariableType::Integer => "a whole number",
        VariableType::Double => "a number",
        VariableType::Boolean => "yes or no",
    }
}

impl EvaluationError {
    /// Message for the person filling in the form.
    pub fn user_message(&self) -> String {
        match self {
            EvaluationError::UnknownForm(_) => {
                "This form is not set up for evaluation.".to_string()
            }
            EvaluationError::Busy(_) => {
                "An evaluation is already in progress. Please wait for it to finish.".to_string()
            }
            EvaluationError::Incomplete(labels) => {
                format!("Please complete the following fields: {}.", labels.join(", "))
            }
            EvaluationError::MissingVariables(names) => format!(
                "Please fill in the following fields before evaluating: {}.",
                names.join(", ")
            ),
            EvaluationError::TypeMismatch(mismatches) => format!(
                "Please correct the following fields: {}.",
                mismatches
                    .iter()
                    .map(|m| format!("{} (expected {})", m.variable, describe(m.expected)))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            EvaluationError::Remote { kind, .. } => kind.user_message().to_string(),
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            EvaluationError::Remote { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

pub type EvaluationResult<T> = Result<T, EvaluationError>;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationOutcome {
    pub form_id: FormId,
    pub applied: Vec<AppliedResult>,
    pub process_instance_id: Option<String>,
}

/// Disables the evaluation control and restores it on drop.
struct ControlGuard<'a> {
    host: &'a dyn FormHost,
    form_id: FormId,
    label: String,
}

impl<'a> ControlGuard<'a> {
    fn engage(host: &'a dyn FormHost, form_id: FormId, busy_label: &str) -> Self {
        let label = host.control_label(form_id);
        host.set_control(form_id, false, busy_label);
        Self {
            host,
            form_id,
            label,
        }
    }
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.host.set_control(self.form_id, true, &self.label);
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

pub struct EvaluationDispatcher {
    registry: Arc<FormRegistry>,
    host: Arc<dyn FormHost>,
    client: Arc<dyn DecisionClient>,
    flow: Arc<DecisionFlowManager>,
    extractor: VariableExtractor,
    in_flight: InFlightSet,
    busy_label: String,
}

impl EvaluationDispatcher {
    pub fn new(
        registry: Arc<FormRegistry>,
        host: Arc<dyn FormHost>,
        client: Arc<dyn DecisionClient>,
        flow: Arc<DecisionFlowManager>,
        busy_label: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            host,
            client,
            flow,
            extractor: VariableExtractor::default(),
            in_flight: InFlightSet::new(),
            busy_label: busy_label.into(),
        }
    }

    pub fn with_extractor(mut self, extractor: VariableExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn is_busy(&self, form_id: FormId) -> bool {
        self.in_flight.contains(form_id)
    }

    /// Evaluates `form_id` and reports the outcome in its result-display area.
    #[tracing::instrument(skip(self))]
    pub async fn evaluate(&self, form_id: FormId) -> EvaluationResult<EvaluationOutcome> {
        let config = self
            .registry
            .get(form_id)
            .map_err(|_| EvaluationError::UnknownForm(form_id))?;

        let Some(_in_flight) = self.in_flight.try_begin(form_id) else {
            let error = EvaluationError::Busy(form_id);
            debug!(%form_id, "evaluation refused, one is already running");
            self.host
                .show_result(form_id, ResultNotice::Busy(error.user_message()));
            return Err(error);
        };

        let result = {
            let _control = ControlGuard::engage(self.host.as_ref(), form_id, &self.busy_label);
            self.run(&config).await
        };

        match &result {
            Ok(outcome) => {
                info!(%form_id, applied = outcome.applied.len(), "evaluation applied");
                self.host
                    .show_result(form_id, ResultNotice::Applied(outcome.applied.clone()));
                if config.decision_flow_enabled() {
                    self.flow.clone().reload_in_background(form_id);
                }
            }
            Err(error) => {
                match error {
                    EvaluationError::Remote { source, .. } => {
                        warn!(%form_id, error = %source, "evaluation call failed")
                    }
                    other => debug!(%form_id, error = %other, "evaluation not dispatched"),
                }
                self.host
                    .show_result(form_id, ResultNotice::Failed(error.user_message()));
            }
        }
        result
    }

    async fn run(&self, config: &FormConfiguration) -> EvaluationResult<EvaluationOutcome> {
        let form_id = config.form_id;

        let incomplete = self.host.incomplete_fields(form_id);
        if !incomplete.is_empty() {
            return Err(EvaluationError::Incomplete(incomplete));
        }

        let snapshot = self.host.snapshot(form_id);
        let raw = self.extractor.extract(&snapshot, &config.field_mappings)?;
        let variables = validator::coerce_all(&raw).map_err(EvaluationError::TypeMismatch)?;

        let request = EvaluateRequest {
            config_id: config.config_id,
            variables,
        };
        let response = self.client.evaluate(&request).await?;

        if let Some(token) = &response.process_instance_id {
            self.registry.set_process_instance(form_id, token.clone());
        }

        Ok(EvaluationOutcome {
            form_id,
            applied: self.apply_results(config, &response),
            process_instance_id: response.process_instance_id,
        })
    }

    /// Writes every mapped result present in the response; fields without a
    /// mapped result are left untouched.
    fn apply_results(
        &self,
        config: &FormConfiguration,
        response: &EvaluateResponse,
    ) -> Vec<AppliedResult> {
        config
            .result_mappings
            .iter()
            .filter_map(|(name, mapping)| {
                let value = display_value(response.value_of(name)?);
                self.host
                    .write_field(config.form_id, &mapping.target_field_id, &value);
                Some(AppliedResult {
                    result: name.clone(),
                    field_id: mapping.target_field_id.clone(),
                    value,
                })
            })
            .collect()
    }
}
