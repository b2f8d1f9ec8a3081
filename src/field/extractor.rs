use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use super::{
    snapshot::FormSnapshot,
    strategy::{default_strategies, LookupStrategy},
};
use crate::types::{FieldMapping, VariableType};

/// A variable's raw value together with the declared type it must satisfy.
#[derive(Debug, Clone, PartialEq)]
pub struct RawVariable {
    pub value: String,
    pub variable_type: VariableType,
    /// Name of the strategy that produced the value.
    pub source: &'static str,
}

pub type RawVariables = BTreeMap<String, RawVariable>;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    /// Every variable that could not be read, in mapping order.
    #[error("Missing values for: {}", .0.join(", "))]
    Missing(Vec<String>),
}

/// Reads evaluation variables out of a form snapshot through an ordered
/// chain of [`LookupStrategy`]s.
pub struct VariableExtractor {
    strategies: Vec<Box<dyn LookupStrategy>>,
}

impl Default for VariableExtractor {
    fn default() -> Self {
        Self::new(default_strategies())
    }
}

impl VariableExtractor {
    pub fn new(strategies: Vec<Box<dyn LookupStrategy>>) -> Self {
        Self { strategies }
    }

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<(String, &'static str)> {
        self.strategies.iter().find_map(|strategy| {
            strategy
                .lookup(snapshot, field_id)
                .map(|value| (value, strategy.name()))
        })
    }

    /// Extracts every mapped variable, or reports all of the missing ones.
    pub fn extract(
        &self,
        snapshot: &FormSnapshot,
        mappings: &BTreeMap<String, FieldMapping>,
    ) -> Result<RawVariables, ExtractionError> {
        let mut variables = RawVariables::new();
        let mut missing = Vec::new();

        for (name, mapping) in mappings {
            match self.lookup(snapshot, &mapping.source_field_id) {
                Some((value, source)) => {
                    debug!(
                        form_id = %snapshot.form_id,
                        variable = %name,
                        field_id = %mapping.source_field_id,
                        source,
                        "variable extracted"
                    );
                    variables.insert(
                        name.clone(),
                        RawVariable {
                            value,
                            variable_type: mapping.variable_type,
                            source,
                        },
                    );
                }
                None => missing.push(name.clone()),
            }
        }

        if missing.is_empty() {
            Ok(variables)
        } else {
            Err(ExtractionError::Missing(missing))
        }
    }
}
