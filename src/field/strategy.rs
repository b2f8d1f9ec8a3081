//! # Field lookup strategies
//!
//! Each strategy is a pure `(snapshot, field_id) -> Option<String>` lookup.
//! The extractor tries them in order and stops at the first value found:
//!
//! 1. [`DirectMatch`] - conventional `input_{form}_{field}` / `input_{field}` elements
//! 2. [`CompositeMatch`] - multi-part fields, serialized as one JSON object
//! 3. [`ChoiceMatch`] - checked radio / checkbox options
//! 4. [`FileMatch`] - uploaded file name
//! 5. [`FuzzyMatch`] - any element whose id or name carries the field id as a token

use std::collections::BTreeMap;

use super::snapshot::{ElementKind, FieldNaming, FormSnapshot};

pub trait LookupStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<String>;
}

/// Plain inputs, selects, textareas and hidden inputs addressed by convention.
pub struct DirectMatch;

impl LookupStrategy for DirectMatch {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<String> {
        snapshot
            .elements
            .iter()
            .filter(|e| e.kind.is_value_input())
            .filter(|e| FieldNaming::is_direct(e, snapshot.form_id, field_id))
            .find_map(|e| e.effective_value())
            .map(str::to_string)
    }
}

/// Fields split over several sub-inputs (name parts, address lines, ...).
///
/// When at least one sub-input has a value, every sub-input is serialized
/// into a JSON object keyed by its sub-id, empty ones included.
pub struct CompositeMatch;

impl LookupStrategy for CompositeMatch {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<String> {
        let prefix = FieldNaming::sub_field_prefix(snapshot.form_id, field_id);
        let parts: BTreeMap<&str, &str> = snapshot
            .elements
            .iter()
            .filter(|e| e.kind.is_value_input())
            .filter_map(|e| {
                e.id.strip_prefix(&prefix)
                    .filter(|sub| !sub.is_empty())
                    .map(|sub| (sub, e.value.trim()))
            })
            .collect();

        if parts.values().all(|v| v.is_empty()) {
            return None;
        }
        serde_json::to_string(&parts).ok()
    }
}

/// Radio groups and checkbox lists; only checked options count.
///
/// Several checked options are joined with a comma.
pub struct ChoiceMatch;

impl LookupStrategy for ChoiceMatch {
    fn name(&self) -> &'static str {
        "choice"
    }

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<String> {
        let choice_prefix = FieldNaming::choice_prefix(snapshot.form_id, field_id);
        let sub_prefix = FieldNaming::sub_field_prefix(snapshot.form_id, field_id);
        let name = FieldNaming::element_name(field_id);
        let name_prefix = format!("{}.", name);

        let checked: Vec<&str> = snapshot
            .elements
            .iter()
            .filter(|e| e.kind.is_choice())
            .filter(|e| {
                e.id.starts_with(&choice_prefix)
                    || e.id.starts_with(&sub_prefix)
                    || e.name
                        .as_deref()
                        .is_some_and(|n| n == name || n.starts_with(&name_prefix))
            })
            .filter_map(|e| e.effective_value())
            .collect();

        (!checked.is_empty()).then(|| checked.join(","))
    }
}

/// File uploads contribute the uploaded file's name; content is never read.
pub struct FileMatch;

impl LookupStrategy for FileMatch {
    fn name(&self) -> &'static str {
        "file"
    }

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<String> {
        snapshot
            .elements
            .iter()
            .filter(|e| e.kind == ElementKind::File)
            .filter(|e| FieldNaming::is_direct(e, snapshot.form_id, field_id))
            .find_map(|e| e.effective_value())
            .map(str::to_string)
    }
}

/// Last resort: any element whose id or name contains the field id as a token.
///
/// Elements that the naming convention assigns to another field are skipped.
pub struct FuzzyMatch;

impl FuzzyMatch {
    fn has_token(identifier: &str, field_id: &str) -> bool {
        identifier
            .split(|c: char| !c.is_ascii_alphanumeric())
            .any(|token| token == field_id)
    }
}

impl LookupStrategy for FuzzyMatch {
    fn name(&self) -> &'static str {
        "fuzzy"
    }

    fn lookup(&self, snapshot: &FormSnapshot, field_id: &str) -> Option<String> {
        snapshot
            .elements
            .iter()
            .filter(|e| {
                FieldNaming::owning_field(e, snapshot.form_id)
                    .map_or(true, |owner| owner == field_id)
            })
            .filter(|e| {
                Self::has_token(&e.id, field_id)
                    || e.name.as_deref().is_some_and(|n| Self::has_token(n, field_id))
            })
            .find_map(|e| e.effective_value())
            .map(str::to_string)
    }
}

/// The standard ordered chain.
pub fn default_strategies() -> Vec<Box<dyn LookupStrategy>> {
    vec![
        Box::new(DirectMatch),
        Box::new(CompositeMatch),
        Box::new(ChoiceMatch),
        Box::new(FileMatch),
        Box::new(FuzzyMatch),
    ]
}
