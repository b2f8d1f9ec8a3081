//! Point-in-time view of a form's input elements, as read from the host page.

use serde::{Deserialize, Serialize};

use crate::types::FormId;

/// Kind of input element backing a form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ElementKind {
    #[default]
    Text,
    Select,
    Textarea,
    Hidden,
    Radio,
    Checkbox,
    File,
}

impl ElementKind {
    /// Elements whose `value` is meaningful only when checked.
    pub fn is_choice(&self) -> bool {
        matches!(self, ElementKind::Radio | ElementKind::Checkbox)
    }

    /// Elements that carry a free value directly.
    pub fn is_value_input(&self) -> bool {
        matches!(
            self,
            ElementKind::Text | ElementKind::Select | ElementKind::Textarea | ElementKind::Hidden
        )
    }
}

/// A single input element on the host page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldElement {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub kind: ElementKind,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub file_name: Option<String>,
}

impl FieldElement {
    pub fn new(id: impl Into<String>, kind: ElementKind, value: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn text(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(id, ElementKind::Text, value)
    }

    pub fn choice(
        id: impl Into<String>,
        kind: ElementKind,
        value: impl Into<String>,
        checked: bool,
    ) -> Self {
        Self {
            checked,
            ..Self::new(id, kind, value)
        }
    }

    pub fn file(id: impl Into<String>, file_name: Option<&str>) -> Self {
        Self {
            file_name: file_name.map(str::to_string),
            ..Self::new(id, ElementKind::File, "")
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The value this element currently contributes, if any.
    ///
    /// Unchecked choices contribute nothing; file inputs contribute the
    /// uploaded file's name.
    pub fn effective_value(&self) -> Option<&str> {
        let value = match self.kind {
            ElementKind::Radio | ElementKind::Checkbox if !self.checked => return None,
            ElementKind::File => self.file_name.as_deref()?,
            _ => self.value.as_str(),
        };
        let value = value.trim();
        (!value.is_empty()).then_some(value)
    }
}

/// All input elements of one form at the moment of reading.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    pub form_id: FormId,
    #[serde(default)]
    pub elements: Vec<FieldElement>,
}

impl FormSnapshot {
    pub fn new(form_id: impl Into<FormId>) -> Self {
        Self {
            form_id: form_id.into(),
            elements: Vec::new(),
        }
    }

    pub fn with_element(mut self, element: FieldElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn push(&mut self, element: FieldElement) {
        self.elements.push(element);
    }
}

/// Host naming conventions for field elements.
///
/// A field `3` of form `9` is rendered as `input_9_3` (name `input_3`),
/// its sub-inputs as `input_9_3_1`, `input_9_3_2`, ... and its choice
/// options as `choice_9_3_0`, `choice_9_3_1`, ...
pub struct FieldNaming;

impl FieldNaming {
    pub fn element_id(form_id: FormId, field_id: &str) -> String {
        format!("input_{}_{}", form_id, field_id)
    }

    pub fn element_name(field_id: &str) -> String {
        format!("input_{}", field_id)
    }

    pub fn sub_field_prefix(form_id: FormId, field_id: &str) -> String {
        format!("input_{}_{}_", form_id, field_id)
    }

    pub fn choice_prefix(form_id: FormId, field_id: &str) -> String {
        format!("choice_{}_{}_", form_id, field_id)
    }

    /// Whether `element` is addressed directly as field `field_id`.
    pub fn is_direct(element: &FieldElement, form_id: FormId, field_id: &str) -> bool {
        element.id == Self::element_id(form_id, field_id)
            || element.name.as_deref() == Some(Self::element_name(field_id).as_str())
    }

    /// The field an element belongs to by convention, if its id or name
    /// follows one.
    pub fn owning_field(element: &FieldElement, form_id: FormId) -> Option<&str> {
        let input = format!("input_{}_", form_id);
        let choice = format!("choice_{}_", form_id);
        let by_id = element
            .id
            .strip_prefix(input.as_str())
            .or_else(|| element.id.strip_prefix(choice.as_str()))
            .and_then(|rest| rest.split('_').next());
        let owner = by_id.or_else(|| {
            element
                .name
                .as_deref()
                .and_then(|name| name.strip_prefix("input_"))
                .and_then(|rest| rest.split(['.', '_']).next())
        });
        owner.filter(|field| !field.is_empty())
    }
}
