//! Forms registered on the current page, and the process-instance tokens
//! their evaluations produced.

use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::debug;

use crate::types::{FormConfigError, FormConfiguration, FormId};

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("Form {0} is already registered")]
    AlreadyRegistered(FormId),
    #[error("Form {0} is not registered")]
    UnknownForm(FormId),
    #[error(transparent)]
    InvalidConfiguration(#[from] FormConfigError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Default)]
pub struct FormRegistry {
    forms: DashMap<FormId, Arc<FormConfiguration>>,
    process_instances: DashMap<FormId, String>,
}

impl FormRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a validated configuration. A form is registered once per page;
    /// its configuration cannot be replaced afterwards.
    pub fn register(&self, config: FormConfiguration) -> RegistryResult<Arc<FormConfiguration>> {
        config.validate()?;
        let form_id = config.form_id;
        match self.forms.entry(form_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RegistryError::AlreadyRegistered(form_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let config = Arc::new(config);
                slot.insert(config.clone());
                debug!(%form_id, "form registered");
                Ok(config)
            }
        }
    }

    pub fn get(&self, form_id: FormId) -> RegistryResult<Arc<FormConfiguration>> {
        self.forms
            .get(&form_id)
            .map(|entry| entry.value().clone())
            .ok_or(RegistryError::UnknownForm(form_id))
    }

    pub fn contains(&self, form_id: FormId) -> bool {
        self.forms.contains_key(&form_id)
    }

    pub fn form_ids(&self) -> Vec<FormId> {
        let mut ids: Vec<_> = self.forms.iter().map(|entry| *entry.key()).collect();
        ids.sort();
        ids
    }

    pub fn set_process_instance(&self, form_id: FormId, token: impl Into<String>) {
        self.process_instances.insert(form_id, token.into());
    }

    pub fn process_instance(&self, form_id: FormId) -> Option<String> {
        self.process_instances
            .get(&form_id)
            .map(|entry| entry.value().clone())
    }
}
