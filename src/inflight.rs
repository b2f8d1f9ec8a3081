//! Per-form single-flight tracking.
//!
//! A form holds at most one slot at a time; the slot is released when the
//! returned guard drops, including when the owning future is cancelled.

use dashmap::DashSet;

use crate::types::FormId;

#[derive(Debug, Default)]
pub struct InFlightSet {
    forms: DashSet<FormId>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `form_id`, or `None` when it is already taken.
    pub fn try_begin(&self, form_id: FormId) -> Option<InFlightGuard<'_>> {
        if self.forms.insert(form_id) {
            Some(InFlightGuard { set: self, form_id })
        } else {
            None
        }
    }

    pub fn contains(&self, form_id: FormId) -> bool {
        self.forms.contains(&form_id)
    }
}

#[must_use = "the slot is released as soon as the guard drops"]
pub struct InFlightGuard<'a> {
    set: &'a InFlightSet,
    form_id: FormId,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.forms.remove(&self.form_id);
    }
}
