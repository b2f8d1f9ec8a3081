use dashmap::DashMap;

use super::{FlowSurface, FlowView, FormHost, PageSignals, ResultNotice};
use crate::{
    field::{FieldElement, FieldNaming, FormSnapshot},
    types::FormId,
};

const DEFAULT_CONTROL_LABEL: &str = "Evaluate";

#[derive(Debug, Clone)]
struct FormPage {
    snapshot: FormSnapshot,
    signals: PageSignals,
    incomplete: Vec<String>,
    written: Vec<(String, String)>,
    control_enabled: bool,
    control_label: String,
    control_visible: bool,
    notices: Vec<ResultNotice>,
    flow_views: Vec<FlowView>,
    flow_visible: bool,
}

impl FormPage {
    fn new(form_id: FormId) -> Self {
        Self {
            snapshot: FormSnapshot::new(form_id),
            signals: PageSignals::default(),
            incomplete: Vec::new(),
            written: Vec::new(),
            control_enabled: true,
            control_label: DEFAULT_CONTROL_LABEL.to_string(),
            control_visible: false,
            notices: Vec::new(),
            flow_views: Vec::new(),
            flow_visible: false,
        }
    }
}

/// In-memory stand-in for the host page.
///
/// Records every write so callers can inspect what the orchestrator did.
#[derive(Default)]
pub struct MemoryHost {
    pages: DashMap<FormId, FormPage>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_page<R>(&self, form_id: FormId, f: impl FnOnce(&mut FormPage) -> R) -> R {
        let mut page = self
            .pages
            .entry(form_id)
            .or_insert_with(|| FormPage::new(form_id));
        f(page.value_mut())
    }

    fn read_page<R>(&self, form_id: FormId, f: impl FnOnce(&FormPage) -> R) -> Option<R> {
        self.pages.get(&form_id).map(|page| f(page.value()))
    }

    pub fn load_snapshot(&self, snapshot: FormSnapshot) {
        let form_id = snapshot.form_id;
        self.with_page(form_id, |page| page.snapshot = snapshot);
    }

    pub fn add_element(&self, form_id: FormId, element: FieldElement) {
        self.with_page(form_id, |page| page.snapshot.push(element));
    }

    pub fn set_query_param(&self, form_id: FormId, key: &str, value: &str) {
        self.with_page(form_id, |page| {
            page.signals.query.insert(key.to_string(), value.to_string());
        });
    }

    pub fn set_visible_page_breaks(&self, form_id: FormId, count: usize) {
        self.with_page(form_id, |page| page.signals.visible_page_breaks = count);
    }

    pub fn set_incomplete(&self, form_id: FormId, labels: Vec<String>) {
        self.with_page(form_id, |page| page.incomplete = labels);
    }

    /// Every `(field_id, value)` written, in order.
    pub fn written_fields(&self, form_id: FormId) -> Vec<(String, String)> {
        self.read_page(form_id, |page| page.written.clone())
            .unwrap_or_default()
    }

    pub fn control(&self, form_id: FormId) -> (bool, String) {
        self.read_page(form_id, |page| {
            (page.control_enabled, page.control_label.clone())
        })
        .unwrap_or((true, DEFAULT_CONTROL_LABEL.to_string()))
    }

    pub fn control_visible(&self, form_id: FormId) -> bool {
        self.read_page(form_id, |page| page.control_visible)
            .unwrap_or(false)
    }

    pub fn notices(&self, form_id: FormId) -> Vec<ResultNotice> {
        self.read_page(form_id, |page| page.notices.clone())
            .unwrap_or_default()
    }

    pub fn last_notice(&self, form_id: FormId) -> Option<ResultNotice> {
        self.read_page(form_id, |page| page.notices.last().cloned())
            .flatten()
    }

    pub fn flow_views(&self, form_id: FormId) -> Vec<FlowView> {
        self.read_page(form_id, |page| page.flow_views.clone())
            .unwrap_or_default()
    }

    pub fn last_flow_view(&self, form_id: FormId) -> Option<FlowView> {
        self.read_page(form_id, |page| page.flow_views.last().cloned())
            .flatten()
    }

    pub fn flow_visible(&self, form_id: FormId) -> bool {
        self.read_page(form_id, |page| page.flow_visible)
            .unwrap_or(false)
    }
}

impl FormHost for MemoryHost {
    fn snapshot(&self, form_id: FormId) -> FormSnapshot {
        self.read_page(form_id, |page| page.snapshot.clone())
            .unwrap_or_else(|| FormSnapshot::new(form_id))
    }

    fn incomplete_fields(&self, form_id: FormId) -> Vec<String> {
        self.read_page(form_id, |page| page.incomplete.clone())
            .unwrap_or_default()
    }

    fn write_field(&self, form_id: FormId, field_id: &str, value: &str) {
        self.with_page(form_id, |page| {
            page.written.push((field_id.to_string(), value.to_string()));
            let existing = page
                .snapshot
                .elements
                .iter_mut()
                .find(|e| e.kind.is_value_input() && FieldNaming::is_direct(e, form_id, field_id));
            match existing {
                Some(element) => element.value = value.to_string(),
                None => page.snapshot.push(FieldElement::text(
                    FieldNaming::element_id(form_id, field_id),
                    value,
                )),
            }
        });
    }

    fn page_signals(&self, form_id: FormId) -> PageSignals {
        self.read_page(form_id, |page| page.signals.clone())
            .unwrap_or_default()
    }

    fn control_label(&self, form_id: FormId) -> String {
        self.control(form_id).1
    }

    fn set_control(&self, form_id: FormId, enabled: bool, label: &str) {
        self.with_page(form_id, |page| {
            page.control_enabled = enabled;
            page.control_label = label.to_string();
        });
    }

    fn place_control(&self, form_id: FormId, visible: bool) {
        self.with_page(form_id, |page| page.control_visible = visible);
    }

    fn show_result(&self, form_id: FormId, notice: ResultNotice) {
        self.with_page(form_id, |page| page.notices.push(notice));
    }
}

impl FlowSurface for MemoryHost {
    fn render(&self, form_id: FormId, view: FlowView) {
        self.with_page(form_id, |page| page.flow_views.push(view));
    }

    fn set_visible(&self, form_id: FormId, visible: bool) {
        self.with_page(form_id, |page| page.flow_visible = visible);
    }
}
