use std::sync::Arc;

use tracing::trace;

use crate::{
    field::ElementKind,
    host::{FormHost, PageSignals},
    types::FormId,
};

/// Works out which wizard page a form is showing.
#[mockall::automock]
pub trait PageResolver: Send + Sync {
    /// `hint` is the page number carried by the transition event, if any.
    fn current_page(&self, form_id: FormId, hint: Option<u32>) -> u32;
}

fn parse_page(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|page| *page > 0)
}

/// Resolves the page from what the host page exposes, in order:
///
/// 1. the explicit page carried by the event, or the navigation query parameter
/// 2. the hidden page-tracking field maintained by the wizard
/// 3. the number of visible page-break markers
/// 4. page 1
pub struct HostPageResolver {
    host: Arc<dyn FormHost>,
    page_param: String,
    page_field: String,
}

impl HostPageResolver {
    pub fn new(
        host: Arc<dyn FormHost>,
        page_param: impl Into<String>,
        page_field: impl Into<String>,
    ) -> Self {
        Self {
            host,
            page_param: page_param.into(),
            page_field: page_field.into(),
        }
    }

    fn from_param(&self, signals: &PageSignals) -> Option<u32> {
        signals.query.get(&self.page_param).and_then(|raw| parse_page(raw))
    }

    fn from_tracking_field(&self, form_id: FormId) -> Option<u32> {
        let id = format!("{}_{}", self.page_field, form_id);
        self.host
            .snapshot(form_id)
            .elements
            .iter()
            .filter(|e| e.kind == ElementKind::Hidden)
            .find(|e| e.id == id || e.name.as_deref() == Some(self.page_field.as_str()))
            .and_then(|e| parse_page(&e.value))
    }

    fn from_page_breaks(signals: &PageSignals) -> Option<u32> {
        u32::try_from(signals.visible_page_breaks)
            .ok()
            .filter(|count| *count > 0)
    }
}

impl PageResolver for HostPageResolver {
    fn current_page(&self, form_id: FormId, hint: Option<u32>) -> u32 {
        if let Some(page) = hint.filter(|page| *page > 0) {
            return page;
        }
        let signals = self.host.page_signals(form_id);
        let page = self
            .from_param(&signals)
            .or_else(|| self.from_tracking_field(form_id))
            .or_else(|| Self::from_page_breaks(&signals))
            .unwrap_or(1);
        trace!(%form_id, page, "current page resolved");
        page
    }
}
