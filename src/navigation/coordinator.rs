use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use super::{debounce::Debouncer, page::PageResolver};
use crate::{
    decision_flow::DecisionFlowManager, host::FormHost, registry::FormRegistry, types::FormId,
};

/// What a settled page transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationAction {
    /// The evaluation page: the control was placed on it.
    ShowControl { page: u32 },
    /// The summary page of a form with decision flow enabled.
    LoadDecisionFlow { page: u32 },
    HideDecisionFlow { page: u32 },
    /// The form is not registered.
    Ignored,
}

pub struct NavigationCoordinator {
    registry: Arc<FormRegistry>,
    host: Arc<dyn FormHost>,
    resolver: Arc<dyn PageResolver>,
    flow: Arc<DecisionFlowManager>,
    debouncer: Debouncer,
    load_delay: Duration,
}

impl NavigationCoordinator {
    pub fn new(
        registry: Arc<FormRegistry>,
        host: Arc<dyn FormHost>,
        resolver: Arc<dyn PageResolver>,
        flow: Arc<DecisionFlowManager>,
        debounce_window: Duration,
        load_delay: Duration,
    ) -> Self {
        Self {
            registry,
            host,
            resolver,
            flow,
            debouncer: Debouncer::new(debounce_window),
            load_delay,
        }
    }

    /// Entry point for transition events. Bursts within the debounce window
    /// collapse into the last event.
    pub fn on_transition(self: &Arc<Self>, form_id: FormId, hint: Option<u32>) {
        if !self.registry.contains(form_id) {
            trace!(%form_id, "transition for untracked form ignored");
            return;
        }
        let coordinator = Arc::clone(self);
        self.debouncer.schedule(form_id, async move {
            coordinator.apply(form_id, hint).await;
        });
    }

    /// Acts on the page the form is showing now.
    ///
    /// On the summary page this waits for the post-transition delay, then
    /// starts the load on its own task so a later transition cannot cut a
    /// fetch short.
    #[tracing::instrument(skip(self))]
    pub async fn apply(&self, form_id: FormId, hint: Option<u32>) -> NavigationAction {
        let Ok(config) = self.registry.get(form_id) else {
            return NavigationAction::Ignored;
        };
        let page = self.resolver.current_page(form_id, hint);

        self.host
            .place_control(form_id, page == config.evaluation_step);

        if page == config.evaluation_step {
            self.flow.hide(form_id);
            debug!(%form_id, page, "on evaluation page");
            return NavigationAction::ShowControl { page };
        }

        if page == config.summary_step() && config.decision_flow_enabled() {
            self.flow.show(form_id);
            tokio::time::sleep(self.load_delay).await;
            let flow = Arc::clone(&self.flow);
            tokio::spawn(async move { flow.load(form_id, false).await });
            debug!(%form_id, page, "on summary page, decision flow load started");
            return NavigationAction::LoadDecisionFlow { page };
        }

        self.flow.hide(form_id);
        NavigationAction::HideDecisionFlow { page }
    }

    pub fn cancel_pending(&self, form_id: FormId) {
        self.debouncer.cancel(form_id);
    }
}
