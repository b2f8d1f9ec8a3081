//! # Orchestrator
//!
//! One [`Orchestrator`] per page load owns all shared state: the form
//! registry, the event bus, the evaluation busy set and the decision-flow
//! cache. Registering a form subscribes its handlers on the bus; the host then
//! drives everything by publishing [`FormEvent`]s.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::{
    client::{DecisionClient, HttpDecisionClient},
    config::OrchestratorConfig,
    decision_flow::{CacheEntry, DecisionFlowManager, FlowState, LoadOutcome, RetryPolicy},
    dispatcher::{EvaluationDispatcher, EvaluationOutcome, EvaluationResult},
    error::InternalResult,
    event_bus::{EventBus, EventReceiver, FormEvent},
    host::{FlowSurface, FormHost},
    navigation::{HostPageResolver, NavigationAction, NavigationCoordinator, PageResolver},
    registry::FormRegistry,
    types::{FormConfiguration, FormId},
};

pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<FormRegistry>,
    bus: Arc<EventBus>,
    dispatcher: Arc<EvaluationDispatcher>,
    flow: Arc<DecisionFlowManager>,
    navigation: Arc<NavigationCoordinator>,
    listeners: DashMap<FormId, Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Builds an orchestrator that resolves pages from what `host` exposes.
    pub fn new(
        config: OrchestratorConfig,
        client: Arc<dyn DecisionClient>,
        host: Arc<dyn FormHost>,
        surface: Arc<dyn FlowSurface>,
    ) -> Self {
        let resolver = Arc::new(HostPageResolver::new(
            host.clone(),
            config.navigation.page_param.clone(),
            config.navigation.page_field.clone(),
        ));
        Self::with_page_resolver(config, client, host, surface, resolver)
    }

    pub fn with_page_resolver(
        config: OrchestratorConfig,
        client: Arc<dyn DecisionClient>,
        host: Arc<dyn FormHost>,
        surface: Arc<dyn FlowSurface>,
        resolver: Arc<dyn PageResolver>,
    ) -> Self {
        let registry = Arc::new(FormRegistry::new());
        let flow = Arc::new(DecisionFlowManager::new(
            registry.clone(),
            client.clone(),
            surface,
            config.decision_flow.cache_timeout,
            RetryPolicy::from(&config.decision_flow),
        ));
        let dispatcher = Arc::new(EvaluationDispatcher::new(
            registry.clone(),
            host.clone(),
            client,
            flow.clone(),
            config.control.busy_label.clone(),
        ));
        let navigation = Arc::new(NavigationCoordinator::new(
            registry.clone(),
            host,
            resolver,
            flow.clone(),
            config.navigation.debounce_window,
            config.decision_flow.load_delay,
        ));
        let bus = Arc::new(EventBus::new(config.event_buffer_size));

        Self {
            config,
            registry,
            bus,
            dispatcher,
            flow,
            navigation,
            listeners: DashMap::new(),
        }
    }

    /// Validates `config`, then talks to the decision service over HTTP.
    pub fn connect(
        config: OrchestratorConfig,
        token: SecretString,
        host: Arc<dyn FormHost>,
        surface: Arc<dyn FlowSurface>,
    ) -> InternalResult<Self> {
        config.validate()?;
        let client = Arc::new(HttpDecisionClient::new(&config.endpoint, token)?);
        Ok(Self::new(config, client, host, surface))
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FormRegistry> {
        &self.registry
    }

    /// Registers a form and subscribes its handlers on the event bus.
    pub fn register_form(&self, form: FormConfiguration) -> InternalResult<Arc<FormConfiguration>> {
        let form = self.registry.register(form)?;
        let form_id = form.form_id;

        let navigation = self.navigation.clone();
        let on_transition = self
            .bus
            .on_page_transition(form_id, move |page| navigation.on_transition(form_id, page));

        let dispatcher = self.dispatcher.clone();
        let on_evaluate = self.bus.on_evaluate_requested(form_id, move || {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                // the outcome is reported to the host by the dispatcher
                let _ = dispatcher.evaluate(form_id).await;
            });
        });

        let flow = self.flow.clone();
        let on_refresh = self.bus.on_refresh_requested(form_id, move || {
            let flow = flow.clone();
            tokio::spawn(async move {
                flow.refresh(form_id).await;
            });
        });

        self.listeners
            .insert(form_id, vec![on_transition, on_evaluate, on_refresh]);
        info!(%form_id, evaluation_step = form.evaluation_step, "form registered");
        Ok(form)
    }

    pub fn publish(&self, event: FormEvent) -> InternalResult<()> {
        debug!(?event, "publishing");
        Ok(self.bus.publish(event)?)
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.bus.subscribe()
    }

    pub async fn evaluate(&self, form_id: FormId) -> EvaluationResult<EvaluationOutcome> {
        self.dispatcher.evaluate(form_id).await
    }

    pub fn is_evaluating(&self, form_id: FormId) -> bool {
        self.dispatcher.is_busy(form_id)
    }

    /// Acts on the current page immediately, without debouncing.
    pub async fn navigate(&self, form_id: FormId, page: Option<u32>) -> NavigationAction {
        self.navigation.apply(form_id, page).await
    }

    pub async fn load_decision_flow(&self, form_id: FormId) -> LoadOutcome {
        self.flow.load(form_id, false).await
    }

    pub async fn refresh_decision_flow(&self, form_id: FormId) -> LoadOutcome {
        self.flow.refresh(form_id).await
    }

    pub fn decision_flow_state(&self, form_id: FormId) -> FlowState {
        self.flow.state(form_id)
    }

    pub fn cached_decision_flow(&self, form_id: FormId) -> Option<CacheEntry> {
        self.flow.cached(form_id)
    }

    /// Stops every listener and pending debounced transition. Loads and
    /// evaluations already running are left to finish.
    pub async fn shutdown(&self) {
        let form_ids: Vec<FormId> = self.listeners.iter().map(|entry| *entry.key()).collect();
        let mut handles = Vec::new();
        for form_id in form_ids {
            self.navigation.cancel_pending(form_id);
            if let Some((_, listeners)) = self.listeners.remove(&form_id) {
                listeners.iter().for_each(JoinHandle::abort);
                handles.extend(listeners);
            }
        }
        join_all(handles).await;
        info!("orchestrator shut down");
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        for entry in self.listeners.iter() {
            entry.value().iter().for_each(JoinHandle::abort);
        }
    }
}
