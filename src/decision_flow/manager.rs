use std::sync::Arc;
use std::time::Duration;

use dashmap::{DashMap, DashSet};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{
    cache::{CacheEntry, DecisionFlowCache, FlowState},
    retry::RetryPolicy,
};
use crate::{
    client::{DecisionClient, FailureKind},
    host::{FlowSurface, FlowView},
    inflight::InFlightSet,
    registry::FormRegistry,
    types::FormId,
};

/// How a call to [`DecisionFlowManager::load`] ended.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Another load for the form was already running; nothing was done.
    AlreadyLoading,
    /// A fresh cached document was rendered without a network call.
    Cached,
    Fetched { attempts: u32 },
    /// No process instance yet; the placeholder was rendered.
    AwaitingProcess,
    NoData,
    Failed { attempts: u32, kind: FailureKind },
    /// An earlier load used up its attempts; the error stays until a
    /// forced reload.
    AwaitingRefresh { attempts: u32 },
}

pub struct DecisionFlowManager {
    registry: Arc<FormRegistry>,
    client: Arc<dyn DecisionClient>,
    surface: Arc<dyn FlowSurface>,
    cache: DecisionFlowCache,
    loading: InFlightSet,
    shown: DashSet<FormId>,
    /// Attempts spent by the last failed load of each form.
    failures: DashMap<FormId, u32>,
    retry: RetryPolicy,
}

impl DecisionFlowManager {
    pub fn new(
        registry: Arc<FormRegistry>,
        client: Arc<dyn DecisionClient>,
        surface: Arc<dyn FlowSurface>,
        cache_timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            registry,
            client,
            surface,
            cache: DecisionFlowCache::new(cache_timeout),
            loading: InFlightSet::new(),
            shown: DashSet::new(),
            failures: DashMap::new(),
            retry,
        }
    }

    pub fn state(&self, form_id: FormId) -> FlowState {
        self.cache.state(form_id)
    }

    pub fn cached(&self, form_id: FormId) -> Option<CacheEntry> {
        self.cache.get(form_id)
    }

    pub fn is_loading(&self, form_id: FormId) -> bool {
        self.loading.contains(form_id)
    }

    pub fn is_shown(&self, form_id: FormId) -> bool {
        self.shown.contains(&form_id)
    }

    pub fn show(&self, form_id: FormId) {
        self.shown.insert(form_id);
        self.surface.set_visible(form_id, true);
    }

    /// Hides the container. The cached document is kept for the next visit.
    pub fn hide(&self, form_id: FormId) {
        self.shown.remove(&form_id);
        self.surface.set_visible(form_id, false);
    }

    /// Drops the cached document, e.g. before a manual refresh.
    pub fn invalidate(&self, form_id: FormId) -> bool {
        let removed = self.cache.invalidate(form_id);
        if removed {
            debug!(%form_id, "decision flow invalidated");
        }
        removed
    }

    /// Manual refresh: invalidate, then load bypassing the cache.
    pub async fn refresh(&self, form_id: FormId) -> LoadOutcome {
        self.invalidate(form_id);
        self.load(form_id, true).await
    }

    /// Invalidates and reloads on a separate task.
    pub fn reload_in_background(self: Arc<Self>, form_id: FormId) -> JoinHandle<LoadOutcome> {
        self.invalidate(form_id);
        tokio::spawn(async move { self.load(form_id, true).await })
    }

    /// Renders the decision flow of `form_id`, from cache when fresh.
    ///
    /// Once a load has failed, only `force_reload` fetches again.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self, form_id: FormId, force_reload: bool) -> LoadOutcome {
        let Some(_loading) = self.loading.try_begin(form_id) else {
            debug!(%form_id, "decision flow load already running");
            return LoadOutcome::AlreadyLoading;
        };

        if !force_reload {
            if let Some(entry) = self.cache.fresh(form_id) {
                debug!(%form_id, age_ms = entry.age().as_millis() as u64, "decision flow served from cache");
                self.render_entry(entry);
                self.cache.set_state(form_id, FlowState::Loaded);
                return LoadOutcome::Cached;
            }
            if let Some(attempts) = self.failures.get(&form_id).map(|a| *a) {
                debug!(%form_id, attempts, "decision flow failed earlier, waiting for refresh");
                self.render_error(form_id, attempts);
                return LoadOutcome::AwaitingRefresh { attempts };
            }
        }
        self.failures.remove(&form_id);

        if self.registry.process_instance(form_id).is_none() {
            debug!(%form_id, "no process instance, nothing to fetch");
            self.cache.set_state(form_id, FlowState::Empty);
            self.surface.render(form_id, FlowView::AwaitingProcess);
            return LoadOutcome::AwaitingProcess;
        }

        self.cache.set_state(form_id, FlowState::Loading);
        self.fetch_with_retry(form_id).await
    }

    async fn fetch_with_retry(&self, form_id: FormId) -> LoadOutcome {
        let mut attempt = 1;
        loop {
            self.surface.render(form_id, FlowView::Loading { attempt });

            let error = match self.client.fetch_decision_flow(form_id).await {
                Ok(response) => {
                    return match response.into_document() {
                        Some(html) => {
                            let entry = self.cache.store(form_id, html);
                            self.cache.set_state(form_id, FlowState::Loaded);
                            info!(%form_id, attempts = attempt, "decision flow fetched");
                            self.render_entry(entry);
                            LoadOutcome::Fetched { attempts: attempt }
                        }
                        None => {
                            debug!(%form_id, "decision flow has no data");
                            self.cache.set_state(form_id, FlowState::Empty);
                            self.surface.render(form_id, FlowView::NoData);
                            LoadOutcome::NoData
                        }
                    };
                }
                Err(error) => error,
            };

            let kind = error.kind();
            if !kind.is_retryable() || !self.retry.allows_another(attempt) {
                warn!(%form_id, attempts = attempt, error = %error, "decision flow fetch failed");
                self.cache.set_state(form_id, FlowState::Failed);
                self.failures.insert(form_id, attempt);
                self.render_error(form_id, attempt);
                return LoadOutcome::Failed {
                    attempts: attempt,
                    kind,
                };
            }

            let delay = self.retry.delay(attempt);
            debug!(%form_id, attempt, delay_ms = delay.as_millis() as u64, error = %error, "retrying decision flow fetch");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    fn render_error(&self, form_id: FormId, attempts: u32) {
        self.surface.render(
            form_id,
            FlowView::Error {
                attempts,
                refreshable: true,
            },
        );
    }

    fn render_entry(&self, entry: CacheEntry) {
        self.surface.render(
            entry.form_id,
            FlowView::Content {
                html: entry.html,
                fetched_at: entry.stamped_at,
                refreshable: true,
            },
        );
    }
}
