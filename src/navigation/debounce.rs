use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;

use crate::types::FormId;

/// Collapses bursts of work per form: scheduling again within the window
/// cancels the pending task, so only the last one runs.
pub struct Debouncer {
    window: Duration,
    pending: DashMap<FormId, JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: DashMap::new(),
        }
    }

    pub fn schedule<F>(&self, form_id: FormId, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            task.await;
        });
        if let Some(previous) = self.pending.insert(form_id, handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self, form_id: FormId) {
        if let Some((_, handle)) = self.pending.remove(&form_id) {
            handle.abort();
        }
    }

    pub fn cancel_all(&self) {
        self.pending.iter().for_each(|entry| entry.value().abort());
        self.pending.clear();
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
