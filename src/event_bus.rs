//! Publish/subscribe channel between the host wizard and the orchestrator.
//!
//! The host publishes [`FormEvent`]s; handlers registered per form with
//! [`EventBus::on_page_transition`], [`EventBus::on_evaluate_requested`] and
//! [`EventBus::on_refresh_requested`] run on a listener task each.

use thiserror::Error;
use tokio::{sync::broadcast, task::JoinHandle};
use tracing::warn;

use crate::types::FormId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormEvent {
    /// The wizard moved to another page (or re-rendered the current one).
    PageTransition { form_id: FormId, page: Option<u32> },
    EvaluateRequested { form_id: FormId },
    RefreshRequested { form_id: FormId },
}

impl FormEvent {
    pub fn form_id(&self) -> FormId {
        match self {
            FormEvent::PageTransition { form_id, .. }
            | FormEvent::EvaluateRequested { form_id }
            | FormEvent::RefreshRequested { form_id } => *form_id,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum EventError {
    #[error("Failed to send event: {message}")]
    SendFailed { message: String },
    #[error("Failed to receive event: {message}")]
    ReceiveFailed { message: String },
    #[error("Receiver lagged behind by {count} events")]
    Lagged { count: u64 },
}

pub type EventResult<T> = Result<T, EventError>;

pub struct EventBus {
    sender: broadcast::Sender<FormEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe())
    }

    pub fn publish(&self, event: FormEvent) -> EventResult<()> {
        self.sender
            .send(event)
            .map_err(|e| EventError::SendFailed {
                message: e.to_string(),
            })?;
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Runs `handler` with the page hint of every transition of `form_id`.
    pub fn on_page_transition<F>(&self, form_id: FormId, handler: F) -> JoinHandle<()>
    where
        F: Fn(Option<u32>) + Send + Sync + 'static,
    {
        self.listen(form_id, move |event| {
            if let FormEvent::PageTransition { page, .. } = event {
                handler(page);
            }
        })
    }

    pub fn on_evaluate_requested<F>(&self, form_id: FormId, handler: F) -> JoinHandle<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listen(form_id, move |event| {
            if matches!(event, FormEvent::EvaluateRequested { .. }) {
                handler();
            }
        })
    }

    pub fn on_refresh_requested<F>(&self, form_id: FormId, handler: F) -> JoinHandle<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.listen(form_id, move |event| {
            if matches!(event, FormEvent::RefreshRequested { .. }) {
                handler();
            }
        })
    }

    /// Subscribes now, so events published after this returns are seen.
    fn listen<F>(&self, form_id: FormId, handler: F) -> JoinHandle<()>
    where
        F: Fn(FormEvent) + Send + Sync + 'static,
    {
        let mut receiver = self.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.form_id() == form_id => handler(event),
                    Ok(_) => {}
                    Err(EventError::Lagged { count }) => {
                        warn!(%form_id, count, "event listener lagged, events dropped");
                    }
                    Err(_) => break,
                }
            }
        })
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<FormEvent>,
}

impl EventReceiver {
    fn new(receiver: broadcast::Receiver<FormEvent>) -> Self {
        Self { receiver }
    }

    /// Receives the next event. After a lag the receiver skips to the
    /// current tail and reports how many events were lost.
    pub async fn recv(&mut self) -> EventResult<FormEvent> {
        match self.receiver.recv().await {
            Ok(event) => Ok(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                self.receiver = self.receiver.resubscribe();
                Err(EventError::Lagged { count: n })
            }
            Err(e) => Err(EventError::ReceiveFailed {
                message: e.to_string(),
            }),
        }
    }
}
