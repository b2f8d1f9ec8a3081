use std::time::Duration;

use dmnform::{
    client::{ClientError, DecisionFlowResponse},
    decision_flow::{FlowState, LoadOutcome},
    event_bus::FormEvent,
    host::FlowView,
};
use tokio::time::Instant;

use super::*;

fn unavailable() -> ClientResult<DecisionFlowResponse> {
    Err(ClientError::Server {
        status: 503,
        message: None,
    })
}

#[tokio::test(start_paused = true)]
async fn test_two_failures_then_success_renders_content() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");
    f.client
        .queue_flow(vec![
            unavailable(),
            Err(ClientError::Connectivity("connection reset".into())),
            Ok(document("<ol><li>Season: Winter</li></ol>")),
        ])
        .await;

    let started = Instant::now();
    let outcome = f.orchestrator.load_decision_flow(FORM).await;

    assert_eq!(outcome, LoadOutcome::Fetched { attempts: 3 });
    assert_eq!(f.client.fetches(), 3);
    // 1s after the first failure, 2s after the second
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(matches!(
        f.host.last_flow_view(FORM),
        Some(FlowView::Content { ref html, refreshable: true, .. }) if html.contains("Winter")
    ));
    assert_eq!(f.orchestrator.decision_flow_state(FORM), FlowState::Loaded);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_budget_waits_for_manual_refresh() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");
    f.client
        .queue_flow(vec![unavailable(), unavailable(), unavailable()])
        .await;

    let outcome = f.orchestrator.load_decision_flow(FORM).await;

    assert!(matches!(outcome, LoadOutcome::Failed { attempts: 3, .. }));
    assert_eq!(
        f.host.last_flow_view(FORM),
        Some(FlowView::Error {
            attempts: 3,
            refreshable: true
        })
    );

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(f.client.fetches(), 3);
    assert_eq!(f.orchestrator.decision_flow_state(FORM), FlowState::Failed);

    f.orchestrator
        .publish(FormEvent::RefreshRequested { form_id: FORM })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(f.client.fetches(), 4);
    assert!(matches!(
        f.host.last_flow_view(FORM),
        Some(FlowView::Content { .. })
    ));
    f.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_cache_timeout_bounds_reuse() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");
    let ttl = f.orchestrator.config().decision_flow.cache_timeout;

    assert_eq!(
        f.orchestrator.load_decision_flow(FORM).await,
        LoadOutcome::Fetched { attempts: 1 }
    );

    tokio::time::advance(ttl - Duration::from_secs(1)).await;
    assert_eq!(f.orchestrator.load_decision_flow(FORM).await, LoadOutcome::Cached);
    assert_eq!(f.client.fetches(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(
        f.orchestrator.load_decision_flow(FORM).await,
        LoadOutcome::Fetched { attempts: 1 }
    );
    assert_eq!(f.client.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_bypasses_fresh_cache() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");

    f.orchestrator.load_decision_flow(FORM).await;
    assert_eq!(
        f.orchestrator.refresh_decision_flow(FORM).await,
        LoadOutcome::Fetched { attempts: 1 }
    );
    assert_eq!(f.client.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_no_data_is_a_placeholder_not_an_error() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");
    f.client
        .queue_flow(vec![Ok(DecisionFlowResponse {
            success: false,
            html: None,
        })])
        .await;

    assert_eq!(
        f.orchestrator.load_decision_flow(FORM).await,
        LoadOutcome::NoData
    );
    assert_eq!(f.client.fetches(), 1);
    assert_eq!(f.host.last_flow_view(FORM), Some(FlowView::NoData));
    assert!(f.orchestrator.cached_decision_flow(FORM).is_none());
}
