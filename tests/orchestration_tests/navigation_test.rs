use std::time::Duration;

use dmnform::{event_bus::FormEvent, host::FlowView, navigation::NavigationAction, FormConfiguration};

use super::*;

fn transition(page: Option<u32>) -> FormEvent {
    FormEvent::PageTransition {
        form_id: FORM,
        page,
    }
}

#[tokio::test(start_paused = true)]
async fn test_summary_page_triggers_one_fetch_after_delay() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");

    f.orchestrator.publish(transition(Some(3))).unwrap();

    // debounce window plus post-transition delay
    tokio::time::sleep(Duration::from_millis(590)).await;
    assert_eq!(f.client.fetches(), 0);
    assert!(f.host.flow_visible(FORM));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(f.client.fetches(), 1);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(f.client.fetches(), 1);
    assert!(matches!(
        f.host.last_flow_view(FORM),
        Some(FlowView::Content { .. })
    ));
    f.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_transitions_collapses() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");

    for _ in 0..5 {
        f.orchestrator.publish(transition(Some(3))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(f.client.fetches(), 1);
    f.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_leaving_summary_hides_and_keeps_cache() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");

    f.orchestrator.publish(transition(Some(3))).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(f.client.fetches(), 1);

    f.orchestrator.publish(transition(Some(4))).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(!f.host.flow_visible(FORM));
    assert!(f.orchestrator.cached_decision_flow(FORM).is_some());

    f.orchestrator.publish(transition(Some(3))).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(f.host.flow_visible(FORM));
    assert_eq!(f.client.fetches(), 1);
    f.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_revisiting_summary_after_exhausted_retries_does_not_refetch() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");
    let unavailable = || {
        Err(dmnform::client::ClientError::Server {
            status: 503,
            message: None,
        })
    };
    f.client
        .queue_flow(vec![unavailable(), unavailable(), unavailable()])
        .await;

    f.orchestrator.publish(transition(Some(3))).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(f.client.fetches(), 3);

    // same page re-rendered, then away and back
    f.orchestrator.publish(transition(Some(3))).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    f.orchestrator.publish(transition(Some(4))).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    f.orchestrator.publish(transition(Some(3))).unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(f.client.fetches(), 3);
    assert!(f.host.flow_visible(FORM));
    assert_eq!(
        f.host.last_flow_view(FORM),
        Some(FlowView::Error {
            attempts: 3,
            refreshable: true
        })
    );

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
async fn test_evaluation_page_from_query_parameter() {
    let f = fixture(GatedClient::new(stew()));
    f.host.set_query_param(FORM, "form_page", "2");

    f.orchestrator.publish(transition(None)).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(f.host.control_visible(FORM));
    assert!(!f.host.flow_visible(FORM));
    assert_eq!(f.client.fetches(), 0);
    f.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_page_from_tracking_field_and_page_breaks() {
    let f = fixture(GatedClient::new(stew()));

    f.host.set_visible_page_breaks(FORM, 4);
    assert_eq!(
        f.orchestrator.navigate(FORM, None).await,
        NavigationAction::HideDecisionFlow { page: 4 }
    );

    f.host.add_element(
        FORM,
        dmnform::field::FieldElement::new(
            "source_page_number_9",
            dmnform::field::ElementKind::Hidden,
            "2",
        ),
    );
    assert_eq!(
        f.orchestrator.navigate(FORM, None).await,
        NavigationAction::ShowControl { page: 2 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_summary_without_process_instance_shows_placeholder() {
    let f = fixture(GatedClient::new(stew()));

    f.orchestrator.publish(transition(Some(3))).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(f.client.fetches(), 0);
    assert_eq!(f.host.last_flow_view(FORM), Some(FlowView::AwaitingProcess));
    f.orchestrator.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_summary_page_ignored_when_flow_disabled() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator
        .register_form(
            FormConfiguration::new(11, 3)
                .with_field("season", "1", VariableType::String)
                .with_result("desiredDish", "2")
                .with_evaluation_step(1)
                .with_decision_flow(true, false),
        )
        .unwrap();
    f.orchestrator
        .registry()
        .set_process_instance(FormId(11), "pi-11");

    assert_eq!(
        f.orchestrator.navigate(FormId(11), Some(2)).await,
        NavigationAction::HideDecisionFlow { page: 2 }
    );
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(f.client.fetches(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transitions_of_other_forms_are_ignored() {
    let f = fixture(GatedClient::new(stew()));
    f.orchestrator.registry().set_process_instance(FORM, "pi-42");

    f.orchestrator
        .publish(FormEvent::PageTransition {
            form_id: FormId(10),
            page: Some(3),
        })
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(f.client.fetches(), 0);
    assert!(f.host.flow_views(FORM).is_empty());
    f.orchestrator.shutdown().await;
}
