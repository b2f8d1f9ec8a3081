use std::sync::Arc;
use std::time::Duration;

use dmnform::{
    client::{ClientError, FailureKind, MockDecisionClient},
    dispatcher::EvaluationError,
    host::{AppliedResult, MemoryHost, ResultNotice},
    ConfigId, Orchestrator,
};
use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;

#[tokio::test]
async fn test_result_written_to_mapped_field_only() {
    let f = fixture(GatedClient::new(stew()).open());
    fill_dinner_form(&f.host);

    let outcome = f.orchestrator.evaluate(FORM).await.unwrap();

    assert_eq!(
        outcome.applied,
        vec![AppliedResult {
            result: "desiredDish".to_string(),
            field_id: "F7".to_string(),
            value: "stew".to_string(),
        }]
    );
    assert_eq!(
        f.host.written_fields(FORM),
        vec![("F7".to_string(), "stew".to_string())]
    );
    assert!(matches!(f.host.last_notice(FORM), Some(ResultNotice::Applied(_))));
    assert_eq!(f.host.control(FORM), (true, "Evaluate".to_string()));

    let requests = f.client.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].config_id, ConfigId(12));
    assert_eq!(requests[0].variables.get("season"), Some(&json!("Winter")));
    assert_eq!(requests[0].variables.get("guestCount"), Some(&json!(6)));
}

#[tokio::test]
async fn test_process_instance_recorded_and_flow_reloaded() {
    let f = fixture(GatedClient::new(stew()).open());
    fill_dinner_form(&f.host);

    f.orchestrator.evaluate(FORM).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        f.orchestrator.registry().process_instance(FORM).as_deref(),
        Some("pi-42")
    );
    assert_eq!(f.client.fetches(), 1);
    assert!(f.orchestrator.cached_decision_flow(FORM).is_some());
}

#[tokio::test]
async fn test_second_evaluation_rejected_while_first_in_flight() {
    let f = fixture(GatedClient::new(stew()));
    fill_dinner_form(&f.host);

    let (first, second) = tokio::join!(f.orchestrator.evaluate(FORM), async {
        // the first evaluation is parked on the gate after this
        tokio::task::yield_now().await;
        let second = f.orchestrator.evaluate(FORM).await;
        assert!(f.orchestrator.is_evaluating(FORM));
        assert_eq!(f.host.control(FORM), (false, "Evaluating...".to_string()));
        f.client.release(1);
        second
    });

    assert!(first.is_ok());
    assert!(matches!(second, Err(EvaluationError::Busy(FORM))));
    assert_eq!(f.client.evaluations(), 1);
    assert!(f
        .host
        .notices(FORM)
        .iter()
        .any(|notice| matches!(notice, ResultNotice::Busy(_))));
    assert!(!f.orchestrator.is_evaluating(FORM));
    assert_eq!(f.host.control(FORM), (true, "Evaluate".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_navigation_away_cancels_evaluation_and_restores_control() {
    let f = fixture(GatedClient::new(stew()));
    fill_dinner_form(&f.host);

    let navigated = tokio::select! {
        biased;
        _ = f.orchestrator.evaluate(FORM) => None,
        action = f.orchestrator.navigate(FORM, Some(4)) => Some(action),
    };

    assert_eq!(
        navigated,
        Some(dmnform::navigation::NavigationAction::HideDecisionFlow { page: 4 })
    );
    assert_eq!(f.client.evaluations(), 1);
    assert!(!f.orchestrator.is_evaluating(FORM));
    assert_eq!(f.host.control(FORM), (true, "Evaluate".to_string()));

    f.client.release(1);
    assert!(f.orchestrator.evaluate(FORM).await.is_ok());
    assert_eq!(f.client.evaluations(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_evaluation_frees_the_form() {
    let f = fixture(GatedClient::new(stew()));
    fill_dinner_form(&f.host);

    let cancelled =
        tokio::time::timeout(Duration::from_millis(100), f.orchestrator.evaluate(FORM)).await;

    assert!(cancelled.is_err());
    assert!(!f.orchestrator.is_evaluating(FORM));
    assert_eq!(f.host.control(FORM), (true, "Evaluate".to_string()));

    f.client.release(1);
    let outcome = f.orchestrator.evaluate(FORM).await.unwrap();
    assert_eq!(outcome.applied.len(), 1);
    assert_eq!(
        f.host.written_fields(FORM),
        vec![("F7".to_string(), "stew".to_string())]
    );
}

#[tokio::test]
async fn test_missing_variables_listed_and_not_dispatched() {
    let f = fixture(GatedClient::new(stew()).open());

    let error = f.orchestrator.evaluate(FORM).await.unwrap_err();

    match &error {
        EvaluationError::MissingVariables(names) => {
            assert_eq!(names, &vec!["guestCount".to_string(), "season".to_string()])
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(f.client.evaluations(), 0);
    match f.host.last_notice(FORM) {
        Some(ResultNotice::Failed(message)) => {
            assert!(message.contains("guestCount"));
            assert!(message.contains("season"));
        }
        other => panic!("unexpected notice: {other:?}"),
    }
    assert!(f.host.written_fields(FORM).is_empty());
}

#[tokio::test]
async fn test_type_mismatch_blocks_dispatch() {
    let f = fixture(GatedClient::new(stew()).open());
    f.host
        .add_element(FORM, dmnform::field::FieldElement::text("input_9_3", "Winter"));
    f.host
        .add_element(FORM, dmnform::field::FieldElement::text("input_9_5", "12.5"));

    let error = f.orchestrator.evaluate(FORM).await.unwrap_err();

    match error {
        EvaluationError::TypeMismatch(mismatches) => {
            assert_eq!(mismatches.len(), 1);
            assert_eq!(mismatches[0].variable, "guestCount");
            assert_eq!(mismatches[0].expected, VariableType::Integer);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(f.client.evaluations(), 0);
}

#[tokio::test]
async fn test_incomplete_form_not_dispatched() {
    let f = fixture(GatedClient::new(stew()).open());
    fill_dinner_form(&f.host);
    f.host.set_incomplete(FORM, vec!["Season".to_string()]);

    assert!(matches!(
        f.orchestrator.evaluate(FORM).await,
        Err(EvaluationError::Incomplete(_))
    ));
    assert_eq!(f.client.evaluations(), 0);
}

#[tokio::test]
async fn test_server_failure_surfaced_once_without_retry() {
    let mut client = MockDecisionClient::new();
    client.expect_evaluate().times(1).returning(|_| {
        Err(ClientError::Server {
            status: 500,
            message: Some("java.lang.IllegalStateException".into()),
        })
    });
    client.expect_fetch_decision_flow().times(0);
    let host = Arc::new(MemoryHost::new());
    let orchestrator = Orchestrator::new(test_config(), Arc::new(client), host.clone(), host.clone());
    orchestrator.register_form(dinner_form()).unwrap();
    fill_dinner_form(&host);

    let error = orchestrator.evaluate(FORM).await.unwrap_err();

    assert_eq!(error.failure_kind(), Some(FailureKind::ServerError));
    match host.last_notice(FORM) {
        Some(ResultNotice::Failed(message)) => {
            assert!(!message.contains("IllegalState"));
            assert_eq!(message, FailureKind::ServerError.user_message());
        }
        other => panic!("unexpected notice: {other:?}"),
    }
    assert!(host.written_fields(FORM).is_empty());
    assert_eq!(host.control(FORM), (true, "Evaluate".to_string()));
}

#[tokio::test]
async fn test_evaluate_event_runs_dispatcher() {
    let f = fixture(GatedClient::new(results(json!({"desiredDish": "soup"}))).open());
    fill_dinner_form(&f.host);

    f.orchestrator
        .publish(dmnform::event_bus::FormEvent::EvaluateRequested { form_id: FORM })
        .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(
        f.host.written_fields(FORM),
        vec![("F7".to_string(), "soup".to_string())]
    );
}
