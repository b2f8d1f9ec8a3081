use std::sync::Arc;

use dmnform::{decision_flow::LoadOutcome, host::MemoryHost, Orchestrator};
use secrecy::SecretString;

use super::*;
use crate::{decision_service_url, should_run_external_api_tests};

#[tokio::test]
async fn test_evaluate_against_running_service() {
    if !should_run_external_api_tests() {
        return;
    }

    let mut config = test_config();
    config.endpoint.base_url = decision_service_url();
    let token = std::env::var("DMNFORM_TOKEN").unwrap_or_default();
    let host = Arc::new(MemoryHost::new());
    let orchestrator =
        Orchestrator::connect(config, SecretString::from(token), host.clone(), host.clone())
            .unwrap();
    orchestrator.register_form(dinner_form()).unwrap();
    fill_dinner_form(&host);

    let outcome = orchestrator.evaluate(FORM).await.unwrap();
    assert!(!outcome.applied.is_empty());

    let flow = orchestrator.load_decision_flow(FORM).await;
    assert!(!matches!(flow, LoadOutcome::Failed { .. }), "{flow:?}");
    orchestrator.shutdown().await;
}
