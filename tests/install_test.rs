// Installs the process-wide subscriber, so it lives in its own test binary.

use rask_log_sink::{BootstrapError, ClientConfig, install_with};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_install_routes_tracing_events_to_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let config = ClientConfig {
        endpoint: server.uri(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let labels = HashMap::from([("service".to_string(), "billing".to_string())]);

    let client = install_with(config.clone(), "test-project", "installed", labels.clone(), &[])
        .await
        .unwrap();
    assert!(tracing::dispatcher::has_been_set());

    tracing::warn!(invoice = "inv-7", "invoice overdue");
    client.flush().await.unwrap();

    // A second install cannot replace the subscriber.
    let second = install_with(config, "test-project", "installed", labels, &[])
        .await
        .err()
        .unwrap();
    assert!(matches!(second, BootstrapError::Install(_)));

    client.close().await.unwrap();

    let entries: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.body_json::<Value>().unwrap())
        .filter(|body| body["logName"] == "projects/test-project/logs/installed")
        .flat_map(|body| body["entries"].as_array().cloned().unwrap_or_default())
        .collect();

    let overdue: Vec<&Value> = entries
        .iter()
        .filter(|entry| entry["jsonPayload"]["message"] == "invoice overdue")
        .collect();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["severity"], "WARNING");
    assert_eq!(overdue[0]["jsonPayload"]["invoice"], "inv-7");
}
