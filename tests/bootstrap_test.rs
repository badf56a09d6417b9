use rask_log_sink::test_support::RecordingSink;
use rask_log_sink::{
    BootstrapError, ClientConfig, ClientError, Level, LoggerOption, Severity, SinkWriter,
    connect_with, install_with,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        endpoint: server.uri(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[tokio::test]
async fn test_create_client_and_ping_failures_are_distinct() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let create = install_with(config_for(&server), "projects/", "app", HashMap::new(), &[])
        .await
        .err()
        .unwrap();
    let ping = install_with(config_for(&server), "test-project", "app", HashMap::new(), &[])
        .await
        .err()
        .unwrap();

    assert!(matches!(
        create,
        BootstrapError::CreateClient {
            source: ClientError::InvalidConfiguration(_)
        }
    ));
    assert!(matches!(
        ping,
        BootstrapError::Ping {
            source: ClientError::Http { status: 503, .. }
        }
    ));
    assert!(create.to_string().starts_with("create client: "));
    assert!(ping.to_string().starts_with("ping: "));

    // Neither failure touched the process-wide subscriber.
    assert!(!tracing::dispatcher::has_been_set());
}

#[tokio::test]
async fn test_explicit_common_labels_option_wins() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/entries:write"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (client, writer) = connect_with(
        config_for(&server),
        "test-project",
        "labels",
        labels(&[("env", "prod"), ("team", "core")]),
        &[LoggerOption::common_labels([("env", "staging")])],
    )
    .await
    .unwrap();

    writer
        .write_level(Level::Info, br#"{"message":"deployed"}"#)
        .unwrap();
    writer.flush().await.unwrap();
    client.close().await.unwrap();

    let bodies: Vec<Value> = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.body_json::<Value>().unwrap())
        .filter(|body| body["logName"] == "projects/test-project/logs/labels")
        .collect();

    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["labels"], json!({"env": "staging"}));
    assert_eq!(bodies[0]["entries"][0]["severity"], "INFO");
    assert_eq!(bodies[0]["entries"][0]["jsonPayload"], json!({"message": "deployed"}));
}

#[tokio::test]
async fn test_labels_argument_applies_without_override() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let (client, writer) = connect_with(
        config_for(&server),
        "test-project",
        "plain-labels",
        labels(&[("env", "prod")]),
        &[],
    )
    .await
    .unwrap();

    assert_eq!(writer.write(b"{}").unwrap(), 2);
    client.close().await.unwrap();

    let body = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|request| request.body_json::<Value>().unwrap())
        .find(|body| body["logName"] == "projects/test-project/logs/plain-labels")
        .unwrap();
    assert_eq!(body["labels"], json!({"env": "prod"}));
    assert_eq!(body["entries"][0]["severity"], "DEFAULT");
}

#[test]
fn test_error_level_record_reaches_backend_once() {
    let sink = RecordingSink::new();
    let writer = SinkWriter::new(sink.clone());
    let record = b"{\"msg\":\"x\"}";

    let written = writer.write_level(Level::Error, record).unwrap();

    assert_eq!(written, record.len());
    let entries = sink.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, Severity::Error);
    assert_eq!(entries[0].payload.encode(), b"{\"msg\":\"x\"}");
}
