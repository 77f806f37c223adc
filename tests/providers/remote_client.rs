use std::time::Duration;

use serde_json::json;
use stopgate::providers::remote::CircuitState;
use stopgate::{
    ClarifyError, DirectiveProvider, FeedbackRecord, Mode, RemoteProvider, Stage,
    StructuralRequest,
};
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::directives::{API_KEY, meaning_directive, remote_config};

const BLUEPRINTS: &str = "/v1/inquiry/blueprints";
const FEEDBACK: &str = "/v1/feedback/instances";

fn stop_request() -> StructuralRequest {
    StructuralRequest::new(Stage::Meaning, Mode::Convergent, true)
}

async fn received(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn fetch_posts_structural_request_with_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BLUEPRINTS))
        .and(header("authorization", format!("Bearer {API_KEY}").as_str()))
        .and(header("content-type", "application/json"))
        .and(header_exists("user-agent"))
        .and(body_partial_json(json!({
            "stage": "meaning",
            "mode": "convergent",
            "stopTrigger": true,
            "patternId": "ambiguous"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(meaning_directive(1)))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri()))
        .expect("remote provider should build");
    let directive = provider
        .fetch_directive(&stop_request().with_pattern("ambiguous"))
        .await
        .expect("fetch should succeed");
    assert_eq!(directive.id, "meaning-convergent-ambiguous-v1");
    assert_eq!(directive.version(), 1);
}

#[tokio::test]
async fn transient_failures_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(BLUEPRINTS))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream hiccup"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(BLUEPRINTS))
        .respond_with(ResponseTemplate::new(200).set_body_json(meaning_directive(2)))
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri())).unwrap();
    let directive = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(directive.id, "meaning-convergent-ambiguous-v2");
    assert_eq!(received(&server).await, 3);
    assert_eq!(provider.circuit_state(), CircuitState::Closed);
    assert_eq!(provider.consecutive_failures(), 0);
}

#[tokio::test]
async fn exhausted_retries_surface_last_service_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri());
    config.max_retries = 2;
    let provider = RemoteProvider::new(&config).unwrap();
    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(matches!(err, ClarifyError::Service { status: 503, .. }));
    assert_eq!(received(&server).await, 3);
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown stage"))
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri())).unwrap();
    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(matches!(err, ClarifyError::Service { status: 422, .. }));
    assert!(!err.is_retryable());
    assert_eq!(received(&server).await, 1);
    assert_eq!(provider.consecutive_failures(), 0);
}

#[tokio::test]
async fn rejected_credential_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri())).unwrap();
    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(matches!(err, ClarifyError::Authentication(_)));
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn echoed_credential_never_reaches_caller() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(format!("token {API_KEY} rejected upstream")),
        )
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri());
    config.max_retries = 0;
    let provider = RemoteProvider::new(&config).unwrap();
    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(!err.to_string().contains(API_KEY));
    assert!(!format!("{err:?}").contains(API_KEY));
}

#[tokio::test]
async fn breaker_opens_and_fails_fast_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri());
    config.max_retries = 0;
    config.circuit_breaker_threshold = 2;
    let provider = RemoteProvider::new(&config).unwrap();

    for _ in 0..2 {
        assert!(provider.fetch_directive(&stop_request()).await.is_err());
    }
    assert_eq!(provider.circuit_state(), CircuitState::Open);

    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(matches!(err, ClarifyError::CircuitOpen { .. }));
    assert_eq!(received(&server).await, 2);

    provider.reset_circuit();
    assert_eq!(provider.circuit_state(), CircuitState::Closed);
    assert!(provider.fetch_directive(&stop_request()).await.is_err());
    assert_eq!(received(&server).await, 3);
}

#[tokio::test]
async fn slow_service_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(meaning_directive(1))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let mut config = remote_config(&server.uri());
    config.timeout_ms = 50;
    config.max_retries = 0;
    let provider = RemoteProvider::new(&config).unwrap();
    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(matches!(err, ClarifyError::Timeout { timeout_ms: 50 }));
}

#[tokio::test]
async fn malformed_directive_is_validation_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "x-v1"})))
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri())).unwrap();
    let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
    assert!(matches!(err, ClarifyError::Validation(_)));
    assert_eq!(received(&server).await, 1);
}

#[tokio::test]
async fn feedback_is_posted_and_body_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(FEEDBACK))
        .and(body_partial_json(json!({
            "directiveId": "meaning-convergent-ambiguous-v1",
            "patternId": "ambiguous",
            "resolved": true,
            "turnDelta": 2
        })))
        .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri())).unwrap();
    let record = FeedbackRecord::new(
        "meaning-convergent-ambiguous-v1",
        "ambiguous",
        Mode::Convergent,
        true,
    )
    .with_turn_delta(2);
    provider
        .send_feedback(&record)
        .await
        .expect("feedback should be accepted");
}

#[tokio::test]
async fn invalid_feedback_never_leaves_the_process() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let provider = RemoteProvider::new(&remote_config(&server.uri())).unwrap();
    let record = FeedbackRecord::new("", "ambiguous", Mode::Convergent, false);
    let err = provider.send_feedback(&record).await.unwrap_err();
    assert!(matches!(err, ClarifyError::Validation(_)));
}
