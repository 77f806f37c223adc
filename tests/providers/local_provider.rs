use std::sync::Arc;

use serde_json::json;
use stopgate::config::LocalConfig;
use stopgate::providers::local::{
    DirectiveSource, LatestVersionSelector, LeastUsedSelector, ResolutionRateSelector,
};
use stopgate::{
    ClarifyError, DirectiveProvider, FeedbackRecord, LocalProvider, Mode, Stage,
    StructuralRequest,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::directives::{directive_json, meaning_directive, write_json};

fn stop_request() -> StructuralRequest {
    StructuralRequest::new(Stage::Meaning, Mode::Convergent, true)
}

fn directory_provider(dir: &TempDir) -> LocalProvider {
    let config = LocalConfig {
        directory: Some(dir.path().to_string_lossy().into_owned()),
        ..LocalConfig::default()
    };
    LocalProvider::from_config(&config, Arc::new(LatestVersionSelector))
        .expect("local provider should build")
}

#[tokio::test]
async fn directory_loads_valid_files_and_skips_the_rest() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "meaning-convergent-ambiguous-v1.json", &meaning_directive(1));
    write_json(dir.path(), "meaning-convergent-ambiguous-v3.json", &meaning_directive(3));
    write_json(dir.path(), "broken.json", &json!({"id": "broken-v9"}));
    write_json(dir.path(), ".hidden-v99.json", &meaning_directive(99));
    std::fs::write(dir.path().join("notes.txt"), "not a directive").unwrap();
    std::fs::write(dir.path().join("garbage.json"), "{ nope").unwrap();

    let provider = directory_provider(&dir);
    let candidates = provider.candidates(&stop_request()).await.unwrap();
    let ids: Vec<&str> = candidates.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(
        ids,
        ["meaning-convergent-ambiguous-v3", "meaning-convergent-ambiguous-v1"]
    );

    let directive = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(directive.id, "meaning-convergent-ambiguous-v3");
}

#[tokio::test]
async fn unversioned_ids_sort_last() {
    let dir = TempDir::new().unwrap();
    for id in ["x-v1", "x-v3", "x"] {
        write_json(
            dir.path(),
            &format!("{id}.json"),
            &directive_json(id, "purpose", "reflective", "goal"),
        );
    }
    let provider = directory_provider(&dir);
    let request = StructuralRequest::new(Stage::Purpose, Mode::Reflective, true);
    let ids: Vec<String> = provider
        .candidates(&request)
        .await
        .unwrap()
        .iter()
        .map(|d| d.id.clone())
        .collect();
    assert_eq!(ids, ["x-v3", "x-v1", "x"]);
}

#[tokio::test]
async fn directory_with_only_invalid_files_is_hard_failure() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("a.json"), "[]").unwrap();
    std::fs::write(dir.path().join("b.json"), "{\"id\": 1}").unwrap();

    let err = directory_provider(&dir)
        .fetch_directive(&stop_request())
        .await
        .unwrap_err();
    assert!(matches!(err, ClarifyError::Source(_)));
}

#[tokio::test]
async fn empty_directory_reports_no_candidates() {
    let dir = TempDir::new().unwrap();
    let err = directory_provider(&dir)
        .fetch_directive(&stop_request().with_pattern("ambiguous"))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(matches!(err, ClarifyError::NoCandidates { .. }));
    assert!(message.contains("meaning"));
    assert!(message.contains("convergent"));
    assert!(message.contains("ambiguous"));
}

#[tokio::test]
async fn cache_is_lazy_and_sticky_until_reload() {
    let dir = TempDir::new().unwrap();
    let provider = directory_provider(&dir);

    // Nothing was read at construction time.
    write_json(dir.path(), "v1.json", &meaning_directive(1));
    let first = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(first.id, "meaning-convergent-ambiguous-v1");

    write_json(dir.path(), "v2.json", &meaning_directive(2));
    let cached = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(cached.id, "meaning-convergent-ambiguous-v1");

    assert_eq!(provider.reload().await.unwrap(), 2);
    let reloaded = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(reloaded.id, "meaning-convergent-ambiguous-v2");
}

#[tokio::test]
async fn url_source_accepts_array_and_is_fetched_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directives"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            meaning_directive(1),
            meaning_directive(4),
            {"id": "invalid-entry"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let source = DirectiveSource::Url(format!("{}/directives", server.uri()));
    let provider = LocalProvider::new(source, Arc::new(LatestVersionSelector));
    for _ in 0..3 {
        let directive = provider.fetch_directive(&stop_request()).await.unwrap();
        assert_eq!(directive.id, "meaning-convergent-ambiguous-v4");
    }
}

#[tokio::test]
async fn url_source_accepts_single_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(meaning_directive(7)))
        .mount(&server)
        .await;

    let config = LocalConfig {
        url: Some(server.uri()),
        ..LocalConfig::default()
    };
    let provider = LocalProvider::from_config(&config, Arc::new(LatestVersionSelector)).unwrap();
    let directive = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(directive.version(), 7);
}

#[tokio::test]
async fn url_source_failures_are_source_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    for route in ["/missing", "/empty"] {
        let source = DirectiveSource::Url(format!("{}{route}", server.uri()));
        let provider = LocalProvider::new(source, Arc::new(LatestVersionSelector));
        let err = provider.fetch_directive(&stop_request()).await.unwrap_err();
        assert!(matches!(err, ClarifyError::Source(_)), "{route}: {err}");
    }
}

fn feedback(id: &str, resolved: bool) -> FeedbackRecord {
    FeedbackRecord::new(id, "ambiguous", Mode::Convergent, resolved)
}

#[tokio::test]
async fn feedback_drives_resolution_rate_selection() {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "v1.json", &meaning_directive(1));
    write_json(dir.path(), "v2.json", &meaning_directive(2));
    let config = LocalConfig {
        directory: Some(dir.path().to_string_lossy().into_owned()),
        ..LocalConfig::default()
    };
    let provider =
        LocalProvider::from_config(&config, Arc::new(ResolutionRateSelector { min_usage: 2 }))
            .unwrap();

    let before = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(before.id, "meaning-convergent-ambiguous-v2");

    for resolved in [false, false] {
        provider
            .send_feedback(&feedback("meaning-convergent-ambiguous-v2", resolved))
            .await
            .unwrap();
    }
    for resolved in [true, true] {
        provider
            .send_feedback(&feedback("meaning-convergent-ambiguous-v1", resolved))
            .await
            .unwrap();
    }

    let after = provider.fetch_directive(&stop_request()).await.unwrap();
    assert_eq!(after.id, "meaning-convergent-ambiguous-v1");

    let metrics = provider
        .metrics_for("meaning-convergent-ambiguous-v2")
        .unwrap();
    assert_eq!(metrics.usage_count, 2);
    assert!(metrics.resolution_rate.abs() < f64::EPSILON);
}

#[tokio::test]
async fn resolution_rate_matches_incremental_example() {
    let provider = LocalProvider::new(
        DirectiveSource::Directory("/unused".into()),
        Arc::new(LeastUsedSelector),
    );
    let id = "meaning-convergent-ambiguous-v1";
    provider.send_feedback(&feedback(id, true)).await.unwrap();
    provider.send_feedback(&feedback(id, false)).await.unwrap();

    let metrics = provider.metrics_for(id).unwrap();
    assert_eq!(metrics.usage_count, 2);
    assert!((metrics.resolution_rate - 0.5).abs() < f64::EPSILON);
    assert_eq!(provider.metrics_snapshot().len(), 1);
}
