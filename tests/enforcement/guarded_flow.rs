use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use stopgate::config::LocalConfig;
use stopgate::enforcement::{ClarifyEvent, LogObserver};
use stopgate::providers::local::{LatestVersionSelector, Outcome};
use stopgate::{
    ClarifyError, ClarifyObserver, DirectiveProvider, Enforcer, FeedbackRecord, GuardedAction,
    LocalProvider, Mode, QuestionRenderer, RenderingSpec, Stage, StopgateConfig,
    StructuralRequest,
};
use tempfile::TempDir;

use super::directives::{directive_json, meaning_directive, write_json};

#[derive(Default)]
struct EventLog(Mutex<Vec<String>>);

impl ClarifyObserver for EventLog {
    fn on_event(&self, event: &ClarifyEvent) -> anyhow::Result<()> {
        self.0
            .lock()
            .map_err(|_| anyhow::anyhow!("event log poisoned"))?
            .push(event.kind().to_string());
        Ok(())
    }

    fn name(&self) -> &str {
        "event-log"
    }
}

struct Broken;

impl ClarifyObserver for Broken {
    fn on_event(&self, _event: &ClarifyEvent) -> anyhow::Result<()> {
        anyhow::bail!("metrics sink offline")
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn renderer() -> Arc<dyn QuestionRenderer<str>> {
    Arc::new(|context: &str, spec: &RenderingSpec| {
        let question = format!("For {context}, which {} applies?", spec.topics[0]);
        async move { Ok::<_, anyhow::Error>(question) }
    })
}

fn directive_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_json(dir.path(), "m1.json", &meaning_directive(1));
    write_json(dir.path(), "m2.json", &meaning_directive(2));
    write_json(
        dir.path(),
        "p1.json",
        &directive_json("purpose-reflective-goal-v1", "purpose", "reflective", "goal"),
    );
    dir
}

#[tokio::test]
async fn full_episode_with_local_provider() {
    let dir = directive_dir();
    let exported = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&exported);
    let config = LocalConfig {
        directory: Some(dir.path().to_string_lossy().into_owned()),
        ..LocalConfig::default()
    };
    let provider = Arc::new(
        LocalProvider::from_config(&config, Arc::new(LatestVersionSelector))
            .unwrap()
            .with_exporter(Box::new(move |outcomes: &[Outcome]| -> anyhow::Result<()> {
                sink.fetch_add(outcomes.len(), Ordering::SeqCst);
                Ok(())
            })),
    );
    let events = Arc::new(EventLog::default());
    let enforcer = Enforcer::new(provider.clone(), renderer())
        .with_observer(Arc::new(Broken))
        .with_observer(Arc::new(LogObserver::new()))
        .with_observer(events.clone());

    let request = StructuralRequest::new(Stage::Meaning, Mode::Convergent, true)
        .with_pattern("ambiguous");
    let outcome = enforcer
        .ensure_clarified("the migration plan", &request)
        .await
        .expect("stop should produce a question");
    assert_eq!(
        outcome.directive_id.as_deref(),
        Some("meaning-convergent-ambiguous-v2")
    );

    let guard = GuardedAction::from_outcome(&outcome).unwrap();
    let GuardedAction::Awaiting(awaiting) = guard.clone() else {
        panic!("uncleared outcome should yield an awaiting guard");
    };
    assert_eq!(awaiting.stage(), Stage::Meaning);
    assert_eq!(
        awaiting.question(),
        "For the migration plan, which scope applies?"
    );

    let err = guard.proceed(|| async { "deployed" }).await.unwrap_err();
    assert!(matches!(
        err,
        ClarifyError::UnresolvedStop {
            stage: Stage::Meaning,
            ..
        }
    ));

    let cleared = awaiting.resolve("the database part");
    assert_eq!(cleared.answer(), Some("the database part"));
    assert_eq!(cleared.proceed(|| async { "deployed" }).await, "deployed");

    enforcer
        .send_feedback(
            &FeedbackRecord::new(
                "meaning-convergent-ambiguous-v2",
                "ambiguous",
                Mode::Convergent,
                true,
            )
            .with_stages(Stage::Meaning, Stage::Purpose)
            .with_turn_delta(3)
            .with_latency_ms(1_200),
        )
        .await
        .unwrap();

    let metrics = provider
        .metrics_for("meaning-convergent-ambiguous-v2")
        .unwrap();
    assert_eq!(metrics.usage_count, 1);
    assert!((metrics.mean_turns - 3.0).abs() < f64::EPSILON);
    assert_eq!(metrics.stage_advance_rate, Some(1.0));
    assert_eq!(metrics.mean_latency_ms, Some(1_200.0));

    assert_eq!(provider.flush_outcomes().unwrap(), 1);
    assert_eq!(exported.load(Ordering::SeqCst), 1);

    assert_eq!(
        *events.0.lock().unwrap(),
        [
            "clarify.stop_detected",
            "clarify.directive_received",
            "clarify.question_generated"
        ]
    );
}

#[tokio::test]
async fn config_built_provider_drives_enforcer() {
    let dir = directive_dir();
    let mut config = StopgateConfig::default();
    config.local.directory = Some(dir.path().to_string_lossy().into_owned());

    let provider = config.build_provider().expect("local provider should build");
    assert_eq!(provider.name(), "local");
    let enforcer = Enforcer::new(provider, renderer());

    let request = StructuralRequest::new(Stage::Purpose, Mode::Reflective, true);
    let outcome = enforcer.ensure_clarified("the roadmap", &request).await.unwrap();
    assert_eq!(
        outcome.directive_id.as_deref(),
        Some("purpose-reflective-goal-v1")
    );
    assert_eq!(outcome.stage, Some(Stage::Purpose));
}

#[tokio::test]
async fn missing_candidates_surface_through_enforcer() {
    let dir = directive_dir();
    let config = LocalConfig {
        directory: Some(dir.path().to_string_lossy().into_owned()),
        ..LocalConfig::default()
    };
    let provider =
        LocalProvider::from_config(&config, Arc::new(LatestVersionSelector)).unwrap();
    let events = Arc::new(EventLog::default());
    let enforcer = Enforcer::new(Arc::new(provider), renderer()).with_observer(events.clone());

    let request = StructuralRequest::new(Stage::Action, Mode::Convergent, true);
    let err = enforcer
        .ensure_clarified("ctx", &request)
        .await
        .unwrap_err();
    assert!(matches!(err, ClarifyError::NoCandidates { .. }));
    assert_eq!(
        *events.0.lock().unwrap(),
        ["clarify.stop_detected", "clarify.failed"]
    );
}

#[tokio::test]
async fn cleared_outcome_proceeds_directly() {
    let dir = directive_dir();
    let config = LocalConfig {
        directory: Some(dir.path().to_string_lossy().into_owned()),
        ..LocalConfig::default()
    };
    let provider =
        LocalProvider::from_config(&config, Arc::new(LatestVersionSelector)).unwrap();
    let enforcer = Enforcer::new(Arc::new(provider), renderer());

    let request = StructuralRequest::new(Stage::Intention, Mode::Convergent, false);
    let outcome = enforcer.ensure_clarified("ctx", &request).await.unwrap();
    let value = GuardedAction::from_outcome(&outcome)
        .unwrap()
        .proceed_sync(|| 7)
        .unwrap();
    assert_eq!(value, 7);
}
