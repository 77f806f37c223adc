use crate::config::ObservabilityConfig;
use crate::protocol::{Mode, RenderingSpec, Stage, StructuralRequest};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{info, warn};

/// Events emitted by the enforcer over one stop episode.
///
/// Events never carry the caller's local context.
#[derive(Debug, Clone)]
pub enum ClarifyEvent {
    Skipped {
        stage: Stage,
        mode: Mode,
    },
    StopDetected {
        request: StructuralRequest,
    },
    DirectiveReceived {
        provider: String,
        directive_id: String,
        stage: Stage,
    },
    /// `question` is available for observers that choose to record it;
    /// the built-in observers do not.
    QuestionGenerated {
        directive_id: String,
        spec: RenderingSpec,
        question: String,
    },
    /// `error` is the failure's message, except for collaborator errors,
    /// which are reported by class only.
    Failed {
        stage: Stage,
        error: String,
    },
}

impl ClarifyEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Skipped { .. } => "clarify.skipped",
            Self::StopDetected { .. } => "clarify.stop_detected",
            Self::DirectiveReceived { .. } => "clarify.directive_received",
            Self::QuestionGenerated { .. } => "clarify.question_generated",
            Self::Failed { .. } => "clarify.failed",
        }
    }
}

/// Listener for enforcer events. A failing or panicking observer is logged
/// and skipped; it never interrupts the episode.
pub trait ClarifyObserver: Send + Sync {
    fn on_event(&self, event: &ClarifyEvent) -> anyhow::Result<()>;

    fn name(&self) -> &str;
}

/// Observer that writes events through `tracing`.
#[derive(Default)]
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl ClarifyObserver for LogObserver {
    fn on_event(&self, event: &ClarifyEvent) -> anyhow::Result<()> {
        let kind = event.kind();
        match event {
            ClarifyEvent::Skipped { stage, mode } => {
                info!(stage = %stage, mode = %mode, "{kind}");
            }
            ClarifyEvent::StopDetected { request } => {
                info!(
                    stage = %request.stage,
                    mode = %request.mode,
                    pattern = ?request.pattern_id,
                    stop_reason = ?request.stop_reason,
                    "{kind}"
                );
            }
            ClarifyEvent::DirectiveReceived {
                provider,
                directive_id,
                stage,
            } => {
                info!(provider = %provider, directive_id = %directive_id, stage = %stage, "{kind}");
            }
            ClarifyEvent::QuestionGenerated {
                directive_id, spec, ..
            } => {
                info!(
                    directive_id = %directive_id,
                    stage = %spec.stage,
                    topics = spec.topics.len(),
                    "{kind}"
                );
            }
            ClarifyEvent::Failed { stage, error } => {
                warn!(stage = %stage, error = %error, "{kind}");
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl ClarifyObserver for NoopObserver {
    #[inline(always)]
    fn on_event(&self, _event: &ClarifyEvent) -> anyhow::Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Observer for the configured backend. Unknown backends fall back to noop.
pub fn create_observer(config: &ObservabilityConfig) -> Arc<dyn ClarifyObserver> {
    match config.backend.as_str() {
        "log" => Arc::new(LogObserver::new()),
        "none" | "noop" => Arc::new(NoopObserver),
        _ => {
            warn!(
                "Unknown observability backend '{}', falling back to noop",
                config.backend
            );
            Arc::new(NoopObserver)
        }
    }
}

/// Deliver `event` to every observer in order, isolating failures.
pub(crate) fn dispatch(observers: &[Arc<dyn ClarifyObserver>], event: &ClarifyEvent) {
    for observer in observers {
        match catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(observer = observer.name(), event = event.kind(), error = %e, "Observer hook failed");
            }
            Err(_) => {
                warn!(observer = observer.name(), event = event.kind(), "Observer hook panicked");
            }
        }
    }
}
