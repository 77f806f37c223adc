use super::hooks::{ClarifyEvent, ClarifyObserver, dispatch};
use super::render::QuestionRenderer;
use crate::error::{ClarifyError, Result};
use crate::protocol::{FeedbackRecord, RenderingSpec, Stage, StructuralRequest};
use crate::providers::DirectiveProvider;
use serde::Serialize;
use std::sync::Arc;

/// Result of one `ensure_clarified` call.
///
/// `clarified == false` means the caller must ask `question` and wait for a
/// human answer before acting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClarifyOutcome {
    pub clarified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directive_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

impl ClarifyOutcome {
    pub fn cleared() -> Self {
        Self {
            clarified: true,
            question: None,
            directive_id: None,
            stage: None,
        }
    }

    pub fn needs_answer(&self) -> bool {
        !self.clarified
    }
}

/// Stop/ask/proceed entry point for an agent.
///
/// `C` is the caller's local context type. It is handed to the renderer and
/// to nothing else.
pub struct Enforcer<C: ?Sized = str> {
    provider: Arc<dyn DirectiveProvider>,
    renderer: Arc<dyn QuestionRenderer<C>>,
    observers: Vec<Arc<dyn ClarifyObserver>>,
}

impl<C: ?Sized + Sync> Enforcer<C> {
    pub fn new(
        provider: Arc<dyn DirectiveProvider>,
        renderer: Arc<dyn QuestionRenderer<C>>,
    ) -> Self {
        Self {
            provider,
            renderer,
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ClarifyObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    #[must_use]
    pub fn with_observers(
        mut self,
        observers: impl IntoIterator<Item = Arc<dyn ClarifyObserver>>,
    ) -> Self {
        self.observers.extend(observers);
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    fn emit(&self, event: &ClarifyEvent) {
        dispatch(&self.observers, event);
    }

    /// Decide whether the agent may proceed.
    ///
    /// Without a stop trigger this returns a cleared outcome and makes no
    /// provider call. Otherwise a directive is fetched, rendered into a
    /// question, and returned uncleared. Any failure is returned as is; it is
    /// never turned into a cleared outcome.
    pub async fn ensure_clarified(
        &self,
        context: &C,
        request: &StructuralRequest,
    ) -> Result<ClarifyOutcome> {
        if !request.stop_trigger {
            self.emit(&ClarifyEvent::Skipped {
                stage: request.stage,
                mode: request.mode,
            });
            return Ok(ClarifyOutcome::cleared());
        }

        self.emit(&ClarifyEvent::StopDetected {
            request: request.clone(),
        });
        match self.ask(context, request).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.emit(&ClarifyEvent::Failed {
                    stage: request.stage,
                    error: e.event_summary(),
                });
                Err(e)
            }
        }
    }

    async fn ask(&self, context: &C, request: &StructuralRequest) -> Result<ClarifyOutcome> {
        let directive = self.provider.fetch_directive(request).await?;
        self.emit(&ClarifyEvent::DirectiveReceived {
            provider: self.provider.name().to_string(),
            directive_id: directive.id.clone(),
            stage: directive.stage,
        });

        let spec = RenderingSpec::from(&directive);
        let question = self.renderer.render(context, &spec).await?;
        if question.trim().is_empty() {
            return Err(ClarifyError::Protocol(format!(
                "renderer produced an empty question for directive {}",
                directive.id
            )));
        }

        self.emit(&ClarifyEvent::QuestionGenerated {
            directive_id: directive.id.clone(),
            spec,
            question: question.clone(),
        });
        Ok(ClarifyOutcome {
            clarified: false,
            question: Some(question),
            directive_id: Some(directive.id),
            stage: Some(request.stage),
        })
    }

    /// Report how a stop episode ended.
    pub async fn send_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        self.provider.send_feedback(record).await
    }
}
