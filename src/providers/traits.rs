use crate::error::Result;
use crate::protocol::{Directive, FeedbackRecord, StructuralRequest};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Source of inquiry directives plus sink for episode outcomes.
///
/// Remote and local implementations are interchangeable behind this trait;
/// callers never see which one is active.
pub trait DirectiveProvider: Send + Sync {
    /// Provider identifier (e.g. "remote", "local").
    fn name(&self) -> &str;

    /// Fetch a directive for a structural stop request.
    fn fetch_directive<'a>(
        &'a self,
        request: &'a StructuralRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Directive>> + Send + 'a>>;

    /// Accept structural outcome feedback for a completed stop episode.
    fn send_feedback<'a>(
        &'a self,
        record: &'a FeedbackRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

impl<P: DirectiveProvider + ?Sized> DirectiveProvider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_directive<'a>(
        &'a self,
        request: &'a StructuralRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Directive>> + Send + 'a>> {
        (**self).fetch_directive(request)
    }

    fn send_feedback<'a>(
        &'a self,
        record: &'a FeedbackRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        (**self).send_feedback(record)
    }
}
