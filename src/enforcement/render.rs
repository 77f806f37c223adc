use crate::protocol::RenderingSpec;
use std::future::Future;
use std::pin::Pin;

/// Turns a rendering spec plus the caller's local context into the question
/// shown to the human. This is the only component that sees local context.
pub trait QuestionRenderer<C: ?Sized>: Send + Sync {
    fn render<'a>(
        &'a self,
        context: &'a C,
        spec: &'a RenderingSpec,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;
}

/// Closures returning a future are renderers. The future must own what it
/// needs from the borrowed arguments.
impl<C, F, Fut> QuestionRenderer<C> for F
where
    C: ?Sized,
    F: Fn(&C, &RenderingSpec) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<String>> + Send + 'static,
{
    fn render<'a>(
        &'a self,
        context: &'a C,
        spec: &'a RenderingSpec,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(self(context, spec))
    }
}
