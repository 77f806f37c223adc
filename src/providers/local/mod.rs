//! Directive provider backed by an in-memory cache of local directives.
//!
//! The cache is filled lazily on the first fetch from a directory of JSON
//! files or a URL. Selection among matching candidates is delegated to a
//! [`Selector`]; accepted feedback feeds per-directive running metrics.

pub mod metrics;
pub mod selector;
pub mod source;

pub use metrics::{DirectiveMetrics, MetricsExporter, MetricsSnapshot, Outcome, OutcomeBuffer};
pub use selector::{LatestVersionSelector, LeastUsedSelector, ResolutionRateSelector, Selector};
pub use source::DirectiveSource;

use crate::config::LocalConfig;
use crate::error::{ClarifyError, Result};
use crate::protocol::{
    Directive, FeedbackRecord, StructuralRequest, validate_directive, validate_feedback,
    validate_request,
};
use crate::providers::traits::DirectiveProvider;
use metrics::MetricsState;
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Loaded directives keyed by id. Later entries with the same id win.
type DirectiveCache = BTreeMap<String, Arc<Directive>>;

const DEFAULT_BUFFER_CAPACITY: usize = 1_000;

pub struct LocalProvider {
    source: Option<DirectiveSource>,
    selector: Arc<dyn Selector>,
    cache: RwLock<Option<Arc<DirectiveCache>>>,
    metrics: Mutex<MetricsState>,
    exporter: Option<Box<dyn MetricsExporter>>,
}

fn into_cache(directives: Vec<Directive>) -> DirectiveCache {
    directives
        .into_iter()
        .map(|d| (d.id.clone(), Arc::new(d)))
        .collect()
}

impl LocalProvider {
    /// Provider that loads from `source` on first use.
    pub fn new(source: DirectiveSource, selector: Arc<dyn Selector>) -> Self {
        Self {
            source: Some(source),
            selector,
            cache: RwLock::new(None),
            metrics: Mutex::new(MetricsState::new(DEFAULT_BUFFER_CAPACITY)),
            exporter: None,
        }
    }

    /// Build from config without touching the filesystem or network.
    pub fn from_config(config: &LocalConfig, selector: Arc<dyn Selector>) -> Result<Self> {
        let source =
            DirectiveSource::from_settings(config.directory.as_deref(), config.url.as_deref())
                .ok_or_else(|| {
                    ClarifyError::Configuration(
                        "local provider needs [local].directory or [local].url".into(),
                    )
                })?;
        Ok(Self::new(source, selector).with_buffer_capacity(config.metrics_buffer_capacity))
    }

    /// Provider over a fixed, already-loaded directive set. Each directive is
    /// validated up front.
    pub fn from_directives(directives: Vec<Directive>, selector: Arc<dyn Selector>) -> Result<Self> {
        for directive in &directives {
            validate_directive(directive)?;
        }
        Ok(Self {
            source: None,
            selector,
            cache: RwLock::new(Some(Arc::new(into_cache(directives)))),
            metrics: Mutex::new(MetricsState::new(DEFAULT_BUFFER_CAPACITY)),
            exporter: None,
        })
    }

    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.metrics = Mutex::new(MetricsState::new(capacity));
        self
    }

    #[must_use]
    pub fn with_exporter(mut self, exporter: Box<dyn MetricsExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    fn metrics_state(&self) -> MutexGuard<'_, MetricsState> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn cached(&self) -> Option<Arc<DirectiveCache>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, cache: DirectiveCache) -> Arc<DirectiveCache> {
        let cache = Arc::new(cache);
        *self.cache.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&cache));
        cache
    }

    /// Return the cache, loading it on first use. Concurrent first calls may
    /// each load; the last store wins.
    async fn ensure_loaded(&self) -> Result<Arc<DirectiveCache>> {
        if let Some(cache) = self.cached() {
            return Ok(cache);
        }
        let Some(source) = &self.source else {
            return Ok(self.store(DirectiveCache::new()));
        };
        let directives = source.load().await?;
        Ok(self.store(into_cache(directives)))
    }

    /// Drop the cache and load again from the source. Returns the number of
    /// directives now cached. A provider built from a fixed set keeps it.
    pub async fn reload(&self) -> Result<usize> {
        let Some(source) = &self.source else {
            return Ok(self.cached().map_or(0, |c| c.len()));
        };
        let directives = source.load().await?;
        Ok(self.store(into_cache(directives)).len())
    }

    /// Candidates matching stage, mode and (when given) pattern, newest first.
    pub async fn candidates(&self, request: &StructuralRequest) -> Result<Vec<Arc<Directive>>> {
        let cache = self.ensure_loaded().await?;
        let pattern = request.pattern_id.as_deref();
        let mut candidates: Vec<Arc<Directive>> = cache
            .values()
            .filter(|d| d.stage == request.stage && d.mode == request.mode)
            .filter(|d| pattern.is_none_or(|p| d.stop_reason == p))
            .cloned()
            .collect();
        candidates.sort_by_key(|d| std::cmp::Reverse(d.version()));
        Ok(candidates)
    }

    async fn choose(&self, request: &StructuralRequest) -> Result<Directive> {
        validate_request(request)?;
        let candidates = self.candidates(request).await?;
        if candidates.is_empty() {
            return Err(ClarifyError::NoCandidates {
                stage: request.stage.to_string(),
                mode: request.mode.to_string(),
                pattern: request.pattern_id.clone().unwrap_or_else(|| "*".into()),
            });
        }

        let snapshot = self.metrics_snapshot();
        let chosen = self
            .selector
            .select(&candidates, request, &snapshot)
            .ok_or_else(|| ClarifyError::Selection("selector returned no directive".into()))?;
        if !candidates.iter().any(|c| Arc::ptr_eq(c, &chosen)) {
            return Err(ClarifyError::Selection(format!(
                "selector returned `{}`, which is not one of the offered candidates",
                chosen.id
            )));
        }
        tracing::debug!(
            directive_id = %chosen.id,
            candidates = candidates.len(),
            "Selected local directive"
        );
        Ok(Directive::clone(&chosen))
    }

    fn accept_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        validate_feedback(record)?;
        let mut state = self.metrics_state();
        let metrics = state.record(record);
        tracing::debug!(
            directive_id = %record.directive_id,
            usage = metrics.usage_count,
            resolution_rate = metrics.resolution_rate,
            "Recorded directive feedback"
        );
        Ok(())
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics_state().snapshot()
    }

    pub fn metrics_for(&self, directive_id: &str) -> Option<DirectiveMetrics> {
        self.metrics_state().get(directive_id)
    }

    pub fn buffered_outcomes(&self) -> usize {
        self.metrics_state().outcomes().len()
    }

    pub fn dropped_outcomes(&self) -> u64 {
        self.metrics_state().outcomes().dropped()
    }

    /// Drain buffered outcomes into the exporter, if one is set. Returns the
    /// number of outcomes drained. Exporter failures are reported after the
    /// buffer has been emptied.
    pub fn flush_outcomes(&self) -> Result<usize> {
        let outcomes = self.metrics_state().drain_outcomes();
        let count = outcomes.len();
        if let Some(exporter) = &self.exporter
            && !outcomes.is_empty()
        {
            exporter.export(&outcomes)?;
        }
        Ok(count)
    }
}

impl DirectiveProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn fetch_directive<'a>(
        &'a self,
        request: &'a StructuralRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Directive>> + Send + 'a>> {
        Box::pin(self.choose(request))
    }

    fn send_feedback<'a>(
        &'a self,
        record: &'a FeedbackRecord,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move { self.accept_feedback(record) })
    }
}
