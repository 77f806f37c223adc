use super::metrics::MetricsSnapshot;
use crate::protocol::{Directive, StructuralRequest};
use std::sync::Arc;

/// Chooses one directive out of a filtered candidate list.
///
/// Candidates arrive sorted by version, newest first. The returned value
/// must be one of the given `Arc`s; the provider checks identity and rejects
/// anything else.
pub trait Selector: Send + Sync {
    fn select(
        &self,
        candidates: &[Arc<Directive>],
        request: &StructuralRequest,
        metrics: &MetricsSnapshot,
    ) -> Option<Arc<Directive>>;
}

impl<F> Selector for F
where
    F: Fn(&[Arc<Directive>], &StructuralRequest, &MetricsSnapshot) -> Option<Arc<Directive>>
        + Send
        + Sync,
{
    fn select(
        &self,
        candidates: &[Arc<Directive>],
        request: &StructuralRequest,
        metrics: &MetricsSnapshot,
    ) -> Option<Arc<Directive>> {
        self(candidates, request, metrics)
    }
}

/// Picks the newest version. Default selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatestVersionSelector;

impl Selector for LatestVersionSelector {
    fn select(
        &self,
        candidates: &[Arc<Directive>],
        _request: &StructuralRequest,
        _metrics: &MetricsSnapshot,
    ) -> Option<Arc<Directive>> {
        candidates.first().cloned()
    }
}

/// Picks the candidate with the best resolution rate once it has been used
/// at least `min_usage` times. Falls back to the newest version when no
/// candidate has enough history.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionRateSelector {
    pub min_usage: u64,
}

impl Default for ResolutionRateSelector {
    fn default() -> Self {
        Self { min_usage: 5 }
    }
}

impl Selector for ResolutionRateSelector {
    fn select(
        &self,
        candidates: &[Arc<Directive>],
        _request: &StructuralRequest,
        metrics: &MetricsSnapshot,
    ) -> Option<Arc<Directive>> {
        let mut best: Option<(&Arc<Directive>, f64)> = None;
        for candidate in candidates {
            let Some(m) = metrics.get(&candidate.id) else {
                continue;
            };
            if m.usage_count < self.min_usage {
                continue;
            }
            // Strict comparison keeps the newer version on ties.
            if best.is_none_or(|(_, rate)| m.resolution_rate > rate) {
                best = Some((candidate, m.resolution_rate));
            }
        }
        best.map(|(c, _)| Arc::clone(c))
            .or_else(|| candidates.first().cloned())
    }
}

/// Picks the candidate with the fewest recorded uses, so new versions get
/// exposure. Ties go to the newer version.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeastUsedSelector;

impl Selector for LeastUsedSelector {
    fn select(
        &self,
        candidates: &[Arc<Directive>],
        _request: &StructuralRequest,
        metrics: &MetricsSnapshot,
    ) -> Option<Arc<Directive>> {
        let usage = |d: &Directive| metrics.get(&d.id).map_or(0, |m| m.usage_count);
        let mut best: Option<&Arc<Directive>> = None;
        for candidate in candidates {
            if best.is_none_or(|b| usage(candidate) < usage(b)) {
                best = Some(candidate);
            }
        }
        best.cloned()
    }
}
