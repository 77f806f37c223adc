use crate::protocol::FeedbackRecord;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Running performance statistics for one directive.
///
/// Updated incrementally; no raw history is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveMetrics {
    pub usage_count: u64,
    pub resolution_rate: f64,
    pub mean_turns: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_advance_rate: Option<f64>,
    #[serde(skip)]
    resolved_turn_events: u64,
    #[serde(skip)]
    latency_events: u64,
    #[serde(skip)]
    stage_events: u64,
}

/// Fold `sample` into a running mean that already covers `count` samples.
#[allow(clippy::cast_precision_loss)]
fn running_mean(mean: f64, count: u64, sample: f64) -> f64 {
    let n = (count + 1) as f64;
    mean + (sample - mean) / n
}

impl DirectiveMetrics {
    #[allow(clippy::cast_precision_loss)]
    pub fn apply(&mut self, record: &FeedbackRecord) {
        let prev_usage = self.usage_count;
        self.usage_count += 1;
        let hit = if record.resolved { 1.0 } else { 0.0 };
        self.resolution_rate =
            (self.resolution_rate * prev_usage as f64 + hit) / self.usage_count as f64;

        if record.resolved
            && let Some(delta) = record.turn_delta
        {
            let turns = f64::from(delta.unsigned_abs());
            self.mean_turns = running_mean(self.mean_turns, self.resolved_turn_events, turns);
            self.resolved_turn_events += 1;
        }

        if let (Some(prev), Some(next)) = (record.stage_prev, record.stage_next) {
            let advanced = if prev == next { 0.0 } else { 1.0 };
            let rate = self.stage_advance_rate.unwrap_or(0.0);
            self.stage_advance_rate = Some(running_mean(rate, self.stage_events, advanced));
            self.stage_events += 1;
        }

        if let Some(latency) = record.latency_ms {
            let mean = self.mean_latency_ms.unwrap_or(0.0);
            self.mean_latency_ms = Some(running_mean(mean, self.latency_events, latency as f64));
            self.latency_events += 1;
        }
    }
}

/// Read-only copy of all per-directive metrics, keyed by directive id.
pub type MetricsSnapshot = HashMap<String, DirectiveMetrics>;

/// One accepted feedback record with its arrival time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub record: FeedbackRecord,
    pub recorded_at: DateTime<Utc>,
}

/// Receives drained outcomes; implementations decide where they go.
pub trait MetricsExporter: Send + Sync {
    fn export(&self, outcomes: &[Outcome]) -> anyhow::Result<()>;
}

impl<F> MetricsExporter for F
where
    F: Fn(&[Outcome]) -> anyhow::Result<()> + Send + Sync,
{
    fn export(&self, outcomes: &[Outcome]) -> anyhow::Result<()> {
        self(outcomes)
    }
}

/// Bounded FIFO of recent outcomes. When full, the oldest entry is dropped.
#[derive(Debug)]
pub struct OutcomeBuffer {
    items: VecDeque<Outcome>,
    capacity: usize,
    dropped: u64,
}

impl OutcomeBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, outcome: Outcome) {
        if self.capacity == 0 {
            self.dropped += 1;
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
            self.dropped += 1;
        }
        self.items.push_back(outcome);
    }

    pub fn drain(&mut self) -> Vec<Outcome> {
        self.items.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

/// Per-directive metrics plus the outcome buffer, updated together.
#[derive(Debug)]
pub(crate) struct MetricsState {
    per_directive: HashMap<String, DirectiveMetrics>,
    outcomes: OutcomeBuffer,
}

impl MetricsState {
    pub(crate) fn new(buffer_capacity: usize) -> Self {
        Self {
            per_directive: HashMap::new(),
            outcomes: OutcomeBuffer::new(buffer_capacity),
        }
    }

    pub(crate) fn record(&mut self, record: &FeedbackRecord) -> &DirectiveMetrics {
        self.outcomes.push(Outcome {
            record: record.clone(),
            recorded_at: Utc::now(),
        });
        let metrics = self
            .per_directive
            .entry(record.directive_id.clone())
            .or_default();
        metrics.apply(record);
        metrics
    }

    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        self.per_directive.clone()
    }

    pub(crate) fn get(&self, directive_id: &str) -> Option<DirectiveMetrics> {
        self.per_directive.get(directive_id).cloned()
    }

    pub(crate) fn outcomes(&self) -> &OutcomeBuffer {
        &self.outcomes
    }

    pub(crate) fn drain_outcomes(&mut self) -> Vec<Outcome> {
        self.outcomes.drain()
    }
}
