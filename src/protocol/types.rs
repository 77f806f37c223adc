use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

// Stage: which layer of human-supplied direction is missing
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Meaning,
    Purpose,
    Intention,
    Action,
}

// Mode: shape of the question to be asked
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Convergent,
    Reflective,
}

/// Aggregate signals about earlier stops in the same session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSignals {
    pub prior_stop_count: u32,
    pub consecutive_unresolved_count: u32,
    pub mean_resolution_turns: f64,
}

/// Structural description of why the agent wants to stop.
///
/// Every optional field is bounded (enum, kebab-case id, or numeric range).
/// Nothing here may carry free-form user text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralRequest {
    pub stage: Stage,
    pub mode: Mode,
    pub stop_trigger: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_signals: Option<SessionSignals>,
}

impl StructuralRequest {
    pub fn new(stage: Stage, mode: Mode, stop_trigger: bool) -> Self {
        Self {
            stage,
            mode,
            stop_trigger,
            stop_reason: None,
            pattern_id: None,
            domain_tag: None,
            complexity: None,
            session_signals: None,
        }
    }

    pub fn with_pattern(mut self, pattern_id: impl Into<String>) -> Self {
        self.pattern_id = Some(pattern_id.into());
        self
    }

    pub fn with_stop_reason(mut self, reason: impl Into<String>) -> Self {
        self.stop_reason = Some(reason.into());
        self
    }

    pub fn with_domain_tag(mut self, tag: impl Into<String>) -> Self {
        self.domain_tag = Some(tag.into());
        self
    }

    pub fn with_complexity(mut self, complexity: u8) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_session_signals(mut self, signals: SessionSignals) -> Self {
        self.session_signals = Some(signals);
        self
    }
}

/// Inquiry blueprint: describes why and how to ask, never the question itself.
///
/// Ids follow `{stage}-{mode}-{pattern}-v{N}`; only the `-v{N}` suffix carries
/// meaning (ordering).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Directive {
    pub id: String,
    pub intent: String,
    pub stage: Stage,
    pub mode: Mode,
    pub target_topics: Vec<String>,
    pub tone_hint: String,
    pub audience_hint: String,
    pub render_hint: String,
    #[serde(default)]
    pub example_list: Vec<String>,
    pub stop_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_guidance: Option<String>,
}

impl Directive {
    /// Version parsed from the `-v{N}` id suffix; 0 when absent or unparsable.
    pub fn version(&self) -> u32 {
        parse_version(&self.id)
    }
}

pub(crate) fn parse_version(id: &str) -> u32 {
    id.rsplit_once("-v")
        .and_then(|(_, suffix)| {
            if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
                None
            } else {
                suffix.parse::<u32>().ok()
            }
        })
        .unwrap_or(0)
}

/// Read-only projection of a [`Directive`] handed to the question renderer.
///
/// Built by copying, so a renderer holding it cannot reach the source
/// directive.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderingSpec {
    pub stage: Stage,
    pub topics: Vec<String>,
    pub tone: String,
    pub audience: String,
    pub stop_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl From<&Directive> for RenderingSpec {
    fn from(directive: &Directive) -> Self {
        Self {
            stage: directive.stage,
            topics: directive.target_topics.clone(),
            tone: directive.tone_hint.clone(),
            audience: directive.audience_hint.clone(),
            stop_reason: directive.stop_reason.clone(),
            guidance: directive.llm_guidance.clone(),
            examples: directive.example_list.clone(),
        }
    }
}

/// Structural outcome of one completed stop episode.
///
/// Not idempotent: sending the same record twice counts it twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    #[serde(default, alias = "blueprintId")]
    pub directive_id: String,
    pub pattern_id: String,
    pub mode: Mode,
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_prev: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage_next: Option<Stage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_delta: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycle_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl FeedbackRecord {
    pub fn new(
        directive_id: impl Into<String>,
        pattern_id: impl Into<String>,
        mode: Mode,
        resolved: bool,
    ) -> Self {
        Self {
            directive_id: directive_id.into(),
            pattern_id: pattern_id.into(),
            mode,
            resolved,
            stage_prev: None,
            stage_next: None,
            turn_delta: None,
            confirm_count: None,
            cycle_count: None,
            latency_ms: None,
        }
    }

    pub fn with_stages(mut self, prev: Stage, next: Stage) -> Self {
        self.stage_prev = Some(prev);
        self.stage_next = Some(next);
        self
    }

    pub fn with_turn_delta(mut self, delta: i32) -> Self {
        self.turn_delta = Some(delta);
        self
    }

    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}
