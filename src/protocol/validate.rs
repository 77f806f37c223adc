//! Wire-contract checks for everything that crosses the provider boundary.
//!
//! Structural fields are kebab-case ids, enums or bounded numbers. A field
//! that looks like prose is rejected as [`ClarifyError::SemanticContent`]
//! without echoing its value.

use super::types::{Directive, FeedbackRecord, StructuralRequest};
use crate::error::{ClarifyError, Result};

pub const MAX_STRUCTURAL_ID_CHARS: usize = 64;
pub const MAX_DIRECTIVE_ID_CHARS: usize = 100;
pub const MAX_HINT_CHARS: usize = 200;
pub const MAX_TOPIC_CHARS: usize = 100;
pub const MAX_TOPICS: usize = 10;
pub const MAX_EXAMPLES: usize = 5;
pub const MAX_EXAMPLE_CHARS: usize = 200;
pub const MAX_GUIDANCE_CHARS: usize = 500;
pub const COMPLEXITY_RANGE: std::ops::RangeInclusive<u8> = 1..=5;
pub const TURN_DELTA_RANGE: std::ops::RangeInclusive<i32> = -1000..=1000;

/// Whether `value` reads like natural language rather than an identifier.
pub fn looks_like_free_text(value: &str) -> bool {
    value.chars().any(char::is_whitespace)
        || value
            .chars()
            .any(|c| matches!(c, '?' | '!' | ',' | ';' | '"' | '\''))
}

pub fn is_kebab_case(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && !value.ends_with('-')
        && !value.contains("--")
        && value
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

fn check_structural_id(field: &str, value: &str) -> Result<()> {
    if looks_like_free_text(value) {
        return Err(ClarifyError::SemanticContent {
            field: field.to_string(),
        });
    }
    if value.chars().count() > MAX_STRUCTURAL_ID_CHARS {
        return Err(ClarifyError::Validation(format!(
            "{field} exceeds {MAX_STRUCTURAL_ID_CHARS} characters"
        )));
    }
    if !is_kebab_case(value) {
        return Err(ClarifyError::Validation(format!(
            "{field} must be kebab-case"
        )));
    }
    Ok(())
}

fn check_bounded(field: &str, value: &str, max: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClarifyError::Validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max {
        return Err(ClarifyError::Validation(format!(
            "{field} exceeds {max} characters"
        )));
    }
    Ok(())
}

fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ClarifyError::Validation(format!(
            "{field} must be a finite non-negative number"
        )));
    }
    Ok(())
}

pub fn validate_request(request: &StructuralRequest) -> Result<()> {
    if let Some(reason) = &request.stop_reason {
        check_structural_id("stopReason", reason)?;
    }
    if let Some(pattern) = &request.pattern_id {
        check_structural_id("patternId", pattern)?;
    }
    if let Some(tag) = &request.domain_tag {
        check_structural_id("domainTag", tag)?;
    }
    if let Some(complexity) = request.complexity
        && !COMPLEXITY_RANGE.contains(&complexity)
    {
        return Err(ClarifyError::Validation(format!(
            "complexity {complexity} outside 1..=5"
        )));
    }
    if let Some(signals) = &request.session_signals {
        check_non_negative(
            "sessionSignals.meanResolutionTurns",
            signals.mean_resolution_turns,
        )?;
    }
    Ok(())
}

pub fn validate_directive(directive: &Directive) -> Result<()> {
    check_bounded("id", &directive.id, MAX_DIRECTIVE_ID_CHARS)?;
    if directive.id.chars().any(char::is_whitespace) {
        return Err(ClarifyError::SemanticContent {
            field: "id".to_string(),
        });
    }
    check_bounded("intent", &directive.intent, MAX_HINT_CHARS)?;
    check_bounded("toneHint", &directive.tone_hint, MAX_HINT_CHARS)?;
    check_bounded("audienceHint", &directive.audience_hint, MAX_HINT_CHARS)?;
    check_bounded("renderHint", &directive.render_hint, MAX_HINT_CHARS)?;
    check_bounded("stopReason", &directive.stop_reason, MAX_DIRECTIVE_ID_CHARS)?;

    if directive.target_topics.is_empty() || directive.target_topics.len() > MAX_TOPICS {
        return Err(ClarifyError::Validation(format!(
            "targetTopics must hold 1..={MAX_TOPICS} entries, got {}",
            directive.target_topics.len()
        )));
    }
    for topic in &directive.target_topics {
        check_bounded("targetTopics[]", topic, MAX_TOPIC_CHARS)?;
    }

    if directive.example_list.len() > MAX_EXAMPLES {
        return Err(ClarifyError::Validation(format!(
            "exampleList holds at most {MAX_EXAMPLES} entries, got {}",
            directive.example_list.len()
        )));
    }
    for example in &directive.example_list {
        check_bounded("exampleList[]", example, MAX_EXAMPLE_CHARS)?;
    }

    if let Some(guidance) = &directive.llm_guidance {
        check_bounded("llmGuidance", guidance, MAX_GUIDANCE_CHARS)?;
    }
    Ok(())
}

pub fn validate_feedback(record: &FeedbackRecord) -> Result<()> {
    if record.directive_id.trim().is_empty() {
        return Err(ClarifyError::Validation(
            "feedback is missing blueprintId".to_string(),
        ));
    }
    check_bounded("blueprintId", &record.directive_id, MAX_DIRECTIVE_ID_CHARS)?;
    check_structural_id("patternId", &record.pattern_id)?;
    if let Some(delta) = record.turn_delta
        && !TURN_DELTA_RANGE.contains(&delta)
    {
        return Err(ClarifyError::Validation(format!(
            "turnDelta {delta} outside -1000..=1000"
        )));
    }
    Ok(())
}

/// Parse and validate a directive from raw JSON.
pub fn parse_directive(value: serde_json::Value) -> Result<Directive> {
    let directive: Directive = serde_json::from_value(value)
        .map_err(|e| ClarifyError::Validation(format!("malformed directive: {e}")))?;
    validate_directive(&directive)?;
    Ok(directive)
}
