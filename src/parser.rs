//! Tolerant extraction of a [`GeneratedRecord`] from free-form model output.
//!
//! The raw text goes through a fixed chain of pure stages:
//! trim, strip one code fence, slice to the outermost braces, then a list of
//! parse attempts tried in order. The first attempt that yields a JSON object
//! wins; if none does, the caller gets an all-empty record tagged as degraded.

use serde_json::Value;
use std::borrow::Cow;
use tracing::{debug, warn};

use crate::record::GeneratedRecord;

/// Result of parsing one response. Never an error: the worst case is `Degraded`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// Payload parsed on the first attempt
    Parsed(GeneratedRecord),
    /// Payload parsed only after a cleanup attempt
    Recovered(GeneratedRecord),
    /// Nothing recoverable; record holds empty defaults
    Degraded { record: GeneratedRecord, reason: String },
}

impl ParseOutcome {
    pub fn record(&self) -> &GeneratedRecord {
        match self {
            Self::Parsed(record) | Self::Recovered(record) => record,
            Self::Degraded { record, .. } => record,
        }
    }

    pub fn into_record(self) -> GeneratedRecord {
        match self {
            Self::Parsed(record) | Self::Recovered(record) => record,
            Self::Degraded { record, .. } => record,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// One parse attempt: a transformation applied before strict parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    Strict,
    ControlCharsStripped,
}

const ATTEMPTS: [Attempt; 2] = [Attempt::Strict, Attempt::ControlCharsStripped];

impl Attempt {
    fn prepare<'a>(&self, payload: &'a str) -> Cow<'a, str> {
        match self {
            Self::Strict => Cow::Borrowed(payload),
            Self::ControlCharsStripped => Cow::Owned(strip_control_chars(payload)),
        }
    }
}

/// Parse a raw response into a record
pub fn parse_response(raw: &str) -> ParseOutcome {
    let payload = slice_to_braces(strip_code_fence(raw.trim()));

    let mut last_error = String::from("empty response");
    for attempt in ATTEMPTS {
        match parse_payload(&attempt.prepare(payload)) {
            Ok(record) if attempt == Attempt::Strict => return ParseOutcome::Parsed(record),
            Ok(record) => {
                debug!("Response parsed after {:?} cleanup", attempt);
                return ParseOutcome::Recovered(record);
            }
            Err(e) => last_error = e,
        }
    }

    let preview: String = payload.chars().take(200).collect();
    ParseOutcome::Degraded {
        record: GeneratedRecord::default(),
        reason: format!("{} (response starts with: {:?})", last_error, preview),
    }
}

/// Remove a single leading and trailing markdown fence
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let mut text = text;
    if let Some(rest) = text.strip_prefix("```json") {
        text = rest;
    } else if let Some(rest) = text.strip_prefix("```") {
        text = rest;
    }
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim()
}

/// Slice from the first `{` to the last `}`, or return the text unchanged
pub(crate) fn slice_to_braces(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text,
    }
}

/// Drop C0/C1 control characters (including raw newlines inside strings)
pub(crate) fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| !c.is_control()).collect()
}

/// Strictly parse a JSON object and normalize it into a record
pub(crate) fn parse_payload(text: &str) -> Result<GeneratedRecord, String> {
    let value: Value = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {}", e))?;
    let Value::Object(map) = value else {
        return Err("payload is not a JSON object".to_string());
    };

    for field in ["title", "description", "keywords", "summary"] {
        if !map.contains_key(field) {
            warn!("Generated payload is missing field '{}'", field);
        }
    }

    Ok(GeneratedRecord {
        title_variants: map.get("title").map(title_variants).unwrap_or_default(),
        description: map.get("description").map(text_field).unwrap_or_default(),
        keywords: map.get("keywords").map(keyword_list).unwrap_or_default(),
        summary: map.get("summary").map(text_field).unwrap_or_default(),
    })
}

fn text_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn title_variants(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .map(text_field)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        other => text_field(other)
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

fn keyword_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(text_field).collect(),
        other => {
            debug!("Keywords are not a list, splitting on commas");
            text_field(other)
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        }
    }
}
