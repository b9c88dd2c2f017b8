//! On-disk codec for the loop state record.
//!
//! The record is a YAML front-matter header followed by the task text:
//!
//! ```text
//! ---
//! iteration: 2
//! max_iterations: 50
//! completion_promise: COMPLETE
//! started_at: 2026-01-01T00:00:00Z
//! ---
//! <task text, verbatim, to end of file>
//! ```
//!
//! Decoding never fails. Missing, empty or mistyped fields fall back to
//! defaults so a damaged record still terminates within a bounded number of
//! iterations.

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::{DEFAULT_COMPLETION_TOKEN, DEFAULT_MAX_ITERATIONS, LoopState, RECOVERY_ITERATION};
use crate::error::Result;

const DELIMITER: &str = "---";

const KEY_ITERATION: &str = "iteration";
const KEY_MAX_ITERATIONS: &str = "max_iterations";
const KEY_COMPLETION: &str = "completion_promise";
const KEY_STARTED_AT: &str = "started_at";

#[derive(Debug, Serialize)]
struct Header<'a> {
    iteration: u32,
    max_iterations: u32,
    completion_promise: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    started_at: Option<String>,
}

/// Serialize a state record into its on-disk form
pub fn encode(state: &LoopState) -> Result<String> {
    let header = Header {
        iteration: state.iteration,
        max_iterations: state.max_iterations,
        completion_promise: &state.completion_token,
        started_at: state
            .started_at
            .map(|stamp| stamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
    };
    let yaml = serde_yaml::to_string(&header)?;

    let mut out = String::with_capacity(yaml.len() + state.task.len() + 8);
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&yaml);
    if !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(DELIMITER);
    out.push('\n');
    out.push_str(&state.task);
    Ok(out)
}

/// Parse a state record, substituting defaults for anything unusable
pub fn decode(raw: &str) -> LoopState {
    let (header, task) = split_record(raw);
    let fields = parse_header(header);

    let iteration = count_field(&fields, KEY_ITERATION, RECOVERY_ITERATION);
    let max_iterations = count_field(&fields, KEY_MAX_ITERATIONS, DEFAULT_MAX_ITERATIONS);

    let completion_token = match fields.get(KEY_COMPLETION) {
        Some(Value::String(token)) if !token.is_empty() => token.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        other => {
            warn!("State field {} is {:?}; using {:?}", KEY_COMPLETION, other, DEFAULT_COMPLETION_TOKEN);
            DEFAULT_COMPLETION_TOKEN.to_string()
        }
    };

    let started_at = match fields.get(KEY_STARTED_AT) {
        Some(Value::String(stamp)) => match DateTime::parse_from_rfc3339(stamp) {
            Ok(parsed) => Some(parsed.with_timezone(&Utc)),
            Err(e) => {
                warn!("Ignoring unparsable {} {:?}: {}", KEY_STARTED_AT, stamp, e);
                None
            }
        },
        Some(other) => {
            warn!("Ignoring non-string {} {:?}", KEY_STARTED_AT, other);
            None
        }
        None => None,
    };

    if task.is_empty() {
        warn!("State record has no task text");
    }

    LoopState {
        iteration,
        max_iterations,
        completion_token,
        task: task.to_string(),
        started_at,
    }
}

/// Split a raw record into its header block and task block.
///
/// Without an opening delimiter there is no usable header and no task. An
/// unterminated header swallows the rest of the record.
fn split_record(raw: &str) -> (&str, &str) {
    let mut lines = raw.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == DELIMITER => {}
        _ => {
            warn!("State record has no front-matter header");
            return ("", "");
        }
    }

    let header_start = raw.find('\n').map(|pos| pos + 1).unwrap_or(raw.len());
    let mut offset = header_start;
    for line in lines {
        if line.trim_end() == DELIMITER {
            return (&raw[header_start..offset], &raw[offset + line.len()..]);
        }
        offset += line.len();
    }

    warn!("State record header is not terminated");
    (&raw[header_start..], "")
}

/// Header as a YAML mapping; anything that is not a mapping counts as empty
fn parse_header(header: &str) -> Mapping {
    if header.trim().is_empty() {
        return Mapping::new();
    }
    match serde_yaml::from_str::<Value>(header) {
        Ok(Value::Mapping(fields)) => fields,
        Ok(other) => {
            warn!("State header is not a mapping ({:?}); using defaults", other);
            Mapping::new()
        }
        Err(e) => {
            warn!("State header is not valid YAML ({}); using defaults", e);
            Mapping::new()
        }
    }
}

fn count_field(fields: &Mapping, key: &str, default: u32) -> u32 {
    let value = fields.get(key);
    let parsed = match value {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        warn!("State field {} is {:?}; using {}", key, value, default);
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LoopState {
        LoopState {
            iteration: 2,
            max_iterations: 10,
            completion_token: "DONE".to_string(),
            task: "fix bug X".to_string(),
            started_at: None,
        }
    }

    #[test]
    fn test_encode_layout() {
        let raw = encode(&sample()).unwrap();
        assert_eq!(
            raw,
            "---\niteration: 2\nmax_iterations: 10\ncompletion_promise: DONE\n---\nfix bug X"
        );
    }

    #[test]
    fn test_round_trip_preserves_multiline_task() {
        let mut state = sample();
        state.task = "line one\n\n---\nline three with: colon\n  indented\n".to_string();
        state.completion_token = "ALL \"tests\" green: yes".to_string();
        state.started_at = Some(Utc::now());
        assert_eq!(decode(&encode(&state).unwrap()), state);
    }

    #[test]
    fn test_round_trip_yaml_keyword_tokens() {
        for token in ["null", "~", "true", "42", "-", "---", "multi\nline", " padded "] {
            let state = LoopState::new("task", 5, token);
            assert_eq!(decode(&encode(&state).unwrap()), state, "token {:?}", token);
        }
    }

    #[test]
    fn test_decode_field_order_is_irrelevant() {
        let raw = "---\ncompletion_promise: \"DONE\"\nmax_iterations: 3\niteration: 1\n---\ntask body";
        let state = decode(raw);
        assert_eq!(state.iteration, 1);
        assert_eq!(state.max_iterations, 3);
        assert_eq!(state.completion_token, "DONE");
        assert_eq!(state.task, "task body");
    }

    #[test]
    fn test_decode_non_numeric_iteration_uses_recovery_default() {
        let raw = "---\niteration: abc\nmax_iterations: 3\ncompletion_promise: \"DONE\"\n---\nfix bug X";
        let state = decode(raw);
        assert_eq!(state.iteration, RECOVERY_ITERATION);
        assert_eq!(state.max_iterations, 3);
    }

    #[test]
    fn test_decode_quoted_count_is_accepted() {
        assert_eq!(decode("---\niteration: \"4\"\n---\nt").iteration, 4);
    }

    #[test]
    fn test_decode_missing_fields_use_defaults() {
        let state = decode("---\n---\nsome task");
        assert_eq!(state.iteration, 1);
        assert_eq!(state.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(state.completion_token, DEFAULT_COMPLETION_TOKEN);
        assert_eq!(state.task, "some task");
    }

    #[test]
    fn test_decode_empty_and_null_token_use_default() {
        let state = decode("---\ncompletion_promise: \"\"\n---\nt");
        assert_eq!(state.completion_token, DEFAULT_COMPLETION_TOKEN);
        let state = decode("---\ncompletion_promise: null\n---\nt");
        assert_eq!(state.completion_token, DEFAULT_COMPLETION_TOKEN);
        let state = decode("---\ncompletion_promise: ~\n---\nt");
        assert_eq!(state.completion_token, DEFAULT_COMPLETION_TOKEN);
    }

    #[test]
    fn test_decode_quoted_null_token_is_a_string() {
        assert_eq!(decode("---\ncompletion_promise: \"null\"\n---\nt").completion_token, "null");
        assert_eq!(decode("---\ncompletion_promise: '~'\n---\nt").completion_token, "~");
    }

    #[test]
    fn test_decode_negative_max_uses_default() {
        let state = decode("---\nmax_iterations: -4\n---\nt");
        assert_eq!(state.max_iterations, DEFAULT_MAX_ITERATIONS);
    }

    #[test]
    fn test_decode_invalid_yaml_uses_defaults() {
        let state = decode("---\niteration: [3\nmax_iterations: 9\n---\nfix bug X");
        assert_eq!(state.iteration, RECOVERY_ITERATION);
        assert_eq!(state.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(state.task, "fix bug X");
    }

    #[test]
    fn test_decode_non_mapping_header_uses_defaults() {
        let state = decode("---\n- 1\n- 2\n---\nt");
        assert_eq!(state.iteration, RECOVERY_ITERATION);
        assert_eq!(state.completion_token, DEFAULT_COMPLETION_TOKEN);
    }

    #[test]
    fn test_decode_garbage_has_no_task() {
        let state = decode("this is not a record at all");
        assert_eq!(state.iteration, 1);
        assert_eq!(state.max_iterations, 50);
        assert!(state.task.is_empty());
    }

    #[test]
    fn test_decode_unterminated_header() {
        let state = decode("---\niteration: 4\nmax_iterations: 9\n");
        assert_eq!(state.iteration, 4);
        assert_eq!(state.max_iterations, 9);
        assert!(state.task.is_empty());
    }

    #[test]
    fn test_decode_crlf_delimiters() {
        let state = decode("---\r\niteration: 3\r\nmax_iterations: 7\r\n---\r\ntask");
        assert_eq!(state.iteration, 3);
        assert_eq!(state.max_iterations, 7);
        assert_eq!(state.task, "task");
    }

    #[test]
    fn test_decode_single_quoted_and_bare_tokens() {
        assert_eq!(decode("---\ncompletion_promise: 'it''s done'\n---\nt").completion_token, "it's done");
        assert_eq!(decode("---\ncompletion_promise: SHIPPED\n---\nt").completion_token, "SHIPPED");
    }

    #[test]
    fn test_decode_bad_timestamp_is_dropped() {
        let state = decode("---\nstarted_at: \"yesterday\"\n---\nt");
        assert!(state.started_at.is_none());
    }

    #[test]
    fn test_decode_ignores_unknown_keys() {
        let state = decode("---\nactive: true\nsession_id: abc\niteration: 0\n---\nt");
        assert_eq!(state.iteration, 0);
    }
}
