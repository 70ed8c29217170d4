//! Turning raw model text into typed worker results.
//!
//! Models asked for JSON still wrap it in markdown fences, prefix it with
//! prose, or get cut off at the token limit. [`extract_json`] repairs the
//! common cases before the text reaches `serde_json`.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Clean model output into something `serde_json` can parse.
///
/// Strips markdown fences, drops any prose before the first `{`/`[` and
/// after the matching closer, and closes brackets left open by a
/// truncated answer.
pub fn extract_json(raw: &str) -> String {
    let text = strip_code_fences(raw);
    let Some(start) = text.find(['{', '[']) else {
        return text.trim().to_string();
    };
    let body = &text[start..];
    match scan(body) {
        Scan::Complete(end) => body[..end].to_string(),
        Scan::Open(closers) => {
            let mut repaired = body.trim_end().to_string();
            repaired.extend(closers.iter().rev());
            repaired
        }
    }
}

/// Parse model output into `T`.
///
/// When `envelope` is set and the answer is an object carrying that key,
/// the value under the key is used. JSON-object response modes force the
/// model to wrap arrays this way.
pub fn parse_output<T: DeserializeOwned>(
    raw: &str,
    envelope: Option<&str>,
) -> std::result::Result<T, String> {
    let cleaned = extract_json(raw);
    if cleaned.is_empty() {
        return Err("empty response".to_string());
    }
    let mut value: Value =
        serde_json::from_str(&cleaned).map_err(|e| format!("not valid JSON: {}", e))?;

    if let Some(key) = envelope {
        if let Some(inner) = value.as_object_mut().and_then(|obj| obj.remove(key)) {
            value = inner;
        }
    }

    serde_json::from_value(value).map_err(|e| format!("unexpected shape: {}", e))
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(open) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[open + 3..];
    // Language tag runs to the end of the fence line.
    let content = match after.find('\n') {
        Some(nl) => &after[nl + 1..],
        None => after,
    };
    match content.find("```") {
        Some(close) => content[..close].trim(),
        None => content.trim(),
    }
}

enum Scan {
    /// Byte offset just past the closer of the outermost value.
    Complete(usize),
    /// Closers still owed, innermost last.
    Open(Vec<char>),
}

fn scan(body: &str) -> Scan {
    let mut expected: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in body.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => expected.push('}'),
            '[' => expected.push(']'),
            '}' | ']' => {
                if expected.last() == Some(&ch) {
                    expected.pop();
                }
                if expected.is_empty() {
                    return Scan::Complete(i + ch.len_utf8());
                }
            }
            _ => {}
        }
    }

    if in_string {
        expected.push('"');
    }
    Scan::Open(expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::booking::SeatPreference;

    #[test]
    fn test_fenced_json() {
        let raw = "```json\n{\"row\": 5, \"seat\": \"A\"}\n```";
        assert_eq!(extract_json(raw), r#"{"row": 5, "seat": "A"}"#);
    }

    #[test]
    fn test_prose_around_json() {
        let raw = "Sure! Here is your seat: {\"row\": 5} Enjoy the flight.";
        assert_eq!(extract_json(raw), r#"{"row": 5}"#);
    }

    #[test]
    fn test_truncated_nested_output_closed_in_order() {
        let raw = r#"{"flights": [{"flight_number": "AA123""#;
        let fixed = extract_json(raw);
        assert!(fixed.ends_with("}]}"));
        assert!(serde_json::from_str::<Value>(&fixed).is_ok());
    }

    #[test]
    fn test_braces_inside_strings_ignored() {
        let raw = r#"{"reason": "card {declined}", "status": "failed"}"#;
        assert_eq!(extract_json(raw), raw);
    }

    #[test]
    fn test_unterminated_string_closed() {
        let raw = r#"{"reason": "timeout"#;
        let fixed = extract_json(raw);
        assert!(serde_json::from_str::<Value>(&fixed).is_ok());
    }

    #[test]
    fn test_parse_output_typed() {
        let seat: SeatPreference = parse_output(
            r#"{"row": 14, "seat": "F", "is_window": true, "is_extra_legroom": true}"#,
            None,
        )
        .unwrap();
        assert_eq!(seat.label(), "14F");
    }

    #[test]
    fn test_parse_output_envelope() {
        let flights: Vec<u32> = parse_output(r#"{"flights": [1, 2]}"#, Some("flights")).unwrap();
        assert_eq!(flights, vec![1, 2]);
        let bare: Vec<u32> = parse_output("[3]", Some("flights")).unwrap();
        assert_eq!(bare, vec![3]);
    }

    #[test]
    fn test_parse_output_errors() {
        assert!(parse_output::<Value>("   ", None)
            .unwrap_err()
            .contains("empty"));
        assert!(parse_output::<SeatPreference>("no json here", None)
            .unwrap_err()
            .contains("not valid JSON"));
        assert!(parse_output::<SeatPreference>(r#"{"row": "five"}"#, None)
            .unwrap_err()
            .contains("unexpected shape"));
    }
}
