// SPDX-FileCopyrightText: 2026 Braid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tolerant extraction of structured payloads from free-form model output.
//!
//! Models asked to emit a JSON object frequently wrap it in prose or a
//! markdown fence. [`extract_first_balanced_object`] locates the first `{`,
//! scans for its balanced closing `}` (string- and escape-aware), and parses
//! only that substring. Failure means "no structured payload found", never
//! an error.

use serde_json::Value;

/// Extracts and parses the first balanced JSON object embedded in `text`.
///
/// Returns `None` when no `{` is present, the braces never balance, or the
/// balanced substring is not valid JSON.
pub fn extract_first_balanced_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let candidate = balanced_object_slice(&text[start..])?;
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(Value::is_object)
}

/// Returns the prefix of `text` spanning one balanced `{...}` object.
///
/// `text` must start with `{`. Braces inside JSON strings are ignored, as
/// are escaped quotes.
fn balanced_object_slice(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
