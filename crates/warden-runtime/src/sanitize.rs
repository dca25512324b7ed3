//! Default parameter sanitizer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use warden_kernel::gateway::{ParamSanitizer, Sanitized};

struct Pattern {
    name: &'static str,
    regex: Regex,
    replacement: &'static str,
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    [
        ("script_tag", r"(?i)<\s*/?\s*script\b[^>]*>", ""),
        ("javascript_uri", r"(?i)javascript\s*:", ""),
        ("vbscript_uri", r"(?i)vbscript\s*:", ""),
        ("html_data_uri", r"(?i)data\s*:\s*text/html", ""),
        // Only inside a tag, so `one=1` or `online = true` stay untouched.
        ("inline_handler", r"(?i)(<[^>]*\s)on[a-z]+\s*=", "${1}"),
    ]
    .into_iter()
    .map(|(name, pattern, replacement)| Pattern {
        name,
        regex: Regex::new(pattern).expect("static pattern"),
        replacement,
    })
    .collect()
});

/// Rounds of removal per string. Handles fragments that reassemble once an
/// inner match is removed (`<scr<script>ipt>`).
const MAX_PASSES: usize = 4;

/// Recursive string cleaner for call parameters.
///
/// For every string in the value (object keys untouched):
/// - control characters other than `\n`, `\r` and `\t` are removed;
/// - leading and trailing whitespace is trimmed;
/// - script-looking fragments (`<script>` tags, `javascript:` / `vbscript:`
///   URIs, `data:text/html`, `on*=` handlers inside a tag) are removed, and any
///   remaining `<` / `>` in such a string are HTML-escaped.
///
/// Each pattern found is reported once in [`Sanitized::suspicious`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

impl DefaultSanitizer {
    pub fn new() -> Self {
        Self
    }

    fn clean_value(&self, value: Value, found: &mut Vec<String>) -> Value {
        match value {
            Value::String(s) => Value::String(self.clean_string(&s, found)),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| self.clean_value(item, found))
                    .collect(),
            ),
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, self.clean_value(v, found)))
                    .collect::<Map<_, _>>(),
            ),
            other => other,
        }
    }

    fn clean_string(&self, input: &str, found: &mut Vec<String>) -> String {
        let mut out: String = input
            .chars()
            .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
            .collect();
        if out.len() != input.len() {
            note(found, "control_characters");
        }

        let mut markup = false;
        for _ in 0..MAX_PASSES {
            let mut changed = false;
            for pattern in PATTERNS.iter() {
                if pattern.regex.is_match(&out) {
                    note(found, pattern.name);
                    out = pattern.regex.replace_all(&out, pattern.replacement).into_owned();
                    changed = true;
                    markup = true;
                }
            }
            if !changed {
                break;
            }
        }
        if markup {
            out = out.replace('<', "&lt;").replace('>', "&gt;");
        }

        out.trim().to_string()
    }
}

fn note(found: &mut Vec<String>, name: &str) {
    if !found.iter().any(|f| f == name) {
        found.push(name.to_string());
    }
}

impl ParamSanitizer for DefaultSanitizer {
    fn sanitize(&self, value: Value) -> Sanitized {
        let mut suspicious = Vec::new();
        let value = self.clean_value(value, &mut suspicious);
        Sanitized { value, suspicious }
    }
}
