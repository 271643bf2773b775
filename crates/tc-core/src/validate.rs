//! Parameter input types: inference from parameter names and validation.
//!
//! Inference walks `INPUT_TYPE_RULES` top to bottom and returns the first
//! type with a matching pattern; `InputType::Alphanumeric` is the
//! fallback. Patterns match whole words of the parameter name (split on
//! `_`, `-`, spaces and camelCase humps), so `hotel` is not a phone field
//! and `token` is not a recipient.

use crate::expr::parse_expression;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Validation profile for a parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Text,
    Email,
    Url,
    Phone,
    Numeric,
    Integer,
    Alphanumeric,
    Json,
    Math,
}

impl InputType {
    /// Maximum accepted length, in characters.
    pub fn max_length(self) -> usize {
        match self {
            InputType::Email => 254,
            InputType::Url => 2048,
            InputType::Phone => 20,
            InputType::Json => 10_000,
            _ => 1000,
        }
    }

    /// The HTML input element type a host should render.
    pub fn html_input_type(self) -> &'static str {
        match self {
            InputType::Email => "email",
            InputType::Url => "url",
            InputType::Phone => "tel",
            InputType::Numeric | InputType::Integer => "number",
            _ => "text",
        }
    }
}

/// One matcher in the inference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// A word equal to this string.
    Word(&'static str),
    /// A word starting with this string (`calculat` ⇒ calculate, calculator).
    Stem(&'static str),
}

impl Pattern {
    fn matches(self, word: &str) -> bool {
        match self {
            Pattern::Word(w) => word == w,
            Pattern::Stem(s) => word.starts_with(s),
        }
    }
}

/// Ordered inference rules. Earlier rows win: `phone_number` is a phone
/// field, not an integer.
pub const INPUT_TYPE_RULES: &[(InputType, &[Pattern])] = &[
    (
        InputType::Email,
        &[
            Pattern::Stem("email"),
            Pattern::Word("to"),
            Pattern::Word("cc"),
            Pattern::Word("bcc"),
            Pattern::Stem("recipient"),
        ],
    ),
    (
        InputType::Url,
        &[
            Pattern::Stem("url"),
            Pattern::Stem("link"),
            Pattern::Word("href"),
            Pattern::Word("website"),
        ],
    ),
    (
        InputType::Phone,
        &[
            Pattern::Stem("phone"),
            Pattern::Word("mobile"),
            Pattern::Word("tel"),
        ],
    ),
    (
        InputType::Math,
        &[
            Pattern::Stem("expression"),
            Pattern::Stem("formula"),
            Pattern::Stem("equation"),
            Pattern::Stem("calculat"),
            Pattern::Word("math"),
            Pattern::Stem("comput"),
        ],
    ),
    (
        InputType::Integer,
        &[
            Pattern::Word("count"),
            Pattern::Word("number"),
            Pattern::Word("num"),
            Pattern::Word("days"),
            Pattern::Word("results"),
            Pattern::Word("limit"),
            Pattern::Stem("delay"),
            Pattern::Stem("timeout"),
        ],
    ),
    (
        InputType::Json,
        &[
            Pattern::Word("data"),
            Pattern::Word("json"),
            Pattern::Stem("config"),
        ],
    ),
    (
        InputType::Text,
        &[
            Pattern::Stem("message"),
            Pattern::Word("description"),
            Pattern::Word("text"),
            Pattern::Word("body"),
            Pattern::Word("query"),
            Pattern::Word("subject"),
            Pattern::Word("title"),
        ],
    ),
];

/// Fallback when no rule matches.
pub const DEFAULT_INPUT_TYPE: InputType = InputType::Alphanumeric;

/// Split a parameter name into lowercase words.
fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Infer the validation profile for a parameter name.
pub fn infer_input_type(param_name: &str) -> InputType {
    let words = words(param_name);
    INPUT_TYPE_RULES
        .iter()
        .find(|(_, patterns)| {
            patterns
                .iter()
                .any(|p| words.iter().any(|w| p.matches(w)))
        })
        .map(|(ty, _)| *ty)
        .unwrap_or(DEFAULT_INPUT_TYPE)
}

// ─── Validation ──────────────────────────────────────────────────────────

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));
static URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://[^\s/$.?#].[^\s]*$").expect("url pattern"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern"));
static NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric pattern"));
static INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("integer pattern"));
static ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[a-zA-Z0-9\s\-_.,!?@#$%^&*()+={}\[\]|\\:";'/~`<>]*$"#)
        .expect("alphanumeric pattern")
});
static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z][^>]*>").expect("html tag pattern"));

/// Outcome of validating one value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub errors: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}

/// Validate a raw value against a profile.
///
/// Leading and trailing whitespace is ignored. Empty values are accepted
/// for every type except `Math`, where there is nothing to compute.
pub fn validate_input(value: &str, ty: InputType) -> ValidationResult {
    let mut result = ValidationResult::default();

    let max = ty.max_length();
    if value.chars().count() > max {
        result.fail(format!("Input too long (max {max} characters)"));
        return result;
    }

    if ty == InputType::Alphanumeric && HTML_TAG.is_match(value) {
        result.fail("HTML tags are not allowed in alphanumeric input");
    }

    let v = value.trim();
    if v.is_empty() {
        if ty == InputType::Math {
            result.fail("Expression is empty");
        }
        return result;
    }

    match ty {
        InputType::Email if !EMAIL.is_match(v) => result.fail("Invalid email format"),
        InputType::Url if !URL.is_match(v) => result.fail("Invalid URL format"),
        InputType::Phone if !PHONE.is_match(v) => result.fail("Invalid phone number format"),
        InputType::Numeric if !NUMERIC.is_match(v) => result.fail("Invalid numeric format"),
        InputType::Integer if !INTEGER.is_match(v) => result.fail("Invalid integer format"),
        InputType::Alphanumeric if !ALPHANUMERIC.is_match(v) => result
            .fail("Only alphanumeric characters, spaces, and basic punctuation allowed"),
        InputType::Json => {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(v) {
                result.fail(format!("Invalid JSON format: {e}"));
            }
        }
        InputType::Math => match parse_expression(v) {
            Ok(expr) if !expr.eval().is_finite() => {
                result.fail("Expression does not evaluate to a finite number")
            }
            Ok(_) => {}
            Err(e) => result.fail(format!("Invalid expression: {e}")),
        },
        _ => {}
    }
    result
}

/// Infer the type from `param_name` and validate `value` against it.
pub fn validate_param(param_name: &str, value: &str) -> ValidationResult {
    validate_input(value, infer_input_type(param_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn splits_words() {
        assert_eq!(words("maxResults"), vec!["max", "results"]);
        assert_eq!(words("reply_to-Address"), vec!["reply", "to", "address"]);
        assert_eq!(words("URL"), vec!["url"]);
    }

    #[test]
    fn inference_table() {
        let cases = [
            ("to", InputType::Email),
            ("recipientEmail", InputType::Email),
            ("imageUrl", InputType::Url),
            ("phone_number", InputType::Phone),
            ("expression", InputType::Math),
            ("calculation", InputType::Math),
            ("maxResults", InputType::Integer),
            ("timeoutMs", InputType::Integer),
            ("config", InputType::Json),
            ("subject", InputType::Text),
            ("location", InputType::Alphanumeric),
        ];
        for (name, expected) in cases {
            assert_eq!(infer_input_type(name), expected, "param `{name}`");
        }
    }

    #[test]
    fn no_incidental_substring_matches() {
        assert_eq!(infer_input_type("token"), InputType::Alphanumeric);
        assert_eq!(infer_input_type("hotel"), InputType::Alphanumeric);
        assert_eq!(infer_input_type("metadata"), InputType::Alphanumeric);
    }

    #[test]
    fn validates_by_type() {
        assert!(validate_input("a@b.co", InputType::Email).is_valid());
        assert!(!validate_input("not-an-email", InputType::Email).is_valid());
        assert!(validate_input("https://example.com/x", InputType::Url).is_valid());
        assert!(!validate_input("ftp://example.com", InputType::Url).is_valid());
        assert!(validate_input("+15551234567", InputType::Phone).is_valid());
        assert!(validate_input("-42", InputType::Integer).is_valid());
        assert!(!validate_input("4.2", InputType::Integer).is_valid());
        assert!(validate_input("4.2", InputType::Numeric).is_valid());
        assert!(validate_input(r#"{"a":1}"#, InputType::Json).is_valid());
        assert!(!validate_input("{a:1}", InputType::Json).is_valid());
        assert!(validate_input("(1 + 2) * 3", InputType::Math).is_valid());
        assert!(!validate_input("1 +", InputType::Math).is_valid());
        assert!(validate_input("anything <at> all", InputType::Text).is_valid());
    }

    #[test]
    fn empty_values() {
        assert!(validate_input("", InputType::Email).is_valid());
        assert!(validate_input("   ", InputType::Integer).is_valid());
        assert!(!validate_input("", InputType::Math).is_valid());
    }

    #[test]
    fn alphanumeric_rejects_tags_and_overlong() {
        let r = validate_input("<b>hi</b>", InputType::Alphanumeric);
        assert_eq!(
            r.errors,
            vec!["HTML tags are not allowed in alphanumeric input".to_string()]
        );
        let long = "x".repeat(1001);
        assert!(!validate_input(&long, InputType::Alphanumeric).is_valid());
        assert!(validate_input("Durham, NC", InputType::Alphanumeric).is_valid());
    }

    #[test]
    fn overlong_math_reports_only_length() {
        let r = validate_input(&"(".repeat(200_000), InputType::Math);
        assert_eq!(r.errors, vec!["Input too long (max 1000 characters)".to_string()]);
    }

    #[test]
    fn deeply_nested_math_is_rejected() {
        let r = validate_input(&"(".repeat(1000), InputType::Math);
        assert!(!r.is_valid());
        assert!(r.errors[0].starts_with("Invalid expression"), "{:?}", r.errors);
    }

    #[test]
    fn math_must_be_finite() {
        assert!(!validate_input("1 / 0", InputType::Math).is_valid());
        assert!(!validate_input("sqrt(-1)", InputType::Math).is_valid());
        assert!(validate_input("sqrt(2) / 2", InputType::Math).is_valid());
    }
}
