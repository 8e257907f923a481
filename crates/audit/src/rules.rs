//! Value classifiers.
//!
//! Every check is a pure predicate over a single string so it can be tested
//! without a document. [`RuleSet`] owns the compiled patterns for one run.

use regex::Regex;

use crate::config::RuleConfig;
use crate::error::AuditError;

const EMAIL_FORMAT: &str = r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$";
const SUSPICIOUS_EMAIL_CHARS: &str = r"[_%$&*]";
const UNEXPECTED_CHARS: &str = r"[^a-zA-Z0-9@.\- ]";
const PLACEHOLDER_TOKENS: &str = r"\b(?:000|123|999)\b";

/// Compiled classifiers for one run.
#[derive(Debug, Clone)]
pub struct RuleSet {
    email_format: Regex,
    digit_run: Regex,
    suspicious_email_chars: Regex,
    unexpected_chars: Regex,
    placeholder_tokens: Regex,
    max_value_len: usize,
}

impl RuleSet {
    pub fn new(config: &RuleConfig) -> Result<Self, AuditError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AuditError::Config(format!("bad pattern {pattern}: {e}")))
        };
        Ok(Self {
            email_format: compile(EMAIL_FORMAT)?,
            digit_run: compile(&format!(r"\d{{{},}}", config.min_digit_run))?,
            suspicious_email_chars: compile(SUSPICIOUS_EMAIL_CHARS)?,
            unexpected_chars: compile(UNEXPECTED_CHARS)?,
            placeholder_tokens: compile(PLACEHOLDER_TOKENS)?,
            max_value_len: config.max_value_len,
        })
    }

    /// `local@domain.tld` with an ASCII local part and a 2+ letter TLD.
    pub fn is_valid_email(&self, value: &str) -> bool {
        self.email_format.is_match(value)
    }

    /// A long digit run, or any of `_ % $ & *`.
    pub fn has_suspicious_characters(&self, value: &str) -> bool {
        self.digit_run.is_match(value) || self.suspicious_email_chars.is_match(value)
    }

    /// Any-field heuristic: unexpected symbols, excessive length, or an
    /// obvious placeholder token (`000`, `123`, `999`) as a whole word.
    pub fn is_suspicious_value(&self, value: &str) -> bool {
        self.unexpected_chars.is_match(value)
            || value.chars().count() > self.max_value_len
            || self.placeholder_tokens.is_match(value)
    }
}

/// The part after the first `@`, if there is a non-empty one.
pub fn email_domain(value: &str) -> Option<&str> {
    value
        .split_once('@')
        .map(|(_, rest)| rest.split('@').next().unwrap_or(rest))
        .filter(|domain| !domain.is_empty())
}
