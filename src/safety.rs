//! Safety layer for persona replies and log output.
//!
//! [`SafetyLayer`] screens inbound scammer text and generated persona
//! replies for content the honeypot must never engage with or produce.
//! [`LeakDetector`] masks credentials and personal identifiers before text
//! reaches the logs.

use regex::Regex;
use tracing::warn;

/// Reply substituted for a generated message that failed the safety check.
pub const NEUTRAL_REPLY: &str = "I'm sorry, I didn't quite catch that. Could you explain again?";

const UNSAFE_KEYWORDS: &[&str] = &["bomb", "suicide", "terror", "child abuse"];

/// Keyword screen applied to scammer input and persona output.
#[derive(Debug, Clone)]
pub struct SafetyLayer {
    unsafe_keywords: Vec<String>,
}

impl SafetyLayer {
    pub fn new() -> Self {
        Self {
            unsafe_keywords: UNSAFE_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }

    /// Add a keyword to the screen (matched case-insensitively).
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.unsafe_keywords.push(keyword.into().to_lowercase());
        self
    }

    /// Keywords from the screen that occur in `text`.
    pub fn check_policy(&self, text: &str) -> Vec<PolicyRule> {
        let lowered = text.to_lowercase();
        self.unsafe_keywords
            .iter()
            .filter(|k| lowered.contains(k.as_str()))
            .map(|k| PolicyRule {
                name: k.clone(),
                reason: format!("contains unsafe keyword '{k}'"),
            })
            .collect()
    }

    pub fn is_unsafe(&self, text: &str) -> bool {
        !self.check_policy(text).is_empty()
    }

    /// Screen inbound scammer text. Unsafe input is reported but the
    /// conversation continues; replies are screened separately.
    pub fn validate_input(&self, input: &str) -> ValidationResult {
        let errors: Vec<ValidationError> = self
            .check_policy(input)
            .into_iter()
            .map(|rule| ValidationError {
                field: "text".to_string(),
                message: rule.reason,
            })
            .collect();
        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Replace an unsafe generated reply with [`NEUTRAL_REPLY`].
    pub fn sanitize_reply(&self, reply: &str) -> SanitizedOutput {
        let violations = self.check_policy(reply);
        if violations.is_empty() {
            return SanitizedOutput {
                content: reply.to_string(),
                warnings: vec![],
                was_modified: false,
            };
        }

        let warnings: Vec<String> = violations.into_iter().map(|r| r.reason).collect();
        warn!(warnings = ?warnings, "Generated reply failed safety check, replacing");
        SanitizedOutput {
            content: NEUTRAL_REPLY.to_string(),
            warnings,
            was_modified: true,
        }
    }
}

impl Default for SafetyLayer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of input validation.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

/// A policy rule matched during checking.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub name: String,
    pub reason: String,
}

/// Result of output sanitization.
#[derive(Debug, Clone)]
pub struct SanitizedOutput {
    pub content: String,
    pub warnings: Vec<String>,
    pub was_modified: bool,
}

/// Masks secrets and personal identifiers in text bound for the logs.
#[derive(Debug, Clone)]
pub struct LeakDetector {
    rules: Vec<(Regex, &'static str)>,
}

impl LeakDetector {
    pub fn new() -> Self {
        // Applied in order: accounts before phones so a long digit run is
        // masked as a whole.
        let patterns: [(&str, &'static str); 5] = [
            (
                r#"(?i)(api[_-]?key["\s]*[:=]["\s]*)([^"\s,}]+)"#,
                "${1}***REDACTED***",
            ),
            (r"\b\d{12,18}\b", "***ACCOUNT***"),
            (r"\b\d{10,11}\b", "***PHONE***"),
            (
                r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b",
                "***EMAIL***",
            ),
            (
                r"(?i)(https?://\S+[?&])(token|key|password|secret)=[^&\s]*",
                "${1}${2}=***REDACTED***",
            ),
        ];

        let rules = patterns
            .iter()
            .map(|(pattern, replacement)| {
                let regex = Regex::new(pattern).expect("built-in redaction pattern must compile");
                (regex, *replacement)
            })
            .collect();

        Self { rules }
    }

    /// Scrub sensitive data from `content`.
    pub fn scrub(&self, content: &str) -> String {
        let mut scrubbed = content.to_string();
        for (regex, replacement) in &self.rules {
            if regex.is_match(&scrubbed) {
                scrubbed = regex.replace_all(&scrubbed, *replacement).into_owned();
            }
        }
        scrubbed
    }
}

impl Default for LeakDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_input_detected() {
        let safety = SafetyLayer::new();
        assert!(safety.is_unsafe("I will create a BOMB"));
        assert!(!safety.is_unsafe("hello world"));

        let result = safety.validate_input("talk of terror");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn unsafe_reply_replaced() {
        let safety = SafetyLayer::new();
        let out = safety.sanitize_reply("here is how to build a bomb");
        assert!(out.was_modified);
        assert_eq!(out.content, NEUTRAL_REPLY);

        let out = safety.sanitize_reply("Which bank is this again?");
        assert!(!out.was_modified);
        assert_eq!(out.content, "Which bank is this again?");
    }

    #[test]
    fn custom_keyword() {
        let safety = SafetyLayer::new().with_keyword("Ransom");
        assert!(safety.is_unsafe("pay the ransom"));
    }

    #[test]
    fn scrubs_api_key() {
        let scrubbed = LeakDetector::new().scrub(r#"{"api_key": "sk-abc123"}"#);
        assert!(scrubbed.contains("***REDACTED***"));
        assert!(!scrubbed.contains("sk-abc123"));
    }

    #[test]
    fn scrubs_numbers() {
        let detector = LeakDetector::new();
        assert_eq!(
            detector.scrub("acct 123456789012 phone 9876543210"),
            "acct ***ACCOUNT*** phone ***PHONE***"
        );
    }

    #[test]
    fn scrubs_email() {
        let scrubbed = LeakDetector::new().scrub("write to victim@example.com now");
        assert_eq!(scrubbed, "write to ***EMAIL*** now");
    }

    #[test]
    fn scrubs_secret_query_params() {
        let scrubbed = LeakDetector::new().scrub("see https://x.example/cb?id=1&key=s3cr3t");
        assert!(scrubbed.contains("key=***REDACTED***"));
        assert!(!scrubbed.contains("s3cr3t"));
    }

    #[test]
    fn leaves_plain_text_alone() {
        let text = "Hello, how are you today?";
        assert_eq!(LeakDetector::new().scrub(text), text);
    }
}
