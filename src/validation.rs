//! Content validation for the two points where free text enters the system
//! from outside the coordination core: plan text handed to `registerTasks`,
//! and the `content` field of `send_message_to_agent`. This never touches
//! the text the `@@@task` parser consumes — the parser must never fail, so
//! sanitization here only ever runs on a copy used for storage/logging.
use crate::error::CoreError;
use html_escape::encode_text;
use regex::Regex;
use std::collections::HashSet;

pub const MAX_PLAN_TEXT_LENGTH: usize = 50_000;
pub const MAX_MESSAGE_CONTENT_LENGTH: usize = 10_000;

static DANGEROUS_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "data:text/html",
    "vbscript:",
    "$(rm",
    "`rm",
    "../../",
    "/etc/passwd",
    "/etc/shadow",
];

#[derive(Debug, Clone)]
pub struct ContentValidator {
    control_char_regex: Regex,
    dangerous_patterns: HashSet<String>,
}

impl ContentValidator {
    pub fn new() -> Result<Self, CoreError> {
        // Reject raw control characters other than newline/tab/carriage return.
        let control_char_regex = Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F]")
            .map_err(|e| CoreError::ConfigError(format!("invalid regex pattern: {e}")))?;

        Ok(Self {
            control_char_regex,
            dangerous_patterns: DANGEROUS_PATTERNS.iter().map(|s| s.to_lowercase()).collect(),
        })
    }

    fn check_dangerous(&self, text: &str) -> Result<(), CoreError> {
        let lower = text.to_lowercase();
        for pattern in &self.dangerous_patterns {
            if lower.contains(pattern.as_str()) {
                return Err(CoreError::Validation(
                    "content contains a disallowed pattern".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Validates and returns a sanitized copy of coordinator plan text.
    /// The original text, unsanitized, is still what the `@@@task` parser
    /// reads — this output is for storage/logging only.
    pub fn validate_plan_text(&self, text: &str) -> Result<String, CoreError> {
        if text.trim().is_empty() {
            return Err(CoreError::Validation("plan text cannot be empty".to_string()));
        }
        if text.len() > MAX_PLAN_TEXT_LENGTH {
            return Err(CoreError::Validation(format!(
                "plan text exceeds maximum length of {MAX_PLAN_TEXT_LENGTH} characters"
            )));
        }
        if self.control_char_regex.is_match(text) {
            return Err(CoreError::Validation(
                "plan text contains control characters".to_string(),
            ));
        }
        self.check_dangerous(text)?;
        Ok(encode_text(text).to_string())
    }

    /// Validates and returns a sanitized copy of an inter-agent message.
    pub fn validate_message_content(&self, content: &str) -> Result<String, CoreError> {
        if content.trim().is_empty() {
            return Err(CoreError::Validation("message content cannot be empty".to_string()));
        }
        if content.len() > MAX_MESSAGE_CONTENT_LENGTH {
            return Err(CoreError::Validation(format!(
                "message content exceeds maximum length of {MAX_MESSAGE_CONTENT_LENGTH} characters"
            )));
        }
        if self.control_char_regex.is_match(content) {
            return Err(CoreError::Validation(
                "message content contains control characters".to_string(),
            ));
        }
        self.check_dangerous(content)?;
        Ok(encode_text(content).to_string())
    }
}

impl Default for ContentValidator {
    fn default() -> Self {
        Self::new().expect("ContentValidator regex patterns are static and always valid")
    }
}
