//! PII and secret detection and redaction

use crate::config::PiiConfig;
use crate::types::{Redaction, RedactionType};

use regex::Regex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// PII detector for identifying and redacting sensitive information
pub struct PiiDetector {
    config: PiiConfig,
    patterns: PiiPatterns,
}

struct PiiPatterns {
    ssn: Regex,
    credit_card: Regex,
    email: Regex,
    phone: Regex,
    ip_v4: Regex,
    ip_v6: Regex,
    api_key: Regex,
    aws_key: Regex,
    password: Regex,
}

impl PiiPatterns {
    fn new() -> Self {
        Self {
            // 123-45-6789 or 123456789
            ssn: compile(r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b"),
            credit_card: compile(r"\b(?:\d{4}[-\s]?){3}\d{4}\b|\b\d{15,16}\b"),
            email: compile(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
            phone: compile(
                r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
            ),
            ip_v4: compile(
                r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
            ),
            ip_v6: compile(r"\b(?:[0-9a-fA-F]{1,4}:){7}[0-9a-fA-F]{1,4}\b"),
            api_key: compile(
                r#"\b(?:sk-[a-zA-Z0-9_-]{20,}|(?i:api[_-]?key)[=:\s]+['"]?[a-zA-Z0-9_-]{20,}['"]?)"#,
            ),
            aws_key: compile(r"\bAKIA[0-9A-Z]{16}\b"),
            password: compile(r#"(?i)\b(?:password|passwd|pwd)\s*[=:]\s*['"]?[^\s'"]+['"]?"#),
        }
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in PII pattern must compile")
}

impl PiiDetector {
    /// Create a new PII detector with the given configuration
    pub fn new(config: PiiConfig) -> Self {
        Self {
            config,
            patterns: PiiPatterns::new(),
        }
    }

    /// Whether detected PII should block instead of being redacted
    pub fn blocks(&self) -> bool {
        self.config.block_on_detection
    }

    /// Detect all PII in the given text
    pub fn detect(&self, text: &str) -> Vec<Redaction> {
        if !self.config.enabled {
            return vec![];
        }

        let mut redactions = vec![];

        if self.config.detect_api_keys {
            self.collect(&self.patterns.api_key, RedactionType::ApiKey, text, &mut redactions);
            self.collect(&self.patterns.aws_key, RedactionType::ApiKey, text, &mut redactions);
            self.collect(&self.patterns.password, RedactionType::Password, text, &mut redactions);
        }

        if self.config.detect_ssn {
            self.collect(&self.patterns.ssn, RedactionType::Ssn, text, &mut redactions);
        }

        if self.config.detect_credit_card {
            for m in self.patterns.credit_card.find_iter(text) {
                if luhn_check(m.as_str()) {
                    redactions.push(self.redaction(RedactionType::CreditCard, m));
                }
            }
        }

        if self.config.detect_email {
            self.collect(&self.patterns.email, RedactionType::Email, text, &mut redactions);
        }

        if self.config.detect_phone {
            self.collect(&self.patterns.phone, RedactionType::Phone, text, &mut redactions);
        }

        if self.config.detect_ip {
            self.collect(&self.patterns.ip_v4, RedactionType::IpAddress, text, &mut redactions);
            self.collect(&self.patterns.ip_v6, RedactionType::IpAddress, text, &mut redactions);
        }

        // Stable sort keeps detector priority for equal starts
        redactions.sort_by_key(|r| r.start);
        remove_overlaps(&mut redactions);

        redactions
    }

    /// Detect and redact in one step
    pub fn sanitize(&self, text: &str) -> (String, Vec<Redaction>) {
        let redactions = self.detect(text);
        let redacted = self.redact(text, &redactions);
        (redacted, redactions)
    }

    /// Redact PII from text
    pub fn redact(&self, text: &str, redactions: &[Redaction]) -> String {
        if redactions.is_empty() {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut last_end = 0;

        for redaction in redactions {
            if redaction.start > last_end {
                result.push_str(&text[last_end..redaction.start]);
            }
            result.push_str(&redaction.replacement);
            last_end = redaction.end;
        }

        if last_end < text.len() {
            result.push_str(&text[last_end..]);
        }

        result
    }

    fn collect(
        &self,
        pattern: &Regex,
        redaction_type: RedactionType,
        text: &str,
        out: &mut Vec<Redaction>,
    ) {
        out.extend(
            pattern
                .find_iter(text)
                .map(|m| self.redaction(redaction_type, m)),
        );
    }

    fn redaction(&self, redaction_type: RedactionType, m: regex::Match<'_>) -> Redaction {
        Redaction {
            redaction_type,
            original_hash: hash_value(m.as_str()),
            replacement: self.format_redaction(redaction_type),
            start: m.start(),
            end: m.end(),
        }
    }

    fn format_redaction(&self, redaction_type: RedactionType) -> String {
        self.config
            .redaction_format
            .replace("{TYPE}", &redaction_type.to_string())
    }
}

/// Hash a value for audit logging (without storing the original)
fn hash_value(value: &str) -> String {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Luhn algorithm for credit card validation
fn luhn_check(number: &str) -> bool {
    let digits: Vec<u32> = number.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 13 {
        return false;
    }

    let mut sum = 0;
    let mut double = false;

    for &digit in digits.iter().rev() {
        let mut d = digit;
        if double {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        double = !double;
    }

    sum % 10 == 0
}

/// Remove overlapping redactions (keep the first one)
fn remove_overlaps(redactions: &mut Vec<Redaction>) {
    let mut kept: Vec<Redaction> = Vec::with_capacity(redactions.len());
    for redaction in redactions.drain(..) {
        match kept.last() {
            Some(prev) if prev.end > redaction.start => {}
            _ => kept.push(redaction),
        }
    }
    *redactions = kept;
}
