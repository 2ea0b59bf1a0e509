//! Core types for the security agent

use crate::error::SafetyCategory;
use crate::injection::InjectionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of content flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Input to LLM
    Input,
    /// Output from LLM
    Output,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Input => write!(f, "input"),
            Direction::Output => write!(f, "output"),
        }
    }
}

/// Verdict returned by `guard_input` and `guard_output`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardResult {
    /// Request this verdict belongs to
    pub request_id: Uuid,
    /// Which side of the model the text was on
    pub direction: Direction,
    /// Whether the text may be used
    pub is_safe: bool,
    /// Cleaned-up text, present only when it differs from the submitted text
    pub sanitized_content: Option<String>,
    /// Human readable reason when the text was blocked
    pub reason: Option<String>,
    /// Category that triggered the block
    pub category: Option<SafetyCategory>,
    /// Everything the backend noticed, blocking or not
    pub findings: Vec<Finding>,
}

impl GuardResult {
    /// A passing verdict with no findings
    pub fn safe(direction: Direction) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            direction,
            is_safe: true,
            sanitized_content: None,
            reason: None,
            category: None,
            findings: vec![],
        }
    }

    /// A blocking verdict
    pub fn blocked(
        direction: Direction,
        reason: impl Into<String>,
        category: SafetyCategory,
    ) -> Self {
        Self {
            is_safe: false,
            reason: Some(reason.into()),
            category: Some(category),
            ..Self::safe(direction)
        }
    }

    /// Attach a sanitized version of the text
    pub fn with_sanitized_content(mut self, text: impl Into<String>) -> Self {
        self.sanitized_content = Some(text.into());
        self
    }

    /// Tie the result to the request in `context`
    pub fn with_request_id(mut self, context: &GuardContext) -> Self {
        self.request_id = context.request_id;
        self
    }

    /// Attach findings
    pub fn with_findings(mut self, findings: Vec<Finding>) -> Self {
        self.findings = findings;
        self
    }

    /// Check if content was blocked
    pub fn is_blocked(&self) -> bool {
        !self.is_safe
    }

    /// Check if content was modified
    pub fn is_modified(&self) -> bool {
        self.sanitized_content.is_some()
    }

    /// The sanitized content if present and non-blank, else `original`
    pub fn content_or<'a>(&'a self, original: &'a str) -> &'a str {
        self.sanitized_content
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or(original)
    }
}

/// Something a backend noticed in the text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// What was found
    pub kind: FindingKind,
    /// Short description
    pub detail: String,
    /// Byte offset where the finding starts, if it has a location
    pub start: Option<usize>,
    /// Byte offset where the finding ends
    pub end: Option<usize>,
}

impl Finding {
    /// A finding without a location in the text
    pub fn new(kind: FindingKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            start: None,
            end: None,
        }
    }

    /// Set the byte span of the finding
    pub fn at(mut self, start: usize, end: usize) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }
}

/// Kinds of findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FindingKind {
    /// Personal data or a secret
    Pii(RedactionType),
    /// Prompt injection phrase
    Injection(InjectionType),
    /// Sentence not supported by the reference documents
    Ungrounded,
    /// Category reported by a remote guard service
    Remote(SafetyCategory),
}

/// A redaction made to content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redaction {
    /// Type of redaction
    pub redaction_type: RedactionType,
    /// Hash of the original value
    pub original_hash: String,
    /// Replacement text used
    pub replacement: String,
    /// Start position in original text
    pub start: usize,
    /// End position in original text
    pub end: usize,
}

impl Redaction {
    /// Convert into a finding for the guard result
    pub fn to_finding(&self) -> Finding {
        Finding::new(
            FindingKind::Pii(self.redaction_type),
            format!("{} redacted", self.redaction_type),
        )
        .at(self.start, self.end)
    }
}

/// Types of redactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RedactionType {
    /// Social Security Number
    Ssn,
    /// Credit Card Number
    CreditCard,
    /// Email Address
    Email,
    /// Phone Number
    Phone,
    /// IP Address
    IpAddress,
    /// API Key or Secret
    ApiKey,
    /// Password
    Password,
    /// Other PII
    OtherPii,
}

impl RedactionType {
    /// Whether this redaction is a credential rather than personal data
    pub fn is_secret(&self) -> bool {
        matches!(self, RedactionType::ApiKey | RedactionType::Password)
    }
}

impl std::fmt::Display for RedactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RedactionType::Ssn => write!(f, "SSN"),
            RedactionType::CreditCard => write!(f, "Credit Card"),
            RedactionType::Email => write!(f, "Email"),
            RedactionType::Phone => write!(f, "Phone"),
            RedactionType::IpAddress => write!(f, "IP Address"),
            RedactionType::ApiKey => write!(f, "API Key"),
            RedactionType::Password => write!(f, "Password"),
            RedactionType::OtherPii => write!(f, "Other PII"),
        }
    }
}

/// Request context for guard operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardContext {
    /// Unique request ID
    pub request_id: Uuid,
    /// User identifier (optional)
    pub user_id: Option<String>,
    /// Session identifier (optional)
    pub session_id: Option<String>,
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Source IP
    pub source_ip: Option<String>,
    /// Additional metadata
    pub metadata: serde_json::Value,
}

impl Default for GuardContext {
    fn default() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            user_id: None,
            session_id: None,
            timestamp: Utc::now(),
            source_ip: None,
            metadata: serde_json::Value::Null,
        }
    }
}

impl GuardContext {
    /// Create a new context with a fresh request ID
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user ID
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the session ID
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the source IP
    pub fn with_source_ip(mut self, ip: impl Into<String>) -> Self {
        self.source_ip = Some(ip.into());
        self
    }

    /// Set metadata
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Key used for per-user rate limiting
    pub fn rate_limit_key(&self) -> &str {
        self.user_id.as_deref().unwrap_or("anonymous")
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Request context
    pub context: GuardContext,
    /// Direction (input/output)
    pub direction: Direction,
    /// Backend that produced the verdict
    pub backend: String,
    /// Original content hash
    pub content_hash: String,
    /// Result of the guard call
    pub result: AuditResult,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Result for audit logging (simplified)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AuditResult {
    /// Content passed unchanged
    Passed,
    /// Content passed after sanitization
    Sanitized { findings: usize },
    /// Content was blocked
    Blocked { category: SafetyCategory },
}

impl From<&GuardResult> for AuditResult {
    fn from(result: &GuardResult) -> Self {
        if !result.is_safe {
            AuditResult::Blocked {
                category: result.category.unwrap_or(SafetyCategory::None),
            }
        } else if result.is_modified() {
            AuditResult::Sanitized {
                findings: result.findings.len(),
            }
        } else {
            AuditResult::Passed
        }
    }
}
