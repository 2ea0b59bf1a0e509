//! Error types for the security agent

use thiserror::Error;

/// Result type alias for guard operations
pub type Result<T> = std::result::Result<T, GuardError>;

/// Guard error types
#[derive(Debug, Error)]
pub enum GuardError {
    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Guard service rejected the credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Guard service returned a non-success status
    #[error("Guard API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Guard service returned a body we could not decode
    #[error("Invalid response from guard service: {0}")]
    InvalidResponse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP transport error
    #[cfg(feature = "remote")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Safety categories reported by guard backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SafetyCategory {
    /// Violence and weapons
    Violent,
    /// Non-violent illegal activities
    IllegalActs,
    /// Sexual content
    SexualContent,
    /// Personally identifiable information
    Pii,
    /// Self-harm and suicide
    SelfHarm,
    /// Discrimination and hate speech
    UnethicalActs,
    /// Political misinformation
    PoliticallySensitive,
    /// Copyright infringement
    CopyrightViolation,
    /// Jailbreak and prompt injection attempts
    Jailbreak,
    /// Credentials or secrets leaking out of the model
    SecretLeak,
    /// Output not supported by the reference documents
    Ungrounded,
    /// No specific category
    None,
}

impl SafetyCategory {
    /// Parse a category name as reported by a guard service.
    ///
    /// Accepts both the display form ("Suicide & Self-Harm") and the compact
    /// form ("SelfHarm"), case-insensitively.
    pub fn parse(category: &str) -> Option<Self> {
        match category.trim().to_lowercase().as_str() {
            "violent" => Some(SafetyCategory::Violent),
            "non-violent illegal acts" | "illegalacts" => Some(SafetyCategory::IllegalActs),
            "sexual content" | "sexual content or sexual acts" | "sexualcontent" => {
                Some(SafetyCategory::SexualContent)
            }
            "pii" | "personally identifiable information" => Some(SafetyCategory::Pii),
            "suicide & self-harm" | "selfharm" => Some(SafetyCategory::SelfHarm),
            "unethical acts" | "unethicalacts" => Some(SafetyCategory::UnethicalActs),
            "politically sensitive" | "politically sensitive topics" | "politicallysensitive" => {
                Some(SafetyCategory::PoliticallySensitive)
            }
            "copyright violation" | "copyrightviolation" => {
                Some(SafetyCategory::CopyrightViolation)
            }
            "jailbreak" | "prompt injection" | "promptinjection" => Some(SafetyCategory::Jailbreak),
            "secret leak" | "secretleak" => Some(SafetyCategory::SecretLeak),
            "ungrounded" | "hallucination" => Some(SafetyCategory::Ungrounded),
            "none" => Some(SafetyCategory::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyCategory::Violent => write!(f, "Violent"),
            SafetyCategory::IllegalActs => write!(f, "Non-violent Illegal Acts"),
            SafetyCategory::SexualContent => write!(f, "Sexual Content"),
            SafetyCategory::Pii => write!(f, "PII"),
            SafetyCategory::SelfHarm => write!(f, "Suicide & Self-Harm"),
            SafetyCategory::UnethicalActs => write!(f, "Unethical Acts"),
            SafetyCategory::PoliticallySensitive => write!(f, "Politically Sensitive"),
            SafetyCategory::CopyrightViolation => write!(f, "Copyright Violation"),
            SafetyCategory::Jailbreak => write!(f, "Jailbreak"),
            SafetyCategory::SecretLeak => write!(f, "Secret Leak"),
            SafetyCategory::Ungrounded => write!(f, "Ungrounded"),
            SafetyCategory::None => write!(f, "None"),
        }
    }
}
