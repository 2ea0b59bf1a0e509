//! Configuration for the security agent

use crate::error::{GuardError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "PRIME_GUARDRAILS_API_KEY";

/// Environment variable overriding the guard service endpoint
pub const ENDPOINT_ENV: &str = "PRIME_GUARDRAILS_ENDPOINT";

/// Default guard service endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.primeguardrails.com";

/// Which backend the agent talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Hosted guard service over HTTP
    #[default]
    Remote,
    /// In-process rule-based checks
    Local,
}

/// Main configuration for the agent
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AgentConfig {
    /// API key for the guard service
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Backend selection
    pub mode: BackendMode,
    /// Remote service configuration
    pub remote: RemoteConfig,
    /// PII detection configuration
    pub pii: PiiConfig,
    /// Injection detection configuration
    pub injection: InjectionConfig,
    /// Reference-document grounding configuration
    pub grounding: GroundingConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Audit configuration
    pub audit: AuditConfig,
}

impl AgentConfig {
    /// Config for the remote backend with the given key
    pub fn remote(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            mode: BackendMode::Remote,
            ..Default::default()
        }
    }

    /// Config for the local backend
    pub fn local() -> Self {
        Self {
            mode: BackendMode::Local,
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| GuardError::ConfigError(format!("Invalid config: {}", e)))
    }

    /// Load config from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Serialize to TOML (the API key is never written out)
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GuardError::ConfigError(format!("Failed to serialize config: {}", e)))
    }

    /// Override settings from `PRIME_GUARDRAILS_API_KEY` and `PRIME_GUARDRAILS_ENDPOINT`
    pub fn apply_env(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            if !endpoint.trim().is_empty() {
                self.remote.endpoint = endpoint;
            }
        }
        self
    }

    /// Check the config is usable
    pub fn validate(&self) -> Result<()> {
        if self.mode == BackendMode::Remote {
            let has_key = self
                .api_key
                .as_deref()
                .map(|k| !k.trim().is_empty())
                .unwrap_or(false);
            if !has_key {
                return Err(GuardError::ConfigError(
                    "API key is required for the remote backend".to_string(),
                ));
            }
            let endpoint = self.remote.endpoint.as_str();
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(GuardError::ConfigError(format!(
                    "Endpoint must be an http(s) URL: {}",
                    endpoint
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.injection.sensitivity) {
            return Err(GuardError::ConfigError(format!(
                "Injection sensitivity must be within 0.0-1.0, got {}",
                self.injection.sensitivity
            )));
        }
        if !(0.0..=1.0).contains(&self.grounding.min_support) {
            return Err(GuardError::ConfigError(format!(
                "Grounding min_support must be within 0.0-1.0, got {}",
                self.grounding.min_support
            )));
        }
        Ok(())
    }
}

/// Remote guard service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the guard service
    pub endpoint: String,
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// User-Agent header sent with each request
    pub user_agent: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_ms: 5000,
            user_agent: concat!("prime-guardrails/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// PII detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PiiConfig {
    /// Enable PII detection
    pub enabled: bool,
    /// Detect SSNs
    pub detect_ssn: bool,
    /// Detect credit cards
    pub detect_credit_card: bool,
    /// Detect emails
    pub detect_email: bool,
    /// Detect phone numbers
    pub detect_phone: bool,
    /// Detect IP addresses
    pub detect_ip: bool,
    /// Detect API keys/secrets
    pub detect_api_keys: bool,
    /// Block input containing PII instead of redacting it
    pub block_on_detection: bool,
    /// Redaction placeholder format (use {TYPE} for type name)
    pub redaction_format: String,
}

impl Default for PiiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            detect_ssn: true,
            detect_credit_card: true,
            detect_email: true,
            detect_phone: true,
            detect_ip: true,
            detect_api_keys: true,
            block_on_detection: false,
            redaction_format: "[REDACTED:{TYPE}]".to_string(),
        }
    }
}

/// Injection detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Enable injection detection
    pub enabled: bool,
    /// Block on detection (vs. just record a finding)
    pub block_on_detection: bool,
    /// Sensitivity level (0.0-1.0)
    pub sensitivity: f32,
    /// Custom patterns to detect
    pub custom_patterns: Vec<String>,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            block_on_detection: true,
            sensitivity: 0.7,
            custom_patterns: vec![],
        }
    }
}

/// Grounding configuration for output checks against reference documents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundingConfig {
    /// Enable grounding checks
    pub enabled: bool,
    /// Minimum share of supported sentences (0.0-1.0)
    pub min_support: f32,
    /// Mark ungrounded output unsafe
    pub block_ungrounded: bool,
    /// Drop unsupported sentences from ungrounded output
    pub strip_unsupported: bool,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_support: 0.5,
            block_ungrounded: false,
            strip_unsupported: true,
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Requests per minute per user
    pub requests_per_minute: u32,
    /// Burst allowance
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
            burst_size: 10,
        }
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Enable audit logging
    pub enabled: bool,
    /// Log content (vs. just hashes)
    pub log_content: bool,
    /// JSON-lines audit file
    pub log_file: Option<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_content: false,
            log_file: None,
        }
    }
}
