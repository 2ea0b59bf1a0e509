//! Backend that delegates to the hosted guard service over HTTP

use crate::backend::GuardBackend;
use crate::config::RemoteConfig;
use crate::error::{GuardError, Result, SafetyCategory};
use crate::types::{Direction, Finding, FindingKind, GuardContext, GuardResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Request body for `/v1/guard/input`
#[derive(Debug, Serialize)]
struct InputRequest<'a> {
    text: &'a str,
    request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

/// Request body for `/v1/guard/output`
#[derive(Debug, Serialize)]
struct OutputRequest<'a> {
    text: &'a str,
    reference_docs: &'a [String],
    request_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<&'a str>,
}

/// Verdict as returned by the service
#[derive(Debug, Deserialize)]
struct VerdictResponse {
    is_safe: bool,
    #[serde(default)]
    sanitized_content: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    categories: Vec<String>,
}

/// Error body the service sends with non-success statuses
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "message")]
    error: String,
}

/// HTTP client for the guard service
pub struct RemoteBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl RemoteBackend {
    /// Create a backend for `config.endpoint` authenticating with `api_key`
    pub fn new(api_key: impl Into<String>, config: &RemoteConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(GuardError::ConfigError("API key must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        direction: Direction,
        context: &GuardContext,
    ) -> Result<GuardResult> {
        let url = format!("{}{}", self.endpoint, path);
        debug!(request_id = %context.request_id, url = %url, "Calling guard service");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error)
                .unwrap_or(text);
            warn!(
                request_id = %context.request_id,
                status = status.as_u16(),
                "Guard service returned an error"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GuardError::Unauthorized(message),
                StatusCode::TOO_MANY_REQUESTS => GuardError::RateLimitExceeded(message),
                _ => GuardError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let bytes = response.bytes().await?;
        let verdict: VerdictResponse = serde_json::from_slice(&bytes)
            .map_err(|e| GuardError::InvalidResponse(format!("Failed to parse verdict: {}", e)))?;

        Ok(into_result(verdict, direction, context))
    }
}

fn into_result(verdict: VerdictResponse, direction: Direction, context: &GuardContext) -> GuardResult {
    let categories: Vec<SafetyCategory> = verdict
        .categories
        .iter()
        .filter_map(|c| SafetyCategory::parse(c))
        .filter(|c| *c != SafetyCategory::None)
        .collect();

    let findings = categories
        .iter()
        .map(|c| Finding::new(FindingKind::Remote(*c), c.to_string()))
        .collect();

    GuardResult {
        request_id: context.request_id,
        direction,
        is_safe: verdict.is_safe,
        sanitized_content: verdict
            .sanitized_content
            .filter(|text| !text.trim().is_empty()),
        reason: verdict.reason,
        category: categories.first().copied(),
        findings,
    }
}

#[async_trait]
impl GuardBackend for RemoteBackend {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn guard_input(&self, text: &str, context: &GuardContext) -> Result<GuardResult> {
        let body = InputRequest {
            text,
            request_id: context.request_id,
            user_id: context.user_id.as_deref(),
        };
        self.post("/v1/guard/input", &body, Direction::Input, context)
            .await
    }

    async fn guard_output(
        &self,
        text: &str,
        reference_docs: &[String],
        context: &GuardContext,
    ) -> Result<GuardResult> {
        let body = OutputRequest {
            text,
            reference_docs,
            request_id: context.request_id,
            user_id: context.user_id.as_deref(),
        };
        self.post("/v1/guard/output", &body, Direction::Output, context)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            RemoteBackend::new("", &RemoteConfig::default()),
            Err(GuardError::ConfigError(_))
        ));
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let config = RemoteConfig {
            endpoint: "http://localhost:8080/".to_string(),
            ..Default::default()
        };
        let backend = RemoteBackend::new("key", &config).unwrap();
        assert_eq!(backend.endpoint(), "http://localhost:8080");
    }

    #[test]
    fn test_verdict_mapping() {
        let verdict: VerdictResponse = serde_json::from_str(
            r#"{"is_safe": false, "reason": "nope", "categories": ["Violent", "mystery", "None"]}"#,
        )
        .unwrap();
        let ctx = GuardContext::new();
        let result = into_result(verdict, Direction::Input, &ctx);

        assert!(!result.is_safe);
        assert_eq!(result.request_id, ctx.request_id);
        assert_eq!(result.category, Some(SafetyCategory::Violent));
        assert_eq!(result.findings.len(), 1);
        assert!(result.sanitized_content.is_none());
    }

    #[test]
    fn test_minimal_verdict() {
        let verdict: VerdictResponse = serde_json::from_str(r#"{"is_safe": true}"#).unwrap();
        let result = into_result(verdict, Direction::Output, &GuardContext::new());
        assert!(result.is_safe);
        assert!(result.category.is_none());
    }

    #[test]
    fn test_blank_sanitized_content_dropped() {
        let verdict: VerdictResponse =
            serde_json::from_str(r#"{"is_safe": true, "sanitized_content": "  "}"#).unwrap();
        let result = into_result(verdict, Direction::Output, &GuardContext::new());
        assert!(result.sanitized_content.is_none());
        assert_eq!(result.content_or("model reply"), "model reply");
    }
}
