//! Audit logging for guard calls

use crate::config::AuditConfig;
use crate::types::{AuditEntry, AuditResult, Direction, GuardContext, GuardResult};

use std::collections::hash_map::DefaultHasher;
use std::fs::{File, OpenOptions};
use std::hash::{Hash, Hasher};
use std::io::{LineWriter, Write};
use std::sync::Mutex;
use tracing::{info, warn};

/// Longest content excerpt written when `log_content` is on
const MAX_LOGGED_CONTENT: usize = 500;

/// Audit logger
pub struct AuditLogger {
    config: AuditConfig,
    // Opened on first append and kept for the logger's lifetime
    file: Mutex<Option<LineWriter<File>>>,
}

impl AuditLogger {
    /// Create a new audit logger
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            file: Mutex::new(None),
        }
    }

    /// Log a guard call
    pub fn log(
        &self,
        context: &GuardContext,
        direction: Direction,
        backend: &str,
        content: &str,
        result: &GuardResult,
        duration_ms: u64,
    ) {
        if !self.config.enabled {
            return;
        }

        let entry = AuditEntry {
            context: context.clone(),
            direction,
            backend: backend.to_string(),
            content_hash: hash_content(content),
            result: AuditResult::from(result),
            processing_time_ms: duration_ms,
        };

        self.emit(&entry, content, result);
    }

    /// Content excerpt for log events, `None` unless `log_content` is set
    fn content_field(&self, content: &str) -> Option<String> {
        self.config
            .log_content
            .then(|| truncate(content, MAX_LOGGED_CONTENT))
    }

    fn emit(&self, entry: &AuditEntry, content: &str, result: &GuardResult) {
        let content_field = self.content_field(content);

        if let AuditResult::Blocked { category } = entry.result {
            warn!(
                request_id = %entry.context.request_id,
                user_id = ?entry.context.user_id,
                direction = %entry.direction,
                backend = %entry.backend,
                category = %category,
                reason = ?result.reason,
                content_hash = %entry.content_hash,
                content = ?content_field,
                "Guard blocked content"
            );
        } else {
            info!(
                request_id = %entry.context.request_id,
                user_id = ?entry.context.user_id,
                session_id = ?entry.context.session_id,
                direction = %entry.direction,
                backend = %entry.backend,
                content_hash = %entry.content_hash,
                result = ?entry.result,
                findings = result.findings.len(),
                processing_time_ms = entry.processing_time_ms,
                content = ?content_field,
                "Guard audit"
            );
        }

        if let Some(ref path) = self.config.log_file {
            if let Err(e) = self.append(path, entry) {
                warn!(path = %path, error = %e, "Failed to write audit entry");
            }
        }
    }

    fn append(&self, path: &str, entry: &AuditEntry) -> std::io::Result<()> {
        let json = serde_json::to_string(entry)?;
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if file.is_none() {
            let handle = OpenOptions::new().create(true).append(true).open(path)?;
            *file = Some(LineWriter::new(handle));
        }
        match file.as_mut() {
            Some(writer) => writeln!(writer, "{json}"),
            None => Ok(()),
        }
    }
}

/// Hash content for audit (privacy-preserving)
pub(crate) fn hash_content(content: &str) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

/// Truncate to at most `max_len` bytes without splitting a char
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut cut = max_len;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SafetyCategory;

    #[test]
    fn test_hash_content() {
        assert_eq!(hash_content("test"), hash_content("test"));
        assert_ne!(hash_content("test"), hash_content("different"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a longer string", 10), "this is a ...");
        // 'é' is two bytes; cutting at 2 would split it
        assert_eq!(truncate("aéb", 2), "a...");
    }

    #[test]
    fn test_audit_disabled_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditConfig {
            enabled: false,
            log_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        });

        logger.log(
            &GuardContext::default(),
            Direction::Input,
            "local",
            "test content",
            &GuardResult::safe(Direction::Input),
            10,
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_audit_file_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::new(AuditConfig {
            enabled: true,
            log_file: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        });
        let ctx = GuardContext::new().with_user_id("alice");

        logger.log(
            &ctx,
            Direction::Input,
            "local",
            "hello",
            &GuardResult::safe(Direction::Input),
            1,
        );
        logger.log(
            &ctx,
            Direction::Output,
            "local",
            "secret stuff",
            &GuardResult::blocked(Direction::Output, "leak", SafetyCategory::SecretLeak),
            2,
        );

        let contents = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<AuditEntry> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].result, AuditResult::Passed);
        assert_eq!(entries[0].context.user_id.as_deref(), Some("alice"));
        assert_eq!(
            entries[1].result,
            AuditResult::Blocked {
                category: SafetyCategory::SecretLeak
            }
        );
        assert!(!contents.contains("secret stuff"));
    }

    #[test]
    fn test_content_logged_only_when_enabled() {
        let quiet = AuditLogger::new(AuditConfig::default());
        assert_eq!(quiet.content_field("hello"), None);

        let verbose = AuditLogger::new(AuditConfig {
            log_content: true,
            ..Default::default()
        });
        assert_eq!(verbose.content_field("hello").as_deref(), Some("hello"));

        let long = "x".repeat(MAX_LOGGED_CONTENT + 100);
        let logged = verbose.content_field(&long).unwrap();
        assert_eq!(logged.len(), MAX_LOGGED_CONTENT + 3);
        assert!(logged.ends_with("..."));

        // Exercises the event path with content attached
        verbose.log(
            &GuardContext::default(),
            Direction::Input,
            "local",
            &long,
            &GuardResult::safe(Direction::Input),
            1,
        );
    }
}
