//! Prompt injection and jailbreak detection

use crate::config::InjectionConfig;
use crate::types::{Finding, FindingKind};
use serde::{Deserialize, Serialize};

/// Weight given to user-supplied patterns
const CUSTOM_PATTERN_WEIGHT: f32 = 0.8;

/// Built-in phrases with their weights
const BUILTIN_PATTERNS: &[(&str, f32, InjectionType)] = &[
    ("ignore previous instructions", 0.9, InjectionType::PromptOverride),
    ("ignore all previous", 0.9, InjectionType::PromptOverride),
    ("ignore the above", 0.8, InjectionType::PromptOverride),
    ("disregard your instructions", 0.9, InjectionType::PromptOverride),
    ("disregard all prior", 0.9, InjectionType::PromptOverride),
    ("forget everything", 0.8, InjectionType::PromptOverride),
    ("new instructions:", 0.7, InjectionType::PromptOverride),
    ("override:", 0.6, InjectionType::PromptOverride),
    ("pretend you are", 0.5, InjectionType::RolePlay),
    ("act as if you", 0.5, InjectionType::RolePlay),
    ("you are now", 0.4, InjectionType::RolePlay),
    ("roleplay as", 0.5, InjectionType::RolePlay),
    ("jailbreak", 0.9, InjectionType::RolePlay),
    ("dan mode", 0.95, InjectionType::RolePlay),
    ("developer mode", 0.7, InjectionType::RolePlay),
    ("what is your system prompt", 0.8, InjectionType::SystemPromptLeak),
    ("show me your instructions", 0.7, InjectionType::SystemPromptLeak),
    ("repeat your system message", 0.85, InjectionType::SystemPromptLeak),
    ("print your prompt", 0.8, InjectionType::SystemPromptLeak),
    ("reveal your hidden", 0.75, InjectionType::SystemPromptLeak),
    ("but first", 0.3, InjectionType::InstructionBypass),
    ("however, instead", 0.4, InjectionType::InstructionBypass),
    ("actually, do this instead", 0.6, InjectionType::InstructionBypass),
    ("base64:", 0.4, InjectionType::EncodingTrick),
    ("decode this:", 0.3, InjectionType::EncodingTrick),
    ("rot13", 0.5, InjectionType::EncodingTrick),
    ("system:", 0.4, InjectionType::ContextManipulation),
    ("assistant:", 0.3, InjectionType::ContextManipulation),
    ("[system]", 0.5, InjectionType::ContextManipulation),
    ("<|im_start|>", 0.7, InjectionType::ContextManipulation),
    ("###", 0.2, InjectionType::ContextManipulation),
];

/// Types of injection attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InjectionType {
    /// Direct prompt override
    PromptOverride,
    /// Role-playing manipulation
    RolePlay,
    /// System prompt extraction
    SystemPromptLeak,
    /// Instruction bypass
    InstructionBypass,
    /// Encoding tricks
    EncodingTrick,
    /// Context manipulation
    ContextManipulation,
}

/// Result of injection detection
#[derive(Debug, Clone)]
pub struct InjectionResult {
    /// Whether confidence reached the configured sensitivity
    pub detected: bool,
    /// Confidence score (0.0-1.0)
    pub confidence: f32,
    /// Matched patterns
    pub patterns: Vec<DetectedPattern>,
}

impl InjectionResult {
    fn none() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            patterns: vec![],
        }
    }

    /// Convert matched patterns into guard findings
    pub fn findings(&self) -> Vec<Finding> {
        self.patterns
            .iter()
            .map(|p| {
                Finding::new(
                    FindingKind::Injection(p.injection_type),
                    format!("matched \"{}\"", p.pattern),
                )
            })
            .collect()
    }
}

/// A detected injection pattern
#[derive(Debug, Clone)]
pub struct DetectedPattern {
    /// Type of injection
    pub injection_type: InjectionType,
    /// Matched pattern
    pub pattern: String,
    /// Char position in the normalized text
    pub position: usize,
}

/// Prompt injection detector
pub struct InjectionDetector {
    config: InjectionConfig,
    custom_patterns: Vec<String>,
}

impl InjectionDetector {
    /// Create a new injection detector
    pub fn new(config: InjectionConfig) -> Self {
        let custom_patterns = config
            .custom_patterns
            .iter()
            .map(|p| normalize(p))
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            config,
            custom_patterns,
        }
    }

    /// Detect injection attempts in text
    pub fn detect(&self, text: &str) -> InjectionResult {
        if !self.config.enabled {
            return InjectionResult::none();
        }

        let normalized = normalize(text);
        let mut patterns = vec![];
        let mut total_weight = 0.0;
        let mut max_weight: f32 = 0.0;

        for &(pattern, weight, injection_type) in BUILTIN_PATTERNS {
            if let Some(pos) = normalized.find(pattern) {
                patterns.push(DetectedPattern {
                    injection_type,
                    pattern: pattern.to_string(),
                    position: normalized[..pos].chars().count(),
                });
                total_weight += weight;
                max_weight = max_weight.max(weight);
            }
        }

        for pattern in &self.custom_patterns {
            if let Some(pos) = normalized.find(pattern.as_str()) {
                patterns.push(DetectedPattern {
                    injection_type: InjectionType::PromptOverride,
                    pattern: pattern.clone(),
                    position: normalized[..pos].chars().count(),
                });
                total_weight += CUSTOM_PATTERN_WEIGHT;
                max_weight = max_weight.max(CUSTOM_PATTERN_WEIGHT);
            }
        }

        // Strongest match plus diminishing credit for the rest
        let confidence = if patterns.is_empty() {
            0.0
        } else {
            let cumulative = (total_weight / (patterns.len() as f32 + 1.0)).min(0.5);
            (max_weight + cumulative).min(1.0)
        };

        InjectionResult {
            detected: confidence >= self.config.sensitivity,
            confidence,
            patterns,
        }
    }

    /// Check if content should be blocked based on detection result
    pub fn should_block(&self, result: &InjectionResult) -> bool {
        self.config.block_on_detection && result.detected
    }
}

/// Lowercase and collapse whitespace runs so spacing tricks don't dodge matches
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
