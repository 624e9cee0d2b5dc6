pub mod error;
pub mod handlers;
pub mod matcher;
pub mod notification;
pub mod publisher;
pub mod storage;

use error::{BadgeError, Result};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

const DEFAULT_BRANCH_NAME_REGEX: &str = "^master$";
const DEFAULT_BUCKET_NAME: &str = "build-status-badges";
const DEFAULT_BADGE_NAME: &str = "last-build-status-badge";

/// Placeholder logged for optional values that were not supplied.
pub const VALUE_NOT_SET: &str = "[value not set]";

/// A regex that the entire candidate string must conform to. `^master$`
/// must reject `master-2` and `not-master`, so matching is anchored and
/// never a substring search.
#[derive(Debug, Clone)]
pub struct FullMatchPattern {
    raw: String,
    regex: Regex,
}

impl FullMatchPattern {
    fn compile(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))
            .map_err(|e| BadgeError::Config(format!("Invalid regex '{}': {}", pattern, e)))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }

    /// The pattern as it was configured, without the added anchors.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FullMatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Watch rules and storage object names, resolved once at startup.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Repository names must fully match this pattern.
    pub repo_name_pattern: FullMatchPattern,
    /// Branch names must fully match this pattern. Only consulted when no
    /// tag pattern is configured.
    pub branch_name_pattern: FullMatchPattern,
    /// When set, tag matching replaces branch matching entirely.
    pub tag_name_pattern: Option<FullMatchPattern>,
    /// Bucket holding both the per-status badges and the published target.
    pub bucket_name: String,
    /// Base name (without extension) of the target badge object.
    pub badge_base_name: String,
}

impl WatchConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so parsing
    /// can be tested without mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let repo_name_regex = lookup("REPO_NAME_REGEX").ok_or_else(|| {
            BadgeError::Config(
                "Environment variable 'REPO_NAME_REGEX' must be set for this service.".to_string(),
            )
        })?;
        let branch_name_regex =
            lookup("BRANCH_NAME_REGEX").unwrap_or_else(|| DEFAULT_BRANCH_NAME_REGEX.to_string());
        let tag_name_regex = lookup("TAG_NAME_REGEX");
        let bucket_name = lookup("BUCKET_NAME").unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string());
        let badge_base_name = lookup("BADGE_NAME").unwrap_or_else(|| DEFAULT_BADGE_NAME.to_string());

        Ok(Self {
            repo_name_pattern: FullMatchPattern::compile(&repo_name_regex)?,
            branch_name_pattern: FullMatchPattern::compile(&branch_name_regex)?,
            tag_name_pattern: tag_name_regex
                .as_deref()
                .map(FullMatchPattern::compile)
                .transpose()?,
            bucket_name,
            badge_base_name,
        })
    }

    /// Name of the status-specific source badge object.
    pub fn source_object_name(&self, status: &str) -> String {
        format!("{}.svg", status.to_lowercase())
    }

    /// Name of the fixed, repeatedly overwritten target badge object.
    pub fn target_object_name(&self) -> String {
        format!("{}.svg", self.badge_base_name)
    }
}

pub struct AppState<S> {
    pub config: WatchConfig,
    pub storage: S,
}

pub type SharedState<S> = Arc<AppState<S>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_repo_name_regex_is_fatal() {
        let err = WatchConfig::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(err, BadgeError::Config(_)));
        assert!(err.to_string().contains("REPO_NAME_REGEX"));
    }

    #[test]
    fn defaults_are_applied() {
        let config =
            WatchConfig::from_lookup(lookup_from(&[("REPO_NAME_REGEX", "^acme/widget$")])).unwrap();
        assert!(config.branch_name_pattern.is_match("master"));
        assert!(config.tag_name_pattern.is_none());
        assert_eq!(config.bucket_name, "build-status-badges");
        assert_eq!(config.badge_base_name, "last-build-status-badge");
        assert_eq!(config.target_object_name(), "last-build-status-badge.svg");
    }

    #[test]
    fn overrides_are_applied() {
        let config = WatchConfig::from_lookup(lookup_from(&[
            ("REPO_NAME_REGEX", "^acme/.*$"),
            ("BRANCH_NAME_REGEX", "^main$"),
            ("TAG_NAME_REGEX", r"^v[0-9]+\.[0-9]+\.[0-9]+$"),
            ("BUCKET_NAME", "my-badges"),
            ("BADGE_NAME", "ci-status"),
        ]))
        .unwrap();
        assert!(config.branch_name_pattern.is_match("main"));
        assert!(config.tag_name_pattern.as_ref().unwrap().is_match("v1.2.3"));
        assert_eq!(config.bucket_name, "my-badges");
        assert_eq!(config.target_object_name(), "ci-status.svg");
    }

    #[test]
    fn invalid_pattern_is_fatal() {
        let err = WatchConfig::from_lookup(lookup_from(&[("REPO_NAME_REGEX", "(")])).unwrap_err();
        assert!(matches!(err, BadgeError::Config(_)));
    }

    #[test]
    fn source_object_name_lowercases_status() {
        let config =
            WatchConfig::from_lookup(lookup_from(&[("REPO_NAME_REGEX", "^x$")])).unwrap();
        assert_eq!(config.source_object_name("SUCCESS"), "success.svg");
        assert_eq!(config.source_object_name("failure"), "failure.svg");
    }
}
