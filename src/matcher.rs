use tracing::info;

use crate::WatchConfig;
use crate::notification::BuildNotification;

/// Decides whether a decoded notification warrants a badge update.
///
/// The repository gate applies first. When a tag pattern is configured it
/// replaces branch matching entirely, so a tag-pattern config never falls
/// back to the branch check even when a branch name is present.
pub fn should_publish(config: &WatchConfig, notification: &BuildNotification) -> bool {
    let Some(repo_name) = notification.repo_name.as_deref() else {
        info!("No repository name in notification, skipping.");
        return false;
    };
    if !config.repo_name_pattern.is_match(repo_name) {
        info!(
            "Repository '{}' does not match watched pattern, skipping.",
            repo_name
        );
        return false;
    }

    if let Some(tag_pattern) = &config.tag_name_pattern {
        match notification.tag_name.as_deref() {
            Some(tag_name) if tag_pattern.is_match(tag_name) => {
                info!("Tag '{}' matches watched pattern.", tag_name);
                true
            }
            Some(tag_name) => {
                info!("Tag '{}' does not match watched pattern, skipping.", tag_name);
                false
            }
            None => {
                info!("Tag pattern configured but notification carries no tag, skipping.");
                false
            }
        }
    } else {
        match notification.branch_name.as_deref() {
            Some(branch_name) if config.branch_name_pattern.is_match(branch_name) => {
                info!("Branch '{}' matches watched pattern.", branch_name);
                true
            }
            Some(branch_name) => {
                info!(
                    "Branch '{}' does not match watched pattern, skipping.",
                    branch_name
                );
                false
            }
            None => {
                info!("Notification carries no branch name, skipping.");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> WatchConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WatchConfig::from_lookup(|key| map.get(key).cloned()).unwrap()
    }

    fn notification(
        repo_name: Option<&str>,
        branch_name: Option<&str>,
        tag_name: Option<&str>,
    ) -> BuildNotification {
        BuildNotification {
            status: "SUCCESS".to_string(),
            project_id: "acme-ci".to_string(),
            repo_name: repo_name.map(str::to_string),
            branch_name: branch_name.map(str::to_string),
            tag_name: tag_name.map(str::to_string),
        }
    }

    #[test]
    fn absent_repo_name_never_publishes() {
        let config = config(&[("REPO_NAME_REGEX", "^acme/widget$")]);
        assert!(!should_publish(
            &config,
            &notification(None, Some("master"), None)
        ));
    }

    #[test]
    fn repo_mismatch_never_publishes() {
        let config = config(&[("REPO_NAME_REGEX", "^acme/widget$")]);
        assert!(!should_publish(
            &config,
            &notification(Some("acme/other"), Some("master"), None)
        ));
    }

    #[test]
    fn repo_match_is_anchored_not_substring() {
        let config = config(&[("REPO_NAME_REGEX", "acme/widget")]);
        assert!(!should_publish(
            &config,
            &notification(Some("acme/widget-legacy"), Some("master"), None)
        ));
        assert!(should_publish(
            &config,
            &notification(Some("acme/widget"), Some("master"), None)
        ));
    }

    #[test]
    fn matching_branch_publishes() {
        let config = config(&[("REPO_NAME_REGEX", "^acme/widget$")]);
        assert!(should_publish(
            &config,
            &notification(Some("acme/widget"), Some("master"), None)
        ));
    }

    #[test]
    fn non_matching_branch_does_not_publish() {
        let config = config(&[("REPO_NAME_REGEX", "^acme/widget$")]);
        assert!(!should_publish(
            &config,
            &notification(Some("acme/widget"), Some("feature-x"), None)
        ));
    }

    #[test]
    fn default_branch_pattern_rejects_near_misses() {
        let config = config(&[("REPO_NAME_REGEX", "^acme/widget$")]);
        for branch in ["master2", "not-master", ""] {
            assert!(
                !should_publish(
                    &config,
                    &notification(Some("acme/widget"), Some(branch), None)
                ),
                "branch '{}' should not match '^master$'",
                branch
            );
        }
    }

    #[test]
    fn tag_pattern_takes_precedence_over_branch() {
        let config = config(&[
            ("REPO_NAME_REGEX", "^acme/widget$"),
            ("TAG_NAME_REGEX", r"^v[0-9]+\.[0-9]+\.[0-9]+$"),
        ]);
        // Branch would fail '^master$' but the tag decides.
        assert!(should_publish(
            &config,
            &notification(Some("acme/widget"), Some("feature-x"), Some("v1.2.3"))
        ));
    }

    #[test]
    fn tag_pattern_configured_means_no_branch_fallback() {
        let config = config(&[
            ("REPO_NAME_REGEX", "^acme/widget$"),
            ("TAG_NAME_REGEX", r"^v[0-9]+\.[0-9]+\.[0-9]+$"),
        ]);
        // Branch matches '^master$' but no tag is present.
        assert!(!should_publish(
            &config,
            &notification(Some("acme/widget"), Some("master"), None)
        ));
        // Tag present but does not match.
        assert!(!should_publish(
            &config,
            &notification(Some("acme/widget"), Some("master"), Some("nightly"))
        ));
    }

    #[test]
    fn tag_triggered_build_without_branch_publishes() {
        let config = config(&[
            ("REPO_NAME_REGEX", "^acme/widget$"),
            ("TAG_NAME_REGEX", r"^v[0-9]+\.[0-9]+\.[0-9]+$"),
        ]);
        assert!(should_publish(
            &config,
            &notification(Some("acme/widget"), None, Some("v1.2.3"))
        ));
    }

    #[test]
    fn absent_branch_and_tag_is_false_not_an_error() {
        let config = config(&[("REPO_NAME_REGEX", "^acme/widget$")]);
        assert!(!should_publish(
            &config,
            &notification(Some("acme/widget"), None, None)
        ));
    }
}
