//! Severity classification of changed field paths
//!
//! A path is normalized (lowercased, `_` and `-` removed) and checked against
//! substring patterns tier by tier, most severe first. The pattern sets are
//! plain data and can be overridden from configuration.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordinal impact tier of a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All tiers, most severe first.
    pub const DESCENDING: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            "info" => Ok(Self::Info),
            other => Err(Error::Config(format!("unknown severity '{other}'"))),
        }
    }
}

const CRITICAL: &[&str] = &[
    "security",
    "securitygroup",
    "encryption",
    "encrypted",
    "policy",
    "policies",
    "iam",
    "kms",
    "public_access",
    "publicaccess",
    "acl",
    "principal",
    "permission",
    "role",
    "credential",
    "secret",
    "password",
    "auth",
    "ssl",
    "tls",
    "certificate",
    "firewall",
    "vpce",
    "endpoint",
    "network_policy",
];

const HIGH: &[&str] = &[
    "configuration",
    "config",
    "settings",
    "enabled",
    "disabled",
    "size",
    "type",
    "status",
    "state",
    "instance_type",
    "instancetype",
    "storage",
    "volume",
    "backup",
    "snapshot",
    "replication",
    "availability",
    "multi_az",
    "multiaz",
    "engine",
    "version",
    "class",
    "tier",
];

const MEDIUM: &[&str] = &[
    "lifecycle",
    "retention",
    "logging",
    "monitoring",
    "versioning",
    "notification",
    "alarm",
    "metric",
    "throughput",
    "iops",
    "bandwidth",
    "timeout",
    "cooldown",
    "scaling",
    "capacity",
    "limit",
    "quota",
];

const LOW: &[&str] = &[
    "name",
    "description",
    "metadata",
    "label",
    "comment",
    "note",
    "displayname",
    "display_name",
    "alias",
];

const INFO: &[&str] = &[
    "tags",
    "tag",
    "last_modified",
    "lastmodified",
    "created",
    "updated",
    "modified_date",
    "update_time",
    "create_time",
];

fn owned(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| (*p).to_string()).collect()
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Substring patterns for each severity tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityRules {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub medium: Vec<String>,
    pub low: Vec<String>,
    pub info: Vec<String>,
}

impl Default for SeverityRules {
    fn default() -> Self {
        Self {
            critical: owned(CRITICAL),
            high: owned(HIGH),
            medium: owned(MEDIUM),
            low: owned(LOW),
            info: owned(INFO),
        }
    }
}

impl SeverityRules {
    fn patterns(&self, severity: Severity) -> &[String] {
        match severity {
            Severity::Critical => &self.critical,
            Severity::High => &self.high,
            Severity::Medium => &self.medium,
            Severity::Low => &self.low,
            Severity::Info => &self.info,
        }
    }

    /// Classify a changed field path.
    ///
    /// An empty path has no addressable field and is informational. A path
    /// that matches no pattern is `Medium`.
    pub fn classify(&self, field_path: &str) -> Severity {
        if field_path.is_empty() {
            return Severity::Info;
        }

        let path = normalize(field_path);
        Severity::DESCENDING
            .into_iter()
            .find(|tier| {
                self.patterns(*tier)
                    .iter()
                    .map(|p| normalize(p))
                    .any(|p| !p.is_empty() && path.contains(&p))
            })
            .unwrap_or(Severity::Medium)
    }
}

/// Keep changes at or above `min`.
pub fn filter_by_severity<'a, T>(
    items: impl IntoIterator<Item = &'a T>,
    min: Severity,
    severity_of: impl Fn(&T) -> Severity,
) -> Vec<&'a T>
where
    T: 'a,
{
    items
        .into_iter()
        .filter(|item| severity_of(item) >= min)
        .collect()
}

/// Most severe tier among the given severities.
pub fn highest(severities: impl IntoIterator<Item = Severity>) -> Option<Severity> {
    severities.into_iter().max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_separator_insensitive() {
        let rules = SeverityRules::default();
        let a = rules.classify("SecurityGroupId");
        let b = rules.classify("security_group_id");
        let c = rules.classify("security-group-id");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, Severity::Critical);
    }

    #[test]
    fn test_empty_path_is_info() {
        assert_eq!(SeverityRules::default().classify(""), Severity::Info);
    }

    #[test]
    fn test_unmatched_path_is_medium() {
        assert_eq!(SeverityRules::default().classify("foo.bar[2]"), Severity::Medium);
    }

    #[test]
    fn test_tier_precedence() {
        let rules = SeverityRules::default();
        // "encryption" beats the high-tier "configuration"
        assert_eq!(
            rules.classify("server_side_encryption_configuration"),
            Severity::Critical
        );
        assert_eq!(rules.classify("versioning_status"), Severity::High);
        assert_eq!(rules.classify("retention_in_days"), Severity::Medium);
        assert_eq!(rules.classify("description"), Severity::Low);
        assert_eq!(rules.classify("tags.env"), Severity::Info);
    }

    #[test]
    fn test_nested_paths() {
        let rules = SeverityRules::default();
        assert_eq!(
            rules.classify("security_groups[0].group_id"),
            Severity::Critical
        );
        assert_eq!(rules.classify("attributes.VisibilityTimeout"), Severity::Medium);
    }

    #[test]
    fn test_custom_rules() {
        let rules = SeverityRules {
            critical: vec!["Visibility-Timeout".into()],
            ..SeverityRules::default()
        };
        assert_eq!(rules.classify("visibility_timeout"), Severity::Critical);
        assert_eq!(rules.classify("kms_key_id"), Severity::Medium);
    }

    #[test]
    fn test_severity_ordering_and_parse() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::Low > Severity::Info);
        assert_eq!("HIGH".parse::<Severity>().unwrap(), Severity::High);
        assert!("urgent".parse::<Severity>().is_err());
        assert_eq!(Severity::Medium.to_string(), "medium");
    }

    #[test]
    fn test_highest() {
        assert_eq!(
            highest([Severity::Low, Severity::Critical, Severity::Info]),
            Some(Severity::Critical)
        );
        assert_eq!(highest([]), None);
    }

    #[test]
    fn test_filter_by_severity() {
        let items = [Severity::Low, Severity::High, Severity::Critical];
        let kept = filter_by_severity(&items, Severity::High, |s| *s);
        assert_eq!(kept, vec![&Severity::High, &Severity::Critical]);
    }
}
