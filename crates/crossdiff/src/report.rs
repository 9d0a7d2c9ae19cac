//! Report model produced by a comparison run

use crate::severity::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Kind of a detected difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Resource exists only in account 2
    Added,
    /// Resource exists only in account 1
    Removed,
    /// Resource exists in both with differing fields
    Modified,
}

impl ChangeType {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Added => "+",
            Self::Removed => "-",
            Self::Modified => "~",
        }
    }
}

/// One detected difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceChange {
    pub change_type: ChangeType,
    pub resource_id: String,
    pub resource_type: String,
    /// Dotted path of the changed field; absent for whole-resource changes
    pub field_path: Option<String>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub severity: Severity,
    pub description: String,
}

impl fmt::Display for ResourceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.change_type {
            ChangeType::Added => write!(f, "Added {}: {}", self.resource_type, self.resource_id),
            ChangeType::Removed => {
                write!(f, "Removed {}: {}", self.resource_type, self.resource_id)
            }
            ChangeType::Modified => {
                write!(f, "Modified {}: {}", self.resource_type, self.resource_id)?;
                match &self.field_path {
                    Some(path) if !path.is_empty() => write!(f, " ({path})"),
                    _ => Ok(()),
                }
            }
        }
    }
}

/// Comparison of one resource type between the two accounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceTypeComparison {
    pub resource_type: String,
    /// Raw input size, before identity de-duplication
    pub account1_count: usize,
    pub account2_count: usize,
    pub added: Vec<ResourceChange>,
    pub removed: Vec<ResourceChange>,
    pub modified: Vec<ResourceChange>,
    pub unchanged_count: usize,
    /// Duplicate identities and resources skipped during comparison
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResourceTypeComparison {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Default::default()
        }
    }

    pub fn total_changes(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    /// Every change, in added/removed/modified order.
    pub fn all_changes(&self) -> impl Iterator<Item = &ResourceChange> {
        self.added
            .iter()
            .chain(&self.removed)
            .chain(&self.modified)
    }
}

impl fmt::Display for ResourceTypeComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: +{} -{} ~{} (={})",
            self.resource_type,
            self.added.len(),
            self.removed.len(),
            self.modified.len(),
            self.unchanged_count
        )
    }
}

/// Comparison of every resource type of one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceComparisonResult {
    pub service_name: String,
    pub resource_comparisons: BTreeMap<String, ResourceTypeComparison>,
    pub errors: Vec<String>,
    pub execution_time_seconds: f64,
    pub timestamp: DateTime<Utc>,
}

impl ServiceComparisonResult {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            resource_comparisons: BTreeMap::new(),
            errors: Vec::new(),
            execution_time_seconds: 0.0,
            timestamp: Utc::now(),
        }
    }

    pub fn total_changes(&self) -> usize {
        self.resource_comparisons
            .values()
            .map(ResourceTypeComparison::total_changes)
            .sum()
    }

    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn all_changes(&self) -> impl Iterator<Item = &ResourceChange> {
        self.resource_comparisons
            .values()
            .flat_map(ResourceTypeComparison::all_changes)
    }
}

impl fmt::Display for ServiceComparisonResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.has_errors() { "with errors" } else { "ok" };
        write!(
            f,
            "{} {status}: {} changes",
            self.service_name,
            self.total_changes()
        )
    }
}

/// Run-level failure of a whole service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceError {
    pub service_name: String,
    pub error_type: String,
    pub error_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ServiceError {
    pub fn from_error(service_name: impl Into<String>, error: &crate::Error) -> Self {
        Self {
            service_name: service_name.into(),
            error_type: error.kind().to_string(),
            error_message: error.to_string(),
            error_code: error.code().map(String::from),
            timestamp: Utc::now(),
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.service_name, self.error_type, self.error_message
        )
    }
}

/// Aggregate statistics over a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_services_compared: usize,
    pub total_services_with_changes: usize,
    pub total_changes: usize,
    pub total_resources_account1: usize,
    pub total_resources_account2: usize,
    /// Every tier is present, zero when unused
    pub changes_by_severity: BTreeMap<Severity, usize>,
    pub services_with_errors: Vec<String>,
    pub execution_time_seconds: f64,
}

impl ReportSummary {
    /// Aggregate per-service results and run-level errors.
    pub fn from_results(
        results: &[ServiceComparisonResult],
        errors: &[ServiceError],
        execution_time_seconds: f64,
    ) -> Self {
        let mut changes_by_severity: BTreeMap<Severity, usize> =
            Severity::DESCENDING.iter().map(|s| (*s, 0)).collect();
        let mut total_resources_account1 = 0;
        let mut total_resources_account2 = 0;

        for result in results {
            for comparison in result.resource_comparisons.values() {
                total_resources_account1 += comparison.account1_count;
                total_resources_account2 += comparison.account2_count;
            }
            for change in result.all_changes() {
                *changes_by_severity.entry(change.severity).or_default() += 1;
            }
        }

        let services_with_errors: BTreeSet<String> = errors
            .iter()
            .map(|e| e.service_name.clone())
            .chain(
                results
                    .iter()
                    .filter(|r| r.has_errors())
                    .map(|r| r.service_name.clone()),
            )
            .collect();

        Self {
            total_services_compared: results.len(),
            total_services_with_changes: results.iter().filter(|r| r.has_changes()).count(),
            total_changes: results.iter().map(ServiceComparisonResult::total_changes).sum(),
            total_resources_account1,
            total_resources_account2,
            changes_by_severity,
            services_with_errors: services_with_errors.into_iter().collect(),
            execution_time_seconds,
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.changes_by_severity.get(&severity).copied().unwrap_or(0)
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} changes across {}/{} services",
            self.total_changes, self.total_services_with_changes, self.total_services_compared
        )
    }
}

/// Complete result of one comparison run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub account1_id: String,
    pub account2_id: String,
    /// Region of account 1, kept for consumers that read a single region
    pub region: String,
    pub region1: String,
    pub region2: String,
    pub services_compared: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub results: Vec<ServiceComparisonResult>,
    pub summary: ReportSummary,
    pub errors: Vec<ServiceError>,
}

impl ComparisonReport {
    pub fn get_service_result(&self, service_name: &str) -> Option<&ServiceComparisonResult> {
        self.results.iter().find(|r| r.service_name == service_name)
    }

    /// All changes at or above `min`, across every service.
    pub fn changes_at_or_above(&self, min: Severity) -> Vec<&ResourceChange> {
        crate::severity::filter_by_severity(
            self.results.iter().flat_map(ServiceComparisonResult::all_changes),
            min,
            |c| c.severity,
        )
    }

    /// Most severe change in the report.
    pub fn highest_severity(&self) -> Option<Severity> {
        crate::severity::highest(
            self.results
                .iter()
                .flat_map(ServiceComparisonResult::all_changes)
                .map(|c| c.severity),
        )
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.results.iter().any(ServiceComparisonResult::has_errors)
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} in {} - {}",
            self.account1_id, self.account2_id, self.region, self.summary
        )
    }
}
