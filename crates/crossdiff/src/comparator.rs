//! Resource-type comparison
//!
//! Matches two collections of the same resource type by identity and turns
//! the structural diff of every matched pair into classified changes.

use crate::differ::{DiffOptions, Differ};
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::report::{ChangeType, ResourceChange, ResourceTypeComparison};
use crate::resource::Resource;
use crate::service::isolate;
use crate::severity::{Severity, SeverityRules};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Diff and severity settings shared by every comparator in a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    pub diff: DiffOptions,
    pub severity: SeverityRules,
}

/// Compares resources of one type across two accounts.
#[derive(Debug, Clone)]
pub struct ResourceTypeComparator {
    resolver: Arc<dyn IdentityResolver>,
    differ: Differ,
    rules: SeverityRules,
}

impl ResourceTypeComparator {
    pub fn new(resolver: Arc<dyn IdentityResolver>, settings: &ComparisonSettings) -> Result<Self> {
        let differ = Differ::new(&settings.diff, resolver.excluded_fields())?;
        Ok(Self {
            resolver,
            differ,
            rules: settings.severity.clone(),
        })
    }

    pub fn resolver(&self) -> &dyn IdentityResolver {
        self.resolver.as_ref()
    }

    /// Compare one resource type.
    ///
    /// Resources whose identity or diff fails or panics are skipped and
    /// recorded in the result's warnings; they never fail the whole type.
    pub fn compare(
        &self,
        resource_type: &str,
        account1: &[Resource],
        account2: &[Resource],
    ) -> Result<ResourceTypeComparison> {
        let mut result = ResourceTypeComparison::new(resource_type);
        result.account1_count = account1.len();
        result.account2_count = account2.len();

        let map1 = self.identity_map(resource_type, account1, 1, &mut result.warnings);
        let map2 = self.identity_map(resource_type, account2, 2, &mut result.warnings);

        for (id, resource) in &map2 {
            if !map1.contains_key(id) {
                result.added.push(self.existence_change(
                    ChangeType::Added,
                    resource_type,
                    id,
                    resource,
                ));
            }
        }

        for (id, old) in &map1 {
            let Some(new) = map2.get(id) else {
                result.removed.push(self.existence_change(
                    ChangeType::Removed,
                    resource_type,
                    id,
                    old,
                ));
                continue;
            };

            let outcome = isolate(&format!("diff of {resource_type} '{id}'"), || {
                self.diff_pair(resource_type, id, old, new)
            });
            match outcome {
                Ok(changes) if changes.is_empty() => result.unchanged_count += 1,
                Ok(changes) => result.modified.extend(changes),
                Err(e) => {
                    log::warn!("Skipping {resource_type} '{id}': {e}");
                    result.warnings.push(format!("Skipped '{id}': {e}"));
                }
            }
        }

        log::debug!("{result}");
        Ok(result)
    }

    /// Key resources by identity; a later duplicate replaces the earlier one.
    fn identity_map<'a>(
        &self,
        resource_type: &str,
        resources: &'a [Resource],
        account: u8,
        warnings: &mut Vec<String>,
    ) -> BTreeMap<String, &'a Resource> {
        let mut map = BTreeMap::new();
        for resource in resources {
            let outcome = isolate(&format!("{resource_type} identity"), || {
                self.resolver.resolve(resource, self.differ.filter())
            });
            let id = match outcome {
                Ok(id) => id,
                Err(e) => {
                    log::warn!("Account {account}: cannot identify {resource_type} resource: {e}");
                    warnings.push(format!("Account {account}: unidentified resource skipped: {e}"));
                    continue;
                }
            };
            if map.insert(id.clone(), resource).is_some() {
                log::warn!(
                    "Account {account}: duplicate {resource_type} identity '{id}', keeping the later resource"
                );
                warnings.push(format!("Account {account}: duplicate identity '{id}'"));
            }
        }
        map
    }

    fn existence_change(
        &self,
        change_type: ChangeType,
        resource_type: &str,
        id: &str,
        resource: &Resource,
    ) -> ResourceChange {
        let tree = self.differ.filter().strip(&resource.to_value());
        let (old_value, new_value, description) = match change_type {
            ChangeType::Added => (None, Some(tree), "Resource exists only in Account 2"),
            _ => (Some(tree), None, "Resource exists only in Account 1"),
        };
        ResourceChange {
            change_type,
            resource_id: id.to_string(),
            resource_type: resource_type.to_string(),
            field_path: None,
            old_value,
            new_value,
            severity: Severity::High,
            description: description.to_string(),
        }
    }

    fn diff_pair(
        &self,
        resource_type: &str,
        id: &str,
        old: &Resource,
        new: &Resource,
    ) -> Result<Vec<ResourceChange>> {
        let changes = self.differ.diff(&old.to_value(), &new.to_value())?;
        Ok(changes
            .entries()
            .into_iter()
            .map(|entry| ResourceChange {
                change_type: ChangeType::Modified,
                resource_id: id.to_string(),
                resource_type: resource_type.to_string(),
                severity: self.rules.classify(&entry.path),
                description: entry.description(),
                field_path: (!entry.path.is_empty()).then(|| entry.path.clone()),
                old_value: entry.old_value,
                new_value: entry.new_value,
            })
            .collect())
    }
}
