//! Service-level comparison with per-type failure isolation

use crate::comparator::{ComparisonSettings, ResourceTypeComparator};
use crate::error::{Error, Result};
use crate::identity::IdentityResolver;
use crate::report::ServiceComparisonResult;
use crate::resource::{Resource, ResourceMap};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// Run `f`, turning a panic into an error.
///
/// Used at every isolation boundary so one failing unit cannot take down
/// its siblings.
pub fn isolate<T>(context: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::from_panic(context, payload.as_ref())),
    }
}

/// Compares every resource type of one service.
#[derive(Debug, Clone)]
pub struct ServiceComparator {
    service_name: String,
    comparator: ResourceTypeComparator,
}

impl ServiceComparator {
    pub fn new(
        service_name: impl Into<String>,
        resolver: Arc<dyn IdentityResolver>,
        settings: &ComparisonSettings,
    ) -> Result<Self> {
        Ok(Self {
            service_name: service_name.into(),
            comparator: ResourceTypeComparator::new(resolver, settings)?,
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Compare the union of resource types seen in either account.
    ///
    /// A type missing on one side compares against an empty collection. A
    /// type whose comparison fails or panics is logged and recorded in
    /// `errors`; the remaining types still run.
    pub fn compare(&self, account1: &ResourceMap, account2: &ResourceMap) -> ServiceComparisonResult {
        let start = Instant::now();
        let mut result = ServiceComparisonResult::new(&self.service_name);

        let types: BTreeSet<&String> = account1.keys().chain(account2.keys()).collect();
        log::debug!(
            "Comparing {} resource types for {}",
            types.len(),
            self.service_name
        );

        for resource_type in types {
            let one = resources_of(account1, resource_type);
            let two = resources_of(account2, resource_type);

            let context = format!("{}/{resource_type}", self.service_name);
            match isolate(&context, || self.comparator.compare(resource_type, one, two)) {
                Ok(comparison) => {
                    result
                        .resource_comparisons
                        .insert(resource_type.clone(), comparison);
                }
                Err(e) => {
                    log::error!("Error comparing {context}: {e}");
                    result
                        .errors
                        .push(format!("Error comparing {resource_type}: {e}"));
                }
            }
        }

        result.execution_time_seconds = start.elapsed().as_secs_f64();
        log::info!("{result}");
        result
    }
}

fn resources_of<'a>(map: &'a ResourceMap, resource_type: &str) -> &'a [Resource] {
    map.get(resource_type).map(Vec::as_slice).unwrap_or(&[])
}
