//! Orchestration - sessions, parallel fetch/compare, aggregation

use crate::comparator::ComparisonSettings;
use crate::context::{AccountSlot, NoProgress, ProgressCallback, SessionProvider};
use crate::differ::Differ;
use crate::error::{Error, Result};
use crate::registry::{ServiceEntry, ServiceRegistry};
use crate::report::{ComparisonReport, ReportSummary, ServiceComparisonResult, ServiceError};
use crate::resource::ResourceMap;
use crate::service::{ServiceComparator, isolate};
use chrono::Utc;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_SESSION_NAME: &str = "acctdiff";
pub const DEFAULT_MAX_WORKERS: usize = 10;
pub const MAX_WORKERS_LIMIT: usize = 50;

/// Check that an account id is exactly 12 ASCII digits.
pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.len() == 12 && account_id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::InvalidAccountId(account_id.to_string()))
    }
}

/// How to reach one of the two accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_id: String,
    pub profile: Option<String>,
    pub role_arn: Option<String>,
    pub external_id: Option<String>,
    pub session_name: String,
    pub region: String,
}

impl AccountConfig {
    /// Create an account config, validating the id.
    pub fn new(account_id: impl Into<String>) -> Result<Self> {
        let account_id = account_id.into();
        validate_account_id(&account_id)?;
        Ok(Self {
            account_id,
            profile: None,
            role_arn: None,
            external_id: None,
            session_name: DEFAULT_SESSION_NAME.to_string(),
            region: DEFAULT_REGION.to_string(),
        })
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_role(mut self, role_arn: impl Into<String>, external_id: Option<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self.external_id = external_id;
        self
    }
}

/// Everything one comparison run needs besides the collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub account1: AccountConfig,
    pub account2: AccountConfig,
    /// Services to compare; `None` means every registered service
    pub services: Option<Vec<String>>,
    pub parallel: bool,
    pub max_workers: usize,
    pub comparison: ComparisonSettings,
}

impl RunConfig {
    pub fn new(account1: AccountConfig, account2: AccountConfig) -> Self {
        Self {
            account1,
            account2,
            services: None,
            parallel: true,
            max_workers: DEFAULT_MAX_WORKERS,
            comparison: ComparisonSettings::default(),
        }
    }

    /// Pool size: two fetch units per service, capped by the worker limit.
    pub fn worker_count(&self, services: usize) -> usize {
        self.max_workers
            .clamp(1, MAX_WORKERS_LIMIT)
            .min(services * 2)
            .max(1)
    }
}

/// Drives a full two-account comparison.
pub struct Orchestrator<P: SessionProvider> {
    registry: ServiceRegistry<P::Session>,
    sessions: P,
    progress: Arc<dyn ProgressCallback>,
}

impl<P: SessionProvider> Orchestrator<P> {
    pub fn new(registry: ServiceRegistry<P::Session>, sessions: P) -> Self {
        Self {
            registry,
            sessions,
            progress: Arc::new(NoProgress),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    pub fn registry(&self) -> &ServiceRegistry<P::Session> {
        &self.registry
    }

    /// Run the comparison.
    ///
    /// Fails only when a session cannot be opened, the configuration is
    /// invalid, or no requested service is registered. Every other failure
    /// is recorded in the report.
    pub fn run(&self, config: &RunConfig) -> Result<ComparisonReport> {
        let start = Instant::now();
        validate_account_id(&config.account1.account_id)?;
        validate_account_id(&config.account2.account_id)?;
        // Surface bad exclusion patterns before any work starts
        Differ::new(&config.comparison.diff, &[])?;

        log::info!(
            "Comparing account {} ({}) with {} ({})",
            config.account1.account_id,
            config.account1.region,
            config.account2.account_id,
            config.account2.region
        );

        let session1 = self.sessions.open(AccountSlot::First, &config.account1)?;
        let session2 = self.sessions.open(AccountSlot::Second, &config.account2)?;
        let services = self.resolve_services(config)?;

        let sessions = (&session1, &session2);
        let started = AtomicUsize::new(0);
        let outcomes: Vec<(String, Result<ServiceComparisonResult>)> = if config.parallel {
            // The pool also hosts the two fetches of each service
            let workers = config.worker_count(services.len());
            log::debug!("Running {} services on {workers} workers", services.len());
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| Error::Other(format!("Failed to create thread pool: {e}")))?;
            pool.install(|| {
                services
                    .par_iter()
                    .map(|name| {
                        let outcome =
                            self.run_service(name, sessions, config, &started, services.len());
                        (name.clone(), outcome)
                    })
                    .collect()
            })
        } else {
            services
                .iter()
                .map(|name| {
                    let outcome =
                        self.run_service(name, sessions, config, &started, services.len());
                    (name.clone(), outcome)
                })
                .collect()
        };

        let mut compared = Vec::with_capacity(outcomes.len());
        let mut results = Vec::with_capacity(outcomes.len());
        let mut errors = Vec::new();
        for (name, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    compared.push(name);
                    results.push(result);
                }
                Err(e) => {
                    log::error!("Service {name} failed: {e}");
                    errors.push(ServiceError::from_error(name, &e));
                }
            }
        }

        let elapsed = start.elapsed().as_secs_f64();
        let summary = ReportSummary::from_results(&results, &errors, elapsed);
        log::info!("Comparison finished in {elapsed:.2}s: {summary}");

        Ok(ComparisonReport {
            account1_id: config.account1.account_id.clone(),
            account2_id: config.account2.account_id.clone(),
            region: config.account1.region.clone(),
            region1: config.account1.region.clone(),
            region2: config.account2.region.clone(),
            services_compared: compared,
            timestamp: Utc::now(),
            results,
            summary,
            errors,
        })
    }

    /// Requested services that are registered; unknown names are dropped.
    fn resolve_services(&self, config: &RunConfig) -> Result<Vec<String>> {
        let Some(requested) = &config.services else {
            let all: Vec<String> = self
                .registry
                .list_services()
                .into_iter()
                .map(String::from)
                .collect();
            if all.is_empty() {
                return Err(Error::NoValidServices { requested: all });
            }
            return Ok(all);
        };

        let (valid, invalid) = self.registry.validate_services(requested);
        for name in &invalid {
            log::warn!("Skipping unsupported service '{name}'");
        }
        if valid.is_empty() {
            return Err(Error::NoValidServices {
                requested: requested.clone(),
            });
        }
        Ok(valid)
    }

    /// Fetch both accounts, then compare. Runs inside an isolation boundary.
    fn run_service(
        &self,
        name: &str,
        (session1, session2): (&P::Session, &P::Session),
        config: &RunConfig,
        started: &AtomicUsize,
        total: usize,
    ) -> Result<ServiceComparisonResult> {
        isolate(&format!("service {name}"), || {
            let entry = self
                .registry
                .get(name)
                .ok_or_else(|| Error::ServiceNotSupported(name.to_string()))?;

            let fetch1 = || {
                fetch_account(entry, name, session1, &config.account1.region, AccountSlot::First)
            };
            let fetch2 = || {
                fetch_account(entry, name, session2, &config.account2.region, AccountSlot::Second)
            };
            let ((map1, err1), (map2, err2)) = if config.parallel {
                rayon::join(fetch1, fetch2)
            } else {
                (fetch1(), fetch2())
            };

            let index = started.fetch_add(1, Ordering::SeqCst) + 1;
            self.progress.on_service_start(name, index, total);

            let comparator =
                ServiceComparator::new(name, Arc::clone(&entry.resolver), &config.comparison)?;
            let mut result = comparator.compare(&map1, &map2);
            let fetch_errors: Vec<String> = err1.into_iter().chain(err2).collect();
            result.errors.splice(0..0, fetch_errors);

            self.progress.on_service_complete(&result);
            Ok(result)
        })
    }
}

/// Fetch one account's resources; a failure yields an empty map and a message.
fn fetch_account<S>(
    entry: &ServiceEntry<S>,
    service: &str,
    session: &S,
    region: &str,
    slot: AccountSlot,
) -> (ResourceMap, Option<String>) {
    let outcome = isolate(&format!("fetch {service}"), || {
        entry.fetcher.fetch(service, session, region)
    });
    match outcome {
        Ok(map) => {
            log::debug!(
                "Account {slot}: fetched {} {service} resources",
                crate::resource::count_resources(&map)
            );
            (map, None)
        }
        Err(e) => {
            let message = format!("Account {slot}: Failed to fetch {service}: {e}");
            log::error!("{message}");
            (ResourceMap::new(), Some(message))
        }
    }
}
