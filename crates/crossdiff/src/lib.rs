//! # Crossdiff
//!
//! Cross-account infrastructure comparison.
//!
//! This crate takes snapshots of the resources of two cloud accounts,
//! matches resources that represent the same logical thing, diffs them
//! field by field and classifies every difference by operational impact.
//!
//! ## Core Concepts
//!
//! - **IdentityResolver**: Derives a key both accounts agree on (ARNs and
//!   instance ids never match across accounts)
//! - **Differ**: Recursive structural diff with order-insensitive lists,
//!   significant-digit rounding and field exclusions
//! - **SeverityRules**: Maps a changed field path to critical/high/medium/low/info
//! - **ResourceTypeComparator** / **ServiceComparator**: Added, removed and
//!   modified resources per type, with per-type failure isolation
//! - **Orchestrator**: Opens both sessions, fetches and compares services on
//!   a bounded worker pool and aggregates a [`ComparisonReport`]
//!
//! ## Example
//!
//! ```ignore
//! use crossdiff::{
//!     AccountConfig, AccountSlot, Orchestrator, ResourceMap, RunConfig, ServiceInfo,
//!     ServiceRegistry, SessionProvider,
//! };
//! use std::sync::Arc;
//!
//! struct Offline;
//!
//! impl SessionProvider for Offline {
//!     type Session = String;
//!     fn open(&self, _: AccountSlot, account: &AccountConfig) -> crossdiff::Result<String> {
//!         Ok(account.account_id.clone())
//!     }
//! }
//!
//! let mut registry = ServiceRegistry::new();
//! registry.register(
//!     "s3",
//!     Arc::new(|_: &str, _: &String, _: &str| -> crossdiff::Result<ResourceMap> {
//!         Ok(ResourceMap::new())
//!     }),
//!     ServiceInfo::new("Amazon S3", &["buckets"]),
//! );
//!
//! let config = RunConfig::new(
//!     AccountConfig::new("111111111111")?,
//!     AccountConfig::new("222222222222")?,
//! );
//! let report = Orchestrator::new(registry, Offline).run(&config)?;
//! println!("{}", report.summary);
//! ```
//!
//! ## Provider Traits
//!
//! - [`SessionProvider`]: Opens a session per account; failure aborts the run
//! - [`Fetcher`]: Returns one service's resources for one account
//! - [`ProgressCallback`]: Receives per-service progress from worker threads

pub mod comparator;
pub mod context;
pub mod differ;
pub mod error;
pub mod identity;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod resource;
pub mod service;
pub mod severity;

// Re-export main types at crate root
pub use comparator::{ComparisonSettings, ResourceTypeComparator};
pub use context::{AccountSlot, Fetcher, NoProgress, ProgressCallback, SessionProvider};
pub use differ::{ChangeSet, DiffEntry, DiffKind, DiffOptions, Differ, FieldFilter, normalize_path};
pub use error::{Error, ErrorCategory, Result};
pub use identity::{DefaultResolver, IdentityResolver, default_identity, resolver_for};
pub use orchestrator::{
    AccountConfig, DEFAULT_MAX_WORKERS, DEFAULT_REGION, MAX_WORKERS_LIMIT, Orchestrator,
    RunConfig, validate_account_id,
};
pub use registry::{ServiceEntry, ServiceInfo, ServiceRegistry};
pub use report::{
    ChangeType, ComparisonReport, ReportSummary, ResourceChange, ResourceTypeComparison,
    ServiceComparisonResult, ServiceError,
};
pub use resource::{Resource, ResourceMap, count_resources};
pub use service::{ServiceComparator, isolate};
pub use severity::{Severity, SeverityRules, filter_by_severity};
