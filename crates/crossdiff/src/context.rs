//! Provider traits for the outer layers
//!
//! These traits keep the engine independent of how sessions are opened,
//! how resources are fetched and how progress is shown.

use crate::error::Result;
use crate::orchestrator::AccountConfig;
use crate::report::ServiceComparisonResult;
use crate::resource::ResourceMap;
use std::fmt;

/// Which side of the comparison an account is on.
///
/// Both sides may name the same account, so providers that keep per-side
/// state key it by slot rather than by account id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AccountSlot {
    First,
    Second,
}

impl AccountSlot {
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for AccountSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Opens an authenticated session for one account.
///
/// The session is opaque to the engine; it is only handed back to
/// fetchers. A failure here aborts the run.
pub trait SessionProvider: Send + Sync {
    type Session: Send + Sync;

    fn open(&self, slot: AccountSlot, account: &AccountConfig) -> Result<Self::Session>;
}

/// Fetches every resource type of one service for one account.
///
/// An empty map means "no resources". Errors are recorded against the
/// service and account; they never abort the run.
pub trait Fetcher<S>: Send + Sync {
    fn fetch(&self, service: &str, session: &S, region: &str) -> Result<ResourceMap>;
}

impl<S, F> Fetcher<S> for F
where
    F: Fn(&str, &S, &str) -> Result<ResourceMap> + Send + Sync,
{
    fn fetch(&self, service: &str, session: &S, region: &str) -> Result<ResourceMap> {
        self(service, session, region)
    }
}

/// Progress callback for a comparison run
///
/// Called from worker threads, hence `&self`.
pub trait ProgressCallback: Send + Sync {
    /// Called when a service's comparison begins (`index` is 1-based)
    fn on_service_start(&self, service: &str, index: usize, total: usize);

    /// Called when a service's comparison has finished
    fn on_service_complete(&self, _result: &ServiceComparisonResult) {}
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_service_start(&self, _service: &str, _index: usize, _total: usize) {}
}

impl<F> ProgressCallback for F
where
    F: Fn(&str, usize, usize) + Send + Sync,
{
    fn on_service_start(&self, service: &str, index: usize, total: usize) {
        self(service, index, total);
    }
}
