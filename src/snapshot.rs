//! Snapshot-backed sessions and fetchers
//!
//! A snapshot is a directory of JSON exports, one file per service:
//!
//! ```text
//! <dir>/account.json            optional export record: account_id, role_arn, external_id
//! <dir>/<region>/<service>.json  region-specific export
//! <dir>/<service>.json          region-independent fallback
//! ```
//!
//! Each service file is an object mapping a resource type to an array of
//! resource objects.

use crossdiff::{
    AccountConfig, AccountSlot, Error, Fetcher, Resource, ResourceMap, SessionProvider,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const ACCOUNT_FILE: &str = "account.json";

/// An opened snapshot directory for one account.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub account_id: String,
    pub root: PathBuf,
}

impl Snapshot {
    /// Candidate files for a service, most specific first.
    fn service_files(&self, service: &str, region: &str) -> [PathBuf; 2] {
        let file = format!("{service}.json");
        [self.root.join(region).join(&file), self.root.join(file)]
    }
}

/// How a snapshot was exported, as recorded in `account.json`.
#[derive(Default, Deserialize)]
struct AccountFile {
    account_id: Option<String>,
    role_arn: Option<String>,
    external_id: Option<String>,
}

/// Opens snapshot directories for the two sides of a comparison.
///
/// An explicit directory for a slot wins. Otherwise an account with a
/// profile opens `<profile root>/<profile>`.
#[derive(Debug, Default)]
pub struct SnapshotSessions {
    dirs: BTreeMap<AccountSlot, PathBuf>,
    profile_root: Option<PathBuf>,
}

impl SnapshotSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: AccountSlot, dir: impl Into<PathBuf>) {
        self.dirs.insert(slot, dir.into());
    }

    pub fn with_profile_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.profile_root = Some(root.into());
        self
    }

    fn locate(&self, slot: AccountSlot, account: &AccountConfig) -> crossdiff::Result<PathBuf> {
        if let Some(dir) = self.dirs.get(&slot) {
            if !dir.is_dir() {
                return Err(Error::Config(format!(
                    "snapshot directory not found: {}",
                    dir.display()
                )));
            }
            return Ok(dir.clone());
        }

        match (&account.profile, &self.profile_root) {
            (Some(profile), Some(root)) => {
                let dir = root.join(profile);
                if dir.is_dir() {
                    Ok(dir)
                } else {
                    Err(Error::CredentialsNotFound {
                        profile: profile.clone(),
                    })
                }
            }
            _ => Err(Error::Config(format!(
                "no snapshot directory for account {slot} ({})",
                account.account_id
            ))),
        }
    }

    /// Check the export record against the account. A role mismatch is fatal.
    fn check_account_file(root: &Path, account: &AccountConfig) -> crossdiff::Result<()> {
        let path = root.join(ACCOUNT_FILE);
        let file: AccountFile = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?
        } else {
            AccountFile::default()
        };

        if let Some(recorded) = &file.account_id
            && *recorded != account.account_id
        {
            log::warn!(
                "Snapshot {} was exported from account {recorded}, not {}",
                root.display(),
                account.account_id
            );
        }

        let Some(role_arn) = &account.role_arn else {
            return Ok(());
        };
        let assume_error = |reason: String| Error::AssumeRole {
            role_arn: role_arn.clone(),
            reason,
        };
        match &file.role_arn {
            None => log::warn!(
                "Snapshot {} does not record an export role; assuming {role_arn}",
                root.display()
            ),
            Some(recorded) if recorded != role_arn => {
                return Err(assume_error(format!(
                    "snapshot {} was exported with role {recorded}",
                    root.display()
                )));
            }
            Some(_) => {}
        }
        if let (Some(expected), Some(recorded)) = (&account.external_id, &file.external_id)
            && expected != recorded
        {
            return Err(assume_error(format!(
                "external id does not match the export of {}",
                root.display()
            )));
        }
        Ok(())
    }
}

impl SessionProvider for SnapshotSessions {
    type Session = Snapshot;

    fn open(&self, slot: AccountSlot, account: &AccountConfig) -> crossdiff::Result<Snapshot> {
        let root = self.locate(slot, account)?;
        Self::check_account_file(&root, account)?;
        log::info!(
            "Opened snapshot for account {slot} ({}) at {}",
            account.account_id,
            root.display()
        );

        Ok(Snapshot {
            account_id: account.account_id.clone(),
            root,
        })
    }
}

/// Reads one service's resources from a snapshot directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotFetcher;

impl SnapshotFetcher {
    fn parse(service: &str, path: &Path) -> crossdiff::Result<ResourceMap> {
        let fetch_error = |reason: String| Error::Fetch {
            service: service.to_string(),
            reason: format!("{}: {reason}", path.display()),
        };

        let content = fs::read_to_string(path).map_err(|e| fetch_error(e.to_string()))?;
        let types: BTreeMap<String, Vec<Value>> =
            serde_json::from_str(&content).map_err(|e| fetch_error(e.to_string()))?;

        let mut resources = ResourceMap::new();
        for (resource_type, items) in types {
            let mut parsed = Vec::with_capacity(items.len());
            for item in items {
                let Some(resource) = Resource::from_value(item) else {
                    return Err(fetch_error(format!(
                        "'{resource_type}' contains an entry that is not an object"
                    )));
                };
                parsed.push(resource);
            }
            resources.insert(resource_type, parsed);
        }
        Ok(resources)
    }
}

impl Fetcher<Snapshot> for SnapshotFetcher {
    fn fetch(
        &self,
        service: &str,
        session: &Snapshot,
        region: &str,
    ) -> crossdiff::Result<ResourceMap> {
        let Some(path) = session
            .service_files(service, region)
            .into_iter()
            .find(|p| p.is_file())
        else {
            log::debug!(
                "No {service} export for account {} in {region}",
                session.account_id
            );
            return Ok(ResourceMap::new());
        };

        log::debug!("Reading {}", path.display());
        Self::parse(service, &path)
    }
}

// ============================================================================
// Tests
// ============================================================================
