//! `acctdiff compare`

use anyhow::{Context as AnyhowContext, Result};
use crossdiff::{
    AccountConfig, AccountSlot, DEFAULT_MAX_WORKERS, DEFAULT_REGION, Orchestrator, RunConfig,
};
use std::fs;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;

use crate::Context;
use crate::cli::{CompareArgs, OutputFormat};
use crate::config::{AccountEntry, FileConfig, expand_path};
use crate::progress::ServiceProgress;
use crate::render::{self, RenderOptions};
use crate::services;
use crate::snapshot::SnapshotSessions;
use crate::ui;

pub fn run(ctx: &Context, args: CompareArgs) -> Result<()> {
    let file = FileConfig::load(args.config.as_deref())?;
    let config = build_run_config(&args, &file)?;
    let sessions = build_sessions(&args, &file, &config)?;

    let progress = Arc::new(if ctx.quiet {
        ServiceProgress::hidden()
    } else {
        ServiceProgress::new()
    });

    let orchestrator =
        Orchestrator::new(services::builtin_registry(), sessions).with_progress(progress.clone());
    let result = {
        let _quiet = QuietPanics::install();
        orchestrator.run(&config)
    };
    progress.finish();
    let report = result?;

    if args.output.is_some() {
        colored::control::set_override(false);
    }

    let rendered = match args.format {
        OutputFormat::Table => {
            let options = RenderOptions {
                min_severity: args.min_severity.map_or(crossdiff::Severity::Info, Into::into),
                details: args.details,
            };
            render::render_table(&report, &options)
        }
        OutputFormat::Json => render::render_json(&report)?,
        OutputFormat::Yaml => render::render_yaml(&report)?,
    };

    match &args.output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
            if !ctx.quiet {
                ui::info(&format!("Report written to {}", path.display()));
            }
        }
        None => println!("{rendered}"),
    }

    let stdout_is_data = args.format != OutputFormat::Table && args.output.is_none();
    if report.has_errors() && !ctx.quiet && !stdout_is_data {
        ui::warn(&format!(
            "{} service(s) reported errors: {}",
            report.summary.services_with_errors.len(),
            report.summary.services_with_errors.join(", ")
        ));
    }

    Ok(())
}

/// Merge command-line flags over the config file.
fn build_run_config(args: &CompareArgs, file: &FileConfig) -> Result<RunConfig> {
    let entry1 = file.account(&args.account1);
    let entry2 = file.account(&args.account2);

    let region1 = args
        .region
        .clone()
        .or_else(|| entry1.and_then(|e| e.region.clone()))
        .or_else(|| file.region.clone())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());
    let region2 = args
        .region2
        .clone()
        .or_else(|| args.region.clone())
        .or_else(|| entry2.and_then(|e| e.region.clone()))
        .or_else(|| file.region.clone())
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    let account1 = account_config(
        &args.account1,
        entry1,
        args.profile1.as_deref(),
        args.role1.as_deref(),
        args.external_id.as_deref(),
        region1,
    )?;
    let account2 = account_config(
        &args.account2,
        entry2,
        args.profile2.as_deref(),
        args.role2.as_deref(),
        args.external_id.as_deref(),
        region2,
    )?;

    let mut config = RunConfig::new(account1, account2);
    config.services = if args.services.is_empty() {
        file.services.clone()
    } else {
        Some(args.services.clone())
    };
    config.parallel = !args.sequential && file.parallel.unwrap_or(true);
    config.max_workers = args
        .jobs
        .map(usize::from)
        .or(file.max_workers)
        .unwrap_or(DEFAULT_MAX_WORKERS);
    config.comparison = file.comparison_settings();

    Ok(config)
}

fn account_config(
    account_id: &str,
    entry: Option<&AccountEntry>,
    profile: Option<&str>,
    role_arn: Option<&str>,
    external_id: Option<&str>,
    region: String,
) -> Result<AccountConfig> {
    let mut account = AccountConfig::new(account_id)?.with_region(region);

    if let Some(profile) = profile.or_else(|| entry.and_then(|e| e.profile.as_deref())) {
        account = account.with_profile(profile);
    }

    if let Some(role_arn) = role_arn.or_else(|| entry.and_then(|e| e.role_arn.as_deref())) {
        let external_id = external_id
            .or_else(|| entry.and_then(|e| e.external_id.as_deref()))
            .map(String::from);
        account = account.with_role(role_arn, external_id);
    }

    Ok(account)
}

/// Snapshot directories per slot; accounts without one fall back to their profile.
fn build_sessions(
    args: &CompareArgs,
    file: &FileConfig,
    config: &RunConfig,
) -> Result<SnapshotSessions> {
    let mut sessions = SnapshotSessions::new().with_profile_root(file.snapshot_root()?);
    for (slot, account, flag) in [
        (AccountSlot::First, &config.account1, &args.snapshot1),
        (AccountSlot::Second, &config.account2, &args.snapshot2),
    ] {
        let account_id = &account.account_id;
        match snapshot_dir(flag.as_ref(), file.account(account_id)) {
            Some(dir) => sessions.insert(slot, dir),
            None if account.profile.is_some() => {}
            None => anyhow::bail!(
                "No snapshot for account {account_id}: pass --snapshot{slot} or --profile{slot}, \
                 or set accounts.\"{account_id}\".snapshot in the config file"
            ),
        }
    }
    Ok(sessions)
}

fn snapshot_dir(flag: Option<&PathBuf>, entry: Option<&AccountEntry>) -> Option<PathBuf> {
    flag.cloned()
        .or_else(|| entry.and_then(|e| e.snapshot.as_deref()).map(expand_path))
}

type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Sends panic messages to the debug log until dropped.
///
/// Worker panics are caught by the engine and recorded in the report.
struct QuietPanics {
    previous: Option<PanicHook>,
}

impl QuietPanics {
    fn install() -> Self {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(|info| log::debug!("Caught panic: {info}")));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for QuietPanics {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take()
            && !std::thread::panicking()
        {
            panic::set_hook(previous);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;
    use serde_json::Value;
    use tempfile::TempDir;

    fn parse(extra: &[&str]) -> CompareArgs {
        let mut argv = vec![
            "acctdiff",
            "compare",
            "--account1",
            "111111111111",
            "--account2",
            "222222222222",
        ];
        argv.extend_from_slice(extra);
        let Command::Compare(args) = Cli::try_parse_from(argv).unwrap().command else {
            panic!("expected compare");
        };
        args
    }

    fn file_config(toml: &str) -> FileConfig {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_flags_override_file() {
        let file = file_config(
            r#"
services = ["s3"]
max_workers = 3
parallel = true
region = "eu-west-1"

[accounts.222222222222]
region = "eu-central-1"
profile = "staging"
role_arn = "arn:aws:iam::222222222222:role/Audit"
external_id = "ext"
"#,
        );

        let config = build_run_config(&parse(&[]), &file).unwrap();
        assert_eq!(config.services, Some(vec!["s3".to_string()]));
        assert_eq!(config.max_workers, 3);
        assert!(config.parallel);
        assert_eq!(config.account1.region, "eu-west-1");
        assert_eq!(config.account2.region, "eu-central-1");
        assert_eq!(config.account2.profile.as_deref(), Some("staging"));
        assert_eq!(config.account2.external_id.as_deref(), Some("ext"));
        assert!(config.account1.role_arn.is_none());

        let args = parse(&[
            "--services",
            "sqs,sns",
            "--jobs",
            "7",
            "--sequential",
            "--region",
            "us-west-2",
            "--profile2",
            "other",
        ]);
        let config = build_run_config(&args, &file).unwrap();
        assert_eq!(
            config.services,
            Some(vec!["sqs".to_string(), "sns".to_string()])
        );
        assert_eq!(config.max_workers, 7);
        assert!(!config.parallel);
        assert_eq!(config.account1.region, "us-west-2");
        assert_eq!(config.account2.region, "us-west-2");
        assert_eq!(config.account2.profile.as_deref(), Some("other"));
    }

    #[test]
    fn test_defaults_without_file() {
        let config = build_run_config(&parse(&[]), &FileConfig::default()).unwrap();
        assert!(config.services.is_none());
        assert_eq!(config.max_workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.account1.region, DEFAULT_REGION);
        assert_eq!(config.account2.region, DEFAULT_REGION);
    }

    #[test]
    fn test_invalid_account_id() {
        let Command::Compare(args) = Cli::try_parse_from([
            "acctdiff",
            "compare",
            "--account1",
            "12345",
            "--account2",
            "222222222222",
        ])
        .unwrap()
        .command
        else {
            panic!("expected compare");
        };
        assert!(build_run_config(&args, &FileConfig::default()).is_err());
    }

    #[test]
    fn test_missing_snapshot_is_reported() {
        let args = parse(&[]);
        let file = FileConfig::default();
        let config = build_run_config(&args, &file).unwrap();
        let err = build_sessions(&args, &file, &config).unwrap_err();
        assert!(err.to_string().contains("--snapshot1"));

        // a profile stands in for a snapshot directory
        let args = parse(&["--profile1", "prod", "--profile2", "staging"]);
        let config = build_run_config(&args, &file).unwrap();
        assert!(build_sessions(&args, &file, &config).is_ok());
    }

    /// Two sqs snapshots: a changed visibility timeout and one extra queue
    fn sqs_snapshots(dir: &TempDir) -> (PathBuf, PathBuf) {
        let snap1 = dir.path().join("prod");
        let snap2 = dir.path().join("staging");
        fs::create_dir_all(&snap1).unwrap();
        fs::create_dir_all(&snap2).unwrap();
        fs::write(
            snap1.join("sqs.json"),
            r#"{"queues": [{"queue_name": "orders", "visibility_timeout": 30,
                "queue_url": "https://sqs/111111111111/orders"}]}"#,
        )
        .unwrap();
        fs::write(
            snap2.join("sqs.json"),
            r#"{"queues": [
                {"queue_name": "orders", "visibility_timeout": 60,
                 "queue_url": "https://sqs/222222222222/orders"},
                {"queue_name": "extra"}
            ]}"#,
        )
        .unwrap();
        (snap1, snap2)
    }

    fn quiet() -> Context {
        Context {
            verbose: 0,
            quiet: true,
        }
    }

    #[test]
    fn test_quiet_panics_restores_hook() {
        {
            let _quiet = QuietPanics::install();
            assert!(panic::catch_unwind(|| panic!("isolated")).is_err());
        }
        assert!(panic::catch_unwind(|| panic!("after restore")).is_err());
    }

    #[test]
    fn test_same_account_compares_both_snapshots() {
        let dir = TempDir::new().unwrap();
        let (snap1, snap2) = sqs_snapshots(&dir);
        let config_file = dir.path().join("config.toml");
        fs::write(&config_file, "").unwrap();
        let output = dir.path().join("report.json");

        let Command::Compare(args) = Cli::try_parse_from([
            "acctdiff",
            "compare",
            "--account1",
            "111111111111",
            "--account2",
            "111111111111",
            "--snapshot1",
            snap1.to_str().unwrap(),
            "--snapshot2",
            snap2.to_str().unwrap(),
            "--services",
            "sqs",
            "--format",
            "json",
            "--config",
            config_file.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap()
        .command
        else {
            panic!("expected compare");
        };
        run(&quiet(), args).unwrap();

        let report: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["account1_id"], report["account2_id"]);
        assert_eq!(report["summary"]["total_changes"], 2);
    }

    #[test]
    fn test_compare_snapshots_to_json() {
        let dir = TempDir::new().unwrap();
        let (snap1, snap2) = sqs_snapshots(&dir);

        let config_file = dir.path().join("config.toml");
        fs::write(&config_file, "").unwrap();
        let output = dir.path().join("report.json");

        let args = parse(&[
            "--snapshot1",
            snap1.to_str().unwrap(),
            "--snapshot2",
            snap2.to_str().unwrap(),
            "--services",
            "sqs,s3",
            "--format",
            "json",
            "--config",
            config_file.to_str().unwrap(),
            "--output",
            output.to_str().unwrap(),
        ]);
        run(&quiet(), args).unwrap();

        let report: Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["summary"]["total_services_compared"], 2);
        assert_eq!(report["summary"]["total_changes"], 2);
        assert_eq!(report["summary"]["changes_by_severity"]["high"], 1);
        assert_eq!(report["summary"]["changes_by_severity"]["medium"], 1);

        let sqs = report["results"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["service_name"] == "sqs")
            .unwrap();
        let modified = &sqs["resource_comparisons"]["queues"]["modified"][0];
        assert_eq!(modified["resource_id"], "orders");
        assert_eq!(modified["field_path"], "visibility_timeout");
    }
}
