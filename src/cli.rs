use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use crossdiff::Severity;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "acctdiff")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Compare the infrastructure of two cloud accounts", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two accounts and report every difference
    Compare(CompareArgs),

    /// List the services that can be compared
    ListServices,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// First account id (12 digits)
    #[arg(long = "account1", value_name = "ID")]
    pub account1: String,

    /// Second account id (12 digits)
    #[arg(long = "account2", value_name = "ID")]
    pub account2: String,

    /// Snapshot directory holding the first account's resources
    #[arg(long, value_name = "DIR")]
    pub snapshot1: Option<PathBuf>,

    /// Snapshot directory holding the second account's resources
    #[arg(long, value_name = "DIR")]
    pub snapshot2: Option<PathBuf>,

    /// Profile for the first account; opens <snapshot_root>/<PROFILE> when no snapshot is given
    #[arg(long)]
    pub profile1: Option<String>,

    /// Profile for the second account; opens <snapshot_root>/<PROFILE> when no snapshot is given
    #[arg(long)]
    pub profile2: Option<String>,

    /// Role to assume in the first account; must match the role the snapshot was exported with
    #[arg(long, value_name = "ARN")]
    pub role1: Option<String>,

    /// Role to assume in the second account; must match the role the snapshot was exported with
    #[arg(long, value_name = "ARN")]
    pub role2: Option<String>,

    /// External id used when assuming roles; checked against the snapshot's export record
    #[arg(long)]
    pub external_id: Option<String>,

    /// Region (both accounts unless --region2 is given)
    #[arg(short, long, env = "AWS_DEFAULT_REGION")]
    pub region: Option<String>,

    /// Region for the second account
    #[arg(long)]
    pub region2: Option<String>,

    /// Comma-separated services to compare (default: all)
    #[arg(short, long, value_delimiter = ',')]
    pub services: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Only show changes at or above this severity
    #[arg(long, value_enum)]
    pub min_severity: Option<SeverityArg>,

    /// Show old/new values for every modified field
    #[arg(long)]
    pub details: bool,

    /// Compare services one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Maximum number of concurrent workers (1-50)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..=50))]
    pub jobs: Option<u16>,

    /// Config file (default: ~/.config/acctdiff/config.toml)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable tables
    Table,
    /// The full report as JSON
    Json,
    /// The full report as YAML
    Yaml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityArg {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl From<SeverityArg> for Severity {
    fn from(arg: SeverityArg) -> Self {
        match arg {
            SeverityArg::Critical => Severity::Critical,
            SeverityArg::High => Severity::High,
            SeverityArg::Medium => Severity::Medium,
            SeverityArg::Low => Severity::Low,
            SeverityArg::Info => Severity::Info,
        }
    }
}
