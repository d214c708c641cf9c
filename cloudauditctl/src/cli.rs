use std::{collections::BTreeSet, path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum};
use cloudaudit_model::{CategoryId, ReportFormat};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "cloudauditctl")]
#[command(about = "Drive cloud audit runs against a cloudaudit server")]
pub struct Cli {
    /// Base URL of the cloudaudit server
    #[arg(
        long,
        env = "CLOUDAUDIT_SERVER",
        default_value = "http://127.0.0.1:8080",
        global = true
    )]
    pub server: Url,

    /// Session whose stored credentials the server should use
    #[arg(long, env = "CLOUDAUDIT_SESSION", global = true)]
    pub session: Option<String>,

    /// Path to a cloudaudit.toml file for poller defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run categories one after another, waiting for each to finish
    Run(RunArgs),
    /// Show the server-side status of a job
    Status {
        /// Job id returned by a previous run
        job_id: String,
    },
    /// List the categories the server knows about
    Categories,
    /// Print the report of a completed job
    Report {
        job_id: String,

        #[arg(long, value_enum, default_value_t = ReportFormatArg::Markdown)]
        format: ReportFormatArg,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Provider project to audit
    #[arg(short, long, env = "CLOUDAUDIT_PROJECT")]
    pub project: String,

    /// Run every category
    #[arg(long, conflicts_with = "categories")]
    pub all: bool,

    /// Categories to run (repeatable or comma separated)
    #[arg(
        short,
        long = "category",
        value_delimiter = ',',
        required_unless_present = "all"
    )]
    pub categories: Vec<String>,

    /// Poll interval, e.g. "2s" (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub interval: Option<Duration>,

    /// Give up watching a job after this long, e.g. "5m" (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Delay between consecutive runs, e.g. "1s" (overrides config)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub pacing: Option<Duration>,

    /// Print the batch report as JSON
    #[arg(long)]
    pub json: bool,
}

/// The categories a run covers: all of them in catalogue order, or the
/// named ones with duplicates removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    All,
    Selected(BTreeSet<CategoryId>),
}

impl RunArgs {
    pub fn selection(&self) -> anyhow::Result<Selection> {
        if self.all {
            return Ok(Selection::All);
        }

        let selected = self
            .categories
            .iter()
            .map(|raw| raw.parse::<CategoryId>())
            .collect::<Result<BTreeSet<_>, _>>()?;
        if selected.is_empty() {
            anyhow::bail!("pass --all or at least one --category");
        }
        Ok(Selection::Selected(selected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormatArg {
    Markdown,
    Json,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(arg: ReportFormatArg) -> Self {
        match arg {
            ReportFormatArg::Markdown => ReportFormat::Markdown,
            ReportFormatArg::Json => ReportFormat::Json,
        }
    }
}
