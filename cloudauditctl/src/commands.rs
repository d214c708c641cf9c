use std::{path::Path, sync::Arc, time::Duration};

use anyhow::{Context, Result, anyhow, bail};
use cloudaudit_config::{ConfigLoad, ConfigLoader};
use cloudaudit_core::client::{
    AuditApi, BatchScheduler, ClientRunStatus, DEFAULT_PACING, HttpAuditApi,
    PollerSettings, StatusPoller,
};
use cloudaudit_model::{CategoryId, JobId, ProjectRef};
use tracing::{debug, info};

use crate::{
    cli::{Cli, Command, RunArgs, Selection},
    output,
};

/// Poller defaults taken from configuration, before flag overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClientDefaults {
    poller: PollerSettings,
    pacing: Duration,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            poller: PollerSettings::default(),
            pacing: DEFAULT_PACING,
        }
    }
}

pub async fn execute(cli: Cli) -> Result<()> {
    let http = reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;
    let mut api = HttpAuditApi::new(http, cli.server.clone());
    if let Some(session) = &cli.session {
        api = api.with_session(session.as_str());
    }

    match cli.command {
        Command::Run(args) => {
            let defaults = client_defaults(cli.config.as_deref());
            run(api, &args, defaults).await
        }
        Command::Status { job_id } => {
            let job = parse_job(&job_id)?;
            let response = api.status(job).await?;
            print!("{}", output::render_status(&response));
            Ok(())
        }
        Command::Categories => {
            let categories = api.categories().await?;
            print!("{}", output::render_categories(&categories));
            Ok(())
        }
        Command::Report { job_id, format } => {
            let job = parse_job(&job_id)?;
            let report = api.report(job, format.into()).await?;
            println!("{report}");
            Ok(())
        }
    }
}

fn parse_job(raw: &str) -> Result<JobId> {
    JobId::parse(raw).ok_or_else(|| anyhow!("'{raw}' is not a valid job id"))
}

fn client_defaults(config_path: Option<&Path>) -> ClientDefaults {
    let mut loader = ConfigLoader::new();
    if let Some(path) = config_path {
        loader = loader.with_config_path(path);
    }

    match loader.load() {
        Ok(ConfigLoad { config, warnings }) => {
            for warning in warnings.iter() {
                debug!(message = %warning.message, "configuration warning");
            }
            ClientDefaults {
                poller: PollerSettings {
                    interval: config.poller.interval,
                    timeout: config.poller.timeout,
                },
                pacing: config.poller.pacing,
            }
        }
        Err(err) => {
            debug!(error = %err, "configuration unavailable; using poller defaults");
            ClientDefaults::default()
        }
    }
}

fn resolve_settings(
    args: &RunArgs,
    defaults: ClientDefaults,
) -> Result<(PollerSettings, Duration)> {
    let poller = PollerSettings {
        interval: args.interval.unwrap_or(defaults.poller.interval),
        timeout: args.timeout.unwrap_or(defaults.poller.timeout),
    };
    if poller.interval.is_zero() {
        bail!("--interval must be greater than zero");
    }
    if poller.timeout.is_zero() {
        bail!("--timeout must be greater than zero");
    }
    if poller.interval > poller.timeout {
        bail!(
            "poll interval ({}) exceeds the timeout ({})",
            humantime::format_duration(poller.interval),
            humantime::format_duration(poller.timeout)
        );
    }
    Ok((poller, args.pacing.unwrap_or(defaults.pacing)))
}

async fn run(
    api: HttpAuditApi,
    args: &RunArgs,
    defaults: ClientDefaults,
) -> Result<()> {
    let project = ProjectRef::new(args.project.as_str())
        .ok_or_else(|| anyhow!("--project must not be blank"))?;
    let selection = args.selection()?;
    let (poller_settings, pacing) = resolve_settings(args, defaults)?;

    info!(
        server = %api.base(),
        %project,
        interval = ?poller_settings.interval,
        timeout = ?poller_settings.timeout,
        "starting audit batch"
    );

    let api: Arc<dyn AuditApi> = Arc::new(api);
    let poller = StatusPoller::new(Arc::clone(&api), poller_settings);
    let scheduler = BatchScheduler::new(project, api, poller).with_pacing(pacing);

    let stopper = scheduler.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            stopper.stop();
        }
    });

    let report = match &selection {
        Selection::All => scheduler.run_all(&CategoryId::ALL).await,
        Selection::Selected(selected) => scheduler.run_selected(selected).await,
    };
    ctrl_c.abort();

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .context("failed to encode batch report")?
        );
    } else {
        print!("{}", output::render_batch(&report));
    }

    if !report.all_completed() {
        bail!(
            "{} of {} categories did not complete",
            report.runs.len() - report.count(ClientRunStatus::Completed),
            report.runs.len()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn flags_override_configured_poller_settings() {
        let cli = Cli::try_parse_from([
            "cloudauditctl",
            "run",
            "-p",
            "proj",
            "--all",
            "--timeout",
            "30s",
            "--pacing",
            "0s",
        ])
        .expect("valid arguments");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let defaults = ClientDefaults {
            poller: PollerSettings {
                interval: Duration::from_secs(3),
                timeout: Duration::from_secs(600),
            },
            pacing: Duration::from_secs(2),
        };
        let (poller, pacing) =
            resolve_settings(&args, defaults).expect("valid settings");
        assert_eq!(poller.interval, Duration::from_secs(3));
        assert_eq!(poller.timeout, Duration::from_secs(30));
        assert_eq!(pacing, Duration::ZERO);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cli = Cli::try_parse_from([
            "cloudauditctl",
            "run",
            "-p",
            "proj",
            "--all",
            "--interval",
            "0s",
        ])
        .expect("valid arguments");
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };

        let err = resolve_settings(&args, ClientDefaults::default())
            .expect_err("zero interval");
        assert!(err.to_string().contains("--interval"));
    }

    #[test]
    fn job_ids_are_validated_locally() {
        assert!(parse_job("not-a-uuid").is_err());
        assert!(parse_job(&JobId::new().to_string()).is_ok());
    }
}
