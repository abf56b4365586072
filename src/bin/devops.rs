use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Args as ClapArgs, Parser, Subcommand};
use devops_tools::{
    Devops, Tools,
    config::Config,
    grafana::{ClientOptions, Options},
    jira::{AuthOptions, GetQueryOptions, SearchOptions},
    prometheus::{ApiClient, PromMetric, Prometheus, PushMetrics, QueryOptions, Range},
    util,
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(name = "devops", about = "Prometheus, Grafana, Jira and SSH from the command line")]
struct Args {
    /// Config file (default: ~/.config/devops-tools/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity, repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Push gauge samples to the PushGateway
    Push(PushArgs),

    /// Instant query against Prometheus
    Query {
        query: String,

        /// Evaluation time in unix seconds (default: now)
        #[arg(long)]
        time: Option<i64>,
    },

    /// Range query against Prometheus
    QueryRange {
        query: String,

        /// Window length in minutes, ending now
        #[arg(long, default_value_t = 5)]
        minutes: i64,

        /// Resolution step in seconds
        #[arg(long, default_value_t = 60)]
        step: u64,
    },

    /// Open-source Grafana
    #[command(subcommand)]
    Grafana(GrafanaCommand),

    /// Alibaba Cloud hosted Grafana
    #[command(subcommand)]
    AliGrafana(AliGrafanaCommand),

    /// Jira issues
    #[command(subcommand)]
    Jira(JiraCommand),

    /// Remote commands
    #[command(subcommand)]
    Ssh(SshCommand),
}

#[derive(Debug, Clone, ClapArgs)]
struct PushArgs {
    /// Metric and job name
    #[arg(long)]
    job: String,

    /// Label names, comma separated
    #[arg(long, value_delimiter = ',')]
    labels: Vec<String>,

    /// `value1,value2=42.5`, label values in the order of --labels
    #[arg(long = "sample", value_parser = parse_sample)]
    samples: Vec<PromMetric>,

    /// Add to the job's metrics instead of replacing them
    #[arg(long)]
    add: bool,
}

#[derive(Debug, Clone, Subcommand)]
enum GrafanaCommand {
    /// POST a `/api/ds/query` body, inline or `@file`
    Query {
        body: String,

        #[arg(long)]
        addr: Option<String>,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum AliGrafanaCommand {
    Query {
        query: String,

        #[arg(long)]
        addr: Option<String>,

        /// Evaluation time in unix seconds (default: now)
        #[arg(long)]
        time: Option<i64>,
    },
    QueryRange {
        query: String,

        #[arg(long)]
        addr: Option<String>,

        /// Start in unix seconds
        #[arg(long)]
        from: i64,

        /// End in unix seconds
        #[arg(long)]
        to: i64,

        #[arg(long, default_value_t = 60)]
        step: i64,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum JiraCommand {
    Get {
        issue: String,

        /// Comma separated field names
        #[arg(long)]
        fields: Option<String>,

        #[arg(long)]
        expand: Option<String>,
    },
    Search {
        jql: String,

        #[arg(long)]
        start_at: Option<u32>,

        #[arg(long)]
        max_results: Option<u32>,

        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },
    Delete {
        issue: String,
    },
}

#[derive(Debug, Clone, Subcommand)]
enum SshCommand {
    /// Run a command; the password comes from DEVOPS_SSH_PASSWORD unless a key
    /// file is configured
    Exec {
        cmd: String,

        /// `host:port`
        #[arg(long)]
        addr: Option<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        key_file: Option<PathBuf>,
    },
}

fn parse_sample(value: &str) -> Result<PromMetric, String> {
    let (labels, data) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected `labels=value`, got `{value}`"))?;

    let data = data
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid sample value `{data}`: {e}"))?;

    let values = if labels.is_empty() {
        vec![]
    } else {
        labels.split(',').map(|v| v.trim().to_string()).collect()
    };

    Ok(PromMetric { values, data })
}

fn init(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let filter = filter::Targets::new().with_targets(vec![("devops_tools", level), ("devops", level)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    dotenv::dotenv().ok();

    let mut config = Config::load(args.config.as_deref())?;
    config.apply_env();

    let devops = Devops::with_grafana_options(ClientOptions::from(&config.grafana));

    match args.command {
        Command::Push(push) => run_push(&devops, &config, push).await,
        Command::Query { query, time } => {
            let client = ApiClient::new(&config.prometheus.address)?;
            let time = time.map(from_unix).transpose()?;
            let value = devops
                .prometheus()
                .query(&client, &query, time, &query_options(&config))
                .await?;
            print_json(&value)
        }
        Command::QueryRange {
            query,
            minutes,
            step,
        } => {
            let client = ApiClient::new(&config.prometheus.address)?;
            let range = query_window(Utc::now(), minutes, step)?;
            let series = devops
                .prometheus()
                .query_range(&client, &query, &range, &query_options(&config))
                .await?;
            print_json(&series)
        }
        Command::Grafana(GrafanaCommand::Query { body, addr }) => {
            let addr = grafana_address(addr, &config)?;
            let body = match body.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read query body: {path}"))?,
                None => body,
            };
            let response = devops
                .grafana()?
                .query(&addr, &grafana_token(&config), &body, Options::default())
                .await?;
            print_raw(&response)
        }
        Command::AliGrafana(command) => run_ali_grafana(&devops, &config, command).await,
        Command::Jira(command) => run_jira(&devops, &config, command).await,
        Command::Ssh(SshCommand::Exec {
            cmd,
            addr,
            user,
            key_file,
        }) => {
            let addr = addr
                .or_else(|| config.ssh.address.clone())
                .context("no ssh address, pass --addr or set [ssh] address")?;
            let user = user
                .or_else(|| config.ssh.user.clone())
                .context("no ssh user, pass --user or set [ssh] user")?;

            let mut ssh = devops.ssh(&addr, &user);
            if let Some(secs) = config.ssh.timeout_secs {
                ssh = ssh.with_timeout(Duration::from_secs(secs));
            }

            let output = match key_file.or_else(|| config.ssh.key_file.clone()) {
                Some(key_file) => ssh.execute_with_key_file(key_file, &cmd).await?,
                None => {
                    let password = util::get_env(util::SSH_PASSWORD).with_context(|| {
                        format!("no key file configured and {} is not set", util::SSH_PASSWORD)
                    })?;
                    ssh.execute_with_password(&password, &cmd).await?
                }
            };
            print_raw(&output)
        }
    }
}

async fn run_push(devops: &Devops, config: &Config, args: PushArgs) -> anyhow::Result<()> {
    if let Some(sample) = args.samples.iter().find(|s| s.values.len() != args.labels.len()) {
        bail!(
            "sample {:?} has {} label values, expected {}",
            sample.values,
            sample.values.len(),
            args.labels.len()
        );
    }

    let metrics = PushMetrics {
        name: args.job,
        labels: args.labels,
        metrics: args.samples,
    };
    let gateway = &config.prometheus.pushgateway;

    if args.add {
        Prometheus::default().add(&metrics, gateway).await?;
    } else {
        devops.prometheus().push(&metrics, gateway).await?;
    }
    debug!("pushed {} samples for job {}", metrics.metrics.len(), metrics.name);
    Ok(())
}

async fn run_ali_grafana(
    devops: &Devops,
    config: &Config,
    command: AliGrafanaCommand,
) -> anyhow::Result<()> {
    let client = devops.ali_grafana()?;
    let token = grafana_token(config);

    let response = match command {
        AliGrafanaCommand::Query { query, addr, time } => {
            let options = Options {
                to: time.unwrap_or_else(|| Utc::now().timestamp()),
                ..Options::default()
            };
            client
                .query(&grafana_address(addr, config)?, &token, &query, options)
                .await?
        }
        AliGrafanaCommand::QueryRange {
            query,
            addr,
            from,
            to,
            step,
        } => {
            let options = Options { from, to, step };
            client
                .query_range(&grafana_address(addr, config)?, &token, &query, options)
                .await?
        }
    };

    print_raw(&response)
}

async fn run_jira(devops: &Devops, config: &Config, command: JiraCommand) -> anyhow::Result<()> {
    let addr = config
        .jira
        .address
        .as_deref()
        .context("no jira address, set [jira] address")?;
    let jira = devops.jira(addr, AuthOptions::from(&config.jira))?;

    match command {
        JiraCommand::Get {
            issue,
            fields,
            expand,
        } => {
            let options = GetQueryOptions {
                fields,
                expand,
                ..GetQueryOptions::default()
            };
            let (issue, _) = jira.get(&issue, &options).await?;
            print_json(&issue)
        }
        JiraCommand::Search {
            jql,
            start_at,
            max_results,
            fields,
        } => {
            let options = SearchOptions {
                start_at,
                max_results,
                fields,
                ..SearchOptions::default()
            };
            let (issues, response) = jira.search(&jql, &options).await?;
            print_json(&json!({
                "startAt": response.start_at,
                "maxResults": response.max_results,
                "total": response.total,
                "issues": issues,
            }))
        }
        JiraCommand::Delete { issue } => {
            let response = jira.delete(&issue).await?;
            print_json(&json!({ "key": issue, "status": response.status.as_u16() }))
        }
    }
}

fn query_options(config: &Config) -> QueryOptions {
    match config.prometheus.timeout_secs {
        Some(secs) => QueryOptions::default().with_timeout(Duration::from_secs(secs)),
        None => QueryOptions::default(),
    }
}

/// The last `minutes` before `end`.
fn query_window(end: DateTime<Utc>, minutes: i64, step: u64) -> anyhow::Result<Range> {
    if minutes < 0 {
        bail!("--minutes must not be negative, got {minutes}");
    }
    let length = chrono::TimeDelta::try_minutes(minutes)
        .with_context(|| format!("--minutes out of range: {minutes}"))?;

    Range::ending_at(end, length, Duration::from_secs(step))
        .with_context(|| format!("a window of {minutes} minutes reaches before the earliest supported time"))
}

fn grafana_address(addr: Option<String>, config: &Config) -> anyhow::Result<String> {
    addr.or_else(|| config.grafana.address.clone())
        .context("no grafana address, pass --addr or set [grafana] address")
}

fn grafana_token(config: &Config) -> String {
    config.grafana.token.clone().unwrap_or_default()
}

fn from_unix(secs: i64) -> anyhow::Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).with_context(|| format!("timestamp out of range: {secs}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_raw(body: &[u8]) -> anyhow::Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(body)?;
    stdout.flush()?;
    Ok(())
}
