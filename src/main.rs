//! `dockvisor` command line.
//!
//! ```text
//! dockvisor run --image httpd -p 127.0.0.1:9200:80
//! dockvisor run --options web.json
//! dockvisor launch-container-subprocess <REQUEST_JSON>    (internal)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use dockvisor::{
    CHILD_COMMAND, ContainerSupervisor, LaunchOptions, LogWriter, SupervisorConfig, entrypoint,
    wait_for_shutdown_signal,
};

#[derive(Parser, Debug)]
#[command(name = "dockvisor", version, about = "Run a container that stops when its supervisor does")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Launch a container and supervise it until it exits or we are told to stop
    Run(RunArgs),

    /// Guardian child entry point (spawned by `run`)
    #[command(name = CHILD_COMMAND, hide = true)]
    Guardian {
        /// Serialized launch request
        request: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Launch options as JSON (`-` reads stdin)
    #[arg(long, value_name = "FILE", conflicts_with = "image")]
    options: Option<PathBuf>,

    /// Image to run
    #[arg(long, required_unless_present = "options")]
    image: Option<String>,

    /// Container name
    #[arg(long)]
    name: Option<String>,

    /// Publish a container port
    #[arg(short = 'p', long, value_name = "[IP:]HOST:CONTAINER[/PROTO]", value_parser = parse_publish)]
    publish: Vec<Publish>,

    /// Set an environment variable
    #[arg(short = 'e', long, value_name = "KEY=VALUE")]
    env: Vec<String>,

    /// Guardian watchdog period in milliseconds
    #[arg(long, default_value_t = 500)]
    watchdog_ms: u64,

    /// Beacon interval in milliseconds (0 = half the watchdog period)
    #[arg(long, default_value_t = 0)]
    beacon_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Publish {
    host_ip: String,
    host_port: u16,
    container_port: String,
}

fn parse_publish(s: &str) -> Result<Publish, String> {
    let (mapping, proto) = s.split_once('/').unwrap_or((s, "tcp"));
    let parts: Vec<&str> = mapping.split(':').collect();
    let (host_ip, host_port, container_port) = match parts.as_slice() {
        [host, container] => ("0.0.0.0", *host, *container),
        [ip, host, container] => (*ip, *host, *container),
        _ => return Err(format!("expected [IP:]HOST:CONTAINER[/PROTO], got {s:?}")),
    };
    let host_port = host_port
        .parse::<u16>()
        .map_err(|e| format!("invalid host port {host_port:?}: {e}"))?;
    container_port
        .parse::<u16>()
        .map_err(|e| format!("invalid container port {container_port:?}: {e}"))?;
    Ok(Publish {
        host_ip: host_ip.to_string(),
        host_port,
        container_port: format!("{container_port}/{proto}"),
    })
}

impl RunArgs {
    fn launch_options(&self) -> Result<LaunchOptions> {
        let mut options = match (&self.options, &self.image) {
            (Some(path), _) => load_options(path)?,
            (None, Some(image)) => LaunchOptions::new(image),
            (None, None) => bail!("either --options or --image is required"),
        };
        if let Some(name) = &self.name {
            options = options.with_name(name);
        }
        for p in &self.publish {
            options = options.publish(&p.host_ip, p.host_port, &p.container_port);
        }
        for entry in &self.env {
            options = options.env(entry);
        }
        Ok(options)
    }

    fn config(&self) -> SupervisorConfig {
        SupervisorConfig {
            watchdog_period: Duration::from_millis(self.watchdog_ms),
            beacon_interval: Duration::from_millis(self.beacon_ms),
            ..SupervisorConfig::default()
        }
    }
}

fn load_options(path: &Path) -> Result<LaunchOptions> {
    let raw = if path.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read options from stdin")?
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read options from {}", path.display()))?
    };
    serde_json::from_str(&raw).context("invalid launch options")
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(args: RunArgs) -> Result<()> {
    let options = args.launch_options()?;
    let supervisor = ContainerSupervisor::builder(args.config())
        .with_subscribers(vec![Arc::new(LogWriter)])
        .build();
    let handle = supervisor
        .launch(options)
        .context("failed to launch guardian")?;

    tokio::select! {
        _ = handle.wait_until_stopped() => {}
        res = wait_for_shutdown_signal() => {
            res.context("failed to listen for termination signals")?;
            info!(container = handle.label(), "termination requested");
            handle.kill().await.context("failed to stop container")?;
            handle.wait_until_stopped().await;
        }
    }
    guardian_outcome(handle.exit_code())
}

/// Maps the guardian's exit to ours: only a clean stop is success.
fn guardian_outcome(code: Option<i32>) -> Result<()> {
    match code {
        Some(0) => Ok(()),
        Some(code) => bail!("guardian exited with status {code}; the container did not run to a clean stop"),
        None => bail!("guardian was terminated by a signal"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Guardian { request } => {
            let code = entrypoint(&request).await;
            // Exit here: a pending read on tokio's stdin would block runtime shutdown.
            std::process::exit(code);
        }
    }
}
