//! `ifpulse` — live SNMP interface traffic dashboard.
//!
//! Polls interface octet counters on a fixed cadence and renders
//! per-interface rates, utilization, and sparkline history with
//! [ratatui](https://ratatui.rs). Reactive data comes from
//! `ifpulse-core`'s [`Poller`] snapshot store.
//!
//! Logs go to a file (default `/tmp/ifpulse.log`) — never stdout, which
//! would corrupt the TUI. `--discover HOST` runs the one-shot interface
//! walk instead of the dashboard and prints a YAML config skeleton.

mod app;
mod discover;
mod screens;
mod tui;
mod widgets;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use ifpulse_core::{Poller, SnmpClient};

use crate::app::App;

/// Live terminal dashboard for SNMP interface traffic.
#[derive(Parser, Debug)]
#[command(name = "ifpulse", version, about)]
struct Cli {
    /// Path to the YAML monitoring profile
    #[arg(short, long, default_value = "ifpulse.yaml", env = "IFPULSE_CONFIG")]
    config: PathBuf,

    /// Walk HOST's interface tables and print a config skeleton
    /// instead of starting the dashboard
    #[arg(long, value_name = "HOST")]
    discover: Option<String>,

    /// Community string for --discover (v1/v2c)
    #[arg(long, default_value = "public")]
    community: String,

    /// SNMP version for --discover (1, 2c, or 3 — 3 reads the
    /// credential block from the config file)
    #[arg(long, default_value = "2c")]
    version: String,

    /// Agent port for --discover
    #[arg(long, default_value_t = 161)]
    port: u16,

    /// Override the configured poll interval (e.g. "5s")
    #[arg(long, value_name = "DURATION")]
    interval: Option<humantime::Duration>,

    /// Log file path
    #[arg(long, default_value = "/tmp/ifpulse.log")]
    log_file: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// File-based tracing for dashboard mode. Returns a guard that must
/// live for the whole run so logs flush on exit.
fn setup_file_tracing(cli: &Cli) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ifpulse={lvl},ifpulse_core={lvl},ifpulse_snmp={lvl}", lvl = cli.log_level())));

    let log_dir = cli.log_file.parent().unwrap_or(std::path::Path::new("/tmp"));
    let log_filename = cli
        .log_file
        .file_name()
        .unwrap_or(std::ffi::OsStr::new("ifpulse.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    guard
}

/// Plain stderr tracing for one-shot discover mode.
fn setup_stderr_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(host) = cli.discover.clone() {
        setup_stderr_tracing(&cli);
        return discover::run(&cli.config, &host, &cli.community, &cli.version, cli.port).await;
    }

    // Install panic/error hooks BEFORE entering the terminal.
    tui::install_hooks()?;
    let _log_guard = setup_file_tracing(&cli);

    let mut config = ifpulse_config::load(&cli.config)?;
    if let Some(interval) = cli.interval {
        config.defaults.interval = interval.into();
    }

    info!(config = %cli.config.display(), "starting ifpulse");

    let client = Arc::new(SnmpClient::new(config.defaults.timeout));
    let poller = Poller::start(config, client).await;

    let mut terminal = tui::Tui::new()?;
    terminal.enter()?;

    let mut app = App::new(poller.clone());
    let result = app.run(&mut terminal).await;

    terminal.exit()?;
    poller.shutdown().await;

    result
}
