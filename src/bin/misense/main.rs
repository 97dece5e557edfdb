mod args;
mod read;
mod scan;
mod show;
mod tree;

use std::{process::ExitCode, time::Duration};

use anyhow::{Context as _, Result};
use args::{Args, Mode};
use clap::Parser as _;
use macaddr::MacAddr6;
use misense::{gatt::HostCentral, lywsd03mmc::handle_hints};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("misense=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::from(0)
}

async fn run() -> Result<()> {
    let args = Args::parse();
    let timeout = Duration::from_secs(args.timeout);

    let central = HostCentral::new(handle_hints())
        .await
        .context("failed to initialize Bluetooth manager")?;

    match args.mode() {
        Mode::Scan => scan::scan(central.adapter(), timeout, args.dedup)
            .await
            .context("failed to scan for BLE devices"),
        Mode::Show => show::show(&central, &args.sensors, timeout).await,
        Mode::Read => read::read(&central, &args, timeout).await,
    }
}

/// Combines the outcome of a run with the failures of its cleanup sweep.
fn finish(result: Result<()>, failures: Vec<(MacAddr6, misense::Error)>) -> Result<()> {
    result?;

    match failures.into_iter().next() {
        Some((address, err)) => {
            Err(anyhow::Error::new(err).context(format!("failed to disconnect {address}")))
        }
        None => Ok(()),
    }
}
