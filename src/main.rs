//! crashflag - Native crash detection and supervision
//!
//! Entry point for the command-line tool: supervises a process with the
//! watchdog, inspects crash markers, and probes the signal flag.

mod cli;

use std::time::Duration;

use anyhow::Context;

use crashflag_core::config::{load_config, load_config_from, CrashConfig};

use crate::cli::{Cli, Command};

fn main() {
    let cli = Cli::parse_args();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let mut config = match cli.config {
        Some(ref path) => load_config_from(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_config().unwrap_or_else(|e| {
            log::warn!("Using default config: {}", e);
            CrashConfig::default()
        }),
    };
    cli.apply_overrides(&mut config);

    match cli.command {
        Command::Supervise {
            ref program,
            ref args,
            ..
        } => supervise(&config, program, args),
        Command::LastCrash { clear } => last_crash(&config, clear),
        Command::Probe { .. } => probe(&config, &cli),
    }
}

#[cfg(unix)]
fn supervise(
    config: &CrashConfig,
    program: &std::path::Path,
    args: &[String],
) -> anyhow::Result<i32> {
    let marker_path = config.marker_path();
    log::info!(
        "Supervising {} (max restarts: {}, marker: {})",
        program.display(),
        config.watchdog.max_restarts,
        marker_path.display()
    );
    let code = crashflag_core::run_watchdog(program, args, &config.watchdog, &marker_path)?;
    Ok(code)
}

#[cfg(unix)]
fn last_crash(config: &CrashConfig, clear: bool) -> anyhow::Result<i32> {
    let path = config.marker_path();
    let marker = if clear {
        crashflag_core::take_crash_marker(&path)?
    } else {
        crashflag_core::read_crash_marker(&path)?
    };

    match marker {
        Some(marker) => println!("{}", marker),
        None => println!("No crash recorded"),
    }
    Ok(0)
}

#[cfg(unix)]
fn probe(config: &CrashConfig, cli: &Cli) -> anyhow::Result<i32> {
    // A previous run of this process may have left a marker behind
    let marker_path = config.marker_path();
    if let Some(previous) = crashflag_core::take_crash_marker(&marker_path)? {
        println!("Previous run: {}", previous);
    }

    crashflag_core::install_for(&config.handler.signals)?;

    let monitor_marker = marker_path.clone();
    let monitor = crashflag_core::FlagMonitor::watch_process(
        Duration::from_millis(config.monitor.poll_interval_ms),
        move |signal| {
            let marker = crashflag_core::CrashMarker::for_current_process(signal);
            if let Err(e) = crashflag_core::write_crash_marker(&monitor_marker, &marker) {
                log::error!("Failed to write crash marker: {}", e);
            }
        },
    )?;

    inject_requested_fault(cli)?;

    if crashflag_core::CRASH_FLAG.is_tripped() {
        // Give the monitor a chance to persist the marker
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while !monitor.is_finished() && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
    }
    monitor.stop();

    let status = crashflag_core::signal_status();
    println!("state: {:?}", crashflag_core::handler_state());
    println!(
        "signal status: {} ({})",
        status,
        crashflag_core::describe_signal(status)
    );
    Ok(0)
}

#[cfg(all(unix, feature = "fault-injection"))]
fn inject_requested_fault(cli: &Cli) -> anyhow::Result<()> {
    if let Command::Probe {
        inject: Some(kind),
        ..
    } = cli.command
    {
        crashflag_core::inject_fault(kind.into())?;
    }
    Ok(())
}

#[cfg(all(unix, not(feature = "fault-injection")))]
fn inject_requested_fault(cli: &Cli) -> anyhow::Result<()> {
    if let Command::Probe {
        inject: Some(_), ..
    } = cli.command
    {
        anyhow::bail!("fault injection is not available in this build");
    }
    Ok(())
}

#[cfg(not(unix))]
fn supervise(_: &CrashConfig, _: &std::path::Path, _: &[String]) -> anyhow::Result<i32> {
    anyhow::bail!("supervision requires a Unix platform")
}

#[cfg(not(unix))]
fn last_crash(_: &CrashConfig, _: bool) -> anyhow::Result<i32> {
    anyhow::bail!("crash markers require a Unix platform")
}

#[cfg(not(unix))]
fn probe(config: &CrashConfig, _: &Cli) -> anyhow::Result<i32> {
    crashflag_core::install_for(&config.handler.signals)?;
    println!("signal status: {}", crashflag_core::signal_status());
    Ok(0)
}
