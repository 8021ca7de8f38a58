//! CLI argument parsing for crashflag

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crashflag_core::config::CrashConfig;
use crashflag_core::FatalSignal;

/// crashflag - Native crash detection and supervision
#[derive(Parser, Debug)]
#[command(name = "crashflag")]
#[command(about = "Record fatal native signals and supervise crashing processes")]
#[command(version)]
pub struct Cli {
    /// Config file path (default: platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for the crash marker (overrides config)
    #[arg(long, global = true)]
    pub marker_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a program and relaunch it when it dies by signal
    Supervise {
        /// Max restarts after signal deaths (overrides config)
        #[arg(long)]
        max_restarts: Option<u32>,

        /// Delay before each restart in milliseconds (overrides config)
        #[arg(long)]
        restart_delay_ms: Option<u64>,

        /// Program to run
        #[arg(required = true)]
        program: PathBuf,

        /// Arguments for the program
        #[arg(last = true)]
        args: Vec<String>,
    },

    /// Show the crash recorded by the last supervised run
    LastCrash {
        /// Remove the marker after printing it
        #[arg(long)]
        clear: bool,
    },

    /// Arm the handler in this process and print the flag
    Probe {
        /// Signal to record (repeatable, overrides config)
        #[arg(long = "signal", value_name = "SIGNAL")]
        signals: Vec<FatalSignal>,

        /// Fault to inject after arming (needs the fault-injection feature)
        #[arg(long, value_enum)]
        inject: Option<InjectKind>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum InjectKind {
    Raise,
    InvalidAccess,
}

#[cfg(all(unix, feature = "fault-injection"))]
impl From<InjectKind> for crashflag_core::Fault {
    fn from(kind: InjectKind) -> Self {
        match kind {
            InjectKind::Raise => crashflag_core::Fault::Raise,
            InjectKind::InvalidAccess => crashflag_core::Fault::InvalidAccess,
        }
    }
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }

    /// Apply global overrides to a loaded config
    pub fn apply_overrides(&self, config: &mut CrashConfig) {
        if let Some(ref dir) = self.marker_dir {
            config.marker_dir = Some(dir.clone());
        }
        match self.command {
            Command::Supervise {
                max_restarts,
                restart_delay_ms,
                ..
            } => {
                if let Some(n) = max_restarts {
                    config.watchdog.max_restarts = n;
                }
                if let Some(ms) = restart_delay_ms {
                    config.watchdog.restart_delay_ms = ms;
                }
            }
            Command::Probe { ref signals, .. } if !signals.is_empty() => {
                config.handler.signals = signals.clone();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supervise_args() {
        let cli = Cli::parse_from([
            "crashflag",
            "supervise",
            "--max-restarts",
            "2",
            "/bin/app",
            "--",
            "--flag",
            "value",
        ]);
        match cli.command {
            Command::Supervise {
                max_restarts,
                restart_delay_ms,
                ref program,
                ref args,
            } => {
                assert_eq!(max_restarts, Some(2));
                assert_eq!(restart_delay_ms, None);
                assert_eq!(program, &PathBuf::from("/bin/app"));
                assert_eq!(args, &["--flag", "value"]);
            }
            _ => panic!("expected supervise"),
        }
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::parse_from([
            "crashflag",
            "--marker-dir",
            "/tmp/markers",
            "supervise",
            "--restart-delay-ms",
            "0",
            "/bin/app",
        ]);
        let mut config = CrashConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.marker_dir, Some(PathBuf::from("/tmp/markers")));
        assert_eq!(config.watchdog.restart_delay_ms, 0);
        assert_eq!(config.watchdog.max_restarts, 5);
    }

    #[test]
    fn test_probe_signals() {
        let cli = Cli::parse_from(["crashflag", "probe", "--signal", "SIGBUS", "--signal", "segv"]);
        let mut config = CrashConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.handler.signals, vec![FatalSignal::Bus, FatalSignal::Segv]);
    }

    #[test]
    fn test_probe_rejects_unknown_signal() {
        let result = Cli::try_parse_from(["crashflag", "probe", "--signal", "SIGINT"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_last_crash() {
        let cli = Cli::parse_from(["crashflag", "last-crash", "--clear"]);
        assert!(matches!(cli.command, Command::LastCrash { clear: true }));
    }
}
