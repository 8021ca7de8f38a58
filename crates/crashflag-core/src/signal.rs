//! Fatal signal identification

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(unix)]
mod raw {
    pub const SEGV: i32 = libc::SIGSEGV;
    pub const BUS: i32 = libc::SIGBUS;
    pub const ILL: i32 = libc::SIGILL;
    pub const FPE: i32 = libc::SIGFPE;
    pub const ABRT: i32 = libc::SIGABRT;
}

// Linux numbering, used only for naming on targets without POSIX signals
#[cfg(not(unix))]
mod raw {
    pub const SEGV: i32 = 11;
    pub const BUS: i32 = 7;
    pub const ILL: i32 = 4;
    pub const FPE: i32 = 8;
    pub const ABRT: i32 = 6;
}

/// Signals whose default action terminates the process after a native fault
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FatalSignal {
    #[serde(rename = "SIGSEGV")]
    Segv,
    #[serde(rename = "SIGBUS")]
    Bus,
    #[serde(rename = "SIGILL")]
    Ill,
    #[serde(rename = "SIGFPE")]
    Fpe,
    #[serde(rename = "SIGABRT")]
    Abrt,
}

impl FatalSignal {
    pub const ALL: [FatalSignal; 5] = [
        FatalSignal::Segv,
        FatalSignal::Bus,
        FatalSignal::Ill,
        FatalSignal::Fpe,
        FatalSignal::Abrt,
    ];

    pub fn as_raw(self) -> i32 {
        match self {
            FatalSignal::Segv => raw::SEGV,
            FatalSignal::Bus => raw::BUS,
            FatalSignal::Ill => raw::ILL,
            FatalSignal::Fpe => raw::FPE,
            FatalSignal::Abrt => raw::ABRT,
        }
    }

    pub fn from_raw(signal: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_raw() == signal)
    }

    /// Conventional short name, e.g. `SIGSEGV`
    pub fn name(self) -> &'static str {
        match self {
            FatalSignal::Segv => "SIGSEGV",
            FatalSignal::Bus => "SIGBUS",
            FatalSignal::Ill => "SIGILL",
            FatalSignal::Fpe => "SIGFPE",
            FatalSignal::Abrt => "SIGABRT",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            FatalSignal::Segv => "segmentation fault",
            FatalSignal::Bus => "bus error",
            FatalSignal::Ill => "illegal instruction",
            FatalSignal::Fpe => "floating point exception",
            FatalSignal::Abrt => "abort",
        }
    }
}

impl fmt::Display for FatalSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.description())
    }
}

#[derive(Debug, Error)]
#[error("Unknown fatal signal: {0}")]
pub struct UnknownSignal(String);

impl FromStr for FatalSignal {
    type Err = UnknownSignal;

    /// Accepts `SIGSEGV`, `segv` or the raw number
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i32>() {
            return Self::from_raw(n).ok_or_else(|| UnknownSignal(s.to_string()));
        }

        let upper = trimmed.to_ascii_uppercase();
        let short = upper.strip_prefix("SIG").unwrap_or(&upper);
        Self::ALL
            .into_iter()
            .find(|sig| &sig.name()[3..] == short)
            .ok_or_else(|| UnknownSignal(s.to_string()))
    }
}

/// Human readable form of a flag value
pub fn describe_signal(signal: i32) -> String {
    if signal == 0 {
        return "none".to_string();
    }
    match FatalSignal::from_raw(signal) {
        Some(sig) => sig.to_string(),
        None => format!("unknown signal ({})", signal),
    }
}
