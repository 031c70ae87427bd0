//! Record severity levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a tracked record, ordered from least to most severe.
///
/// Serializes as the upper-case name; deserializes through [`FromStr`], so
/// config and token files may use any case or the `WARN`/`ERR` short forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
    Failure,
    Fatal,
    Halt,
}

impl Severity {
    pub const ALL: [Severity; 10] = [
        Severity::Trace,
        Severity::Debug,
        Severity::Info,
        Severity::Notice,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
        Severity::Failure,
        Severity::Fatal,
        Severity::Halt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
            Severity::Failure => "FAILURE",
            Severity::Fatal => "FATAL",
            Severity::Halt => "HALT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "WARN" => return Ok(Severity::Warning),
            "ERR" => return Ok(Severity::Error),
            _ => {}
        }
        Severity::ALL
            .into_iter()
            .find(|sev| sev.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSeverity(s.to_string()))
    }
}

impl TryFrom<String> for Severity {
    type Error = UnknownSeverity;

    fn try_from(value: String) -> Result<Self, <Severity as TryFrom<String>>::Error> {
        value.parse()
    }
}
