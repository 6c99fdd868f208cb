//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::collections::HashMap;

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parsed data from `/proc/[pid]/status`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatus {
    pub name: String,
    pub pid: u32,
    pub ppid: u32,
    pub threads: u32,
}

/// Parses `/proc/[pid]/status`.
///
/// `Name` and `Pid` are required; `PPid` and `Threads` default to 0.
pub fn parse_proc_status(content: &str) -> Result<ProcStatus, ParseError> {
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in content.lines() {
        if let Some((key, value)) = line.split_once(':') {
            fields.insert(key.trim(), value.trim());
        }
    }

    let name = fields
        .get("Name")
        .ok_or_else(|| ParseError::new("missing Name field"))?
        .to_string();
    let pid = fields
        .get("Pid")
        .ok_or_else(|| ParseError::new("missing Pid field"))?
        .parse()
        .map_err(|_| ParseError::new("invalid Pid"))?;

    Ok(ProcStatus {
        name,
        pid,
        ppid: fields.get("PPid").and_then(|s| s.parse().ok()).unwrap_or(0),
        threads: fields
            .get("Threads")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0),
    })
}

/// Returns the executable from `/proc/[pid]/cmdline` (first NUL-separated
/// argument), or `None` for kernel threads whose cmdline is empty.
pub fn parse_cmdline_exe(content: &str) -> Option<String> {
    content
        .split('\0')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Fields of `/proc/meminfo` used for diagnostics (kB).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemInfo {
    pub mem_total: Option<u64>,
    pub mem_available: Option<u64>,
}

pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let parse_kb = |line: &str| -> Option<u64> {
        line.split_whitespace().nth(1).and_then(|s| s.parse().ok())
    };

    let mut info = MemInfo::default();
    for line in content.lines() {
        if line.starts_with("MemTotal:") {
            info.mem_total = parse_kb(line);
        } else if line.starts_with("MemAvailable:") {
            info.mem_available = parse_kb(line);
        }
    }

    if info.mem_total.is_none() {
        return Err(ParseError::new("missing MemTotal"));
    }
    Ok(info)
}

/// Parses the three load averages from `/proc/loadavg`.
pub fn parse_loadavg(content: &str) -> Result<[f64; 3], ParseError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(ParseError::new("invalid loadavg format"));
    }

    let load1 = parts[0]
        .parse()
        .map_err(|_| ParseError::new("invalid load1"))?;
    let load5 = parts[1]
        .parse()
        .map_err(|_| ParseError::new("invalid load5"))?;
    let load15 = parts[2]
        .parse()
        .map_err(|_| ParseError::new("invalid load15"))?;

    Ok([load1, load5, load15])
}

/// Parses system uptime in seconds from `/proc/uptime`.
pub fn parse_uptime(content: &str) -> Result<f64, ParseError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::new("empty uptime"))?
        .parse()
        .map_err(|_| ParseError::new("invalid uptime"))
}
