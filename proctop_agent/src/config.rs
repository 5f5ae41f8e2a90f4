//! Command-line configuration for the agent.

use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_INTERVAL_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentArgs {
    pub port: u16,
    pub interval_ms: u64,
    /// Serve only pushed reports; do not sample this host.
    pub no_local: bool,
    /// Push mode: POST local samples to this base URL instead of serving.
    pub push: Option<String>,
    pub hostname: Option<String>,
}

impl Default for AgentArgs {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            interval_ms: DEFAULT_INTERVAL_MS,
            no_local: false,
            push: None,
            hostname: None,
        }
    }
}

impl AgentArgs {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

pub fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--port PORT|-p PORT] [--interval MS] [--no-local] [--push URL] [--hostname NAME]"
    )
}

/// `Err` carries the text to print: usage for `--help`, or a parse error.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<AgentArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "proctop_agent".into());
    let mut out = AgentArgs::default();
    let mut long_port: Option<String> = None;
    let mut short_port: Option<String> = None;

    while let Some(a) = it.next() {
        match a.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--port" => long_port = it.next(),
            "-p" => short_port = it.next(),
            "--interval" => {
                out.interval_ms = it
                    .next()
                    .and_then(|v| v.parse::<u64>().ok())
                    .filter(|&ms| ms > 0)
                    .ok_or_else(|| format!("--interval expects milliseconds. {}", usage(&prog)))?;
            }
            "--no-local" => out.no_local = true,
            "--push" => out.push = it.next().filter(|v| !v.is_empty()),
            "--hostname" => out.hostname = it.next().filter(|v| !v.is_empty()),
            _ if a.starts_with("--port=") => {
                if let Some((_, v)) = a.split_once('=') {
                    long_port = Some(v.to_string());
                }
            }
            _ => return Err(format!("Unexpected argument '{a}'. {}", usage(&prog))),
        }
    }

    if let Some(p) = long_port.or(short_port) {
        out.port = p
            .parse::<u16>()
            .map_err(|_| format!("invalid port '{p}'. {}", usage(&prog)))?;
    }
    Ok(out)
}
