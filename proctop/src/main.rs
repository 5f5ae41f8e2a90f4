//! Entry point for the proctop TUI. Parses args, resolves the data source and runs the App.

use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use proctop::app::App;
use proctop::fetch::{SnapshotFetcher, DEFAULT_BASE_URL};
use proctop::profiles::{
    load_profiles, save_profiles, ProfileEntry, ProfileRequest, ProfilesFile, ResolveProfile,
    SaveDecision,
};
use proctop::state::{AutoRefresh, DEFAULT_INTERVAL_MS};

const DEMO_PORT: u16 = 3231;

#[derive(Debug, Default, PartialEq)]
struct ParsedArgs {
    url: Option<String>,
    profile: Option<String>,
    save: bool,
    interval_ms: Option<u64>,
    no_auto: bool,
    demo: bool,
    dry_run: bool,
    log: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum ArgError {
    Help(String),
    Invalid(String),
}

fn usage(prog: &str) -> String {
    format!(
        "Usage: {prog} [--profile NAME|-P NAME] [--save] [--interval MS|-i MS] [--no-auto] [--demo] [--dry-run] [--log FILE] [http://HOST:PORT]"
    )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, ArgError> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "proctop".into());
    let mut parsed = ParsedArgs::default();

    let parse_interval = |v: Option<String>| -> Result<u64, ArgError> {
        v.as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|&ms| ms > 0)
            .ok_or_else(|| {
                ArgError::Invalid(format!(
                    "--interval expects a positive number of milliseconds\n{}",
                    usage(&prog)
                ))
            })
    };

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(ArgError::Help(usage(&prog))),
            "--profile" | "-P" => parsed.profile = it.next(),
            "--save" => parsed.save = true,
            "--interval" | "-i" => parsed.interval_ms = Some(parse_interval(it.next())?),
            "--no-auto" => parsed.no_auto = true,
            "--demo" => parsed.demo = true,
            "--dry-run" => parsed.dry_run = true,
            "--log" => parsed.log = it.next().map(PathBuf::from),
            _ if arg.starts_with("--profile=") => {
                if let Some((_, v)) = arg.split_once('=') {
                    if !v.is_empty() {
                        parsed.profile = Some(v.to_string());
                    }
                }
            }
            _ if arg.starts_with("--interval=") => {
                let v = arg.split_once('=').map(|(_, v)| v.to_string());
                parsed.interval_ms = Some(parse_interval(v)?);
            }
            _ if arg.starts_with('-') => {
                return Err(ArgError::Invalid(format!(
                    "Unknown option '{arg}'. {}",
                    usage(&prog)
                )));
            }
            _ => {
                if parsed.url.is_none() {
                    parsed.url = Some(arg);
                } else {
                    return Err(ArgError::Invalid(format!(
                        "Unexpected argument. {}",
                        usage(&prog)
                    )));
                }
            }
        }
    }
    Ok(parsed)
}

/// The dashboard owns the terminal, so logs only go to a file when asked for.
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path.or_else(|| env::var_os("PROCTOP_LOG").map(PathBuf::from)) else {
        return Ok(());
    };
    let file = File::create(&path).with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(ArgError::Help(msg)) => {
            println!("{msg}");
            return Ok(());
        }
        Err(ArgError::Invalid(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    };
    init_logging(parsed.log.clone())?;

    // Demo mode short-circuit
    if parsed.demo || matches!(parsed.profile.as_deref(), Some("demo")) {
        return run_demo_mode(&parsed).await;
    }

    let mut profiles = match load_profiles() {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "ignoring unreadable profiles file");
            eprintln!("warning: {e}");
            ProfilesFile::default()
        }
    };

    let url = parsed
        .url
        .clone()
        .or_else(|| env::var("PROCTOP_URL").ok().filter(|v| !v.trim().is_empty()));
    let req = ProfileRequest {
        profile_name: parsed.profile.clone(),
        url,
        interval_ms: parsed.interval_ms,
    };

    let entry = match req.resolve(&profiles) {
        ResolveProfile::Direct(entry) => {
            if let Some(name) = parsed.profile.as_ref() {
                maybe_save(&mut profiles, name, &entry, parsed.save)?;
            }
            entry
        }
        ResolveProfile::Loaded(entry) => entry,
        ResolveProfile::PromptSelect(mut names) => {
            // Always add demo option to list
            if !names.iter().any(|n| n == "demo") {
                names.push("demo".into());
            }
            let Some(name) = prompt_select(&names)? else {
                return Ok(());
            };
            if name == "demo" {
                return run_demo_mode(&parsed).await;
            }
            match profiles.profiles.get(&name) {
                Some(entry) => entry.clone(),
                None => return Ok(()),
            }
        }
        ResolveProfile::PromptCreate(name) => {
            eprintln!("Profile '{name}' does not exist yet.");
            let url = prompt_string("Enter data source URL (http://HOST:PORT): ")?;
            if url.trim().is_empty() {
                return Ok(());
            }
            let entry = ProfileEntry {
                url: url.trim().to_string(),
                interval_ms: parsed.interval_ms,
            };
            profiles.profiles.insert(name, entry.clone());
            save_profiles(&profiles)?;
            entry
        }
        ResolveProfile::Default => ProfileEntry {
            url: DEFAULT_BASE_URL.to_string(),
            interval_ms: parsed.interval_ms,
        },
    };

    let auto = AutoRefresh {
        enabled: !parsed.no_auto,
        interval_ms: entry.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS).max(1),
    };
    let fetcher = SnapshotFetcher::new(&entry.url)
        .with_context(|| format!("invalid data source URL '{}'", entry.url))?;

    if parsed.dry_run {
        println!(
            "proctop: data source {} (auto-refresh {}, every {} ms)",
            fetcher.endpoint(),
            if auto.enabled { "on" } else { "off" },
            auto.interval_ms
        );
        return Ok(());
    }

    info!(url = %entry.url, "starting");
    let mut app = App::new(fetcher, auto);
    app.run().await
}

/// New profiles are saved right away; changed ones only with `--save` or a yes.
fn maybe_save(
    profiles: &mut ProfilesFile,
    name: &str,
    entry: &ProfileEntry,
    force: bool,
) -> Result<()> {
    let write = match profiles.decide(name, entry) {
        SaveDecision::New => true,
        SaveDecision::Unchanged => false,
        SaveDecision::Changed => {
            force || prompt_yes_no(&format!("Overwrite existing profile '{name}'? [y/N]: "))
        }
    };
    if write {
        profiles.profiles.insert(name.to_string(), entry.clone());
        save_profiles(profiles)?;
        info!(profile = name, "profile saved");
    }
    Ok(())
}

fn prompt_select(names: &[String]) -> Result<Option<String>> {
    eprintln!("Select profile:");
    for (i, n) in names.iter().enumerate() {
        eprintln!("  {}. {}", i + 1, n);
    }
    let line = prompt_string("Enter number (or blank to abort): ")?;
    Ok(line
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|idx| (1..=names.len()).contains(idx))
        .map(|idx| names[idx - 1].clone()))
}

fn prompt_yes_no(prompt: &str) -> bool {
    match prompt_string(prompt) {
        Ok(line) => matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

fn prompt_string(prompt: &str) -> io::Result<String> {
    eprint!("{prompt}");
    let _ = io::stderr().flush();
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line)
}

// --- Demo Mode ---

async fn run_demo_mode(parsed: &ParsedArgs) -> Result<()> {
    let url = format!("http://127.0.0.1:{DEMO_PORT}");
    let auto = AutoRefresh {
        enabled: !parsed.no_auto,
        interval_ms: parsed.interval_ms.unwrap_or(2_000),
    };
    let fetcher = SnapshotFetcher::new(&url)?;
    if parsed.dry_run {
        println!("proctop: demo data source {}", fetcher.endpoint());
        return Ok(());
    }
    let agent = spawn_demo_agent(DEMO_PORT)?;
    let mut app = App::new(fetcher, auto);
    let res = tokio::select! {
        res = app.run() => res,
        _ = tokio::signal::ctrl_c() => Ok(()),
    };
    drop(agent);
    res
}

/// Kills the demo agent when dropped.
struct DemoGuard(std::process::Child);

impl Drop for DemoGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn spawn_demo_agent(port: u16) -> Result<DemoGuard> {
    let candidate = find_agent_executable();
    let child = std::process::Command::new(&candidate)
        .arg("--port")
        .arg(port.to_string())
        .arg("--interval")
        .arg("1000")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .with_context(|| format!("starting demo agent {}", candidate.display()))?;
    // Give the agent a brief moment to start
    std::thread::sleep(std::time::Duration::from_millis(300));
    Ok(DemoGuard(child))
}

fn find_agent_executable() -> PathBuf {
    if let Some(parent) = env::current_exe().ok().and_then(|e| e.parent().map(PathBuf::from)) {
        #[cfg(windows)]
        let name = "proctop_agent.exe";
        #[cfg(not(windows))]
        let name = "proctop_agent";
        let candidate = parent.join(name);
        if candidate.exists() {
            return candidate;
        }
    }
    // Fallback to relying on PATH
    PathBuf::from("proctop_agent")
}
