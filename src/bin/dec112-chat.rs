//! DEC112 emergency-chat CLI.
//!
//! Drives one chat session against a DEC112-speaking endpoint. The
//! messaging phase is selected by flags: `-a` with `-n`/`-i` sends timed
//! automatic messages, `-t` replays a message file, otherwise lines are
//! read interactively until `exit`.
//!
//! The process exit status is the accumulated `ErrorFlags` byte: 0 for a
//! clean run, otherwise a bitwise combination of timeout (1),
//! registration failure (2), missing reply (4) and validation
//! mismatch (8).

use std::io::BufRead;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dec112_chat::{
    config::SessionConfig,
    session::{event_channel, SessionController, SessionMode},
    transport::{LoopbackTransport, TransportKind},
    ErrorFlags, VERSION,
};

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "dec112-chat")]
#[command(version = VERSION)]
#[command(about = "DEC112 emergency chat over a SIP-like transport", long_about = None)]
struct Cli {
    /// Target SIP URI of the emergency service
    #[arg(short = 'r', long = "target")]
    target: Option<String>,

    /// Service URN routed alongside the target
    #[arg(short = 'u', long = "service")]
    service: Option<String>,

    /// Configuration file path
    #[arg(short = 'f', long = "config")]
    config: Option<PathBuf>,

    /// Message source file; each usable line becomes one continuation
    #[arg(short = 't', long = "messages")]
    messages: Option<PathBuf>,

    /// Automatic mode: total message count
    #[arg(short = 'n', long = "count", default_value_t = 0)]
    count: u32,

    /// Automatic mode: seconds between messages
    #[arg(short = 'i', long = "interval", default_value_t = 0)]
    interval: u64,

    /// Enable automatic timed messaging
    #[arg(short = 'a', long = "auto")]
    auto: bool,

    /// Use TLS transport
    #[arg(short = 's', long = "tls")]
    tls: bool,

    /// Attach the X-DEC112-Test header to every message
    #[arg(short = 'x', long = "test-header")]
    test_header: bool,

    /// Country code override for the identity document
    #[arg(short = 'c', long = "country")]
    country: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Missing target or a half-specified automatic schedule is a usage
    // problem, not an error: print help and leave with success.
    let incomplete_schedule =
        (cli.count == 0 && cli.interval > 0) || (cli.interval == 0 && cli.count > 0);
    let Some(target) = cli.target.clone() else {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    };
    if incomplete_schedule {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    match run(cli, &target).await {
        Ok(flags) => {
            info!(flags = %flags, "exiting");
            ExitCode::from(flags.bits())
        },
        Err(e) => {
            eprintln!("dec112-chat: {e:#}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli, target: &str) -> anyhow::Result<ErrorFlags> {
    let (mut config, source) = load_config(&cli)?;
    init_tracing(config.debug);
    match &source {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => warn!("no configuration file, using defaults"),
    }

    if let Some(country) = &cli.country {
        config.country = country.clone();
    }
    config.test_header = cli.test_header;
    config.finalize();

    let kind = if cli.tls {
        TransportKind::Tls
    } else {
        TransportKind::Tcp
    };
    info!(transport = %kind, target = %target, "starting session");
    if let Some(service) = &cli.service {
        info!(service = %service, "service urn");
    }

    let (tx, rx) = event_channel();
    let transport = LoopbackTransport::new(tx, kind);
    let controller =
        SessionController::new(config, transport, rx).with_service(cli.service.clone());

    let mode = select_mode(&cli);
    if matches!(mode, SessionMode::Interactive { .. }) {
        println!("##### Type messages followed by RETURN or use 'exit' to unregister #####");
    }

    let flags = controller
        .run(target, mode)
        .await
        .context("session failed")?;
    Ok(flags)
}

/// Load the configuration and report which file backed it, if any.
/// Logging is left to the caller: the subscriber is installed only once
/// the configured debug level is known.
fn load_config(cli: &Cli) -> anyhow::Result<(SessionConfig, Option<PathBuf>)> {
    match &cli.config {
        Some(path) => {
            let config = SessionConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            Ok((config, Some(path.clone())))
        },
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if default.exists() {
                let config =
                    SessionConfig::from_file(&default).context("loading default config")?;
                Ok((config, Some(default)))
            } else {
                Ok((SessionConfig::default(), None))
            }
        },
    }
}

/// Pick the messaging mode. `-a` alone is automatic, `-t` alone is
/// file-driven; giving both (or neither) falls back to interactive.
fn select_mode(cli: &Cli) -> SessionMode {
    match (cli.auto, &cli.messages) {
        (true, None) => SessionMode::Automatic {
            count: cli.count,
            interval: Duration::from_secs(cli.interval),
        },
        (false, Some(path)) => SessionMode::FileDriven { path: path.clone() },
        _ => SessionMode::Interactive {
            lines: spawn_stdin_lines(),
        },
    }
}

/// Feed stdin lines into a channel from a blocking thread so the
/// controller can select between user input and session events.
fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                },
                Err(_) => break,
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["dec112-chat", "-r", "sip:112@service.dec112.at"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_select_mode_automatic() {
        let mode = select_mode(&cli(&["-a", "-n", "3", "-i", "5"]));
        assert!(matches!(
            mode,
            SessionMode::Automatic { count: 3, interval } if interval == Duration::from_secs(5)
        ));
    }

    #[test]
    fn test_select_mode_file_driven() {
        let mode = select_mode(&cli(&["-t", "messages.txt"]));
        assert!(matches!(mode, SessionMode::FileDriven { .. }));
    }

    #[test]
    fn test_select_mode_conflict_falls_back_to_interactive() {
        // -a and -t together cancel each other out.
        let mode = select_mode(&cli(&["-a", "-n", "3", "-i", "5", "-t", "messages.txt"]));
        assert!(matches!(mode, SessionMode::Interactive { .. }));
    }

    #[test]
    fn test_load_config_reports_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "user = \"alice\"").unwrap();
        file.flush().unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let (config, source) = load_config(&cli(&["-f", &path])).unwrap();
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(source.as_deref(), Some(file.path()));
    }
}

fn init_tracing(debug: u8) {
    let default = match debug {
        0 => "warn",
        1 | 2 => "info",
        3 | 4 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("dec112_chat={default}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
