//! procdump entry point
//!
//! Lowers privileges, parses arguments, initializes logging, and maps the
//! outcome of a single dump request to an exit status.

use std::ffi::OsString;
use std::io::{self, Write};
use std::process::ExitCode;

use clap::Parser;
use tracing::{Level, debug};
use tracing_subscriber::{EnvFilter, fmt};

use procdump::core::{Config, Decision, Result, SetuidPrivilege};
use procdump::domains::dump::{DumpError, DumpService, exit};

/// Dump a file below /proc with elevated rights, subject to an exclusion policy.
#[derive(Parser, Debug)]
#[command(name = "procdump", version, about, long_about = None)]
struct Args {
    /// Path relative to the trusted root (e.g. net/ip_conntrack)
    #[arg(value_name = "PATH", required_unless_present = "show_policy")]
    path: Option<OsString>,

    /// Output target; only "-" (standard output) is supported
    #[arg(value_name = "TARGET")]
    target: Option<OsString>,

    /// Evaluate the policy for PATH without opening it
    #[arg(long, conflicts_with = "show_policy")]
    check: bool,

    /// Print the compiled-in security policy as JSON
    #[arg(long)]
    show_policy: bool,
}

fn main() -> ExitCode {
    // Nothing derived from caller input is looked at before this.
    let privilege = match SetuidPrivilege::capture() {
        Ok(privilege) => privilege,
        Err(err) => {
            eprintln!("procdump: {err}");
            return ExitCode::from(exit::PRIVILEGE);
        }
    };

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(exit::USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let config = Config::from_env();
    init_logging(&config.logging.level);

    match run(args, config, privilege) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("procdump: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(args: Args, config: Config, privilege: SetuidPrivilege) -> Result<()> {
    config.validate()?;
    debug!(
        setuid = privilege.is_setuid(),
        setgid = privilege.is_setgid(),
        "Configuration validated"
    );

    if args.show_policy {
        let mut stdout = io::stdout().lock();
        serde_json::to_writer_pretty(&mut stdout, &config.security)?;
        writeln!(stdout)?;
        return Ok(());
    }

    let Some(path) = args.path else {
        return Err(DumpError::usage("missing PATH argument").into());
    };
    if let Some(target) = &args.target {
        if target.as_os_str() != "-" {
            return Err(DumpError::usage(
                "writing to a named target is not supported; use '-' or omit TARGET",
            )
            .into());
        }
    }

    let service = DumpService::new(config, privilege);

    if args.check {
        return match service.evaluate(&path)? {
            Decision::Allow(candidate) => {
                eprintln!("allow: {candidate}");
                Ok(())
            }
            Decision::Deny(reason) => Err(DumpError::denied(path.to_string_lossy(), reason).into()),
        };
    }

    let mut stdout = io::stdout().lock();
    let copied = service.dump(&path, &mut stdout)?;
    debug!(bytes = copied, "Dump complete");

    Ok(())
}

/// Initialize the logging subsystem.
///
/// Logs always go to stderr; stdout carries only file bytes.
fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::ERROR,
    };

    let filter = EnvFilter::default().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
