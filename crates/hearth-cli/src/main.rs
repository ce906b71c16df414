//! `hearth-cli` – process entry point for the hearth service registry.
//!
//! The binary:
//!
//! 1. Initialises tracing (see [`telemetry`]).
//! 2. Loads `~/.hearth/config.toml`, falling back to defaults.
//! 3. Builds the one [`ServiceCore`] of the process and queues the built-in
//!    sparks on a [`KickStart`].
//! 4. Kicks the sparks with the command-line arguments, prints the
//!    [`KickReport`][hearth_bootstrap::KickReport] and, optionally, the
//!    registry contents.
//!
//! A stalled spark degrades the run but is never fatal.
//!
//! Pass `--write-config` to save the effective configuration to
//! `~/.hearth/config.toml`.

mod config;
mod output;
mod sparks;
mod telemetry;

use std::io::Write;
use std::process::ExitCode;

use hearth_bootstrap::KickStart;
use hearth_core::ServiceCore;
use hearth_types::HearthError;
use tracing::{debug, error, info, warn};

const WRITE_CONFIG_FLAG: &str = "--write-config";

fn main() -> ExitCode {
    let _guard = telemetry::init_tracing("hearth");

    let cfg = load_config();
    let mut args: Vec<String> = std::env::args().skip(1).collect();

    match run(&cfg, &mut args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "hearth failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> config::Config {
    match config::load() {
        Ok(Some(cfg)) => {
            info!(path = %config::config_path().display(), "configuration loaded");
            cfg
        }
        Ok(None) => {
            debug!("no configuration file; using defaults");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
        Err(e) => {
            warn!(error = %e, "configuration unreadable; using defaults");
            let mut cfg = config::Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        }
    }
}

fn run(cfg: &config::Config, args: &mut Vec<String>) -> Result<(), HearthError> {
    if let Some(index) = args.iter().position(|a| a == WRITE_CONFIG_FLAG) {
        args.remove(index);
        config::save(cfg)?;
        info!(path = %config::config_path().display(), "configuration saved");
    }

    let mut core = ServiceCore::new();
    core.on_registered(|service| {
        info!(service = %service.name(), "service available");
    });

    let mut kickstart = KickStart::new();
    for spark in sparks::builtin_sparks(cfg) {
        kickstart.add_spark(spark);
    }
    for disabled in &cfg.disabled_sparks {
        debug!(spark = %disabled, "spark disabled by configuration");
    }

    let report = kickstart.kick(&mut core, args);
    if !args.is_empty() {
        warn!(unused = ?args, "unrecognised arguments");
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    output::write_report(&mut out, &report, cfg.report_format)?;
    if cfg.dump_services {
        output::write_dump(&mut out, &core)?;
    }
    out.flush()?;
    Ok(())
}
