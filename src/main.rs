//! `restic-front`: drive restic against local, SFTP and Backblaze B2
//! repositories.
//!
//! # Overview
//!
//! A repository is named by a single location string on the command line:
//!
//! ```text
//! b2:<bucket>:<path>          Backblaze B2 (keys from settings/env/flags)
//! sftp:<user>@<host>:<path>   SFTP
//! <anything else>             local path
//! ```
//!
//! The tool resolves it, assembles the environment restic expects
//! (`RESTIC_REPOSITORY`, `RESTIC_PASSWORD[_FILE]`, `B2_ACCOUNT_*`) for the one
//! child process it spawns, and maps settings and flags to restic arguments.
//!
//! # Usage
//!
//! ```text
//! restic-front init    <repo>
//! restic-front backup  <path> <repo>     # auto-inits, then runs forget
//! restic-front forget  <repo> --keep-daily 7
//! restic-front restore <repo> <target> --snapshot latest
//! restic-front --print-config
//! ```
//!
//! # Module layout
//!
//! | Module            | Responsibility                                   |
//! |-------------------|--------------------------------------------------|
//! | [`cli`]           | Argument types parsed by clap                    |
//! | [`config`]        | Settings struct + layered TOML loader            |
//! | [`repo`]          | Repository descriptors and location parser       |
//! | [`env`]           | Child-process environment, password resolution   |
//! | [`runner`]        | restic argument construction                     |
//! | [`ui`]            | Spinner, captured execution, executor trait      |
//! | [`commands`]      | init / backup / forget / restore                 |
//! | [`perms`]         | chmod / chown before backup                      |

mod cli;
mod commands;
mod config;
mod env;
mod error;
mod perms;
mod repo;
mod runner;
mod secret;
mod ui;
mod within;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use config::{PartialConfig, parse_partial};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = load_merged_config(&cli.config)?.with_env(|k| std::env::var(k).ok());

    if cli.print_config {
        println!("{cfg:#?}");
        return Ok(());
    }

    let Some(command) = &cli.command else {
        anyhow::bail!("no subcommand given; run with --help to see the available commands");
    };

    println!();
    commands::run(&cli, command, &cfg, &ui::Terminal)?;
    println!();
    Ok(())
}

/// Log filter from `RESTIC_FRONT_LOG`, else `info` (`debug` with `-v`).
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("RESTIC_FRONT_LOG").unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("restic_front=debug")
        } else {
            EnvFilter::new("restic_front=info")
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .init();
}

/// Load configuration from two sources and merge them.
///
/// 1. `~/.config/restic-front/config.toml`: global defaults (e.g. Backblaze keys, retention)
/// 2. `local_path` (default: `./restic-front.toml`): per-project overrides
///
/// Local values win on a per-key basis.  Either file may be absent.
fn load_merged_config(local_path: &std::path::Path) -> Result<config::Config> {
    let global_path = dirs_next::config_dir().map(|d| d.join("restic-front").join("config.toml"));

    let global: PartialConfig = match global_path.as_deref() {
        Some(p) => parse_partial(p)?.unwrap_or_default(),
        None => PartialConfig::default(),
    };

    let local: PartialConfig = if let Some(p) = parse_partial(local_path)? {
        p
    } else {
        tracing::warn!(
            path = %local_path.display(),
            "settings file not found, using global settings and defaults"
        );
        PartialConfig::default()
    };

    global.merge(local).resolve()
}
