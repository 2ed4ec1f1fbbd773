//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the command handlers, which layer its values
//! over the loaded [`Config`].

use std::path::PathBuf;

use clap::{Args, Parser};

use crate::{
    config::{BackupConfig, Config, ForgetConfig, RestoreConfig},
    env::Password,
    repo::Credentials,
    secret::Secret,
    within::Within,
};

/// Top-level CLI arguments, shared across every subcommand.
#[derive(Parser, Debug)]
#[command(
    name    = "restic-front",
    about   = "Drive restic against local, SFTP and Backblaze B2 repositories",
    version,
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Path to the local settings file.
    ///
    /// Merged over `~/.config/restic-front/config.toml`.  Missing files are
    /// skipped with a warning.
    #[arg(short, long, global = true, default_value = "restic-front.toml")]
    pub config: PathBuf,

    /// Print the resolved settings (secrets redacted) and exit.
    #[arg(long)]
    pub print_config: bool,

    /// Pass `--dry-run` to restic for backup, forget and restore.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// restic program to run (overrides the `restic` setting).
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub restic: Option<String>,

    /// Reject locations that are not `b2:` or `sftp:` instead of treating
    /// them as local paths.
    #[arg(long, global = true)]
    pub remote_only: bool,

    /// Log at debug level, including the restic command lines.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Subcommand>,
}

#[derive(clap::Subcommand, Debug)]
pub enum Subcommand {
    /// Initialise a new repository.
    Init(InitArgs),
    /// Back up a path; initialises the repository on first use.
    Backup(BackupArgs),
    /// Remove snapshots according to the retention policy.
    Forget(ForgetArgs),
    /// Restore a snapshot into a directory.
    Restore(RestoreArgs),
}

// ─── Shared ───────────────────────────────────────────────────────────────────

/// Password and Backblaze key overrides accepted by every subcommand.
#[derive(Args, Debug, Default)]
pub struct SecretArgs {
    /// Repository password, or the path of a file holding it.
    #[arg(long, value_parser = parse_secret)]
    pub password: Option<Secret>,

    /// Backblaze key ID (overrides `BACKBLAZE_KEY_ID`).
    #[arg(long, value_parser = parse_secret)]
    pub backblaze_key_id: Option<Secret>,

    /// Backblaze application key (overrides `BACKBLAZE_APPLICATION_KEY`).
    #[arg(long, value_parser = parse_secret)]
    pub backblaze_application_key: Option<Secret>,
}

fn parse_secret(s: &str) -> Result<Secret, std::convert::Infallible> {
    Ok(Secret::new(s))
}

impl SecretArgs {
    /// `--password` if given, decided file-or-literal at run time; otherwise
    /// the configured password.
    pub fn password(&self, cfg: &Config) -> Password {
        match &self.password {
            Some(p) => Password::Auto(p.clone()),
            None => cfg.password(),
        }
    }

    pub fn credentials(&self, cfg: &Config) -> Credentials {
        Credentials::new(
            self.backblaze_key_id.clone(),
            self.backblaze_application_key.clone(),
        )
        .or(&cfg.credentials())
    }
}

/// Replace `base` with `given` when anything was given.
fn list(given: &[String], base: &[String]) -> Vec<String> {
    if given.is_empty() {
        base.to_vec()
    } else {
        given.to_vec()
    }
}

// ─── init ─────────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Repository: `b2:<bucket>:<path>`, `sftp:<user>@<host>:<path>` or a local path.
    pub repo: String,

    #[command(flatten)]
    pub secrets: SecretArgs,
}

// ─── backup ───────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Path to back up.
    pub path: PathBuf,

    /// Repository: `b2:<bucket>:<path>`, `sftp:<user>@<host>:<path>` or a local path.
    pub repo: String,

    #[command(flatten)]
    pub secrets: SecretArgs,

    /// Exclude a pattern (repeatable; replaces `[backup].exclude`).
    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,

    /// Exclude a pattern, case-insensitively.
    #[arg(long, value_name = "PATTERN")]
    pub iexclude: Vec<String>,

    /// Skip directories containing this file.
    #[arg(long, value_name = "FILENAME")]
    pub exclude_if_present: Option<String>,

    /// Tag the snapshot (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Read this many files concurrently.
    #[arg(long, value_name = "N")]
    pub read_concurrency: Option<u32>,

    /// Do not run `forget` after the backup.
    #[arg(long)]
    pub no_forget: bool,

    /// Normalise permissions under PATH first (dirs 755, files 644).
    #[arg(long)]
    pub chmod: bool,

    /// `chown -R` PATH to this owner first.
    #[arg(long, value_name = "OWNER")]
    pub chown: Option<String>,
}

impl BackupArgs {
    pub fn apply(&self, base: &BackupConfig) -> BackupConfig {
        BackupConfig {
            read_concurrency: self.read_concurrency.unwrap_or(base.read_concurrency),
            run_forget: base.run_forget && !self.no_forget,
            exclude: list(&self.exclude, &base.exclude),
            iexclude: list(&self.iexclude, &base.iexclude),
            exclude_if_present: self
                .exclude_if_present
                .clone()
                .or_else(|| base.exclude_if_present.clone()),
            tags: list(&self.tags, &base.tags),
            chmod: base.chmod || self.chmod,
            chown: self.chown.clone().or_else(|| base.chown.clone()),
            dry_run: base.dry_run,
        }
    }
}

// ─── forget ───────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ForgetArgs {
    /// Repository: `b2:<bucket>:<path>`, `sftp:<user>@<host>:<path>` or a local path.
    pub repo: String,

    #[command(flatten)]
    pub secrets: SecretArgs,

    #[arg(long, value_name = "N")]
    pub keep_last: Option<u32>,
    #[arg(long, value_name = "N")]
    pub keep_hourly: Option<u32>,
    #[arg(long, value_name = "N")]
    pub keep_daily: Option<u32>,
    #[arg(long, value_name = "N")]
    pub keep_weekly: Option<u32>,
    #[arg(long, value_name = "N")]
    pub keep_monthly: Option<u32>,
    #[arg(long, value_name = "N")]
    pub keep_yearly: Option<u32>,

    /// Keep snapshots newer than this, e.g. `1y5m7d2h`.
    #[arg(long, value_name = "DURATION")]
    pub keep_within: Option<Within>,
    #[arg(long, value_name = "DURATION")]
    pub keep_within_hourly: Option<Within>,
    #[arg(long, value_name = "DURATION")]
    pub keep_within_daily: Option<Within>,
    #[arg(long, value_name = "DURATION")]
    pub keep_within_weekly: Option<Within>,
    #[arg(long, value_name = "DURATION")]
    pub keep_within_monthly: Option<Within>,
    #[arg(long, value_name = "DURATION")]
    pub keep_within_yearly: Option<Within>,

    /// Do not prune after forgetting.
    #[arg(long)]
    pub no_prune: bool,

    /// Only consider snapshots with this tag (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
}

impl ForgetArgs {
    pub fn apply(&self, base: &ForgetConfig) -> ForgetConfig {
        let pick = |given: &Option<Within>, base: &Option<Within>| given.clone().or_else(|| base.clone());
        ForgetConfig {
            keep_last: self.keep_last.or(base.keep_last),
            keep_hourly: self.keep_hourly.or(base.keep_hourly),
            keep_daily: self.keep_daily.or(base.keep_daily),
            keep_weekly: self.keep_weekly.or(base.keep_weekly),
            keep_monthly: self.keep_monthly.or(base.keep_monthly),
            keep_yearly: self.keep_yearly.or(base.keep_yearly),
            keep_within: pick(&self.keep_within, &base.keep_within),
            keep_within_hourly: pick(&self.keep_within_hourly, &base.keep_within_hourly),
            keep_within_daily: pick(&self.keep_within_daily, &base.keep_within_daily),
            keep_within_weekly: pick(&self.keep_within_weekly, &base.keep_within_weekly),
            keep_within_monthly: pick(&self.keep_within_monthly, &base.keep_within_monthly),
            keep_within_yearly: pick(&self.keep_within_yearly, &base.keep_within_yearly),
            prune: base.prune && !self.no_prune,
            tags: list(&self.tags, &base.tags),
            ..base.clone()
        }
    }
}

// ─── restore ──────────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Repository: `b2:<bucket>:<path>`, `sftp:<user>@<host>:<path>` or a local path.
    pub repo: String,

    /// Directory to restore into.
    pub target: PathBuf,

    #[command(flatten)]
    pub secrets: SecretArgs,

    /// Delete files in TARGET that are not in the snapshot.
    #[arg(long)]
    pub delete: bool,

    #[arg(long, value_name = "PATTERN")]
    pub exclude: Vec<String>,
    #[arg(long, value_name = "PATTERN")]
    pub iexclude: Vec<String>,
    #[arg(long, value_name = "PATTERN")]
    pub include: Vec<String>,
    #[arg(long, value_name = "PATTERN")]
    pub iinclude: Vec<String>,

    /// Only consider snapshots with this tag (repeatable).
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Verify restored file contents.
    #[arg(long)]
    pub verify: bool,

    /// Snapshot to restore (default from settings, normally `latest`).
    #[arg(long, value_name = "ID")]
    pub snapshot: Option<String>,
}

impl RestoreArgs {
    pub fn apply(&self, base: &RestoreConfig) -> RestoreConfig {
        RestoreConfig {
            delete: base.delete || self.delete,
            exclude: list(&self.exclude, &base.exclude),
            iexclude: list(&self.iexclude, &base.iexclude),
            include: list(&self.include, &base.include),
            iinclude: list(&self.iinclude, &base.iinclude),
            tags: list(&self.tags, &base.tags),
            verify: base.verify || self.verify,
            snapshot: self.snapshot.clone().unwrap_or_else(|| base.snapshot.clone()),
            dry_run: base.dry_run,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
