//! Settings types and the layered loader.
//!
//! `Config` is the read-only settings object every command receives.  It is
//! assembled from, lowest precedence first:
//!
//! 1. built-in defaults,
//! 2. `~/.config/restic-front/config.toml` (global),
//! 3. `./restic-front.toml` or `--config <path>` (local),
//! 4. the environment (`BACKBLAZE_KEY_ID`, `BACKBLAZE_APPLICATION_KEY`,
//!    `RESTIC_PASSWORD`, `RESTIC_PASSWORD_FILE`),
//!
//! after which command-line flags are applied per subcommand.
//!
//! # File format
//!
//! ```toml
//! restic   = "restic"      # program to run
//! dry_run  = false
//! password = "hunter2"     # or: password_file = "/etc/restic/pw"
//!
//! [backblaze]
//! key_id          = "..."
//! application_key = "..."
//!
//! [backup]
//! read_concurrency   = 4
//! run_forget         = true
//! exclude            = ["**/.cache"]
//! iexclude           = ["*.TMP"]
//! exclude_if_present = ".nobackup"
//! tags               = ["nightly"]
//! chmod              = false
//! chown              = "backup:backup"
//!
//! [forget]
//! keep_daily   = 7
//! keep_weekly  = 4
//! keep_within  = "1m"
//! prune        = true
//!
//! [restore]
//! snapshot = "latest"
//! verify   = true
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{env::Password, repo::Credentials, secret::Secret, within::Within};

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root settings object.  Every field has a default, so an empty file (or no
/// file at all) is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Program invoked for every restic operation.
    pub restic: String,

    /// Ask restic to only report what it would do.
    pub dry_run: bool,

    /// Repository password, passed inline.
    pub password: Secret,

    /// Password file; takes precedence over `password` when set.
    pub password_file: Option<PathBuf>,

    pub backblaze: BackblazeConfig,
    pub backup: BackupConfig,
    pub forget: ForgetConfig,
    pub restore: RestoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            restic: default_restic(),
            dry_run: false,
            password: default_password(),
            password_file: None,
            backblaze: BackblazeConfig::default(),
            backup: BackupConfig::default(),
            forget: ForgetConfig::default(),
            restore: RestoreConfig::default(),
        }
    }
}

impl Config {
    /// Overlay values read through `var` (normally `std::env::var`).
    ///
    /// `RESTIC_PASSWORD` and `RESTIC_PASSWORD_FILE` are the variables restic
    /// itself understands, so a shell already set up for restic works as-is.
    /// A variable set to the empty string counts as unset.
    pub fn with_env(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| var(name).filter(|v| !v.is_empty());
        if let Some(v) = var(crate::repo::BACKBLAZE_KEY_ID) {
            self.backblaze.key_id = Some(v.into());
        }
        if let Some(v) = var(crate::repo::BACKBLAZE_APPLICATION_KEY) {
            self.backblaze.application_key = Some(v.into());
        }
        if let Some(v) = var(crate::env::RESTIC_PASSWORD) {
            self.password = v.into();
            self.password_file = None;
        } else if let Some(v) = var(crate::env::RESTIC_PASSWORD_FILE) {
            self.password_file = Some(v.into());
        }
        self
    }

    /// Password to use when none is given on the command line.
    pub fn password(&self) -> Password {
        match &self.password_file {
            Some(path) => Password::File(path.clone()),
            None => Password::Inline(self.password.clone()),
        }
    }

    /// Backblaze keys from settings, used when no override is given.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(
            self.backblaze.key_id.clone(),
            self.backblaze.application_key.clone(),
        )
    }
}

// ─── [backblaze] ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BackblazeConfig {
    pub key_id: Option<Secret>,
    pub application_key: Option<Secret>,
}

// ─── [backup] ─────────────────────────────────────────────────────────────────

/// Options for `restic backup`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Files read concurrently (`--read-concurrency`).
    pub read_concurrency: u32,

    /// Run `forget` with the `[forget]` policy after a successful backup.
    pub run_forget: bool,

    /// Case-sensitive exclude patterns (`--exclude`).
    pub exclude: Vec<String>,

    /// Case-insensitive exclude patterns (`--iexclude`).
    pub iexclude: Vec<String>,

    /// Skip directories containing a file with this name.
    pub exclude_if_present: Option<String>,

    pub tags: Vec<String>,

    /// Normalise modes under the source path first: directories `rwxr-xr-x`,
    /// files `rw-r--r--`.
    pub chmod: bool,

    /// `chown -R` the source path to this owner first.
    pub chown: Option<String>,

    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            read_concurrency: default_read_concurrency(),
            run_forget: true,
            exclude: vec![],
            iexclude: vec![],
            exclude_if_present: None,
            tags: vec![],
            chmod: false,
            chown: None,
            dry_run: false,
        }
    }
}

// ─── [forget] ─────────────────────────────────────────────────────────────────

/// Retention policy for `restic forget`.
///
/// Counts and durations left unset are not passed, so restic's own defaults
/// apply.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ForgetConfig {
    pub keep_last: Option<u32>,
    pub keep_hourly: Option<u32>,
    pub keep_daily: Option<u32>,
    pub keep_weekly: Option<u32>,
    pub keep_monthly: Option<u32>,
    pub keep_yearly: Option<u32>,
    pub keep_within: Option<Within>,
    pub keep_within_hourly: Option<Within>,
    pub keep_within_daily: Option<Within>,
    pub keep_within_weekly: Option<Within>,
    pub keep_within_monthly: Option<Within>,
    pub keep_within_yearly: Option<Within>,

    /// Prune unreferenced data once snapshots have been removed.
    pub prune: bool,
    pub repack_cacheable_only: bool,
    /// Repack pack files below 80% of the target pack size.
    pub repack_small: bool,
    pub repack_uncompressed: bool,

    /// Only consider snapshots with these tags.
    pub tags: Vec<String>,

    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for ForgetConfig {
    fn default() -> Self {
        Self {
            keep_last: None,
            keep_hourly: None,
            keep_daily: None,
            keep_weekly: None,
            keep_monthly: None,
            keep_yearly: None,
            keep_within: None,
            keep_within_hourly: None,
            keep_within_daily: None,
            keep_within_weekly: None,
            keep_within_monthly: None,
            keep_within_yearly: None,
            prune: true,
            repack_cacheable_only: false,
            repack_small: true,
            repack_uncompressed: false,
            tags: vec![],
            dry_run: false,
        }
    }
}

// ─── [restore] ────────────────────────────────────────────────────────────────

/// Options for `restic restore`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Delete files in the target that are not in the snapshot.
    pub delete: bool,
    pub exclude: Vec<String>,
    pub iexclude: Vec<String>,
    pub include: Vec<String>,
    pub iinclude: Vec<String>,
    pub tags: Vec<String>,
    /// Verify restored file contents.
    pub verify: bool,
    /// Snapshot ID to restore.
    pub snapshot: String,

    #[serde(skip)]
    pub dry_run: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            delete: false,
            exclude: vec![],
            iexclude: vec![],
            include: vec![],
            iinclude: vec![],
            tags: vec![],
            verify: false,
            snapshot: default_snapshot(),
            dry_run: false,
        }
    }
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

pub fn default_restic() -> String {
    "restic".into()
}

pub fn default_password() -> Secret {
    Secret::new("password")
}

pub fn default_snapshot() -> String {
    "latest".into()
}

/// Half the available CPUs, but at least two.
pub fn default_read_concurrency() -> u32 {
    let cpus = std::thread::available_parallelism().map_or(1, |n| n.get());
    u32::try_from(half_to_even(cpus)).unwrap_or(u32::MAX).max(2)
}

/// `n / 2` rounded half to even: 5 → 2, 7 → 4, 9 → 4.
fn half_to_even(n: usize) -> usize {
    let half = n / 2;
    if n % 2 == 1 && half % 2 == 1 { half + 1 } else { half }
}

// ─── Loader ───────────────────────────────────────────────────────────────────

/// One settings file, kept as a raw table so layers can be merged before
/// deserialising.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialConfig(toml::Table);

impl PartialConfig {
    /// Merge `over` on top of `self`.  Nested tables merge key by key; any
    /// other value in `over` replaces the one in `self`.
    pub fn merge(self, over: PartialConfig) -> PartialConfig {
        PartialConfig(merge_tables(self.0, over.0))
    }

    /// Fill the gaps with defaults and produce the final `Config`.
    pub fn resolve(self) -> Result<Config> {
        toml::Value::Table(self.0)
            .try_into::<Config>()
            .context("invalid settings")
    }
}

fn merge_tables(mut base: toml::Table, over: toml::Table) -> toml::Table {
    for (key, value) in over {
        let merged = match (base.remove(&key), value) {
            (Some(toml::Value::Table(b)), toml::Value::Table(o)) => {
                toml::Value::Table(merge_tables(b, o))
            },
            (_, v) => v,
        };
        base.insert(key, merged);
    }
    base
}

/// Read `path` as a settings layer.
///
/// Returns `Ok(None)` if the file does not exist, and an error if it exists
/// but cannot be read or is not valid TOML.
pub fn parse_partial(path: &Path) -> Result<Option<PartialConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let table: toml::Table =
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(PartialConfig(table)))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
