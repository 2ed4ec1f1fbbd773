//! `restic-front backup <path> <repo>`: snapshot a path.
//!
//! # Steps
//!
//! | # | Step     | When                     |
//! |---|----------|--------------------------|
//! | 1 | chmod    | `[backup].chmod`         |
//! | 2 | chown    | `[backup].chown` is set  |
//! | 3 | backup   | always                   |
//! | 4 | forget   | `[backup].run_forget`    |
//!
//! If restic reports that there is no repository at the location, the
//! repository is initialised and the backup retried exactly once.  Any other
//! failure, or a failure of the retry, is returned unchanged.  A dry run
//! never initialises: `restic init` has no dry-run mode.

use std::path::Path;

use tracing::{info, warn};

use super::{Context, forget, init};
use crate::{
    config::{BackupConfig, ForgetConfig},
    env::Password,
    error::Result,
    perms::{chown_invocation, normalize_modes},
    repo::IntoRepo,
    runner::build_backup_args,
};

/// Back up `path` into `repo`, then apply `retention` if
/// `options.run_forget` is set.
pub fn backup(
    ctx: &Context<'_>,
    path: &Path,
    repo: impl IntoRepo,
    password: &Password,
    options: &BackupConfig,
    retention: &ForgetConfig,
) -> Result<()> {
    let repo = ctx.resolve(repo)?;
    info!(path = %path.display(), repo = %repo, kind = repo.kind(), dry_run = options.dry_run, "backing up");

    if options.chmod {
        let changed = normalize_modes(path)?;
        info!(path = %path.display(), changed, "normalized permissions");
    }
    if let Some(owner) = &options.chown {
        ctx.run("Chown", &chown_invocation(path, owner))?;
    }

    let invocation = ctx.restic(build_backup_args(path, options), &repo, password);
    match ctx.run("Backup", &invocation) {
        Ok(_) => {},
        Err(e) if e.is_missing_repository() && options.dry_run => {
            warn!(repo = %repo, "no repository at this location; not initializing during a dry run");
            return Err(e);
        },
        Err(e) if e.is_missing_repository() => {
            warn!(repo = %repo, "no repository at this location; initializing it");
            init(ctx, &repo, password)?;
            ctx.run("Backup", &invocation)?;
        },
        Err(e) => return Err(e),
    }

    if options.run_forget {
        forget(ctx, &repo, password, retention)?;
    }

    info!(path = %path.display(), repo = %repo, "finished backup");
    Ok(())
}
