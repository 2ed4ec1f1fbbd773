//! `restic-front restore <repo> <target>`: restore a snapshot.

use std::path::Path;

use tracing::info;

use super::Context;
use crate::{
    config::RestoreConfig, env::Password, error::Result, repo::IntoRepo,
    runner::build_restore_args,
};

pub fn restore(
    ctx: &Context<'_>,
    repo: impl IntoRepo,
    target: &Path,
    password: &Password,
    options: &RestoreConfig,
) -> Result<()> {
    let repo = ctx.resolve(repo)?;
    info!(
        repo = %repo,
        snapshot = %options.snapshot,
        target = %target.display(),
        dry_run = options.dry_run,
        "restoring snapshot"
    );

    ctx.run("Restore", &ctx.restic(build_restore_args(target, options), &repo, password))?;

    info!(repo = %repo, target = %target.display(), "finished restoring snapshot");
    Ok(())
}
