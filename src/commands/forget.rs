//! `restic-front forget <repo>`: apply the retention policy.

use tracing::info;

use super::Context;
use crate::{
    config::ForgetConfig, env::Password, error::Result, repo::IntoRepo, runner::build_forget_args,
};

pub fn forget(
    ctx: &Context<'_>,
    repo: impl IntoRepo,
    password: &Password,
    options: &ForgetConfig,
) -> Result<()> {
    let repo = ctx.resolve(repo)?;
    info!(repo = %repo, prune = options.prune, dry_run = options.dry_run, "forgetting snapshots");

    ctx.run("Forget", &ctx.restic(build_forget_args(options), &repo, password))?;

    info!(repo = %repo, "finished forgetting snapshots");
    Ok(())
}
