//! `restic-front init <repo>`: create a new repository.

use tracing::info;

use super::Context;
use crate::{env::Password, error::Result, repo::IntoRepo, runner::build_init_args};

/// Initialise the repository at `repo`.  No recovery: any failure is returned
/// as-is.
pub fn init(ctx: &Context<'_>, repo: impl IntoRepo, password: &Password) -> Result<()> {
    let repo = ctx.resolve(repo)?;
    info!(repo = %repo, kind = repo.kind(), password = %password.describe(), "initializing repository");

    ctx.run("Init", &ctx.restic(build_init_args(), &repo, password))?;

    info!(repo = %repo, "initialized repository");
    Ok(())
}
