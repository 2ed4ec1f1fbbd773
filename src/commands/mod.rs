//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File          | Invocation                         | restic call              |
//! |---------------|------------------------------------|--------------------------|
//! | `init.rs`     | `restic-front init <repo>`         | `restic init`            |
//! | `backup.rs`   | `restic-front backup <path> <repo>`| `restic backup` (+forget)|
//! | `forget.rs`   | `restic-front forget <repo>`       | `restic forget`          |
//! | `restore.rs`  | `restic-front restore <repo> <dst>`| `restic restore`         |
//!
//! Every handler resolves its repository, builds one [`Invocation`] whose
//! environment carries the repository location, Backblaze keys and password,
//! and hands it to the [`Executor`].  The environment lives and dies with that
//! invocation.

pub mod backup;
pub mod forget;
pub mod init;
pub mod restore;

pub use backup::backup;
pub use forget::forget;
pub use init::init;
pub use restore::restore;

use crate::{
    cli::{Cli, SecretArgs, Subcommand},
    config::Config,
    env::{Password, password_env, repository_env},
    error::{Error, Result},
    repo::{Credentials, IntoRepo, Repo, parse_repo_with},
    runner::Invocation,
    ui::{Executor, StageOutcome},
};

// ─── Context ──────────────────────────────────────────────────────────────────

/// What every command needs besides its own options.
pub struct Context<'a> {
    /// Program to run for restic.
    pub restic: String,
    /// Backblaze keys: command-line overrides layered over settings.
    pub credentials: Credentials,
    /// Treat locations matching no remote grammar as local paths.
    pub local_fallback: bool,
    pub executor: &'a dyn Executor,
}

impl<'a> Context<'a> {
    pub fn new(restic: impl Into<String>, credentials: Credentials, executor: &'a dyn Executor) -> Self {
        Self {
            restic: restic.into(),
            credentials,
            local_fallback: true,
            executor,
        }
    }

    pub fn local_fallback(mut self, enabled: bool) -> Self {
        self.local_fallback = enabled;
        self
    }

    /// Parse a location given on the command line.
    pub fn locate(&self, text: &str) -> Result<Repo> {
        parse_repo_with(text, &self.credentials, self.local_fallback)
    }

    pub fn resolve(&self, repo: impl IntoRepo) -> Result<Repo> {
        repo.into_repo(&self.credentials)
    }

    /// A restic invocation with the repository and password environment.
    pub fn restic(&self, args: Vec<String>, repo: &Repo, password: &Password) -> Invocation {
        Invocation::new(&self.restic, args)
            .with_env(repository_env(repo).extend(password_env(password)))
    }

    /// Execute `invocation`, turning a failed outcome into an [`Error`].
    pub fn run(&self, label: &str, invocation: &Invocation) -> Result<StageOutcome> {
        let outcome = self.executor.execute(label, invocation);
        if !outcome.failed() {
            return Ok(outcome);
        }
        Err(match outcome.error {
            Some(reason) => Error::Spawn {
                command: invocation.name(),
                reason,
            },
            None => Error::Subprocess {
                command: invocation.name(),
                code: outcome.code,
                stderr: outcome.stderr,
            },
        })
    }
}

// ─── Dispatch ─────────────────────────────────────────────────────────────────

/// Run the subcommand selected on the command line.
pub fn run(cli: &Cli, command: &Subcommand, cfg: &Config, executor: &dyn Executor) -> Result<()> {
    let dry_run = cli.dry_run || cfg.dry_run;
    let restic = cli.restic.clone().unwrap_or_else(|| cfg.restic.clone());

    let context = |secrets: &SecretArgs| {
        Context::new(restic.clone(), secrets.credentials(cfg), executor)
            .local_fallback(!cli.remote_only)
    };

    match command {
        Subcommand::Init(args) => {
            let ctx = context(&args.secrets);
            let repo = ctx.locate(&args.repo)?;
            init(&ctx, repo, &args.secrets.password(cfg))
        },
        Subcommand::Backup(args) => {
            let ctx = context(&args.secrets);
            let repo = ctx.locate(&args.repo)?;
            let mut options = args.apply(&cfg.backup);
            options.dry_run = dry_run;
            let mut retention = cfg.forget.clone();
            retention.dry_run = dry_run;
            backup(
                &ctx,
                &args.path,
                repo,
                &args.secrets.password(cfg),
                &options,
                &retention,
            )
        },
        Subcommand::Forget(args) => {
            let ctx = context(&args.secrets);
            let repo = ctx.locate(&args.repo)?;
            let mut options = args.apply(&cfg.forget);
            options.dry_run = dry_run;
            forget(&ctx, repo, &args.secrets.password(cfg), &options)
        },
        Subcommand::Restore(args) => {
            let ctx = context(&args.secrets);
            let repo = ctx.locate(&args.repo)?;
            let mut options = args.apply(&cfg.restore);
            options.dry_run = dry_run;
            restore(
                &ctx,
                repo,
                &args.target,
                &args.secrets.password(cfg),
                &options,
            )
        },
    }
}

// ─── Test support ─────────────────────────────────────────────────────────────
