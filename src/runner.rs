//! Command argument construction helpers.
//!
//! This module is responsible for *building* restic invocations.  It does
//! **not** execute anything; execution lives in [`crate::ui`] so that the
//! spinner can own the terminal while commands run.
//!
//! Keeping arg-building separate from execution means every function here is
//! pure and unit-testable without spawning any child processes.

use std::{fmt::Display, path::Path, process::Command};

use crate::{
    config::{BackupConfig, ForgetConfig, RestoreConfig},
    env::Env,
};

// ─── Invocation ───────────────────────────────────────────────────────────────

/// A fully described child process: program, arguments and the environment
/// it runs with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Env,
}

impl Invocation {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            env: Env::new(),
        }
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = self.env.extend(env);
        self
    }

    /// `program` plus its subcommand, e.g. `restic backup`, for messages.
    pub fn name(&self) -> String {
        match self.args.first() {
            Some(sub) => format!("{} {sub}", self.program),
            None => self.program.clone(),
        }
    }

    /// The command line, for debug logging.  Arguments never carry secrets.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the `Command` to spawn, environment applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        self.env.apply(&mut cmd);
        cmd
    }
}

// ─── Flag helpers ─────────────────────────────────────────────────────────────

fn flag(args: &mut Vec<String>, name: &str, on: bool) {
    if on {
        args.push(name.into());
    }
}

fn value(args: &mut Vec<String>, name: &str, v: Option<impl Display>) {
    if let Some(v) = v {
        args.extend([name.into(), v.to_string()]);
    }
}

fn each(args: &mut Vec<String>, name: &str, values: &[String]) {
    for v in values {
        args.extend([name.into(), v.clone()]);
    }
}

// ─── restic subcommands ───────────────────────────────────────────────────────

/// Arguments for `restic init`.
pub fn build_init_args() -> Vec<String> {
    vec!["init".into()]
}

/// Arguments for `restic backup … <path>`.
pub fn build_backup_args(path: &Path, o: &BackupConfig) -> Vec<String> {
    let mut args = vec!["backup".into()];
    flag(&mut args, "--dry-run", o.dry_run);
    each(&mut args, "--exclude", &o.exclude);
    each(&mut args, "--iexclude", &o.iexclude);
    value(&mut args, "--exclude-if-present", o.exclude_if_present.as_ref());
    value(&mut args, "--read-concurrency", Some(o.read_concurrency));
    each(&mut args, "--tag", &o.tags);
    args.push(path.display().to_string());
    args
}

/// Arguments for `restic forget …`.
///
/// The repack flags only mean something to prune, so they are dropped when
/// pruning is off.
pub fn build_forget_args(o: &ForgetConfig) -> Vec<String> {
    let mut args = vec!["forget".into()];
    flag(&mut args, "--dry-run", o.dry_run);
    value(&mut args, "--keep-last", o.keep_last);
    value(&mut args, "--keep-hourly", o.keep_hourly);
    value(&mut args, "--keep-daily", o.keep_daily);
    value(&mut args, "--keep-weekly", o.keep_weekly);
    value(&mut args, "--keep-monthly", o.keep_monthly);
    value(&mut args, "--keep-yearly", o.keep_yearly);
    value(&mut args, "--keep-within", o.keep_within.as_ref());
    value(&mut args, "--keep-within-hourly", o.keep_within_hourly.as_ref());
    value(&mut args, "--keep-within-daily", o.keep_within_daily.as_ref());
    value(&mut args, "--keep-within-weekly", o.keep_within_weekly.as_ref());
    value(&mut args, "--keep-within-monthly", o.keep_within_monthly.as_ref());
    value(&mut args, "--keep-within-yearly", o.keep_within_yearly.as_ref());
    each(&mut args, "--tag", &o.tags);
    if o.prune {
        args.push("--prune".into());
        flag(&mut args, "--repack-cacheable-only", o.repack_cacheable_only);
        flag(&mut args, "--repack-small", o.repack_small);
        flag(&mut args, "--repack-uncompressed", o.repack_uncompressed);
    }
    args
}

/// Arguments for `restic restore … <snapshot>`.
pub fn build_restore_args(target: &Path, o: &RestoreConfig) -> Vec<String> {
    let mut args = vec!["restore".into()];
    flag(&mut args, "--delete", o.delete);
    flag(&mut args, "--dry-run", o.dry_run);
    each(&mut args, "--exclude", &o.exclude);
    each(&mut args, "--iexclude", &o.iexclude);
    each(&mut args, "--include", &o.include);
    each(&mut args, "--iinclude", &o.iinclude);
    each(&mut args, "--tag", &o.tags);
    args.extend(["--target".into(), target.display().to_string()]);
    flag(&mut args, "--verify", o.verify);
    args.push(o.snapshot.clone());
    args
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{env::RESTIC_REPOSITORY, within::Within};

    fn backup_cfg() -> BackupConfig {
        BackupConfig {
            read_concurrency: 4,
            run_forget: true,
            exclude: vec!["**/.cache".into(), "*.tmp".into()],
            iexclude: vec!["*.ISO".into()],
            exclude_if_present: Some(".nobackup".into()),
            tags: vec!["nightly".into()],
            chmod: false,
            chown: None,
            dry_run: false,
        }
    }

    fn within(s: &str) -> Option<Within> {
        Some(s.parse().unwrap())
    }

    // ── Invocation ────────────────────────────────────────────────────────────

    #[test]
    fn name_is_program_and_subcommand() {
        let inv = Invocation::new("restic", build_init_args());
        assert_eq!(inv.name(), "restic init");
        assert_eq!(Invocation::new("chown", vec![]).name(), "chown");
    }

    #[test]
    fn command_carries_args_and_env() {
        let inv = Invocation::new("restic", build_init_args())
            .with_env(Env::new().set(RESTIC_REPOSITORY, "/r"));
        let cmd = inv.command();
        assert_eq!(cmd.get_program(), "restic");
        assert_eq!(cmd.get_args().collect::<Vec<_>>(), vec!["init"]);
        assert_eq!(cmd.get_envs().count(), 1);
    }

    #[test]
    fn command_line_preserves_paths_with_spaces() {
        let inv = Invocation::new(
            "restic",
            build_backup_args(Path::new("/mnt/my nas/src"), &BackupConfig::default()),
        );
        assert!(inv.command_line().ends_with("/mnt/my nas/src"));
        assert_eq!(inv.args.last().unwrap(), "/mnt/my nas/src");
    }

    // ── backup ────────────────────────────────────────────────────────────────

    #[test]
    fn backup_path_is_last() {
        let args = build_backup_args(Path::new("/home/alice"), &backup_cfg());
        assert_eq!(args.first().unwrap(), "backup");
        assert_eq!(args.last().unwrap(), "/home/alice");
    }

    #[test]
    fn backup_dry_run_flag() {
        let mut cfg = backup_cfg();
        assert!(!build_backup_args(Path::new("/p"), &cfg).contains(&"--dry-run".to_string()));
        cfg.dry_run = true;
        assert!(build_backup_args(Path::new("/p"), &cfg).contains(&"--dry-run".to_string()));
    }

    #[test]
    fn snapshot_backup_args() {
        insta::assert_debug_snapshot!(build_backup_args(Path::new("/home/alice"), &backup_cfg()), @r#"
        [
            "backup",
            "--exclude",
            "**/.cache",
            "--exclude",
            "*.tmp",
            "--iexclude",
            "*.ISO",
            "--exclude-if-present",
            ".nobackup",
            "--read-concurrency",
            "4",
            "--tag",
            "nightly",
            "/home/alice",
        ]
        "#);
    }

    // ── forget ────────────────────────────────────────────────────────────────

    #[test]
    fn forget_defaults_prune_and_repack_small() {
        let args = build_forget_args(&ForgetConfig::default());
        assert_eq!(args, vec!["forget", "--prune", "--repack-small"]);
    }

    #[test]
    fn forget_without_prune_drops_repack_flags() {
        let cfg = ForgetConfig {
            prune: false,
            repack_cacheable_only: true,
            repack_uncompressed: true,
            ..ForgetConfig::default()
        };
        assert_eq!(build_forget_args(&cfg), vec!["forget"]);
    }

    #[test]
    fn snapshot_forget_args_full_policy() {
        let cfg = ForgetConfig {
            keep_last: Some(3),
            keep_hourly: Some(24),
            keep_daily: Some(7),
            keep_weekly: Some(4),
            keep_monthly: Some(12),
            keep_yearly: Some(2),
            keep_within: within("1m"),
            keep_within_hourly: within("2d"),
            keep_within_daily: within("14d"),
            keep_within_weekly: within("2m"),
            keep_within_monthly: within("1y"),
            keep_within_yearly: within("10y"),
            prune: true,
            repack_cacheable_only: true,
            repack_small: true,
            repack_uncompressed: true,
            tags: vec!["nightly".into()],
            dry_run: true,
        };
        insta::assert_debug_snapshot!(build_forget_args(&cfg), @r#"
        [
            "forget",
            "--dry-run",
            "--keep-last",
            "3",
            "--keep-hourly",
            "24",
            "--keep-daily",
            "7",
            "--keep-weekly",
            "4",
            "--keep-monthly",
            "12",
            "--keep-yearly",
            "2",
            "--keep-within",
            "1m",
            "--keep-within-hourly",
            "2d",
            "--keep-within-daily",
            "14d",
            "--keep-within-weekly",
            "2m",
            "--keep-within-monthly",
            "1y",
            "--keep-within-yearly",
            "10y",
            "--tag",
            "nightly",
            "--prune",
            "--repack-cacheable-only",
            "--repack-small",
            "--repack-uncompressed",
        ]
        "#);
    }

    // ── restore ───────────────────────────────────────────────────────────────

    #[test]
    fn restore_defaults_to_latest() {
        let args = build_restore_args(Path::new("/restore"), &RestoreConfig::default());
        assert_eq!(args, vec!["restore", "--target", "/restore", "latest"]);
    }

    #[test]
    fn snapshot_restore_args_all_filters() {
        let cfg = RestoreConfig {
            delete: true,
            exclude: vec!["*.log".into()],
            iexclude: vec!["*.BAK".into()],
            include: vec!["/etc".into()],
            iinclude: vec!["/HOME".into()],
            tags: vec!["nightly".into()],
            verify: true,
            snapshot: "4bba301e".into(),
            dry_run: true,
        };
        insta::assert_debug_snapshot!(build_restore_args(Path::new("/restore"), &cfg), @r#"
        [
            "restore",
            "--delete",
            "--dry-run",
            "--exclude",
            "*.log",
            "--iexclude",
            "*.BAK",
            "--include",
            "/etc",
            "--iinclude",
            "/HOME",
            "--tag",
            "nightly",
            "--target",
            "/restore",
            "--verify",
            "4bba301e",
        ]
        "#);
    }

    #[test]
    fn snapshot_init_args() {
        insta::assert_debug_snapshot!(build_init_args(), @r#"
        [
            "init",
        ]
        "#);
    }
}
