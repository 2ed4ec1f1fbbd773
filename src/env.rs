//! Child-process environments for restic.
//!
//! restic reads the repository location and its credentials from environment
//! variables.  Rather than mutating this process's environment around each
//! call, the variables for one invocation are collected in an [`Env`] and
//! applied to that invocation's [`Command`] only.  Nothing leaks into the
//! parent process and nothing needs restoring afterwards, whichever way the
//! call ends.
//!
//! | Repo        | Variables                                                |
//! |-------------|----------------------------------------------------------|
//! | `Local`     | `RESTIC_REPOSITORY=<path>`                               |
//! | `Sftp`      | `RESTIC_REPOSITORY=sftp:<user>@<host>:<path>`            |
//! | `Backblaze` | `B2_ACCOUNT_ID`, `B2_ACCOUNT_KEY`, `RESTIC_REPOSITORY`   |

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    path::{Path, PathBuf},
    process::Command,
};

use zeroize::Zeroizing;

use crate::{repo::Repo, secret::Secret};

pub const RESTIC_REPOSITORY: &str = "RESTIC_REPOSITORY";
pub const RESTIC_PASSWORD: &str = "RESTIC_PASSWORD";
pub const RESTIC_PASSWORD_FILE: &str = "RESTIC_PASSWORD_FILE";
pub const B2_ACCOUNT_ID: &str = "B2_ACCOUNT_ID";
pub const B2_ACCOUNT_KEY: &str = "B2_ACCOUNT_KEY";

// ─── Env ──────────────────────────────────────────────────────────────────────

/// Value of a single variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnvValue {
    Plain(String),
    Secret(Secret),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Plain(v) => f.write_str(v),
            EnvValue::Secret(s) => fmt::Display::fmt(s, f),
        }
    }
}

/// Variables to set on, and remove from, one child process.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Env {
    set: BTreeMap<&'static str, EnvValue>,
    remove: BTreeSet<&'static str>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.remove.remove(name);
        self.set.insert(name, EnvValue::Plain(value.into()));
        self
    }

    pub fn set_secret(mut self, name: &'static str, value: Secret) -> Self {
        self.remove.remove(name);
        self.set.insert(name, EnvValue::Secret(value));
        self
    }

    /// Make sure `name` is absent in the child even if this process has it.
    pub fn remove(mut self, name: &'static str) -> Self {
        self.set.remove(name);
        self.remove.insert(name);
        self
    }

    /// Layer `other` on top of `self`; `other` wins on conflicts.
    pub fn extend(mut self, other: Env) -> Self {
        for name in other.remove {
            self = self.remove(name);
        }
        for (name, value) in other.set {
            self.remove.remove(name);
            self.set.insert(name, value);
        }
        self
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&EnvValue> {
        self.set.get(name)
    }

    #[cfg(test)]
    pub fn is_removed(&self, name: &str) -> bool {
        self.remove.contains(name)
    }

    /// Names of the variables this environment sets.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.set.keys().copied()
    }

    /// Install the variables on `cmd`.  This is where secrets are revealed.
    pub fn apply(&self, cmd: &mut Command) {
        for name in &self.remove {
            cmd.env_remove(name);
        }
        for (name, value) in &self.set {
            match value {
                EnvValue::Plain(v) => {
                    cmd.env(name, v);
                },
                EnvValue::Secret(s) => {
                    let revealed = Zeroizing::new(s.expose().to_owned());
                    cmd.env(name, revealed.as_str());
                },
            }
        }
    }
}

// ─── Repository ───────────────────────────────────────────────────────────────

/// Variables restic needs to reach `repo`.
pub fn repository_env(repo: &Repo) -> Env {
    let env = Env::new().set(RESTIC_REPOSITORY, repo.repository());
    match repo {
        Repo::Local(_) | Repo::Sftp(_) => env,
        Repo::Backblaze(b2) => env
            .set_secret(B2_ACCOUNT_ID, b2.key_id.clone())
            .set_secret(B2_ACCOUNT_KEY, b2.application_key.clone()),
    }
}

// ─── Password ─────────────────────────────────────────────────────────────────

/// Where the repository password comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Password {
    /// Always passed as the password itself.
    Inline(Secret),
    /// Always passed as a password file.
    File(PathBuf),
    /// A raw user-supplied value: a password file if it names an existing
    /// regular file when the command runs, the password itself otherwise.
    Auto(Secret),
}

impl Password {
    /// Short description for log lines; never includes the password.
    pub fn describe(&self) -> String {
        match self {
            Password::Inline(_) | Password::Auto(_) => "inline password".into(),
            Password::File(path) => format!("password file {}", path.display()),
        }
    }
}

/// Variables restic needs to unlock the repository.
///
/// Exactly one of `RESTIC_PASSWORD` / `RESTIC_PASSWORD_FILE` is set; the
/// other is removed so an inherited value cannot take precedence.
pub fn password_env(password: &Password) -> Env {
    match password {
        Password::Inline(secret) => inline(secret),
        Password::File(path) => file(path),
        Password::Auto(value) => {
            let candidate = Path::new(value.expose());
            if candidate.is_file() {
                file(candidate)
            } else {
                inline(value)
            }
        },
    }
}

fn inline(secret: &Secret) -> Env {
    Env::new()
        .set_secret(RESTIC_PASSWORD, secret.clone())
        .remove(RESTIC_PASSWORD_FILE)
}

fn file(path: &Path) -> Env {
    Env::new()
        .set(RESTIC_PASSWORD_FILE, path.display().to_string())
        .remove(RESTIC_PASSWORD)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
