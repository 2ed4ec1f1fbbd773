//! Error type shared by repository resolution and command execution.
//!
//! Configuration loading and the top-level binary use `anyhow`; everything
//! below it returns [`Error`] so callers can match on the variant (the backup
//! command needs to recognise a missing repository, for instance).

use std::{io, path::PathBuf};

use thiserror::Error;

/// Substring restic prints when the repository has not been initialised yet.
pub const MISSING_REPOSITORY: &str = "Is there a repository at the following location?";

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid repository {text:?}: {reason}")]
    Resolution { text: String, reason: &'static str },

    #[error(
        "for a Backblaze repository '{repository}', the environment variable '{variable}' must be defined"
    )]
    MissingCredential {
        repository: String,
        variable: &'static str,
    },

    #[error("{command} {}{}", describe_exit(.code), describe_stderr(.stderr))]
    Subprocess {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("failed to run {command}: {reason}")]
    Spawn { command: String, reason: String },

    #[error("normalising permissions under {}: {source}", path.display())]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this is restic reporting that no repository exists yet.
    pub fn is_missing_repository(&self) -> bool {
        matches!(self, Error::Subprocess { stderr, .. } if stderr.contains(MISSING_REPOSITORY))
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with code {c}"),
        None => "was terminated by a signal".into(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}
