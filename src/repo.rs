//! Repository descriptors and the location-string parser.
//!
//! A repository location is a single free-form string on the command line.
//! [`parse_repo`] turns it into a [`Repo`], trying each backend grammar in a
//! fixed order:
//!
//! | # | Grammar                     | Result                   |
//! |---|-----------------------------|--------------------------|
//! | 1 | `b2:<bucket>:<path>`        | [`Repo::Backblaze`]      |
//! | 2 | `sftp:<user>@<host>:<path>` | [`Repo::Sftp`]           |
//! | 3 | anything else               | [`Repo::Local`]          |
//!
//! `bucket`, `user` and `host` may not contain `@` or `:`.  The SFTP path may
//! not contain either; the B2 path may contain `:` but not `@`.  Matching is
//! anchored at both ends and case-sensitive.
//!
//! Backblaze credentials never appear in the location string.  They come from
//! [`Credentials`], which the caller assembles from command-line overrides
//! and settings; a B2 location without both keys is an error rather than a
//! fall-through to `Local`.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::{
    error::{Error, Result},
    secret::Secret,
};

/// Environment variable that supplies the Backblaze key ID.
pub const BACKBLAZE_KEY_ID: &str = "BACKBLAZE_KEY_ID";
/// Environment variable that supplies the Backblaze application key.
pub const BACKBLAZE_APPLICATION_KEY: &str = "BACKBLAZE_APPLICATION_KEY";

// ─── Descriptors ──────────────────────────────────────────────────────────────

/// A resolved backup destination.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Repo {
    Local(Local),
    Sftp(Sftp),
    Backblaze(Backblaze),
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Local {
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sftp {
    pub user: String,
    pub hostname: String,
    pub path: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Backblaze {
    pub key_id: Secret,
    pub application_key: Secret,
    pub bucket: String,
    pub path: PathBuf,
}

impl Local {
    pub fn repository(&self) -> String {
        self.path.display().to_string()
    }
}

impl Sftp {
    pub fn repository(&self) -> String {
        format!("sftp:{}@{}:{}", self.user, self.hostname, self.path.display())
    }
}

impl Backblaze {
    pub fn repository(&self) -> String {
        format!("b2:{}:{}", self.bucket, self.path.display())
    }
}

impl Repo {
    /// Canonical location string, as accepted by [`parse_repo`] and restic.
    pub fn repository(&self) -> String {
        match self {
            Repo::Local(r) => r.repository(),
            Repo::Sftp(r) => r.repository(),
            Repo::Backblaze(r) => r.repository(),
        }
    }

    /// Short backend name for log lines.
    pub const fn kind(&self) -> &'static str {
        match self {
            Repo::Local(_) => "local",
            Repo::Sftp(_) => "sftp",
            Repo::Backblaze(_) => "b2",
        }
    }
}

impl fmt::Display for Repo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repository())
    }
}

// ─── Credentials ──────────────────────────────────────────────────────────────

/// Backblaze keys available to the parser.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Credentials {
    pub key_id: Option<Secret>,
    pub application_key: Option<Secret>,
}

impl Credentials {
    /// Empty values are dropped, so they fail the credential check like
    /// missing ones.
    pub fn new(key_id: Option<Secret>, application_key: Option<Secret>) -> Self {
        let present = |s: &Secret| !s.expose().is_empty();
        Self {
            key_id: key_id.filter(present),
            application_key: application_key.filter(present),
        }
    }

    /// Per-field fallback: values set on `self` win over `fallback`.
    pub fn or(self, fallback: &Credentials) -> Credentials {
        Credentials {
            key_id: self.key_id.or_else(|| fallback.key_id.clone()),
            application_key: self
                .application_key
                .or_else(|| fallback.application_key.clone()),
        }
    }
}

// ─── Parser ───────────────────────────────────────────────────────────────────

/// Resolve a location string into a [`Repo`].
///
/// Total over its input: anything that is not a Backblaze or SFTP location,
/// the empty string included, is a local path.  The only failure is a
/// Backblaze location whose credentials are unavailable.
pub fn parse_repo(text: &str, credentials: &Credentials) -> Result<Repo> {
    parse_repo_with(text, credentials, true)
}

/// [`parse_repo`] with the local fallback switchable.  With `local_fallback`
/// off, a string matching neither remote grammar is a [`Error::Resolution`].
pub fn parse_repo_with(text: &str, credentials: &Credentials, local_fallback: bool) -> Result<Repo> {
    if let Some((bucket, path)) = match_backblaze(text) {
        let missing = |variable| Error::MissingCredential {
            repository: text.into(),
            variable,
        };
        let key_id = credentials
            .key_id
            .clone()
            .ok_or_else(|| missing(BACKBLAZE_KEY_ID))?;
        let application_key = credentials
            .application_key
            .clone()
            .ok_or_else(|| missing(BACKBLAZE_APPLICATION_KEY))?;
        return Ok(Repo::Backblaze(Backblaze {
            key_id,
            application_key,
            bucket: bucket.into(),
            path: PathBuf::from(path),
        }));
    }

    if let Some((user, hostname, path)) = match_sftp(text) {
        return Ok(Repo::Sftp(Sftp {
            user: user.into(),
            hostname: hostname.into(),
            path: PathBuf::from(path),
        }));
    }

    if !local_fallback {
        return Err(Error::Resolution {
            text: text.into(),
            reason: "expected b2:<bucket>:<path> or sftp:<user>@<host>:<path>",
        });
    }

    Ok(Repo::Local(Local {
        path: PathBuf::from(text),
    }))
}

/// `b2:<bucket>:<path>` → `(bucket, path)`.
fn match_backblaze(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("b2:")?;
    // The bucket cannot contain ':', so the first one ends it.
    let (bucket, path) = rest.split_once(':')?;
    (is_segment(bucket) && !path.is_empty() && !path.contains('@')).then_some((bucket, path))
}

/// `sftp:<user>@<hostname>:<path>` → `(user, hostname, path)`.
fn match_sftp(text: &str) -> Option<(&str, &str, &str)> {
    let rest = text.strip_prefix("sftp:")?;
    let (user, rest) = rest.split_once('@')?;
    let (hostname, path) = rest.split_once(':')?;
    [user, hostname, path]
        .iter()
        .all(|s| is_segment(s))
        .then_some((user, hostname, path))
}

fn is_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains(['@', ':'])
}

// ─── Idempotent resolution ────────────────────────────────────────────────────

/// Anything that can stand where a repository is expected.
///
/// Already-resolved values pass through untouched, so re-resolving a
/// [`Repo`] is a no-op.
pub trait IntoRepo {
    fn into_repo(self, credentials: &Credentials) -> Result<Repo>;
}

impl IntoRepo for Repo {
    fn into_repo(self, _: &Credentials) -> Result<Repo> {
        Ok(self)
    }
}

impl IntoRepo for &Repo {
    fn into_repo(self, _: &Credentials) -> Result<Repo> {
        Ok(self.clone())
    }
}

impl IntoRepo for &str {
    fn into_repo(self, credentials: &Credentials) -> Result<Repo> {
        parse_repo(self, credentials)
    }
}

impl IntoRepo for String {
    fn into_repo(self, credentials: &Credentials) -> Result<Repo> {
        parse_repo(&self, credentials)
    }
}

impl IntoRepo for &Path {
    fn into_repo(self, _: &Credentials) -> Result<Repo> {
        Ok(Repo::Local(Local { path: self.into() }))
    }
}

impl IntoRepo for PathBuf {
    fn into_repo(self, _: &Credentials) -> Result<Repo> {
        Ok(Repo::Local(Local { path: self }))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn creds(key_id: &str, application_key: &str) -> Credentials {
        Credentials::new(Some(key_id.into()), Some(application_key.into()))
    }

    fn local(path: &str) -> Repo {
        Repo::Local(Local { path: path.into() })
    }

    // ── scenarios ─────────────────────────────────────────────────────────────

    #[test]
    fn sftp_location_parses_and_renders() {
        let repo = parse_repo("sftp:alice@box:/data", &Credentials::default()).unwrap();
        assert_eq!(
            repo,
            Repo::Sftp(Sftp {
                user: "alice".into(),
                hostname: "box".into(),
                path: "/data".into(),
            })
        );
        assert_eq!(repo.repository(), "sftp:alice@box:/data");
    }

    #[test]
    fn backblaze_location_uses_credentials() {
        let repo = parse_repo("b2:bucket1:snap", &creds("k", "a")).unwrap();
        assert_eq!(
            repo,
            Repo::Backblaze(Backblaze {
                key_id: "k".into(),
                application_key: "a".into(),
                bucket: "bucket1".into(),
                path: "snap".into(),
            })
        );
    }

    #[test]
    fn backblaze_without_key_id_names_key_id() {
        let err = parse_repo("b2:bucket1:snap", &Credentials::default()).unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCredential { variable: BACKBLAZE_KEY_ID, .. }
        ));
        assert!(err.to_string().contains("BACKBLAZE_KEY_ID"));
    }

    #[test]
    fn backblaze_without_application_key_names_application_key() {
        let c = Credentials::new(Some("k".into()), None);
        let err = parse_repo("b2:mybucket:some/path", &c).unwrap_err();
        assert!(err.to_string().contains("BACKBLAZE_APPLICATION_KEY"));
        assert!(!err.to_string().contains("BACKBLAZE_KEY_ID'"));
    }

    #[test]
    fn backblaze_error_does_not_leak_key_id() {
        let c = Credentials::new(Some("sup3r-s3cret".into()), None);
        let err = parse_repo("b2:mybucket:some/path", &c).unwrap_err();
        assert!(!err.to_string().contains("sup3r-s3cret"));
        assert!(!format!("{err:?}").contains("sup3r-s3cret"));
    }

    #[test]
    fn local_path_parses() {
        assert_eq!(
            parse_repo("/var/backups", &Credentials::default()).unwrap(),
            local("/var/backups")
        );
    }

    #[test]
    fn empty_credentials_count_as_missing() {
        let c = Credentials::new(Some("".into()), Some("app".into()));
        let err = parse_repo("b2:bucket:path", &c).unwrap_err();
        assert!(matches!(err, Error::MissingCredential { variable: BACKBLAZE_KEY_ID, .. }));

        let c = Credentials::new(Some("kid".into()), Some("".into()));
        let err = parse_repo("b2:bucket:path", &c).unwrap_err();
        assert!(matches!(err, Error::MissingCredential { variable: BACKBLAZE_APPLICATION_KEY, .. }));
    }

    #[test]
    fn empty_location_is_local() {
        assert_eq!(parse_repo("", &Credentials::default()).unwrap(), local(""));
    }

    #[test]
    fn without_local_fallback_plain_paths_are_rejected() {
        for text in ["", "/var/backups", "sftp:alice@box", "b2:bucket"] {
            let err = parse_repo_with(text, &Credentials::default(), false).unwrap_err();
            assert!(matches!(err, Error::Resolution { .. }), "{text:?}");
        }
    }

    #[test]
    fn without_local_fallback_remotes_still_resolve() {
        let repo = parse_repo_with("sftp:alice@box:/data", &Credentials::default(), false).unwrap();
        assert_eq!(repo.kind(), "sftp");
        let err = parse_repo_with("b2:bucket:path", &Credentials::default(), false).unwrap_err();
        assert!(matches!(err, Error::MissingCredential { .. }));
    }

    // ── grammar edges ─────────────────────────────────────────────────────────

    #[test]
    fn strings_containing_b2_fall_through_to_local() {
        for text in ["b2", "b2:", "b2:bucket", "b2::path", "b2:bu@cket:path", "b2:bucket:pa@th", "my-b2-backups"] {
            assert_eq!(parse_repo(text, &Credentials::default()).unwrap(), local(text), "{text}");
        }
    }

    #[test]
    fn backblaze_path_may_contain_colon() {
        let repo = parse_repo("b2:bucket:a:b", &creds("k", "a")).unwrap();
        let Repo::Backblaze(b2) = repo else {
            panic!("expected Backblaze, got {repo:?}");
        };
        assert_eq!(b2.bucket, "bucket");
        assert_eq!(b2.path, PathBuf::from("a:b"));
    }

    #[test]
    fn malformed_sftp_falls_through_to_local() {
        for text in ["sftp:", "sftp:host:/p", "sftp:@host:/p", "sftp:u@:/p", "sftp:u@h:", "sftp:u@h:/a:b", "sftp:u@h@x:/p"] {
            assert_eq!(parse_repo(text, &Credentials::default()).unwrap(), local(text), "{text}");
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(
            parse_repo("B2:bucket:path", &creds("k", "a")).unwrap(),
            local("B2:bucket:path")
        );
        assert_eq!(
            parse_repo("SFTP:u@h:/p", &Credentials::default()).unwrap(),
            local("SFTP:u@h:/p")
        );
    }

    #[test]
    fn sftp_needs_no_credentials() {
        assert!(matches!(
            parse_repo("sftp:u@h:/p", &Credentials::default()).unwrap(),
            Repo::Sftp(_)
        ));
    }

    // ── credentials ───────────────────────────────────────────────────────────

    #[test]
    fn override_wins_over_settings() {
        let settings = creds("from-settings", "app-from-settings");
        let merged = Credentials::new(Some("from-cli".into()), None).or(&settings);
        assert_eq!(merged.key_id, Some("from-cli".into()));
        assert_eq!(merged.application_key, Some("app-from-settings".into()));
    }

    // ── idempotence ───────────────────────────────────────────────────────────

    #[test]
    fn resolved_repo_passes_through() {
        let repo = parse_repo("b2:bucket:path", &creds("k", "a")).unwrap();
        // No credentials needed the second time round.
        assert_eq!(repo.clone().into_repo(&Credentials::default()).unwrap(), repo);
        assert_eq!((&repo).into_repo(&Credentials::default()).unwrap(), repo);
    }

    #[test]
    fn paths_resolve_to_local_without_parsing() {
        let p = PathBuf::from("sftp:u@h:/p");
        assert_eq!(p.clone().into_repo(&Credentials::default()).unwrap(), local("sftp:u@h:/p"));
        assert_eq!(p.as_path().into_repo(&Credentials::default()).unwrap(), local("sftp:u@h:/p"));
    }

    #[test]
    fn kind_names_backend() {
        assert_eq!(local("/r").kind(), "local");
        assert_eq!(parse_repo("sftp:u@h:/p", &Credentials::default()).unwrap().kind(), "sftp");
    }

    #[test]
    fn debug_never_shows_keys() {
        let repo = parse_repo("b2:bucket:path", &creds("KEYID123", "APPKEY456")).unwrap();
        let dbg = format!("{repo:?}");
        assert!(!dbg.contains("KEYID123"));
        assert!(!dbg.contains("APPKEY456"));
        assert!(dbg.contains("bucket"));
    }

    // ── laws ──────────────────────────────────────────────────────────────────

    fn segment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9._-]{1,12}"
    }

    fn rel_path() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,8}(/[A-Za-z0-9_.-]{1,8}){0,3}"
    }

    proptest! {
        #[test]
        fn sftp_round_trips(user in segment(), hostname in segment(), path in rel_path(), absolute in any::<bool>()) {
            let path = if absolute { format!("/{path}") } else { path };
            let repo = Repo::Sftp(Sftp { user, hostname, path: path.into() });
            prop_assert_eq!(parse_repo(&repo.repository(), &Credentials::default()).unwrap(), repo);
        }

        #[test]
        fn backblaze_round_trips(key_id in "[!-~]{1,16}", application_key in "[!-~]{1,16}", bucket in segment(), path in rel_path()) {
            let repo = Repo::Backblaze(Backblaze {
                key_id: key_id.clone().into(),
                application_key: application_key.clone().into(),
                bucket,
                path: path.into(),
            });
            let c = Credentials::new(Some(key_id.into()), Some(application_key.into()));
            prop_assert_eq!(parse_repo(&repo.repository(), &c).unwrap(), repo);
        }

        #[test]
        fn local_round_trips(path in rel_path()) {
            let repo = Repo::Local(Local { path: format!("/{path}").into() });
            prop_assert_eq!(parse_repo(&repo.repository(), &Credentials::default()).unwrap(), repo);
        }

        #[test]
        fn unprefixed_text_is_local(text in "([^bs][ -~]{0,30})?") {
            let parsed = parse_repo(&text, &Credentials::default()).unwrap();
            prop_assert_eq!(parsed, Repo::Local(Local { path: text.clone().into() }));
        }
    }
}
