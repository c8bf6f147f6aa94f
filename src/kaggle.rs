//! Kaggle API credentials file.
//!
//! Written to `<home>/.kaggle/kaggle.json` in the INI layout the Kaggle client
//! reads. The file is owner-only on Unix; the client warns otherwise.

use std::fs;
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::error::{BootstrapError, Result};
use crate::secrets::{KAGGLE_SECRET_ACCESS_KEY, KAGGLE_USERNAME, SecretBundle};

/// Directory under the home directory
pub const KAGGLE_DIR: &str = ".kaggle";
/// Credentials file name
pub const KAGGLE_FILE: &str = "kaggle.json";

const FILE_MODE: u32 = 0o600;

/// Kaggle username and API key.
pub struct KaggleCredentials {
    pub username: String,
    key: SecretString,
}

impl KaggleCredentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: SecretString::from(key.into()),
        }
    }

    /// Extract credentials from a bundle.
    ///
    /// Returns `Ok(None)` when no Kaggle username is present, and a validation
    /// error when the username comes without its key.
    pub fn from_bundle(bundle: &SecretBundle) -> Result<Option<Self>> {
        let Some(username) = bundle.get(KAGGLE_USERNAME) else {
            return Ok(None);
        };
        let key = bundle.get(KAGGLE_SECRET_ACCESS_KEY).ok_or_else(|| {
            BootstrapError::validation(format!(
                "{} is set but {} is missing",
                KAGGLE_USERNAME, KAGGLE_SECRET_ACCESS_KEY
            ))
        })?;
        Ok(Some(Self::new(username, key)))
    }

    /// File contents.
    pub fn render(&self) -> String {
        format!(
            "[default]\nkaggle_username = {}\nkaggle_secret_access_key = {}\n",
            self.username,
            self.key.expose_secret()
        )
    }
}

impl std::fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// What `CredentialFile::write` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// File created or replaced
    Written,
    /// File already held these credentials and overwrite was off
    Unchanged,
}

/// On-disk credentials artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialFile {
    path: PathBuf,
}

impl CredentialFile {
    /// `<home>/.kaggle/kaggle.json`
    pub fn in_home(home: &Path) -> Self {
        Self {
            path: home.join(KAGGLE_DIR).join(KAGGLE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the file (the value for `KAGGLE_CONFIG_DIR`).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// Create the directory if needed and write the credentials.
    ///
    /// Different credentials always replace the file. Without `overwrite`, a
    /// file whose content already matches is left alone.
    pub fn write(&self, creds: &KaggleCredentials, overwrite: bool) -> Result<WriteOutcome> {
        let content = creds.render();
        if !overwrite && self.holds(&content) {
            info!("Kaggle credentials at {} are up to date", self.path.display());
            return Ok(WriteOutcome::Unchanged);
        }

        fs::create_dir_all(self.dir())?;

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(FILE_MODE)
            .open(&self.path)?;
        file.write_all(content.as_bytes())?;
        // mode() only applies on creation
        fs::set_permissions(&self.path, fs::Permissions::from_mode(FILE_MODE))?;

        debug!("Wrote Kaggle credentials for user {}", creds.username);
        info!("Kaggle credentials written to {}", self.path.display());
        Ok(WriteOutcome::Written)
    }

    fn holds(&self, content: &str) -> bool {
        fs::read_to_string(&self.path).is_ok_and(|existing| existing == content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_render_ini_format() {
        let creds = KaggleCredentials::new("alice", "abc123");
        assert_eq!(
            creds.render(),
            "[default]\nkaggle_username = alice\nkaggle_secret_access_key = abc123\n"
        );
    }

    #[test]
    fn test_from_bundle_requires_key() {
        let bundle = SecretBundle::from_map([(KAGGLE_USERNAME, "alice")]);
        let err = KaggleCredentials::from_bundle(&bundle).unwrap_err();
        assert!(matches!(err, BootstrapError::Validation(_)));

        let bundle = SecretBundle::from_map([("github_user", "u")]);
        assert!(KaggleCredentials::from_bundle(&bundle).unwrap().is_none());
    }

    #[test]
    fn test_write_creates_directory_and_mode() {
        let home = tempdir().unwrap();
        let file = CredentialFile::in_home(home.path());
        let creds = KaggleCredentials::new("alice", "abc123");

        assert_eq!(file.write(&creds, false).unwrap(), WriteOutcome::Written);

        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("alice"));
        assert!(content.contains("abc123"));

        let mode = fs::metadata(file.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(file.dir(), home.path().join(".kaggle"));
    }

    #[test]
    fn test_new_credentials_replace_existing_file() {
        let home = tempdir().unwrap();
        let file = CredentialFile::in_home(home.path());

        file.write(&KaggleCredentials::new("first", "k1"), false).unwrap();
        let outcome = file.write(&KaggleCredentials::new("second", "k2"), false).unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        let content = fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("second"));
        assert!(!content.contains("first"));
    }

    #[test]
    fn test_overwrite_flag() {
        let home = tempdir().unwrap();
        let file = CredentialFile::in_home(home.path());
        let creds = KaggleCredentials::new("alice", "abc123");

        file.write(&creds, false).unwrap();
        assert_eq!(file.write(&creds, false).unwrap(), WriteOutcome::Unchanged);
        assert_eq!(file.write(&creds, true).unwrap(), WriteOutcome::Written);
    }

    #[test]
    fn test_debug_hides_key() {
        let creds = KaggleCredentials::new("alice", "abc123");
        assert!(!format!("{:?}", creds).contains("abc123"));
    }
}
