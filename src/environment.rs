//! Explicit environment store for credential variables.
//!
//! The configurator keeps `GH_USER`, `GH_PAT`, `GITHUB_TOKEN` and
//! `KAGGLE_CONFIG_DIR` here instead of mutating the process environment.
//! Child commands receive the variables they need from this store.
//! [`EnvironmentState::export_to_process`] is the only way the store reaches
//! the process environment, for tools spawned outside the executor (git run
//! by pip, the global credential helper).

use std::collections::BTreeMap;
use std::fmt;

/// GitHub username
pub const GH_USER: &str = "GH_USER";
/// GitHub token read by the credential helper
pub const GH_PAT: &str = "GH_PAT";
/// GitHub token read by `gh` and most tooling
pub const GITHUB_TOKEN: &str = "GITHUB_TOKEN";
/// Directory holding `kaggle.json`
pub const KAGGLE_CONFIG_DIR: &str = "KAGGLE_CONFIG_DIR";

/// Variables this crate reads and writes.
pub const KNOWN_KEYS: [&str; 4] = [GH_USER, GH_PAT, GITHUB_TOKEN, KAGGLE_CONFIG_DIR];

/// Variables whose values must never be printed.
pub const SECRET_KEYS: [&str; 2] = [GH_PAT, GITHUB_TOKEN];

/// Placeholder printed instead of secret values
pub const REDACTED: &str = "***";

/// Whether a variable holds secret material.
pub fn is_secret_key(key: &str) -> bool {
    SECRET_KEYS.contains(&key)
}

/// State of the GitHub credentials in the store.
#[derive(Clone, PartialEq, Eq)]
pub enum GithubCredentials<'a> {
    /// Neither username nor token set
    Absent,
    /// Both set
    Complete { user: &'a str, token: &'a str },
    /// One of the two is missing
    Incomplete { missing: &'static str },
}

impl fmt::Debug for GithubCredentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "Absent"),
            Self::Complete { user, .. } => write!(f, "Complete {{ user: {:?}, token: {} }}", user, REDACTED),
            Self::Incomplete { missing } => write!(f, "Incomplete {{ missing: {} }}", missing),
        }
    }
}

/// Process-wide key/value store, made explicit.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct EnvironmentState {
    vars: BTreeMap<String, String>,
}

impl EnvironmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with the known variables from the current process.
    pub fn from_process() -> Self {
        let vars = KNOWN_KEYS
            .iter()
            .filter_map(|&key| {
                std::env::var(key)
                    .ok()
                    .filter(|v| !v.is_empty())
                    .map(|v| (key.to_string(), v))
            })
            .collect();
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.vars.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Inspect the GitHub username/token pair.
    pub fn github_credentials(&self) -> GithubCredentials<'_> {
        match (self.get(GH_USER), self.get(GH_PAT)) {
            (None, None) => GithubCredentials::Absent,
            (Some(user), Some(token)) => GithubCredentials::Complete { user, token },
            (Some(_), None) => GithubCredentials::Incomplete { missing: GH_PAT },
            (None, Some(_)) => GithubCredentials::Incomplete { missing: GH_USER },
        }
    }

    /// `export KEY='value'` lines for `eval` in a shell. Values are NOT masked.
    pub fn shell_exports(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(k, v)| format!("export {}='{}'", k, v.replace('\'', "'\\''")))
            .collect()
    }

    /// Copy every variable into the current process environment.
    ///
    /// # Safety
    ///
    /// No other thread may read or write the process environment while this
    /// runs (see [`std::env::set_var`]).
    pub unsafe fn export_to_process(&self) {
        for (key, value) in &self.vars {
            // SAFETY: upheld by the caller
            unsafe { std::env::set_var(key, value) };
        }
    }

    /// `KEY=value` lines with secret values masked, for display.
    pub fn redacted_lines(&self) -> Vec<String> {
        self.vars
            .iter()
            .map(|(k, v)| {
                if is_secret_key(k) {
                    format!("{}={}", k, REDACTED)
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect()
    }
}

impl fmt::Debug for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.redacted_lines()).finish()
    }
}
