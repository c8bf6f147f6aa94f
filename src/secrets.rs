//! Secret bundle parsing and secret sources.
//!
//! A [`SecretBundle`] is the JSON-derived mapping of credential key/value
//! pairs. Values are held as [`SecretString`] so that `Debug` output and log
//! lines never carry them. Where the bundle comes from is pluggable through
//! [`SecretSource`]: a masked terminal prompt for interactive sessions, or a
//! fixed value for headless runs and tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use secrecy::{ExposeSecret, SecretString};

use crate::error::{BootstrapError, Result};

/// GitHub username key
pub const GITHUB_USER: &str = "github_user";
/// GitHub personal access token key
pub const GITHUB_PAT: &str = "github_pat";
/// Kaggle username key
pub const KAGGLE_USERNAME: &str = "kaggle_username";
/// Kaggle API key
pub const KAGGLE_SECRET_ACCESS_KEY: &str = "kaggle_secret_access_key";

/// Prompt shown when secrets are read interactively
pub const SECRETS_PROMPT: &str = "Secrets (JSON string): ";

/// Mapping of secret names to values.
#[derive(Default)]
pub struct SecretBundle {
    values: BTreeMap<String, SecretString>,
}

impl SecretBundle {
    /// Parse a JSON object of string values. Blank input yields an empty bundle.
    pub fn from_json(input: &str) -> Result<Self> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        let map: HashMap<String, String> = serde_json::from_str(input)?;
        Ok(Self::from_map(map))
    }

    /// Build a bundle from an already-parsed mapping.
    pub fn from_map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let values = entries
            .into_iter()
            .map(|(k, v)| (k.into(), SecretString::from(v.into())))
            .collect();
        Self { values }
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|v| v.expose_secret())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Key names in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBundle")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Ways a caller can hand secrets to `load_secrets`.
pub enum SecretInput {
    /// JSON-encoded object
    Json(String),
    /// Pre-parsed mapping
    Map(HashMap<String, String>),
    /// Ask the configured [`SecretSource`]
    Prompt,
}

impl SecretInput {
    /// True when the input carries no secrets and the source must be asked.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Json(s) => s.trim().is_empty(),
            Self::Map(m) => m.is_empty(),
            Self::Prompt => true,
        }
    }
}

impl From<&str> for SecretInput {
    fn from(value: &str) -> Self {
        Self::Json(value.to_string())
    }
}

impl From<String> for SecretInput {
    fn from(value: String) -> Self {
        Self::Json(value)
    }
}

impl From<HashMap<String, String>> for SecretInput {
    fn from(value: HashMap<String, String>) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<SecretInput>> From<Option<T>> for SecretInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Prompt, Into::into)
    }
}

/// Capability for obtaining the secrets JSON when none was supplied.
pub trait SecretSource {
    /// Read one line of secret text. An empty answer is valid.
    fn read_secret(&mut self, prompt: &str) -> Result<String>;
}

/// Supplies a fixed answer. For headless runs and tests.
#[derive(Default)]
pub struct StaticSource {
    answer: Option<SecretString>,
}

impl StaticSource {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(SecretString::from(answer.into())),
        }
    }

    /// A source that always answers with an empty string.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl SecretSource for StaticSource {
    fn read_secret(&mut self, _prompt: &str) -> Result<String> {
        Ok(self
            .answer
            .as_ref()
            .map(|a| a.expose_secret().to_string())
            .unwrap_or_default())
    }
}

/// Masked terminal prompt.
///
/// On a TTY the line is read in raw mode with no echo. When stdin is not a
/// terminal (piped input, notebook subprocess) a plain line is read instead.
#[derive(Debug, Default)]
pub struct MaskedPrompt;

impl SecretSource for MaskedPrompt {
    fn read_secret(&mut self, prompt: &str) -> Result<String> {
        let mut stderr = io::stderr();
        write!(stderr, "{}", prompt)?;
        stderr.flush()?;

        if !io::stdin().is_terminal() {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            return Ok(line.trim_end_matches(['\r', '\n']).to_string());
        }

        terminal::enable_raw_mode()?;
        let result = read_masked_line();
        // Restore the terminal before surfacing any read error
        let restored = terminal::disable_raw_mode();
        writeln!(stderr)?;
        restored?;
        result
    }
}

fn read_masked_line() -> Result<String> {
    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code,
            modifiers,
            kind,
            ..
        }) = event::read()?
        else {
            continue;
        };
        if kind != KeyEventKind::Press {
            continue;
        }
        match code {
            KeyCode::Enter => return Ok(buf),
            KeyCode::Backspace => {
                buf.pop();
            }
            KeyCode::Esc => return Err(BootstrapError::prompt("aborted")),
            KeyCode::Char('c') | KeyCode::Char('d') if modifiers.contains(KeyModifiers::CONTROL) => {
                return Err(BootstrapError::prompt("interrupted"));
            }
            KeyCode::Char(c) => buf.push(c),
            _ => {}
        }
    }
}
