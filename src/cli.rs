use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::display::PayloadKind;

/// colabstrap - bootstrap credentials and tooling in a notebook VM
#[derive(Parser)]
#[command(name = "colabstrap")]
#[command(about = "Load GitHub/Kaggle secrets and wrap wget, git clone and pip install")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print the commands that would run without running them.
    ///
    /// Credential files are not written in this mode.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Secrets as a JSON string
    #[arg(long, global = true, env = "COLABSTRAP_SECRETS", hide_env_values = true)]
    pub secrets: Option<String>,

    /// Read the secrets JSON from a file
    #[arg(long, global = true, conflicts_with = "secrets")]
    pub secrets_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load secrets into credential files and the git config
    Secrets {
        /// Replace an existing Kaggle credentials file
        #[arg(long)]
        overwrite: bool,
        /// Print `export` lines for the configured variables (unmasked)
        #[arg(long)]
        emit_env: bool,
    },
    /// Download one or more URLs
    Download {
        #[arg(required = true)]
        urls: Vec<String>,
        /// Suppress download progress
        #[arg(short, long)]
        silent: bool,
    },
    /// Clone one or more repositories (org/repo[@rev])
    Clone {
        #[arg(required = true)]
        repos: Vec<String>,
        /// Shallow clone depth
        #[arg(long)]
        depth: Option<u32>,
        /// Suppress git progress
        #[arg(short, long)]
        quiet: bool,
        /// Parent directory for checkouts
        #[arg(long)]
        dest: Option<PathBuf>,
    },
    /// Install packages; org/repo[@rev] entries are cloned first
    Install {
        #[arg(required = true)]
        packages: Vec<String>,
        /// Suppress installer output
        #[arg(short, long)]
        silent: bool,
        /// Reinstall even if already present
        #[arg(short, long)]
        force: bool,
    },
    /// Print GPU name and memory usage
    Gpu,
    /// Print a notebook display_data bundle for a payload
    Display {
        /// json, html, markdown or heading
        kind: PayloadKind,
        /// Payload text (JSON source for `json`)
        payload: String,
        /// Heading level (1-6)
        #[arg(short, long, default_value = "1")]
        level: u8,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
