//! colabstrap library
//!
//! Bootstraps a notebook VM: loads GitHub and Kaggle secrets into an explicit
//! environment store and credential files, and wraps `wget`, `git clone`,
//! `pip install` and `nvidia-smi` behind a mockable command executor.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod display;
pub mod download;
pub mod environment;
pub mod error;
pub mod executor;
pub mod gpu;
pub mod kaggle;
pub mod process_guard;
pub mod repo;
pub mod secrets;
pub mod tool_args;

// Re-export main types for convenience
pub use bootstrap::{Bootstrap, CloneOptions, ClonedRepo, ENV_CREDENTIAL_HELPER, SecretsSummary};
pub use config::{BootstrapConfig, CredentialMode, ToolPaths};
pub use display::{DisplayPayload, PayloadKind};
pub use download::DownloadTarget;
pub use environment::{EnvironmentState, GithubCredentials};
pub use error::{BootstrapError, Result};
pub use executor::{CommandExecutor, Invocation, RecordingExecutor, SystemExecutor, ToolOutput};
pub use gpu::GpuReport;
pub use kaggle::{CredentialFile, KaggleCredentials, WriteOutcome};
pub use repo::RepoSpec;
pub use secrets::{MaskedPrompt, SecretBundle, SecretInput, SecretSource, StaticSource};
pub use tool_args::{Tool, ToolArgs};
