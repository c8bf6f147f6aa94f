//! The bootstrap configurator.
//!
//! [`Bootstrap`] owns the configuration, the explicit environment store and
//! a [`CommandExecutor`]. Each operation is a one-shot, side-effecting call;
//! the only state carried between calls is the environment store.
//!
//! Download, clone and install attempt every item once and keep going when a
//! tool fails: failures are logged, earlier successes stay in place.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{BootstrapConfig, CredentialMode};
use crate::download::DownloadTarget;
use crate::environment::{
    EnvironmentState, GH_PAT, GH_USER, GITHUB_TOKEN, GithubCredentials, KAGGLE_CONFIG_DIR,
};
use crate::error::{BootstrapError, Result};
use crate::executor::{CommandExecutor, Invocation, SystemExecutor, ToolOutput};
use crate::gpu::GpuReport;
use crate::kaggle::{CredentialFile, KaggleCredentials, WriteOutcome};
use crate::repo::{RepoSpec, is_repo_reference};
use crate::secrets::{
    GITHUB_PAT, GITHUB_USER, MaskedPrompt, SECRETS_PROMPT, SecretBundle, SecretInput, SecretSource,
};
use crate::tool_args::{
    GitCheckoutArgs, GitCloneArgs, GitConfigArgs, GpuQueryArgs, PipInstallArgs, ToolArgs, WgetArgs,
};

/// Credential helper that answers git with `GH_USER`/`GH_PAT` from its environment
pub const ENV_CREDENTIAL_HELPER: &str =
    r#"!f() { printf "%s\n" "username=$GH_USER" "password=$GH_PAT"; };f"#;

/// What `load_secrets` applied. Holds no secret values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretsSummary {
    pub github_user: bool,
    pub github_token: bool,
    /// Global git credential helper registered
    pub credential_helper: bool,
    /// Kaggle credentials file outcome, if Kaggle keys were supplied
    pub kaggle: Option<WriteOutcome>,
}

impl fmt::Display for SecretsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.github_user {
            parts.push("GitHub user");
        }
        if self.github_token {
            parts.push("GitHub token");
        }
        if self.credential_helper {
            parts.push("git credential helper");
        }
        match self.kaggle {
            Some(WriteOutcome::Written) => parts.push("Kaggle credentials"),
            Some(WriteOutcome::Unchanged) => parts.push("Kaggle credentials (unchanged)"),
            None => {}
        }
        if parts.is_empty() {
            write!(f, "no secrets configured")
        } else {
            write!(f, "configured: {}", parts.join(", "))
        }
    }
}

/// Options for `clone`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CloneOptions {
    /// Shallow clone depth
    pub depth: Option<u32>,
    /// Suppress git progress output
    pub quiet: bool,
    /// Parent directory for checkouts (default: configured work dir)
    pub dest_root: Option<PathBuf>,
}

/// A repository that was cloned (or attempted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClonedRepo {
    pub spec: RepoSpec,
    pub dir: PathBuf,
    pub success: bool,
}

/// The bootstrap configurator.
pub struct Bootstrap<E: CommandExecutor = SystemExecutor> {
    config: BootstrapConfig,
    executor: E,
    env: EnvironmentState,
    source: Box<dyn SecretSource>,
}

impl Bootstrap<SystemExecutor> {
    /// Configurator running real tools, seeded from the process environment.
    pub fn system(config: BootstrapConfig) -> Self {
        Self::new(config, SystemExecutor).with_environment(EnvironmentState::from_process())
    }
}

impl<E: CommandExecutor> Bootstrap<E> {
    /// Configurator with an empty environment and a masked terminal prompt.
    pub fn new(config: BootstrapConfig, executor: E) -> Self {
        Self {
            config,
            executor,
            env: EnvironmentState::new(),
            source: Box::new(MaskedPrompt),
        }
    }

    pub fn with_environment(mut self, env: EnvironmentState) -> Self {
        self.env = env;
        self
    }

    pub fn with_secret_source(mut self, source: impl SecretSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn env(&self) -> &EnvironmentState {
        &self.env
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn into_executor(self) -> E {
        self.executor
    }

    // ------------------------------------------------------------------
    // Secrets
    // ------------------------------------------------------------------

    /// Load secrets and configure credentials.
    ///
    /// Parsing and validation happen before any side effect, so malformed
    /// input applies nothing. The Kaggle credentials file always ends up
    /// holding the new keys; with `overwrite == false` a file that already
    /// holds them is not rewritten.
    pub fn load_secrets(
        &mut self,
        secrets: impl Into<SecretInput>,
        overwrite: bool,
    ) -> Result<SecretsSummary> {
        let bundle = self.resolve_bundle(secrets.into())?;
        debug!("Loaded secret bundle: {:?}", bundle);

        let kaggle = KaggleCredentials::from_bundle(&bundle)?;
        let kaggle_file = match kaggle {
            Some(_) => Some(CredentialFile::in_home(&self.config.resolve_home()?)),
            None => None,
        };

        let mut summary = SecretsSummary::default();

        if let Some(user) = bundle.get(GITHUB_USER) {
            self.env.set(GH_USER, user);
            summary.github_user = true;
        }
        if let Some(pat) = bundle.get(GITHUB_PAT) {
            self.env.set(GH_PAT, pat);
            self.env.set(GITHUB_TOKEN, pat);
            summary.github_token = true;
        }

        if summary.github_user && summary.github_token {
            match self.config.credential_mode {
                CredentialMode::Helper => {
                    summary.credential_helper = self.register_credential_helper();
                }
                CredentialMode::TokenEnv => {
                    info!("Credential mode token-env: exported token variables only");
                }
            }
        }

        if let (Some(creds), Some(file)) = (kaggle, kaggle_file) {
            if self.executor.is_dry_run() {
                info!("[DRY RUN] Skipped writing {}", file.path().display());
            } else {
                summary.kaggle = Some(file.write(&creds, overwrite)?);
                self.env
                    .set(KAGGLE_CONFIG_DIR, file.dir().display().to_string());
            }
        }

        info!("Secrets loaded: {}", summary);
        Ok(summary)
    }

    fn resolve_bundle(&mut self, input: SecretInput) -> Result<SecretBundle> {
        if input.is_blank() {
            let answer = self.source.read_secret(SECRETS_PROMPT)?;
            return SecretBundle::from_json(&answer);
        }
        match input {
            SecretInput::Json(json) => SecretBundle::from_json(&json),
            SecretInput::Map(map) => Ok(SecretBundle::from_map(map)),
            SecretInput::Prompt => Ok(SecretBundle::default()),
        }
    }

    fn register_credential_helper(&mut self) -> bool {
        let args = GitConfigArgs {
            key: "credential.helper".to_string(),
            value: ENV_CREDENTIAL_HELPER.to_string(),
            global: true,
        };
        self.run_logged(&args, "git credential helper registration")
    }

    // ------------------------------------------------------------------
    // Download
    // ------------------------------------------------------------------

    /// Download each URL into the work dir. Tool failures are logged only.
    pub fn download<I, S>(&mut self, urls: I, silent: bool) -> Result<Vec<DownloadTarget>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let targets = urls
            .into_iter()
            .map(|u| DownloadTarget::plan(u.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        for target in &targets {
            let args = WgetArgs {
                url: target.url.clone(),
                output: self.config.work_dir.join(&target.output),
                silent,
            };
            self.run_logged(&args, &format!("download of {}", target.url));
        }

        Ok(targets)
    }

    // ------------------------------------------------------------------
    // Clone
    // ------------------------------------------------------------------

    /// Clone each repository, checking out its revision when given.
    ///
    /// When any GitHub credential is configured both the username and the
    /// token must be present; otherwise this fails before running anything.
    pub fn clone<I, S>(&mut self, repos: I, options: &CloneOptions) -> Result<Vec<ClonedRepo>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let specs = self.parse_repos(repos)?;
        self.clone_specs(specs, options)
    }

    fn parse_repos<I, S>(&self, repos: I) -> Result<Vec<RepoSpec>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        repos
            .into_iter()
            .map(|r| RepoSpec::parse(r.as_ref(), &self.config.git_host))
            .collect()
    }

    fn clone_specs(&mut self, specs: Vec<RepoSpec>, options: &CloneOptions) -> Result<Vec<ClonedRepo>> {
        let auth_env = self.clone_auth_env()?;
        let dest_root = options
            .dest_root
            .clone()
            .unwrap_or_else(|| self.config.work_dir.clone());

        let mut cloned = Vec::with_capacity(specs.len());
        for spec in specs {
            let dir = dest_root.join(&spec.name);
            let success = self.clone_one(&spec, &dir, auth_env.as_deref(), options);
            cloned.push(ClonedRepo { spec, dir, success });
        }
        Ok(cloned)
    }

    /// Child environment for an authenticated clone, or None for anonymous.
    fn clone_auth_env(&self) -> Result<Option<Vec<(String, String)>>> {
        match self.env.github_credentials() {
            GithubCredentials::Absent => Ok(None),
            GithubCredentials::Complete { user, token } => Ok(Some(vec![
                (GH_USER.to_string(), user.to_string()),
                (GH_PAT.to_string(), token.to_string()),
            ])),
            GithubCredentials::Incomplete { missing } => {
                Err(BootstrapError::missing_credentials(format!(
                    "{} and {} must both be set for an authenticated clone ({} is missing); \
                     call load_secrets with github_user and github_pat first",
                    GH_USER, GH_PAT, missing
                )))
            }
        }
    }

    fn clone_one(
        &mut self,
        spec: &RepoSpec,
        dir: &Path,
        auth_env: Option<&[(String, String)]>,
        options: &CloneOptions,
    ) -> bool {
        let args = GitCloneArgs {
            url: spec.url.clone(),
            dir: dir.to_path_buf(),
            depth: options.depth,
            quiet: options.quiet,
            credential_helper: auth_env.map(|_| ENV_CREDENTIAL_HELPER.to_string()),
            env: auth_env.map(<[_]>::to_vec).unwrap_or_default(),
        };
        if auth_env.is_some() {
            debug!("Authenticated clone of {}", spec.url);
        }
        if !self.run_logged(&args, &format!("clone of {}", spec.url)) {
            return false;
        }

        let Some(ref revision) = spec.revision else {
            return true;
        };
        let checkout = GitCheckoutArgs {
            dir: dir.to_path_buf(),
            revision: revision.clone(),
            quiet: options.quiet,
        };
        self.run_logged(&checkout, &format!("checkout of {} in {}", revision, dir.display()))
    }

    // ------------------------------------------------------------------
    // Install
    // ------------------------------------------------------------------

    /// Install packages, cloning repository references first.
    ///
    /// Returns the targets handed to the installer, in input order.
    pub fn install<I, S>(&mut self, packages: I, silent: bool, force_install: bool) -> Result<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let descriptors: Vec<String> = packages
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .collect();
        if descriptors.is_empty() || descriptors.iter().any(String::is_empty) {
            return Err(BootstrapError::validation("install needs non-empty package names"));
        }

        let repo_specs = self.parse_repos(descriptors.iter().filter(|d| is_repo_reference(d)))?;
        let clone_options = CloneOptions {
            quiet: silent,
            ..Default::default()
        };
        // Plain packages need no clone and so no GitHub credentials
        let mut cloned = if repo_specs.is_empty() {
            Vec::new().into_iter()
        } else {
            self.clone_specs(repo_specs, &clone_options)?.into_iter()
        };

        let targets: Vec<String> = descriptors
            .into_iter()
            .map(|d| {
                if is_repo_reference(&d) {
                    cloned
                        .next()
                        .map(|repo| repo.dir.display().to_string())
                        .unwrap_or(d)
                } else {
                    d
                }
            })
            .collect();

        let args = PipInstallArgs {
            targets: targets.clone(),
            silent,
            force_reinstall: force_install,
        };
        self.run_logged(&args, "pip install");

        Ok(targets)
    }

    // ------------------------------------------------------------------
    // GPU
    // ------------------------------------------------------------------

    /// Query the accelerator runtime.
    pub fn query_gpu(&mut self) -> Result<GpuReport> {
        let output = self.gpu_output()?;
        if output.dry_run {
            return Err(BootstrapError::no_accelerator("dry run: GPU query not executed"));
        }
        GpuReport::parse(&output.stdout)
    }

    /// Print a one-line GPU summary. Returns None in dry-run mode.
    pub fn report_gpu(&mut self) -> Result<Option<GpuReport>> {
        let output = self.gpu_output()?;
        if output.dry_run {
            return Ok(None);
        }
        let report = GpuReport::parse(&output.stdout)?;
        println!("{}", report);
        Ok(Some(report))
    }

    fn gpu_output(&mut self) -> Result<ToolOutput> {
        let output = self
            .invoke(&GpuQueryArgs)
            .map_err(|e| BootstrapError::no_accelerator(e.to_string()))?;
        if !output.success {
            return Err(BootstrapError::no_accelerator(format!(
                "GPU query failed (exit code {}): {}",
                output.exit_code.unwrap_or(-1),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }

    // ------------------------------------------------------------------
    // Execution
    // ------------------------------------------------------------------

    fn invoke(&mut self, args: &dyn ToolArgs) -> Result<ToolOutput> {
        let invocation = Invocation::from_args(args, &self.config.tools);
        info!("run: {}", invocation);
        self.executor.run(&invocation)
    }

    /// Run a tool whose failure is logged, not returned.
    fn run_logged(&mut self, args: &dyn ToolArgs, what: &str) -> bool {
        match self.invoke(args) {
            Ok(output) if output.success => true,
            Ok(output) => {
                warn!(
                    "{} failed with exit code {}",
                    what,
                    output.exit_code.map_or("none".to_string(), |c| c.to_string())
                );
                false
            }
            Err(e) => {
                warn!("{} could not run: {}", what, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::RecordingExecutor;
    use crate::secrets::StaticSource;
    use crate::tool_args::Tool;
    use tempfile::tempdir;

    fn bootstrap(home: &Path) -> Bootstrap<RecordingExecutor> {
        let config = BootstrapConfig {
            home_dir: Some(home.to_path_buf()),
            ..Default::default()
        };
        Bootstrap::new(config, RecordingExecutor::new()).with_secret_source(StaticSource::empty())
    }

    #[test]
    fn test_github_secrets_register_helper() {
        let home = tempdir().unwrap();
        let mut b = bootstrap(home.path());

        let summary = b
            .load_secrets(r#"{"github_user":"u","github_pat":"p"}"#, false)
            .unwrap();
        assert!(summary.github_user && summary.github_token && summary.credential_helper);
        assert_eq!(b.env().get(GH_USER), Some("u"));
        assert_eq!(b.env().get(GH_PAT), Some("p"));
        assert_eq!(b.env().get(GITHUB_TOKEN), Some("p"));

        let calls = b.executor().invocations();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec!["config", "--global", "credential.helper", ENV_CREDENTIAL_HELPER]
        );
    }

    #[test]
    fn test_token_env_mode_skips_helper() {
        let home = tempdir().unwrap();
        let config = BootstrapConfig {
            home_dir: Some(home.path().to_path_buf()),
            credential_mode: CredentialMode::TokenEnv,
            ..Default::default()
        };
        let mut b = Bootstrap::new(config, RecordingExecutor::new());
        let summary = b
            .load_secrets(r#"{"github_user":"u","github_pat":"p"}"#, false)
            .unwrap();
        assert!(!summary.credential_helper);
        assert!(b.executor().invocations().is_empty());
        assert_eq!(b.env().get(GITHUB_TOKEN), Some("p"));
    }

    #[test]
    fn test_blank_input_uses_source() {
        let home = tempdir().unwrap();
        let mut b = bootstrap(home.path())
            .with_secret_source(StaticSource::new(r#"{"github_user":"from-prompt"}"#));
        b.load_secrets(None::<String>, false).unwrap();
        assert_eq!(b.env().get(GH_USER), Some("from-prompt"));
    }

    #[test]
    fn test_empty_prompt_answer_is_empty_bundle() {
        let home = tempdir().unwrap();
        let mut b = bootstrap(home.path());
        let summary = b.load_secrets("", false).unwrap();
        assert_eq!(summary, SecretsSummary::default());
        assert!(b.env().is_empty());
    }

    #[test]
    fn test_incomplete_kaggle_applies_nothing() {
        let home = tempdir().unwrap();
        let mut b = bootstrap(home.path());
        let err = b
            .load_secrets(r#"{"github_user":"u","kaggle_username":"k"}"#, false)
            .unwrap_err();
        assert!(matches!(err, BootstrapError::Validation(_)));
        assert!(b.env().is_empty());
        assert!(!home.path().join(".kaggle").exists());
    }

    #[test]
    fn test_clone_failure_skips_checkout_and_continues() {
        let home = tempdir().unwrap();
        let config = BootstrapConfig {
            home_dir: Some(home.path().to_path_buf()),
            ..Default::default()
        };
        let exec = RecordingExecutor::new()
            .with_response(Tool::Git, ToolOutput::failed(128, "not found"));
        let mut b = Bootstrap::new(config, exec);

        let cloned = b
            .clone(["org/missing@v1", "org/present"], &CloneOptions::default())
            .unwrap();
        assert!(!cloned[0].success);
        assert!(cloned[1].success);

        let calls = b.executor().invocations();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| !c.args.contains(&"checkout".to_string())));
    }

    #[test]
    fn test_summary_display() {
        let summary = SecretsSummary {
            github_user: true,
            kaggle: Some(WriteOutcome::Unchanged),
            ..Default::default()
        };
        assert_eq!(
            summary.to_string(),
            "configured: GitHub user, Kaggle credentials (unchanged)"
        );
        assert_eq!(SecretsSummary::default().to_string(), "no secrets configured");
    }
}
