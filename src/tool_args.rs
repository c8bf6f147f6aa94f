//! Typed argument contracts for the external tools the configurator drives.
//!
//! Every subprocess goes through a struct implementing [`ToolArgs`] instead of
//! a raw string vector. The struct definition is the contract: the compiler
//! catches flag mismatches, and environment variables travel alongside the
//! arguments instead of leaking through the parent process.

use std::path::PathBuf;

use strum::{Display, EnumIter, EnumString};

use crate::config::ToolPaths;

/// External tools invoked as opaque subprocesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum Tool {
    /// Download utility (`wget`)
    Wget,
    /// Version-control client (`git`)
    Git,
    /// Package installer (`pip`)
    Pip,
    /// Accelerator runtime query (`nvidia-smi`)
    NvidiaSmi,
}

impl Tool {
    /// Resolve the program name for this tool from configuration.
    pub fn program<'a>(&self, tools: &'a ToolPaths) -> &'a str {
        match self {
            Self::Wget => &tools.wget,
            Self::Git => &tools.git,
            Self::Pip => &tools.pip,
            Self::NvidiaSmi => &tools.nvidia_smi,
        }
    }
}

/// Trait for typed tool arguments.
///
/// # Contract
///
/// - `to_cli_args()`: arguments exactly as the tool expects them, program excluded.
/// - `get_env_vars()`: variables the child needs on top of the inherited environment.
/// - `tool()`: which tool runs; the program path is resolved at execution time.
/// - `captures_output()`: whether stdout/stderr are piped back instead of shown.
pub trait ToolArgs {
    /// Convert struct fields to CLI arguments.
    fn to_cli_args(&self) -> Vec<String>;

    /// Get environment variables for the child process.
    fn get_env_vars(&self) -> Vec<(String, String)> {
        vec![]
    }

    /// Get the tool to run.
    fn tool(&self) -> Tool;

    /// Whether the caller needs the tool's output.
    fn captures_output(&self) -> bool {
        false
    }
}

// ============================================================================
// wget
// ============================================================================

/// Arguments for `wget <url> -O <output>`.
#[derive(Debug, Clone)]
pub struct WgetArgs {
    /// URL to fetch (already normalized).
    pub url: String,
    /// Output path.
    pub output: PathBuf,
    /// Suppress progress output.
    pub silent: bool,
}

impl ToolArgs for WgetArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(4);
        if self.silent {
            args.push("-q".to_string());
        }
        args.push(self.url.clone());
        args.push("-O".to_string());
        args.push(self.output.display().to_string());
        args
    }

    fn tool(&self) -> Tool {
        Tool::Wget
    }
}

// ============================================================================
// git
// ============================================================================

/// Arguments for `git clone`.
///
/// When `credential_helper` is set, the global helper list is reset for this
/// invocation and replaced with the given helper, which reads `GH_USER` and
/// `GH_PAT` from the child environment. The token never appears in argv.
#[derive(Debug, Clone)]
pub struct GitCloneArgs {
    /// Remote URL.
    pub url: String,
    /// Checkout directory.
    pub dir: PathBuf,
    /// Shallow clone depth.
    pub depth: Option<u32>,
    /// Pass `-q`.
    pub quiet: bool,
    /// Per-invocation credential helper.
    pub credential_helper: Option<String>,
    /// Child environment (credentials for the helper).
    pub env: Vec<(String, String)>,
}

impl ToolArgs for GitCloneArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(ref helper) = self.credential_helper {
            args.push("-c".to_string());
            args.push("credential.helper=".to_string());
            args.push("-c".to_string());
            args.push(format!("credential.helper={}", helper));
        }
        args.push("clone".to_string());
        if self.quiet {
            args.push("-q".to_string());
        }
        if let Some(depth) = self.depth {
            args.push("--depth".to_string());
            args.push(depth.to_string());
        }
        args.push(self.url.clone());
        args.push(self.dir.display().to_string());
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        self.env.clone()
    }

    fn tool(&self) -> Tool {
        Tool::Git
    }
}

/// Arguments for `git -C <dir> checkout <revision>`.
#[derive(Debug, Clone)]
pub struct GitCheckoutArgs {
    /// Repository working tree.
    pub dir: PathBuf,
    /// Branch, tag or commit.
    pub revision: String,
    /// Pass `-q`.
    pub quiet: bool,
}

impl ToolArgs for GitCheckoutArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec![
            "-C".to_string(),
            self.dir.display().to_string(),
            "checkout".to_string(),
        ];
        if self.quiet {
            args.push("-q".to_string());
        }
        args.push(self.revision.clone());
        args
    }

    fn tool(&self) -> Tool {
        Tool::Git
    }
}

/// Arguments for `git config [--global] <key> <value>`.
#[derive(Debug, Clone)]
pub struct GitConfigArgs {
    /// Config key (e.g. `credential.helper`).
    pub key: String,
    /// Config value.
    pub value: String,
    /// Write to the user's global config.
    pub global: bool,
}

impl ToolArgs for GitConfigArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["config".to_string()];
        if self.global {
            args.push("--global".to_string());
        }
        args.push(self.key.clone());
        args.push(self.value.clone());
        args
    }

    fn tool(&self) -> Tool {
        Tool::Git
    }
}

// ============================================================================
// pip
// ============================================================================

/// Arguments for `pip install <targets...>`.
#[derive(Debug, Clone)]
pub struct PipInstallArgs {
    /// Requirement specifiers or local paths.
    pub targets: Vec<String>,
    /// Pass `-q`.
    pub silent: bool,
    /// Pass `--force-reinstall`.
    pub force_reinstall: bool,
}

impl ToolArgs for PipInstallArgs {
    fn to_cli_args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string()];
        if self.silent {
            args.push("-q".to_string());
        }
        if self.force_reinstall {
            args.push("--force-reinstall".to_string());
        }
        args.extend(self.targets.iter().cloned());
        args
    }

    fn tool(&self) -> Tool {
        Tool::Pip
    }
}

// ============================================================================
// nvidia-smi
// ============================================================================

/// Arguments for the GPU memory query.
#[derive(Debug, Clone, Default)]
pub struct GpuQueryArgs;

impl ToolArgs for GpuQueryArgs {
    fn to_cli_args(&self) -> Vec<String> {
        vec![
            "--query-gpu=name,memory.used,memory.total".to_string(),
            "--format=csv,noheader,nounits".to_string(),
        ]
    }

    fn tool(&self) -> Tool {
        Tool::NvidiaSmi
    }

    fn captures_output(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wget_args_silent() {
        let args = WgetArgs {
            url: "https://x/y/file.txt".to_string(),
            output: PathBuf::from("file.txt"),
            silent: true,
        };
        assert_eq!(
            args.to_cli_args(),
            vec!["-q", "https://x/y/file.txt", "-O", "file.txt"]
        );
    }

    #[test]
    fn test_git_clone_anonymous() {
        let args = GitCloneArgs {
            url: "https://github.com/org/repo.git".to_string(),
            dir: PathBuf::from("repo"),
            depth: Some(1),
            quiet: false,
            credential_helper: None,
            env: vec![],
        };
        assert_eq!(
            args.to_cli_args(),
            vec![
                "clone",
                "--depth",
                "1",
                "https://github.com/org/repo.git",
                "repo"
            ]
        );
        assert!(args.get_env_vars().is_empty());
    }

    #[test]
    fn test_git_clone_with_helper_resets_global_helpers() {
        let args = GitCloneArgs {
            url: "https://github.com/org/repo.git".to_string(),
            dir: PathBuf::from("repo"),
            depth: None,
            quiet: true,
            credential_helper: Some("!f() { :; };f".to_string()),
            env: vec![("GH_PAT".to_string(), "secret".to_string())],
        };
        let cli = args.to_cli_args();
        assert_eq!(&cli[..4], ["-c", "credential.helper=", "-c", "credential.helper=!f() { :; };f"]);
        assert_eq!(cli[4], "clone");
        assert!(!cli.iter().any(|a| a.contains("secret")));
    }

    #[test]
    fn test_pip_install_flags() {
        let args = PipInstallArgs {
            targets: vec!["numpy".to_string(), "./repo".to_string()],
            silent: true,
            force_reinstall: true,
        };
        assert_eq!(
            args.to_cli_args(),
            vec!["install", "-q", "--force-reinstall", "numpy", "./repo"]
        );
    }

    #[test]
    fn test_tool_display_names() {
        assert_eq!(Tool::NvidiaSmi.to_string(), "nvidia-smi");
        assert_eq!("wget".parse::<Tool>().ok(), Some(Tool::Wget));
    }

    #[test]
    fn test_gpu_query_captures_output() {
        assert!(GpuQueryArgs.captures_output());
        assert!(!PipInstallArgs {
            targets: vec![],
            silent: false,
            force_reinstall: false
        }
        .captures_output());
    }
}
