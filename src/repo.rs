//! Repository identifier normalization.
//!
//! Accepted forms:
//! - `org/repo`, `org/repo.git`, `host/org/repo`
//! - `https://host/org/repo[.git]` and `git@host:org/repo[.git]`
//! - any of the above followed by `@<revision>`
//!
//! The remote URL always ends in `.git`; the checkout directory is the repo
//! name without it.

use std::fmt;

use crate::error::{BootstrapError, Result};

const GIT_SUFFIX: &str = ".git";

/// A normalized repository reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSpec {
    /// Clone URL
    pub url: String,
    /// Checkout directory name
    pub name: String,
    /// Branch, tag or commit to check out after cloning
    pub revision: Option<String>,
}

impl RepoSpec {
    /// Normalize an identifier. Short forms expand against `default_host`.
    pub fn parse(identifier: &str, default_host: &str) -> Result<Self> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(BootstrapError::validation("empty repository identifier"));
        }

        let (base, revision) = split_revision(identifier);
        if let Some(rev) = revision {
            if rev.is_empty() {
                return Err(BootstrapError::validation(format!(
                    "empty revision in {:?}",
                    identifier
                )));
            }
        }

        let url = if base.contains("://") || base.starts_with("git@") {
            with_git_suffix(base.trim_end_matches('/'))
        } else {
            let segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
            match segments.as_slice() {
                [owner, repo] => format!(
                    "https://{}/{}/{}",
                    default_host,
                    owner,
                    with_git_suffix(repo)
                ),
                [host, owner, repo] if host.contains('.') => {
                    format!("https://{}/{}/{}", host, owner, with_git_suffix(repo))
                }
                _ => {
                    return Err(BootstrapError::validation(format!(
                        "expected org/repo, got {:?}",
                        identifier
                    )));
                }
            }
        };

        let name = repo_name(&url).ok_or_else(|| {
            BootstrapError::validation(format!("cannot derive repository name from {:?}", identifier))
        })?;

        Ok(Self {
            url,
            name,
            revision: revision.map(str::to_string),
        })
    }
}

impl fmt::Display for RepoSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.revision {
            Some(ref rev) => write!(f, "{}@{}", self.url, rev),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Whether an install descriptor names a repository rather than a package.
pub fn is_repo_reference(descriptor: &str) -> bool {
    descriptor.contains('/')
}

/// Split `base@rev`. Only an `@` after the first path separator counts, so
/// `git@host:org/repo` and `https://user@host/...` keep their user part.
fn split_revision(identifier: &str) -> (&str, Option<&str>) {
    let path_start = identifier.find("://").map_or(0, |i| i + 3);
    let Some(first_slash) = identifier[path_start..].find('/').map(|i| i + path_start) else {
        return (identifier, None);
    };
    match identifier.rfind('@') {
        Some(at) if at > first_slash => (&identifier[..at], Some(&identifier[at + 1..])),
        _ => (identifier, None),
    }
}

fn with_git_suffix(s: &str) -> String {
    if s.ends_with(GIT_SUFFIX) {
        s.to_string()
    } else {
        format!("{}{}", s, GIT_SUFFIX)
    }
}

fn repo_name(url: &str) -> Option<String> {
    let last = url.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(GIT_SUFFIX).unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "github.com";

    #[test]
    fn test_short_form() {
        let spec = RepoSpec::parse("org/repo", HOST).unwrap();
        assert_eq!(spec.url, "https://github.com/org/repo.git");
        assert_eq!(spec.name, "repo");
        assert_eq!(spec.revision, None);
    }

    #[test]
    fn test_suffix_not_doubled() {
        let spec = RepoSpec::parse("org/repo.git", HOST).unwrap();
        assert_eq!(spec.url, "https://github.com/org/repo.git");
        assert_eq!(spec.name, "repo");
    }

    #[test]
    fn test_revision() {
        let spec = RepoSpec::parse("org/repo@main", HOST).unwrap();
        assert_eq!(spec.url, "https://github.com/org/repo.git");
        assert_eq!(spec.revision.as_deref(), Some("main"));

        let spec = RepoSpec::parse("org/repo@feature/x", HOST).unwrap();
        assert_eq!(spec.revision.as_deref(), Some("feature/x"));
    }

    #[test]
    fn test_empty_revision_rejected() {
        assert!(RepoSpec::parse("org/repo@", HOST).is_err());
    }

    #[test]
    fn test_host_form() {
        let spec = RepoSpec::parse("gitlab.com/group/proj", HOST).unwrap();
        assert_eq!(spec.url, "https://gitlab.com/group/proj.git");
    }

    #[test]
    fn test_full_urls() {
        let spec = RepoSpec::parse("https://github.com/org/repo", HOST).unwrap();
        assert_eq!(spec.url, "https://github.com/org/repo.git");

        let spec = RepoSpec::parse("https://user@example.com/org/repo.git@v1.2", HOST).unwrap();
        assert_eq!(spec.url, "https://user@example.com/org/repo.git");
        assert_eq!(spec.revision.as_deref(), Some("v1.2"));

        let spec = RepoSpec::parse("git@github.com:org/repo", HOST).unwrap();
        assert_eq!(spec.url, "git@github.com:org/repo.git");
        assert_eq!(spec.name, "repo");
        assert_eq!(spec.revision, None);
    }

    #[test]
    fn test_invalid_identifiers() {
        assert!(RepoSpec::parse("", HOST).is_err());
        assert!(RepoSpec::parse("numpy", HOST).is_err());
        assert!(RepoSpec::parse("a/b/c/d", HOST).is_err());
    }

    #[test]
    fn test_repo_reference_detection() {
        assert!(is_repo_reference("org/repo@main"));
        assert!(!is_repo_reference("numpy"));
        assert!(!is_repo_reference("torch==2.1"));
    }

    #[test]
    fn test_display() {
        let spec = RepoSpec::parse("org/repo@main", HOST).unwrap();
        assert_eq!(spec.to_string(), "https://github.com/org/repo.git@main");
    }
}
