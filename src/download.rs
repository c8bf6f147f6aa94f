//! Download URL normalization and output-name derivation.

use crate::error::{BootstrapError, Result};

const DROPBOX_HOST: &str = "dropbox.com";
/// Name used when a URL has no final path segment
pub const FALLBACK_NAME: &str = "index.html";

/// One planned download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// URL handed to the download tool
    pub url: String,
    /// Output file name
    pub output: String,
}

impl DownloadTarget {
    /// Normalize `url` and derive its output name.
    pub fn plan(url: &str) -> Result<Self> {
        let url = url.trim();
        if url.is_empty() {
            return Err(BootstrapError::validation("empty download URL"));
        }
        Ok(Self {
            url: normalize_url(url),
            output: output_name(url),
        })
    }
}

/// Host part of a URL, without user info or port.
///
/// Scheme-less links (`www.dropbox.com/s/...`) count when a dotted host is
/// followed by a path.
pub fn host(url: &str) -> Option<&str> {
    let (authority, _) = split_authority(url);
    let host_port = authority?.rsplit('@').next()?;
    let host = host_port.split(':').next()?;
    (!host.is_empty()).then_some(host)
}

/// Split off the authority, returning it with the remaining path.
fn split_authority(url: &str) -> (Option<&str>, &str) {
    let (rest, has_scheme) = match url.find("://") {
        Some(i) => (&url[i + 3..], true),
        None => (url, false),
    };
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let (authority, path) = rest.split_at(end);
    if has_scheme || (path.starts_with('/') && looks_like_host(authority)) {
        (Some(authority), path)
    } else {
        (None, url)
    }
}

fn looks_like_host(s: &str) -> bool {
    s.contains('.')
        && !s.starts_with('.')
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | ':' | '@'))
}

/// Whether the URL points at Dropbox.
pub fn is_dropbox(url: &str) -> bool {
    host(url).is_some_and(|h| {
        let h = h.to_ascii_lowercase();
        h == DROPBOX_HOST || h.ends_with(".dropbox.com")
    })
}

/// Strip the query string from Dropbox share links; other URLs pass through.
pub fn normalize_url(url: &str) -> String {
    if is_dropbox(url) {
        strip_query(url).to_string()
    } else {
        url.to_string()
    }
}

/// Final non-empty path segment, ignoring query and fragment.
pub fn output_name(url: &str) -> String {
    let (_, path) = split_authority(strip_query(url));
    path.rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_string()
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_url_keeps_query() {
        let target = DownloadTarget::plan("https://x/y/file.txt?a=1").unwrap();
        assert_eq!(target.url, "https://x/y/file.txt?a=1");
        assert_eq!(target.output, "file.txt");
    }

    #[test]
    fn test_dropbox_query_stripped() {
        let target = DownloadTarget::plan("https://www.dropbox.com/s/abc/file2.zip?dl=0").unwrap();
        assert_eq!(target.url, "https://www.dropbox.com/s/abc/file2.zip");
        assert_eq!(target.output, "file2.zip");
    }

    #[test]
    fn test_schemeless_dropbox_query_stripped() {
        let target = DownloadTarget::plan("www.dropbox.com/s/abc/f.zip?dl=0").unwrap();
        assert_eq!(target.url, "www.dropbox.com/s/abc/f.zip");
        assert_eq!(target.output, "f.zip");
    }

    #[test]
    fn test_schemeless_host() {
        assert_eq!(host("www.dropbox.com/s/abc/f.zip"), Some("www.dropbox.com"));
        assert_eq!(host("example.com:8080/a"), Some("example.com"));
        assert_eq!(host("file.txt"), None);
        assert_eq!(host("dir/file.txt"), None);
        assert_eq!(output_name("file.txt"), "file.txt");
        assert_eq!(output_name("example.com/a.zip"), "a.zip");
    }

    #[test]
    fn test_host_extraction() {
        assert_eq!(host("https://user@www.dropbox.com:443/s/x"), Some("www.dropbox.com"));
        assert_eq!(host("https://x?y"), Some("x"));
        assert_eq!(host("not a url"), None);
    }

    #[test]
    fn test_lookalike_host_not_dropbox() {
        assert!(!is_dropbox("https://notdropbox.com/s/a.zip?dl=0"));
        assert!(!is_dropbox("https://example.com/dropbox.com/a.zip?dl=0"));
        assert!(is_dropbox("https://DL.DROPBOX.COM/s/a.zip"));
    }

    #[test]
    fn test_output_name_fallbacks() {
        assert_eq!(output_name("https://example.com"), "index.html");
        assert_eq!(output_name("https://example.com/"), "index.html");
        assert_eq!(output_name("https://example.com/dir/"), "dir");
        assert_eq!(output_name("https://example.com/a.tar.gz#frag"), "a.tar.gz");
    }

    #[test]
    fn test_empty_url_rejected() {
        assert!(DownloadTarget::plan("   ").is_err());
    }
}
