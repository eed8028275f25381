//! The site under test, addressed by its base URL

use std::fmt;
use url::Url;

use crate::error::{CommonError, CommonResult};

/// Base URL of the application under test.
///
/// The raw string is kept as configured; comparisons go through
/// [`Target::normalize`] so that `http://host/` and `http://host` are the
/// same location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    base: Url,
}

impl Target {
    /// Parse a base URL. Only `http` and `https` targets are accepted.
    pub fn parse(raw: &str) -> CommonResult<Self> {
        let raw = raw.trim();
        let base = Url::parse(raw).map_err(|e| CommonError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;

        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(CommonError::InvalidUrl {
                    url: raw.to_string(),
                    reason: format!("unsupported scheme '{}'", other),
                })
            }
        }

        if base.host_str().is_none() {
            return Err(CommonError::InvalidUrl {
                url: raw.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self {
            raw: raw.to_string(),
            base,
        })
    }

    /// The base URL exactly as configured
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed base URL
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Strip a single trailing slash.
    pub fn normalize(url: &str) -> &str {
        url.strip_suffix('/').unwrap_or(url)
    }

    /// Resolve a path (with optional query) against the base.
    ///
    /// Paths are appended to the base rather than resolved with RFC 3986
    /// rules, so a base mounted under a prefix keeps its prefix.
    pub fn url(&self, path: &str) -> CommonResult<Url> {
        let mut joined = Self::normalize(&self.raw).to_string();
        if !path.starts_with('/') {
            joined.push('/');
        }
        joined.push_str(path);

        Url::parse(&joined).map_err(|e| CommonError::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })
    }

    /// Whether `url` is the home location (trailing-slash insensitive).
    pub fn is_home(&self, url: &str) -> bool {
        match Url::parse(url) {
            Ok(url) => self.within_base(&url) && url.query().is_none() && self.relative_path(&url) == "/",
            Err(_) => false,
        }
    }

    /// Whether `url` is served by this target.
    pub fn owns(&self, url: &str) -> bool {
        Url::parse(url).map(|url| self.within_base(&url)).unwrap_or(false)
    }

    /// Same origin, and the path sits under the base path.
    fn within_base(&self, url: &Url) -> bool {
        let prefix = Self::normalize(self.base.path());
        self.same_origin(url)
            && url
                .path()
                .strip_prefix(prefix)
                .map_or(false, |rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// Whether `url` shares scheme, host and port with the base.
    pub fn same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.base.scheme()
            && url.host_str() == self.base.host_str()
            && url.port_or_known_default() == self.base.port_or_known_default()
    }

    /// Path of `url` relative to the base path, always starting with `/`.
    pub fn relative_path(&self, url: &Url) -> String {
        let prefix = Self::normalize(self.base.path());
        let path = url.path();
        let rest = path.strip_prefix(prefix).unwrap_or(path);
        if rest.starts_with('/') {
            rest.to_string()
        } else {
            format!("/{}", rest)
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
