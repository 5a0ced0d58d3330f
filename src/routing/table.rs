//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Resolve a request path to the first matching route
//! - Compute the path forwarded to the backend
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Explicit `None` rather than silent default

use url::Url;

use crate::config::{ConfigError, RouteConfig};

/// A single prefix rule bound to one backend.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    name: String,
    prefix: String,
    backend: Url,
    strip_prefix: bool,
}

impl RouteEntry {
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, backend: Url) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            backend,
            strip_prefix: false,
        }
    }

    /// Forward only the path suffix after the prefix.
    pub fn with_strip_prefix(mut self, strip: bool) -> Self {
        self.strip_prefix = strip;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn backend(&self) -> &Url {
        &self.backend
    }

    /// True if `path` starts with this route's prefix.
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }

    /// Backend-side path for a request path this route matched.
    ///
    /// The backend's own base path (if any) is prepended.
    pub fn forward_path(&self, path: &str) -> String {
        let tail = if self.strip_prefix {
            path.get(self.prefix.len()..).unwrap_or_default()
        } else {
            path
        };
        let base = self.backend.path().trim_end_matches('/');

        let mut out = String::with_capacity(base.len() + tail.len() + 1);
        out.push_str(base);
        if !tail.starts_with('/') {
            out.push('/');
        }
        out.push_str(tail);
        out
    }
}

/// Ordered, immutable prefix → backend table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Compile route configs, keeping their order.
    pub fn from_config(routes: &[RouteConfig]) -> Result<Self, ConfigError> {
        let entries = routes
            .iter()
            .map(|route| {
                let backend = Url::parse(&route.backend).map_err(|source| ConfigError::Backend {
                    name: route.name.clone(),
                    source,
                })?;
                Ok(RouteEntry::new(&route.name, &route.path_prefix, backend)
                    .with_strip_prefix(route.strip_prefix))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(Self::new(entries))
    }

    /// First entry, in declaration order, whose prefix starts `path`.
    pub fn resolve(&self, path: &str) -> Option<&RouteEntry> {
        self.entries.iter().find(|entry| entry.matches(path))
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
