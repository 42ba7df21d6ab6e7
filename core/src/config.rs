//! Per-client configuration, supplied explicitly at construction.

use std::fmt;
use std::sync::Arc;

use crate::auth::Auth;
use crate::pool::Executor;

/// Default number of workers for a pooled client.
pub const DEFAULT_WORKERS: usize = 2;

/// Settings shared by blocking and pooled clients.
///
/// `raise_on_error` defaults to `false`: 4xx/5xx responses come back as
/// ordinary data unless the caller opts in to `ApiError::Remote`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Prefix every relative endpoint path is appended to.
    pub base_url: String,
    pub auth: Auth,
    pub raise_on_error: bool,
    pub decode_json: bool,
    /// Sent with every request unless a call overrides the same header.
    pub default_headers: Vec<(String, String)>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: Auth::None,
            raise_on_error: false,
            decode_json: false,
            default_headers: Vec::new(),
        }
    }

    pub fn with_auth(mut self, auth: impl Into<Auth>) -> Self {
        self.auth = auth.into();
        self
    }

    pub fn raise_on_error(mut self, enabled: bool) -> Self {
        self.raise_on_error = enabled;
        self
    }

    pub fn decode_json(mut self, enabled: bool) -> Self {
        self.decode_json = enabled;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.default_headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Worker settings for a pooled client. An injected executor takes priority
/// over `workers`.
#[derive(Clone)]
pub struct PoolConfig {
    pub workers: usize,
    pub executor: Option<Arc<dyn Executor>>,
}

impl PoolConfig {
    pub fn workers(workers: usize) -> Self {
        Self {
            workers,
            executor: None,
        }
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            executor: Some(executor),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::workers(DEFAULT_WORKERS)
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("workers", &self.workers)
            .field("executor", &self.executor.as_ref().map(|_| ".."))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_library_safe() {
        let config = ClientConfig::new("http://localhost:3000/");
        assert!(!config.raise_on_error);
        assert!(!config.decode_json);
        assert!(matches!(config.auth, Auth::None));
        assert!(config.default_headers.is_empty());
        assert_eq!(PoolConfig::default().workers, 2);
        assert!(PoolConfig::default().executor.is_none());
    }

    #[test]
    fn builder_methods_chain() {
        let config = ClientConfig::new("http://api/")
            .with_auth(("user", "pass"))
            .raise_on_error(true)
            .decode_json(true)
            .with_header("accept", "application/json")
            .with_headers([("x-a", "1")]);
        assert!(config.raise_on_error && config.decode_json);
        assert!(matches!(config.auth, Auth::Basic { .. }));
        assert_eq!(config.default_headers.len(), 2);
    }
}
