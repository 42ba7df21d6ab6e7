//! Credentials attached to every request a client sends.

use std::fmt;
use std::sync::Arc;

use base64::Engine;

/// A custom way of authenticating requests, e.g. signing or API-key headers.
pub trait AuthStrategy: Send + Sync {
    /// Add whatever headers the scheme needs.
    fn apply(&self, headers: &mut Vec<(String, String)>);
}

/// Authentication for a client: absent, a user/password pair, a bearer
/// token, or an opaque strategy.
#[derive(Clone, Default)]
pub enum Auth {
    #[default]
    None,
    Basic {
        username: String,
        password: String,
    },
    Bearer(String),
    Custom(Arc<dyn AuthStrategy>),
}

impl Auth {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Auth::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    pub fn custom(strategy: impl AuthStrategy + 'static) -> Self {
        Auth::Custom(Arc::new(strategy))
    }

    /// Add the credentials to `headers`. An explicit `authorization` header
    /// already present is left alone.
    pub fn apply(&self, headers: &mut Vec<(String, String)>) {
        let has_authorization = headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("authorization"));
        match self {
            Auth::None => {}
            Auth::Basic { username, password } if !has_authorization => {
                let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
                headers.push(("authorization".to_string(), format!("Basic {token}")));
            }
            Auth::Bearer(token) if !has_authorization => {
                headers.push(("authorization".to_string(), format!("Bearer {token}")));
            }
            Auth::Basic { .. } | Auth::Bearer(_) => {}
            Auth::Custom(strategy) => strategy.apply(headers),
        }
    }
}

// Credentials stay out of logs and error messages.
impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::None => write!(f, "None"),
            Auth::Basic { username, .. } => f.debug_struct("Basic").field("username", username).finish_non_exhaustive(),
            Auth::Bearer(_) => write!(f, "Bearer(..)"),
            Auth::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl<U: Into<String>, P: Into<String>> From<(U, P)> for Auth {
    fn from((username, password): (U, P)) -> Self {
        Auth::basic(username, password)
    }
}
