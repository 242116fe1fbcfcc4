//! Caller identity and the content-edit capability
//!
//! Callers authenticate with a bearer token. The server never stores tokens,
//! only their SHA-256 digests (hex) from `tsync.toml`; `tsync-api --hash-token`
//! prints the digest for a new token.

use axum::http::HeaderMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::debug;
use tsync_common::config::ApiTokenConfig;

/// Identity presented with a request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub bearer_token: Option<String>,
}

impl Caller {
    /// Caller without credentials
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            bearer_token: Some(token.into()),
        }
    }

    /// Extract the bearer token from an `Authorization` header value
    ///
    /// Anything other than a non-empty `Bearer <token>` counts as no credentials.
    pub fn from_authorization_header(value: Option<&str>) -> Self {
        let bearer_token = value
            .and_then(|v| {
                let (scheme, token) = v.trim().split_once(' ')?;
                scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
            })
            .filter(|token| !token.is_empty())
            .map(str::to_string);

        Self { bearer_token }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        let value = headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Self::from_authorization_header(value)
    }

    pub fn has_credentials(&self) -> bool {
        self.bearer_token.is_some()
    }
}

/// Host capability predicate
pub trait CapabilityCheck: Send + Sync {
    fn can_edit_content(&self, caller: &Caller) -> bool;
}

/// Capability decided by configured token digests
#[derive(Debug, Clone, Default)]
pub struct TokenCapability {
    /// sha256 hex -> (token name, can_edit)
    tokens: HashMap<String, (String, bool)>,
}

impl TokenCapability {
    pub fn from_config(tokens: &[ApiTokenConfig]) -> Self {
        let tokens = tokens
            .iter()
            .map(|t| (t.sha256.to_ascii_lowercase(), (t.name.clone(), t.can_edit)))
            .collect();
        Self { tokens }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl CapabilityCheck for TokenCapability {
    fn can_edit_content(&self, caller: &Caller) -> bool {
        let Some(token) = caller.bearer_token.as_deref() else {
            return false;
        };

        match self.tokens.get(&hash_token(token)) {
            Some((name, can_edit)) => {
                debug!("Request authenticated as token '{}'", name);
                *can_edit
            }
            None => false,
        }
    }
}

/// Fixed answer for every caller (tests and trusted embeddings)
#[derive(Debug, Clone, Copy)]
pub struct StaticCapability(pub bool);

impl CapabilityCheck for StaticCapability {
    fn can_edit_content(&self, _caller: &Caller) -> bool {
        self.0
    }
}

/// SHA-256 digest of a token as lowercase hex
pub fn hash_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
