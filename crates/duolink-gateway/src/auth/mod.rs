//! Identity verification seam.
//!
//! The hub trusts whatever the authenticator returns for the lifetime of the
//! connection. The gateway ships a static-token implementation driven by
//! config; anything that can map a token to an identity (JWT validation, a
//! session store lookup) can stand behind the same trait.

use std::collections::HashMap;

use async_trait::async_trait;

use duolink_core::error::{DuolinkError, Result};
use duolink_core::UserId;

use crate::config::AuthSection;

/// Authenticated identity bound to one connection.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: UserId,
    pub username: String,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Resolve connection-establishment credentials to an identity.
    async fn verify(&self, token: &str) -> Result<Identity>;
}

/// Config-driven token table.
pub struct StaticTokenAuthenticator {
    tokens: HashMap<String, Identity>,
}

impl StaticTokenAuthenticator {
    pub fn from_config(auth: &AuthSection) -> Self {
        let tokens = auth
            .tokens
            .iter()
            .map(|t| {
                (
                    t.token.clone(),
                    Identity {
                        user_id: t.user_id,
                        username: t.username.clone(),
                    },
                )
            })
            .collect();
        Self { tokens }
    }
}

#[async_trait]
impl Authenticator for StaticTokenAuthenticator {
    async fn verify(&self, token: &str) -> Result<Identity> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(DuolinkError::AuthFailed)
    }
}
