use std::collections::HashSet;

use serde::Deserialize;

use duolink_core::error::{DuolinkError, Result};
use duolink_core::UserId;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub auth: AuthSection,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(DuolinkError::BadRequest(format!(
                "unsupported config version: {}",
                self.version
            )));
        }
        self.auth.validate()?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// Static token table for the dev authenticator. Production deployments swap
/// in a real verifier behind the `Authenticator` trait.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AuthSection {
    #[serde(default)]
    pub tokens: Vec<StaticToken>,
}

impl AuthSection {
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for t in &self.tokens {
            if !seen.insert(t.token.as_str()) {
                return Err(DuolinkError::BadRequest(format!(
                    "duplicate auth token for user {}",
                    t.user_id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticToken {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
}
