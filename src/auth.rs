//! Authentication schemes and request header construction
//!
//! The API accepts exactly three credential schemes. The closed set is
//! modeled as an enum with one credential-building function per variant.

use crate::config::ConnectorConfig;
use crate::types::{
    MARKETPLACE_APP_ID_HEADER, MARKETPLACE_NAME_HEADER, MARKETPLACE_ORG_ID_HEADER,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Authentication method for API requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum AuthMethod {
    /// HTTP Basic with username and password
    Basic {
        /// Account email
        username: String,
        /// Account password
        password: String,
    },

    /// HTTP Basic with username and an API token
    Token {
        /// Account email
        username: String,
        /// API token
        token: String,
    },

    /// OAuth bearer access token
    Oauth {
        /// OAuth access token
        access_token: String,
    },
}

impl AuthMethod {
    /// Build the `Authorization` header value for this scheme.
    pub fn credential(&self) -> String {
        match self {
            AuthMethod::Basic { username, password } => {
                format!("Basic {}", BASE64.encode(format!("{username}:{password}")))
            }
            AuthMethod::Token { username, token } => {
                format!(
                    "Basic {}",
                    BASE64.encode(format!("{username}/token:{token}"))
                )
            }
            AuthMethod::Oauth { access_token } => format!("Bearer {access_token}"),
        }
    }

    /// Name of the scheme as it appears in configuration
    pub fn name(&self) -> &'static str {
        match self {
            AuthMethod::Basic { .. } => "basic",
            AuthMethod::Token { .. } => "token",
            AuthMethod::Oauth { .. } => "oauth",
        }
    }
}

/// Headers common to every request: authorization, content type, and the
/// optional marketplace attribution triple.
pub fn request_headers(config: &ConnectorConfig) -> Vec<(&'static str, String)> {
    let mut headers = vec![
        ("Authorization", config.auth.credential()),
        ("Content-Type", "application/json".to_string()),
    ];

    if let Some(name) = &config.marketplace_integration_name {
        headers.push((MARKETPLACE_NAME_HEADER, name.clone()));
    }
    if let Some(app_id) = &config.marketplace_app_id {
        headers.push((MARKETPLACE_APP_ID_HEADER, app_id.clone()));
    }
    if let Some(org_id) = &config.marketplace_org_id {
        headers.push((MARKETPLACE_ORG_ID_HEADER, org_id.clone()));
    }

    headers
}
