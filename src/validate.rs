//! Configuration and credential validation
//!
//! Structural checks run before any page is fetched; the credential check
//! issues one cheap probe request with no retrying so a misconfigured
//! account fails fast with an actionable message.

use crate::auth::AuthMethod;
use crate::config::ConnectorConfig;
use crate::error::{Error, Result};
use crate::http::ApiClient;
use crate::types::API_PATH;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static HOST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https://[a-z0-9]+(-[a-z0-9]+)*\.zendesk\.com/?$")
        .unwrap_or_else(|e| unreachable!("invalid host pattern: {e}"))
});

/// Check the configuration before running a fetch.
///
/// Fails on a malformed login URL, empty credential fields, a missing
/// profile source, a partial marketplace attribution triple, or an
/// inverted time window. Suspicious but workable settings only warn.
pub fn validate_config(config: &ConnectorConfig) -> Result<()> {
    if !HOST_PATTERN.is_match(&config.login_url) {
        return Err(Error::config(format!(
            "Login URL, '{}', is unmatched expectation. \
             It should be followed this format: https://abc.zendesk.com/",
            config.login_url
        )));
    }

    validate_credential_fields(&config.auth)?;

    if config.profile_source.is_none() {
        return Err(Error::missing_field("profile_source"));
    }

    if config.has_any_marketplace_field() && !config.has_full_marketplace_triple() {
        return Err(Error::config(
            "All the marketplace fields (marketplace_integration_name, \
             marketplace_app_id, marketplace_org_id) are required to be set or unset together",
        ));
    }

    let window = config.time_window()?;
    if let (Some(start_time), Some(end_time)) = (window.start_time, window.end_time) {
        if end_time < start_time {
            return Err(Error::invalid_value(
                "end_time",
                "must not be earlier than start_time",
            ));
        }
    }

    if config.incremental && !config.dedup {
        warn!(
            "Records may be duplicated. You should have 'dedup: true' in your configuration \
             to dedup the records"
        );
    }
    if !config.incremental && config.start_time.is_some() {
        warn!("'start_time' is ignored when 'incremental' is false");
    }

    Ok(())
}

fn validate_credential_fields(auth: &AuthMethod) -> Result<()> {
    let missing: &[&str] = match auth {
        AuthMethod::Basic { username, password } => match (username.is_empty(), password.is_empty())
        {
            (false, false) => return Ok(()),
            _ => &["username", "password"],
        },
        AuthMethod::Token { username, token } => match (username.is_empty(), token.is_empty()) {
            (false, false) => return Ok(()),
            _ => &["username", "token"],
        },
        AuthMethod::Oauth { access_token } => {
            if access_token.is_empty() {
                &["access_token"]
            } else {
                return Ok(());
            }
        }
    };

    Err(Error::config(format!(
        "{} are required for authentication method '{}'",
        missing.join(" and "),
        auth.name()
    )))
}

/// Probe the API once to confirm the credential works.
///
/// Fetches a single user with no retrying and maps the common failure
/// statuses to operator-facing messages.
pub async fn check_credentials(client: &ApiClient) -> Result<()> {
    let url = format!(
        "{}{}/users.json?per_page=1",
        client.config().base_url(),
        API_PATH
    );

    match client.send_once(&url).await {
        Ok(_) => Ok(()),
        Err(Error::Api { status: 401, .. }) => {
            Err(Error::config("Could not authorize with your credential."))
        }
        Err(Error::Api { status: 403, .. }) => {
            Err(Error::config("Your account doesn't have enough permission."))
        }
        Err(e) => Err(Error::config(format!(
            "Could not authorize with your credential due to problems {e}"
        ))),
    }
}
