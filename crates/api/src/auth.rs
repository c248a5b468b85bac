//! Request authentication and owner scoping.
//!
//! Every service request carries `api_key` and `tides_id` in its body.
//! `tides_id` becomes the owner identity every downstream operation is
//! scoped to; request parameters can never address another owner's
//! entities because services only ever receive this resolved owner.

use serde_json::Value;
use tides_domain::AuthConfig;

/// Authenticated request identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub owner: String,
}

/// Auth failure with the message surfaced in the 401 body. Each missing
/// field gets its own message so clients can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRejection {
    pub message: String,
}

impl AuthRejection {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Validate the credentials in a request body and resolve the owner.
///
/// When `config.api_key` is set, the inbound key must match it exactly;
/// when unset, any non-empty key is accepted (development mode).
pub fn authenticate(config: &AuthConfig, body: &Value) -> Result<Identity, AuthRejection> {
    let api_key = body.get("api_key").and_then(Value::as_str).map(str::trim).unwrap_or("");
    if api_key.is_empty() {
        return Err(AuthRejection::new("api_key is required for all service requests"));
    }
    if let Some(expected) = &config.api_key {
        if api_key != expected {
            return Err(AuthRejection::new("invalid api_key"));
        }
    }

    let tides_id = body.get("tides_id").and_then(Value::as_str).map(str::trim).unwrap_or("");
    if tides_id.is_empty() {
        return Err(AuthRejection::new(
            "tides_id is required to identify the requesting user",
        ));
    }

    Ok(Identity { owner: tides_id.to_string() })
}
