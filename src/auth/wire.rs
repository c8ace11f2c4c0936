//! JSON bodies exchanged with the auth server
//!
//! Every response is parsed through a typed payload and validated before it
//! reaches the session, so a missing or ill-typed field fails with
//! [`Error::MalformedResponse`] instead of leaking defaults downstream.

use crate::auth::api::{LoginResponse, PermissionsResponse, RefreshResponse};
use crate::auth::models::{LoginType, Role, SessionUser};
use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// Longest token lifetime accepted from the server (one year)
pub const MAX_TOKEN_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Body of the SMS-code login call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginBody {
    pub phone: String,
    pub code: String,
    pub login_type: LoginType,
}

/// Body of the refresh call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginPayload {
    pub token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: LoginUserPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUserPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    pub user_name: String,
    pub phone: String,
    #[serde(default)]
    pub roles: Vec<RolePayload>,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolePayload {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    pub role_id: String,
    #[serde(alias = "role_name")]
    pub name: String,
    #[serde(default)]
    pub modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsPayload {
    pub user: PermissionsUserPayload,
    pub available_modules: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionsUserPayload {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshPayload {
    pub token: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Accept ids sent either as JSON strings or integers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}

fn decode<T: for<'de> Deserialize<'de>>(what: &str, body: serde_json::Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| Error::MalformedResponse(format!("{}: {}", what, e)))
}

fn require_token(what: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::MalformedResponse(format!("{}: empty {}", what, field)));
    }
    Ok(())
}

fn require_lifetime(what: &str, expires_in: i64) -> Result<()> {
    if expires_in <= 0 {
        return Err(Error::MalformedResponse(format!(
            "{}: expires_in must be positive, got {}",
            what, expires_in
        )));
    }
    if expires_in > MAX_TOKEN_LIFETIME_SECS {
        return Err(Error::MalformedResponse(format!(
            "{}: expires_in of {}s exceeds the {}s limit",
            what, expires_in, MAX_TOKEN_LIFETIME_SECS
        )));
    }
    Ok(())
}

pub fn parse_login_response(body: serde_json::Value) -> Result<LoginResponse> {
    let payload: LoginPayload = decode("login", body)?;
    require_token("login", "token", &payload.token)?;
    require_token("login", "refresh_token", &payload.refresh_token)?;
    require_lifetime("login", payload.expires_in)?;
    require_token("login", "user.user_id", &payload.user.user_id)?;

    let user = SessionUser {
        id: payload.user.user_id,
        name: payload.user.user_name,
        phone: payload.user.phone,
        roles: payload
            .user
            .roles
            .into_iter()
            .map(|r| Role {
                role_id: r.role_id,
                name: r.name,
                modules: r.modules,
            })
            .collect(),
        modules: payload.user.modules,
    };

    Ok(LoginResponse {
        access_token: payload.token,
        refresh_token: payload.refresh_token,
        expires_in: payload.expires_in,
        user,
    })
}

pub fn parse_permissions_response(body: serde_json::Value) -> Result<PermissionsResponse> {
    let payload: PermissionsPayload = decode("permissions", body)?;
    Ok(PermissionsResponse {
        user_id: payload.user.id,
        name: payload.user.name,
        phone: payload.user.phone,
        available_modules: payload.available_modules,
    })
}

pub fn parse_refresh_response(body: serde_json::Value) -> Result<RefreshResponse> {
    let payload: RefreshPayload = decode("refresh", body)?;
    require_token("refresh", "token", &payload.token)?;
    require_lifetime("refresh", payload.expires_in)?;
    Ok(RefreshResponse {
        access_token: payload.token,
        expires_in: payload.expires_in,
        refresh_token: payload.refresh_token.filter(|t| !t.trim().is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_login_response() {
        let body = json!({
            "token": "acc1",
            "refresh_token": "ref1",
            "expires_in": 3600,
            "user": {
                "user_id": "u1",
                "user_name": "Alice",
                "phone": "1380000000",
                "roles": [{"role_id": 7, "role_name": "brand-admin", "modules": ["projects"]}],
                "modules": ["dashboard"]
            }
        });

        let response = parse_login_response(body).unwrap();
        assert_eq!(response.access_token, "acc1");
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.user.id, "u1");
        assert_eq!(response.user.roles[0].role_id, "7");
        assert_eq!(response.user.roles[0].name, "brand-admin");
        assert_eq!(response.user.modules, vec!["dashboard".to_string()]);
    }

    #[test]
    fn test_numeric_user_id_is_accepted() {
        let body = json!({
            "token": "acc1",
            "refresh_token": "ref1",
            "expires_in": 60,
            "user": {"user_id": 42, "user_name": "Bob", "phone": "1"}
        });
        let response = parse_login_response(body).unwrap();
        assert_eq!(response.user.id, "42");
        assert!(response.user.roles.is_empty());
    }

    #[test]
    fn test_login_missing_field_is_malformed() {
        let body = json!({"token": "acc1", "expires_in": 60, "user": {}});
        let err = parse_login_response(body).unwrap_err();
        assert!(matches!(err, Error::MalformedResponse(msg) if msg.starts_with("login")));
    }

    #[test]
    fn test_login_empty_token_is_malformed() {
        let body = json!({
            "token": "",
            "refresh_token": "ref1",
            "expires_in": 60,
            "user": {"user_id": "u1", "user_name": "A", "phone": "1"}
        });
        assert!(matches!(
            parse_login_response(body),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_refresh_rejects_non_positive_lifetime() {
        let body = json!({"token": "acc2", "expires_in": 0});
        assert!(matches!(
            parse_refresh_response(body),
            Err(Error::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_absurd_lifetime_is_malformed() {
        let login = json!({
            "token": "acc1",
            "refresh_token": "ref1",
            "expires_in": i64::MAX,
            "user": {"user_id": "u1", "user_name": "A", "phone": "1"}
        });
        assert!(matches!(
            parse_login_response(login),
            Err(Error::MalformedResponse(msg)) if msg.contains("exceeds")
        ));

        let refresh = json!({"token": "acc2", "expires_in": MAX_TOKEN_LIFETIME_SECS + 1});
        assert!(matches!(
            parse_refresh_response(refresh),
            Err(Error::MalformedResponse(_))
        ));

        let longest = json!({"token": "acc2", "expires_in": MAX_TOKEN_LIFETIME_SECS});
        assert!(parse_refresh_response(longest).is_ok());
    }

    #[test]
    fn test_refresh_blank_rotation_token_is_ignored() {
        let body = json!({"token": "acc2", "expires_in": 60, "refresh_token": ""});
        let response = parse_refresh_response(body).unwrap();
        assert_eq!(response.refresh_token, None);
    }

    #[test]
    fn test_parse_permissions() {
        let body = json!({
            "user": {"id": "u1", "name": "Alice", "phone": "1"},
            "available_modules": ["dashboard", "analytics"]
        });
        let response = parse_permissions_response(body).unwrap();
        assert_eq!(response.available_modules.len(), 2);

        let missing = json!({"user": {"id": "u1", "name": "Alice", "phone": "1"}});
        assert!(parse_permissions_response(missing).is_err());
    }
}
