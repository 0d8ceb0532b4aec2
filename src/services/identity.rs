//! Identity provider client
//!
//! Exchanges an OAuth2 authorization code for the caller's profile. The
//! exchange is two requests: the code is traded for an access token at the
//! token endpoint, then the token is used to fetch the profile from the
//! userinfo endpoint. No retries are attempted.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::IdentityConfig;
use crate::models::ExternalIdentity;
use crate::validation::{non_blank, ValidationError, MAX_AUTH_CODE_LEN};

const USER_AGENT: &str = concat!("quiz-backend/", env!("CARGO_PKG_VERSION"));

/// A validated, non-empty authorization code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthCode(String);

impl AuthCode {
    /// Validate a raw code as received in a request
    pub fn parse(raw: Option<String>) -> Result<Self, ValidationError> {
        let raw = raw.ok_or(ValidationError::Missing("code"))?;
        non_blank(raw, "code", MAX_AUTH_CODE_LEN).map(AuthCode)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failures talking to the identity provider
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Identity provider rejected the request with status {status}")]
    Rejected { status: u16 },

    #[error("Identity provider returned an error: {0}")]
    Provider(String),

    #[error("Identity provider response is missing {0}")]
    MissingField(&'static str),
}

/// Resolves authorization codes into identities
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn exchange_code(&self, code: &AuthCode) -> Result<ExternalIdentity, IdentityError>;
}

/// OAuth2 authorization-code provider backed by `reqwest`
pub struct OAuthIdentityProvider {
    client: reqwest::Client,
    config: IdentityConfig,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl OAuthIdentityProvider {
    pub fn new(config: IdentityConfig) -> Result<Self, IdentityError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    async fn fetch_access_token(&self, code: &AuthCode) -> Result<String, IdentityError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        if let Some(redirect_uri) = &self.config.redirect_uri {
            form.push(("redirect_uri", redirect_uri.as_str()));
        }

        let response = self
            .client
            .post(&self.config.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let body: TokenResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(IdentityError::Provider(
                body.error_description.unwrap_or(error),
            ));
        }
        body.access_token
            .filter(|token| !token.is_empty())
            .ok_or(IdentityError::MissingField("access_token"))
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ExternalIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.config.userinfo_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(IdentityError::Rejected {
                status: response.status().as_u16(),
            });
        }

        let profile: Value = response.json().await?;
        identity_from_profile(&profile)
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityProvider {
    async fn exchange_code(&self, code: &AuthCode) -> Result<ExternalIdentity, IdentityError> {
        let access_token = self.fetch_access_token(code).await?;
        let identity = self.fetch_profile(&access_token).await?;
        tracing::debug!(subject = %identity.subject, "identity resolved");
        Ok(identity)
    }
}

/// Extract an identity from a userinfo document.
///
/// Accepts both OpenID Connect (`sub`, `preferred_username`) and GitHub
/// style (`id`, `login`) profiles.
pub fn identity_from_profile(profile: &Value) -> Result<ExternalIdentity, IdentityError> {
    let subject = ["sub", "id"]
        .iter()
        .find_map(|key| match profile.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .ok_or(IdentityError::MissingField("sub"))?;

    let username = ["preferred_username", "login", "name"]
        .iter()
        .find_map(|key| profile.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| subject.clone());

    let email = profile
        .get("email")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ExternalIdentity {
        subject,
        username,
        email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_auth_code_parse() {
        assert_eq!(AuthCode::parse(Some(" abc ".to_string())).unwrap().as_str(), "abc");
        assert_eq!(AuthCode::parse(None), Err(ValidationError::Missing("code")));
        assert_eq!(
            AuthCode::parse(Some(String::new())),
            Err(ValidationError::Empty("code"))
        );
        assert_eq!(
            AuthCode::parse(Some("   ".to_string())),
            Err(ValidationError::Empty("code"))
        );
        assert!(AuthCode::parse(Some("x".repeat(MAX_AUTH_CODE_LEN + 1))).is_err());
    }

    #[test]
    fn test_oidc_profile() {
        let identity = identity_from_profile(&json!({
            "sub": "abc-123",
            "preferred_username": "ada",
            "email": "ada@example.com"
        }))
        .unwrap();

        assert_eq!(identity.subject, "abc-123");
        assert_eq!(identity.username, "ada");
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[test]
    fn test_github_profile() {
        let identity = identity_from_profile(&json!({
            "id": 583231,
            "login": "octocat",
            "name": "The Octocat",
            "email": null
        }))
        .unwrap();

        assert_eq!(identity.subject, "583231");
        assert_eq!(identity.username, "octocat");
        assert!(identity.email.is_none());
    }

    #[test]
    fn test_profile_without_name_uses_subject() {
        let identity = identity_from_profile(&json!({ "sub": "s-1" })).unwrap();
        assert_eq!(identity.username, "s-1");
    }

    #[test]
    fn test_profile_without_subject_rejected() {
        let err = identity_from_profile(&json!({ "login": "nobody" })).unwrap_err();
        assert!(matches!(err, IdentityError::MissingField("sub")));
    }

    #[test]
    fn test_provider_builds_from_default_config() {
        assert!(OAuthIdentityProvider::new(IdentityConfig::default()).is_ok());
    }

    mod exchange {
        use super::*;
        use axum::{
            extract::State,
            http::{header::AUTHORIZATION, HeaderMap, StatusCode},
            response::{IntoResponse, Response},
            routing::{get, post},
            Form, Json, Router,
        };
        use std::collections::HashMap;
        use std::sync::{Arc, Mutex};

        type SeenForms = Arc<Mutex<Vec<HashMap<String, String>>>>;

        /// The token endpoint's answer depends on the code it receives
        async fn token_endpoint(
            State(seen): State<SeenForms>,
            Form(form): Form<HashMap<String, String>>,
        ) -> Response {
            let code = form.get("code").cloned().unwrap_or_default();
            seen.lock().unwrap().push(form);
            match code.as_str() {
                "denied" => (StatusCode::BAD_REQUEST, "denied").into_response(),
                "oauth-error" => Json(json!({
                    "error": "bad_verification_code",
                    "error_description": "The code is incorrect"
                }))
                .into_response(),
                "no-token" => Json(json!({ "token_type": "bearer" })).into_response(),
                "stale-token" => Json(json!({ "access_token": "stale" })).into_response(),
                _ => Json(json!({ "access_token": "tok-1" })).into_response(),
            }
        }

        async fn userinfo_endpoint(headers: HeaderMap) -> Response {
            match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
                Some("Bearer tok-1") => Json(json!({
                    "sub": "s-1",
                    "preferred_username": "ada",
                    "email": "ada@example.com"
                }))
                .into_response(),
                _ => StatusCode::UNAUTHORIZED.into_response(),
            }
        }

        async fn provider() -> (OAuthIdentityProvider, SeenForms) {
            let seen = SeenForms::default();
            let app = Router::new()
                .route("/token", post(token_endpoint))
                .route("/userinfo", get(userinfo_endpoint))
                .with_state(seen.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            let config = IdentityConfig {
                token_url: format!("http://{}/token", addr),
                userinfo_url: format!("http://{}/userinfo", addr),
                client_id: "client-1".to_string(),
                client_secret: "shh".to_string(),
                redirect_uri: Some("http://localhost:3000/callback".to_string()),
                timeout_secs: 5,
            };
            (OAuthIdentityProvider::new(config).unwrap(), seen)
        }

        fn code(raw: &str) -> AuthCode {
            AuthCode::parse(Some(raw.to_string())).unwrap()
        }

        #[tokio::test]
        async fn test_exchange_resolves_profile() {
            let (provider, seen) = provider().await;

            let identity = provider.exchange_code(&code("good")).await.unwrap();
            assert_eq!(identity.subject, "s-1");
            assert_eq!(identity.username, "ada");
            assert_eq!(identity.email.as_deref(), Some("ada@example.com"));

            let forms = seen.lock().unwrap();
            assert_eq!(forms.len(), 1);
            let form = &forms[0];
            assert_eq!(form["grant_type"], "authorization_code");
            assert_eq!(form["code"], "good");
            assert_eq!(form["client_id"], "client-1");
            assert_eq!(form["client_secret"], "shh");
            assert_eq!(form["redirect_uri"], "http://localhost:3000/callback");
        }

        #[tokio::test]
        async fn test_token_endpoint_status_is_rejected() {
            let (provider, _) = provider().await;
            let err = provider.exchange_code(&code("denied")).await.unwrap_err();
            assert!(matches!(err, IdentityError::Rejected { status: 400 }));
        }

        #[tokio::test]
        async fn test_oauth_error_body_is_provider_error() {
            let (provider, _) = provider().await;
            let err = provider.exchange_code(&code("oauth-error")).await.unwrap_err();
            match err {
                IdentityError::Provider(message) => assert_eq!(message, "The code is incorrect"),
                other => panic!("unexpected error: {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_missing_access_token() {
            let (provider, _) = provider().await;
            let err = provider.exchange_code(&code("no-token")).await.unwrap_err();
            assert!(matches!(err, IdentityError::MissingField("access_token")));
        }

        #[tokio::test]
        async fn test_userinfo_requires_issued_bearer() {
            let (provider, _) = provider().await;
            let err = provider.exchange_code(&code("stale-token")).await.unwrap_err();
            assert!(matches!(err, IdentityError::Rejected { status: 401 }));
        }
    }
}
