//! Netlify Identity (GoTrue) provider.
//!
//! The browser widget persists an access token; restoring the session means
//! asking the GoTrue `/user` endpoint who that token belongs to. The answer
//! is cached so `current_user()` stays synchronous afterwards.

use std::sync::RwLock;

use serde::Deserialize;

use crate::{AuthError, IdentityFuture, IdentityProvider, IdentityUser};

/// Response from GoTrue's `/user` endpoint (fields we use).
#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Identity provider backed by a GoTrue access token.
pub struct GoTrueIdentity {
    url: String,
    access_token: Option<String>,
    user: RwLock<Option<IdentityUser>>,
    http_client: reqwest::Client,
}

impl GoTrueIdentity {
    /// Create a provider for the identity endpoint (e.g.
    /// `https://aderrignw.ie/.netlify/identity`) holding an optional token.
    pub fn new(url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            user: RwLock::new(None),
            http_client: reqwest::Client::new(),
        }
    }

    async fn fetch_user(&self) -> Result<Option<IdentityUser>, AuthError> {
        let Some(token) = self.access_token.as_deref() else {
            return Ok(None);
        };

        let response = self
            .http_client
            .get(format!("{}/user", self.url))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::IdentityUnavailable(format!("user request failed: {e}")))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidToken(format!(
                "identity rejected token (HTTP {status})"
            )));
        }
        if !status.is_success() {
            return Err(AuthError::IdentityUnavailable(format!("HTTP {status}")));
        }

        let info: GoTrueUser = response.json().await.map_err(|e| {
            AuthError::IdentityUnavailable(format!("user response parse failed: {e}"))
        })?;

        let email = info.email.ok_or(AuthError::MissingEmail)?;
        let user = IdentityUser::new(&email, info.id);
        if !user.has_email() {
            return Err(AuthError::MissingEmail);
        }

        log::info!("Session restored for {}", user.email);
        Ok(Some(user))
    }
}

impl IdentityProvider for GoTrueIdentity {
    fn current_user(&self) -> Option<IdentityUser> {
        self.user.read().ok().and_then(|u| u.clone())
    }

    fn token(&self) -> IdentityFuture<'_, Option<String>> {
        // A token whose owner was never confirmed is not attached to requests.
        let token = self.current_user().and(self.access_token.clone());
        Box::pin(async move { Ok(token) })
    }

    fn restore(&self) -> IdentityFuture<'_, Option<IdentityUser>> {
        Box::pin(async move {
            let user = self.fetch_user().await?;
            if let Ok(mut cached) = self.user.write() {
                *cached = user.clone();
            }
            Ok(user)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_restore_without_token_is_anonymous() {
        let identity = GoTrueIdentity::new("http://127.0.0.1:9", None);
        assert!(identity.restore().await.unwrap().is_none());
        assert!(identity.current_user().is_none());
    }

    #[tokio::test]
    async fn test_restore_valid_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.netlify/identity/user"))
            .and(header("authorization", "Bearer good"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"id": "u-1", "email": "Alice@X.ie"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let identity = GoTrueIdentity::new(
            format!("{}/.netlify/identity/", server.uri()),
            Some("good".to_string()),
        );
        assert!(identity.current_user().is_none());
        assert_eq!(identity.token().await.unwrap(), None);

        let user = identity.restore().await.unwrap().unwrap();
        assert_eq!(user.email, "alice@x.ie");
        assert_eq!(user.subject, "u-1");
        assert_eq!(identity.current_user(), Some(user));
        assert_eq!(identity.token().await.unwrap().as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_restore_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let identity = GoTrueIdentity::new(server.uri(), Some("expired".to_string()));
        let err = identity.restore().await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
        assert!(identity.current_user().is_none());
    }

    #[tokio::test]
    async fn test_restore_missing_email() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u-2"})))
            .mount(&server)
            .await;

        let identity = GoTrueIdentity::new(server.uri(), Some("tok".to_string()));
        assert!(matches!(
            identity.restore().await.unwrap_err(),
            AuthError::MissingEmail
        ));
    }

    #[tokio::test]
    async fn test_restore_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/user"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let identity = GoTrueIdentity::new(server.uri(), Some("tok".to_string()));
        let err = identity.restore().await.unwrap_err();
        assert!(!err.is_client_error());
    }
}
