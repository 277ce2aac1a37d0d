//! Token-endpoint HTTP client
//!
//! Talks to the identity provider with `application/x-www-form-urlencoded`
//! bodies for the three grant types this crate supports, and builds the
//! browser redirect URLs for login, registration, and logout. All three
//! grants share one request helper; none of them retries. Retry policy
//! belongs to the caller.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::clock::Clock;
use crate::config::OidcConfig;
use crate::error::{AuthError, ProviderError};
use crate::pkce::PkceChallenge;
use crate::storage::{CredentialStorage, CredentialStore};
use crate::types::TokenResponse;

/// Trait for token-endpoint operations
///
/// Abstracts the identity provider so the session controller can be tested
/// with mock implementations.
#[async_trait]
pub trait TokenClientTrait: Send + Sync {
    /// Build the authorization redirect URL, generating and storing a fresh
    /// PKCE verifier. `return_to` rides along in `state` so the callback can
    /// navigate back.
    fn authorization_url(&self, return_to: &str) -> String;

    /// Build the registration redirect URL with the same PKCE parameters as
    /// login.
    fn registration_url(&self, return_to: &str) -> String;

    /// Build the end-session redirect URL with the post-logout target.
    fn end_session_url(&self) -> String;

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// Returns [`AuthError::MissingVerifier`] if no PKCE verifier is stored
    /// (no network call is made), [`AuthError::ExchangeFailed`] on provider
    /// rejection, [`AuthError::ServiceUnavailable`] on transport failure.
    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenResponse, AuthError>;

    /// Mint a new token set from a refresh token
    ///
    /// # Errors
    /// Returns [`AuthError::RefreshFailed`] on provider rejection,
    /// [`AuthError::ServiceUnavailable`] on transport failure.
    async fn refresh_with_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError>;

    /// Resource-owner password login (legacy/direct path for first-party
    /// clients only)
    ///
    /// # Errors
    /// Returns [`AuthError::LoginFailed`] carrying the provider's
    /// `error_description` when present, [`AuthError::ServiceUnavailable`]
    /// on transport failure.
    async fn password_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError>;
}

/// What the shared request helper can report back to a grant call.
enum TokenEndpointError {
    Transport(reqwest::Error),
    Provider(Option<ProviderError>),
    Parse(String),
}

impl TokenEndpointError {
    /// Map onto the per-grant failure variant. Transport failures are the
    /// same user-facing problem regardless of grant type.
    fn into_grant_failure(self, failure: fn(String) -> AuthError) -> AuthError {
        match self {
            Self::Transport(e) => AuthError::ServiceUnavailable(e.to_string()),
            Self::Provider(Some(body)) => failure(body.to_string()),
            Self::Provider(None) => failure("identity provider rejected the request".to_string()),
            Self::Parse(msg) => failure(msg),
        }
    }
}

/// HTTP client for the identity provider's token endpoint
///
/// Holds the PKCE verifier slot (through the credential store) so the
/// authorize redirect and the later callback exchange agree on one verifier.
pub struct TokenClient<S, T> {
    config: OidcConfig,
    http: Client,
    store: Arc<CredentialStore<S, T>>,
}

impl<S, T> TokenClient<S, T>
where
    S: CredentialStorage,
    T: Clock,
{
    /// Create a client for the configured provider
    ///
    /// # Errors
    /// Returns [`AuthError::ClientBuild`] if the TLS backend fails to
    /// initialize.
    pub fn new(config: OidcConfig, store: Arc<CredentialStore<S, T>>) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AuthError::ClientBuild(e.to_string()))?;

        Ok(Self { config, http, store })
    }

    /// Get a reference to the provider configuration
    #[must_use]
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    fn encode_query(params: &[(&str, &str)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Shared redirect builder for the authorization and registration
    /// endpoints; both carry a fresh PKCE challenge.
    fn code_flow_url(&self, endpoint: String, return_to: &str) -> String {
        let pkce = PkceChallenge::generate();
        self.store.store_verifier(&pkce.verifier);

        let scope = self.config.scope_string();
        let query = Self::encode_query(&[
            ("client_id", &self.config.client_id),
            ("redirect_uri", &self.config.redirect_uri),
            ("response_type", "code"),
            ("scope", &scope),
            ("state", return_to),
            ("code_challenge", &pkce.challenge),
            ("code_challenge_method", pkce.challenge_method()),
        ]);

        format!("{endpoint}?{query}")
    }

    /// Shared form-POST against the token endpoint.
    async fn post_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, TokenEndpointError> {
        let response = self
            .http
            .post(self.config.token_endpoint())
            .form(form)
            .send()
            .await
            .map_err(TokenEndpointError::Transport)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.json::<ProviderError>().await.ok();
            debug!(status = %status, "token endpoint rejected the request");
            return Err(TokenEndpointError::Provider(body));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| TokenEndpointError::Parse(format!("invalid token response: {e}")))
    }
}

#[async_trait]
impl<S, T> TokenClientTrait for TokenClient<S, T>
where
    S: CredentialStorage + 'static,
    T: Clock + 'static,
{
    fn authorization_url(&self, return_to: &str) -> String {
        self.code_flow_url(self.config.authorization_endpoint(), return_to)
    }

    fn registration_url(&self, return_to: &str) -> String {
        self.code_flow_url(self.config.registration_endpoint(), return_to)
    }

    fn end_session_url(&self) -> String {
        let query = Self::encode_query(&[
            ("client_id", &self.config.client_id),
            ("post_logout_redirect_uri", &self.config.post_logout_redirect_uri),
        ]);
        format!("{}?{}", self.config.end_session_endpoint(), query)
    }

    async fn exchange_authorization_code(&self, code: &str) -> Result<TokenResponse, AuthError> {
        // Single use: the verifier is gone after this point whether the
        // exchange succeeds or not.
        let verifier = self.store.take_verifier().ok_or(AuthError::MissingVerifier)?;

        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", verifier.as_str()),
        ];

        self.post_token(&form).await.map_err(|e| e.into_grant_failure(AuthError::ExchangeFailed))
    }

    async fn refresh_with_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];

        self.post_token(&form).await.map_err(|e| e.into_grant_failure(AuthError::RefreshFailed))
    }

    async fn password_login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, AuthError> {
        let scope = self.config.scope_string();
        let form = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("username", username),
            ("password", password),
            ("scope", scope.as_str()),
        ];

        self.post_token(&form).await.map_err(|e| e.into_grant_failure(AuthError::LoginFailed))
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for client. Network behavior is covered by the wiremock
    //! integration suite; these tests exercise URL construction and the
    //! verifier precondition.
    use super::*;
    use crate::clock::MockClock;
    use crate::storage::MemoryStorage;

    type TestClient = TokenClient<MemoryStorage, MockClock>;

    fn test_client() -> (TestClient, Arc<CredentialStore<MemoryStorage, MockClock>>) {
        let store = Arc::new(CredentialStore::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MockClock::new(0)),
        ));
        let config = OidcConfig::new(
            "http://localhost:8180".to_string(),
            "convo".to_string(),
            "convo-web".to_string(),
            "http://localhost:3000/auth/callback".to_string(),
            "http://localhost:3000".to_string(),
        );
        (TokenClient::new(config, store.clone()).expect("client builds"), store)
    }

    /// Validates `authorization_url` contents for the code-flow scenario.
    ///
    /// Assertions:
    /// - Ensures the URL targets the authorization endpoint.
    /// - Ensures `response_type=code`, the challenge, and `S256` are present.
    /// - Ensures the return path rides along urlencoded in `state`.
    /// - Confirms the matching verifier landed in storage.
    #[test]
    fn test_authorization_url_carries_pkce_and_state() {
        let (client, store) = test_client();

        let url = client.authorization_url("/feed/42");
        assert!(url
            .starts_with("http://localhost:8180/realms/convo/protocol/openid-connect/auth?"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("client_id=convo-web"));
        assert!(url.contains("code_challenge="));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("state=%2Ffeed%2F42"));
        assert!(url.contains("scope=openid%20profile%20email"));

        let verifier = store.take_verifier().expect("verifier stored");
        let challenge = crate::pkce::derive_challenge(&verifier);
        assert!(url.contains(&format!("code_challenge={challenge}")));
    }

    /// Validates `registration_url` behavior for the sign-up redirect
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the URL targets the registrations endpoint with PKCE
    ///   parameters.
    #[test]
    fn test_registration_url_targets_registrations_endpoint() {
        let (client, _store) = test_client();

        let url = client.registration_url("/");
        assert!(url.contains("/protocol/openid-connect/registrations?"));
        assert!(url.contains("code_challenge_method=S256"));
    }

    /// Validates `end_session_url` behavior for the logout redirect
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the URL targets the logout endpoint with the post-logout
    ///   target.
    #[test]
    fn test_end_session_url() {
        let (client, _store) = test_client();

        let url = client.end_session_url();
        assert!(url.contains("/protocol/openid-connect/logout?"));
        assert!(url.contains("client_id=convo-web"));
        assert!(url.contains("post_logout_redirect_uri=http%3A%2F%2Flocalhost%3A3000"));
    }

    /// Validates `exchange_authorization_code` behavior for the missing
    /// verifier scenario.
    ///
    /// Assertions:
    /// - Ensures the call fails with `MissingVerifier` before any network
    ///   I/O (no server is listening on the configured port).
    #[tokio::test]
    async fn test_exchange_without_verifier_fails_fast() {
        let (client, _store) = test_client();

        let result = client.exchange_authorization_code("code-123").await;
        assert!(matches!(result, Err(AuthError::MissingVerifier)));
    }

    /// Validates verifier consumption for the second authorize attempt
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms a second authorize overwrites the first verifier
    ///   (accepted race: one flow per browsing context).
    #[test]
    fn test_second_authorize_overwrites_verifier() {
        let (client, store) = test_client();

        let first = client.authorization_url("/");
        let second = client.authorization_url("/");
        assert_ne!(first, second);

        let verifier = store.take_verifier().expect("verifier stored");
        let challenge = crate::pkce::derive_challenge(&verifier);
        assert!(second.contains(&challenge));
        assert!(!first.contains(&challenge));
    }
}
