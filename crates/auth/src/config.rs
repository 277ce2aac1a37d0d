//! Identity-provider configuration
//!
//! Endpoint derivation follows the Keycloak realm URL layout:
//! `{base}/realms/{realm}/protocol/openid-connect/{operation}`.

/// OIDC provider configuration
#[derive(Debug, Clone)]
pub struct OidcConfig {
    /// Identity provider base URL (e.g. "https://id.convo.app")
    pub base_url: String,

    /// Realm name (e.g. "convo")
    pub realm: String,

    /// Public client id registered for the frontend
    pub client_id: String,

    /// Redirect URI receiving the authorization code callback
    pub redirect_uri: String,

    /// Where the provider sends the user agent after end-session
    pub post_logout_redirect_uri: String,

    /// Scopes requested on every grant
    pub scopes: Vec<String>,
}

impl OidcConfig {
    /// Create a configuration with the default `openid profile email` scopes.
    #[must_use]
    pub fn new(
        base_url: String,
        realm: String,
        client_id: String,
        redirect_uri: String,
        post_logout_redirect_uri: String,
    ) -> Self {
        Self {
            base_url,
            realm,
            client_id,
            redirect_uri,
            post_logout_redirect_uri,
            scopes: vec!["openid".to_string(), "profile".to_string(), "email".to_string()],
        }
    }

    fn realm_endpoint(&self, operation: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.base_url.trim_end_matches('/'),
            self.realm,
            operation
        )
    }

    /// Authorization endpoint (browser redirect target for login)
    #[must_use]
    pub fn authorization_endpoint(&self) -> String {
        self.realm_endpoint("auth")
    }

    /// Token endpoint (form-encoded POST target for all three grants)
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        self.realm_endpoint("token")
    }

    /// End-session endpoint (browser redirect target for logout)
    #[must_use]
    pub fn end_session_endpoint(&self) -> String {
        self.realm_endpoint("logout")
    }

    /// Registration endpoint (browser redirect target for sign-up)
    #[must_use]
    pub fn registration_endpoint(&self) -> String {
        self.realm_endpoint("registrations")
    }

    /// Get scopes as a space-separated string
    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use super::*;

    fn test_config() -> OidcConfig {
        OidcConfig::new(
            "http://localhost:8180".to_string(),
            "convo".to_string(),
            "convo-web".to_string(),
            "http://localhost:3000/auth/callback".to_string(),
            "http://localhost:3000".to_string(),
        )
    }

    /// Validates `OidcConfig` endpoint derivation for the realm layout
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms each endpoint follows the
    ///   `/realms/{realm}/protocol/openid-connect/*` shape.
    #[test]
    fn test_realm_endpoints() {
        let config = test_config();
        let base = "http://localhost:8180/realms/convo/protocol/openid-connect";

        assert_eq!(config.authorization_endpoint(), format!("{base}/auth"));
        assert_eq!(config.token_endpoint(), format!("{base}/token"));
        assert_eq!(config.end_session_endpoint(), format!("{base}/logout"));
        assert_eq!(config.registration_endpoint(), format!("{base}/registrations"));
    }

    /// Validates `OidcConfig` behavior for the trailing-slash base URL
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures a trailing slash on the base URL does not double up.
    #[test]
    fn test_trailing_slash_is_normalized() {
        let mut config = test_config();
        config.base_url = "http://localhost:8180/".to_string();
        assert_eq!(
            config.token_endpoint(),
            "http://localhost:8180/realms/convo/protocol/openid-connect/token"
        );
    }

    /// Validates the default scope scenario.
    ///
    /// Assertions:
    /// - Confirms `scope_string()` equals `"openid profile email"`.
    #[test]
    fn test_default_scopes() {
        assert_eq!(test_config().scope_string(), "openid profile email");
    }
}
