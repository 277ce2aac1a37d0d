//! Route guards
//!
//! Declarative gates over the current [`Session`]: thin decision logic the
//! UI layer maps onto rendering, placeholders, and navigation. A `Loading`
//! session always defers the decision: it is never treated as
//! unauthenticated, so no redirect fires before the startup restore
//! finishes.

use crate::types::Session;

/// What a guard wants the UI layer to do for the current session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Render the guarded content.
    Render,

    /// Session still restoring; show a placeholder and re-evaluate on the
    /// next state transition.
    Defer,

    /// Render the guard's configured fallback instead of the content.
    Fallback,

    /// Navigate the user agent to this target.
    Redirect(String),
}

/// Gate that admits only authenticated sessions
///
/// Unauthenticated visitors are redirected to the login entry point with the
/// current path carried as a return target, or shown a fallback when no
/// redirect target is configured.
#[derive(Debug, Clone)]
pub struct ProtectedRoute {
    redirect_to: Option<String>,
}

impl ProtectedRoute {
    /// Gate redirecting unauthenticated visitors to `/login`.
    #[must_use]
    pub fn new() -> Self {
        Self { redirect_to: Some("/login".to_string()) }
    }

    /// Gate redirecting to a custom login entry point.
    #[must_use]
    pub fn with_redirect(target: impl Into<String>) -> Self {
        Self { redirect_to: Some(target.into()) }
    }

    /// Gate rendering a fallback instead of redirecting.
    #[must_use]
    pub fn with_fallback() -> Self {
        Self { redirect_to: None }
    }

    /// Decide for the given session snapshot; `current_path` becomes the
    /// return target on redirect.
    #[must_use]
    pub fn evaluate(&self, session: &Session, current_path: &str) -> GuardDecision {
        if session.is_loading {
            return GuardDecision::Defer;
        }
        if session.is_authenticated {
            return GuardDecision::Render;
        }
        match &self.redirect_to {
            Some(target) => GuardDecision::Redirect(format!(
                "{target}?returnTo={}",
                urlencoding::encode(current_path)
            )),
            None => GuardDecision::Fallback,
        }
    }
}

impl Default for ProtectedRoute {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirror gate for login/registration entry points
///
/// Sends already-authenticated sessions away so signed-in users never see
/// the login screen.
#[derive(Debug, Clone)]
pub struct PublicOnlyRoute {
    redirect_to: String,
}

impl PublicOnlyRoute {
    /// Gate redirecting authenticated visitors to the app root.
    #[must_use]
    pub fn new() -> Self {
        Self { redirect_to: "/".to_string() }
    }

    /// Gate redirecting authenticated visitors to a custom target.
    #[must_use]
    pub fn with_redirect(target: impl Into<String>) -> Self {
        Self { redirect_to: target.into() }
    }

    /// Decide for the given session snapshot.
    #[must_use]
    pub fn evaluate(&self, session: &Session) -> GuardDecision {
        if session.is_loading {
            return GuardDecision::Defer;
        }
        if session.is_authenticated {
            return GuardDecision::Redirect(self.redirect_to.clone());
        }
        GuardDecision::Render
    }
}

impl Default for PublicOnlyRoute {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for guards.
    use super::*;
    use crate::types::UserProfile;

    fn authenticated_session() -> Session {
        let user = UserProfile {
            id: "u1".to_string(),
            username: "alice".to_string(),
            email: String::new(),
            display_name: "alice".to_string(),
            avatar_url: None,
        };
        Session::authenticated(user, "token".to_string())
    }

    /// Validates `ProtectedRoute::evaluate` across the three session states.
    ///
    /// Assertions:
    /// - Confirms `Loading` defers (never redirects).
    /// - Confirms authenticated sessions render.
    /// - Confirms unauthenticated sessions redirect with the return target.
    #[test]
    fn test_protected_route_decisions() {
        let guard = ProtectedRoute::new();

        assert_eq!(guard.evaluate(&Session::loading(), "/feed"), GuardDecision::Defer);
        assert_eq!(guard.evaluate(&authenticated_session(), "/feed"), GuardDecision::Render);
        assert_eq!(
            guard.evaluate(&Session::unauthenticated(), "/feed/42"),
            GuardDecision::Redirect("/login?returnTo=%2Ffeed%2F42".to_string())
        );
    }

    /// Validates `ProtectedRoute::with_fallback` behavior for the no-redirect
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms unauthenticated sessions get `Fallback` instead of a
    ///   redirect.
    #[test]
    fn test_protected_route_fallback() {
        let guard = ProtectedRoute::with_fallback();
        assert_eq!(guard.evaluate(&Session::unauthenticated(), "/feed"), GuardDecision::Fallback);
        assert_eq!(guard.evaluate(&Session::loading(), "/feed"), GuardDecision::Defer);
    }

    /// Validates `PublicOnlyRoute::evaluate` across the three session
    /// states.
    ///
    /// Assertions:
    /// - Confirms `Loading` defers.
    /// - Confirms authenticated sessions are redirected away.
    /// - Confirms unauthenticated sessions render the entry point.
    #[test]
    fn test_public_only_route_decisions() {
        let guard = PublicOnlyRoute::with_redirect("/feed");

        assert_eq!(guard.evaluate(&Session::loading()), GuardDecision::Defer);
        assert_eq!(
            guard.evaluate(&authenticated_session()),
            GuardDecision::Redirect("/feed".to_string())
        );
        assert_eq!(guard.evaluate(&Session::unauthenticated()), GuardDecision::Render);
    }
}
