//! Session controller
//!
//! Process-wide authentication state machine. States: `Loading` (entered
//! once, at startup) then `Authenticated` or `Unauthenticated`; logout and
//! failed refreshes fall back to `Unauthenticated`, successful logins and
//! code exchanges move to `Authenticated`.
//!
//! The controller owns:
//! - the startup restore pass over the credential store,
//! - the three login entry points (password, code exchange, redirect URLs),
//! - the single-flight refresh path shared by user-triggered and periodic
//!   refreshes,
//! - the background refresh task, torn down with the controller,
//! - a watch channel publishing every state transition to dependents.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::client::TokenClientTrait;
use crate::clock::Clock;
use crate::error::AuthError;
use crate::jwt;
use crate::storage::{CredentialStorage, CredentialStore};
use crate::types::{Session, TokenBundle, TokenResponse, UserProfile};

/// How often the background task re-evaluates the expiry predicate.
pub const REFRESH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Authentication state machine over a token client and credential store
///
/// Explicitly constructed with its collaborators injected; consumers receive
/// it by reference or subscribe to its watch channel. Not a singleton.
pub struct SessionController<C, S, T> {
    client: Arc<C>,
    store: Arc<CredentialStore<S, T>>,
    state: watch::Sender<Session>,
    /// Guards the refresh network call: at most one in flight, concurrent
    /// callers wait here and then observe the fresh expiry instead of
    /// issuing a duplicate request.
    refresh_gate: tokio::sync::Mutex<()>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl<C, S, T> SessionController<C, S, T>
where
    C: TokenClientTrait + 'static,
    S: CredentialStorage + 'static,
    T: Clock + 'static,
{
    /// Create a controller in the `Loading` state.
    #[must_use]
    pub fn new(client: Arc<C>, store: Arc<CredentialStore<S, T>>) -> Self {
        let (state, _) = watch::channel(Session::loading());
        Self { client, store, state, refresh_gate: tokio::sync::Mutex::new(()), refresh_task: Mutex::new(None) }
    }

    /// Restore the session from stored credentials at startup
    ///
    /// Resolution order: no stored token or user → `Unauthenticated`; valid
    /// token → `Authenticated` immediately; expired token → one refresh
    /// attempt, success keeps the cached user, failure clears everything.
    /// Returns the resulting session snapshot. Guards observing `Loading`
    /// must defer their decision until this completes.
    pub async fn initialize(&self) -> Session {
        let token = self.store.access_token();
        let user = self.store.stored_user();

        let next = match (token, user) {
            (Some(token), Some(user)) if !self.store.is_token_expired() => {
                info!("session restored from stored credentials");
                Session::authenticated(user, token)
            }
            (Some(_), Some(user)) => {
                debug!("stored access token expired, attempting refresh");
                // The restore refresh shares the single-flight gate with
                // user-triggered refreshes; two paths must never race the
                // same refresh token.
                let _gate = self.refresh_gate.lock().await;
                let outcome = if self.store.is_token_expired() {
                    self.refresh_locked().await
                } else {
                    // A refresh that completed while we waited already
                    // renewed the token.
                    self.store.access_token().ok_or(AuthError::NotAuthenticated)
                };
                match outcome {
                    Ok(access_token) => {
                        info!("session restored via token refresh");
                        Session::authenticated(user, access_token)
                    }
                    Err(e) => {
                        warn!(error = %e, "startup refresh failed, clearing credentials");
                        self.store.clear();
                        Session::unauthenticated()
                    }
                }
            }
            _ => {
                debug!("no stored credentials");
                Session::unauthenticated()
            }
        };

        self.state.send_replace(next.clone());
        next
    }

    /// Direct login with username/password (resource-owner password grant)
    ///
    /// # Errors
    /// Returns the token client's failure untouched; a failed login leaves
    /// any prior session state as it was.
    pub async fn login_with_password(
        &self,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, AuthError> {
        let response = self.client.password_login(username, password).await?;
        Ok(self.complete_login(response))
    }

    /// Complete the PKCE flow by exchanging the callback's authorization code
    ///
    /// # Errors
    /// Returns [`AuthError::MissingVerifier`] when the callback has no
    /// matching PKCE state, or the exchange failure; prior session state is
    /// left untouched on failure.
    pub async fn login_with_code(&self, code: &str) -> Result<UserProfile, AuthError> {
        let response = self.client.exchange_authorization_code(code).await?;
        Ok(self.complete_login(response))
    }

    /// Persist a successful token response and transition to
    /// `Authenticated`. Claims are display-only; a malformed ID token
    /// degrades to an empty profile rather than failing the login.
    fn complete_login(&self, response: TokenResponse) -> UserProfile {
        let claims = jwt::decode_claims(&response.id_token);
        let user = UserProfile::from_claims(&claims);

        let bundle = TokenBundle::from(response);
        self.store.store_bundle(&bundle);
        self.store.store_user(&user);

        self.state.send_replace(Session::authenticated(user.clone(), bundle.access_token));
        info!(user = %user.username, "session authenticated");

        user
    }

    /// Refresh the access token, coalescing concurrent callers
    ///
    /// Only one refresh network call is ever outstanding: callers arriving
    /// while one is in flight wait on the gate and then observe the renewed
    /// expiry instead of issuing a second request (most providers invalidate
    /// a refresh token after first use).
    ///
    /// # Errors
    /// A failed refresh always clears stored credentials and transitions to
    /// `Unauthenticated` before the error is returned.
    pub async fn refresh(&self) -> Result<(), AuthError> {
        let _gate = self.refresh_gate.lock().await;

        // A refresh that completed while we waited (user-triggered or the
        // startup restore) already renewed the token; this call becomes a
        // no-op that shares its outcome.
        if !self.store.is_token_expired() {
            return Ok(());
        }

        let access_token = match self.refresh_locked().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "token refresh failed, clearing session");
                self.store.clear();
                self.state.send_replace(Session::unauthenticated());
                return Err(e);
            }
        };

        let user = self.store.stored_user();
        self.state.send_replace(match user {
            Some(user) => Session::authenticated(user, access_token),
            None => Session::unauthenticated(),
        });
        info!("access token refreshed");

        Ok(())
    }

    /// Run the refresh grant against the stored refresh token. Does not
    /// touch session state; callers decide what a failure means.
    async fn refresh_locked(&self) -> Result<String, AuthError> {
        let refresh_token = self.store.refresh_token().ok_or(AuthError::NotAuthenticated)?;

        let response = self.client.refresh_with_token(&refresh_token).await?;
        let bundle = TokenBundle::from(response);
        self.store.store_bundle(&bundle);

        Ok(bundle.access_token)
    }

    /// Log out: clear all stored credentials, transition to
    /// `Unauthenticated`, and return the provider's end-session redirect URL
    /// for the UI shell to navigate to.
    pub fn logout(&self) -> String {
        self.store.clear();
        self.state.send_replace(Session::unauthenticated());
        info!("session cleared (logged out)");

        self.client.end_session_url()
    }

    /// Build the authorization redirect URL for the PKCE login flow.
    pub fn authorization_url(&self, return_to: &str) -> String {
        self.client.authorization_url(return_to)
    }

    /// Build the registration redirect URL.
    pub fn registration_url(&self, return_to: &str) -> String {
        self.client.registration_url(return_to)
    }

    /// Start the periodic refresh task
    ///
    /// Ticks every [`REFRESH_CHECK_INTERVAL`]; when the session is
    /// authenticated and the expiry predicate fires, runs the same refresh
    /// path as user-triggered refreshes (sharing the single-flight gate).
    /// The task holds only a weak reference and exits when the controller
    /// is dropped; [`shutdown`](Self::shutdown) tears it down eagerly.
    pub fn start_auto_refresh(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(REFRESH_CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately; consume it so the loop
            // starts one interval out.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(controller) = weak.upgrade() else { break };

                if !controller.is_authenticated() || !controller.store.is_token_expired() {
                    continue;
                }

                debug!("periodic check: token expiring, refreshing");
                if let Err(e) = controller.refresh().await {
                    warn!(error = %e, "periodic refresh failed");
                }
            }
        });

        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Tear down the periodic refresh task, if running.
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                debug!("periodic refresh task stopped");
            }
        }
    }

    /// Current session snapshot.
    #[must_use]
    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Subscribe to session state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Whether the current state is `Authenticated`.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated
    }

    /// Current access token, if authenticated.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }
}

impl<C, S, T> Drop for SessionController<C, S, T> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.refresh_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}
