//! OAuth2 Authorization-Code-with-PKCE and session lifecycle for Convo
//! frontends.
//!
//! This crate is the authentication core shared by the Convo single-page
//! applications. It implements the RFC 7636 PKCE flow against a
//! Keycloak-style OIDC provider, persists credentials through a pluggable
//! storage backend, and drives a process-wide session state machine with
//! silent token refresh. Rendering, routing, and the REST client wrappers
//! live with the applications; they consume the session state exposed here.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │  SessionController  │  State machine: restore / login / refresh / logout
//! └──────────┬──────────┘
//!            │
//!            ├──► TokenClient       (token-endpoint HTTP, redirect URLs)
//!            │         │
//!            │         └──► pkce    (verifier + S256 challenge)
//!            │
//!            ├──► CredentialStore   (typed keys over a pluggable backend)
//!            │
//!            └──► jwt               (display-only claim decoding)
//!
//!   ProtectedRoute / PublicOnlyRoute read the published Session snapshots.
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use convo_auth::{
//!     AuthError, CredentialStore, MemoryStorage, OidcConfig, SessionController, SystemClock,
//!     TokenClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AuthError> {
//!     let config = OidcConfig::new(
//!         "http://localhost:8180".to_string(),
//!         "convo".to_string(),
//!         "convo-web".to_string(),
//!         "http://localhost:3000/auth/callback".to_string(),
//!         "http://localhost:3000".to_string(),
//!     );
//!
//!     let store = Arc::new(CredentialStore::new(
//!         Arc::new(MemoryStorage::new()),
//!         Arc::new(SystemClock),
//!     ));
//!     let client = Arc::new(TokenClient::new(config, store.clone())?);
//!     let session = Arc::new(SessionController::new(client, store));
//!
//!     // Restore any stored session, then keep it fresh in the background.
//!     session.initialize().await;
//!     session.start_auto_refresh();
//!
//!     if !session.is_authenticated() {
//!         let url = session.authorization_url("/");
//!         println!("open this URL to sign in: {url}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`config`]: provider configuration and realm endpoint derivation
//! - [`error`]: the `AuthError` taxonomy
//! - [`pkce`]: verifier and challenge generation (RFC 7636)
//! - [`jwt`]: non-verifying ID-token claim decoding
//! - [`types`]: token responses, the persisted bundle, user profile, session
//! - [`clock`]: injectable time source
//! - [`storage`]: pluggable credential backend and the typed key schema
//! - [`client`]: token-endpoint HTTP client and redirect URL builders
//! - [`session`]: the session controller state machine
//! - [`guards`]: declarative route-gate decisions

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod guards;
pub mod jwt;
pub mod pkce;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types and functions
pub use client::{TokenClient, TokenClientTrait};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::OidcConfig;
pub use error::{AuthError, ProviderError};
pub use guards::{GuardDecision, ProtectedRoute, PublicOnlyRoute};
pub use jwt::decode_claims;
pub use pkce::{derive_challenge, generate_verifier, PkceChallenge};
pub use session::SessionController;
pub use storage::{CredentialStorage, CredentialStore, MemoryStorage, NoopStorage};
pub use types::{Session, TokenBundle, TokenResponse, UserProfile};
