//! # Session Manager
//!
//! Owns the authentication lifecycle and publishes it as observable state.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   Anonymous ──login()──► Authenticating ──ok──► Authenticated          │
//! │       ▲                       │                      │                  │
//! │       │                      err                restore_on_startup()    │
//! │       │                       │                      │                  │
//! │       │                       ▼                      ▼                  │
//! │       └──────────────── (error stream)         Validating (background)  │
//! │       │                                         │            │          │
//! │       └───────────────── logout() ◄── expired/probe fails    ok         │
//! │                                                              │          │
//! │                                               Authenticated (no emit)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Observables
//! - `subscribe()` / `session_stream()`: every [`Session`] change
//! - `loading()`: true while a login or registration request is in flight
//! - `error()`: last user-facing failure message, cleared when a new request starts

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use shop_core::validation::validate_new_account;
use shop_core::{Credentials, NewAccount, Session, Token, UserProfile};

use crate::config::AuthSettings;
use crate::credential;
use crate::error::{ClientError, ClientResult};
use crate::gateway::AuthGateway;
use crate::token_store::TokenStore;

// =============================================================================
// Navigation
// =============================================================================

/// Views the engine can ask the shell to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
}

/// Routing collaborator notified on logout.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that ignores every request.
pub struct NoOpNavigator;

impl Navigator for NoOpNavigator {
    fn navigate(&self, _route: Route) {}
}

// =============================================================================
// Session Manager
// =============================================================================

struct Inner {
    gateway: Arc<dyn AuthGateway>,
    store: TokenStore,
    navigator: Arc<dyn Navigator>,
    auth: AuthSettings,
    session: watch::Sender<Session>,
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<String>>,
}

/// Authentication lifecycle. Clones share state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        store: TokenStore,
        navigator: Arc<dyn Navigator>,
        auth: AuthSettings,
    ) -> Self {
        let (session, _) = watch::channel(Session::anonymous());
        let (loading, _) = watch::channel(false);
        let (error, _) = watch::channel(None);

        SessionManager {
            inner: Arc::new(Inner {
                gateway,
                store,
                navigator,
                auth,
                session,
                loading,
                error,
            }),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Exchanges credentials for a token and signs in.
    ///
    /// Token and profile are persisted before the session is published; if
    /// persistence fails nothing changes and the error is returned.
    pub async fn login(&self, credentials: Credentials) -> ClientResult<UserProfile> {
        self.begin_request();
        debug!(email = %credentials.email, "Signing in");

        let result = async {
            let response = self.inner.gateway.exchange_token(&credentials).await?;
            let (token, user) = response.into_parts();
            self.inner.store.save(&token, &user).await?;
            Ok::<_, ClientError>((token, user))
        }
        .await;

        match result {
            Ok((token, user)) => {
                info!(user_id = user.id, username = %user.username, "Signed in");
                self.inner
                    .session
                    .send_replace(Session::authenticated(user.clone(), token));
                self.inner.loading.send_replace(false);
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.fail_request(&e, "Login failed");
                Err(e)
            }
        }
    }

    /// Creates an account, then signs in with the same credentials in the
    /// background.
    ///
    /// Returns as soon as the account exists; the outcome of the follow-up
    /// login is reported only through the session and error streams.
    pub async fn register(&self, account: NewAccount) -> ClientResult<UserProfile> {
        self.begin_request();

        if let Err(e) = validate_new_account(&account) {
            let e = ClientError::from(e);
            debug!(error = %e, "Registration rejected locally");
            self.fail_request(&e, "Registration failed");
            return Err(e);
        }

        match self.inner.gateway.create_account(&account).await {
            Ok(user) => {
                info!(user_id = user.id, username = %user.username, "Account created");
                self.inner.loading.send_replace(false);

                let manager = self.clone();
                let credentials = account.credentials();
                tokio::spawn(async move {
                    if let Err(e) = manager.login(credentials).await {
                        warn!(error = %e, "Automatic login after registration failed");
                    }
                });

                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Registration failed");
                self.fail_request(&e, "Registration failed");
                Err(e)
            }
        }
    }

    /// Resets the session, clears persisted state and routes to the login view.
    ///
    /// Safe to call repeatedly; only the first call emits a session change.
    pub async fn logout(&self) {
        let changed = self.inner.session.send_if_modified(|session| {
            if session.is_anonymous() {
                false
            } else {
                *session = Session::anonymous();
                true
            }
        });

        if let Err(e) = self.inner.store.clear().await {
            warn!(error = %e, "Failed to clear persisted session");
        }

        self.inner.navigator.navigate(Route::Login);

        if changed {
            info!("Signed out");
        } else {
            debug!("Logout requested with no active session");
        }
    }

    /// Restores a persisted session, then validates it in the background.
    ///
    /// The session is published immediately from the cached profile. The
    /// returned task logs out if the token has expired or the probe fails;
    /// on success it changes nothing.
    pub async fn restore_on_startup(&self) -> ClientResult<Option<JoinHandle<()>>> {
        let Some((token, user)) = self.inner.store.load().await? else {
            debug!("No persisted session");
            return Ok(None);
        };

        info!(user_id = user.id, "Restoring persisted session");
        self.inner
            .session
            .send_replace(Session::authenticated(user, token.clone()));

        let manager = self.clone();
        Ok(Some(tokio::spawn(async move {
            manager.validate_restored(token).await;
        })))
    }

    async fn validate_restored(&self, token: Token) {
        let failure = if credential::is_expired(Some(&token), Utc::now()) {
            Some(ClientError::InvalidToken("token expired".into()))
        } else {
            self.inner.gateway.probe(&token).await.err()
        };

        let Some(e) = failure else {
            debug!("Persisted session is still valid");
            return;
        };

        // A newer login may have replaced the token while the probe ran.
        if self.token().as_ref() != Some(&token) {
            debug!("Session changed during validation; skipping teardown");
            return;
        }

        warn!(error = %e, "Persisted session rejected; signing out");
        self.logout().await;
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// True when there is no token, or it cannot be decoded, or it has expired.
    pub fn is_token_expired(&self) -> bool {
        credential::is_expired(self.token().as_ref(), Utc::now())
    }

    /// Admin check for the current session.
    ///
    /// A role claim in the token decides when one is present. Otherwise the
    /// profile email is compared with the configured admin email.
    pub fn is_admin(&self) -> bool {
        let session = self.inner.session.borrow();
        let (Some(user), Some(token)) = (session.user(), session.credential()) else {
            return false;
        };

        match credential::decode_claims(token) {
            Ok(claims) if !claims.roles.is_empty() => claims.has_role(&self.inner.auth.admin_role),
            _ => user.email.eq_ignore_ascii_case(&self.inner.auth.admin_email),
        }
    }

    pub fn current_session(&self) -> Session {
        self.inner.session.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.inner.session.borrow().user().cloned()
    }

    pub fn token(&self) -> Option<Token> {
        self.inner.session.borrow().credential().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.session.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.error.borrow().clone()
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Receiver holding the current session and notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.session.subscribe()
    }

    /// Session changes as a `Stream`, starting with the current value.
    pub fn session_stream(&self) -> WatchStream<Session> {
        WatchStream::new(self.subscribe())
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    pub fn error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error.subscribe()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn begin_request(&self) {
        self.inner.loading.send_replace(true);
        self.inner.error.send_replace(None);
    }

    fn fail_request(&self, error: &ClientError, fallback: &str) {
        self.inner
            .error
            .send_replace(Some(error.user_message(fallback)));
        self.inner.loading.send_replace(false);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("session", &*self.inner.session.borrow())
            .field("loading", &*self.inner.loading.borrow())
            .finish_non_exhaustive()
    }
}
