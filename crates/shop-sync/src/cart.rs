//! # Cart Store
//!
//! Owns the cart snapshot and keeps it consistent across server round-trips
//! and session transitions.
//!
//! ## Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   session user: None ──────────────► Some(id)                           │
//! │   ┌───────────────────────┐          ┌───────────────────────────────┐  │
//! │   │ LOCAL                 │  login   │ REMOTE                        │  │
//! │   │ add_local             │ ───────► │ load / add / update_line      │  │
//! │   │ update_local          │ discard  │ remove_line / clear           │  │
//! │   │ remove_local          │ + load   │ (server confirms each change) │  │
//! │   │                       │ ◄─────── │                               │  │
//! │   └───────────────────────┘  logout  └───────────────────────────────┘  │
//! │                              reset                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every structural change is applied to the snapshot inside one
//! `watch::Sender::send_modify` call, so subscribers never see lines without
//! their recomputed totals.
//!
//! Remote responses are applied only while the session token they were sent
//! with is still the current one. A response that outlives a logout, or a
//! logout followed by a fresh login as the same user, is dropped.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use shop_core::validation::validate_quantity;
use shop_core::{CartLine, CartSnapshot, Product, Token};

use crate::error::{ClientError, ClientResult};
use crate::gateway::CartGateway;
use crate::session::SessionManager;

/// Which side is authoritative for the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartMode {
    /// Server-backed, while a session is active.
    Remote,
    /// In memory only, while anonymous.
    Local,
}

impl std::fmt::Display for CartMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CartMode::Remote => write!(f, "remote"),
            CartMode::Local => write!(f, "local"),
        }
    }
}

struct Inner {
    gateway: Arc<dyn CartGateway>,
    session: SessionManager,
    snapshot: watch::Sender<CartSnapshot>,
    loading: watch::Sender<bool>,
    error: watch::Sender<Option<String>>,
}

/// The cart. Clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<Inner>,
}

impl CartStore {
    pub fn new(gateway: Arc<dyn CartGateway>, session: SessionManager) -> Self {
        let (snapshot, _) = watch::channel(CartSnapshot::empty());
        let (loading, _) = watch::channel(false);
        let (error, _) = watch::channel(None);

        CartStore {
            inner: Arc::new(Inner {
                gateway,
                session,
                snapshot,
                loading,
                error,
            }),
        }
    }

    // =========================================================================
    // Remote Operations
    // =========================================================================

    /// Replaces the snapshot with the server's cart.
    ///
    /// Does nothing while anonymous. On failure the last snapshot is kept.
    pub async fn load(&self) -> ClientResult<()> {
        let Some(token) = self.active_token() else {
            debug!("Cart load skipped: no active session");
            return Ok(());
        };

        self.begin_request();
        match self.inner.gateway.fetch_cart(&token).await {
            Ok(response) => {
                let reported = (response.total_items, response.total_amount);
                let snapshot = CartSnapshot::from_lines(response.lines());

                if !self.is_current(&token) {
                    return Ok(());
                }

                if let (Some(items), Some(amount)) = reported {
                    if items != snapshot.total_items() || amount != snapshot.total_amount() {
                        warn!(
                            reported_items = items,
                            reported_amount = %amount,
                            items = snapshot.total_items(),
                            amount = %snapshot.total_amount(),
                            "Server cart totals disagree with its lines; using line totals"
                        );
                    }
                }

                debug!(lines = snapshot.len(), "Cart loaded");
                self.inner.snapshot.send_replace(snapshot);
                self.end_request();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                self.fail_request(&e, "Failed to load cart");
                Err(e)
            }
        }
    }

    /// Adds `quantity` of a product on the server and merges the returned line.
    pub async fn add(&self, product_id: i64, quantity: i64) -> ClientResult<CartLine> {
        validate_quantity(quantity)?;
        let token = self.require_session("add items to cart")?;

        self.begin_request();
        match self
            .inner
            .gateway
            .add_line(&token, product_id, quantity)
            .await
        {
            Ok(line) => {
                if self.is_current(&token) {
                    let merged = line.clone();
                    self.inner
                        .snapshot
                        .send_modify(|s| s.merge_remote_line(merged, quantity));
                    debug!(product_id, quantity, "Added to cart");
                    self.end_request();
                }
                Ok(line)
            }
            Err(e) => {
                warn!(error = %e, product_id, quantity, "Failed to add item to cart");
                self.fail_request(&e, "Failed to add item to cart");
                Err(e)
            }
        }
    }

    /// Sets a line's quantity on the server and replaces it with the
    /// server's version.
    ///
    /// An empty response body means the server dropped the line when
    /// `quantity <= 0`; for any other quantity the cart is reloaded, since the
    /// new line state is unknown.
    pub async fn update_line(&self, line_id: i64, quantity: i64) -> ClientResult<Option<CartLine>> {
        let token = self.require_session("update cart")?;

        self.begin_request();
        match self
            .inner
            .gateway
            .update_line(&token, line_id, quantity)
            .await
        {
            Ok(updated) => {
                if !self.is_current(&token) {
                    return Ok(updated);
                }

                match updated.clone() {
                    Some(line) => {
                        self.inner.snapshot.send_if_modified(|s| s.replace_line(line));
                    }
                    None if quantity <= 0 => {
                        self.inner
                            .snapshot
                            .send_if_modified(|s| s.remove_line(line_id));
                    }
                    None => {
                        debug!(line_id, "Server returned no line; reloading cart");
                        self.end_request();
                        if let Err(e) = self.load().await {
                            warn!(error = %e, "Cart reload after update failed");
                        }
                        return Ok(None);
                    }
                }
                debug!(line_id, quantity, "Updated cart line");
                self.end_request();
                Ok(updated)
            }
            Err(e) => {
                warn!(error = %e, line_id, quantity, "Failed to update cart item");
                self.fail_request(&e, "Failed to update cart item");
                Err(e)
            }
        }
    }

    /// Deletes a line on the server, then locally.
    pub async fn remove_line(&self, line_id: i64) -> ClientResult<()> {
        let token = self.require_session("remove items from cart")?;

        self.begin_request();
        match self.inner.gateway.remove_line(&token, line_id).await {
            Ok(()) => {
                if self.is_current(&token) {
                    self.inner
                        .snapshot
                        .send_if_modified(|s| s.remove_line(line_id));
                    debug!(line_id, "Removed cart line");
                    self.end_request();
                }
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, line_id, "Failed to remove item from cart");
                self.fail_request(&e, "Failed to remove item from cart");
                Err(e)
            }
        }
    }

    /// Empties the cart.
    ///
    /// Anonymous: clears the local snapshot. Signed in: asks the server to
    /// clear, and empties the local snapshot whatever the outcome. A server
    /// failure is recorded on the error stream, not returned.
    pub async fn clear(&self) -> ClientResult<()> {
        let Some(token) = self.active_token() else {
            self.reset();
            return Ok(());
        };

        self.begin_request();
        let result = self.inner.gateway.clear(&token).await;
        self.reset();

        match result {
            Ok(()) => {
                debug!("Cart cleared");
                self.end_request();
            }
            Err(e) => {
                warn!(error = %e, "Server cart clear failed; local cart cleared anyway");
                self.fail_request(&e, "Failed to clear cart");
            }
        }
        Ok(())
    }

    // =========================================================================
    // Local Operations
    // =========================================================================

    /// Adds to the in-memory cart, pricing the line from the product.
    pub fn add_local(&self, product: &Product, quantity: i64) -> ClientResult<()> {
        let mut outcome = Ok(());
        self.inner.snapshot.send_if_modified(|s| {
            outcome = s.add_local(product, quantity);
            outcome.is_ok()
        });
        outcome?;
        debug!(product_id = product.id, quantity, "Added to local cart");
        Ok(())
    }

    /// Sets a local line's quantity; zero or less removes it.
    pub fn update_local(&self, product_id: i64, quantity: i64) -> ClientResult<()> {
        let mut outcome = Ok(());
        self.inner.snapshot.send_if_modified(|s| {
            outcome = s.update_local(product_id, quantity);
            outcome.is_ok()
        });
        Ok(outcome?)
    }

    /// Returns true if a line was removed.
    pub fn remove_local(&self, product_id: i64) -> bool {
        self.inner
            .snapshot
            .send_if_modified(|s| s.remove_local(product_id))
    }

    // =========================================================================
    // Session Transitions
    // =========================================================================

    /// Follows the session: loads on sign-in, resets on sign-out.
    ///
    /// Applies the current session immediately, then reacts only when the
    /// signed-in user changes.
    pub fn spawn_session_listener(&self) -> CartListenerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let mut sessions = self.inner.session.subscribe();
        let store = self.clone();

        let task = tokio::spawn(async move {
            let mut last_user = sessions.borrow_and_update().user_id();
            store.on_user_changed(last_user).await;

            loop {
                tokio::select! {
                    changed = sessions.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let user = sessions.borrow_and_update().user_id();
                        if user == last_user {
                            continue;
                        }
                        last_user = user;
                        store.on_user_changed(user).await;
                    }

                    _ = shutdown_rx.recv() => {
                        debug!("Cart session listener received shutdown");
                        break;
                    }
                }
            }

            debug!("Cart session listener stopped");
        });

        CartListenerHandle { shutdown_tx, task }
    }

    async fn on_user_changed(&self, user_id: Option<i64>) {
        match user_id {
            Some(id) => {
                info!(user_id = id, "Switching cart to remote mode");
                self.reset();
                if let Err(e) = self.load().await {
                    warn!(error = %e, "Initial cart load failed");
                }
            }
            None => {
                info!("Switching cart to local mode");
                self.reset();
            }
        }
    }

    // =========================================================================
    // Queries & Subscriptions
    // =========================================================================

    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn mode(&self) -> CartMode {
        if self.inner.session.is_authenticated() {
            CartMode::Remote
        } else {
            CartMode::Local
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn snapshot_stream(&self) -> WatchStream<CartSnapshot> {
        WatchStream::new(self.subscribe())
    }

    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.loading.subscribe()
    }

    pub fn error(&self) -> watch::Receiver<Option<String>> {
        self.inner.error.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        *self.inner.loading.borrow()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.error.borrow().clone()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn active_token(&self) -> Option<Token> {
        let session = self.inner.session.current_session();
        if !session.is_authenticated() {
            return None;
        }
        session.credential().cloned()
    }

    fn require_session(&self, action: &'static str) -> ClientResult<Token> {
        self.active_token()
            .ok_or(ClientError::NotAuthenticated(action))
    }

    /// Whether `token` still belongs to the active session.
    fn is_current(&self, token: &Token) -> bool {
        let current = self.active_token().as_ref() == Some(token);
        if !current {
            debug!("Discarding cart response for a session that ended");
            self.end_request();
        }
        current
    }

    /// Empties the snapshot, notifying only if it held anything.
    fn reset(&self) {
        self.inner.snapshot.send_if_modified(|s| {
            if s.is_empty() {
                false
            } else {
                s.clear();
                true
            }
        });
    }

    fn begin_request(&self) {
        self.inner.loading.send_replace(true);
        self.inner.error.send_replace(None);
    }

    fn end_request(&self) {
        self.inner.loading.send_replace(false);
    }

    fn fail_request(&self, error: &ClientError, fallback: &str) {
        self.inner
            .error
            .send_replace(Some(error.user_message(fallback)));
        self.inner.loading.send_replace(false);
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("mode", &self.mode())
            .field("lines", &self.inner.snapshot.borrow().len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Listener Handle
// =============================================================================

/// Controls a running session listener.
#[derive(Debug)]
pub struct CartListenerHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CartListenerHandle {
    /// Stops the listener and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!(error = %e, "Cart session listener ended abnormally");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
