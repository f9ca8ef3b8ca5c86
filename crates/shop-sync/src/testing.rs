//! In-memory backend used by the unit tests of this crate.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

use shop_core::{CartLine, Credentials, Money, NewAccount, Product, Session, Token, UserProfile};

use crate::config::AuthSettings;
use crate::error::{ClientError, ClientResult};
use crate::gateway::{AuthGateway, CartGateway, CartResponse, TokenResponse};
use crate::session::{Navigator, Route, SessionManager};
use crate::token_store::TokenStore;

pub const PASSWORD: &str = "secret";

pub fn jane() -> UserProfile {
    UserProfile {
        id: 7,
        username: "jane".into(),
        firstname: "Jane".into(),
        email: "jane@shop.test".into(),
    }
}

pub fn watch_product(id: i64) -> Product {
    Product::new(id, format!("P-{id}"), "Bamboo Watch", Money::from_cents(1000))
}

/// Signs a token with the given expiry offset and claims.
pub fn mint_token(exp_offset_secs: i64, extra: serde_json::Value) -> Token {
    let mut claims = json!({
        "sub": "jane@shop.test",
        "exp": Utc::now().timestamp() + exp_offset_secs,
    });
    if let (Some(map), Some(extra)) = (claims.as_object_mut(), extra.as_object()) {
        for (k, v) in extra {
            map.insert(k.clone(), v.clone());
        }
    }
    let raw = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"server-side-secret"),
    )
    .unwrap();
    Token::new(raw)
}

fn server_error() -> ClientError {
    ClientError::Rejected {
        status: 500,
        message: None,
    }
}

// =============================================================================
// Scripted Gateway
// =============================================================================

/// Fake shop API holding one user and one server-side cart.
pub struct ScriptedGateway {
    pub exchange_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
    pub probe_ok: AtomicBool,
    pub fail_cart: AtomicBool,
    pub fail_register: AtomicBool,
    /// Answer `update_line` with an empty body, as the HTTP API does when it
    /// drops a line.
    pub empty_update_body: AtomicBool,
    /// Lifetime of minted tokens.
    pub token_ttl_secs: i64,
    /// Delay before answering `fetch_cart`.
    pub fetch_delay: Mutex<Option<Duration>>,
    cart: Mutex<Vec<CartLine>>,
    next_line_id: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        ScriptedGateway {
            exchange_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            probe_ok: AtomicBool::new(true),
            fail_cart: AtomicBool::new(false),
            fail_register: AtomicBool::new(false),
            empty_update_body: AtomicBool::new(false),
            token_ttl_secs: 3600,
            fetch_delay: Mutex::new(None),
            cart: Mutex::new(Vec::new()),
            next_line_id: AtomicUsize::new(100),
        }
    }

    /// Seeds the server-side cart.
    pub fn with_server_line(self, product: Product, quantity: i64) -> Self {
        let id = self.next_line_id.fetch_add(1, Ordering::SeqCst) as i64;
        let mut line = CartLine::local(product, quantity);
        line.id = Some(id);
        self.cart.lock().unwrap().push(line);
        self
    }

    pub fn server_lines(&self) -> Vec<CartLine> {
        self.cart.lock().unwrap().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    fn check_cart(&self) -> ClientResult<()> {
        if self.fail_cart.load(Ordering::SeqCst) {
            Err(server_error())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AuthGateway for ScriptedGateway {
    async fn exchange_token(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        let login_no = self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        let user = jane();
        if credentials.email != user.email || credentials.password != PASSWORD {
            return Err(ClientError::Unauthorized {
                message: Some("Invalid email or password".into()),
            });
        }

        Ok(TokenResponse {
            token: mint_token(self.token_ttl_secs, json!({ "jti": login_no })).into_inner(),
            token_type: Some("Bearer".into()),
            id: user.id,
            email: user.email,
            username: user.username,
            firstname: user.firstname,
        })
    }

    async fn create_account(&self, account: &NewAccount) -> ClientResult<UserProfile> {
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(ClientError::Rejected {
                status: 409,
                message: Some("Email already in use".into()),
            });
        }
        Ok(UserProfile {
            id: jane().id,
            username: account.username.clone(),
            firstname: account.firstname.clone(),
            email: account.email.clone(),
        })
    }

    async fn probe(&self, _token: &Token) -> ClientResult<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_ok.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::Unauthorized { message: None })
        }
    }
}

#[async_trait]
impl CartGateway for ScriptedGateway {
    async fn fetch_cart(&self, _token: &Token) -> ClientResult<CartResponse> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_cart()?;
        Ok(CartResponse {
            data: Some(self.server_lines()),
            total_items: None,
            total_amount: None,
        })
    }

    async fn add_line(
        &self,
        _token: &Token,
        product_id: i64,
        quantity: i64,
    ) -> ClientResult<CartLine> {
        self.check_cart()?;
        let mut cart = self.cart.lock().unwrap();
        let product = watch_product(product_id);

        let id = match cart.iter_mut().find(|l| l.product_id() == product_id) {
            Some(line) => {
                line.quantity += quantity;
                line.total_price = line.product.price.multiply_quantity(line.quantity);
                line.id
            }
            None => {
                let id = Some(self.next_line_id.fetch_add(1, Ordering::SeqCst) as i64);
                let mut line = CartLine::local(product.clone(), quantity);
                line.id = id;
                cart.push(line);
                id
            }
        };

        let mut added = CartLine::local(product, quantity);
        added.id = id;
        Ok(added)
    }

    async fn update_line(
        &self,
        _token: &Token,
        line_id: i64,
        quantity: i64,
    ) -> ClientResult<Option<CartLine>> {
        self.check_cart()?;
        let mut cart = self.cart.lock().unwrap();
        let Some(idx) = cart.iter().position(|l| l.id == Some(line_id)) else {
            return Err(ClientError::NotFound {
                message: Some(format!("Cart item {line_id} not found")),
            });
        };

        let mut line = cart[idx].clone();
        line.quantity = quantity;
        line.total_price = line.product.price.multiply_quantity(quantity);
        if quantity <= 0 {
            cart.remove(idx);
        } else {
            cart[idx] = line.clone();
        }

        if self.empty_update_body.load(Ordering::SeqCst) {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    async fn remove_line(&self, _token: &Token, line_id: i64) -> ClientResult<()> {
        self.check_cart()?;
        self.cart.lock().unwrap().retain(|l| l.id != Some(line_id));
        Ok(())
    }

    async fn clear(&self, _token: &Token) -> ClientResult<()> {
        self.check_cart()?;
        self.cart.lock().unwrap().clear();
        Ok(())
    }
}

// =============================================================================
// Recording Navigator
// =============================================================================

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<Route>>,
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

// =============================================================================
// Fixtures
// =============================================================================

pub struct Fixture {
    pub gateway: Arc<ScriptedGateway>,
    pub store: TokenStore,
    pub navigator: Arc<RecordingNavigator>,
    pub session: SessionManager,
}

pub fn fixture(gateway: ScriptedGateway) -> Fixture {
    fixture_with_store(gateway, TokenStore::in_memory())
}

pub fn fixture_with_store(gateway: ScriptedGateway, store: TokenStore) -> Fixture {
    let gateway = Arc::new(gateway);
    let navigator = Arc::new(RecordingNavigator::default());
    let session = SessionManager::new(
        gateway.clone(),
        store.clone(),
        navigator.clone(),
        AuthSettings::default(),
    );
    Fixture {
        gateway,
        store,
        navigator,
        session,
    }
}

pub fn jane_credentials() -> Credentials {
    Credentials::new("jane@shop.test", PASSWORD)
}

/// Waits until `pred` holds for the watched value, failing after one second.
pub async fn wait_until<T, F>(rx: &mut watch::Receiver<T>, pred: F)
where
    F: FnMut(&T) -> bool,
{
    tokio::time::timeout(Duration::from_secs(1), rx.wait_for(pred))
        .await
        .expect("condition not reached in time")
        .expect("sender dropped");
}

/// Waits until the session is signed in.
pub async fn wait_for_login(session: &SessionManager) {
    let mut rx = session.subscribe();
    wait_until(&mut rx, Session::is_authenticated).await;
}
