//! # HTTP Gateway
//!
//! reqwest implementation of [`AuthGateway`] and [`CartGateway`].
//!
//! Every authenticated request carries `Authorization: Bearer <token>` and
//! `Content-Type: application/json`. Non-2xx responses are decoded as
//! `{message, status, path, errors}` when possible and mapped through
//! [`ClientError::from_status`].

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use tracing::debug;
use url::Url;

use shop_core::{CartLine, Credentials, NewAccount, Token, UserProfile};

use super::{ApiErrorBody, AuthGateway, CartGateway, CartResponse, TokenResponse};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

const TOKEN_PATH: &str = "/api/auth/token";
const ACCOUNT_PATH: &str = "/api/auth/account";
const CART_PATH: &str = "/api/cart";

/// Talks to the shop REST API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    probe_path: String,
}

impl HttpGateway {
    /// Builds a gateway with the configured base URL and request timeout.
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))?;

        Self::with_client(client, config.base_url(), &config.api.probe_path)
    }

    /// Uses a caller-supplied reqwest [`Client`].
    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        probe_path: impl Into<String>,
    ) -> ClientResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        Ok(HttpGateway {
            client,
            base_url,
            probe_path: probe_path.into(),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    fn url_with_quantity(&self, path: &str, quantity: i64) -> ClientResult<Url> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .append_pair("quantity", &quantity.to_string());
        Ok(url)
    }

    fn authorized(builder: RequestBuilder, token: &Token) -> RequestBuilder {
        builder
            .bearer_auth(token.as_str())
            .header(CONTENT_TYPE, "application/json")
    }

    /// Passes 2xx through, otherwise decodes the error body.
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = parsed.best_message();

        debug!(status = status.as_u16(), ?message, path = ?parsed.path, "Request rejected");
        Err(ClientError::from_status(status.as_u16(), message))
    }
}

#[async_trait]
impl AuthGateway for HttpGateway {
    async fn exchange_token(&self, credentials: &Credentials) -> ClientResult<TokenResponse> {
        debug!(email = %credentials.email, "POST {}", TOKEN_PATH);
        let response = self
            .client
            .post(self.url(TOKEN_PATH)?)
            .json(credentials)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn create_account(&self, account: &NewAccount) -> ClientResult<UserProfile> {
        debug!(email = %account.email, username = %account.username, "POST {}", ACCOUNT_PATH);
        let response = self
            .client
            .post(self.url(ACCOUNT_PATH)?)
            .json(account)
            .send()
            .await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn probe(&self, token: &Token) -> ClientResult<()> {
        debug!(path = %self.probe_path, "Probing protected endpoint");
        let request = self.client.get(self.url(&self.probe_path)?);
        let response = Self::authorized(request, token).send().await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[async_trait]
impl CartGateway for HttpGateway {
    async fn fetch_cart(&self, token: &Token) -> ClientResult<CartResponse> {
        let request = self.client.get(self.url(CART_PATH)?);
        let response = Self::authorized(request, token).send().await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn add_line(
        &self,
        token: &Token,
        product_id: i64,
        quantity: i64,
    ) -> ClientResult<CartLine> {
        let url = self.url_with_quantity(&format!("{CART_PATH}/add/{product_id}"), quantity)?;
        let response = Self::authorized(self.client.post(url), token).send().await?;

        Ok(Self::check(response).await?.json().await?)
    }

    async fn update_line(
        &self,
        token: &Token,
        line_id: i64,
        quantity: i64,
    ) -> ClientResult<Option<CartLine>> {
        let url = self.url_with_quantity(&format!("{CART_PATH}/{line_id}"), quantity)?;
        let response = Self::authorized(self.client.put(url), token).send().await?;

        let body = Self::check(response).await?.text().await?;
        let body = body.trim();
        if body.is_empty() || body == "null" {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(body)?))
    }

    async fn remove_line(&self, token: &Token, line_id: i64) -> ClientResult<()> {
        let request = self.client.delete(self.url(&format!("{CART_PATH}/{line_id}"))?);
        let response = Self::authorized(request, token).send().await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn clear(&self, token: &Token) -> ClientResult<()> {
        let request = self.client.delete(self.url(&format!("{CART_PATH}/clear"))?);
        let response = Self::authorized(request, token).send().await?;

        Self::check(response).await?;
        Ok(())
    }
}

// =============================================================================
// Tests (against a local axum server)
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post, put};
    use axum::{Json, Router};
    use serde::Deserialize;
    use serde_json::{json, Value};
    use shop_core::Money;

    #[derive(Deserialize)]
    struct QuantityParam {
        quantity: i64,
    }

    fn bearer(headers: &HeaderMap) -> Option<&str> {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    fn product_json(id: i64) -> Value {
        json!({ "id": id, "code": format!("P-{id}"), "name": "Bamboo Watch", "price": 10.0 })
    }

    async fn serve() -> HttpGateway {
        let app = Router::new()
            .route(
                "/api/auth/token",
                post(|Json(body): Json<Value>| async move {
                    if body["password"] == "secret1" {
                        Ok(Json(json!({
                            "token": "good-token", "type": "Bearer", "id": 7,
                            "email": body["email"], "username": "jane", "firstname": "Jane"
                        })))
                    } else {
                        Err((
                            StatusCode::UNAUTHORIZED,
                            Json(json!({ "message": "Bad credentials", "status": 401, "path": "/api/auth/token" })),
                        ))
                    }
                }),
            )
            .route(
                "/api/auth/account",
                post(|Json(body): Json<Value>| async move {
                    if body["email"] == "taken@shop.test" {
                        Err((
                            StatusCode::CONFLICT,
                            Json(json!({ "message": "Email already in use", "status": 409 })),
                        ))
                    } else {
                        Ok(Json(json!({
                            "id": 8, "username": body["username"],
                            "firstname": body["firstname"], "email": body["email"]
                        })))
                    }
                }),
            )
            .route(
                "/api/products",
                get(|headers: HeaderMap| async move {
                    match bearer(&headers) {
                        Some("good-token") => StatusCode::OK,
                        _ => StatusCode::FORBIDDEN,
                    }
                }),
            )
            .route(
                "/api/cart",
                get(|headers: HeaderMap| async move {
                    if bearer(&headers) != Some("good-token") {
                        return Err(StatusCode::FORBIDDEN);
                    }
                    Ok(Json(json!({
                        "data": [{ "id": 1, "product": product_json(1), "quantity": 2, "totalPrice": 20.0 }],
                        "totalItems": 2,
                        "totalAmount": 20.0
                    })))
                }),
            )
            .route(
                "/api/cart/add/{product_id}",
                post(
                    |Path(product_id): Path<i64>, Query(q): Query<QuantityParam>, headers: HeaderMap| async move {
                        let json_ct = headers
                            .get("content-type")
                            .map(|v| v == "application/json")
                            .unwrap_or(false);
                        if !json_ct {
                            return Err(StatusCode::UNSUPPORTED_MEDIA_TYPE);
                        }
                        Ok(Json(json!({
                            "id": 40 + product_id,
                            "product": product_json(product_id),
                            "quantity": q.quantity,
                            "totalPrice": 10.0 * q.quantity as f64
                        })))
                    },
                ),
            )
            .route(
                "/api/cart/clear",
                delete(|| async {
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({ "message": "Database unavailable", "status": 500 })),
                    )
                }),
            )
            .route(
                "/api/cart/{line_id}",
                put(|Path(line_id): Path<i64>, Query(q): Query<QuantityParam>| async move {
                    if line_id == 404 {
                        return Err(StatusCode::NOT_FOUND);
                    }
                    if q.quantity == 0 {
                        return Ok(String::new());
                    }
                    Ok(json!({
                        "id": line_id, "product": product_json(1),
                        "quantity": q.quantity, "totalPrice": 10.0 * q.quantity as f64
                    })
                    .to_string())
                })
                .delete(|Path(_line_id): Path<i64>| async { Json(true) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        HttpGateway::with_client(Client::new(), format!("http://{addr}/"), "/api/products").unwrap()
    }

    #[tokio::test]
    async fn test_token_exchange() {
        let gateway = serve().await;

        let response = gateway
            .exchange_token(&Credentials::new("jane@shop.test", "secret1"))
            .await
            .unwrap();
        let (token, profile) = response.into_parts();
        assert_eq!(token.as_str(), "good-token");
        assert_eq!(profile.email, "jane@shop.test");

        let err = gateway
            .exchange_token(&Credentials::new("jane@shop.test", "wrong"))
            .await
            .unwrap_err();
        assert!(err.is_session_invalid());
        assert_eq!(err.user_message("Login failed"), "Bad credentials");
    }

    #[tokio::test]
    async fn test_create_account() {
        let gateway = serve().await;
        let account = NewAccount {
            username: "jane".into(),
            firstname: "Jane".into(),
            email: "jane@shop.test".into(),
            password: "secret1".into(),
        };

        let user = gateway.create_account(&account).await.unwrap();
        assert_eq!(user.id, 8);

        let taken = NewAccount {
            email: "taken@shop.test".into(),
            ..account
        };
        let err = gateway.create_account(&taken).await.unwrap_err();
        assert!(matches!(err, ClientError::Rejected { status: 409, .. }));
        assert_eq!(err.user_message("Registration failed"), "Email already in use");
    }

    #[tokio::test]
    async fn test_probe() {
        let gateway = serve().await;

        assert!(gateway.probe(&Token::new("good-token")).await.is_ok());
        let err = gateway.probe(&Token::new("stale")).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized { message: None }));
    }

    #[tokio::test]
    async fn test_cart_endpoints() {
        let gateway = serve().await;
        let token = Token::new("good-token");

        let cart = gateway.fetch_cart(&token).await.unwrap();
        assert_eq!(cart.total_items, Some(2));
        assert_eq!(cart.lines()[0].total_price, Money::from_cents(2000));

        let line = gateway.add_line(&token, 2, 3).await.unwrap();
        assert_eq!(line.id, Some(42));
        assert_eq!(line.quantity, 3);
        assert_eq!(line.total_price, Money::from_cents(3000));

        let updated = gateway.update_line(&token, 42, 5).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 5);
        assert!(gateway.update_line(&token, 42, 0).await.unwrap().is_none());
        assert!(matches!(
            gateway.update_line(&token, 404, 1).await,
            Err(ClientError::NotFound { .. })
        ));

        gateway.remove_line(&token, 42).await.unwrap();

        let err = gateway.clear(&token).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.user_message("Failed to clear cart"), "Database unavailable");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let gateway =
            HttpGateway::with_client(Client::new(), "http://127.0.0.1:9", "/api/products").unwrap();

        let err = gateway.probe(&Token::new("good-token")).await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(HttpGateway::with_client(Client::new(), "not a url", "/api/products").is_err());
    }
}
