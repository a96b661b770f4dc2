//! Stateless HTTP request builder and response parser for the Tradzy API.
//!
//! # Design
//! `TradzyClient` holds only a `base_url` and carries no mutable state
//! between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. Something else executes the round-trip (`ApiSession`
//! with a `Transport`, or a host of its own), keeping this layer
//! deterministic and free of I/O.
//!
//! Response handling is uniform: the body is decoded first (an empty body
//! counts as "no JSON"), then any non-2xx status becomes
//! `ApiError::Request` carrying the body's `error` field or the operation's
//! default message.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, APPLICATION_JSON, AUTHORIZATION, CONTENT_TYPE};
use crate::types::{
    AuthStatus, BearerToken, Confirmation, Credentials, LoginResponse, Member, NewAccount, Order,
    OrderId, OrderStatus, Product, ProductId, ProductQuery, ProductWrite, Stats, StatusUpdate,
    UserId, UserProfile,
};

/// Every remote capability, used to pick the fallback error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Login,
    Register,
    Logout,
    CheckAuth,
    ListProducts,
    GetProduct,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    ListUsers,
    GetStats,
    DeleteUser,
    ListWholesalers,
    ListRetailers,
    ListOrders,
    UpdateOrderStatus,
}

impl Operation {
    /// Message used when a failed response carries no `error` field.
    pub fn default_error(self) -> &'static str {
        match self {
            Operation::Login => "Login failed",
            Operation::Register => "Registration failed",
            Operation::Logout => "Logout failed",
            Operation::CheckAuth => "Authentication check failed",
            Operation::ListProducts => "Failed to fetch products",
            Operation::GetProduct => "Failed to fetch product",
            Operation::CreateProduct => "Failed to add product",
            Operation::UpdateProduct => "Failed to update product",
            Operation::DeleteProduct => "Failed to delete product",
            Operation::ListUsers => "Failed to fetch users",
            Operation::GetStats => "Failed to fetch stats",
            Operation::DeleteUser => "Failed to delete user",
            Operation::ListWholesalers => "Failed to fetch wholesalers",
            Operation::ListRetailers => "Failed to fetch retailers",
            Operation::ListOrders => "Failed to fetch orders",
            Operation::UpdateOrderStatus => "Failed to update order",
        }
    }
}

/// Synchronous, stateless client for the Tradzy API.
#[derive(Debug, Clone)]
pub struct TradzyClient {
    base_url: String,
}

impl Default for TradzyClient {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

impl TradzyClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(&config.base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    pub fn build_login(&self, identifier: &str, password: &str) -> Result<HttpRequest, ApiError> {
        let credentials = Credentials {
            email: identifier,
            password,
        };
        self.json_request(HttpMethod::Post, "/auth/login", None, &credentials)
    }

    pub fn build_register(&self, account: &NewAccount) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/auth/register", None, account)
    }

    pub fn build_logout(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Post, "/auth/logout", token)
    }

    pub fn build_check_auth(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/auth/check-auth", token)
    }

    pub fn parse_login(&self, response: HttpResponse) -> Result<LoginResponse, ApiError> {
        parse_json(&response, Operation::Login)
    }

    pub fn parse_register(&self, response: HttpResponse) -> Result<Confirmation, ApiError> {
        parse_confirmation(&response, Operation::Register)
    }

    pub fn parse_logout(&self, response: HttpResponse) -> Result<Confirmation, ApiError> {
        parse_confirmation(&response, Operation::Logout)
    }

    /// A 401 whose body says `{"authenticated": false}` is an answer, not a
    /// failure: the backend reports a missing session that way.
    pub fn parse_check_auth(&self, response: HttpResponse) -> Result<AuthStatus, ApiError> {
        let body = decode_body(&response)?;
        if response.status == 401 {
            if let Some(Value::Bool(false)) = body.as_ref().and_then(|b| b.get("authenticated")) {
                return Ok(AuthStatus {
                    authenticated: false,
                    profile: None,
                });
            }
        }
        check_status(&response, body.as_ref(), Operation::CheckAuth)?;
        let status: AuthStatus = from_body(body)?;
        if status.authenticated && status.profile.is_none() {
            return Err(ApiError::Decode(
                "authenticated response is missing the user profile".to_string(),
            ));
        }
        Ok(status)
    }

    // -----------------------------------------------------------------------
    // Products
    // -----------------------------------------------------------------------

    pub fn build_list_products(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/products", token)
    }

    /// Listing with `search`/`category` filters; blank filters are dropped.
    pub fn build_list_products_filtered(
        &self,
        query: &ProductQuery,
        token: Option<&BearerToken>,
    ) -> HttpRequest {
        let mut params = url::form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (name, value) in [("search", &query.search), ("category", &query.category)] {
            if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.append_pair(name, value);
                any = true;
            }
        }
        let path = if any {
            format!("/products?{}", params.finish())
        } else {
            "/products".to_string()
        };
        self.request(HttpMethod::Get, &path, token)
    }

    pub fn build_get_product(&self, id: ProductId, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, &format!("/products/{id}"), token)
    }

    pub fn build_create_product<T: Serialize + ?Sized>(
        &self,
        data: &T,
        token: Option<&BearerToken>,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Post, "/products", token, data)
    }

    pub fn build_update_product<T: Serialize + ?Sized>(
        &self,
        id: ProductId,
        data: &T,
        token: Option<&BearerToken>,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(HttpMethod::Put, &format!("/products/{id}"), token, data)
    }

    pub fn build_delete_product(&self, id: ProductId, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/products/{id}"), token)
    }

    pub fn parse_list_products(&self, response: HttpResponse) -> Result<Vec<Product>, ApiError> {
        parse_json(&response, Operation::ListProducts)
    }

    pub fn parse_get_product(&self, response: HttpResponse) -> Result<Product, ApiError> {
        parse_json(&response, Operation::GetProduct)
    }

    pub fn parse_create_product(&self, response: HttpResponse) -> Result<ProductWrite, ApiError> {
        parse_product_write(&response, Operation::CreateProduct)
    }

    pub fn parse_update_product(&self, response: HttpResponse) -> Result<ProductWrite, ApiError> {
        parse_product_write(&response, Operation::UpdateProduct)
    }

    pub fn parse_delete_product(&self, response: HttpResponse) -> Result<Confirmation, ApiError> {
        parse_confirmation(&response, Operation::DeleteProduct)
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    pub fn build_list_users(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/admin/users", token)
    }

    pub fn build_get_stats(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/admin/stats", token)
    }

    pub fn build_delete_user(&self, id: UserId, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Delete, &format!("/admin/users/{id}"), token)
    }

    pub fn build_list_wholesalers(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/admin/wholesalers", token)
    }

    pub fn build_list_retailers(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/admin/retailers", token)
    }

    pub fn build_list_orders(&self, token: Option<&BearerToken>) -> HttpRequest {
        self.request(HttpMethod::Get, "/admin/orders", token)
    }

    pub fn build_update_order_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        token: Option<&BearerToken>,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Patch,
            &format!("/admin/orders/{id}"),
            token,
            &StatusUpdate { status },
        )
    }

    pub fn parse_list_users(&self, response: HttpResponse) -> Result<Vec<UserProfile>, ApiError> {
        parse_json(&response, Operation::ListUsers)
    }

    pub fn parse_get_stats(&self, response: HttpResponse) -> Result<Stats, ApiError> {
        parse_json(&response, Operation::GetStats)
    }

    pub fn parse_delete_user(&self, response: HttpResponse) -> Result<Confirmation, ApiError> {
        parse_confirmation(&response, Operation::DeleteUser)
    }

    pub fn parse_list_wholesalers(&self, response: HttpResponse) -> Result<Vec<Member>, ApiError> {
        parse_json(&response, Operation::ListWholesalers)
    }

    pub fn parse_list_retailers(&self, response: HttpResponse) -> Result<Vec<Member>, ApiError> {
        parse_json(&response, Operation::ListRetailers)
    }

    pub fn parse_list_orders(&self, response: HttpResponse) -> Result<Vec<Order>, ApiError> {
        parse_json(&response, Operation::ListOrders)
    }

    pub fn parse_update_order_status(
        &self,
        response: HttpResponse,
    ) -> Result<Confirmation, ApiError> {
        parse_confirmation(&response, Operation::UpdateOrderStatus)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn request(&self, method: HttpMethod, path: &str, token: Option<&BearerToken>) -> HttpRequest {
        let mut headers = Vec::new();
        if let Some(token) = token {
            headers.push((AUTHORIZATION.to_string(), token.header_value()));
        }
        HttpRequest {
            method,
            path: format!("{}{path}", self.base_url),
            headers,
            body: None,
        }
    }

    fn json_request<T: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&BearerToken>,
        payload: &T,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut req = self.request(method, path, token);
        req.headers
            .insert(0, (CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string()));
        req.body = Some(body);
        Ok(req)
    }
}

/// Decode the body as JSON. Blank bodies yield `None`.
fn decode_body(response: &HttpResponse) -> Result<Option<Value>, ApiError> {
    if response.body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&response.body)
        .map(Some)
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Map non-2xx statuses to `ApiError::Request`.
fn check_status(response: &HttpResponse, body: Option<&Value>, op: Operation) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    let message = body
        .and_then(|b| b.get("error"))
        .and_then(Value::as_str)
        .unwrap_or(op.default_error())
        .to_string();
    Err(ApiError::Request {
        status: response.status,
        message,
    })
}

fn from_body<T: DeserializeOwned>(body: Option<Value>) -> Result<T, ApiError> {
    let body = body.ok_or_else(|| ApiError::Decode("empty response body".to_string()))?;
    serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn parse_json<T: DeserializeOwned>(response: &HttpResponse, op: Operation) -> Result<T, ApiError> {
    let body = decode_body(response)?;
    check_status(response, body.as_ref(), op)?;
    from_body(body)
}

fn parse_confirmation(response: &HttpResponse, op: Operation) -> Result<Confirmation, ApiError> {
    let body = decode_body(response)?;
    check_status(response, body.as_ref(), op)?;
    match body {
        None => Ok(Confirmation::default()),
        Some(body) => serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string())),
    }
}

/// A 2xx write with no body is a success without a message.
fn parse_product_write(response: &HttpResponse, op: Operation) -> Result<ProductWrite, ApiError> {
    let body = decode_body(response)?;
    check_status(response, body.as_ref(), op)?;
    match body {
        None => Ok(ProductWrite::Confirmation(Confirmation::default())),
        Some(body) => serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string())),
    }
}
