//! Stateful facade: one call per remote capability.
//!
//! # Design
//! `ApiSession` pairs the stateless `TradzyClient` with an injected
//! `Transport` and the `LocalCache`. Each operation reads the cached token,
//! builds the request, executes it, parses the response and then applies
//! the cache side effects. Operations take `&mut self`, so calls that change
//! credentials on one session cannot interleave.
//!
//! Cache rules:
//! - `login` writes token and profile together, and only on success.
//! - `logout` clears every managed key whatever happened on the wire, then
//!   reports the wire outcome.
//! - `check_auth` refreshes or removes the cached role.
//! - any 401 to an authenticated request drops the stored token and role.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::LocalCache;
use crate::client::TradzyClient;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::storage::KeyValueStore;
use crate::transport::Transport;
use crate::types::{
    AuthStatus, BearerToken, Confirmation, LoginResponse, Member, NewAccount, Order, OrderId,
    OrderStatus, Product, ProductId, ProductQuery, ProductWrite, Role, Stats, UserId, UserProfile,
};

pub struct ApiSession<T, S> {
    client: TradzyClient,
    transport: T,
    cache: LocalCache<S>,
}

impl<T: Transport, S: KeyValueStore> ApiSession<T, S> {
    pub fn new(client: TradzyClient, transport: T, store: S) -> Self {
        Self {
            client,
            transport,
            cache: LocalCache::new(store),
        }
    }

    pub fn client(&self) -> &TradzyClient {
        &self.client
    }

    pub fn cache(&self) -> &LocalCache<S> {
        &self.cache
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_store(self) -> S {
        self.cache.into_inner()
    }

    // -----------------------------------------------------------------------
    // Auth
    // -----------------------------------------------------------------------

    /// `identifier` may be an email address or a username.
    pub fn login(&mut self, identifier: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let req = self.client.build_login(identifier, password)?;
        let response = self.send(req, false)?;
        let login = self.client.parse_login(response)?;
        self.cache.store_login(&login.token, &login.profile)?;
        info!(user_id = %login.profile.id, role = %login.profile.role, "logged in");
        Ok(login)
    }

    pub fn register(
        &mut self,
        username: &str,
        password: &str,
        email: &str,
        role: Role,
    ) -> Result<Confirmation, ApiError> {
        self.register_account(&NewAccount {
            username: username.to_string(),
            password: password.to_string(),
            email: email.to_string(),
            role,
            company: None,
        })
    }

    pub fn register_account(&mut self, account: &NewAccount) -> Result<Confirmation, ApiError> {
        let req = self.client.build_register(account)?;
        let response = self.send(req, false)?;
        self.client.parse_register(response)
    }

    /// Invalidate the session server-side, then clear the cache no matter
    /// how that went. The server's outcome is still returned.
    pub fn logout(&mut self) -> Result<Confirmation, ApiError> {
        let outcome = self.remote_logout();
        if let Err(err) = &outcome {
            warn!(error = %err, "server-side logout failed; clearing local credentials anyway");
        }
        self.cache.clear()?;
        info!("logged out");
        outcome
    }

    fn remote_logout(&mut self) -> Result<Confirmation, ApiError> {
        let token = self.token()?;
        let req = self.client.build_logout(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_logout(response)
    }

    pub fn check_auth(&mut self) -> Result<AuthStatus, ApiError> {
        let token = self.token()?;
        let req = self.client.build_check_auth(token.as_ref());
        let response = self.send(req, token.is_some())?;
        let status = self.client.parse_check_auth(response)?;
        match &status.profile {
            Some(profile) if status.authenticated => self.cache.set_role(profile.role)?,
            _ => self.cache.clear_role()?,
        }
        Ok(status)
    }

    // -----------------------------------------------------------------------
    // Products
    // -----------------------------------------------------------------------

    pub fn list_products(&mut self) -> Result<Vec<Product>, ApiError> {
        let token = self.token()?;
        let req = self.client.build_list_products(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_list_products(response)
    }

    pub fn list_products_filtered(&mut self, query: &ProductQuery) -> Result<Vec<Product>, ApiError> {
        let token = self.token()?;
        let req = self.client.build_list_products_filtered(query, token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_list_products(response)
    }

    pub fn get_product(&mut self, id: ProductId) -> Result<Product, ApiError> {
        let token = self.token()?;
        let req = self.client.build_get_product(id, token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_get_product(response)
    }

    pub fn create_product<D: Serialize + ?Sized>(
        &mut self,
        data: &D,
    ) -> Result<ProductWrite, ApiError> {
        let token = self.token()?;
        let req = self.client.build_create_product(data, token.as_ref())?;
        let response = self.send(req, token.is_some())?;
        self.client.parse_create_product(response)
    }

    pub fn update_product<D: Serialize + ?Sized>(
        &mut self,
        id: ProductId,
        data: &D,
    ) -> Result<ProductWrite, ApiError> {
        let token = self.token()?;
        let req = self.client.build_update_product(id, data, token.as_ref())?;
        let response = self.send(req, token.is_some())?;
        self.client.parse_update_product(response)
    }

    pub fn delete_product(&mut self, id: ProductId) -> Result<Confirmation, ApiError> {
        let token = self.token()?;
        let req = self.client.build_delete_product(id, token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_delete_product(response)
    }

    // -----------------------------------------------------------------------
    // Admin
    // -----------------------------------------------------------------------

    pub fn list_users(&mut self) -> Result<Vec<UserProfile>, ApiError> {
        let token = self.token()?;
        let req = self.client.build_list_users(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_list_users(response)
    }

    pub fn get_stats(&mut self) -> Result<Stats, ApiError> {
        let token = self.token()?;
        let req = self.client.build_get_stats(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_get_stats(response)
    }

    pub fn delete_user(&mut self, id: UserId) -> Result<Confirmation, ApiError> {
        let token = self.token()?;
        let req = self.client.build_delete_user(id, token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_delete_user(response)
    }

    pub fn list_wholesalers(&mut self) -> Result<Vec<Member>, ApiError> {
        let token = self.token()?;
        let req = self.client.build_list_wholesalers(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_list_wholesalers(response)
    }

    pub fn list_retailers(&mut self) -> Result<Vec<Member>, ApiError> {
        let token = self.token()?;
        let req = self.client.build_list_retailers(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_list_retailers(response)
    }

    pub fn list_orders(&mut self) -> Result<Vec<Order>, ApiError> {
        let token = self.token()?;
        let req = self.client.build_list_orders(token.as_ref());
        let response = self.send(req, token.is_some())?;
        self.client.parse_list_orders(response)
    }

    pub fn update_order_status(
        &mut self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Confirmation, ApiError> {
        let token = self.token()?;
        let req = self.client.build_update_order_status(id, status, token.as_ref())?;
        let response = self.send(req, token.is_some())?;
        self.client.parse_update_order_status(response)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn token(&self) -> Result<Option<BearerToken>, ApiError> {
        Ok(self.cache.token()?)
    }

    /// Execute one round-trip. A 401 to a request that carried our token
    /// means the server no longer accepts it.
    fn send(&mut self, req: HttpRequest, authenticated: bool) -> Result<HttpResponse, ApiError> {
        debug!(method = %req.method, path = %req.path, "executing request");
        let response = self.transport.execute(req)?;
        debug!(status = response.status, "received response");
        if authenticated && response.status == 401 {
            warn!("server rejected the stored token; clearing it");
            self.cache.clear_credential()?;
        }
        Ok(response)
    }
}
