//! In-memory stand-in for the Tradzy backend.
//!
//! Implements the `/api` surface the client talks to: bearer-token auth,
//! product CRUD and the admin endpoints. State lives in a single
//! `RwLock`-guarded store and is lost when the process exits.

pub mod config;
pub mod error;
pub mod state;

use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::info;

pub use error::AppError;
pub use state::{AppState, MemberView, Order, Product, User, UserView};

use state::{ORDER_STATUSES, VALID_ROLES};

const PRODUCT_FIELDS: [&str; 6] = ["name", "description", "price", "stock", "image_url", "category"];

#[derive(Deserialize)]
pub struct RegisterInput {
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub company: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Default)]
pub struct ProductFilter {
    pub search: Option<String>,
    pub category: Option<String>,
}

#[derive(Deserialize)]
pub struct StatusInput {
    pub status: Option<String>,
}

pub fn app() -> Router {
    app_with_state(AppState::new())
}

pub fn app_with_state(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/check-auth", get(check_auth))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}", delete(delete_user))
        .route("/admin/stats", get(stats))
        .route("/admin/wholesalers", get(list_wholesalers))
        .route("/admin/retailers", get(list_retailers))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/{id}", patch(update_order_status));

    Router::new().nest("/api", api).with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::new()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn current_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = bearer(headers).ok_or(AppError::Unauthorized)?;
    state
        .db
        .read()
        .await
        .user_for_token(token)
        .cloned()
        .ok_or(AppError::Unauthorized)
}

async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user = current_user(state, headers).await?;
    if user.role != "admin" {
        return Err(AppError::Forbidden);
    }
    Ok(user)
}

// --- auth ---

async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let (Some(username), Some(password), Some(email), Some(role)) =
        (input.username, input.password, input.email, input.role)
    else {
        return Err(AppError::bad_request("Missing required fields"));
    };

    let role = role.to_lowercase();
    if !VALID_ROLES.contains(&role.as_str()) {
        return Err(AppError::bad_request("Invalid role"));
    }

    let mut db = state.db.write().await;
    if db.users.values().any(|u| u.username == username) {
        return Err(AppError::bad_request("Username already registered"));
    }
    if db.users.values().any(|u| u.email == email) {
        return Err(AppError::bad_request("Email already registered"));
    }
    let id = db.add_user(User {
        id: 0,
        username,
        email,
        password,
        role,
        company: input.company,
    });
    info!(user_id = id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Registration successful" })),
    ))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<Value>, AppError> {
    let (Some(identifier), Some(password)) = (input.email, input.password) else {
        return Err(AppError::bad_request("Missing email/username or password"));
    };

    let mut db = state.db.write().await;
    let user = match db.find_login(&identifier) {
        Some(user) if user.password == password => user.clone(),
        _ => return Err(AppError::InvalidCredentials),
    };
    let token = db.issue_token(user.id);
    info!(user_id = user.id, role = %user.role, "login successful");

    let redirect = match user.role.as_str() {
        "admin" => "/admin_dashboard.html",
        "retailer" => "/retailer",
        "wholesaler" => "/wholesaler/dashboard",
        _ => "/",
    };

    Ok(Json(json!({
        "message": "Login successful",
        "access_token": token,
        "redirect": redirect,
        "user": UserView::from(&user),
    })))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = bearer(&headers) {
        if let Some(user_id) = state.db.write().await.tokens.remove(token) {
            info!(user_id, "revoked token");
        }
    }
    Json(json!({ "message": "Logged out successfully" }))
}

async fn check_auth(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match current_user(&state, &headers).await {
        Ok(user) => Json(json!({
            "authenticated": true,
            "user": UserView::from(&user),
        }))
        .into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "authenticated": false })),
        )
            .into_response(),
    }
}

// --- products ---

async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> Json<Vec<Product>> {
    let search = filter.search.unwrap_or_default().trim().to_lowercase();
    let category = filter.category.unwrap_or_default().trim().to_lowercase();

    let db = state.db.read().await;
    let products = db
        .products
        .values()
        .rev()
        .filter(|p| search.is_empty() || matches_search(p, &search))
        .filter(|p| category.is_empty() || text_field(p, "category") == category)
        .cloned()
        .collect();
    Json(products)
}

fn text_field(product: &Product, name: &str) -> String {
    product
        .fields
        .get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_lowercase()
}

fn matches_search(product: &Product, needle: &str) -> bool {
    text_field(product, "name").contains(needle) || text_field(product, "description").contains(needle)
}

async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Product>, AppError> {
    let db = state.db.read().await;
    db.products
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound("Product"))
}

/// Keep only catalogue columns; the category is stored lowercase.
fn product_fields(input: Map<String, Value>) -> Map<String, Value> {
    input
        .into_iter()
        .filter(|(k, _)| PRODUCT_FIELDS.contains(&k.as_str()))
        .map(|(k, v)| {
            let v = match v {
                Value::String(s) if k == "category" => Value::String(s.to_lowercase()),
                v => v,
            };
            (k, v)
        })
        .collect()
}

async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let user = current_user(&state, &headers).await?;
    if !["name", "price", "stock"].iter().all(|f| input.contains_key(*f)) {
        return Err(AppError::bad_request("Missing required fields"));
    }
    let product = state
        .db
        .write()
        .await
        .add_product(user.id, product_fields(input));
    info!(product_id = product.id, owner_id = user.id, "created product");
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created successfully" })),
    ))
}

fn ensure_product_permission(user: &User, product: &Product) -> Result<(), AppError> {
    if user.role != "admin" && product.owner_id != user.id {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

async fn update_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<Value>, AppError> {
    let user = current_user(&state, &headers).await?;
    let mut db = state.db.write().await;
    let product = db.products.get_mut(&id).ok_or(AppError::NotFound("Product"))?;
    ensure_product_permission(&user, product)?;

    let changes = product_fields(input);
    if changes.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }
    product.fields.extend(changes);
    Ok(Json(json!({ "message": "Product updated successfully" })))
}

async fn delete_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    let user = current_user(&state, &headers).await?;
    let mut db = state.db.write().await;
    let product = db.products.get(&id).ok_or(AppError::NotFound("Product"))?;
    ensure_product_permission(&user, product)?;
    db.products.remove(&id);
    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

// --- admin ---

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserView>>, AppError> {
    require_admin(&state, &headers).await?;
    let db = state.db.read().await;
    Ok(Json(db.users.values().map(UserView::from).collect()))
}

async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers).await?;
    if !state.db.write().await.remove_user(id) {
        return Err(AppError::NotFound("User"));
    }
    info!(user_id = id, "deleted user");
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

async fn stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers).await?;
    let db = state.db.read().await;
    let revenue: f64 = db.orders.values().map(|o| o.total_amount).sum();
    Ok(Json(json!({
        "wholesalers": db.count_role("wholesaler"),
        "retailers": db.count_role("retailer"),
        "products": db.products.len(),
        "orders": db.orders.len(),
        "revenue": revenue,
    })))
}

async fn list_wholesalers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MemberView>>, AppError> {
    require_admin(&state, &headers).await?;
    Ok(Json(state.db.read().await.members("wholesaler")))
}

async fn list_retailers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<MemberView>>, AppError> {
    require_admin(&state, &headers).await?;
    Ok(Json(state.db.read().await.members("retailer")))
}

async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Order>>, AppError> {
    require_admin(&state, &headers).await?;
    let db = state.db.read().await;
    Ok(Json(db.orders.values().rev().cloned().collect()))
}

async fn update_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(input): Json<StatusInput>,
) -> Result<Json<Value>, AppError> {
    require_admin(&state, &headers).await?;
    let status = input
        .status
        .filter(|s| ORDER_STATUSES.contains(&s.as_str()))
        .ok_or_else(|| AppError::bad_request("Invalid status"))?;

    let mut db = state.db.write().await;
    let order = db.orders.get_mut(&id).ok_or(AppError::NotFound("Order"))?;
    order.status = status;
    Ok(Json(json!({ "message": "Order status updated" })))
}
