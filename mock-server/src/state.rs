//! In-memory backing store for the mock backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

pub const VALID_ROLES: [&str; 3] = ["admin", "retailer", "wholesaler"];
pub const ORDER_STATUSES: [&str; 5] = ["pending", "confirmed", "shipped", "delivered", "cancelled"];

#[derive(Clone, Debug)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub company: Option<String>,
}

/// The public projection of a user.
#[derive(Clone, Debug, Serialize)]
pub struct UserView {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

/// A wholesaler or retailer as listed on the admin pages. Wholesalers carry
/// a product count, retailers an order count.
#[derive(Clone, Debug, Serialize)]
pub struct MemberView {
    pub id: u64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orders_count: Option<usize>,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: u64,
    pub owner_id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: u64,
    pub buyer_id: u64,
    pub total_amount: f64,
    pub status: String,
    pub item_count: u64,
}

#[derive(Default, Debug)]
pub struct Store {
    pub users: BTreeMap<u64, User>,
    pub tokens: HashMap<String, u64>,
    pub products: BTreeMap<u64, Product>,
    pub orders: BTreeMap<u64, Order>,
    next_user: u64,
    next_product: u64,
    next_order: u64,
}

impl Store {
    pub fn add_user(&mut self, mut user: User) -> u64 {
        self.next_user += 1;
        user.id = self.next_user;
        self.users.insert(user.id, user);
        self.next_user
    }

    pub fn add_product(&mut self, owner_id: u64, fields: Map<String, Value>) -> Product {
        self.next_product += 1;
        let product = Product {
            id: self.next_product,
            owner_id,
            fields,
        };
        self.products.insert(product.id, product.clone());
        product
    }

    pub fn find_login(&self, identifier: &str) -> Option<&User> {
        self.users
            .values()
            .find(|u| u.email == identifier || u.username == identifier)
    }

    pub fn issue_token(&mut self, user_id: u64) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.insert(token.clone(), user_id);
        token
    }

    pub fn user_for_token(&self, token: &str) -> Option<&User> {
        self.tokens.get(token).and_then(|id| self.users.get(id))
    }

    /// Remove a user and every token issued to them.
    pub fn remove_user(&mut self, id: u64) -> bool {
        if self.users.remove(&id).is_none() {
            return false;
        }
        self.tokens.retain(|_, user_id| *user_id != id);
        true
    }

    pub fn count_role(&self, role: &str) -> usize {
        self.users.values().filter(|u| u.role == role).count()
    }

    /// Users holding `role`, newest first.
    pub fn members(&self, role: &str) -> Vec<MemberView> {
        self.users
            .values()
            .rev()
            .filter(|u| u.role == role)
            .map(|u| {
                let wholesaler = u.role == "wholesaler";
                MemberView {
                    id: u.id,
                    username: u.username.clone(),
                    email: u.email.clone(),
                    company: wholesaler
                        .then(|| u.company.clone().unwrap_or_else(|| u.username.clone())),
                    products_count: wholesaler
                        .then(|| self.products.values().filter(|p| p.owner_id == u.id).count()),
                    orders_count: (!wholesaler)
                        .then(|| self.orders.values().filter(|o| o.buyer_id == u.id).count()),
                    is_active: true,
                }
            })
            .collect()
    }
}

pub type Db = Arc<RwLock<Store>>;

/// Shared state handed to every handler.
#[derive(Clone, Default)]
pub struct AppState {
    pub db: Db,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders have no public creation route; tests and demos seed them here.
    pub async fn seed_order(&self, buyer_id: u64, total_amount: f64, item_count: u64) -> u64 {
        let mut db = self.db.write().await;
        db.next_order += 1;
        let id = db.next_order;
        db.orders.insert(
            id,
            Order {
                id,
                buyer_id,
                total_amount,
                status: "pending".to_string(),
                item_count,
            },
        );
        id
    }
}
