//! Domain DTOs for the Tradzy API.
//!
//! # Design
//! These types mirror the backend's JSON schema but are defined
//! independently of the mock-server crate; integration tests catch drift.
//! Products are deliberately opaque: only `id` is typed, every other field
//! rides along in a JSON map so the client never needs a schema change when
//! the catalogue grows a column.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Opaque credential issued by `/auth/login`.
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

/// Account role. The backend accepts exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Retailer,
    Wholesaler,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Retailer => "retailer",
            Role::Wholesaler => "wholesaler",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "retailer" => Some(Role::Retailer),
            "wholesaler" => Some(Role::Wholesaler),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public profile attached to login and check-auth responses, and returned
/// by the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

/// A catalogue entry. Only `id` is interpreted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Product {
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

/// Outcome of a product create or update. Backends either echo the stored
/// product or answer with a bare `{"message": ...}`; both mean success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProductWrite {
    Product(Product),
    Confirmation(Confirmation),
}

impl ProductWrite {
    pub fn product(&self) -> Option<&Product> {
        match self {
            ProductWrite::Product(product) => Some(product),
            ProductWrite::Confirmation(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ProductWrite::Product(_) => None,
            ProductWrite::Confirmation(c) => Some(c.message.as_str()),
        }
    }
}

/// Filters for the product listing. Empty filters are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Login request payload. The backend matches `email` against both the
/// email and the username columns.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Registration payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

/// Successful `/auth/login` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "access_token")]
    pub token: BearerToken,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(rename = "user")]
    pub profile: UserProfile,
}

/// `/auth/check-auth` body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(rename = "user", default)]
    pub profile: Option<UserProfile>,
}

/// Acknowledgement body such as `{"message": "Product deleted successfully"}`.
/// Empty when the server answered `204 No Content`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub message: String,
}

/// Platform counters from `/admin/stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub wholesalers: u64,
    pub retailers: u64,
    pub products: u64,
    pub orders: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

/// Row of the admin order listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(default)]
    pub buyer_id: Option<UserId>,
    #[serde(default)]
    pub retailer_name: Option<String>,
    #[serde(default)]
    pub wholesaler_name: Option<String>,
    pub total_amount: f64,
    pub status: OrderStatus,
    #[serde(default)]
    pub item_count: u64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Row of the admin wholesaler or retailer listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub products_count: Option<u64>,
    #[serde(default)]
    pub orders_count: Option<u64>,
    #[serde(default, deserialize_with = "flag")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Accept `true`/`false` as well as the `1`/`0` some SQL backends emit.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusUpdate {
    pub status: OrderStatus,
}
