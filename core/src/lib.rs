//! Client core for the Tradzy marketplace API.
//!
//! # Overview
//! `TradzyClient` builds `HttpRequest` values and parses `HttpResponse`
//! values without touching the network (host-does-IO pattern).
//! `ApiSession` drives those through an injected `Transport` and keeps the
//! bearer credential and basic profile in a `LocalCache` backed by any
//! `KeyValueStore`.
//!
//! # Design
//! - `TradzyClient` is stateless; it holds only `base_url` (default `/api`).
//! - Each operation is split into `build_*` and `parse_*`, so the I/O
//!   boundary is explicit and every response rule is testable on plain data.
//! - Credentials are bearer tokens. Login writes token and profile together;
//!   logout clears them even when the server call fails.
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;
pub mod transport;
pub mod types;

pub use cache::LocalCache;
pub use client::{Operation, TradzyClient};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use session::ApiSession;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use transport::Transport;
#[cfg(feature = "ureq")]
pub use transport::UreqTransport;
pub use types::{
    AuthStatus, BearerToken, Confirmation, LoginResponse, Member, NewAccount, Order, OrderId,
    OrderStatus, Product, ProductId, ProductQuery, ProductWrite, Role, Stats, UserId, UserProfile,
};
