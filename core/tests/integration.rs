//! End-to-end session tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then drives `ApiSession` over
//! real HTTP through `UreqTransport`. The session uses the default relative
//! `/api` base, so this also checks that the transport resolves paths
//! against its origin.

use std::net::SocketAddr;

use mock_server::AppState;
use serde_json::json;
use tradzy_core::cache::MANAGED_KEYS;
use tradzy_core::{
    ApiError, ApiSession, FileStore, KeyValueStore, MemoryStore, OrderId, OrderStatus,
    ProductQuery, Role, TradzyClient, UreqTransport,
};

/// Serve the mock backend on a random port from a background thread.
fn start_server() -> (SocketAddr, AppState) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let state = AppState::new();
    let served = state.clone();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_state(listener, served).await
        })
        .unwrap();
    });

    (addr, state)
}

fn session<S: KeyValueStore>(addr: SocketAddr, store: S) -> ApiSession<UreqTransport, S> {
    ApiSession::new(
        TradzyClient::default(),
        UreqTransport::new(&format!("http://{addr}")),
        store,
    )
}

fn assert_no_managed_keys<S: KeyValueStore>(store: &S) {
    for key in MANAGED_KEYS {
        assert!(store.get(key).unwrap().is_none(), "{key} still cached");
    }
}

#[test]
fn wholesaler_lifecycle() {
    let (addr, _) = start_server();
    let mut s = session(addr, MemoryStore::new());

    // Step 1: register, which never logs in.
    let confirmation = s
        .register("walt", "pw", "walt@example.com", Role::Wholesaler)
        .unwrap();
    assert_eq!(confirmation.message, "Registration successful");
    assert!(s.cache().store().is_empty());

    // Step 2: nobody is logged in yet.
    let status = s.check_auth().unwrap();
    assert!(!status.authenticated);

    // Step 3: wrong password is rejected and nothing is cached.
    let err = s.login("walt", "wrong").unwrap_err();
    assert!(matches!(
        err,
        ApiError::Request { status: 401, ref message } if message == "Invalid credentials"
    ));
    assert!(s.cache().store().is_empty());

    // Step 4: log in by email.
    let login = s.login("walt@example.com", "pw").unwrap();
    assert_eq!(login.profile.username, "walt");
    assert_eq!(login.redirect.as_deref(), Some("/wholesaler/dashboard"));
    assert_eq!(s.cache().store().len(), 5);
    assert_eq!(s.cache().profile().unwrap(), Some(login.profile.clone()));

    // Step 5: create, then find it in the listing. The backend answers
    // writes with a bare confirmation.
    let written = s
        .create_product(&json!({
            "name": "Basmati Rice",
            "description": "Long grain",
            "price": 12.5,
            "stock": 40,
            "category": "grains",
        }))
        .unwrap();
    assert_eq!(written.message(), Some("Product created successfully"));
    let listed = s.list_products().unwrap();
    let found = listed
        .iter()
        .find(|p| p.field("name") == Some(&json!("Basmati Rice")))
        .unwrap();
    let id = found.id;
    assert_eq!(found.field("price"), Some(&json!(12.5)));
    assert_eq!(found.field("stock"), Some(&json!(40)));

    // Step 6: update, fetch, filter.
    let written = s.update_product(id, &json!({"stock": 35})).unwrap();
    assert_eq!(written.message(), Some("Product updated successfully"));
    let fetched = s.get_product(id).unwrap();
    assert_eq!(fetched.field("stock"), Some(&json!(35)));
    assert_eq!(fetched.field("description"), Some(&json!("Long grain")));

    let filtered = s
        .list_products_filtered(&ProductQuery {
            search: Some("long grain".to_string()),
            category: None,
        })
        .unwrap();
    assert_eq!(filtered.len(), 1);
    let filtered = s
        .list_products_filtered(&ProductQuery {
            search: None,
            category: Some("spices".to_string()),
        })
        .unwrap();
    assert!(filtered.is_empty());

    // Step 7: admin routes are refused but the token survives a 403.
    let err = s.list_users().unwrap_err();
    assert!(matches!(
        err,
        ApiError::Request { status: 403, ref message } if message == "Permission denied"
    ));
    assert!(s.cache().token().unwrap().is_some());

    // Step 8: delete.
    let confirmation = s.delete_product(id).unwrap();
    assert_eq!(confirmation.message, "Product deleted successfully");
    let err = s.get_product(id).unwrap_err();
    assert!(matches!(
        err,
        ApiError::Request { status: 404, ref message } if message == "Product not found"
    ));

    // Step 9: logout clears everything and the token stops working.
    s.logout().unwrap();
    assert_no_managed_keys(s.cache().store());
    assert!(!s.check_auth().unwrap().authenticated);
}

#[test]
fn admin_session_persists_in_file_store() {
    let (addr, state) = start_server();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tradzy-cache.json");

    let mut s = session(addr, FileStore::open(&path).unwrap());
    s.register("root", "pw", "root@example.com", Role::Admin).unwrap();
    s.register("rita", "pw", "rita@example.com", Role::Retailer).unwrap();
    s.login("root", "pw").unwrap();
    drop(s);

    // A fresh session picks the credential up from disk.
    let mut s = session(addr, FileStore::open(&path).unwrap());
    let status = s.check_auth().unwrap();
    assert!(status.authenticated);
    assert_eq!(s.cache().role().unwrap(), Some(Role::Admin));

    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let order = rt.block_on(state.seed_order(2, 99.5, 4));

    let stats = s.get_stats().unwrap();
    assert_eq!(stats.retailers, 1);
    assert_eq!(stats.orders, 1);
    assert_eq!(stats.revenue, 99.5);

    let orders = s.list_orders().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Pending);

    s.update_order_status(OrderId(order), OrderStatus::Shipped).unwrap();
    assert_eq!(s.list_orders().unwrap()[0].status, OrderStatus::Shipped);

    let err = s
        .update_order_status(OrderId(order + 100), OrderStatus::Shipped)
        .unwrap_err();
    assert_eq!(err.status(), Some(404));

    let retailers = s.list_retailers().unwrap();
    assert_eq!(retailers.len(), 1);
    assert_eq!(retailers[0].username, "rita");
    assert_eq!(retailers[0].orders_count, Some(1));
    assert!(s.list_wholesalers().unwrap().is_empty());

    let users = s.list_users().unwrap();
    let rita = users.iter().find(|u| u.username == "rita").unwrap();
    s.delete_user(rita.id).unwrap();
    assert_eq!(s.list_users().unwrap().len(), 1);

    // Deleting ourselves revokes our token; the next call clears it locally.
    let me = s.cache().profile().unwrap().unwrap();
    s.delete_user(me.id).unwrap();
    let err = s.get_stats().unwrap_err();
    assert!(err.is_unauthorized());
    assert!(s.cache().token().unwrap().is_none());

    s.logout().unwrap();
    drop(s);
    let reopened = FileStore::open(&path).unwrap();
    assert_no_managed_keys(&reopened);
}

#[test]
fn logout_without_server_still_clears_cache() {
    // Bind and immediately release a port so nothing is listening on it.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let mut store = MemoryStore::new();
    store
        .set_all(&[
            ("jwt_token", "stale"),
            ("userRole", "retailer"),
            ("userId", "7"),
            ("username", "rita"),
            ("userEmail", "rita@example.com"),
        ])
        .unwrap();

    let mut s = session(addr, store);
    let err = s.logout().unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
    assert_no_managed_keys(s.cache().store());
}
