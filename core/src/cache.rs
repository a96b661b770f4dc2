//! Typed view of the credential cache kept in a `KeyValueStore`.
//!
//! The cache owns exactly five keys. A login writes all of them in one
//! `set_all`; a logout removes all of them in one `remove_all`. Nothing else
//! in the crate touches these keys directly.

use crate::storage::{KeyValueStore, StorageError};
use crate::types::{BearerToken, Role, UserId, UserProfile};

pub const TOKEN_KEY: &str = "jwt_token";
pub const ROLE_KEY: &str = "userRole";
pub const USER_ID_KEY: &str = "userId";
pub const USERNAME_KEY: &str = "username";
pub const EMAIL_KEY: &str = "userEmail";

pub const MANAGED_KEYS: [&str; 5] = [TOKEN_KEY, ROLE_KEY, USER_ID_KEY, USERNAME_KEY, EMAIL_KEY];

#[derive(Debug)]
pub struct LocalCache<S> {
    store: S,
}

impl<S: KeyValueStore> LocalCache<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    /// Overwrite the credential and all four profile fields together. On
    /// error the store keeps what it held before.
    pub fn store_login(
        &mut self,
        token: &BearerToken,
        profile: &UserProfile,
    ) -> Result<(), StorageError> {
        let id = profile.id.to_string();
        self.store.set_all(&[
            (TOKEN_KEY, token.as_str()),
            (ROLE_KEY, profile.role.as_str()),
            (USER_ID_KEY, id.as_str()),
            (USERNAME_KEY, profile.username.as_str()),
            (EMAIL_KEY, profile.email.as_str()),
        ])
    }

    /// Remove every managed key.
    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.store.remove_all(&MANAGED_KEYS)
    }

    /// Forget the credential after the server rejected it. Profile fields
    /// stay; without a token they are inert.
    pub fn clear_credential(&mut self) -> Result<(), StorageError> {
        self.store.remove_all(&[TOKEN_KEY, ROLE_KEY])
    }

    pub fn set_role(&mut self, role: Role) -> Result<(), StorageError> {
        self.store.set(ROLE_KEY, role.as_str())
    }

    pub fn clear_role(&mut self) -> Result<(), StorageError> {
        self.store.remove(ROLE_KEY)
    }

    pub fn token(&self) -> Result<Option<BearerToken>, StorageError> {
        Ok(self.store.get(TOKEN_KEY)?.map(BearerToken::new))
    }

    /// Cached role. A value outside the known set reads as absent.
    pub fn role(&self) -> Result<Option<Role>, StorageError> {
        Ok(self.store.get(ROLE_KEY)?.as_deref().and_then(Role::parse))
    }

    /// The cached profile, present only when all four fields are.
    pub fn profile(&self) -> Result<Option<UserProfile>, StorageError> {
        let id = self
            .store
            .get(USER_ID_KEY)?
            .and_then(|raw| raw.parse::<u64>().ok());
        let username = self.store.get(USERNAME_KEY)?;
        let email = self.store.get(EMAIL_KEY)?;
        let role = self.role()?;

        Ok(match (id, username, email, role) {
            (Some(id), Some(username), Some(email), Some(role)) => Some(UserProfile {
                id: UserId(id),
                username,
                email,
                role,
            }),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        for key in MANAGED_KEYS {
            if self.store.get(key)?.is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
