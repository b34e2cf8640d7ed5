//! Per-user cart mutations.
//!
//! Each mutation is read-modify-write on the user's stored cart. Mutations for
//! one user are serialized in process by [`CartLocks`]; the store write is
//! additionally conditional on the version that was read, so a writer in
//! another process surfaces as [`CartError::Conflict`] instead of a lost update.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::instrument;

use wardrobe_core::{Cart, DEFAULT_SIZE, ProductId, UserId};

use crate::db::{RepositoryError, UserStore};

/// Lock-map size above which idle entries are dropped.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Error)]
pub enum CartError {
    #[error("user not found")]
    UserNotFound,

    #[error("cart was modified concurrently")]
    Conflict,

    #[error("database error: {0}")]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CartError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => Self::UserNotFound,
            RepositoryError::VersionMismatch { .. } => Self::Conflict,
            other => Self::Repository(other),
        }
    }
}

/// One async mutex per user with an active cart mutation.
#[derive(Debug, Default)]
pub struct CartLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl CartLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user`'s cart.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > PRUNE_THRESHOLD {
                // Only the map holds a reference to idle locks.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(user).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[derive(Clone)]
pub struct CartService {
    users: Arc<dyn UserStore>,
    locks: Arc<CartLocks>,
}

impl CartService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self {
            users,
            locks: Arc::new(CartLocks::new()),
        }
    }

    /// The stored cart, unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartError::UserNotFound` for unknown users.
    pub async fn get(&self, user: UserId) -> Result<Cart, CartError> {
        self.users
            .load_cart(user)
            .await?
            .map(|stored| stored.cart)
            .ok_or(CartError::UserNotFound)
    }

    /// Add one unit of `product` in `size` (the sentinel size when absent).
    ///
    /// # Errors
    ///
    /// Returns `CartError::Conflict` if another process wrote the cart first.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user: UserId,
        product: ProductId,
        size: Option<&str>,
    ) -> Result<Cart, CartError> {
        let size = size.map(str::trim).filter(|s| !s.is_empty()).unwrap_or(DEFAULT_SIZE);

        let _guard = self.locks.lock(user).await;
        let mut stored = self
            .users
            .load_cart(user)
            .await?
            .ok_or(CartError::UserNotFound)?;
        stored.cart.add_item(product, size);
        self.users
            .save_cart(user, stored.version, &stored.cart)
            .await?;
        Ok(stored.cart)
    }

    /// Remove one unit of `product`. A product not in the cart is a no-op and
    /// nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Conflict` if another process wrote the cart first.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user: UserId, product: ProductId) -> Result<Cart, CartError> {
        let _guard = self.locks.lock(user).await;
        let mut stored = self
            .users
            .load_cart(user)
            .await?
            .ok_or(CartError::UserNotFound)?;
        if stored.cart.remove_item(product).is_some() {
            self.users
                .save_cart(user, stored.version, &stored.cart)
                .await?;
        }
        Ok(stored.cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use wardrobe_core::{CartItem, Email, Phone};

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewUser;

    async fn service_with_user() -> (CartService, Arc<MemoryStore>, UserId) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                name: "Ada".to_owned(),
                email: Email::parse("a@x.com").unwrap(),
                phone: Phone::parse("555").unwrap(),
                gender: None,
                password_hash: "hash".to_owned(),
            })
            .await
            .unwrap();
        (CartService::new(store.clone()), store, user.id)
    }

    #[tokio::test]
    async fn add_twice_merges_into_one_entry_with_latest_size() {
        let (carts, _, user) = service_with_user().await;
        carts.add_item(user, ProductId::new(7), Some("M")).await.unwrap();
        let cart = carts.add_item(user, ProductId::new(7), Some("L")).await.unwrap();

        assert_eq!(cart.items(), &[CartItem::new(ProductId::new(7), 2, "L")]);
        assert_eq!(carts.get(user).await.unwrap(), cart);
    }

    #[tokio::test]
    async fn missing_size_uses_sentinel() {
        let (carts, _, user) = service_with_user().await;
        let cart = carts.add_item(user, ProductId::new(1), None).await.unwrap();
        assert_eq!(cart.items()[0].size, DEFAULT_SIZE);
    }

    #[tokio::test]
    async fn get_is_stable_without_mutation() {
        let (carts, _, user) = service_with_user().await;
        carts.add_item(user, ProductId::new(3), Some("S")).await.unwrap();
        assert_eq!(carts.get(user).await.unwrap(), carts.get(user).await.unwrap());
    }

    #[tokio::test]
    async fn remove_absent_product_writes_nothing() {
        let (carts, store, user) = service_with_user().await;
        carts.add_item(user, ProductId::new(3), Some("S")).await.unwrap();
        let before = store.load_cart(user).await.unwrap().unwrap();

        let cart = carts.remove_item(user, ProductId::new(4)).await.unwrap();

        let after = store.load_cart(user).await.unwrap().unwrap();
        assert_eq!(cart, before.cart);
        assert_eq!(after.version, before.version);
    }

    #[tokio::test]
    async fn remove_floors_at_zero() {
        let (carts, _, user) = service_with_user().await;
        carts.add_item(user, ProductId::new(3), Some("S")).await.unwrap();
        carts.remove_item(user, ProductId::new(3)).await.unwrap();
        let cart = carts.remove_item(user, ProductId::new(3)).await.unwrap();

        assert_eq!(cart.items(), &[CartItem::new(ProductId::new(3), 0, "S")]);
    }

    #[tokio::test]
    async fn unknown_user_is_reported() {
        let (carts, _, _) = service_with_user().await;
        assert!(matches!(
            carts.add_item(UserId::new(99), ProductId::new(1), None).await,
            Err(CartError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn out_of_process_writer_causes_conflict() {
        let (carts, store, user) = service_with_user().await;
        let stored = store.load_cart(user).await.unwrap().unwrap();
        // Another process bumps the version between our read and write.
        store.save_cart(user, stored.version, &Cart::new()).await.unwrap();

        let err: CartError = store
            .save_cart(user, stored.version, &Cart::new())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, CartError::Conflict));
        assert!(carts.add_item(user, ProductId::new(1), None).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_lose_no_updates() {
        let (carts, _, user) = service_with_user().await;
        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let carts = carts.clone();
                tokio::spawn(async move {
                    carts
                        .add_item(user, ProductId::new(i % 2 + 1), Some("M"))
                        .await
                        .unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let cart = carts.get(user).await.unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart.total_quantity(), 40);
    }

    #[tokio::test]
    async fn idle_locks_are_pruned() {
        let locks = CartLocks::new();
        for id in 0..=i32::try_from(PRUNE_THRESHOLD).unwrap() + 1 {
            drop(locks.lock(UserId::new(id)).await);
        }
        assert!(locks.len() <= PRUNE_THRESHOLD);
    }
}
