//! In-process store.
//!
//! Implements every repository trait on plain collections guarded by
//! `RwLock`s. Used for local development (`STOREFRONT_STORE=memory`) and by
//! the test suites. Nothing is persisted across restarts.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;

use wardrobe_core::{Cart, Category, Email, OrderId, Phone, ProductId, ProductIdSequence, UserId};

use super::{CatalogStore, OrderStore, ProductStream, RepositoryError, UserStore};
use crate::models::{
    DEFAULT_ORDER_STATUS, NewOrder, NewProduct, NewUser, Order, Product, StoredCart, User,
};

#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
    cart: Cart,
    cart_version: i64,
}

/// Catalog, accounts and orders held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    product_ids: ProductIdSequence,
    products: RwLock<Vec<Product>>,
    users: RwLock<Vec<UserRecord>>,
    orders: RwLock<Vec<Order>>,
}

// A panic while holding a lock leaves the collections structurally intact,
// so poisoned guards are recovered rather than propagated.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn next_serial(len: usize) -> Result<i32, RepositoryError> {
    i32::try_from(len)
        .ok()
        .and_then(|n| n.checked_add(1))
        .ok_or_else(|| RepositoryError::DataCorruption("serial id overflow".to_owned()))
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of products currently in the catalog.
    #[must_use]
    pub fn product_count(&self) -> usize {
        read(&self.products).len()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn user_count(&self) -> usize {
        read(&self.users).len()
    }

    /// Every recorded order, oldest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        read(&self.orders).clone()
    }

    /// Highest product id handed out so far.
    #[must_use]
    pub fn last_product_id(&self) -> i32 {
        self.product_ids.last_issued()
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        // Take the id under the write lock so storage order matches id order.
        let mut products = write(&self.products);
        let id = self
            .product_ids
            .next_id()
            .ok_or(RepositoryError::SequenceExhausted)?;
        let product = product.into_product(id, Utc::now());
        products.push(product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(read(&self.products).iter().find(|p| p.id == id).cloned())
    }

    async fn delete_product(&self, id: ProductId) -> Result<Product, RepositoryError> {
        let mut products = write(&self.products);
        let index = products
            .iter()
            .position(|p| p.id == id)
            .ok_or(RepositoryError::NotFound)?;
        Ok(products.remove(index))
    }

    fn stream_products(&self, category: Option<Category>) -> ProductStream<'_> {
        let snapshot: Vec<Product> = read(&self.products)
            .iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .cloned()
            .collect();
        futures::stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut users = write(&self.users);
        if users.iter().any(|r| r.user.email == user.email) {
            return Err(RepositoryError::Conflict("email".to_owned()));
        }
        if users.iter().any(|r| r.user.phone == user.phone) {
            return Err(RepositoryError::Conflict("phone".to_owned()));
        }

        let created = User {
            id: UserId::new(next_serial(users.len())?),
            name: user.name,
            email: user.email,
            phone: user.phone,
            gender: user.gender,
            created_at: Utc::now(),
        };
        users.push(UserRecord {
            user: created.clone(),
            password_hash: user.password_hash,
            cart: Cart::new(),
            cart_version: 0,
        });
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(read(&self.users)
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| r.user.clone()))
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(read(&self.users)
            .iter()
            .find(|r| &r.user.email == email)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError> {
        Ok(read(&self.users).iter().any(|r| &r.user.email == email))
    }

    async fn phone_exists(&self, phone: &Phone) -> Result<bool, RepositoryError> {
        Ok(read(&self.users).iter().any(|r| &r.user.phone == phone))
    }

    async fn load_cart(&self, id: UserId) -> Result<Option<StoredCart>, RepositoryError> {
        Ok(read(&self.users)
            .iter()
            .find(|r| r.user.id == id)
            .map(|r| StoredCart {
                cart: r.cart.clone(),
                version: r.cart_version,
            }))
    }

    async fn save_cart(
        &self,
        id: UserId,
        expected_version: i64,
        cart: &Cart,
    ) -> Result<i64, RepositoryError> {
        let mut users = write(&self.users);
        let record = users
            .iter_mut()
            .find(|r| r.user.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if record.cart_version != expected_version {
            return Err(RepositoryError::VersionMismatch {
                expected: expected_version,
            });
        }
        record.cart = cart.clone();
        record.cart_version += 1;
        Ok(record.cart_version)
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError> {
        let mut orders = write(&self.orders);
        let created = Order {
            id: OrderId::new(next_serial(orders.len())?),
            user_id: order.user_id,
            items: order.items,
            amount: order.amount,
            address: order.address,
            status: DEFAULT_ORDER_STATUS.to_owned(),
            payment: false,
            checkout_session_id: order.checkout_session_id,
            created_at: Utc::now(),
        };
        orders.push(created.clone());
        Ok(created)
    }

    async fn orders_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        Ok(read(&self.orders)
            .iter()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use futures::TryStreamExt;
    use rust_decimal::Decimal;

    use super::*;

    fn new_product(name: &str, category: Category) -> NewProduct {
        NewProduct {
            name: name.to_owned(),
            image: format!("http://localhost:4000/images/{name}.png"),
            category,
            new_price: Decimal::new(50, 0),
            old_price: Decimal::new(80, 0),
            sizes: vec!["M".to_owned()],
            available: true,
        }
    }

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            name: "Ada".to_owned(),
            email: Email::parse(email).unwrap(),
            phone: Phone::parse(phone).unwrap(),
            gender: None,
            password_hash: "hash".to_owned(),
        }
    }

    #[tokio::test]
    async fn product_ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let first = store.insert_product(new_product("a", Category::Men)).await.unwrap();
        let second = store.insert_product(new_product("b", Category::Men)).await.unwrap();
        store.delete_product(second.id).await.unwrap();
        let third = store.insert_product(new_product("c", Category::Men)).await.unwrap();

        assert_eq!(first.id.as_i32(), 1);
        assert_eq!(second.id.as_i32(), 2);
        assert_eq!(third.id.as_i32(), 3);
    }

    #[tokio::test]
    async fn delete_unknown_product_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.delete_product(ProductId::new(9)).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn stream_filters_by_category_in_insertion_order() {
        let store = MemoryStore::new();
        for (name, category) in [
            ("w1", Category::Women),
            ("m1", Category::Men),
            ("w2", Category::Women),
        ] {
            store.insert_product(new_product(name, category)).await.unwrap();
        }

        let women: Vec<Product> = store
            .stream_products(Some(Category::Women))
            .try_collect()
            .await
            .unwrap();
        let names: Vec<&str> = women.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["w1", "w2"]);

        let all: Vec<Product> = store.stream_products(None).try_collect().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_get_distinct_ids() {
        let store = Arc::new(MemoryStore::new());
        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .insert_product(new_product(&format!("p{i}"), Category::Kid))
                        .await
                        .unwrap()
                        .id
                        .as_i32()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for task in tasks {
            assert!(ids.insert(task.await.unwrap()));
        }
        assert_eq!(ids, (1..=50).collect::<HashSet<_>>());
        assert_eq!(store.product_count(), 50);
    }

    #[tokio::test]
    async fn duplicate_email_and_phone_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@x.io", "555-0100")).await.unwrap();

        let dup_email = store.create_user(new_user("a@x.io", "555-0199")).await;
        assert!(matches!(dup_email, Err(RepositoryError::Conflict(f)) if f == "email"));

        let dup_phone = store.create_user(new_user("b@x.io", "5550100")).await;
        assert!(matches!(dup_phone, Err(RepositoryError::Conflict(f)) if f == "phone"));
    }

    #[tokio::test]
    async fn new_user_starts_with_empty_cart() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.io", "555-0100")).await.unwrap();
        let stored = store.load_cart(user.id).await.unwrap().unwrap();
        assert!(stored.cart.is_empty());
        assert_eq!(stored.version, 0);
    }

    #[tokio::test]
    async fn stale_cart_write_is_rejected() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a@x.io", "555-0100")).await.unwrap();

        let mut cart = Cart::new();
        cart.add_item(ProductId::new(1), "M");
        assert_eq!(store.save_cart(user.id, 0, &cart).await.unwrap(), 1);

        let stale = store.save_cart(user.id, 0, &Cart::new()).await;
        assert!(matches!(
            stale,
            Err(RepositoryError::VersionMismatch { expected: 0 })
        ));

        let stored = store.load_cart(user.id).await.unwrap().unwrap();
        assert_eq!(stored.cart, cart);
    }

    #[tokio::test]
    async fn save_cart_for_unknown_user_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.save_cart(UserId::new(7), 0, &Cart::new()).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn orders_are_listed_per_user() {
        let store = MemoryStore::new();
        let order = store
            .create_order(NewOrder {
                user_id: UserId::new(1),
                items: Vec::new(),
                amount: Decimal::ZERO,
                address: None,
                checkout_session_id: Some("cs_test".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(order.status, DEFAULT_ORDER_STATUS);
        assert!(!order.payment);

        assert_eq!(store.orders_for_user(UserId::new(1)).await.unwrap().len(), 1);
        assert!(store.orders_for_user(UserId::new(2)).await.unwrap().is_empty());
    }
}
