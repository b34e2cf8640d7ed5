//! `PostgreSQL` store tests.
//!
//! These tests require a reachable database in `STOREFRONT_TEST_DATABASE_URL`;
//! migrations are applied on connect.
//!
//! Run with: cargo test -p wardrobe-integration-tests -- --ignored

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::join_all;
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;

use wardrobe_core::{Cart, Category, Email, Phone, ProductId};
use wardrobe_storefront::db::{
    self, CatalogStore, PgCatalogStore, PgUserStore, RepositoryError, UserStore,
};
use wardrobe_storefront::models::{NewProduct, NewUser};

async fn pool() -> PgPool {
    let url = std::env::var("STOREFRONT_TEST_DATABASE_URL")
        .expect("STOREFRONT_TEST_DATABASE_URL must be set");
    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to test database");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn unique_suffix() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos()
}

fn product(name: String) -> NewProduct {
    NewProduct {
        name,
        image: "http://localhost:4000/images/x.png".to_owned(),
        category: Category::Men,
        new_price: Decimal::new(5000, 2),
        old_price: Decimal::new(8050, 2),
        sizes: vec!["M".to_owned()],
        available: true,
    }
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_TEST_DATABASE_URL)"]
async fn concurrent_inserts_get_consecutive_ids() {
    let store = Arc::new(PgCatalogStore::new(pool().await));

    let mut ids: Vec<i32> = join_all((0..20).map(|i| {
        let store = store.clone();
        async move {
            store
                .insert_product(product(format!("Concurrent {i}")))
                .await
                .expect("insert succeeds")
                .id
                .as_i32()
        }
    }))
    .await;
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), 20);
    assert_eq!(ids.last().copied(), ids.first().map(|first| first + 19));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_TEST_DATABASE_URL)"]
async fn deleted_product_is_gone_and_missing_delete_fails() {
    let store = PgCatalogStore::new(pool().await);
    let inserted = store
        .insert_product(product("Short lived".to_owned()))
        .await
        .expect("insert succeeds");

    let removed = store.delete_product(inserted.id).await.expect("delete succeeds");
    assert_eq!(removed.name, "Short lived");
    assert!(store.get_product(inserted.id).await.expect("get").is_none());
    assert!(matches!(
        store.delete_product(ProductId::new(i32::MAX)).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_TEST_DATABASE_URL)"]
async fn stale_cart_write_is_rejected() {
    let store = PgUserStore::new(pool().await);
    let suffix = unique_suffix();
    let user = store
        .create_user(NewUser {
            name: "Cart Tester".to_owned(),
            email: Email::parse(&format!("cart-{suffix}@example.com")).expect("valid email"),
            phone: Phone::parse(&format!("{}", suffix % 1_000_000_000_000)).expect("valid phone"),
            gender: None,
            password_hash: "not-a-real-hash".to_owned(),
        })
        .await
        .expect("create user");

    let stored = store
        .load_cart(user.id)
        .await
        .expect("load cart")
        .expect("user exists");
    assert!(stored.cart.is_empty());

    let mut cart = Cart::new();
    cart.add_item(ProductId::new(1), "M");
    store
        .save_cart(user.id, stored.version, &cart)
        .await
        .expect("first write succeeds");

    assert!(matches!(
        store.save_cart(user.id, stored.version, &cart).await,
        Err(RepositoryError::VersionMismatch { .. })
    ));
}

#[tokio::test]
#[ignore = "Requires PostgreSQL (STOREFRONT_TEST_DATABASE_URL)"]
async fn duplicate_email_is_a_conflict() {
    let store = PgUserStore::new(pool().await);
    let suffix = unique_suffix();
    let new_user = |phone: &str| NewUser {
        name: "Dup".to_owned(),
        email: Email::parse(&format!("dup-{suffix}@example.com")).expect("valid email"),
        phone: Phone::parse(phone).expect("valid phone"),
        gender: None,
        password_hash: "not-a-real-hash".to_owned(),
    };

    let first_phone = format!("1{}", suffix % 100_000_000);
    let second_phone = format!("2{}", suffix % 100_000_000);
    store
        .create_user(new_user(&first_phone))
        .await
        .expect("first signup");

    assert!(matches!(
        store.create_user(new_user(&second_phone)).await,
        Err(RepositoryError::Conflict(field)) if field == "email"
    ));
}
