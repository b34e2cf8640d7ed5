//! Catalog endpoints: id assignment, removal, listings.

use axum::http::StatusCode;
use futures::future::join_all;
use serde_json::{Value, json};

use wardrobe_integration_tests::TestApp;

fn ids(products: &Value) -> Vec<i64> {
    products
        .as_array()
        .expect("listing is an array")
        .iter()
        .map(|p| p["id"].as_i64().expect("product id"))
        .collect()
}

#[tokio::test]
async fn ids_start_at_one_and_increase() {
    let app = TestApp::new();

    let first = app.add_product("Blouse", "women").await;
    let second = app.add_product("Jacket", "men").await;
    let third = app.add_product("Hoodie", "kid").await;

    assert_eq!((first, second, third), (1, 2, 3));
}

#[tokio::test]
async fn addproduct_answers_success_and_name() {
    let app = TestApp::new();
    let response = app
        .post_json(
            "/addproduct",
            None,
            &json!({
                "name": "Striped Blouse",
                "image": "http://localhost:4000/images/a.png",
                "category": "women",
                "new_price": 50.0,
                "old_price": 80.5,
            }),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.json(),
        json!({ "success": 1, "id": 1, "name": "Striped Blouse" })
    );
}

#[tokio::test]
async fn removed_ids_are_not_reused() {
    let app = TestApp::new();
    app.add_product("A", "women").await;
    let second = app.add_product("B", "women").await;

    let response = app
        .post_json("/removeproduct", None, &json!({ "id": second }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["name"], "B");

    assert_eq!(app.add_product("C", "women").await, 3);
}

#[tokio::test]
async fn removing_missing_product_is_not_found_and_changes_nothing() {
    let app = TestApp::new();
    app.add_product("A", "women").await;
    app.add_product("B", "men").await;

    let response = app
        .post_json("/removeproduct", None, &json!({ "id": 99 }))
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.json()["message"], "Not found");
    assert_eq!(app.store.product_count(), 2);
    assert_eq!(ids(&app.get("/allproducts").await.json()), vec![1, 2]);
}

#[tokio::test]
async fn concurrent_adds_receive_distinct_ids() {
    let app = TestApp::new();

    let mut ids: Vec<i64> = join_all((0..25).map(|i| {
        let app = &app;
        async move { app.add_product(&format!("P{i}"), "women").await }
    }))
    .await;
    ids.sort_unstable();

    assert_eq!(ids, (1..=25).collect::<Vec<_>>());
}

#[tokio::test]
async fn category_listings_filter_and_keep_store_order() {
    let app = TestApp::new();
    app.add_product("W1", "women").await;
    app.add_product("M1", "men").await;
    app.add_product("K1", "kid").await;
    app.add_product("W2", "women").await;

    assert_eq!(ids(&app.get("/women").await.json()), vec![1, 4]);
    assert_eq!(ids(&app.get("/men").await.json()), vec![2]);
    assert_eq!(ids(&app.get("/kids").await.json()), vec![3]);
    assert_eq!(ids(&app.get("/allproducts").await.json()), vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn popular_returns_first_four_of_category() {
    let app = TestApp::new();
    app.add_product("M0", "men").await;
    for i in 0..10 {
        app.add_product(&format!("W{i}"), "women").await;
    }

    let response = app.get("/popular/women").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(ids(&response.json()), vec![2, 3, 4, 5]);
}

#[tokio::test]
async fn popular_rejects_unknown_category() {
    let app = TestApp::new();
    let response = app.get("/popular/hats").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn new_collections_skip_oldest_and_keep_last_eight() {
    let app = TestApp::new();
    for i in 0..12 {
        app.add_product(&format!("P{i}"), "men").await;
    }

    let response = app.get("/newcollections").await;

    assert_eq!(ids(&response.json()), (5..=12).collect::<Vec<_>>());
}

#[tokio::test]
async fn invalid_product_is_bad_request() {
    let app = TestApp::new();

    let response = app
        .post_json(
            "/addproduct",
            None,
            &json!({
                "name": "Tee",
                "image": "x.png",
                "category": "women",
                "new_price": -1,
                "old_price": 5,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json()["message"], "Bad request");

    let response = app
        .post_json("/addproduct", None, &json!({ "name": "Tee" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.product_count(), 0);
}

#[tokio::test]
async fn prices_outside_stored_precision_are_bad_request() {
    let app = TestApp::new();

    for (new_price, old_price) in [(json!(12.345), json!(20)), (json!(50), json!(1e10))] {
        let response = app
            .post_json(
                "/addproduct",
                None,
                &json!({
                    "name": "Tee",
                    "image": "x.png",
                    "category": "women",
                    "new_price": new_price,
                    "old_price": old_price,
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{new_price} {old_price}");
        assert_eq!(response.json()["message"], "Bad request");
    }

    assert_eq!(app.store.product_count(), 0);
    assert_eq!(app.add_product("Tee", "women").await, 1);
}
