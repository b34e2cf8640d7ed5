//! Cart items and reconciliation.
//!
//! A cart is the ordered list of entries embedded in a user record. Repeated
//! add/remove requests are merged into it so that there is never more than one
//! entry per product:
//!
//! - adding a product already in the cart bumps its quantity and replaces its
//!   size (last write wins)
//! - adding a new product appends `{product_id, 1, size}`
//! - removing decrements the quantity, never below zero; the entry stays
//! - removing a product that is not in the cart changes nothing

use serde::{Deserialize, Serialize};

use crate::types::ProductId;

/// Size recorded when the client did not pick one.
pub const DEFAULT_SIZE: &str = "Not selected";

/// One product line in a user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Catalog id of the product (a value reference, not a foreign key).
    pub product_id: ProductId,
    pub quantity: u32,
    #[serde(default = "default_size")]
    pub size: String,
}

fn default_size() -> String {
    DEFAULT_SIZE.to_owned()
}

impl CartItem {
    #[must_use]
    pub fn new(product_id: ProductId, quantity: u32, size: impl Into<String>) -> Self {
        Self {
            product_id,
            quantity,
            size: size.into(),
        }
    }
}

/// A user's cart: entries in the order they were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from stored entries, folding duplicate product entries into
    /// the first one so the one-entry-per-product invariant holds.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            match cart.position(item.product_id) {
                Some(index) => {
                    if let Some(existing) = cart.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                        existing.size = item.size;
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    #[must_use]
    pub fn get(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all entries.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    fn position(&self, product_id: ProductId) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.product_id == product_id)
    }

    /// Add one unit of `product_id` in `size`. Returns the resulting entry.
    // indices come from `position` or from the slot just pushed
    #[allow(clippy::indexing_slicing)]
    pub fn add_item(&mut self, product_id: ProductId, size: &str) -> &CartItem {
        let index = match self.position(product_id) {
            Some(index) => {
                let item = &mut self.items[index];
                item.quantity = item.quantity.saturating_add(1);
                size.clone_into(&mut item.size);
                index
            }
            None => {
                self.items.push(CartItem::new(product_id, 1, size));
                self.items.len() - 1
            }
        };
        &self.items[index]
    }

    /// Remove one unit of `product_id`.
    ///
    /// Returns the updated entry, or `None` when the product is not in the cart
    /// (in which case the cart is unchanged).
    pub fn remove_item(&mut self, product_id: ProductId) -> Option<&CartItem> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.product_id == product_id)?;
        item.quantity = item.quantity.saturating_sub(1);
        Some(&*item)
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self::from_items(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pid(id: i32) -> ProductId {
        ProductId::new(id)
    }

    #[test]
    fn add_new_product_appends_single_unit() {
        let mut cart = Cart::new();
        let item = cart.add_item(pid(7), "M").clone();

        assert_eq!(item, CartItem::new(pid(7), 1, "M"));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn add_existing_product_increments_and_overwrites_size() {
        let mut cart = Cart::new();
        cart.add_item(pid(7), "M");
        cart.add_item(pid(7), "L");

        assert_eq!(cart.items(), &[CartItem::new(pid(7), 2, "L")]);
    }

    #[test]
    fn add_keeps_first_insertion_order() {
        let mut cart = Cart::new();
        cart.add_item(pid(3), "S");
        cart.add_item(pid(1), "S");
        cart.add_item(pid(3), "XL");

        let order: Vec<i32> = cart.items().iter().map(|i| i.product_id.as_i32()).collect();
        assert_eq!(order, vec![3, 1]);
    }

    #[test]
    fn add_leaves_exactly_one_entry_per_product() {
        let mut cart = Cart::new();
        for round in 0..5_u32 {
            for id in 1..=4 {
                let before = cart.get(pid(id)).map_or(0, |i| i.quantity);
                let item = cart.add_item(pid(id), &format!("size-{round}")).clone();
                assert_eq!(item.quantity, before + 1);
                assert_eq!(item.size, format!("size-{round}"));
                assert_eq!(
                    cart.items().iter().filter(|i| i.product_id == pid(id)).count(),
                    1
                );
            }
        }
        assert_eq!(cart.total_quantity(), 20);
    }

    #[test]
    fn remove_decrements_quantity() {
        let mut cart = Cart::from_items(vec![CartItem::new(pid(4), 3, "S")]);
        let item = cart.remove_item(pid(4)).cloned().unwrap();
        assert_eq!(item.quantity, 2);
    }

    #[test]
    fn remove_stops_at_zero_and_keeps_entry() {
        let mut cart = Cart::from_items(vec![CartItem::new(pid(4), 1, "S")]);
        cart.remove_item(pid(4));
        cart.remove_item(pid(4));

        assert_eq!(cart.items(), &[CartItem::new(pid(4), 0, "S")]);
    }

    #[test]
    fn remove_missing_product_is_noop() {
        let original = Cart::from_items(vec![CartItem::new(pid(1), 2, "M")]);
        let mut cart = original.clone();

        assert!(cart.remove_item(pid(99)).is_none());
        assert_eq!(cart, original);
    }

    #[test]
    fn from_items_folds_duplicates() {
        let cart = Cart::from_items(vec![
            CartItem::new(pid(1), 2, "M"),
            CartItem::new(pid(2), 1, "S"),
            CartItem::new(pid(1), 1, "L"),
        ]);

        assert_eq!(
            cart.items(),
            &[CartItem::new(pid(1), 3, "L"), CartItem::new(pid(2), 1, "S")]
        );
    }

    #[test]
    fn serializes_as_camel_case_array() {
        let mut cart = Cart::new();
        cart.add_item(pid(7), "M");
        let json = serde_json::to_value(&cart).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{ "productId": 7, "quantity": 1, "size": "M" }])
        );
    }

    #[test]
    fn missing_size_deserializes_to_sentinel() {
        let item: CartItem = serde_json::from_str(r#"{"productId":5,"quantity":0}"#).unwrap();
        assert_eq!(item.size, DEFAULT_SIZE);
    }
}
