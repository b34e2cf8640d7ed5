//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Stores;
use crate::services::auth::{AuthService, Passwords, TokenIssuer};
use crate::services::cart::CartService;
use crate::services::catalog::CatalogService;
use crate::services::payments::{CheckoutService, PaymentError, PaymentGateway, StripeGateway};
use crate::services::uploads::ImageStore;

/// Error assembling the application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid password hashing parameters: {0}")]
    PasswordHashing(#[from] argon2::Error),
    #[error("payment client: {0}")]
    Payments(#[from] PaymentError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// services built from the configured stores.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    stores: Stores,
    tokens: TokenIssuer,
    auth: AuthService,
    catalog: CatalogService,
    carts: CartService,
    checkout: CheckoutService,
    images: ImageStore,
}

impl AppState {
    /// Build the state, using Stripe as the payment gateway when configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the password hashing parameters are out of range or
    /// the payment client cannot be built.
    pub fn new(config: StorefrontConfig, stores: Stores) -> Result<Self, StateError> {
        let gateway: Option<Arc<dyn PaymentGateway>> = match &config.stripe {
            Some(stripe) => Some(Arc::new(StripeGateway::new(stripe.clone())?)),
            None => None,
        };
        Self::with_gateway(config, stores, gateway)
    }

    /// Build the state with an explicit payment gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if the password hashing parameters are out of range.
    pub fn with_gateway(
        config: StorefrontConfig,
        stores: Stores,
        gateway: Option<Arc<dyn PaymentGateway>>,
    ) -> Result<Self, StateError> {
        let tokens = TokenIssuer::new(&config.token_secret, config.token_ttl);
        let passwords = Passwords::new(&config.password_hashing)?;

        let auth = AuthService::new(stores.users.clone(), passwords, tokens.clone());
        let catalog = CatalogService::new(stores.catalog.clone());
        let carts = CartService::new(stores.users.clone());
        let checkout = CheckoutService::new(gateway, stores.orders.clone(), config.checkout.clone());
        let images = ImageStore::new(config.upload_dir.clone(), &config.base_url);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                tokens,
                auth,
                catalog,
                carts,
                checkout,
                images,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Token verifier used by the identity gate.
    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.inner.tokens
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    #[must_use]
    pub fn images(&self) -> &ImageStore {
        &self.inner.images
    }
}
