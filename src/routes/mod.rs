use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod payments;
pub mod profile;
pub mod returns;
pub mod reviews;
pub mod wishlist;

// Build the API router without binding state; it is provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/profile", profile::router())
        .nest("/products", catalog::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/returns", returns::router())
        .nest("/reviews", reviews::router())
        .nest("/delivery", delivery::router())
        .nest("/admin", admin::router())
}
