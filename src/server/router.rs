//! Route table of the shop API

use super::handlers::{
    AppState, create_shop, delete_shop, get_shop, health_check, list_shops, search_shops,
    update_shop,
};
use axum::{Router, routing::get};

/// Build shop routes
///
/// - GET /shops - Paginated listing (sort or filters)
/// - POST /shops - Create a shop
/// - PUT /shops - Overwrite an existing shop (id in the body)
/// - GET /shops/search - Search by name, vacation flag and creation dates
/// - GET /shops/{id} - Get one shop
/// - DELETE /shops/{id} - Delete a shop, detaching its products
pub fn build_shop_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/shops",
            get(list_shops).post(create_shop).put(update_shop),
        )
        .route("/shops/search", get(search_shops))
        .route("/shops/{id}", get(get_shop).delete(delete_shop))
        .with_state(state)
}

/// Build health check routes
pub fn health_routes() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
}
