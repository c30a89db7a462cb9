//! Route definitions for the bakery operations platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stock ledger and counts
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - proposals and purchase orders
        .nest("/commandes", commande_routes(state.clone()))
        // Protected routes - product catalog
        .nest("/produits", produit_routes(state))
}

/// Stock ledger routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/mouvements",
            get(handlers::list_movements).post(handlers::record_movement),
        )
        .route("/produits", get(handlers::list_stock))
        .route("/produits/:produit_id", get(handlers::get_product_stock))
        .route(
            "/mouvements-semaine",
            get(handlers::get_week_grid).post(handlers::replace_week_grid),
        )
        .route("/inventaire", post(handlers::apply_inventaire))
        .route("/inventaire/import", post(handlers::import_inventaire))
        .route("/inventaires", get(handlers::list_inventaires))
        .route("/inventaire/:inventaire_id", get(handlers::get_inventaire))
        .route(
            "/inventaire/:inventaire_id/annuler",
            post(handlers::cancel_inventaire),
        )
        .route(
            "/inventaire/:inventaire_id/modifier-ligne",
            post(handlers::edit_inventaire_line),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order routes (protected)
fn commande_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_orders))
        .route("/proposition", get(handlers::get_proposal))
        .route("/valider", post(handlers::validate_order))
        .route("/:commande_id", get(handlers::get_order))
        .route("/:commande_id/recevoir", post(handlers::receive_order))
        .route("/:commande_id/annuler", post(handlers::cancel_order))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Product catalog routes (protected)
fn produit_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_produits).post(handlers::create_produit),
        )
        .route(
            "/:produit_id",
            get(handlers::get_produit)
                .put(handlers::update_produit)
                .delete(handlers::deactivate_produit),
        )
        .route("/:produit_id/prix", get(handlers::get_price_history))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
