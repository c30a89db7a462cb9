//! HTTP handlers for the product catalog

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::StoreQuery;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{PrixHistorique, Produit};
use crate::services::produit::{
    CreateProduitInput, ProduitFilter, ProduitService, UpdateProduitInput,
};
use crate::AppState;

/// Create a product
pub async fn create_produit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Json(input): Json<CreateProduitInput>,
) -> AppResult<Json<Produit>> {
    check_permission(&current_user.0, "produits", "write")?;
    let magasin_id = current_user.0.require_store(store.magasin_id)?;

    let service = ProduitService::new(state.db);
    let produit = service.create(magasin_id, input).await?;
    Ok(Json(produit))
}

/// List the catalog
pub async fn list_produits(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Query(filter): Query<ProduitFilter>,
) -> AppResult<Json<Vec<Produit>>> {
    check_permission(&current_user.0, "produits", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = ProduitService::new(state.db);
    let produits = service.list(scope, filter).await?;
    Ok(Json(produits))
}

pub async fn get_produit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(produit_id): Path<Uuid>,
) -> AppResult<Json<Produit>> {
    check_permission(&current_user.0, "produits", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = ProduitService::new(state.db);
    let produit = service.get(scope, produit_id).await?;
    Ok(Json(produit))
}

pub async fn update_produit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(produit_id): Path<Uuid>,
    Json(input): Json<UpdateProduitInput>,
) -> AppResult<Json<Produit>> {
    check_permission(&current_user.0, "produits", "write")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = ProduitService::new(state.db);
    let produit = service.update(scope, produit_id, input).await?;
    Ok(Json(produit))
}

/// Deactivate a product; its movements stay in the ledger
pub async fn deactivate_produit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(produit_id): Path<Uuid>,
) -> AppResult<Json<Produit>> {
    check_permission(&current_user.0, "produits", "write")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = ProduitService::new(state.db);
    let produit = service.deactivate(scope, produit_id).await?;
    Ok(Json(produit))
}

/// Price history of a product
pub async fn get_price_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(produit_id): Path<Uuid>,
) -> AppResult<Json<Vec<PrixHistorique>>> {
    check_permission(&current_user.0, "produits", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = ProduitService::new(state.db);
    let history = service.price_history(scope, produit_id).await?;
    Ok(Json(history))
}
