//! HTTP handlers for stock counts (inventaires)

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::StoreQuery;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::Inventaire;
use crate::services::inventaire::{
    ApplyInventaireInput, EditLigneInput, ImportResult, InventaireResult, InventaireService,
    LineCorrectionResult,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportQuery {
    pub magasin_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
}

/// Apply a stock count
pub async fn apply_inventaire(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Json(input): Json<ApplyInventaireInput>,
) -> AppResult<Json<InventaireResult>> {
    check_permission(&current_user.0, "stock", "write")?;
    let magasin_id = current_user.0.require_store(store.magasin_id)?;

    let service = InventaireService::new(state.db);
    let result = service
        .apply(magasin_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(result))
}

/// Apply a stock count sent as a CSV body
pub async fn import_inventaire(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ImportQuery>,
    body: String,
) -> AppResult<Json<ImportResult>> {
    check_permission(&current_user.0, "stock", "write")?;
    let magasin_id = current_user.0.require_store(query.magasin_id)?;

    let service = InventaireService::new(state.db);
    let result = service
        .import(magasin_id, current_user.0.user_id, &body, query.date)
        .await?;
    Ok(Json(result))
}

/// Cancel a count by reversing its movements
pub async fn cancel_inventaire(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(inventaire_id): Path<Uuid>,
) -> AppResult<Json<Inventaire>> {
    check_permission(&current_user.0, "stock", "write")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = InventaireService::new(state.db);
    let inventaire = service.cancel(scope, inventaire_id).await?;
    Ok(Json(inventaire))
}

/// Correct the counted quantity of one line
pub async fn edit_inventaire_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(inventaire_id): Path<Uuid>,
    Json(input): Json<EditLigneInput>,
) -> AppResult<Json<LineCorrectionResult>> {
    check_permission(&current_user.0, "stock", "write")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = InventaireService::new(state.db);
    let result = service.edit_line(scope, inventaire_id, input).await?;
    Ok(Json(result))
}

/// List counts, newest first
pub async fn list_inventaires(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
) -> AppResult<Json<Vec<Inventaire>>> {
    check_permission(&current_user.0, "stock", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = InventaireService::new(state.db);
    let inventaires = service.list(scope).await?;
    Ok(Json(inventaires))
}

/// Get a count with its lines
pub async fn get_inventaire(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(inventaire_id): Path<Uuid>,
) -> AppResult<Json<Inventaire>> {
    check_permission(&current_user.0, "stock", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = InventaireService::new(state.db);
    let inventaire = service.get(scope, inventaire_id).await?;
    Ok(Json(inventaire))
}
