//! HTTP handlers for order proposals and purchase orders

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::handlers::StoreQuery;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{Commande, Proposal};
use crate::services::commande::{
    CommandeFilter, CommandeService, ReceiveOrderInput, ValidateOrderInput,
};
use crate::services::ProposalService;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalQuery {
    pub magasin_id: Option<Uuid>,
    /// Today when absent
    pub date_commande: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Compute the order proposal for a date
pub async fn get_proposal(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ProposalQuery>,
) -> AppResult<Json<Proposal>> {
    check_permission(&current_user.0, "commandes", "read")?;
    let magasin_id = current_user.0.require_store(query.magasin_id)?;
    let order_date = query
        .date_commande
        .unwrap_or_else(|| Utc::now().date_naive());

    let service = ProposalService::new(state.db);
    let proposal = service.compute(magasin_id, order_date).await?;
    Ok(Json(proposal))
}

/// Persist an edited proposal as an order
pub async fn validate_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Json(input): Json<ValidateOrderInput>,
) -> AppResult<Json<Commande>> {
    check_permission(&current_user.0, "commandes", "write")?;
    let magasin_id = current_user.0.require_store(store.magasin_id)?;

    let service = CommandeService::new(state.db);
    let commande = service.validate(magasin_id, input).await?;
    Ok(Json(commande))
}

/// Record the delivery of an order
pub async fn receive_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(commande_id): Path<Uuid>,
    Json(input): Json<ReceiveOrderInput>,
) -> AppResult<Json<Commande>> {
    check_permission(&current_user.0, "commandes", "write")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = CommandeService::new(state.db);
    let commande = service.receive(scope, commande_id, input).await?;
    Ok(Json(commande))
}

/// Cancel an order that was not received
pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(commande_id): Path<Uuid>,
) -> AppResult<Json<MessageResponse>> {
    check_permission(&current_user.0, "commandes", "write")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = CommandeService::new(state.db);
    service.cancel(scope, commande_id).await?;
    Ok(Json(MessageResponse {
        message: "Commande annulée".to_string(),
    }))
}

/// List orders, optionally by status
pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Query(filter): Query<CommandeFilter>,
) -> AppResult<Json<Vec<Commande>>> {
    check_permission(&current_user.0, "commandes", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = CommandeService::new(state.db);
    let commandes = service.list(scope, filter).await?;
    Ok(Json(commandes))
}

/// Get an order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(commande_id): Path<Uuid>,
) -> AppResult<Json<Commande>> {
    check_permission(&current_user.0, "commandes", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = CommandeService::new(state.db);
    let commande = service.get(scope, commande_id).await?;
    Ok(Json(commande))
}
