//! HTTP handlers for the stock ledger endpoints

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::handlers::StoreQuery;
use crate::middleware::{check_permission, CurrentUser};
use crate::models::{IsoWeek, Movement, MovementNature, ProductStock};
use crate::services::stock::{
    MovementFilter, RecordMovementInput, StockService, WeekGrid, WeekGridLine, WeekReplaceResult,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockListQuery {
    pub magasin_id: Option<Uuid>,
    /// Comma-separated natures left out of the sum, e.g. `PERTE,AUTRE`
    pub exclure_natures: Option<String>,
    /// `csv` for a spreadsheet export
    pub format: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekQuery {
    pub magasin_id: Option<Uuid>,
    /// ISO week `YYYY-Www`, the current week when absent
    pub sem: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceWeekInput {
    pub lignes: Vec<WeekGridLine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductStockResponse {
    pub produit_id: Uuid,
    pub stock: i64,
}

fn parse_natures(raw: Option<&str>) -> AppResult<Vec<MovementNature>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<MovementNature>().map_err(AppError::from))
        .collect()
}

fn parse_week(sem: Option<&str>) -> AppResult<IsoWeek> {
    match sem {
        Some(sem) => Ok(sem.parse()?),
        None => Ok(IsoWeek::containing(Utc::now().date_naive())),
    }
}

fn stock_csv(rows: &[ProductStock]) -> AppResult<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV export failed: {}", e)))
}

/// Record a stock movement
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Json(input): Json<RecordMovementInput>,
) -> AppResult<Json<Movement>> {
    check_permission(&current_user.0, "stock", "write")?;
    let magasin_id = current_user.0.require_store(store.magasin_id)?;

    let service = StockService::new(state.db);
    let movement = service.record_movement(magasin_id, input).await?;
    Ok(Json(movement))
}

/// List movements, newest first
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Query(filter): Query<MovementFilter>,
) -> AppResult<Json<Vec<Movement>>> {
    check_permission(&current_user.0, "stock", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = StockService::new(state.db);
    let movements = service.list_movements(scope, filter).await?;
    Ok(Json(movements))
}

/// Current stock of every active product, as JSON or CSV
pub async fn list_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<StockListQuery>,
) -> AppResult<Response> {
    check_permission(&current_user.0, "stock", "read")?;
    let scope = current_user.0.resolve_store(query.magasin_id)?;
    let excluded = parse_natures(query.exclure_natures.as_deref())?;

    let service = StockService::new(state.db);
    let rows = service.list_stock(scope, &excluded).await?;

    if query.format.as_deref() == Some("csv") {
        let body = stock_csv(&rows)?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"stock.csv\""),
            ],
            body,
        )
            .into_response());
    }

    Ok(Json(rows).into_response())
}

/// Current stock of one product
pub async fn get_product_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(store): Query<StoreQuery>,
    Path(produit_id): Path<Uuid>,
) -> AppResult<Json<ProductStockResponse>> {
    check_permission(&current_user.0, "stock", "read")?;
    let scope = current_user.0.resolve_store(store.magasin_id)?;

    let service = StockService::new(state.db);
    let stock = service.current_stock(scope, produit_id).await?;
    Ok(Json(ProductStockResponse { produit_id, stock }))
}

/// Weekly sales or losses grid
pub async fn get_week_grid(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<WeekQuery>,
) -> AppResult<Json<WeekGrid>> {
    check_permission(&current_user.0, "stock", "read")?;
    let magasin_id = current_user.0.require_store(query.magasin_id)?;
    let week = parse_week(query.sem.as_deref())?;
    let nature = MovementNature::from_week_grid(&query.kind)?;

    let service = StockService::new(state.db);
    let grid = service.week_grid(magasin_id, week, nature).await?;
    Ok(Json(grid))
}

/// Replace a week of sales or losses for the submitted products
pub async fn replace_week_grid(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<WeekQuery>,
    Json(input): Json<ReplaceWeekInput>,
) -> AppResult<Json<WeekReplaceResult>> {
    check_permission(&current_user.0, "stock", "write")?;
    let magasin_id = current_user.0.require_store(query.magasin_id)?;
    let week = parse_week(query.sem.as_deref())?;
    let nature = MovementNature::from_week_grid(&query.kind)?;

    let service = StockService::new(state.db);
    let result = service
        .replace_week(magasin_id, week, nature, input.lignes)
        .await?;
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_natures() {
        let natures = parse_natures(Some("PERTE, vente")).unwrap();
        assert_eq!(natures, vec![MovementNature::Perte, MovementNature::Vente]);
        assert!(parse_natures(None).unwrap().is_empty());
        assert!(parse_natures(Some("VOL")).is_err());
    }

    #[test]
    fn test_parse_week() {
        let week = parse_week(Some("2025-W02")).unwrap();
        assert_eq!(week.to_string(), "2025-W02");
        assert!(parse_week(Some("2025-02")).is_err());
    }

    #[test]
    fn test_stock_csv_has_header_row() {
        let rows = vec![ProductStock {
            produit_id: Uuid::nil(),
            nom: "Baguette".to_string(),
            reference: Some("PAR01-BAGUETTE".to_string()),
            unites_par_carton: Some(30),
            stock: 42,
        }];
        let csv = stock_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("produitId,nom,reference,unitesParCarton,stock")
        );
        assert!(lines.next().unwrap().ends_with(",Baguette,PAR01-BAGUETTE,30,42"));
    }
}
