//! Stock ledger service
//!
//! Every stock figure is a SUM over `mouvements_stock`. Rows are only ever
//! inserted, except by the weekly grid replace which swaps out one
//! (product, nature, week) scope inside a single transaction.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    start_of_day, IsoWeek, Movement, MovementKind, MovementNature, MovementType, NewMovement,
    ProductStock, WeekScope,
};
use crate::services::audit;

/// Stock ledger service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Input for recording a movement
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementInput {
    pub produit_id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: String,
    pub quantite: i64,
    pub nature: Option<String>,
    pub commentaire: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub inventaire_id: Option<Uuid>,
}

/// Filters for the movement history
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementFilter {
    pub produit_id: Option<Uuid>,
    pub nature: Option<String>,
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub du: Option<NaiveDate>,
    pub au: Option<NaiveDate>,
}

/// Quantities of one product in the weekly grid, Monday first
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGridLine {
    pub produit_id: Uuid,
    #[serde(default)]
    pub nom: String,
    pub quantites: [i64; 7],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekGrid {
    pub semaine: IsoWeek,
    pub nature: MovementNature,
    pub jours: [NaiveDate; 7],
    pub lignes: Vec<WeekGridLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekReplaceResult {
    pub semaine: IsoWeek,
    pub mouvements_supprimes: u64,
    pub mouvements_crees: usize,
}

/// Row for movement queries
#[derive(Debug, FromRow)]
pub(crate) struct MovementRow {
    id: Uuid,
    produit_id: Uuid,
    magasin_id: Uuid,
    movement_type: String,
    nature: String,
    quantite: i64,
    commentaire: Option<String>,
    date: DateTime<Utc>,
    inventaire_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for Movement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(Movement {
            id: row.id,
            produit_id: row.produit_id,
            magasin_id: row.magasin_id,
            movement_type: row.movement_type.parse()?,
            nature: row.nature.parse()?,
            quantite: row.quantite,
            commentaire: row.commentaire,
            date: row.date,
            inventaire_id: row.inventaire_id,
            created_at: row.created_at,
        })
    }
}

pub(crate) const MOVEMENT_COLUMNS: &str = "id, produit_id, magasin_id, type AS movement_type, \
     nature, quantite, commentaire, date, inventaire_id, created_at";

#[derive(Debug, FromRow)]
struct StockRow {
    id: Uuid,
    nom: String,
    reference: Option<String>,
    unites_par_carton: Option<i32>,
    stock: i64,
}

#[derive(Debug, FromRow)]
struct DailyRow {
    produit_id: Uuid,
    nom: String,
    jour: NaiveDate,
    quantite: i64,
}

/// Appends one movement to the ledger
pub(crate) async fn insert_movement(
    conn: &mut PgConnection,
    magasin_id: Uuid,
    movement: &NewMovement,
) -> AppResult<Movement> {
    let row = sqlx::query_as::<_, MovementRow>(&format!(
        r#"
        INSERT INTO mouvements_stock (produit_id, magasin_id, type, nature, quantite, commentaire, date, inventaire_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {}
        "#,
        MOVEMENT_COLUMNS
    ))
    .bind(movement.produit_id)
    .bind(magasin_id)
    .bind(movement.kind.movement_type.as_str())
    .bind(movement.kind.nature.as_str())
    .bind(movement.quantite)
    .bind(&movement.commentaire)
    .bind(movement.date)
    .bind(movement.inventaire_id)
    .fetch_one(conn)
    .await?;

    row.try_into()
}

/// Ledger sum of each requested product; products without movements get 0
pub(crate) async fn stock_by_product(
    conn: &mut PgConnection,
    produit_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, i64>> {
    let rows = sqlx::query_as::<_, (Uuid, i64)>(
        r#"
        SELECT p.id, COALESCE(SUM(m.quantite), 0)::BIGINT
        FROM produits p
        LEFT JOIN mouvements_stock m ON m.produit_id = p.id
        WHERE p.id = ANY($1)
        GROUP BY p.id
        "#,
    )
    .bind(produit_ids)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().collect())
}

/// Ids among `produit_ids` that are active products of the store
pub(crate) async fn active_products_in_store(
    conn: &mut PgConnection,
    magasin_id: Uuid,
    produit_ids: &[Uuid],
) -> AppResult<Vec<Uuid>> {
    let ids = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM produits WHERE id = ANY($1) AND magasin_id = $2 AND actif",
    )
    .bind(produit_ids)
    .bind(magasin_id)
    .fetch_all(conn)
    .await?;

    Ok(ids)
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a movement with the ledger sign policy applied
    pub async fn record_movement(
        &self,
        magasin_id: Uuid,
        input: RecordMovementInput,
    ) -> AppResult<Movement> {
        let kind = MovementKind::parse(&input.movement_type, input.nature.as_deref())?;
        let mut movement = NewMovement::new(
            input.produit_id,
            kind,
            input.quantite,
            input.date.unwrap_or_else(Utc::now),
        )?;
        if let Some(commentaire) = input.commentaire.filter(|c| !c.trim().is_empty()) {
            movement = movement.with_comment(commentaire);
        }
        if let Some(inventaire_id) = input.inventaire_id {
            movement = movement.with_inventaire(inventaire_id);
        }

        let mut conn = self.db.acquire().await?;

        let product_exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM produits WHERE id = $1 AND magasin_id = $2)",
        )
        .bind(input.produit_id)
        .bind(magasin_id)
        .fetch_one(&mut *conn)
        .await?;

        if !product_exists {
            return Err(AppError::NotFound("Produit".to_string()));
        }

        if let Some(inventaire_id) = movement.inventaire_id {
            let inventaire_exists = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM inventaires WHERE id = $1 AND magasin_id = $2)",
            )
            .bind(inventaire_id)
            .bind(magasin_id)
            .fetch_one(&mut *conn)
            .await?;

            if !inventaire_exists {
                return Err(AppError::NotFound("Inventaire".to_string()));
            }
        }

        let created = insert_movement(&mut conn, magasin_id, &movement).await?;

        tracing::info!(
            movement_id = %created.id,
            produit_id = %created.produit_id,
            quantite = created.quantite,
            "Recorded {} movement ({})",
            created.movement_type,
            created.nature
        );
        audit::record("mouvement.create", created.id, magasin_id);

        Ok(created)
    }

    /// Current stock of one product
    pub async fn current_stock(&self, scope: Option<Uuid>, produit_id: Uuid) -> AppResult<i64> {
        let stock = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT (SELECT COALESCE(SUM(m.quantite), 0)::BIGINT
                    FROM mouvements_stock m WHERE m.produit_id = p.id)
            FROM produits p
            WHERE p.id = $1 AND ($2::uuid IS NULL OR p.magasin_id = $2)
            "#,
        )
        .bind(produit_id)
        .bind(scope)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produit".to_string()))?;

        Ok(stock.unwrap_or(0))
    }

    /// Stock of every active product, optionally leaving out some natures
    pub async fn list_stock(
        &self,
        scope: Option<Uuid>,
        excluded: &[MovementNature],
    ) -> AppResult<Vec<ProductStock>> {
        let excluded: Vec<&str> = excluded.iter().map(MovementNature::as_str).collect();

        let rows = sqlx::query_as::<_, StockRow>(
            r#"
            SELECT p.id, p.nom, p.reference, p.unites_par_carton,
                   COALESCE(SUM(m.quantite) FILTER (WHERE NOT (m.nature = ANY($2))), 0)::BIGINT AS stock
            FROM produits p
            LEFT JOIN mouvements_stock m ON m.produit_id = p.id
            WHERE p.actif AND ($1::uuid IS NULL OR p.magasin_id = $1)
            GROUP BY p.id, p.nom, p.reference, p.unites_par_carton
            ORDER BY p.nom
            "#,
        )
        .bind(scope)
        .bind(&excluded)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProductStock {
                produit_id: row.id,
                nom: row.nom,
                reference: row.reference,
                unites_par_carton: row.unites_par_carton,
                stock: row.stock,
            })
            .collect())
    }

    /// Movement history, newest first
    pub async fn list_movements(
        &self,
        scope: Option<Uuid>,
        filter: MovementFilter,
    ) -> AppResult<Vec<Movement>> {
        let nature = filter
            .nature
            .as_deref()
            .map(str::parse::<MovementNature>)
            .transpose()?;
        let movement_type = filter
            .movement_type
            .as_deref()
            .map(str::parse::<MovementType>)
            .transpose()?;

        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {}
            FROM mouvements_stock
            WHERE ($1::uuid IS NULL OR magasin_id = $1)
              AND ($2::uuid IS NULL OR produit_id = $2)
              AND ($3::text IS NULL OR nature = $3)
              AND ($4::text IS NULL OR type = $4)
              AND ($5::timestamptz IS NULL OR date >= $5)
              AND ($6::timestamptz IS NULL OR date < $6)
            ORDER BY date DESC, created_at DESC
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(scope)
        .bind(filter.produit_id)
        .bind(nature.map(|n| n.as_str()))
        .bind(movement_type.map(|t| t.as_str()))
        .bind(filter.du.map(start_of_day))
        .bind(filter.au.map(|d| start_of_day(d + Duration::days(1))))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Movement::try_from).collect()
    }

    /// Per-day quantities of one nature over an ISO week, for every product
    /// of the store
    pub async fn week_grid(
        &self,
        magasin_id: Uuid,
        week: IsoWeek,
        nature: MovementNature,
    ) -> AppResult<WeekGrid> {
        let (from, to) = week.range().utc_bounds();
        let days = week.days();

        let rows = sqlx::query_as::<_, DailyRow>(
            r#"
            SELECT p.id AS produit_id, p.nom,
                   (m.date AT TIME ZONE 'UTC')::date AS jour,
                   (-SUM(m.quantite))::BIGINT AS quantite
            FROM mouvements_stock m
            JOIN produits p ON p.id = m.produit_id
            WHERE m.magasin_id = $1 AND m.nature = $2 AND m.date >= $3 AND m.date < $4
            GROUP BY p.id, p.nom, jour
            ORDER BY p.nom
            "#,
        )
        .bind(magasin_id)
        .bind(nature.as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        let mut lignes: Vec<WeekGridLine> = Vec::new();
        for row in rows {
            let Some(index) = days.iter().position(|d| *d == row.jour) else {
                continue;
            };
            match lignes.iter_mut().find(|l| l.produit_id == row.produit_id) {
                Some(line) => line.quantites[index] += row.quantite,
                None => {
                    let mut quantites = [0i64; 7];
                    quantites[index] = row.quantite;
                    lignes.push(WeekGridLine {
                        produit_id: row.produit_id,
                        nom: row.nom,
                        quantites,
                    });
                }
            }
        }

        Ok(WeekGrid {
            semaine: week,
            nature,
            jours: days,
            lignes,
        })
    }

    /// Replaces the week's movements of each listed product and nature
    pub async fn replace_week(
        &self,
        magasin_id: Uuid,
        week: IsoWeek,
        nature: MovementNature,
        lignes: Vec<WeekGridLine>,
    ) -> AppResult<WeekReplaceResult> {
        let (from, to) = week.range().utc_bounds();

        // Plan everything before touching the ledger
        let mut plans = Vec::with_capacity(lignes.len());
        for ligne in &lignes {
            let scope = WeekScope {
                produit_id: ligne.produit_id,
                nature,
                week,
            };
            plans.push((scope, scope.replacement(&ligne.quantites)?));
        }

        let mut tx = self.db.begin().await?;

        let ids: Vec<Uuid> = lignes.iter().map(|l| l.produit_id).collect();
        let known = active_products_in_store(&mut tx, magasin_id, &ids).await?;
        if let Some(unknown) = ids.iter().find(|id| !known.contains(id)) {
            return Err(AppError::NotFound(format!("Produit {}", unknown)));
        }

        let mut deleted = 0;
        let mut created = 0;
        for (scope, movements) in plans {
            let result = sqlx::query(
                r#"
                DELETE FROM mouvements_stock
                WHERE produit_id = $1 AND magasin_id = $2 AND nature = $3
                  AND date >= $4 AND date < $5
                "#,
            )
            .bind(scope.produit_id)
            .bind(magasin_id)
            .bind(scope.nature.as_str())
            .bind(from)
            .bind(to)
            .execute(&mut *tx)
            .await?;
            deleted += result.rows_affected();

            for movement in &movements {
                insert_movement(&mut tx, magasin_id, movement).await?;
            }
            created += movements.len();
        }

        tx.commit().await?;

        tracing::info!(
            magasin_id = %magasin_id,
            semaine = %week,
            nature = %nature,
            deleted,
            created,
            "Replaced weekly movements"
        );
        audit::record("mouvements.semaine", magasin_id, magasin_id);

        Ok(WeekReplaceResult {
            semaine: week,
            mouvements_supprimes: deleted,
            mouvements_crees: created,
        })
    }
}
