//! Inventory count service
//!
//! Applying, correcting and cancelling a count each run in one transaction
//! and only ever append AJUSTEMENT movements to the ledger.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    cancellation_movements, correct_line, plan_inventaire, CountedLine, Inventaire,
    InventaireLigne, InventaireStatus, Movement, ReconciledLine,
};
use crate::services::audit;
use crate::services::stock::{
    active_products_in_store, insert_movement, stock_by_product, MovementRow, MOVEMENT_COLUMNS,
};

/// Inventory count service
#[derive(Clone)]
pub struct InventaireService {
    db: PgPool,
}

/// Input for applying a count
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyInventaireInput {
    pub lignes: Vec<CountedLine>,
    pub date: Option<DateTime<Utc>>,
}

/// Input for correcting one line of a count
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditLigneInput {
    pub produit_id: Uuid,
    pub quantite_reelle: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventaireResult {
    pub inventaire_id: Uuid,
    pub mouvements_crees: usize,
    pub lignes: Vec<ReconciledLine>,
    /// Submitted lines not kept (unknown product, negative count or repeat)
    pub lignes_ignorees: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    #[serde(flatten)]
    pub inventaire: InventaireResult,
    pub produits_non_trouves: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCorrectionResult {
    pub ligne: InventaireLigne,
    pub delta: i64,
    pub mouvement: Option<Movement>,
}

/// Database row for an inventory count
#[derive(Debug, FromRow)]
struct InventaireRow {
    id: Uuid,
    magasin_id: Uuid,
    user_id: Option<Uuid>,
    date: DateTime<Utc>,
    statut: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<InventaireRow> for Inventaire {
    type Error = AppError;

    fn try_from(row: InventaireRow) -> Result<Self, Self::Error> {
        Ok(Inventaire {
            id: row.id,
            magasin_id: row.magasin_id,
            user_id: row.user_id,
            date: row.date,
            statut: row.statut.parse()?,
            created_at: row.created_at,
            lignes: Vec::new(),
        })
    }
}

#[derive(Debug, FromRow)]
struct LigneRow {
    id: Uuid,
    inventaire_id: Uuid,
    produit_id: Uuid,
    quantite_reelle: i64,
    stock_avant: i64,
    ecart: i64,
}

impl From<LigneRow> for InventaireLigne {
    fn from(row: LigneRow) -> Self {
        InventaireLigne {
            id: row.id,
            inventaire_id: row.inventaire_id,
            produit_id: row.produit_id,
            quantite_reelle: row.quantite_reelle,
            stock_avant: row.stock_avant,
            ecart: row.ecart,
        }
    }
}

/// Reads a product-name / quantity CSV export. The delimiter may be `,` or
/// `;`; the name column is `produit` or `nom`, the quantity column
/// `quantite` or `quantiteReelle`.
pub fn parse_count_csv(body: &str) -> AppResult<Vec<(String, i64)>> {
    let header_line = body.lines().next().unwrap_or_default();
    let delimiter = if header_line.contains(';') { b';' } else { b',' };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AppError::ValidationError(format!("Invalid CSV header: {}", e)))?
        .clone();
    let column = |names: &[&str]| {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };

    let name_col = column(&["produit", "nom"]).ok_or_else(|| {
        AppError::validation(
            "produit",
            "CSV must have a produit column",
            "Le CSV doit contenir une colonne produit",
        )
    })?;
    let qty_col = column(&["quantite", "quantiteReelle", "quantite_reelle"]).ok_or_else(|| {
        AppError::validation(
            "quantite",
            "CSV must have a quantite column",
            "Le CSV doit contenir une colonne quantite",
        )
    })?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| AppError::ValidationError(format!("Invalid CSV row {}: {}", index + 2, e)))?;
        let name = record.get(name_col).unwrap_or_default();
        if name.is_empty() {
            continue;
        }
        let quantity = record
            .get(qty_col)
            .unwrap_or_default()
            .parse::<i64>()
            .map_err(|_| AppError::Validation {
                field: "quantite".to_string(),
                message: format!("Invalid quantity on row {}", index + 2),
                message_fr: format!("Quantité invalide ligne {}", index + 2),
            })?;
        rows.push((name.to_string(), quantity));
    }

    Ok(rows)
}

async fn fetch_inventaire(
    conn: &mut PgConnection,
    scope: Option<Uuid>,
    id: Uuid,
) -> AppResult<Inventaire> {
    sqlx::query_as::<_, InventaireRow>(
        r#"
        SELECT id, magasin_id, user_id, date, statut, created_at
        FROM inventaires
        WHERE id = $1 AND ($2::uuid IS NULL OR magasin_id = $2)
        "#,
    )
    .bind(id)
    .bind(scope)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Inventaire".to_string()))?
    .try_into()
}

async fn fetch_lignes(conn: &mut PgConnection, inventaire_id: Uuid) -> AppResult<Vec<InventaireLigne>> {
    let rows = sqlx::query_as::<_, LigneRow>(
        r#"
        SELECT id, inventaire_id, produit_id, quantite_reelle, stock_avant, ecart
        FROM inventaire_lignes
        WHERE inventaire_id = $1
        "#,
    )
    .bind(inventaire_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

impl InventaireService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Apply a count: snapshot the ledger, record lines and one adjustment
    /// per non-zero écart
    pub async fn apply(
        &self,
        magasin_id: Uuid,
        user_id: Uuid,
        input: ApplyInventaireInput,
    ) -> AppResult<InventaireResult> {
        let date = input.date.unwrap_or_else(Utc::now);
        let ids: Vec<Uuid> = input.lignes.iter().map(|l| l.produit_id).collect();

        let mut tx = self.db.begin().await?;

        let known = active_products_in_store(&mut tx, magasin_id, &ids).await?;
        let stock = stock_by_product(&mut tx, &known).await?;

        let inventaire_id = Uuid::new_v4();
        let plan = plan_inventaire(inventaire_id, &input.lignes, date, |p| {
            stock.get(&p).copied()
        })?;

        let ignored = input.lignes.len().saturating_sub(plan.lignes.len());
        if ignored > 0 {
            tracing::warn!(
                inventaire_id = %inventaire_id,
                ignored,
                "Dropped inventory lines for unknown or invalid products"
            );
        }

        sqlx::query(
            r#"
            INSERT INTO inventaires (id, magasin_id, user_id, date, statut)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(inventaire_id)
        .bind(magasin_id)
        .bind(user_id)
        .bind(date)
        .bind(InventaireStatus::Valide.as_str())
        .execute(&mut *tx)
        .await?;

        for ligne in &plan.lignes {
            sqlx::query(
                r#"
                INSERT INTO inventaire_lignes (inventaire_id, produit_id, quantite_reelle, stock_avant, ecart)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(inventaire_id)
            .bind(ligne.produit_id)
            .bind(ligne.quantite_reelle)
            .bind(ligne.stock_avant)
            .bind(ligne.ecart)
            .execute(&mut *tx)
            .await?;
        }

        for movement in &plan.movements {
            insert_movement(&mut tx, magasin_id, movement).await?;
        }

        tx.commit().await?;

        tracing::info!(
            inventaire_id = %inventaire_id,
            lignes = plan.lignes.len(),
            mouvements = plan.movements.len(),
            "Applied inventory count"
        );
        audit::record("inventaire.create", inventaire_id, magasin_id);

        Ok(InventaireResult {
            inventaire_id,
            mouvements_crees: plan.movements.len(),
            lignes: plan.lignes,
            lignes_ignorees: ignored,
        })
    }

    /// Apply a count submitted as CSV with product names instead of ids
    pub async fn import(
        &self,
        magasin_id: Uuid,
        user_id: Uuid,
        body: &str,
        date: Option<DateTime<Utc>>,
    ) -> AppResult<ImportResult> {
        let rows = parse_count_csv(body)?;

        let products = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, nom FROM produits WHERE magasin_id = $1 AND actif",
        )
        .bind(magasin_id)
        .fetch_all(&self.db)
        .await?;
        let by_name: HashMap<String, Uuid> = products
            .into_iter()
            .map(|(id, nom)| (nom.trim().to_lowercase(), id))
            .collect();

        let mut lignes = Vec::new();
        let mut produits_non_trouves = Vec::new();
        for (name, quantite_reelle) in rows {
            match by_name.get(&name.to_lowercase()) {
                Some(produit_id) => lignes.push(CountedLine {
                    produit_id: *produit_id,
                    quantite_reelle,
                }),
                None => produits_non_trouves.push(name),
            }
        }

        if !produits_non_trouves.is_empty() {
            tracing::warn!(
                count = produits_non_trouves.len(),
                "Inventory import contains unknown products"
            );
        }

        let inventaire = self
            .apply(magasin_id, user_id, ApplyInventaireInput { lignes, date })
            .await?;

        Ok(ImportResult {
            inventaire,
            produits_non_trouves,
        })
    }

    /// Cancel a count by appending the inverse of each of its movements
    pub async fn cancel(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Inventaire> {
        let mut tx = self.db.begin().await?;

        let mut inventaire = fetch_inventaire(&mut tx, scope, id).await?;
        inventaire.statut.ensure_editable()?;

        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            "SELECT {} FROM mouvements_stock WHERE inventaire_id = $1 ORDER BY created_at",
            MOVEMENT_COLUMNS
        ))
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;
        let linked = rows
            .into_iter()
            .map(Movement::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        let inverses = cancellation_movements(id, &linked, Utc::now())?;
        for movement in &inverses {
            insert_movement(&mut tx, inventaire.magasin_id, movement).await?;
        }

        sqlx::query("UPDATE inventaires SET statut = $1 WHERE id = $2")
            .bind(InventaireStatus::Annule.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        inventaire.lignes = fetch_lignes(&mut tx, id).await?;
        tx.commit().await?;

        inventaire.statut = InventaireStatus::Annule;

        tracing::info!(
            inventaire_id = %id,
            inverses = inverses.len(),
            "Cancelled inventory count"
        );
        audit::record("inventaire.cancel", id, inventaire.magasin_id);

        Ok(inventaire)
    }

    /// Correct the counted quantity of one line, appending only the delta
    pub async fn edit_line(
        &self,
        scope: Option<Uuid>,
        id: Uuid,
        input: EditLigneInput,
    ) -> AppResult<LineCorrectionResult> {
        let mut tx = self.db.begin().await?;

        let inventaire = fetch_inventaire(&mut tx, scope, id).await?;
        inventaire.statut.ensure_editable()?;

        let ligne: InventaireLigne = sqlx::query_as::<_, LigneRow>(
            r#"
            SELECT id, inventaire_id, produit_id, quantite_reelle, stock_avant, ecart
            FROM inventaire_lignes
            WHERE inventaire_id = $1 AND produit_id = $2
            "#,
        )
        .bind(id)
        .bind(input.produit_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Ligne d'inventaire".to_string()))?
        .into();

        let correction = correct_line(&ligne, input.quantite_reelle)?;

        let updated: InventaireLigne = sqlx::query_as::<_, LigneRow>(
            r#"
            UPDATE inventaire_lignes
            SET quantite_reelle = $1, ecart = $2
            WHERE id = $3
            RETURNING id, inventaire_id, produit_id, quantite_reelle, stock_avant, ecart
            "#,
        )
        .bind(correction.quantite_reelle)
        .bind(correction.ecart)
        .bind(ligne.id)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let mouvement = match correction.movement(id, ligne.produit_id, Utc::now())? {
            Some(movement) => Some(insert_movement(&mut tx, inventaire.magasin_id, &movement).await?),
            None => None,
        };

        tx.commit().await?;

        tracing::info!(
            inventaire_id = %id,
            produit_id = %ligne.produit_id,
            delta = correction.delta,
            "Corrected inventory line"
        );
        audit::record("inventaire.ligne", ligne.id, inventaire.magasin_id);

        Ok(LineCorrectionResult {
            ligne: updated,
            delta: correction.delta,
            mouvement,
        })
    }

    /// List counts, newest first
    pub async fn list(&self, scope: Option<Uuid>) -> AppResult<Vec<Inventaire>> {
        let rows = sqlx::query_as::<_, InventaireRow>(
            r#"
            SELECT id, magasin_id, user_id, date, statut, created_at
            FROM inventaires
            WHERE ($1::uuid IS NULL OR magasin_id = $1)
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(scope)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Inventaire::try_from).collect()
    }

    /// Get a count with its lines
    pub async fn get(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Inventaire> {
        let mut conn = self.db.acquire().await?;
        let mut inventaire = fetch_inventaire(&mut conn, scope, id).await?;
        inventaire.lignes = fetch_lignes(&mut conn, id).await?;
        Ok(inventaire)
    }
}
