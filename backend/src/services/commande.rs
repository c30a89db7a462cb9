//! Purchase order service: validation, reception and cancellation

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    delivery_schedule, plan_reception, validated_lines, Commande, CommandeLigne, CommandeStatus,
    OrderLineRequest, PackagingSnapshot, ReceptionLine,
};
use crate::services::audit;
use crate::services::stock::insert_movement;

#[derive(Clone)]
pub struct CommandeService {
    db: PgPool,
}

/// Input for turning an edited proposal into an order
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateOrderInput {
    pub date_commande: Option<NaiveDate>,
    /// Defaults to the first delivery after the order date
    pub date_livraison_prevue: Option<NaiveDate>,
    pub lignes: Vec<OrderLineRequest>,
    pub commentaire: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveOrderInput {
    pub lignes: Vec<ReceptionLine>,
    pub date_reception: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommandeFilter {
    pub statut: Option<String>,
}

#[derive(Debug, FromRow)]
struct CommandeRow {
    id: Uuid,
    magasin_id: Uuid,
    statut: String,
    date_commande: NaiveDate,
    date_livraison_prevue: NaiveDate,
    commentaire: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CommandeRow> for Commande {
    type Error = AppError;

    fn try_from(row: CommandeRow) -> Result<Self, Self::Error> {
        Ok(Commande {
            id: row.id,
            magasin_id: row.magasin_id,
            statut: row.statut.parse()?,
            date_commande: row.date_commande,
            date_livraison_prevue: row.date_livraison_prevue,
            commentaire: row.commentaire,
            created_at: row.created_at,
            lignes: Vec::new(),
        })
    }
}

#[derive(Debug, FromRow)]
struct LigneRow {
    id: Uuid,
    commande_id: Uuid,
    produit_id: Uuid,
    cartons: i32,
    unites: i64,
    unites_recues: i64,
    unites_par_carton: i32,
    prix_achat: Option<Decimal>,
}

impl From<LigneRow> for CommandeLigne {
    fn from(row: LigneRow) -> Self {
        CommandeLigne {
            id: row.id,
            commande_id: row.commande_id,
            produit_id: row.produit_id,
            cartons: row.cartons,
            unites: row.unites,
            unites_recues: row.unites_recues,
            unites_par_carton: row.unites_par_carton,
            prix_achat: row.prix_achat,
        }
    }
}

const COMMANDE_COLUMNS: &str =
    "id, magasin_id, statut, date_commande, date_livraison_prevue, commentaire, created_at";

async fn fetch_commande(
    conn: &mut PgConnection,
    scope: Option<Uuid>,
    id: Uuid,
) -> AppResult<Commande> {
    let mut commande: Commande = sqlx::query_as::<_, CommandeRow>(&format!(
        "SELECT {} FROM commandes WHERE id = $1 AND ($2::uuid IS NULL OR magasin_id = $2)",
        COMMANDE_COLUMNS
    ))
    .bind(id)
    .bind(scope)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Commande".to_string()))?
    .try_into()?;

    let lignes = sqlx::query_as::<_, LigneRow>(
        r#"
        SELECT id, commande_id, produit_id, cartons, unites, unites_recues, unites_par_carton, prix_achat
        FROM commande_lignes
        WHERE commande_id = $1
        "#,
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    commande.lignes = lignes.into_iter().map(Into::into).collect();
    Ok(commande)
}

impl CommandeService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Persist an order from proposal lines, with packaging and purchase
    /// price read from the catalog now
    pub async fn validate(&self, magasin_id: Uuid, input: ValidateOrderInput) -> AppResult<Commande> {
        let date_commande = input.date_commande.unwrap_or_else(|| Utc::now().date_naive());
        let date_livraison_prevue = input
            .date_livraison_prevue
            .unwrap_or_else(|| delivery_schedule(date_commande).current.delivery_date);

        let ids: Vec<Uuid> = input.lignes.iter().map(|l| l.produit_id).collect();

        let mut tx = self.db.begin().await?;

        let snapshots: HashMap<Uuid, PackagingSnapshot> =
            sqlx::query_as::<_, (Uuid, Option<i32>, Option<Decimal>)>(
                r#"
                SELECT id, unites_par_carton, prix_achat
                FROM produits
                WHERE id = ANY($1) AND magasin_id = $2 AND actif
                "#,
            )
            .bind(&ids)
            .bind(magasin_id)
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .map(|(id, unites_par_carton, prix_achat)| {
                (
                    id,
                    PackagingSnapshot {
                        unites_par_carton,
                        prix_achat,
                    },
                )
            })
            .collect();

        let lignes = validated_lines(&input.lignes, |p| snapshots.get(&p).copied())?;
        if lignes.len() < input.lignes.len() {
            tracing::warn!(
                submitted = input.lignes.len(),
                kept = lignes.len(),
                "Dropped order lines without cartons or packaging"
            );
        }

        let commande_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO commandes (magasin_id, statut, date_commande, date_livraison_prevue, commentaire)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(magasin_id)
        .bind(CommandeStatus::EnAttente.as_str())
        .bind(date_commande)
        .bind(date_livraison_prevue)
        .bind(&input.commentaire)
        .fetch_one(&mut *tx)
        .await?;

        for ligne in &lignes {
            sqlx::query(
                r#"
                INSERT INTO commande_lignes (commande_id, produit_id, cartons, unites, unites_par_carton, prix_achat)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(commande_id)
            .bind(ligne.produit_id)
            .bind(ligne.cartons)
            .bind(ligne.unites)
            .bind(ligne.unites_par_carton)
            .bind(ligne.prix_achat)
            .execute(&mut *tx)
            .await?;
        }

        let commande = fetch_commande(&mut tx, Some(magasin_id), commande_id).await?;
        tx.commit().await?;

        tracing::info!(
            commande_id = %commande_id,
            lignes = commande.lignes.len(),
            livraison = %date_livraison_prevue,
            "Validated order"
        );
        audit::record("commande.create", commande_id, magasin_id);

        Ok(commande)
    }

    /// Record a delivery. Received units are capped at the ordered units and
    /// the order is closed whatever was delivered.
    pub async fn receive(
        &self,
        scope: Option<Uuid>,
        id: Uuid,
        input: ReceiveOrderInput,
    ) -> AppResult<Commande> {
        let date = input.date_reception.unwrap_or_else(Utc::now);

        let mut tx = self.db.begin().await?;

        let commande = fetch_commande(&mut tx, scope, id).await?;
        commande.statut.ensure_receivable()?;

        let plan = plan_reception(&commande.lignes, &input.lignes)?;
        if !plan.unmatched.is_empty() {
            tracing::warn!(
                commande_id = %id,
                unmatched = ?plan.unmatched,
                "Skipped received products that are not on the order"
            );
        }

        for delta in &plan.deltas {
            sqlx::query("UPDATE commande_lignes SET unites_recues = $1 WHERE id = $2")
                .bind(delta.unites_recues)
                .bind(delta.ligne_id)
                .execute(&mut *tx)
                .await?;

            insert_movement(&mut tx, commande.magasin_id, &delta.movement(id, date)?).await?;
        }

        sqlx::query("UPDATE commandes SET statut = $1 WHERE id = $2")
            .bind(CommandeStatus::Receptionnee.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let received = fetch_commande(&mut tx, scope, id).await?;
        tx.commit().await?;

        tracing::info!(
            commande_id = %id,
            mouvements = plan.deltas.len(),
            "Received order"
        );
        audit::record("commande.receive", id, received.magasin_id);

        Ok(received)
    }

    /// Cancel an order that has not been received. Nothing was moved, so no
    /// movement is written.
    pub async fn cancel(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Commande> {
        let mut tx = self.db.begin().await?;

        let mut commande = fetch_commande(&mut tx, scope, id).await?;
        commande.statut.ensure_cancellable()?;

        sqlx::query("UPDATE commandes SET statut = $1 WHERE id = $2")
            .bind(CommandeStatus::Annulee.as_str())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        commande.statut = CommandeStatus::Annulee;

        tracing::info!(commande_id = %id, "Cancelled order");
        audit::record("commande.cancel", id, commande.magasin_id);

        Ok(commande)
    }

    /// List orders, newest first, without their lines
    pub async fn list(&self, scope: Option<Uuid>, filter: CommandeFilter) -> AppResult<Vec<Commande>> {
        let statut = filter
            .statut
            .as_deref()
            .map(str::parse::<CommandeStatus>)
            .transpose()?;

        let rows = sqlx::query_as::<_, CommandeRow>(&format!(
            r#"
            SELECT {}
            FROM commandes
            WHERE ($1::uuid IS NULL OR magasin_id = $1)
              AND ($2::text IS NULL OR statut = $2)
            ORDER BY date_commande DESC, created_at DESC
            "#,
            COMMANDE_COLUMNS
        ))
        .bind(scope)
        .bind(statut.map(|s| s.as_str()))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(Commande::try_from).collect()
    }

    pub async fn get(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Commande> {
        let mut conn = self.db.acquire().await?;
        fetch_commande(&mut conn, scope, id).await
    }
}
