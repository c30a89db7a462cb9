//! Order proposal service
//!
//! Gathers each orderable product's daily target, ledger stock and pending
//! order quantity, then sizes the order with the shared proposal engine.

use chrono::NaiveDate;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{build_proposal, ProductDemand, Proposal};

#[derive(Clone)]
pub struct ProposalService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct DemandRow {
    id: Uuid,
    nom: String,
    unites_par_carton: i32,
    quantite_journaliere: Option<i64>,
    stock_actuel: i64,
    unites_en_attente: i64,
}

impl From<DemandRow> for ProductDemand {
    fn from(row: DemandRow) -> Self {
        ProductDemand {
            produit_id: row.id,
            nom: row.nom,
            unites_par_carton: row.unites_par_carton,
            quantite_journaliere: row.quantite_journaliere.unwrap_or(0),
            stock_actuel: row.stock_actuel,
            unites_en_attente: row.unites_en_attente,
        }
    }
}

impl ProposalService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Compute the proposal for an order placed on `order_date`
    pub async fn compute(&self, magasin_id: Uuid, order_date: NaiveDate) -> AppResult<Proposal> {
        let rows = sqlx::query_as::<_, DemandRow>(
            r#"
            SELECT p.id, p.nom, p.unites_par_carton, p.quantite_journaliere,
                   COALESCE((SELECT SUM(m.quantite) FROM mouvements_stock m
                             WHERE m.produit_id = p.id), 0)::BIGINT AS stock_actuel,
                   COALESCE((SELECT SUM(l.unites - l.unites_recues)
                             FROM commande_lignes l
                             JOIN commandes c ON c.id = l.commande_id
                             WHERE l.produit_id = p.id AND c.statut = 'EN_ATTENTE'), 0)::BIGINT
                       AS unites_en_attente
            FROM produits p
            WHERE p.magasin_id = $1 AND p.actif AND p.unites_par_carton > 0
            "#,
        )
        .bind(magasin_id)
        .fetch_all(&self.db)
        .await?;

        let demands: Vec<ProductDemand> = rows.into_iter().map(Into::into).collect();
        let proposal = build_proposal(order_date, &demands);

        tracing::debug!(
            magasin_id = %magasin_id,
            date_commande = %order_date,
            produits = demands.len(),
            lignes = proposal.lignes.len(),
            jours = proposal.jours_a_couvrir,
            "Computed order proposal"
        );

        Ok(proposal)
    }
}
