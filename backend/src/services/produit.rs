//! Product catalog service
//!
//! Products are never deleted: deactivation keeps the ledger history
//! attached to them intact.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{PrixHistorique, Produit};
use crate::services::audit;
use shared::{
    generate_reference, validate_ean13, validate_internal_code, validate_price,
    validate_reference, validate_units_per_carton,
};

#[derive(Clone)]
pub struct ProduitService {
    db: PgPool,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduitInput {
    #[validate(length(min = 1, max = 200))]
    pub nom: String,
    /// Generated from the store code and the name when absent
    pub reference: Option<String>,
    pub categorie_id: Option<Uuid>,
    pub categorie: Option<String>,
    pub prix_vente: Decimal,
    pub prix_achat: Option<Decimal>,
    pub unites_par_carton: Option<i32>,
    #[validate(range(min = 0))]
    pub quantite_journaliere: Option<i64>,
    pub code_ean13: Option<String>,
    pub code_interne: Option<String>,
}

/// Input for updating a product; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduitInput {
    #[validate(length(min = 1, max = 200))]
    pub nom: Option<String>,
    pub categorie_id: Option<Uuid>,
    pub categorie: Option<String>,
    pub prix_vente: Option<Decimal>,
    pub prix_achat: Option<Decimal>,
    pub unites_par_carton: Option<i32>,
    #[validate(range(min = 0))]
    pub quantite_journaliere: Option<i64>,
    pub code_ean13: Option<String>,
    pub code_interne: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProduitFilter {
    /// Include deactivated products
    #[serde(default)]
    pub inactifs: bool,
}

#[derive(Debug, FromRow)]
struct ProduitRow {
    id: Uuid,
    magasin_id: Uuid,
    nom: String,
    reference: Option<String>,
    categorie_id: Option<Uuid>,
    categorie: Option<String>,
    prix_vente: Decimal,
    prix_achat: Option<Decimal>,
    unites_par_carton: Option<i32>,
    quantite_journaliere: Option<i64>,
    code_ean13: Option<String>,
    code_interne: Option<String>,
    actif: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProduitRow> for Produit {
    fn from(row: ProduitRow) -> Self {
        Produit {
            id: row.id,
            magasin_id: row.magasin_id,
            nom: row.nom,
            reference: row.reference,
            categorie_id: row.categorie_id,
            categorie: row.categorie,
            prix_vente: row.prix_vente,
            prix_achat: row.prix_achat,
            unites_par_carton: row.unites_par_carton,
            quantite_journaliere: row.quantite_journaliere,
            code_ean13: row.code_ean13,
            code_interne: row.code_interne,
            actif: row.actif,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct PrixRow {
    id: Uuid,
    produit_id: Uuid,
    prix_vente: Decimal,
    prix_achat: Option<Decimal>,
    date: DateTime<Utc>,
}

impl From<PrixRow> for PrixHistorique {
    fn from(row: PrixRow) -> Self {
        PrixHistorique {
            id: row.id,
            produit_id: row.produit_id,
            prix_vente: row.prix_vente,
            prix_achat: row.prix_achat,
            date: row.date,
        }
    }
}

const PRODUIT_COLUMNS: &str = "id, magasin_id, nom, reference, categorie_id, categorie, \
     prix_vente, prix_achat, unites_par_carton, quantite_journaliere, code_ean13, code_interne, \
     actif, created_at, updated_at";

fn field_error(field: &str, message: &'static str) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
        message_fr: format!("Champ {} invalide", field),
    }
}

fn check_catalog_fields(
    prix_vente: Decimal,
    prix_achat: Option<Decimal>,
    unites_par_carton: Option<i32>,
    code_ean13: Option<&str>,
    code_interne: Option<&str>,
) -> AppResult<()> {
    validate_price(prix_vente).map_err(|m| field_error("prixVente", m))?;
    if let Some(prix) = prix_achat {
        validate_price(prix).map_err(|m| field_error("prixAchat", m))?;
    }
    validate_units_per_carton(unites_par_carton).map_err(|m| field_error("unitesParCarton", m))?;
    if let Some(code) = code_ean13 {
        validate_ean13(code).map_err(|m| field_error("codeEan13", m))?;
    }
    if let Some(code) = code_interne {
        validate_internal_code(code).map_err(|m| field_error("codeInterne", m))?;
    }
    Ok(())
}

/// Maps a unique violation on `reference` to a collision error
fn reference_conflict(err: sqlx::Error, reference: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::ReferenceCollision(reference.to_string())
        }
        _ => AppError::DatabaseError(err),
    }
}

async fn record_price(
    conn: &mut PgConnection,
    produit_id: Uuid,
    prix_vente: Decimal,
    prix_achat: Option<Decimal>,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO produit_prix_historique (produit_id, prix_vente, prix_achat) VALUES ($1, $2, $3)",
    )
    .bind(produit_id)
    .bind(prix_vente)
    .bind(prix_achat)
    .execute(conn)
    .await?;
    Ok(())
}

impl ProduitService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product in the store catalog
    pub async fn create(&self, magasin_id: Uuid, input: CreateProduitInput) -> AppResult<Produit> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;
        check_catalog_fields(
            input.prix_vente,
            input.prix_achat,
            input.unites_par_carton,
            input.code_ean13.as_deref(),
            input.code_interne.as_deref(),
        )?;

        let mut tx = self.db.begin().await?;

        let store_code = sqlx::query_scalar::<_, String>("SELECT code FROM magasins WHERE id = $1")
            .bind(magasin_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Magasin".to_string()))?;

        let reference = match input.reference.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => {
                validate_reference(reference).map_err(|m| field_error("reference", m))?;
                reference.to_string()
            }
            None => generate_reference(&store_code, &input.nom),
        };

        let produit: Produit = sqlx::query_as::<_, ProduitRow>(&format!(
            r#"
            INSERT INTO produits (
                magasin_id, nom, reference, categorie_id, categorie, prix_vente, prix_achat,
                unites_par_carton, quantite_journaliere, code_ean13, code_interne
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PRODUIT_COLUMNS
        ))
        .bind(magasin_id)
        .bind(input.nom.trim())
        .bind(&reference)
        .bind(input.categorie_id)
        .bind(&input.categorie)
        .bind(input.prix_vente)
        .bind(input.prix_achat)
        .bind(input.unites_par_carton)
        .bind(input.quantite_journaliere)
        .bind(&input.code_ean13)
        .bind(&input.code_interne)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| reference_conflict(e, &reference))?
        .into();

        record_price(&mut tx, produit.id, produit.prix_vente, produit.prix_achat).await?;
        tx.commit().await?;

        tracing::info!(produit_id = %produit.id, reference = %reference, "Created product");
        audit::record("produit.create", produit.id, magasin_id);

        Ok(produit)
    }

    /// Update a product; a price change is appended to its price history
    pub async fn update(
        &self,
        scope: Option<Uuid>,
        id: Uuid,
        input: UpdateProduitInput,
    ) -> AppResult<Produit> {
        input
            .validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let current: Produit = self.fetch(&mut tx, scope, id).await?;

        let prix_vente = input.prix_vente.unwrap_or(current.prix_vente);
        let prix_achat = input.prix_achat.or(current.prix_achat);
        let unites_par_carton = input.unites_par_carton.or(current.unites_par_carton);
        let code_ean13 = input.code_ean13.or(current.code_ean13.clone());
        let code_interne = input.code_interne.or(current.code_interne.clone());

        check_catalog_fields(
            prix_vente,
            prix_achat,
            unites_par_carton,
            code_ean13.as_deref(),
            code_interne.as_deref(),
        )?;

        let produit: Produit = sqlx::query_as::<_, ProduitRow>(&format!(
            r#"
            UPDATE produits
            SET nom = $1, categorie_id = $2, categorie = $3, prix_vente = $4, prix_achat = $5,
                unites_par_carton = $6, quantite_journaliere = $7, code_ean13 = $8,
                code_interne = $9, updated_at = NOW()
            WHERE id = $10
            RETURNING {}
            "#,
            PRODUIT_COLUMNS
        ))
        .bind(input.nom.as_deref().map(str::trim).unwrap_or(&current.nom))
        .bind(input.categorie_id.or(current.categorie_id))
        .bind(input.categorie.as_ref().or(current.categorie.as_ref()))
        .bind(prix_vente)
        .bind(prix_achat)
        .bind(unites_par_carton)
        .bind(input.quantite_journaliere.or(current.quantite_journaliere))
        .bind(&code_ean13)
        .bind(&code_interne)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?
        .into();

        if current.price_changed(prix_vente, prix_achat) {
            record_price(&mut tx, id, prix_vente, prix_achat).await?;
            tracing::info!(produit_id = %id, %prix_vente, "Product price changed");
        }

        tx.commit().await?;
        audit::record("produit.update", id, produit.magasin_id);

        Ok(produit)
    }

    /// Soft-delete a product
    pub async fn deactivate(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Produit> {
        let row = sqlx::query_as::<_, ProduitRow>(&format!(
            r#"
            UPDATE produits SET actif = FALSE, updated_at = NOW()
            WHERE id = $1 AND ($2::uuid IS NULL OR magasin_id = $2)
            RETURNING {}
            "#,
            PRODUIT_COLUMNS
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Produit".to_string()))?;

        tracing::info!(produit_id = %id, "Deactivated product");
        audit::record("produit.deactivate", id, row.magasin_id);

        Ok(row.into())
    }

    pub async fn list(&self, scope: Option<Uuid>, filter: ProduitFilter) -> AppResult<Vec<Produit>> {
        let rows = sqlx::query_as::<_, ProduitRow>(&format!(
            r#"
            SELECT {}
            FROM produits
            WHERE ($1::uuid IS NULL OR magasin_id = $1) AND ($2 OR actif)
            ORDER BY nom
            "#,
            PRODUIT_COLUMNS
        ))
        .bind(scope)
        .bind(filter.inactifs)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn get(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Produit> {
        let mut conn = self.db.acquire().await?;
        self.fetch(&mut conn, scope, id).await
    }

    /// Price history, newest first
    pub async fn price_history(&self, scope: Option<Uuid>, id: Uuid) -> AppResult<Vec<PrixHistorique>> {
        let mut conn = self.db.acquire().await?;
        self.fetch(&mut conn, scope, id).await?;

        let rows = sqlx::query_as::<_, PrixRow>(
            r#"
            SELECT id, produit_id, prix_vente, prix_achat, date
            FROM produit_prix_historique
            WHERE produit_id = $1
            ORDER BY date DESC
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch(&self, conn: &mut PgConnection, scope: Option<Uuid>, id: Uuid) -> AppResult<Produit> {
        let row = sqlx::query_as::<_, ProduitRow>(&format!(
            "SELECT {} FROM produits WHERE id = $1 AND ($2::uuid IS NULL OR magasin_id = $2)",
            PRODUIT_COLUMNS
        ))
        .bind(id)
        .bind(scope)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Produit".to_string()))?;

        Ok(row.into())
    }
}
