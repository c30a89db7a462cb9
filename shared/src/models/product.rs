//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A catalog product owned by one store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Produit {
    pub id: Uuid,
    pub magasin_id: Uuid,
    pub nom: String,
    /// Unique store-prefixed reference
    pub reference: Option<String>,
    pub categorie_id: Option<Uuid>,
    /// Legacy free-text category
    pub categorie: Option<String>,
    pub prix_vente: Decimal,
    pub prix_achat: Option<Decimal>,
    pub unites_par_carton: Option<i32>,
    /// Units expected to be sold per day; drives the consumption estimate
    pub quantite_journaliere: Option<i64>,
    pub code_ean13: Option<String>,
    pub code_interne: Option<String>,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Produit {
    /// Packaging usable for ordering; products without it never get proposed
    pub fn orderable_units_per_carton(&self) -> Option<i32> {
        self.unites_par_carton.filter(|upc| *upc > 0)
    }

    pub fn daily_target(&self) -> i64 {
        self.quantite_journaliere.unwrap_or(0)
    }

    /// True when either price differs from the current one
    pub fn price_changed(&self, prix_vente: Decimal, prix_achat: Option<Decimal>) -> bool {
        self.prix_vente != prix_vente || self.prix_achat != prix_achat
    }
}

/// One entry of a product's price history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrixHistorique {
    pub id: Uuid,
    pub produit_id: Uuid,
    pub prix_vente: Decimal,
    pub prix_achat: Option<Decimal>,
    pub date: DateTime<Utc>,
}

/// Current ledger stock of one product
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductStock {
    pub produit_id: Uuid,
    pub nom: String,
    pub reference: Option<String>,
    pub unites_par_carton: Option<i32>,
    pub stock: i64,
}
