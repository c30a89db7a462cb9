//! HTTP request handlers

pub mod commande;
pub mod health;
pub mod inventaire;
pub mod produit;
pub mod stock;

use serde::Deserialize;
use uuid::Uuid;

pub use commande::*;
pub use health::*;
pub use inventaire::*;
pub use produit::*;
pub use stock::*;

/// Store requested by the caller; only admins may pick one
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreQuery {
    pub magasin_id: Option<Uuid>,
}
