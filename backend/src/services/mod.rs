//! Business logic services for the bakery operations platform

pub mod audit;
pub mod commande;
pub mod inventaire;
pub mod produit;
pub mod proposal;
pub mod stock;

pub use commande::CommandeService;
pub use inventaire::InventaireService;
pub use produit::ProduitService;
pub use proposal::ProposalService;
pub use stock::StockService;
