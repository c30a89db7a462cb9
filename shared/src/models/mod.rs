//! Domain models for the bakery operations platform

mod commande;
mod inventaire;
mod movement;
mod product;
mod proposal;
mod user;

pub use commande::*;
pub use inventaire::*;
pub use movement::*;
pub use product::*;
pub use proposal::*;
pub use user::*;
