//! Order proposal computation and client-side edits
//!
//! A proposal is never persisted. It is computed from the ledger and the
//! waiting orders, edited by a person, then submitted for validation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cadence::delivery_schedule;
use crate::error::{DomainError, DomainResult};

/// Inputs needed to size the order of one product
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDemand {
    pub produit_id: Uuid,
    pub nom: String,
    pub unites_par_carton: i32,
    pub quantite_journaliere: i64,
    pub stock_actuel: i64,
    pub unites_en_attente: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProposalLine {
    pub produit_id: Uuid,
    pub nom_produit: String,
    pub cartons: i32,
    pub unites_par_carton: i32,
    pub total_unites: i64,
    pub stock_actuel: i64,
    pub consommation_estimee: i64,
    pub unites_en_attente: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub date_commande: NaiveDate,
    pub date_livraison_prevue: NaiveDate,
    pub prochaine_livraison: NaiveDate,
    pub livraison_suivante: NaiveDate,
    pub jours_a_couvrir: i64,
    pub lignes: Vec<ProposalLine>,
}

/// Product picked by hand to be added to a proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProductPick {
    pub produit_id: Uuid,
    pub nom_produit: String,
    pub unites_par_carton: i32,
    #[serde(default)]
    pub stock_actuel: i64,
}

fn total_units(cartons: i32, unites_par_carton: i32) -> i64 {
    i64::from(cartons) * i64::from(unites_par_carton)
}

/// Sizes one product's order, in whole cartons. Returns `None` when nothing
/// needs ordering or the product has no packaging.
pub fn compute_line(demand: &ProductDemand, coverage_days: i64) -> Option<ProposalLine> {
    if demand.unites_par_carton <= 0 {
        return None;
    }

    let consumption = demand.quantite_journaliere.saturating_mul(coverage_days);
    let need = consumption
        .saturating_sub(demand.stock_actuel)
        .saturating_sub(demand.unites_en_attente);
    if need <= 0 {
        return None;
    }

    let upc = i64::from(demand.unites_par_carton);
    let cartons = i32::try_from(need / upc + i64::from(need % upc != 0)).unwrap_or(i32::MAX);

    Some(ProposalLine {
        produit_id: demand.produit_id,
        nom_produit: demand.nom.clone(),
        cartons,
        unites_par_carton: demand.unites_par_carton,
        total_unites: total_units(cartons, demand.unites_par_carton),
        stock_actuel: demand.stock_actuel,
        consommation_estimee: consumption,
        unites_en_attente: demand.unites_en_attente,
    })
}

/// Proposal for an order placed on `order_date`, lines sorted by product name
pub fn build_proposal(order_date: NaiveDate, demands: &[ProductDemand]) -> Proposal {
    let schedule = delivery_schedule(order_date);

    let mut lignes: Vec<ProposalLine> = demands
        .iter()
        .filter_map(|d| compute_line(d, schedule.coverage_days))
        .collect();
    lignes.sort_by(|a, b| a.nom_produit.cmp(&b.nom_produit));

    Proposal {
        date_commande: order_date,
        date_livraison_prevue: schedule.current.delivery_date,
        prochaine_livraison: schedule.next.delivery_date,
        livraison_suivante: schedule.following.delivery_date,
        jours_a_couvrir: schedule.coverage_days,
        lignes,
    }
}

impl Proposal {
    pub fn contains(&self, produit_id: Uuid) -> bool {
        self.lignes.iter().any(|l| l.produit_id == produit_id)
    }

    pub fn set_cartons(&mut self, produit_id: Uuid, cartons: i32) -> DomainResult<()> {
        if cartons < 0 {
            return Err(DomainError::InvalidQuantity {
                field: "cartons",
                reason: "cannot be negative",
            });
        }
        let line = self
            .lignes
            .iter_mut()
            .find(|l| l.produit_id == produit_id)
            .ok_or(DomainError::LineNotFound(produit_id))?;

        line.cartons = cartons;
        line.total_unites = total_units(cartons, line.unites_par_carton);
        Ok(())
    }

    /// Returns whether a line was removed
    pub fn remove_line(&mut self, produit_id: Uuid) -> bool {
        let before = self.lignes.len();
        self.lignes.retain(|l| l.produit_id != produit_id);
        self.lignes.len() != before
    }

    /// Adds a product with a chosen carton count. Does nothing and returns
    /// `false` if the product is already proposed.
    pub fn add_product(&mut self, pick: ProductPick, cartons: i32) -> DomainResult<bool> {
        if self.contains(pick.produit_id) {
            return Ok(false);
        }
        if pick.unites_par_carton <= 0 {
            return Err(DomainError::InvalidQuantity {
                field: "unitesParCarton",
                reason: "must be positive",
            });
        }
        if cartons < 0 {
            return Err(DomainError::InvalidQuantity {
                field: "cartons",
                reason: "cannot be negative",
            });
        }

        self.lignes.push(ProposalLine {
            produit_id: pick.produit_id,
            nom_produit: pick.nom_produit,
            cartons,
            unites_par_carton: pick.unites_par_carton,
            total_unites: total_units(cartons, pick.unites_par_carton),
            stock_actuel: pick.stock_actuel,
            consommation_estimee: 0,
            unites_en_attente: 0,
        });
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demand(target: i64, stock: i64, pending: i64, upc: i32) -> ProductDemand {
        ProductDemand {
            produit_id: Uuid::new_v4(),
            nom: "Croissant".to_string(),
            unites_par_carton: upc,
            quantite_journaliere: target,
            stock_actuel: stock,
            unites_en_attente: pending,
        }
    }

    #[test]
    fn test_rounds_up_to_whole_cartons() {
        let line = compute_line(&demand(10, 5, 0, 8), 3).unwrap();
        assert_eq!(line.consommation_estimee, 30);
        assert_eq!(line.cartons, 4);
        assert_eq!(line.total_unites, 32);
    }

    #[test]
    fn test_exact_multiple_is_not_rounded_up() {
        let line = compute_line(&demand(8, 0, 0, 8), 2).unwrap();
        assert_eq!(line.cartons, 2);
    }

    #[test]
    fn test_covered_products_are_dropped() {
        assert!(compute_line(&demand(10, 20, 10, 8), 3).is_none());
        assert!(compute_line(&demand(10, 0, 0, 0), 3).is_none());
        assert!(compute_line(&demand(0, -4, 0, 8), 3).is_some());
    }

    #[test]
    fn test_huge_targets_saturate() {
        let line = compute_line(&demand(i64::MAX / 2, 0, 0, 8), 7).unwrap();
        assert_eq!(line.consommation_estimee, i64::MAX);
        assert_eq!(line.cartons, i32::MAX);
        assert_eq!(line.total_unites, i64::from(i32::MAX) * 8);

        let line = compute_line(&demand(i64::MAX, -5, 0, 8), 1).unwrap();
        assert_eq!(line.cartons, i32::MAX);
        assert_eq!(line.stock_actuel, -5);
    }

    #[test]
    fn test_edits() {
        let order_date = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
        let d = demand(10, 0, 0, 6);
        let mut proposal = build_proposal(order_date, &[d.clone()]);
        assert_eq!(proposal.jours_a_couvrir, 7);
        assert_eq!(proposal.lignes[0].cartons, 12);

        proposal.set_cartons(d.produit_id, 2).unwrap();
        assert_eq!(proposal.lignes[0].total_unites, 12);
        assert!(proposal.set_cartons(Uuid::new_v4(), 2).is_err());

        let pick = ProductPick {
            produit_id: d.produit_id,
            nom_produit: "Croissant".to_string(),
            unites_par_carton: 6,
            stock_actuel: 0,
        };
        assert_eq!(proposal.add_product(pick, 5), Ok(false));
        assert_eq!(proposal.lignes[0].cartons, 2);

        assert!(proposal.remove_line(d.produit_id));
        assert!(!proposal.remove_line(d.produit_id));
        assert!(proposal.lignes.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let proposal = build_proposal(NaiveDate::from_ymd_opt(2025, 1, 11).unwrap(), &[]);
        let json = serde_json::to_value(&proposal).unwrap();
        assert_eq!(json["joursACouvrir"], 7);
        assert_eq!(json["dateLivraisonPrevue"], "2025-01-16");
        assert!(json["lignes"].as_array().unwrap().is_empty());
    }
}
