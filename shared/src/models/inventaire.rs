//! Inventory count models and reconciliation planning
//!
//! A count never overwrites stock. Each line snapshots the ledger sum at
//! count time and the difference (écart) becomes one AJUSTEMENT movement.
//! Cancelling and correcting also only ever append movements.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Movement, MovementKind, NewMovement};
use crate::error::{DomainError, DomainResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventaireStatus {
    Valide,
    Annule,
}

impl InventaireStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventaireStatus::Valide => "VALIDE",
            InventaireStatus::Annule => "ANNULE",
        }
    }

    /// Cancelled counts are frozen
    pub fn ensure_editable(&self) -> DomainResult<()> {
        match self {
            InventaireStatus::Valide => Ok(()),
            InventaireStatus::Annule => Err(DomainError::TerminalStatus {
                entity: "inventaire",
                status: "ANNULE",
            }),
        }
    }
}

impl FromStr for InventaireStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALIDE" => Ok(InventaireStatus::Valide),
            "ANNULE" => Ok(InventaireStatus::Annule),
            _ => Err(DomainError::UnknownStatus(s.to_string())),
        }
    }
}

/// A stock count event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Inventaire {
    pub id: Uuid,
    pub magasin_id: Uuid,
    pub user_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub statut: InventaireStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lignes: Vec<InventaireLigne>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InventaireLigne {
    pub id: Uuid,
    pub inventaire_id: Uuid,
    pub produit_id: Uuid,
    pub quantite_reelle: i64,
    /// Ledger sum when the count was taken
    pub stock_avant: i64,
    pub ecart: i64,
}

/// One counted quantity as submitted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CountedLine {
    pub produit_id: Uuid,
    pub quantite_reelle: i64,
}

/// Drops negative counts and keeps the last count of each product,
/// in order of first appearance
pub fn dedupe_counted_lines(lines: &[CountedLine]) -> Vec<CountedLine> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut latest: HashMap<Uuid, i64> = HashMap::new();

    for line in lines.iter().filter(|l| l.quantite_reelle >= 0) {
        if latest.insert(line.produit_id, line.quantite_reelle).is_none() {
            order.push(line.produit_id);
        }
    }

    order
        .into_iter()
        .filter_map(|produit_id| {
            latest.get(&produit_id).map(|q| CountedLine {
                produit_id,
                quantite_reelle: *q,
            })
        })
        .collect()
}

/// A counted line set against the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledLine {
    pub produit_id: Uuid,
    pub quantite_reelle: i64,
    pub stock_avant: i64,
    pub ecart: i64,
}

impl ReconciledLine {
    pub fn new(counted: CountedLine, stock_avant: i64) -> Self {
        Self {
            produit_id: counted.produit_id,
            quantite_reelle: counted.quantite_reelle,
            stock_avant,
            ecart: counted.quantite_reelle - stock_avant,
        }
    }

    /// The adjustment that brings the ledger to the counted quantity, if any
    pub fn adjustment(
        &self,
        inventaire_id: Uuid,
        date: DateTime<Utc>,
    ) -> DomainResult<Option<NewMovement>> {
        if self.ecart == 0 {
            return Ok(None);
        }
        NewMovement::new(
            self.produit_id,
            MovementKind::ajustement_inventaire(),
            self.ecart,
            date,
        )
        .map(|m| Some(m.with_inventaire(inventaire_id)))
    }
}

/// Lines and movements of a new count, ready to be written together
#[derive(Debug, Clone, PartialEq)]
pub struct InventairePlan {
    pub lignes: Vec<ReconciledLine>,
    pub movements: Vec<NewMovement>,
}

/// Reconciles the counted lines of known products against their stock.
/// `stock_of` returns `None` for products outside the count's scope, which
/// are dropped.
pub fn plan_inventaire<F>(
    inventaire_id: Uuid,
    lines: &[CountedLine],
    date: DateTime<Utc>,
    stock_of: F,
) -> DomainResult<InventairePlan>
where
    F: Fn(Uuid) -> Option<i64>,
{
    let lignes: Vec<ReconciledLine> = dedupe_counted_lines(lines)
        .into_iter()
        .filter_map(|counted| stock_of(counted.produit_id).map(|s| ReconciledLine::new(counted, s)))
        .collect();

    if lignes.is_empty() {
        return Err(DomainError::NoValidLines);
    }

    let mut movements = Vec::new();
    for ligne in &lignes {
        if let Some(movement) = ligne.adjustment(inventaire_id, date)? {
            movements.push(movement);
        }
    }

    Ok(InventairePlan { lignes, movements })
}

/// One inverse AJUSTEMENT per movement linked to the count
pub fn cancellation_movements(
    inventaire_id: Uuid,
    linked: &[Movement],
    date: DateTime<Utc>,
) -> DomainResult<Vec<NewMovement>> {
    linked
        .iter()
        .filter(|m| m.inventaire_id == Some(inventaire_id) && m.quantite != 0)
        .map(|m| {
            NewMovement::new(
                m.produit_id,
                MovementKind::ajustement_inventaire(),
                -m.quantite,
                date,
            )
            .map(|inverse| {
                inverse
                    .with_comment(format!("Annulation inventaire {}", inventaire_id))
                    .with_inventaire(inventaire_id)
            })
        })
        .collect()
}

/// Result of changing the counted quantity of an existing line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineCorrection {
    pub quantite_reelle: i64,
    pub ecart: i64,
    /// Extra adjustment on top of what the line already moved
    pub delta: i64,
}

impl LineCorrection {
    pub fn movement(
        &self,
        inventaire_id: Uuid,
        produit_id: Uuid,
        date: DateTime<Utc>,
    ) -> DomainResult<Option<NewMovement>> {
        if self.delta == 0 {
            return Ok(None);
        }
        NewMovement::new(produit_id, MovementKind::ajustement_inventaire(), self.delta, date).map(
            |m| {
                Some(
                    m.with_comment(format!("Correction inventaire {}", inventaire_id))
                        .with_inventaire(inventaire_id),
                )
            },
        )
    }
}

/// Recomputes the écart against the original snapshot, not today's stock
pub fn correct_line(ligne: &InventaireLigne, new_counted: i64) -> DomainResult<LineCorrection> {
    if new_counted < 0 {
        return Err(DomainError::InvalidQuantity {
            field: "quantiteReelle",
            reason: "a counted quantity cannot be negative",
        });
    }

    let ecart = new_counted - ligne.stock_avant;
    Ok(LineCorrection {
        quantite_reelle: new_counted,
        ecart,
        delta: ecart - ligne.ecart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_last_wins() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let lines = vec![
            CountedLine { produit_id: a, quantite_reelle: 3 },
            CountedLine { produit_id: b, quantite_reelle: -1 },
            CountedLine { produit_id: a, quantite_reelle: 9 },
        ];
        let deduped = dedupe_counted_lines(&lines);
        assert_eq!(deduped, vec![CountedLine { produit_id: a, quantite_reelle: 9 }]);
    }

    #[test]
    fn test_zero_ecart_has_no_adjustment() {
        let line = ReconciledLine::new(
            CountedLine { produit_id: Uuid::new_v4(), quantite_reelle: 12 },
            12,
        );
        assert_eq!(line.ecart, 0);
        assert_eq!(line.adjustment(Uuid::new_v4(), Utc::now()), Ok(None));
    }

    #[test]
    fn test_plan_drops_unknown_products() {
        let known = Uuid::new_v4();
        let lines = vec![
            CountedLine { produit_id: known, quantite_reelle: 4 },
            CountedLine { produit_id: Uuid::new_v4(), quantite_reelle: 8 },
        ];
        let id = Uuid::new_v4();
        let plan = plan_inventaire(id, &lines, Utc::now(), |p| (p == known).then_some(10)).unwrap();

        assert_eq!(plan.lignes.len(), 1);
        assert_eq!(plan.lignes[0].ecart, -6);
        assert_eq!(plan.movements.len(), 1);
        assert_eq!(plan.movements[0].quantite, -6);
        assert_eq!(plan.movements[0].inventaire_id, Some(id));
    }

    #[test]
    fn test_plan_without_known_products_fails() {
        let lines = vec![CountedLine { produit_id: Uuid::new_v4(), quantite_reelle: 1 }];
        assert_eq!(
            plan_inventaire(Uuid::new_v4(), &lines, Utc::now(), |_| None),
            Err(DomainError::NoValidLines)
        );
    }

    #[test]
    fn test_correction_uses_original_snapshot() {
        let ligne = InventaireLigne {
            id: Uuid::new_v4(),
            inventaire_id: Uuid::new_v4(),
            produit_id: Uuid::new_v4(),
            quantite_reelle: 15,
            stock_avant: 20,
            ecart: -5,
        };
        let correction = correct_line(&ligne, 18).unwrap();
        assert_eq!(correction.ecart, -2);
        assert_eq!(correction.delta, 3);

        let same = correct_line(&ligne, 15).unwrap();
        assert_eq!(same.delta, 0);
        assert_eq!(same.movement(ligne.inventaire_id, ligne.produit_id, Utc::now()), Ok(None));

        assert!(correct_line(&ligne, -1).is_err());
    }

    #[test]
    fn test_cancelled_inventaire_is_frozen() {
        assert!(InventaireStatus::Valide.ensure_editable().is_ok());
        assert!(InventaireStatus::Annule.ensure_editable().is_err());
    }
}
