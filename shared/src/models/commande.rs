//! Purchase order models and reception planning

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{MovementKind, NewMovement};
use crate::error::{DomainError, DomainResult};

/// Order status. There is no partial reception state: any reception closes
/// the order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandeStatus {
    EnAttente,
    Receptionnee,
    Annulee,
}

impl CommandeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandeStatus::EnAttente => "EN_ATTENTE",
            CommandeStatus::Receptionnee => "RECEPTIONNEE",
            CommandeStatus::Annulee => "ANNULEE",
        }
    }

    pub fn ensure_receivable(&self) -> DomainResult<()> {
        match self {
            CommandeStatus::EnAttente => Ok(()),
            other => Err(DomainError::TerminalStatus {
                entity: "commande",
                status: other.as_str(),
            }),
        }
    }

    pub fn ensure_cancellable(&self) -> DomainResult<()> {
        self.ensure_receivable()
    }
}

impl FromStr for CommandeStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EN_ATTENTE" => Ok(CommandeStatus::EnAttente),
            "RECEPTIONNEE" => Ok(CommandeStatus::Receptionnee),
            "ANNULEE" => Ok(CommandeStatus::Annulee),
            _ => Err(DomainError::UnknownStatus(s.to_string())),
        }
    }
}

/// A purchase order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Commande {
    pub id: Uuid,
    pub magasin_id: Uuid,
    pub statut: CommandeStatus,
    pub date_commande: NaiveDate,
    pub date_livraison_prevue: NaiveDate,
    pub commentaire: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub lignes: Vec<CommandeLigne>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandeLigne {
    pub id: Uuid,
    pub commande_id: Uuid,
    pub produit_id: Uuid,
    pub cartons: i32,
    /// cartons × unites_par_carton at validation time
    pub unites: i64,
    /// Never above `unites`
    pub unites_recues: i64,
    pub unites_par_carton: i32,
    pub prix_achat: Option<Decimal>,
}

impl CommandeLigne {
    /// Units still expected from the supplier
    pub fn remaining(&self) -> i64 {
        (self.unites - self.unites_recues).max(0)
    }
}

/// Units still expected per product over the orders that are waiting
pub fn pending_units(commandes: &[Commande]) -> HashMap<Uuid, i64> {
    let mut pending: HashMap<Uuid, i64> = HashMap::new();
    for ligne in commandes
        .iter()
        .filter(|c| c.statut == CommandeStatus::EnAttente)
        .flat_map(|c| c.lignes.iter())
    {
        *pending.entry(ligne.produit_id).or_insert(0) += ligne.remaining();
    }
    pending
}

/// A line of a proposal submitted for validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub produit_id: Uuid,
    pub cartons: i32,
}

/// Packaging and price read from the catalog when the order is validated
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PackagingSnapshot {
    pub unites_par_carton: Option<i32>,
    pub prix_achat: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCommandeLigne {
    pub produit_id: Uuid,
    pub cartons: i32,
    pub unites: i64,
    pub unites_par_carton: i32,
    pub prix_achat: Option<Decimal>,
}

/// Turns proposal lines into order lines using today's catalog packaging.
///
/// Repeated products are merged by summing cartons. Lines without cartons,
/// for unknown products or for products without packaging are dropped.
pub fn validated_lines<F>(
    requests: &[OrderLineRequest],
    snapshot_of: F,
) -> DomainResult<Vec<NewCommandeLigne>>
where
    F: Fn(Uuid) -> Option<PackagingSnapshot>,
{
    let mut order: Vec<Uuid> = Vec::new();
    let mut cartons: HashMap<Uuid, i32> = HashMap::new();
    for request in requests.iter().filter(|r| r.cartons > 0) {
        let total = cartons.entry(request.produit_id).or_insert_with(|| {
            order.push(request.produit_id);
            0
        });
        *total = total.saturating_add(request.cartons);
    }

    let lignes: Vec<NewCommandeLigne> = order
        .into_iter()
        .filter_map(|produit_id| {
            let snapshot = snapshot_of(produit_id)?;
            let upc = snapshot.unites_par_carton.filter(|u| *u > 0)?;
            let cartons = *cartons.get(&produit_id)?;
            Some(NewCommandeLigne {
                produit_id,
                cartons,
                unites: i64::from(cartons) * i64::from(upc),
                unites_par_carton: upc,
                prix_achat: snapshot.prix_achat,
            })
        })
        .collect();

    if lignes.is_empty() {
        return Err(DomainError::NoValidLines);
    }
    Ok(lignes)
}

/// A received quantity, in cartons or in units
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionLine {
    pub produit_id: Uuid,
    pub cartons_recus: Option<i32>,
    pub unites_recues: Option<i64>,
}

impl ReceptionLine {
    /// Incoming units; cartons win over units when both are given
    pub fn incoming_units(&self, unites_par_carton: i32) -> DomainResult<i64> {
        let units = match (self.cartons_recus, self.unites_recues) {
            (Some(cartons), _) => i64::from(cartons) * i64::from(unites_par_carton),
            (None, Some(units)) => units,
            (None, None) => 0,
        };
        if units < 0 {
            return Err(DomainError::InvalidQuantity {
                field: "lignes",
                reason: "received quantities cannot be negative",
            });
        }
        Ok(units)
    }
}

/// Change to one order line produced by a reception
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceptionDelta {
    pub ligne_id: Uuid,
    pub produit_id: Uuid,
    pub unites_recues: i64,
    pub delta: i64,
}

impl ReceptionDelta {
    pub fn movement(&self, commande_id: Uuid, date: DateTime<Utc>) -> DomainResult<NewMovement> {
        NewMovement::new(self.produit_id, MovementKind::entree_reception(), self.delta, date)
            .map(|m| m.with_comment(format!("Réception commande {}", commande_id)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReceptionPlan {
    pub deltas: Vec<ReceptionDelta>,
    /// Products received that the order does not contain
    pub unmatched: Vec<Uuid>,
}

/// Caps every line at its ordered units. Several incoming lines for the same
/// product add up; lines that would not raise the received count are skipped.
pub fn plan_reception(
    lignes: &[CommandeLigne],
    incoming: &[ReceptionLine],
) -> DomainResult<ReceptionPlan> {
    let mut plan = ReceptionPlan::default();
    let mut received: HashMap<Uuid, i64> = HashMap::new();

    for line in incoming {
        match lignes.iter().find(|l| l.produit_id == line.produit_id) {
            Some(ligne) => {
                let units = line.incoming_units(ligne.unites_par_carton)?;
                let total = received.entry(ligne.id).or_insert(0);
                *total = total.saturating_add(units);
            }
            None => plan.unmatched.push(line.produit_id),
        }
    }

    for ligne in lignes {
        let Some(incoming) = received.get(&ligne.id) else {
            continue;
        };
        let new_received = ligne
            .unites
            .min(ligne.unites_recues.saturating_add(*incoming));
        let delta = new_received - ligne.unites_recues;
        if delta > 0 {
            plan.deltas.push(ReceptionDelta {
                ligne_id: ligne.id,
                produit_id: ligne.produit_id,
                unites_recues: new_received,
                delta,
            });
        }
    }

    Ok(plan)
}
