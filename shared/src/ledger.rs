//! Stock ledger arithmetic
//!
//! Stock is never stored: it is the sum of a product's signed movements.
//! These helpers work on any slice of entries so the same rules apply to
//! rows loaded from the database and to in-memory ledgers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::models::{Movement, MovementKind, MovementNature, NewMovement};
use crate::types::{start_of_day, IsoWeek};

/// Anything that can be summed into a product's stock
pub trait LedgerEntry {
    fn produit_id(&self) -> Uuid;
    fn quantite(&self) -> i64;
    fn nature(&self) -> MovementNature;
    fn date(&self) -> DateTime<Utc>;
}

impl LedgerEntry for Movement {
    fn produit_id(&self) -> Uuid {
        self.produit_id
    }

    fn quantite(&self) -> i64 {
        self.quantite
    }

    fn nature(&self) -> MovementNature {
        self.nature
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

impl LedgerEntry for NewMovement {
    fn produit_id(&self) -> Uuid {
        self.produit_id
    }

    fn quantite(&self) -> i64 {
        self.quantite
    }

    fn nature(&self) -> MovementNature {
        self.kind.nature
    }

    fn date(&self) -> DateTime<Utc> {
        self.date
    }
}

/// Sum of every movement of the product
pub fn current_stock<E: LedgerEntry>(entries: &[E], produit_id: Uuid) -> i64 {
    stock_excluding(entries, produit_id, &[])
}

/// Sum of the product's movements, skipping the listed natures
pub fn stock_excluding<E: LedgerEntry>(
    entries: &[E],
    produit_id: Uuid,
    excluded: &[MovementNature],
) -> i64 {
    entries
        .iter()
        .filter(|e| e.produit_id() == produit_id && !excluded.contains(&e.nature()))
        .map(LedgerEntry::quantite)
        .sum()
}

/// The (product, nature, week) triple a weekly grid replace is allowed to touch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekScope {
    pub produit_id: Uuid,
    pub nature: MovementNature,
    pub week: IsoWeek,
}

impl WeekScope {
    pub fn contains<E: LedgerEntry>(&self, entry: &E) -> bool {
        let (from, to) = self.week.range().utc_bounds();
        let date = entry.date();
        entry.produit_id() == self.produit_id
            && entry.nature() == self.nature
            && date >= from
            && date < to
    }

    /// Movements replacing the scope's content: one SORTIE per day with a
    /// positive quantity, dated at midnight UTC of that day.
    pub fn replacement(&self, per_day: &[i64; 7]) -> DomainResult<Vec<NewMovement>> {
        if per_day.iter().any(|q| *q < 0) {
            return Err(DomainError::InvalidQuantity {
                field: "quantites",
                reason: "daily quantities cannot be negative",
            });
        }

        let kind = MovementKind::sortie(self.nature);
        self.week
            .days()
            .iter()
            .zip(per_day.iter())
            .filter(|(_, quantity)| **quantity > 0)
            .map(|(day, quantity)| {
                NewMovement::new(self.produit_id, kind, *quantity, start_of_day(*day))
                    .map(|m| m.with_comment(format!("Saisie hebdomadaire {}", self.week)))
            })
            .collect()
    }

    /// Per-day totals of the scope, as positive quantities
    pub fn daily_totals<E: LedgerEntry>(&self, entries: &[E]) -> [i64; 7] {
        let days = self.week.days();
        let mut totals = [0i64; 7];
        for entry in entries.iter().filter(|e| self.contains(*e)) {
            let day = entry.date().date_naive();
            if let Some(index) = days.iter().position(|d| *d == day) {
                totals[index] -= entry.quantite();
            }
        }
        totals
    }
}
