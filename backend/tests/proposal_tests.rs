//! Order proposal tests
//!
//! Tests for the delivery cadence and proposal engine including:
//! - Property 5: Cadence Determinism
//! - Property 6: Proposal Rounding
//! - Client-side edits of a proposal

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use shared::{
    build_proposal, compute_line, delivery_schedule, next_checkpoint, ProductDemand, ProductPick,
};
use uuid::Uuid;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn demand(nom: &str, daily: i64, stock: i64, pending: i64, upc: i32) -> ProductDemand {
    ProductDemand {
        produit_id: Uuid::new_v4(),
        nom: nom.to_string(),
        unites_par_carton: upc,
        quantite_journaliere: daily,
        stock_actuel: stock,
        unites_en_attente: pending,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Property 5: an order on Tuesday is prepared Saturday, delivered Tuesday
    #[test]
    fn test_tuesday_cadence() {
        let checkpoint = next_checkpoint(day(2025, 1, 7));
        assert_eq!(checkpoint.prep_date, day(2025, 1, 11));
        assert_eq!(checkpoint.delivery_date, day(2025, 1, 14));
    }

    /// Property 5: an order on Saturday is prepared Tuesday, delivered Thursday
    #[test]
    fn test_saturday_cadence() {
        let checkpoint = next_checkpoint(day(2025, 1, 11));
        assert_eq!(checkpoint.prep_date, day(2025, 1, 14));
        assert_eq!(checkpoint.delivery_date, day(2025, 1, 16));
    }

    /// Coverage spans the first to the third delivery
    #[test]
    fn test_coverage_days() {
        let schedule = delivery_schedule(day(2025, 1, 7));
        assert_eq!(schedule.current.delivery_date, day(2025, 1, 14));
        assert_eq!(schedule.next.delivery_date, day(2025, 1, 16));
        assert_eq!(schedule.following.delivery_date, day(2025, 1, 21));
        assert_eq!(schedule.coverage_days, 7);
    }

    /// Property 6: Proposal Rounding
    #[test]
    fn test_rounding_to_whole_cartons() {
        let line = compute_line(&demand("Croissant", 10, 5, 0, 8), 3).unwrap();
        assert_eq!(line.consommation_estimee, 30);
        assert_eq!(line.cartons, 4);
        assert_eq!(line.total_unites, 32);
    }

    /// Enough stock or pending units means no line
    #[test]
    fn test_covered_product_is_skipped() {
        assert!(compute_line(&demand("Baguette", 10, 30, 0, 8), 3).is_none());
        assert!(compute_line(&demand("Baguette", 10, 10, 20, 8), 3).is_none());
        assert!(compute_line(&demand("Baguette", 0, 0, 0, 8), 3).is_none());
    }

    /// Products without packaging cannot be ordered
    #[test]
    fn test_product_without_packaging_is_skipped() {
        assert!(compute_line(&demand("Sachet", 10, 0, 0, 0), 3).is_none());
    }

    /// Lines come back sorted by product name
    #[test]
    fn test_proposal_sorted_by_name() {
        let demands = vec![
            demand("Pain de mie", 4, 0, 0, 6),
            demand("Baguette", 20, 0, 0, 30),
            demand("Croissant", 12, 0, 0, 50),
        ];

        let proposal = build_proposal(day(2025, 1, 7), &demands);
        let names: Vec<&str> = proposal.lignes.iter().map(|l| l.nom_produit.as_str()).collect();

        assert_eq!(names, vec!["Baguette", "Croissant", "Pain de mie"]);
        assert_eq!(proposal.date_livraison_prevue, day(2025, 1, 14));
        assert_eq!(proposal.jours_a_couvrir, 7);
    }

    /// Editing cartons, removing and adding lines
    #[test]
    fn test_proposal_edits() {
        let d = demand("Croissant", 10, 0, 0, 8);
        let produit_id = d.produit_id;
        let mut proposal = build_proposal(day(2025, 1, 7), &[d]);

        proposal.set_cartons(produit_id, 2).unwrap();
        assert_eq!(proposal.lignes[0].total_unites, 16);
        assert!(proposal.set_cartons(produit_id, -1).is_err());
        assert!(proposal.set_cartons(Uuid::new_v4(), 1).is_err());

        let pick = ProductPick {
            produit_id: Uuid::new_v4(),
            nom_produit: "Brioche".to_string(),
            unites_par_carton: 12,
            stock_actuel: 3,
        };
        assert!(proposal.add_product(pick.clone(), 1).unwrap());
        assert!(!proposal.add_product(pick.clone(), 5).unwrap());
        assert_eq!(proposal.lignes.len(), 2);

        assert!(proposal.remove_line(pick.produit_id));
        assert!(!proposal.remove_line(pick.produit_id));
        assert_eq!(proposal.lignes.len(), 1);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Strategy for generating order dates over a few years
    fn date_strategy() -> impl Strategy<Value = NaiveDate> {
        (0i64..1500).prop_map(|offset| day(2024, 1, 1) + Duration::days(offset))
    }

    fn demand_strategy() -> impl Strategy<Value = ProductDemand> {
        (0i64..=200, -50i64..=500, 0i64..=300, 1i32..=60).prop_map(
            |(daily, stock, pending, upc)| demand("Produit", daily, stock, pending, upc),
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property 5: Cadence Determinism
        /// Preparation is on Tuesday or Saturday, within a week, strictly after
        /// the order date
        #[test]
        fn prop_checkpoint_on_delivery_days(date in date_strategy()) {
            let checkpoint = next_checkpoint(date);
            let prep_day = checkpoint.prep_date.weekday();

            prop_assert!(prep_day == Weekday::Tue || prep_day == Weekday::Sat);
            prop_assert!(checkpoint.prep_date > date);
            prop_assert!(checkpoint.prep_date - date <= Duration::days(7));

            let lead = if prep_day == Weekday::Sat { 3 } else { 2 };
            prop_assert_eq!(checkpoint.delivery_date - checkpoint.prep_date, Duration::days(lead));
            prop_assert_eq!(next_checkpoint(date), checkpoint);
        }

        /// Property: coverage is at least one day and chains forward
        #[test]
        fn prop_schedule_chains_forward(date in date_strategy()) {
            let schedule = delivery_schedule(date);

            prop_assert!(schedule.coverage_days >= 1);
            prop_assert!(schedule.next.prep_date > schedule.current.prep_date);
            prop_assert!(schedule.following.prep_date > schedule.next.prep_date);
        }

        /// Property 6: Proposal Rounding
        /// Ordered units cover the need with less than one extra carton
        #[test]
        fn prop_cartons_cover_need(d in demand_strategy(), days in 1i64..=10) {
            let need = d.quantite_journaliere * days - d.stock_actuel - d.unites_en_attente;

            match compute_line(&d, days) {
                Some(line) => {
                    let upc = i64::from(line.unites_par_carton);
                    prop_assert!(need > 0);
                    prop_assert!(line.total_unites >= need);
                    prop_assert!(line.total_unites - need < upc);
                    prop_assert_eq!(line.total_unites, i64::from(line.cartons) * upc);
                }
                None => {
                    prop_assert!(need <= 0);
                }
            }
        }

        /// Property: any catalog target and ledger stock yields a well-formed
        /// line, capped at the largest carton count
        #[test]
        fn prop_extreme_demand_is_bounded(
            daily in 0i64..=i64::MAX,
            stock in any::<i64>(),
            pending in 0i64..=i64::MAX,
            upc in 1i32..=i32::MAX,
            days in 1i64..=14,
        ) {
            let d = demand("Produit", daily, stock, pending, upc);

            if let Some(line) = compute_line(&d, days) {
                prop_assert!(line.cartons > 0);
                prop_assert_eq!(
                    line.total_unites,
                    i64::from(line.cartons) * i64::from(line.unites_par_carton)
                );
            }
        }
    }
}
