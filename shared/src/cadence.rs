//! Delivery cadence
//!
//! Supplier deliveries only happen on Tuesday and Saturday. An order prepared
//! on a Tuesday arrives two days later, one prepared on a Saturday arrives
//! three days later. The proposal engine chains three checkpoints to find how
//! many days the current order has to cover.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// One order-preparation day and the delivery it leads to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    pub prep_date: NaiveDate,
    pub delivery_date: NaiveDate,
}

/// Three chained checkpoints starting from an order date
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySchedule {
    pub order_date: NaiveDate,
    pub current: Checkpoint,
    pub next: Checkpoint,
    pub following: Checkpoint,
    pub coverage_days: i64,
}

/// Days from `from` to the next `target` weekday, in 1..=7
fn days_until(from: Weekday, target: Weekday) -> i64 {
    let diff = (target.num_days_from_monday() as i64 - from.num_days_from_monday() as i64)
        .rem_euclid(7);
    if diff == 0 {
        7
    } else {
        diff
    }
}

fn delivery_lead_days(prep_day: Weekday) -> i64 {
    if prep_day == Weekday::Sat {
        3
    } else {
        2
    }
}

/// Next order-preparation day strictly after `date` and its delivery
pub fn next_checkpoint(date: NaiveDate) -> Checkpoint {
    let weekday = date.weekday();
    let to_tuesday = days_until(weekday, Weekday::Tue);
    let to_saturday = days_until(weekday, Weekday::Sat);

    let prep_date = if to_saturday < to_tuesday {
        date + Duration::days(to_saturday)
    } else {
        date + Duration::days(to_tuesday)
    };

    Checkpoint {
        prep_date,
        delivery_date: prep_date + Duration::days(delivery_lead_days(prep_date.weekday())),
    }
}

/// Chains three checkpoints from `order_date`. Coverage runs from the first
/// delivery to the third one and is never less than a day.
pub fn delivery_schedule(order_date: NaiveDate) -> DeliverySchedule {
    let current = next_checkpoint(order_date);
    let next = next_checkpoint(current.prep_date);
    let following = next_checkpoint(next.prep_date);

    let coverage_days = (following.delivery_date - current.delivery_date)
        .num_days()
        .max(1);

    DeliverySchedule {
        order_date,
        current,
        next,
        following,
        coverage_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tuesday_order() {
        let cp = next_checkpoint(day(2025, 1, 7));
        assert_eq!(cp.prep_date, day(2025, 1, 11));
        assert_eq!(cp.delivery_date, day(2025, 1, 14));
    }

    #[test]
    fn test_saturday_order() {
        let cp = next_checkpoint(day(2025, 1, 11));
        assert_eq!(cp.prep_date, day(2025, 1, 14));
        assert_eq!(cp.delivery_date, day(2025, 1, 16));
    }

    #[test]
    fn test_other_days_pick_nearest() {
        // Wednesday: Saturday is 3 days away, Tuesday 6
        assert_eq!(next_checkpoint(day(2025, 1, 8)).prep_date, day(2025, 1, 11));
        // Sunday: Tuesday is 2 days away, Saturday 6
        assert_eq!(next_checkpoint(day(2025, 1, 12)).prep_date, day(2025, 1, 14));
        // Friday: Saturday tomorrow
        let cp = next_checkpoint(day(2025, 1, 10));
        assert_eq!(cp.prep_date, day(2025, 1, 11));
        assert_eq!(cp.delivery_date, day(2025, 1, 14));
        // Monday: Tuesday tomorrow, delivered Thursday
        let cp = next_checkpoint(day(2025, 1, 13));
        assert_eq!(cp.prep_date, day(2025, 1, 14));
        assert_eq!(cp.delivery_date, day(2025, 1, 16));
    }

    #[test]
    fn test_schedule_chain() {
        let schedule = delivery_schedule(day(2025, 1, 7));
        assert_eq!(schedule.current.delivery_date, day(2025, 1, 14));
        assert_eq!(schedule.next.prep_date, day(2025, 1, 14));
        assert_eq!(schedule.next.delivery_date, day(2025, 1, 16));
        assert_eq!(schedule.following.prep_date, day(2025, 1, 18));
        assert_eq!(schedule.following.delivery_date, day(2025, 1, 21));
        assert_eq!(schedule.coverage_days, 7);
    }

    #[test]
    fn test_prep_days_are_tuesday_or_saturday() {
        let mut date = day(2025, 3, 1);
        for _ in 0..28 {
            let cp = next_checkpoint(date);
            assert!(matches!(cp.prep_date.weekday(), Weekday::Tue | Weekday::Sat));
            assert!(cp.prep_date > date);
            assert!((cp.prep_date - date).num_days() <= 4);
            date = date.succ_opt().unwrap();
        }
    }
}
