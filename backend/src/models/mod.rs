//! Domain models used by the server
//!
//! Re-exports models from the shared crate along with the ledger, week and
//! cadence types the services work with

pub use shared::models::*;
pub use shared::{delivery_schedule, start_of_day, DeliverySchedule, IsoWeek, WeekScope};
