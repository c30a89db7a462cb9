//! WebAssembly module for the Bakery Operations Platform
//!
//! Provides client-side computation for:
//! - Delivery cadence preview
//! - Editing an order proposal before it is validated
//! - Carton rounding
//! - Product reference and barcode checks
//!
//! Proposals cross the boundary as JSON, in the same shape the server sends.

use std::fmt::Display;

use chrono::NaiveDate;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("bakery-operations-wasm loaded"));
}

fn js_error(context: &str, err: impl Display) -> JsValue {
    let message = format!("{}: {}", context, err);
    web_sys::console::warn_1(&JsValue::from_str(&message));
    js_sys::Error::new(&message).into()
}

fn parse_proposal(proposal_json: &str) -> Result<Proposal, JsValue> {
    serde_json::from_str(proposal_json).map_err(|e| js_error("Invalid proposal JSON", e))
}

fn parse_id(produit_id: &str) -> Result<Uuid, JsValue> {
    Uuid::parse_str(produit_id).map_err(|e| js_error("Invalid product id", e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_error("Serialization failed", e))
}

/// Delivery checkpoints and days to cover for an order placed on a date
/// (`YYYY-MM-DD`)
#[wasm_bindgen]
pub fn preview_delivery_schedule(order_date: &str) -> Result<String, JsValue> {
    let date = NaiveDate::parse_from_str(order_date, "%Y-%m-%d")
        .map_err(|e| js_error("Invalid order date", e))?;
    to_json(&shared::delivery_schedule(date))
}

/// Cartons needed to cover a product, 0 when nothing is needed
#[wasm_bindgen]
pub fn proposed_cartons(
    daily_target: i64,
    coverage_days: i64,
    current_stock: i64,
    pending_units: i64,
    units_per_carton: i32,
) -> i32 {
    let demand = ProductDemand {
        produit_id: Uuid::nil(),
        nom: String::new(),
        unites_par_carton: units_per_carton,
        quantite_journaliere: daily_target,
        stock_actuel: current_stock,
        unites_en_attente: pending_units,
    };
    compute_line(&demand, coverage_days).map_or(0, |line| line.cartons)
}

/// Change the carton count of a proposal line
#[wasm_bindgen]
pub fn set_proposal_cartons(
    proposal_json: &str,
    produit_id: &str,
    cartons: i32,
) -> Result<String, JsValue> {
    let mut proposal = parse_proposal(proposal_json)?;
    proposal
        .set_cartons(parse_id(produit_id)?, cartons)
        .map_err(|e| js_error("Cannot change cartons", e))?;
    to_json(&proposal)
}

/// Drop a line from a proposal
#[wasm_bindgen]
pub fn remove_proposal_line(proposal_json: &str, produit_id: &str) -> Result<String, JsValue> {
    let mut proposal = parse_proposal(proposal_json)?;
    proposal.remove_line(parse_id(produit_id)?);
    to_json(&proposal)
}

/// Add a product picked by hand; a product already proposed is left as is
#[wasm_bindgen]
pub fn add_proposal_product(
    proposal_json: &str,
    pick_json: &str,
    cartons: i32,
) -> Result<String, JsValue> {
    let mut proposal = parse_proposal(proposal_json)?;
    let pick: ProductPick =
        serde_json::from_str(pick_json).map_err(|e| js_error("Invalid product JSON", e))?;
    proposal
        .add_product(pick, cartons)
        .map_err(|e| js_error("Cannot add product", e))?;
    to_json(&proposal)
}

/// Reference suggested for a new product of a store
#[wasm_bindgen]
pub fn suggest_product_reference(store_code: &str, name: &str) -> String {
    generate_reference(store_code, name)
}

#[wasm_bindgen]
pub fn is_valid_ean13(code: &str) -> bool {
    validate_ean13(code).is_ok()
}

/// The seven dates (Monday first) of an ISO week such as `2025-W02`, as JSON
#[wasm_bindgen]
pub fn iso_week_days(week: &str) -> Result<String, JsValue> {
    let week: IsoWeek = week.parse().map_err(|e| js_error("Invalid week", e))?;
    to_json(&week.days())
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn rejects_malformed_input() {
        assert!(preview_delivery_schedule("07/01/2025").is_err());
        assert!(set_proposal_cartons("{}", "not-a-uuid", 1).is_err());
        assert!(iso_week_days("2025-W60").is_err());
    }
}
