//! Audit trail hook
//!
//! Emits one event on the `audit` tracing target after a successful
//! mutation. Nothing here can fail the operation that triggered it.

use uuid::Uuid;

pub fn record(action: &'static str, entity_id: Uuid, magasin_id: Uuid) {
    tracing::info!(
        target: "audit",
        action,
        entity_id = %entity_id,
        magasin_id = %magasin_id,
        "audit"
    );
}
