//! Stock ledger movement models

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Structural direction of a movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    Entree,
    Sortie,
    Ajustement,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Entree => "ENTREE",
            MovementType::Sortie => "SORTIE",
            MovementType::Ajustement => "AJUSTEMENT",
        }
    }

    /// Nature used when the caller does not tag the movement
    pub fn default_nature(&self) -> MovementNature {
        match self {
            MovementType::Entree => MovementNature::Reception,
            MovementType::Ajustement => MovementNature::Inventaire,
            MovementType::Sortie => MovementNature::Autre,
        }
    }

    /// Applies the sign policy of the ledger.
    ///
    /// ENTREE must be strictly positive and is stored as-is, SORTIE is always
    /// stored negative whatever sign the caller used, AJUSTEMENT keeps the
    /// caller's sign. A zero quantity is never a movement.
    pub fn signed_quantity(&self, quantity: i64) -> DomainResult<i64> {
        if quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                field: "quantite",
                reason: "must not be zero",
            });
        }

        match self {
            MovementType::Entree if quantity < 0 => Err(DomainError::InvalidQuantity {
                field: "quantite",
                reason: "must be positive for ENTREE",
            }),
            MovementType::Entree => Ok(quantity),
            MovementType::Sortie => Ok(-quantity.abs()),
            MovementType::Ajustement => Ok(quantity),
        }
    }
}

impl FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ENTREE" => Ok(MovementType::Entree),
            "SORTIE" => Ok(MovementType::Sortie),
            "AJUSTEMENT" => Ok(MovementType::Ajustement),
            _ => Err(DomainError::InvalidMovementType(s.to_string())),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting tag attached to a movement
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementNature {
    Vente,
    Perte,
    Reception,
    Inventaire,
    Autre,
}

impl MovementNature {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementNature::Vente => "VENTE",
            MovementNature::Perte => "PERTE",
            MovementNature::Reception => "RECEPTION",
            MovementNature::Inventaire => "INVENTAIRE",
            MovementNature::Autre => "AUTRE",
        }
    }

    /// Maps the `type` query value of the weekly grid (`ventes` / `pertes`)
    pub fn from_week_grid(kind: &str) -> DomainResult<Self> {
        match kind.trim().to_ascii_lowercase().as_str() {
            "ventes" => Ok(MovementNature::Vente),
            "pertes" => Ok(MovementNature::Perte),
            other => Err(DomainError::InvalidMovementNature(other.to_string())),
        }
    }
}

impl FromStr for MovementNature {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VENTE" => Ok(MovementNature::Vente),
            "PERTE" => Ok(MovementNature::Perte),
            "RECEPTION" => Ok(MovementNature::Reception),
            "INVENTAIRE" => Ok(MovementNature::Inventaire),
            "AUTRE" => Ok(MovementNature::Autre),
            _ => Err(DomainError::InvalidMovementNature(s.to_string())),
        }
    }
}

impl std::fmt::Display for MovementNature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated (type, nature) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MovementKind {
    pub movement_type: MovementType,
    pub nature: MovementNature,
}

impl MovementKind {
    pub fn new(movement_type: MovementType, nature: Option<MovementNature>) -> Self {
        Self {
            movement_type,
            nature: nature.unwrap_or_else(|| movement_type.default_nature()),
        }
    }

    /// Builds a kind from raw request values. An unknown type or an unknown
    /// explicit nature is rejected rather than defaulted.
    pub fn parse(movement_type: &str, nature: Option<&str>) -> DomainResult<Self> {
        let movement_type = movement_type.parse::<MovementType>()?;
        let nature = match nature.map(str::trim).filter(|n| !n.is_empty()) {
            Some(raw) => Some(raw.parse::<MovementNature>()?),
            None => None,
        };
        Ok(Self::new(movement_type, nature))
    }

    pub fn entree_reception() -> Self {
        Self::new(MovementType::Entree, Some(MovementNature::Reception))
    }

    pub fn ajustement_inventaire() -> Self {
        Self::new(MovementType::Ajustement, Some(MovementNature::Inventaire))
    }

    pub fn sortie(nature: MovementNature) -> Self {
        Self::new(MovementType::Sortie, Some(nature))
    }
}

/// A persisted ledger entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    pub id: Uuid,
    pub produit_id: Uuid,
    pub magasin_id: Uuid,
    #[serde(rename = "type")]
    pub movement_type: MovementType,
    pub nature: MovementNature,
    /// Signed quantity; stock is the sum of these
    pub quantite: i64,
    pub commentaire: Option<String>,
    pub date: DateTime<Utc>,
    pub inventaire_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A movement ready to be appended to the ledger, sign already applied
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub produit_id: Uuid,
    pub kind: MovementKind,
    pub quantite: i64,
    pub commentaire: Option<String>,
    pub date: DateTime<Utc>,
    pub inventaire_id: Option<Uuid>,
}

impl NewMovement {
    pub fn new(
        produit_id: Uuid,
        kind: MovementKind,
        quantity: i64,
        date: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            produit_id,
            kind,
            quantite: kind.movement_type.signed_quantity(quantity)?,
            commentaire: None,
            date,
            inventaire_id: None,
        })
    }

    pub fn with_comment(mut self, commentaire: impl Into<String>) -> Self {
        self.commentaire = Some(commentaire.into());
        self
    }

    pub fn with_inventaire(mut self, inventaire_id: Uuid) -> Self {
        self.inventaire_id = Some(inventaire_id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_policy() {
        assert_eq!(MovementType::Entree.signed_quantity(12), Ok(12));
        assert!(MovementType::Entree.signed_quantity(-12).is_err());
        assert_eq!(MovementType::Sortie.signed_quantity(7), Ok(-7));
        assert_eq!(MovementType::Sortie.signed_quantity(-7), Ok(-7));
        assert_eq!(MovementType::Ajustement.signed_quantity(-3), Ok(-3));
        assert_eq!(MovementType::Ajustement.signed_quantity(3), Ok(3));
        assert!(MovementType::Ajustement.signed_quantity(0).is_err());
    }

    #[test]
    fn test_default_natures() {
        assert_eq!(MovementKind::new(MovementType::Entree, None).nature, MovementNature::Reception);
        assert_eq!(MovementKind::new(MovementType::Ajustement, None).nature, MovementNature::Inventaire);
        assert_eq!(MovementKind::new(MovementType::Sortie, None).nature, MovementNature::Autre);
    }

    #[test]
    fn test_parse_kind() {
        let kind = MovementKind::parse("sortie", Some("PERTE")).unwrap();
        assert_eq!(kind.movement_type, MovementType::Sortie);
        assert_eq!(kind.nature, MovementNature::Perte);

        let kind = MovementKind::parse("ENTREE", Some("")).unwrap();
        assert_eq!(kind.nature, MovementNature::Reception);

        assert_eq!(
            MovementKind::parse("TRANSFERT", None),
            Err(DomainError::InvalidMovementType("TRANSFERT".to_string()))
        );
        assert!(matches!(
            MovementKind::parse("SORTIE", Some("CASSE")),
            Err(DomainError::InvalidMovementNature(_))
        ));
    }

    #[test]
    fn test_week_grid_nature() {
        assert_eq!(MovementNature::from_week_grid("ventes"), Ok(MovementNature::Vente));
        assert_eq!(MovementNature::from_week_grid("pertes"), Ok(MovementNature::Perte));
        assert!(MovementNature::from_week_grid("receptions").is_err());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&MovementNature::Inventaire).unwrap();
        assert_eq!(json, "\"INVENTAIRE\"");
        let parsed: MovementType = serde_json::from_str("\"AJUSTEMENT\"").unwrap();
        assert_eq!(parsed, MovementType::Ajustement);
    }
}
