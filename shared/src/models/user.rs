//! User role and permission models

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Role carried in the access token
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    /// Works across every store
    Admin,
    Gerant,
    Vendeur,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "ADMIN",
            UserRole::Gerant => "GERANT",
            UserRole::Vendeur => "VENDEUR",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" => Ok(UserRole::Admin),
            "GERANT" => Ok(UserRole::Gerant),
            "VENDEUR" => Ok(UserRole::Vendeur),
            _ => Err(DomainError::UnknownRole(s.to_string())),
        }
    }
}

/// A permission granting access to a resource
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub resource: Resource,
    pub actions: Vec<Action>,
}

impl Permission {
    /// Token form of each granted action, e.g. `stock:write`
    pub fn keys(&self) -> Vec<String> {
        self.actions
            .iter()
            .map(|action| format!("{}:{}", self.resource.as_str(), action.as_str()))
            .collect()
    }
}

/// Resources that can be accessed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Stock,
    Commandes,
    Produits,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Stock => "stock",
            Resource::Commandes => "commandes",
            Resource::Produits => "produits",
        }
    }
}

/// Actions that can be performed on resources
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    Write,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Write => "write",
        }
    }
}

/// Permissions granted to a role when the token does not list any
pub fn default_permissions(role: UserRole) -> Vec<Permission> {
    let all = |resource| Permission {
        resource,
        actions: vec![Action::Read, Action::Write],
    };

    match role {
        UserRole::Admin | UserRole::Gerant => vec![
            all(Resource::Stock),
            all(Resource::Commandes),
            all(Resource::Produits),
        ],
        UserRole::Vendeur => vec![
            all(Resource::Stock),
            Permission {
                resource: Resource::Commandes,
                actions: vec![Action::Read],
            },
            Permission {
                resource: Resource::Produits,
                actions: vec![Action::Read],
            },
        ],
    }
}
