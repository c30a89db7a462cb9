//! Error handling for the bakery operations server
//!
//! Provides consistent error responses in English and French

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("A store must be selected")]
    StoreScopeRequired,

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_fr: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid movement type: {0}")]
    InvalidMovementType(String),

    #[error("Invalid movement nature: {0}")]
    InvalidMovementNature(String),

    #[error("No valid lines")]
    NoValidLines,

    #[error("Reference already used: {0}")]
    ReferenceCollision(String),

    #[error("Conflict: {message}")]
    Conflict {
        resource: String,
        message: String,
        message_fr: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(field: &str, message: &str, message_fr: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_fr: message_fr.to_string(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::InvalidMovementType(t) => AppError::InvalidMovementType(t),
            DomainError::InvalidMovementNature(n) => AppError::InvalidMovementNature(n),
            DomainError::InvalidQuantity { field, reason } => AppError::Validation {
                field: field.to_string(),
                message: format!("Invalid quantity: {}", reason),
                message_fr: format!("Quantité invalide : {}", reason),
            },
            DomainError::InvalidIsoWeek(week) => AppError::Validation {
                field: "sem".to_string(),
                message: format!("Invalid ISO week: {}", week),
                message_fr: format!("Semaine ISO invalide : {}", week),
            },
            DomainError::UnknownStatus(s) => AppError::ValidationError(format!("Unknown status: {}", s)),
            DomainError::UnknownRole(r) => AppError::ValidationError(format!("Unknown role: {}", r)),
            DomainError::NoValidLines => AppError::NoValidLines,
            DomainError::TerminalStatus { entity, status } => AppError::Conflict {
                resource: entity.to_string(),
                message: format!("The {} is already {}", entity, status),
                message_fr: format!("L'élément {} est déjà {}", entity, status),
            },
            DomainError::LineNotFound(produit_id) => {
                AppError::NotFound(format!("Line for product {}", produit_id))
            }
        }
    }
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message_en: String,
    pub message_fr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = match &self {
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail {
                    code: "INVALID_TOKEN".to_string(),
                    message_en: "Invalid token".to_string(),
                    message_fr: "Jeton invalide".to_string(),
                    field: None,
                },
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail {
                    code: "INSUFFICIENT_PERMISSIONS".to_string(),
                    message_en: "You do not have permission to perform this action".to_string(),
                    message_fr: "Vous n'avez pas les droits pour cette action".to_string(),
                    field: None,
                },
            ),
            AppError::StoreScopeRequired => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "STORE_SCOPE_REQUIRED".to_string(),
                    message_en: "A store must be selected for this operation".to_string(),
                    message_fr: "Un magasin doit être sélectionné pour cette opération".to_string(),
                    field: Some("magasinId".to_string()),
                },
            ),
            AppError::Validation {
                field,
                message,
                message_fr,
            } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: message.clone(),
                    message_fr: message_fr.clone(),
                    field: Some(field.clone()),
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_fr: format!("Données invalides : {}", msg),
                    field: None,
                },
            ),
            AppError::InvalidMovementType(t) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_MOVEMENT_TYPE".to_string(),
                    message_en: format!("Invalid movement type: {}", t),
                    message_fr: format!("Type de mouvement invalide : {}", t),
                    field: Some("type".to_string()),
                },
            ),
            AppError::InvalidMovementNature(n) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_MOVEMENT_NATURE".to_string(),
                    message_en: format!("Invalid movement nature: {}", n),
                    message_fr: format!("Nature de mouvement invalide : {}", n),
                    field: Some("nature".to_string()),
                },
            ),
            AppError::NoValidLines => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "NO_VALID_LINES".to_string(),
                    message_en: "No valid line to process".to_string(),
                    message_fr: "Aucune ligne valide à traiter".to_string(),
                    field: Some("lignes".to_string()),
                },
            ),
            AppError::ReferenceCollision(reference) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "REFERENCE_COLLISION".to_string(),
                    message_en: format!("Reference {} is already used", reference),
                    message_fr: format!("La référence {} est déjà utilisée", reference),
                    field: Some("reference".to_string()),
                },
            ),
            AppError::Conflict {
                resource,
                message,
                message_fr,
            } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message_en: message.clone(),
                    message_fr: message_fr.clone(),
                    field: Some(resource.clone()),
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message_en: format!("{} not found", resource),
                    message_fr: format!("{} introuvable", resource),
                    field: None,
                },
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "CONFIGURATION_ERROR".to_string(),
                    message_en: format!("Configuration error: {}", msg),
                    message_fr: format!("Erreur de configuration : {}", msg),
                    field: None,
                },
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message_en: "A database error occurred".to_string(),
                    message_fr: "Une erreur de base de données est survenue".to_string(),
                    field: None,
                },
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: msg.clone(),
                    message_fr: "Erreur interne du serveur".to_string(),
                    field: None,
                },
            ),
            AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message_en: "An internal server error occurred".to_string(),
                    message_fr: "Erreur interne du serveur".to_string(),
                    field: None,
                },
            ),
        };

        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
