//! Authentication middleware
//!
//! JWT authentication, store scope resolution and permission checks

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use shared::{default_permissions, Permission, UserRole};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, ErrorDetail, ErrorResponse},
    AppState,
};

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    /// Store the user works in; admins may have none
    pub magasin_id: Option<Uuid>,
    pub role: UserRole,
    pub permissions: Vec<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Check if user has a specific permission. Tokens without an explicit
    /// permission list fall back to the role's defaults.
    pub fn has_permission(&self, resource: &str, action: &str) -> bool {
        if self.is_admin() {
            return true;
        }

        let permission = format!("{}:{}", resource, action);
        if self.permissions.is_empty() {
            default_permissions(self.role)
                .iter()
                .flat_map(Permission::keys)
                .any(|p| p == permission)
        } else {
            self.permissions.contains(&permission)
        }
    }

    /// Store scope of a request. Admins get the store they asked for (none
    /// means every store); everyone else is pinned to their own store.
    pub fn resolve_store(&self, requested: Option<Uuid>) -> AppResult<Option<Uuid>> {
        if self.is_admin() {
            return Ok(requested);
        }
        self.magasin_id.map(Some).ok_or(AppError::StoreScopeRequired)
    }

    /// Store scope for operations that write to one store
    pub fn require_store(&self, requested: Option<Uuid>) -> AppResult<Uuid> {
        self.resolve_store(requested)?
            .ok_or(AppError::StoreScopeRequired)
    }
}

/// Authentication middleware that validates JWT tokens against the
/// configured secret
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let auth_user = match authenticate(auth_header, &state.config.jwt.secret) {
        Ok(user) => user,
        Err(msg) => return unauthorized_response(&msg),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

/// Resolve the user behind an `Authorization: Bearer` header
fn authenticate(auth_header: Option<&str>, secret: &str) -> Result<AuthUser, String> {
    let token = auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| "Missing or invalid Authorization header".to_string())?;

    let claims = decode_jwt(token, secret)?;

    let user_id =
        Uuid::parse_str(&claims.sub).map_err(|_| "Invalid user ID in token".to_string())?;

    let magasin_id = claims
        .magasin_id
        .as_deref()
        .map(Uuid::parse_str)
        .transpose()
        .map_err(|_| "Invalid store ID in token".to_string())?;

    let role = claims
        .role
        .parse::<UserRole>()
        .map_err(|_| "Invalid role in token".to_string())?;

    Ok(AuthUser {
        user_id,
        magasin_id,
        role,
        permissions: claims.permissions,
    })
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct Claims {
    sub: String,
    magasin_id: Option<String>,
    role: String,
    #[serde(default)]
    permissions: Vec<String>,
    exp: i64,
    iat: i64,
}

fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

fn unauthorized_response(message: &str) -> Response {
    let error = ErrorResponse {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message_en: message.to_string(),
            message_fr: "Non autorisé".to_string(),
            field: None,
        },
    };

    (StatusCode::UNAUTHORIZED, Json(error)).into_response()
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail {
                        code: "UNAUTHORIZED".to_string(),
                        message_en: "Authentication required".to_string(),
                        message_fr: "Authentification requise".to_string(),
                        field: None,
                    },
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Permission guard for use in handlers
pub fn check_permission(user: &AuthUser, resource: &str, action: &str) -> AppResult<()> {
    if user.has_permission(resource, action) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %user.user_id,
            "Permission denied: requires {}:{}",
            resource,
            action
        );
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, magasin_id: Option<Uuid>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            magasin_id,
            role,
            permissions: Vec::new(),
        }
    }

    #[test]
    fn test_admin_uses_requested_store() {
        let admin = user(UserRole::Admin, None);
        let requested = Uuid::new_v4();
        assert_eq!(admin.resolve_store(Some(requested)).unwrap(), Some(requested));
        assert_eq!(admin.resolve_store(None).unwrap(), None);
        assert!(admin.require_store(None).is_err());
    }

    #[test]
    fn test_staff_pinned_to_own_store() {
        let own = Uuid::new_v4();
        let vendeur = user(UserRole::Vendeur, Some(own));
        assert_eq!(vendeur.resolve_store(Some(Uuid::new_v4())).unwrap(), Some(own));
        assert_eq!(vendeur.require_store(None).unwrap(), own);
        assert!(user(UserRole::Gerant, None).resolve_store(None).is_err());
    }

    #[test]
    fn test_permissions() {
        let vendeur = user(UserRole::Vendeur, Some(Uuid::new_v4()));
        assert!(check_permission(&vendeur, "stock", "write").is_ok());
        assert!(check_permission(&vendeur, "commandes", "write").is_err());

        let mut explicit = user(UserRole::Gerant, Some(Uuid::new_v4()));
        explicit.permissions = vec!["stock:read".to_string()];
        assert!(!explicit.has_permission("stock", "write"));
        assert!(user(UserRole::Admin, None).has_permission("produits", "write"));
    }

    fn token(secret: &str, magasin_id: Option<Uuid>) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            magasin_id: magasin_id.map(|id| id.to_string()),
            role: "GERANT".to_string(),
            permissions: Vec::new(),
            exp: now + 3600,
            iat: now,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn test_authenticate_with_configured_secret() {
        let magasin_id = Uuid::new_v4();
        let header = format!("Bearer {}", token("prod-secret", Some(magasin_id)));

        let user = authenticate(Some(header.as_str()), "prod-secret").unwrap();
        assert_eq!(user.magasin_id, Some(magasin_id));
        assert_eq!(user.role, UserRole::Gerant);
    }

    #[test]
    fn test_token_signed_with_other_secret_is_rejected() {
        let forged = format!("Bearer {}", token("development-secret-key", None));
        assert!(authenticate(Some(forged.as_str()), "prod-secret").is_err());
        assert!(authenticate(None, "prod-secret").is_err());
        assert!(authenticate(Some("Basic abc"), "prod-secret").is_err());
    }

    #[test]
    fn test_current_user_extractor() {
        use axum::extract::FromRequestParts;

        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let missing = tokio_test::block_on(CurrentUser::from_request_parts(&mut parts, &()));
        assert_eq!(missing.unwrap_err().0, StatusCode::UNAUTHORIZED);

        let gerant = user(UserRole::Gerant, Some(Uuid::new_v4()));
        parts.extensions.insert(gerant.clone());
        let found = tokio_test::block_on(CurrentUser::from_request_parts(&mut parts, &())).unwrap();
        assert_eq!(found.0.user_id, gerant.user_id);
    }
}
