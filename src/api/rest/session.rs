use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

/// The caller's company, resolved from `Authorization: Bearer <token>`.
///
/// Rejects with 401 when the token is missing or unknown and with 403 when
/// the session has no company attached.
pub struct CurrentCompany(pub Uuid);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentCompany {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                debug!("missing or malformed authorization header");
                AppError::Unauthorized
            })?;

        let session = state
            .sessions
            .get(token)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                warn!("unknown session token");
                AppError::Unauthorized
            })?;

        let company_id = session.company_id.ok_or_else(|| {
            warn!(user_id = %session.user_id, "session has no company");
            AppError::Forbidden
        })?;

        Ok(Self(company_id))
    }
}
