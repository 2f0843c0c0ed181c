//! Caller identity extractor.
//!
//! Authentication happens in the proxy in front of this service, which
//! forwards the verified identity in two headers:
//!
//! - `X-Actor` - who is acting (recorded on ledger entries)
//! - `X-Actor-Role` - `staff` (default) or `admin`

use axum::{extract::FromRequestParts, http::request::Parts};

use clinic_stock_core::StaffRole;

use crate::error::AppError;
use crate::models::RequestContext;

/// Header carrying the caller's identity.
pub const ACTOR_HEADER: &str = "x-actor";

/// Header carrying the caller's role.
pub const ROLE_HEADER: &str = "x-actor-role";

/// Extractor that requires a caller identity.
///
/// Rejects the request with 401 Unauthorized if `X-Actor` is missing or
/// blank, or if `X-Actor-Role` is present but not a known role.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(Actor(ctx): Actor) -> String {
///     format!("Hello, {}!", ctx.actor)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Actor(pub RequestContext);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = header_str(parts, ACTOR_HEADER)?
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::Unauthorized("missing X-Actor header".to_string()))?;

        let role = match header_str(parts, ROLE_HEADER)? {
            Some(raw) => raw
                .trim()
                .to_ascii_lowercase()
                .parse::<StaffRole>()
                .map_err(AppError::Unauthorized)?,
            None => StaffRole::Staff,
        };

        Ok(Self(RequestContext::new(actor, role)))
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Result<Option<&'a str>, AppError> {
    parts
        .headers
        .get(name)
        .map(|value| {
            value
                .to_str()
                .map_err(|_| AppError::Unauthorized(format!("{name} header is not valid text")))
        })
        .transpose()
}
