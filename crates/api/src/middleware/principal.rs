//! Principal extractors for store-scoped routes.
//!
//! Authentication happens upstream: the gateway verifies the caller and
//! forwards its store and role as `x-store-id` and `x-store-role`. These
//! extractors only turn those headers into a [`Principal`] and enforce the
//! role needed for mutations.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use mercato_core::{Principal, StoreId, StoreRole};

/// Header carrying the caller's store id.
pub const STORE_ID_HEADER: &str = "x-store-id";
/// Header carrying the caller's role within that store.
pub const STORE_ROLE_HEADER: &str = "x-store-role";

/// Extractor that requires a principal.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_orders(RequirePrincipal(principal): RequirePrincipal) -> impl IntoResponse {
///     format!("store {}", principal.store_id)
/// }
/// ```
pub struct RequirePrincipal(pub Principal);

/// Extractor that requires a principal allowed to change orders.
///
/// Viewers are rejected with 403 Forbidden.
pub struct RequireOrderManager(pub Principal);

/// Error returned when a principal is missing or lacks the needed role.
#[derive(Debug, PartialEq, Eq)]
pub enum PrincipalRejection {
    /// Headers absent or malformed.
    Unauthorized,
    /// Principal present but its role cannot manage orders.
    Forbidden,
}

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Missing or invalid store credentials",
                    "kind": "unauthorized",
                })),
            )
                .into_response(),
            Self::Forbidden => (
                StatusCode::FORBIDDEN,
                Json(json!({
                    "error": "Your role cannot modify orders",
                    "kind": "forbidden",
                })),
            )
                .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequirePrincipal
where
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let principal = principal_from_parts(parts).ok_or(PrincipalRejection::Unauthorized)?;

        sentry::configure_scope(|scope| {
            scope.set_tag("store_id", principal.store_id);
        });
        tracing::Span::current().record("store_id", tracing::field::display(principal.store_id));

        Ok(Self(principal))
    }
}

impl<S> FromRequestParts<S> for RequireOrderManager
where
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequirePrincipal(principal) = RequirePrincipal::from_request_parts(parts, state).await?;

        if !principal.can_manage_orders() {
            tracing::info!(role = %principal.role, "Order mutation refused for role");
            return Err(PrincipalRejection::Forbidden);
        }

        Ok(Self(principal))
    }
}

fn principal_from_parts(parts: &Parts) -> Option<Principal> {
    let header = |name: &str| {
        parts
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
    };

    let store_id = header(STORE_ID_HEADER)?.parse::<StoreId>().ok()?;
    let role = header(STORE_ROLE_HEADER)?.parse::<StoreRole>().ok()?;

    Some(Principal::new(store_id, role))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn request_parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/api/orders");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_principal_from_headers() {
        let mut parts = request_parts(&[(STORE_ID_HEADER, "4"), (STORE_ROLE_HEADER, "staff")]);
        let RequirePrincipal(principal) = RequirePrincipal::from_request_parts(&mut parts, &())
            .await
            .unwrap();

        assert_eq!(principal.store_id, StoreId::new(4));
        assert_eq!(principal.role, StoreRole::Staff);
    }

    #[tokio::test]
    async fn test_missing_or_malformed_headers_are_unauthorized() {
        for headers in [
            vec![],
            vec![(STORE_ID_HEADER, "4")],
            vec![(STORE_ID_HEADER, "abc"), (STORE_ROLE_HEADER, "owner")],
            vec![(STORE_ID_HEADER, "0"), (STORE_ROLE_HEADER, "owner")],
            vec![(STORE_ID_HEADER, "4"), (STORE_ROLE_HEADER, "janitor")],
        ] {
            let mut parts = request_parts(&headers);
            let rejection = RequirePrincipal::from_request_parts(&mut parts, &())
                .await
                .err();
            assert_eq!(rejection, Some(PrincipalRejection::Unauthorized), "{headers:?}");
        }
    }

    #[tokio::test]
    async fn test_viewer_cannot_manage_orders() {
        let mut parts = request_parts(&[(STORE_ID_HEADER, "4"), (STORE_ROLE_HEADER, "viewer")]);
        let rejection = RequireOrderManager::from_request_parts(&mut parts, &())
            .await
            .err();
        assert_eq!(rejection, Some(PrincipalRejection::Forbidden));

        let mut parts = request_parts(&[(STORE_ID_HEADER, "4"), (STORE_ROLE_HEADER, "owner")]);
        assert!(
            RequireOrderManager::from_request_parts(&mut parts, &())
                .await
                .is_ok()
        );
    }

    #[test]
    fn test_rejection_status_codes() {
        assert_eq!(
            PrincipalRejection::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            PrincipalRejection::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
    }
}
