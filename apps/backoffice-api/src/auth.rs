//! Acting staff member for mutations.
//!
//! The back-office UI sends the signed-in user's id in `x-user-id`. The
//! [`Actor`] extractor resolves it to a stored user; a missing header or an
//! unknown id is rejected with "Not authenticated" (401).

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use borka_core::User;
use tracing::warn;

use crate::error::ApiError;
use crate::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated staff member performing a request.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(ApiError::not_authenticated)?;

        match state.db.users().get(user_id).await? {
            Some(user) => Ok(Actor(user)),
            None => {
                warn!(user_id, "Unknown user in x-user-id");
                Err(ApiError::not_authenticated())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::routes::testing::test_state;
    use axum::http::Request;

    fn parts(user_id: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/refunds");
        if let Some(id) = user_id {
            builder = builder.header(USER_ID_HEADER, id);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_known_user_resolves() {
        let state = test_state().await;
        let Actor(user) = Actor::from_request_parts(&mut parts(Some("user-manager")), &state)
            .await
            .unwrap();
        assert_eq!(user.display_name(), "Rumana Akter");
    }

    #[tokio::test]
    async fn test_missing_or_unknown_user_rejected() {
        let state = test_state().await;

        let err = Actor::from_request_parts(&mut parts(None), &state)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(err.message, "Not authenticated");

        let err = Actor::from_request_parts(&mut parts(Some("user-ghost")), &state)
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
    }
}
