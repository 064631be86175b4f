//! Authentication rejection responses.
//!
//! Responses are deliberately generic: the caller never learns whether a
//! signature failed, a token expired, or a refresh token was revoked.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectionKind {
    /// No usable credential; downstream of every collapsed token failure
    Unauthenticated,
    /// Authenticated but missing the required role/privilege
    Forbidden,
    /// Backing store failure; fail closed, distinct from a credential problem
    StoreUnavailable,
}

/// Rejection produced by the role-gated extractors.
#[derive(Debug)]
pub struct AuthRejection {
    kind: RejectionKind,
}

impl AuthRejection {
    pub fn unauthenticated() -> Self {
        Self {
            kind: RejectionKind::Unauthenticated,
        }
    }

    pub fn forbidden() -> Self {
        Self {
            kind: RejectionKind::Forbidden,
        }
    }

    pub fn store_unavailable() -> Self {
        Self {
            kind: RejectionKind::StoreUnavailable,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            RejectionKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            RejectionKind::Forbidden => StatusCode::FORBIDDEN,
            RejectionKind::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            RejectionKind::Unauthenticated | RejectionKind::Forbidden => "Access denied",
            RejectionKind::StoreUnavailable => "Service unavailable",
        }
    }
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        use serde::Serialize;

        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}
