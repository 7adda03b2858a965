use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::{header::WWW_AUTHENTICATE, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use registry_common::person::{FieldError, InvalidPerson};
use registry_common::store::StoreError;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

pub const BASIC_CHALLENGE: &str = r#"Basic realm="students""#;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid credentials")]
    Unauthorized,
    #[error(transparent)]
    Validation(#[from] InvalidPerson),
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
    #[error("student not found")]
    NotFound,
    #[error("store unavailable")]
    Store(#[from] StoreError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(WWW_AUTHENTICATE, BASIC_CHALLENGE)],
                Json(ErrorBody {
                    error: self.to_string(),
                    fields: Vec::new(),
                }),
            )
                .into_response(),

            ApiError::Validation(InvalidPerson(fields)) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: "validation failed".to_owned(),
                    fields,
                }),
            )
                .into_response(),

            ApiError::Rejected { status, message } => (
                status,
                Json(ErrorBody {
                    error: message,
                    fields: Vec::new(),
                }),
            )
                .into_response(),

            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ErrorBody {
                    error: self.to_string(),
                    fields: Vec::new(),
                }),
            )
                .into_response(),

            ApiError::Store(ref err) => {
                error!("internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody {
                        error: self.to_string(),
                        fields: Vec::new(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_of(response: Response) -> ErrorBody {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_unauthorized_carries_basic_challenge() {
        let response = ApiError::Unauthorized.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[WWW_AUTHENTICATE], BASIC_CHALLENGE);
    }

    #[tokio::test]
    async fn test_validation_lists_fields() {
        let error = InvalidPerson(vec![FieldError {
            field: "email".to_owned(),
            reason: "not a valid email address".to_owned(),
        }]);

        let response = ApiError::from(error.clone()).into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_of(response).await.fields, error.0);
    }

    #[tokio::test]
    async fn test_store_errors_do_not_leak_details() {
        let error = StoreError::QueryError {
            command: "INSERT".to_owned(),
            error: sqlx::Error::PoolTimedOut,
        };

        let response = ApiError::from(error).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_of(response).await.error, "store unavailable");
    }
}
