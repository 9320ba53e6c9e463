use crate::application::{catalog::CatalogApplicationError, loan::LoanApplicationError};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Catalog(CatalogApplicationError),
    Loan(LoanApplicationError),
    /// リクエストされたリソースが存在しない
    NotFound,
    /// ビジネスルール以外の理由で受け付けられないリクエスト
    BadRequest(String),
    /// 入力値の検証エラー
    Validation(Vec<String>),
}

impl From<CatalogApplicationError> for ApiError {
    fn from(err: CatalogApplicationError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

/// 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
fn internal_error(
    context: &str,
    err: &(dyn std::error::Error + Send + Sync),
) -> (StatusCode, Vec<String>) {
    tracing::error!(error = %err, "{}", context);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        vec!["An unexpected error occurred".to_string()],
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, errors) = match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, vec!["Not found".to_string()]),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, vec![msg]),
            ApiError::Validation(errors) => (StatusCode::BAD_REQUEST, errors),

            // 400 Bad Request - ビジネスルール違反
            ApiError::Catalog(
                e @ (CatalogApplicationError::DuplicateIsbn
                | CatalogApplicationError::BookHasLoans
                | CatalogApplicationError::InvalidArgument(_)),
            ) => (StatusCode::BAD_REQUEST, vec![e.to_string()]),
            ApiError::Loan(
                e @ (LoanApplicationError::BookAlreadyLoaned
                | LoanApplicationError::InvalidArgument(_)),
            ) => (StatusCode::BAD_REQUEST, vec![e.to_string()]),

            // 500 Internal Server Error - システム障害
            ApiError::Catalog(CatalogApplicationError::RepositoryError(ref e)) => {
                internal_error("Book repository error", e.as_ref())
            }
            ApiError::Loan(LoanApplicationError::RepositoryError(ref e)) => {
                internal_error("Loan repository error", e.as_ref())
            }
            ApiError::Loan(LoanApplicationError::NotificationError(ref e)) => {
                internal_error("Notification service error", e.as_ref())
            }
        };

        let body = Json(ErrorResponse { errors });
        (status, body).into_response()
    }
}
