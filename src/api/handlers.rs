use crate::application::{ServiceDependencies, catalog, loan};
use crate::domain::{Book, BookId, Loan, LoanId};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use std::sync::Arc;

use super::{
    error::ApiError,
    types::{
        BookDto, BookSearchQuery, CreateLoanRequest, LoanDto, LoanSearchQuery, PageQuery,
        PageResponse, ReturnedLoanRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

async fn load_book(state: &AppState, id: i64) -> Result<Book, ApiError> {
    catalog::get_by_id(&state.service_deps, BookId::from_i64(id))
        .await?
        .ok_or(ApiError::NotFound)
}

// ============================================================================
// Books
// ============================================================================

/// POST /api/books - 書籍を登録
///
/// ISBNが登録済みの場合は400。
pub async fn create_book(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<BookDto>,
) -> Result<(StatusCode, Json<BookDto>), ApiError> {
    dto.validate().map_err(ApiError::Validation)?;

    let mut book = Book::from(dto);
    book.id = None;

    let stored = catalog::register(&state.service_deps, book).await?;
    Ok((StatusCode::CREATED, Json(BookDto::from(&stored))))
}

/// GET /api/books/:id - 書籍詳細を取得
pub async fn get_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<BookDto>, ApiError> {
    let book = load_book(&state, id).await?;
    Ok(Json(BookDto::from(&book)))
}

/// PUT /api/books/:id - 書籍のタイトルと著者を更新
pub async fn update_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(dto): Json<BookDto>,
) -> Result<Json<BookDto>, ApiError> {
    dto.validate().map_err(ApiError::Validation)?;

    let mut book = load_book(&state, id).await?;
    book.title = dto.title;
    book.author = dto.author;

    let updated = catalog::update(&state.service_deps, book).await?;
    Ok(Json(BookDto::from(&updated)))
}

/// DELETE /api/books/:id - 書籍を削除
///
/// 貸出履歴のある書籍は削除できない（400）。
pub async fn delete_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let book = load_book(&state, id).await?;
    catalog::delete(&state.service_deps, &book).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/books - 書籍を検索
///
/// クエリパラメータ:
/// - title, author, isbn: 部分一致（大文字小文字無視、AND）
/// - page, size: ページング
pub async fn find_books(
    State(state): State<Arc<AppState>>,
    Query(query): Query<BookSearchQuery>,
) -> Result<Json<PageResponse<BookDto>>, ApiError> {
    let page = catalog::search(&state.service_deps, query.filter(), query.page_request()).await?;
    Ok(Json(PageResponse::from_page(page, |b| BookDto::from(&b))))
}

/// GET /api/books/:id/loans - 書籍の貸出履歴
pub async fn loans_by_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<LoanDto>>, ApiError> {
    let book = load_book(&state, id).await?;
    let page = loan::get_loans_for_book(&state.service_deps, &book, query.page_request()).await?;
    let today = loan::today();
    Ok(Json(PageResponse::from_page(page, |l| LoanDto::new(&l, today))))
}

// ============================================================================
// Loans
// ============================================================================

/// POST /api/loans - 貸出を作成
///
/// 強制されるビジネスルール:
/// - ISBNに対応する書籍が存在すること（400）
/// - 書籍に有効な貸出が存在しないこと（400）
///
/// 貸出日は当日。作成された貸出のIDを返す。
pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<i64>), ApiError> {
    req.validate().map_err(ApiError::Validation)?;

    let book = catalog::find_by_isbn(&state.service_deps, &req.isbn)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Book not found for passed isbn".to_string()))?;

    let new_loan = Loan::new(book, req.customer, req.email, loan::today());
    let stored = loan::save(&state.service_deps, new_loan).await?;

    let id = stored.id.map(|id| id.value()).unwrap_or_default();
    Ok((StatusCode::CREATED, Json(id)))
}

/// PATCH /api/loans/:id - 返却フラグを更新
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ReturnedLoanRequest>,
) -> Result<StatusCode, ApiError> {
    let mut existing = loan::get_by_id(&state.service_deps, LoanId::from_i64(id))
        .await?
        .ok_or(ApiError::NotFound)?;

    existing.returned = Some(req.returned);
    loan::update(&state.service_deps, existing).await?;
    Ok(StatusCode::OK)
}

/// GET /api/loans - 貸出を検索
///
/// クエリパラメータ:
/// - isbn, customer: 完全一致（OR）
/// - page, size: ページング
pub async fn find_loans(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LoanSearchQuery>,
) -> Result<Json<PageResponse<LoanDto>>, ApiError> {
    let page = loan::search(&state.service_deps, query.filter(), query.page_request()).await?;
    let today = loan::today();
    Ok(Json(PageResponse::from_page(page, |l| LoanDto::new(&l, today))))
}
