use crate::application::ServiceDependencies;
use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use crate::ports::IsbnAlreadyExists;

use super::errors::{CatalogApplicationError, Result};

/// 書籍を登録する
///
/// ビジネスルール：
/// - ISBNは全書籍で一意であること
///
/// 重複している場合はストレージを変更せずに`DuplicateIsbn`を返す。
/// 確認の後に同じISBNが割り込んでも、リポジトリの`insert`が
/// `IsbnAlreadyExists`で拒否するため同じ結果になる。
pub async fn register(deps: &ServiceDependencies, book: Book) -> Result<Book> {
    let duplicated = deps
        .book_repository
        .exists_by_isbn(&book.isbn)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?;

    if duplicated {
        tracing::warn!(isbn = %book.isbn, "rejecting book with duplicate isbn");
        return Err(CatalogApplicationError::DuplicateIsbn);
    }

    let stored = deps.book_repository.insert(book).await.map_err(|e| {
        if let Some(IsbnAlreadyExists(isbn)) = e.downcast_ref::<IsbnAlreadyExists>() {
            tracing::warn!(isbn = %isbn, "concurrent registration detected at storage");
            CatalogApplicationError::DuplicateIsbn
        } else {
            CatalogApplicationError::RepositoryError(e)
        }
    })?;

    tracing::debug!(book_id = ?stored.id, isbn = %stored.isbn, "book registered");
    Ok(stored)
}

/// IDで書籍を取得する
///
/// 見つからない場合は`Ok(None)`。404にするかどうかは呼び出し側が決める。
pub async fn get_by_id(deps: &ServiceDependencies, id: BookId) -> Result<Option<Book>> {
    deps.book_repository
        .find_by_id(id)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

/// ISBNの完全一致で書籍を取得する
pub async fn find_by_isbn(deps: &ServiceDependencies, isbn: &str) -> Result<Option<Book>> {
    deps.book_repository
        .find_by_isbn(isbn)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

/// 書籍を更新する
///
/// タイトルと著者のみが更新対象。IDのない書籍は`InvalidArgument`。
pub async fn update(deps: &ServiceDependencies, book: Book) -> Result<Book> {
    let id = require_id(&book)?;

    deps.book_repository
        .update(id, book)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

/// 書籍を削除する
///
/// ビジネスルール：
/// - IDのない書籍は`InvalidArgument`
/// - 貸出履歴のある書籍は削除しない（`BookHasLoans`）
pub async fn delete(deps: &ServiceDependencies, book: &Book) -> Result<()> {
    let id = require_id(book)?;

    let has_loans = deps
        .loan_repository
        .exists_any_for_book(id)
        .await
        .map_err(CatalogApplicationError::RepositoryError)?;

    if has_loans {
        tracing::warn!(book_id = %id, "refusing to delete book with loan history");
        return Err(CatalogApplicationError::BookHasLoans);
    }

    deps.book_repository
        .delete(id)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

/// 書籍を検索する
///
/// 値のあるフィルタ項目すべてに部分一致（大文字小文字無視）する書籍を返す。
/// 空文字列の項目は未指定として扱う。
pub async fn search(
    deps: &ServiceDependencies,
    filter: BookFilter,
    page: PageRequest,
) -> Result<Page<Book>> {
    deps.book_repository
        .find_paged(filter.normalized(), page)
        .await
        .map_err(CatalogApplicationError::RepositoryError)
}

fn require_id(book: &Book) -> Result<BookId> {
    book.id.ok_or_else(|| {
        CatalogApplicationError::InvalidArgument("book id must be present".to_string())
    })
}
