use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use crate::ports::book_repository::{
    BookRepository as BookRepositoryTrait, IsbnAlreadyExists, Result,
};
use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::escape_like;

/// PostgreSQLの行データをBookに変換する
fn map_row_to_book(row: &PgRow) -> Book {
    Book {
        id: Some(BookId::from_i64(row.get("id"))),
        title: row.get("title"),
        author: row.get("author"),
        isbn: row.get("isbn"),
    }
}

/// ISBNの一意制約
const ISBN_UNIQUE_CONSTRAINT: &str = "books_isbn_unique";

/// 一意制約違反を`IsbnAlreadyExists`に変換し、それ以外はそのまま返す
fn map_insert_error(
    err: sqlx::Error,
    isbn: &str,
) -> Box<dyn std::error::Error + Send + Sync> {
    match err {
        sqlx::Error::Database(ref db) if db.constraint() == Some(ISBN_UNIQUE_CONSTRAINT) => {
            IsbnAlreadyExists(isbn.to_string()).into()
        }
        other => other.into(),
    }
}

/// 部分一致パターン（未指定ならNULL）
fn contains_pattern(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|v| format!("%{}%", escape_like(v)))
}

/// BookRepositoryのPostgreSQL実装
pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
    /// PostgreSQLコネクションプールから新しいBookRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM books WHERE isbn = $1)")
                .bind(isbn)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT id, title, author, isbn FROM books WHERE isbn = $1")
            .bind(isbn)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_row_to_book))
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>> {
        let row = sqlx::query("SELECT id, title, author, isbn FROM books WHERE id = $1")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_row_to_book))
    }

    /// 同時の登録はUNIQUE制約で弾かれ、`IsbnAlreadyExists`になる
    async fn insert(&self, book: Book) -> Result<Book> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO books (title, author, isbn)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(&book.title)
        .bind(&book.author)
        .bind(&book.isbn)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &book.isbn))?;

        Ok(book.with_id(BookId::from_i64(id)))
    }

    /// タイトルと著者のみ更新する（ISBNは登録後に変更しない）
    async fn update(&self, id: BookId, book: Book) -> Result<Book> {
        let row = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, author = $3
            WHERE id = $1
            RETURNING id, title, author, isbn
            "#,
        )
        .bind(id.value())
        .bind(&book.title)
        .bind(&book.author)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| format!("book {} does not exist", id))?;

        Ok(map_row_to_book(&row))
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// 値のある項目ごとにILIKEの部分一致をANDで結合して検索する
    async fn find_paged(&self, filter: BookFilter, page: PageRequest) -> Result<Page<Book>> {
        let title = contains_pattern(&filter.title);
        let author = contains_pattern(&filter.author);
        let isbn = contains_pattern(&filter.isbn);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::text IS NULL OR author ILIKE $2)
              AND ($3::text IS NULL OR isbn ILIKE $3)
            "#,
        )
        .bind(&title)
        .bind(&author)
        .bind(&isbn)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, title, author, isbn
            FROM books
            WHERE ($1::text IS NULL OR title ILIKE $1)
              AND ($2::text IS NULL OR author ILIKE $2)
              AND ($3::text IS NULL OR isbn ILIKE $3)
            ORDER BY id ASC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(&title)
        .bind(&author)
        .bind(&isbn)
        .bind(i64::from(page.size()))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let books = rows.iter().map(map_row_to_book).collect();
        Ok(Page::new(books, page, total as u64))
    }
}
