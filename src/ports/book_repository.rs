use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 同じISBNの書籍が既に存在するため挿入できなかった
///
/// `BookRepository::insert`がストレージ側で重複を検出したときに返す。
/// サービス層はこれを`DuplicateIsbn`に変換する。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("isbn {0} is already registered")]
pub struct IsbnAlreadyExists(pub String);

/// 書籍リポジトリポート
///
/// カタログの永続化を抽象化する。ISBNの一意性は`insert`が原子的に保証する。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// 同じISBNの書籍が存在するか
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool>;

    /// ISBNの完全一致で書籍を取得する
    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>>;

    /// IDで書籍を取得する
    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>>;

    /// 新しい書籍を保存し、IDを採番した結果を返す
    ///
    /// 渡された`book.id`は無視される。同じISBNが既にあれば
    /// `IsbnAlreadyExists`を返し、何も保存しない。
    async fn insert(&self, book: Book) -> Result<Book>;

    /// 既存の書籍を上書きする
    async fn update(&self, id: BookId, book: Book) -> Result<Book>;

    /// 書籍を削除する
    async fn delete(&self, id: BookId) -> Result<()>;

    /// フィルタ検索（部分一致・大文字小文字無視・AND）
    async fn find_paged(&self, filter: BookFilter, page: PageRequest) -> Result<Page<Book>>;
}
