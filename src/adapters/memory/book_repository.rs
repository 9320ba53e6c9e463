use crate::domain::{Book, BookFilter, BookId, Page, PageRequest};
use crate::ports::book_repository::{
    BookRepository as BookRepositoryTrait, IsbnAlreadyExists, Result,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    books: BTreeMap<BookId, Book>,
    last_id: i64,
}

/// BookRepositoryのインメモリ実装
///
/// テストと`STORAGE=memory`での起動に使用する。IDは1から順に採番する。
/// `insert`はISBNの重複確認と挿入を1つのロックの中で行う。
#[derive(Default)]
pub struct BookRepository {
    inner: Mutex<Inner>,
}

impl BookRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookRepositoryTrait for BookRepository {
    async fn exists_by_isbn(&self, isbn: &str) -> Result<bool> {
        let inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        Ok(inner.books.values().any(|b| b.isbn == isbn))
    }

    async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Book>> {
        let inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        Ok(inner.books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>> {
        let inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        Ok(inner.books.get(&id).cloned())
    }

    async fn insert(&self, book: Book) -> Result<Book> {
        let mut inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        if inner.books.values().any(|b| b.isbn == book.isbn) {
            return Err(IsbnAlreadyExists(book.isbn).into());
        }

        inner.last_id += 1;
        let id = BookId::from_i64(inner.last_id);
        let stored = book.with_id(id);
        inner.books.insert(id, stored.clone());
        Ok(stored)
    }

    /// タイトルと著者のみ上書きする（ISBNは変更しない）
    async fn update(&self, id: BookId, book: Book) -> Result<Book> {
        let mut inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        let stored = inner
            .books
            .get_mut(&id)
            .ok_or_else(|| format!("book {} does not exist", id))?;
        stored.title = book.title;
        stored.author = book.author;
        Ok(stored.clone())
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        inner.books.remove(&id);
        Ok(())
    }

    async fn find_paged(&self, filter: BookFilter, page: PageRequest) -> Result<Page<Book>> {
        let inner = self.inner.lock().map_err(|_| "book store lock poisoned")?;
        let matches = inner
            .books
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        Ok(Page::from_all(matches, page))
    }
}
