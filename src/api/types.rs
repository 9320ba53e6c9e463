use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    Book, BookFilter, BookId, DEFAULT_PAGE_SIZE, Loan, LoanFilter, LoanStatus, Page,
    PageRequest,
};

// ============================================================================
// Books
// ============================================================================

/// 書籍DTO（POST/PUT /api/books のリクエストと各レスポンス）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDto {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub isbn: String,
}

impl BookDto {
    /// 必須項目の検証。違反があればメッセージの一覧を返す
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.title.is_empty() {
            errors.push("title must not be empty".to_string());
        }
        if self.author.is_empty() {
            errors.push("author must not be empty".to_string());
        }
        if self.isbn.is_empty() {
            errors.push("isbn must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl From<&Book> for BookDto {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id.map(|id| id.value()),
            title: book.title.clone(),
            author: book.author.clone(),
            isbn: book.isbn.clone(),
        }
    }
}

impl From<BookDto> for Book {
    fn from(dto: BookDto) -> Self {
        Self {
            id: dto.id.map(BookId::from_i64),
            title: dto.title,
            author: dto.author,
            isbn: dto.isbn,
        }
    }
}

/// 書籍検索のクエリパラメータ（GET /api/books）
#[derive(Debug, Default, Deserialize)]
pub struct BookSearchQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl BookSearchQuery {
    pub fn filter(&self) -> BookFilter {
        BookFilter {
            title: self.title.clone(),
            author: self.author.clone(),
            isbn: self.isbn.clone(),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }
}

// ============================================================================
// Loans
// ============================================================================

/// 貸出作成リクエスト（POST /api/loans）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub isbn: String,
    pub customer: String,
    pub email: String,
}

impl CreateLoanRequest {
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        if self.isbn.is_empty() {
            errors.push("isbn must not be empty".to_string());
        }
        if self.customer.is_empty() {
            errors.push("customer must not be empty".to_string());
        }
        if self.email.is_empty() {
            errors.push("email must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// 返却リクエスト（PATCH /api/loans/:id）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnedLoanRequest {
    pub returned: bool,
}

/// 貸出DTO（貸出一覧・書籍ごとの貸出履歴）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanDto {
    pub id: i64,
    pub isbn: String,
    pub customer: String,
    pub email: String,
    pub book: BookDto,
    pub loan_date: NaiveDate,
    pub returned: Option<bool>,
    /// `today`時点の状態（保存値ではない）
    pub status: LoanStatus,
}

impl LoanDto {
    /// `today`時点の状態を付けて変換する
    pub fn new(loan: &Loan, today: NaiveDate) -> Self {
        Self {
            id: loan.id.map(|id| id.value()).unwrap_or_default(),
            isbn: loan.book.isbn.clone(),
            customer: loan.customer.clone(),
            email: loan.customer_email.clone(),
            book: BookDto::from(&loan.book),
            loan_date: loan.loan_date,
            returned: loan.returned,
            status: loan.status(today),
        }
    }
}

/// 貸出検索のクエリパラメータ（GET /api/loans）
#[derive(Debug, Default, Deserialize)]
pub struct LoanSearchQuery {
    pub isbn: Option<String>,
    pub customer: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl LoanSearchQuery {
    pub fn filter(&self) -> LoanFilter {
        LoanFilter {
            isbn: self.isbn.clone(),
            customer: self.customer.clone(),
        }
    }

    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }
}

// ============================================================================
// Paging / errors
// ============================================================================

/// ページングのみのクエリパラメータ
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        page_request(self.page, self.size)
    }
}

fn page_request(page: Option<u32>, size: Option<u32>) -> PageRequest {
    PageRequest::new(page.unwrap_or(0), size.unwrap_or(DEFAULT_PAGE_SIZE))
}

/// ページレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub page: u32,
    pub size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// ドメインのページを各要素ごとに変換する
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let total_pages = page.total_pages();
        let page = page.map(f);
        Self {
            content: page.content,
            page: page.page,
            size: page.size,
            total_elements: page.total_elements,
            total_pages,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub errors: Vec<String>,
}
