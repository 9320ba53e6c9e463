use crate::domain::{Book, BookId, Loan, LoanFilter, LoanId, Page, PageRequest};
use crate::ports::loan_repository::{
    ActiveLoanExists, LoanRepository as LoanRepositoryTrait, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row, postgres::PgRow};

/// 貸出と参照先の書籍を結合して取得するSELECT句
const SELECT_LOAN_WITH_BOOK: &str = r#"
    SELECT
        l.id,
        l.customer,
        l.customer_email,
        l.loan_date,
        l.returned,
        b.id AS book_id,
        b.title,
        b.author,
        b.isbn
    FROM loans l
    JOIN books b ON b.id = l.book_id
"#;

/// 貸出の全項目を上書きするUPDATE文
const UPDATE_LOAN: &str = r#"
    UPDATE loans
    SET book_id = $2,
        customer = $3,
        customer_email = $4,
        loan_date = $5,
        returned = $6
    WHERE id = $1
"#;

/// PostgreSQLの行データをLoanに変換する
fn map_row_to_loan(row: &PgRow) -> Loan {
    Loan {
        id: Some(LoanId::from_i64(row.get("id"))),
        book: Book {
            id: Some(BookId::from_i64(row.get("book_id"))),
            title: row.get("title"),
            author: row.get("author"),
            isbn: row.get("isbn"),
        },
        customer: row.get("customer"),
        customer_email: row.get("customer_email"),
        loan_date: row.get("loan_date"),
        returned: row.get("returned"),
    }
}

/// LoanRepositoryのPostgreSQL実装
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// PostgreSQLコネクションプールから新しいLoanRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn exists_active_for_book(&self, book_id: BookId) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM loans WHERE book_id = $1 AND returned IS NOT TRUE)",
        )
        .bind(book_id.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn exists_any_for_book(&self, book_id: BookId) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM loans WHERE book_id = $1)")
                .bind(book_id.value())
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    /// 書籍の行をロックしてから有効な貸出を確認し、挿入する
    ///
    /// 同じ書籍への同時の貸出は`FOR UPDATE`で直列化される。
    /// 後続のトランザクションは先行の挿入をコミット後に確認するため、
    /// 有効な貸出が2件になることはない。
    async fn insert(&self, loan: Loan) -> Result<Loan> {
        let book_id = loan.book.id.ok_or("loan must reference a stored book")?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id.value())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| format!("book {} does not exist", book_id))?;

        if loan.is_active() {
            let active: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM loans WHERE book_id = $1 AND returned IS NOT TRUE)",
            )
            .bind(book_id.value())
            .fetch_one(&mut *tx)
            .await?;

            if active {
                tx.rollback().await?;
                return Err(ActiveLoanExists(book_id).into());
            }
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO loans (book_id, customer, customer_email, loan_date, returned)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(book_id.value())
        .bind(&loan.customer)
        .bind(&loan.customer_email)
        .bind(loan.loan_date)
        .bind(loan.returned)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Loan {
            id: Some(LoanId::from_i64(id)),
            ..loan
        })
    }

    async fn update(&self, id: LoanId, loan: Loan) -> Result<Loan> {
        let book_id = loan.book.id.ok_or("loan must reference a stored book")?;

        let result = sqlx::query(UPDATE_LOAN)
            .bind(id.value())
            .bind(book_id.value())
            .bind(&loan.customer)
            .bind(&loan.customer_email)
            .bind(loan.loan_date)
            .bind(loan.returned)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(format!("loan {} does not exist", id).into());
        }

        self.find_by_id(id)
            .await?
            .ok_or_else(|| format!("loan {} disappeared after update", id).into())
    }

    /// `insert`と同じく書籍の行をロックしてから、他の有効な貸出を確認して更新する
    async fn update_exclusive(&self, id: LoanId, loan: Loan) -> Result<Loan> {
        let book_id = loan.book.id.ok_or("loan must reference a stored book")?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id.value())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| format!("book {} does not exist", book_id))?;

        if loan.is_active() {
            let conflict: bool = sqlx::query_scalar(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM loans
                    WHERE book_id = $1 AND id <> $2 AND returned IS NOT TRUE
                )
                "#,
            )
            .bind(book_id.value())
            .bind(id.value())
            .fetch_one(&mut *tx)
            .await?;

            if conflict {
                tx.rollback().await?;
                return Err(ActiveLoanExists(book_id).into());
            }
        }

        let result = sqlx::query(UPDATE_LOAN)
            .bind(id.value())
            .bind(book_id.value())
            .bind(&loan.customer)
            .bind(&loan.customer_email)
            .bind(loan.loan_date)
            .bind(loan.returned)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(format!("loan {} does not exist", id).into());
        }

        tx.commit().await?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| format!("loan {} disappeared after update", id).into())
    }

    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>> {
        let sql = format!("{SELECT_LOAN_WITH_BOOK} WHERE l.id = $1");
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(map_row_to_loan))
    }

    /// ISBNまたは顧客名の完全一致（未指定の項目はNULL比較となり一致しない）
    async fn find_paged(&self, filter: LoanFilter, page: PageRequest) -> Result<Page<Loan>> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM loans l
            JOIN books b ON b.id = l.book_id
            WHERE b.isbn = $1 OR l.customer = $2
            "#,
        )
        .bind(&filter.isbn)
        .bind(&filter.customer)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            "{SELECT_LOAN_WITH_BOOK} WHERE b.isbn = $1 OR l.customer = $2 ORDER BY l.id ASC LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(&filter.isbn)
            .bind(&filter.customer)
            .bind(i64::from(page.size()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let loans = rows.iter().map(map_row_to_loan).collect();
        Ok(Page::new(loans, page, total as u64))
    }

    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM loans WHERE book_id = $1")
            .bind(book_id.value())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "{SELECT_LOAN_WITH_BOOK} WHERE l.book_id = $1 ORDER BY l.id ASC LIMIT $2 OFFSET $3"
        );
        let rows = sqlx::query(&sql)
            .bind(book_id.value())
            .bind(i64::from(page.size()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let loans = rows.iter().map(map_row_to_loan).collect();
        Ok(Page::new(loans, page, total as u64))
    }

    /// 延滞検出用（未返却で貸出日がcutoffより前）
    async fn find_not_returned_before(&self, cutoff: NaiveDate) -> Result<Vec<Loan>> {
        let sql = format!(
            "{SELECT_LOAN_WITH_BOOK} WHERE l.loan_date < $1 AND l.returned IS NOT TRUE ORDER BY l.loan_date ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(map_row_to_loan).collect())
    }
}
