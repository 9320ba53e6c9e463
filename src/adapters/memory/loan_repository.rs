use crate::domain::{BookId, Loan, LoanFilter, LoanId, Page, PageRequest};
use crate::ports::loan_repository::{
    ActiveLoanExists, LoanRepository as LoanRepositoryTrait, Result,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Default)]
struct Inner {
    loans: BTreeMap<LoanId, Loan>,
    last_id: i64,
}

impl Inner {
    fn for_book(&self, book_id: BookId) -> impl Iterator<Item = &Loan> + '_ {
        self.loans
            .values()
            .filter(move |l| l.book.id == Some(book_id))
    }

    fn overwrite(&mut self, id: LoanId, loan: Loan) -> Result<Loan> {
        let stored = self
            .loans
            .get_mut(&id)
            .ok_or_else(|| format!("loan {} does not exist", id))?;
        *stored = Loan {
            id: Some(id),
            ..loan
        };
        Ok(stored.clone())
    }
}

/// LoanRepositoryのインメモリ実装
///
/// `insert`と`update_exclusive`は1つのロックの中で有効な貸出の確認と
/// 書き込みを行うため、同時に貸し出されても有効な貸出は書籍ごとに1件を超えない。
#[derive(Default)]
pub struct LoanRepository {
    inner: Mutex<Inner>,
}

impl LoanRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn exists_active_for_book(&self, book_id: BookId) -> Result<bool> {
        let inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        let exists = inner.for_book(book_id).any(Loan::is_active);
        Ok(exists)
    }

    async fn exists_any_for_book(&self, book_id: BookId) -> Result<bool> {
        let inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        let exists = inner.for_book(book_id).next().is_some();
        Ok(exists)
    }

    async fn insert(&self, loan: Loan) -> Result<Loan> {
        let book_id = loan.book.id.ok_or("loan must reference a stored book")?;

        let mut inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        if loan.is_active() && inner.for_book(book_id).any(Loan::is_active) {
            return Err(ActiveLoanExists(book_id).into());
        }

        inner.last_id += 1;
        let id = LoanId::from_i64(inner.last_id);
        let stored = Loan {
            id: Some(id),
            ..loan
        };
        inner.loans.insert(id, stored.clone());
        Ok(stored)
    }

    async fn update(&self, id: LoanId, loan: Loan) -> Result<Loan> {
        let mut inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        inner.overwrite(id, loan)
    }

    async fn update_exclusive(&self, id: LoanId, loan: Loan) -> Result<Loan> {
        let book_id = loan.book.id.ok_or("loan must reference a stored book")?;

        let mut inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        let conflict = loan.is_active()
            && inner
                .for_book(book_id)
                .any(|l| l.is_active() && l.id != Some(id));
        if conflict {
            return Err(ActiveLoanExists(book_id).into());
        }

        inner.overwrite(id, loan)
    }

    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>> {
        let inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        Ok(inner.loans.get(&id).cloned())
    }

    async fn find_paged(&self, filter: LoanFilter, page: PageRequest) -> Result<Page<Loan>> {
        let inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        let matches = inner
            .loans
            .values()
            .filter(|l| filter.matches(l))
            .cloned()
            .collect();
        Ok(Page::from_all(matches, page))
    }

    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>> {
        let inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        let loans = inner.for_book(book_id).cloned().collect();
        Ok(Page::from_all(loans, page))
    }

    async fn find_not_returned_before(&self, cutoff: NaiveDate) -> Result<Vec<Loan>> {
        let inner = self.inner.lock().map_err(|_| "loan store lock poisoned")?;
        let mut loans: Vec<Loan> = inner
            .loans
            .values()
            .filter(|l| l.is_active() && l.loan_date < cutoff)
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.loan_date);
        Ok(loans)
    }
}
