use crate::application::ServiceDependencies;
use crate::domain::{self, Book, BookId, Loan, LoanFilter, LoanId, Page, PageRequest};
use crate::ports::ActiveLoanExists;
use chrono::NaiveDate;

use super::errors::{LoanApplicationError, Result};

/// 現在の日付（ローカルタイムゾーン、時刻なし）
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 書籍に有効な（未返却の）貸出が存在しないこと
///
/// 貸出日は渡された値をそのまま使い、返却フラグは未設定で保存する。
///
/// # 一貫性保証
///
/// 存在確認の後、リポジトリの`insert`が確認と挿入を原子的にやり直す。
/// 同時に2件の貸出が来ても、後から挿入された方は`ActiveLoanExists`で
/// 拒否され、`BookAlreadyLoaned`として返る。
///
/// # 戻り値
/// IDが採番された貸出
pub async fn save(deps: &ServiceDependencies, mut loan: Loan) -> Result<Loan> {
    let book_id = require_book_id(&loan.book)?;

    // 1. 有効な貸出の存在確認
    let already_loaned = deps
        .loan_repository
        .exists_active_for_book(book_id)
        .await
        .map_err(LoanApplicationError::RepositoryError)?;

    if already_loaned {
        tracing::warn!(book_id = %book_id, "book already loaned");
        return Err(LoanApplicationError::BookAlreadyLoaned);
    }

    // 2. 新規貸出として保存
    loan.id = None;
    loan.returned = None;

    let stored = deps
        .loan_repository
        .insert(loan)
        .await
        .map_err(|e| {
            if e.downcast_ref::<ActiveLoanExists>().is_some() {
                tracing::warn!(book_id = %book_id, "concurrent loan detected at storage");
                LoanApplicationError::BookAlreadyLoaned
            } else {
                LoanApplicationError::RepositoryError(e)
            }
        })?;

    tracing::debug!(loan_id = ?stored.id, book_id = %book_id, customer = %stored.customer, "loan created");
    Ok(stored)
}

/// IDで貸出を取得する
pub async fn get_by_id(deps: &ServiceDependencies, id: LoanId) -> Result<Option<Loan>> {
    deps.loan_repository
        .find_by_id(id)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 貸出を更新する
///
/// 返却の記録にも、その他の項目の修正にも使われる。
/// デフォルトでは不変条件を再検査しない。返却済みの貸出を未返却に戻しても
/// 二重貸出チェックは走らない。`ServiceSettings::revalidate_on_update`が
/// 有効な場合のみ、有効な状態に戻る更新で他の有効な貸出を確認する。
/// その確認と更新はリポジトリの`update_exclusive`が原子的に行う。
pub async fn update(deps: &ServiceDependencies, loan: Loan) -> Result<Loan> {
    let id = loan
        .id
        .ok_or_else(|| LoanApplicationError::InvalidArgument("loan id must be present".into()))?;

    if deps.settings.revalidate_on_update && loan.is_active() {
        let book_id = require_book_id(&loan.book)?;
        return deps
            .loan_repository
            .update_exclusive(id, loan)
            .await
            .map_err(|e| {
                if e.downcast_ref::<ActiveLoanExists>().is_some() {
                    tracing::warn!(loan_id = %id, book_id = %book_id, "reactivation would double-loan book");
                    LoanApplicationError::BookAlreadyLoaned
                } else {
                    LoanApplicationError::RepositoryError(e)
                }
            });
    }

    deps.loan_repository
        .update(id, loan)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 貸出を検索する
///
/// 書籍ISBNの完全一致 **または** 顧客名の完全一致。
pub async fn search(
    deps: &ServiceDependencies,
    filter: LoanFilter,
    page: PageRequest,
) -> Result<Page<Loan>> {
    deps.loan_repository
        .find_paged(filter, page)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 書籍の貸出履歴（返却済みを含む）
pub async fn get_loans_for_book(
    deps: &ServiceDependencies,
    book: &Book,
    page: PageRequest,
) -> Result<Page<Loan>> {
    let book_id = require_book_id(book)?;

    deps.loan_repository
        .find_by_book(book_id, page)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

/// 今日時点で延滞している貸出をすべて返す
///
/// ページングなし。延滞通知バッチ向け。
pub async fn get_all_overdue(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    get_overdue_as_of(deps, today()).await
}

/// `today`時点で延滞している貸出をすべて返す
///
/// 貸出日が（today - 4日）より厳密に前で、未返却のもの。
pub async fn get_overdue_as_of(deps: &ServiceDependencies, today: NaiveDate) -> Result<Vec<Loan>> {
    let cutoff = domain::loan::overdue_cutoff(today);

    deps.loan_repository
        .find_not_returned_before(cutoff)
        .await
        .map_err(LoanApplicationError::RepositoryError)
}

fn require_book_id(book: &Book) -> Result<BookId> {
    book.id.ok_or_else(|| {
        LoanApplicationError::InvalidArgument("loan must reference a stored book".to_string())
    })
}
