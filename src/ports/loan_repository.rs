use crate::domain::{BookId, Loan, LoanFilter, LoanId, Page, PageRequest};
use async_trait::async_trait;
use chrono::NaiveDate;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 有効な貸出が既に存在するため挿入できなかった
///
/// `LoanRepository::insert`がストレージ側で競合を検出したときに返す。
/// サービス層はこれを`BookAlreadyLoaned`に変換する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("book {0} already has an active loan")]
pub struct ActiveLoanExists(pub BookId);

/// 貸出リポジトリポート
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// 書籍に有効な（未返却の）貸出が存在するか
    async fn exists_active_for_book(&self, book_id: BookId) -> Result<bool>;

    /// 書籍に貸出履歴が1件でも存在するか
    async fn exists_any_for_book(&self, book_id: BookId) -> Result<bool>;

    /// 新しい貸出を保存し、IDを採番した結果を返す
    ///
    /// 有効な貸出の存在確認と挿入は1つの原子的な操作として行う。
    /// 競合時は`ActiveLoanExists`を返す。
    async fn insert(&self, loan: Loan) -> Result<Loan>;

    /// 既存の貸出を上書きする（不変条件の再検査はしない）
    async fn update(&self, id: LoanId, loan: Loan) -> Result<Loan>;

    /// 二重貸出を再検査して既存の貸出を上書きする
    ///
    /// `loan`が有効な状態のとき、同じ書籍に`id`以外の有効な貸出があれば
    /// `ActiveLoanExists`を返し、何も変更しない。確認と更新は原子的に行う。
    async fn update_exclusive(&self, id: LoanId, loan: Loan) -> Result<Loan>;

    /// IDで貸出を取得する
    async fn find_by_id(&self, id: LoanId) -> Result<Option<Loan>>;

    /// ISBNまたは顧客名の完全一致で検索する
    async fn find_paged(&self, filter: LoanFilter, page: PageRequest) -> Result<Page<Loan>>;

    /// 書籍の全貸出（返却済みを含む）
    async fn find_by_book(&self, book_id: BookId, page: PageRequest) -> Result<Page<Loan>>;

    /// 貸出日が`cutoff`より前で未返却の貸出
    ///
    /// 延滞通知バッチで使用される。
    async fn find_not_returned_before(&self, cutoff: NaiveDate) -> Result<Vec<Loan>>;
}
