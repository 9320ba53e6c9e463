use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{Book, LoanId};

/// 貸出日からこの日数を超えて未返却の貸出を延滞とする
pub const OVERDUE_AFTER_DAYS: u64 = 4;

/// 貸出 - 1冊の書籍の1回の貸出
///
/// 書籍を参照するが所有はしない。同じ書籍に対して時系列で複数の貸出が
/// 存在しうるが、有効な（未返却の）貸出は常に高々1件。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: Option<LoanId>,
    pub book: Book,
    pub customer: String,
    pub customer_email: String,
    pub loan_date: NaiveDate,
    /// `None`: 未設定、`Some(true)`: 返却済み、`Some(false)`: 明示的に未返却
    pub returned: Option<bool>,
}

impl Loan {
    /// 新しい貸出を作成する（返却フラグは未設定）
    pub fn new(
        book: Book,
        customer: impl Into<String>,
        customer_email: impl Into<String>,
        loan_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            book,
            customer: customer.into(),
            customer_email: customer_email.into(),
            loan_date,
            returned: None,
        }
    }

    /// 有効な貸出か（返却フラグが未設定またはfalse）
    pub fn is_active(&self) -> bool {
        !self.returned.unwrap_or(false)
    }

    /// `today`時点での状態
    pub fn status(&self, today: NaiveDate) -> LoanStatus {
        if !self.is_active() {
            LoanStatus::Returned
        } else if is_overdue(self, today) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }
}

/// 貸出状態（保存はされない、`returned`と日付から導出する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// 貸出中
    Active,
    /// 延滞中（返却は可能）
    Overdue,
    /// 返却済み
    Returned,
}

/// 延滞判定の基準日
///
/// 貸出日がこの日付より厳密に前であれば延滞。
pub fn overdue_cutoff(today: NaiveDate) -> NaiveDate {
    today
        .checked_sub_days(Days::new(OVERDUE_AFTER_DAYS))
        .unwrap_or(NaiveDate::MIN)
}

/// 純粋関数：延滞しているか
///
/// 返却済みの貸出は日付に関わらず延滞ではない。
pub fn is_overdue(loan: &Loan, today: NaiveDate) -> bool {
    loan.is_active() && loan.loan_date < overdue_cutoff(today)
}

/// 貸出検索フィルタ
///
/// 書籍ISBNの完全一致 **または** 顧客名の完全一致。
/// 未指定のフィールドはどの貸出にも一致しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoanFilter {
    pub isbn: Option<String>,
    pub customer: Option<String>,
}

impl LoanFilter {
    pub fn matches(&self, loan: &Loan) -> bool {
        self.isbn.as_deref() == Some(loan.book.isbn.as_str())
            || self.customer.as_deref() == Some(loan.customer.as_str())
    }
}
