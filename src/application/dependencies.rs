use crate::ports::*;
use std::sync::Arc;

/// 延滞通知メッセージのデフォルト
pub const DEFAULT_OVERDUE_MESSAGE: &str =
    "Atenção! Você tem um empréstimo atrasado. Favor devolver o livro o mais rápido possível.";

/// サービスの挙動を切り替える設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSettings {
    /// 延滞通知の本文
    pub overdue_message: String,
    /// 更新で貸出が有効に戻るとき、二重貸出を再検査するか
    ///
    /// `false`の場合、更新は無条件に保存される。
    pub revalidate_on_update: bool,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            overdue_message: DEFAULT_OVERDUE_MESSAGE.to_string(),
            revalidate_on_update: false,
        }
    }
}

/// サービスの依存関係
///
/// 振る舞いは持たず、各ユースケース関数に引数として渡す。
/// すべての依存が明示的になり、テストではインメモリ実装に差し替えられる。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub book_repository: Arc<dyn BookRepository>,
    pub loan_repository: Arc<dyn LoanRepository>,
    pub notification_service: Arc<dyn NotificationService>,
    pub settings: ServiceSettings,
}
