use thiserror::Error;

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 書籍に有効な貸出が既に存在する
    #[error("Book already loaned")]
    BookAlreadyLoaned,

    /// 引数が不正（IDのない貸出や書籍など）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// リポジトリのエラー
    #[error("Repository error")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// 通知サービスのエラー
    #[error("Notification service error")]
    NotificationError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
