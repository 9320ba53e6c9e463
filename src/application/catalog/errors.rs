use thiserror::Error;

/// カタログ管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CatalogApplicationError {
    /// 同じISBNの書籍が既に登録されている
    #[error("Isbn já cadastrado.")]
    DuplicateIsbn,

    /// 引数が不正（IDのない書籍の更新・削除など）
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 貸出履歴のある書籍は削除できない
    #[error("Book has loan history and cannot be deleted")]
    BookHasLoans,

    /// リポジトリのエラー
    #[error("Repository error")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// カタログ管理の Result型
pub type Result<T> = std::result::Result<T, CatalogApplicationError>;
