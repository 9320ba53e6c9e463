use crate::application::ServiceDependencies;
use chrono::NaiveDate;

use super::errors::{LoanApplicationError, Result};
use super::loan_service::{get_overdue_as_of, today};

/// 延滞通知バッチのエントリーポイント
///
/// 外部のスケジューラから1日1回呼ばれる。エラーはログに記録するだけで
/// 呼び出し元には返さない。再送はせず、次回の起動で改めて通知される。
pub async fn notify_overdue_loans(deps: &ServiceDependencies) {
    match send_overdue_notifications(deps, today()).await {
        Ok(sent) => tracing::info!(recipients = sent, "overdue notification run finished"),
        Err(e) => {
            let cause = std::error::Error::source(&e).map(ToString::to_string);
            tracing::error!(error = %e, ?cause, "overdue notification run abandoned");
        }
    }
}

/// `today`時点の延滞貸出の顧客へ、設定済みのメッセージをまとめて送る
///
/// 処理フロー：
/// 1. 延滞貸出を取得
/// 2. 各貸出を顧客のメールアドレスに変換
/// 3. 全宛先を1回のバッチ送信で通知サービスに渡す
///
/// 延滞が0件なら送信をスキップしてエラーにはしない。
/// 「通知済み」の状態は保持しないため、延滞が続く限り毎回通知される。
///
/// # 戻り値
/// 通知した宛先の件数
pub async fn send_overdue_notifications(
    deps: &ServiceDependencies,
    today: NaiveDate,
) -> Result<usize> {
    let overdue = get_overdue_as_of(deps, today).await?;

    let recipients: Vec<String> = overdue
        .into_iter()
        .map(|loan| loan.customer_email)
        .collect();

    if recipients.is_empty() {
        tracing::info!(%today, "no overdue loans, skipping notification");
        return Ok(0);
    }

    deps.notification_service
        .send_batch(&deps.settings.overdue_message, &recipients)
        .await
        .map_err(LoanApplicationError::NotificationError)?;

    Ok(recipients.len())
}
