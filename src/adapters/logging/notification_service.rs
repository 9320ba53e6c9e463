use crate::ports::notification_service::{NotificationService as NotificationServiceTrait, Result};
use async_trait::async_trait;

/// 通知をログに出力するNotificationService実装
///
/// メール送信基盤を持たない環境向け。差出人と件名は起動時の設定値を使い、
/// 1回のバッチを1件のログとして出力する。
pub struct NotificationService {
    from: String,
    subject: String,
}

impl NotificationService {
    pub fn new(from: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            subject: subject.into(),
        }
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn send_batch(&self, message: &str, recipients: &[String]) -> Result<()> {
        tracing::info!(
            from = %self.from,
            subject = %self.subject,
            to = ?recipients,
            count = recipients.len(),
            "{}",
            message
        );
        Ok(())
    }
}
