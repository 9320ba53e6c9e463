use crate::ports::notification_service::{NotificationService as NotificationServiceTrait, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// 送信されたバッチ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatch {
    pub message: String,
    pub recipients: Vec<String>,
}

/// 送信内容を記録するNotificationServiceのモック実装
///
/// 実際には送信しない。`fail_next`で次の送信を失敗させられる。
#[derive(Default)]
pub struct NotificationService {
    sent: Mutex<Vec<SentBatch>>,
    fail_next: Mutex<bool>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// これまでに送信されたバッチ
    pub fn sent(&self) -> Vec<SentBatch> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// 次の送信を失敗させる
    pub fn fail_next(&self) {
        if let Ok(mut flag) = self.fail_next.lock() {
            *flag = true;
        }
    }
}

#[async_trait]
impl NotificationServiceTrait for NotificationService {
    async fn send_batch(&self, message: &str, recipients: &[String]) -> Result<()> {
        {
            let mut fail = self.fail_next.lock().map_err(|_| "mock lock poisoned")?;
            if *fail {
                *fail = false;
                return Err("mail transport unavailable".into());
            }
        }

        self.sent
            .lock()
            .map_err(|_| "mock lock poisoned")?
            .push(SentBatch {
                message: message.to_string(),
                recipients: recipients.to_vec(),
            });
        Ok(())
    }
}
