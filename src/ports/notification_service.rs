use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 通知サービスポート
///
/// 会員への通知配信メカニズムを抽象化する。
/// 差出人と件名は実装側で設定される。
#[async_trait]
pub trait NotificationService: Send + Sync {
    /// 同じメッセージを宛先全員に1回の送信でまとめて送る
    async fn send_batch(&self, message: &str, recipients: &[String]) -> Result<()>;
}
