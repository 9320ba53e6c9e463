use crate::application::{DEFAULT_OVERDUE_MESSAGE, ServiceSettings};
use std::str::FromStr;
use thiserror::Error;

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// 永続化の実装
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            _ => Err(format!("unknown storage backend: {}", s)),
        }
    }
}

/// アプリケーション設定
///
/// 環境変数（`.env`を含む）から読み込む。未設定の項目はデフォルト値。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub storage: StorageBackend,
    /// 通知の差出人
    pub mail_from: String,
    /// 通知の件名
    pub mail_subject: String,
    pub overdue_message: String,
    /// 延滞通知を実行する時刻（ローカル時間、0-23時）
    pub notify_hour: u32,
    pub revalidate_on_update: bool,
}

impl AppConfig {
    /// プロセスの環境変数から読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意のキー検索関数から読み込む
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let notify_hour = parse(&lookup, "OVERDUE_NOTIFY_HOUR", 0u32)?;
        if notify_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "OVERDUE_NOTIFY_HOUR",
                value: notify_hour.to_string(),
            });
        }

        Ok(Self {
            database_url: get("DATABASE_URL", "postgres://localhost/library"),
            port: parse(&lookup, "PORT", 3000u16)?,
            storage: parse(&lookup, "STORAGE", StorageBackend::Postgres)?,
            mail_from: get("MAIL_FROM", "library@localhost"),
            mail_subject: get("MAIL_SUBJECT", "Livro atrasado"),
            overdue_message: get("OVERDUE_MESSAGE", DEFAULT_OVERDUE_MESSAGE),
            notify_hour,
            revalidate_on_update: parse(&lookup, "REVALIDATE_ON_UPDATE", false)?,
        })
    }

    /// サービス層に渡す設定
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            overdue_message: self.overdue_message.clone(),
            revalidate_on_update: self.revalidate_on_update,
        }
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}
