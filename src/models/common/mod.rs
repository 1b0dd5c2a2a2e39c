pub mod warning;

pub use warning::{Warning, WarningCode};

use chrono::{DateTime, Utc};

/// 程序启动时间
#[derive(Debug, Clone)]
pub struct AppStartTime {
    pub start_datetime: DateTime<Utc>,
}

/// 区分字段缺失与显式 null：缺失为 None，null 为 Some(None)
pub fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}
