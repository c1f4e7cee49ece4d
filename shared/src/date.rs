//! 日期类型模块
//!
//! - `HistoryDate`: 历史视图选择的日期，严格的 `YYYY-MM-DD`
//! - `parse_loose_date`: 解析后端返回的各种日期格式

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const HISTORY_DATE_FORMAT: &str = "%Y-%m-%d";

// =========================================================
// HistoryDate
// =========================================================

/// 历史视图日期，作为 `?date=YYYY-MM-DD` 查询参数发送
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HistoryDate(NaiveDate);

impl HistoryDate {
    /// 本地时区的今天
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    /// 查询参数形式
    pub fn as_query_value(&self) -> String {
        self.0.format(HISTORY_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for HistoryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(HISTORY_DATE_FORMAT))
    }
}

/// 日期解析错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateParseError {
    input: String,
}

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid date '{}', expected YYYY-MM-DD", self.input)
    }
}

impl std::error::Error for DateParseError {}

impl FromStr for HistoryDate {
    type Err = DateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        // chrono 接受 "2024-1-5"，这里要求补零的标准形式
        if trimmed.len() != 10 {
            return Err(DateParseError {
                input: s.to_string(),
            });
        }
        NaiveDate::parse_from_str(trimmed, HISTORY_DATE_FORMAT)
            .map(Self)
            .map_err(|_| DateParseError {
                input: s.to_string(),
            })
    }
}

impl From<NaiveDate> for HistoryDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl Serialize for HistoryDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_query_value())
    }
}

impl<'de> Deserialize<'de> for HistoryDate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// =========================================================
// 宽松解析
// =========================================================

/// 解析后端返回的日期字符串，只保留日期部分
///
/// 支持 `YYYY-MM-DD`、RFC 3339、RFC 2822（Flask 默认的
/// `Fri, 05 Jan 2024 00:00:00 GMT`）以及不带时区的 `YYYY-MM-DD HH:MM:SS`。
pub fn parse_loose_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, HISTORY_DATE_FORMAT) {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|dt| dt.date())
}
