use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod bills;
pub mod date;
pub mod filter;
pub mod models;
pub mod protocol;
pub mod response;
pub mod serde_helper;

pub use bills::{HotelDue, UnpaidReport, UnpaidSummary};
pub use date::{DateParseError, HistoryDate, parse_loose_date};
pub use filter::{FILTER_ALL, FilterState, Filterable, filtered, status_counts};
pub use models::{
    Bill, Hotel, Order, OrderLine, Product, ReportRow, Supplier, SupportTicket, UnpaidBill, User,
};
pub use protocol::{
    Bills, ErrorBody, FinalizePrices, Hotels, HttpMethod, LoginRequest, LoginResponse,
    MutableResource, Orders, PendingPricingOrders, PriceLine, PricingError, PricingResource,
    Products, Resource, StatusResource, StatusUpdate, StockUpdate, Suppliers, SupportTickets,
    TicketReply, TodaysFilling, TodaysHotelsOrders, TodaysVegetables, UnpaidBills, Users,
};
pub use response::{decode_list, normalize_list_response};

// =========================================================
// 常量定义 (Constants)
// =========================================================

pub const HEADER_AUTHORIZATION: &str = "Authorization";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// 会话 token 在持久化存储中的键名
pub const STORAGE_TOKEN_KEY: &str = "adminToken";

pub const LOGIN_PATH: &str = "/api/auth/login";

/// 列表页自动刷新的默认周期（毫秒）
pub const DEFAULT_REFRESH_INTERVAL_MS: u64 = 300_000;

// =========================================================
// 实体标识 (Entity Id)
// =========================================================

/// 后端返回的实体 id
///
/// 不同接口的 id 有时是整数，有时是字符串（例如 Mongo 风格的 `_id`），
/// 这里统一成一个类型，序列化时保持原样。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Number(i64),
    Text(String),
}

impl Default for EntityId {
    fn default() -> Self {
        EntityId::Text(String::new())
    }
}

impl EntityId {
    /// 是否为空 id（行数据缺失 id 字段时的默认值）
    pub fn is_empty(&self) -> bool {
        matches!(self, EntityId::Text(s) if s.is_empty())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Number(n) => write!(f, "{}", n),
            EntityId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for EntityId {
    fn from(n: i64) -> Self {
        EntityId::Number(n)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId::Text(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId::Text(s)
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    /// 纯数字解析为 `Number`，其余保持为 `Text`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.parse::<i64>()
            .map(EntityId::Number)
            .unwrap_or_else(|_| EntityId::Text(s.to_string())))
    }
}
