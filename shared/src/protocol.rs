use crate::date::HistoryDate;
use crate::filter::Filterable;
use crate::models::{
    Bill, Hotel, Order, Product, ReportRow, Supplier, SupportTicket, UnpaidBill, User,
};
use crate::EntityId;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt;

/// HTTP Methods for API Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

// =========================================================
// Resource Definitions
// =========================================================

/// A trait that describes one admin list page: where its rows come from and
/// what a row looks like.
pub trait Resource: Send + Sync + 'static {
    /// The row type of the collection.
    type Item: DeserializeOwned + Serialize + Filterable + Clone + Send + Sync + 'static;
    /// Human readable label, used in messages ("Failed to fetch orders").
    const NAME: &'static str;
    /// The list endpoint.
    const LIST_PATH: &'static str;
    /// A dedicated endpoint for date-filtered history views. When absent the
    /// list endpoint is queried with `?date=`.
    const HISTORY_PATH: Option<&'static str> = None;

    /// Path of the list request, switching to the history endpoint when a
    /// date is selected.
    fn list_path(date: Option<&HistoryDate>) -> String {
        match date {
            None => Self::LIST_PATH.to_string(),
            Some(date) => format!(
                "{}?date={}",
                Self::HISTORY_PATH.unwrap_or(Self::LIST_PATH),
                date.as_query_value()
            ),
        }
    }
}

/// Resources that accept create / update / delete.
pub trait MutableResource: Resource {
    /// Collection endpoint for `POST`, prefix for `<path>/<id>`.
    const ITEM_PATH: &'static str;

    fn item_path(id: &EntityId) -> String {
        format!("{}/{}", Self::ITEM_PATH, id)
    }
}

/// Resources whose rows move through statuses via `PUT <item>/<id>/status`.
pub trait StatusResource: MutableResource {
    fn status_path(id: &EntityId) -> String {
        format!("{}/status", Self::item_path(id))
    }
}

/// Order views whose line prices the admin fixes via
/// `PUT <item>/<id>/finalize-prices`.
pub trait PricingResource: MutableResource<Item = Order> {
    fn finalize_prices_path(id: &EntityId) -> String {
        format!("{}/finalize-prices", Self::item_path(id))
    }
}

macro_rules! resource {
    ($(#[$meta:meta])* $name:ident, $item:ty, $label:expr, $list:expr) => {
        resource!($(#[$meta])* $name, $item, $label, $list, None);
    };
    ($(#[$meta:meta])* $name:ident, $item:ty, $label:expr, $list:expr, $history:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Resource for $name {
            type Item = $item;
            const NAME: &'static str = $label;
            const LIST_PATH: &'static str = $list;
            const HISTORY_PATH: Option<&'static str> = $history;
        }
    };
}

resource!(Orders, Order, "orders", "/api/admin/orders");
resource!(
    /// Orders waiting for the admin to finalize prices.
    PendingPricingOrders,
    Order,
    "pending pricing orders",
    "/api/admin/orders/pending-pricing"
);
resource!(Products, Product, "products", "/api/admin/products");
resource!(Users, User, "users", "/api/admin/users");
resource!(Hotels, Hotel, "hotels", "/api/admin/hotels");
resource!(Suppliers, Supplier, "suppliers", "/api/admin/suppliers");
resource!(Bills, Bill, "bills", "/api/admin/bills");
resource!(UnpaidBills, UnpaidBill, "unpaid bills", "/api/admin/unpaid-bills");
resource!(
    SupportTickets,
    SupportTicket,
    "support tickets",
    "/api/admin/support/tickets"
);
resource!(
    /// Per-hotel filling sheet for today's deliveries.
    TodaysFilling,
    ReportRow,
    "today's filling",
    "/api/admin/orders/todays-filling",
    Some("/api/admin/orders/filling-history")
);
resource!(
    TodaysHotelsOrders,
    ReportRow,
    "today's hotels orders",
    "/api/admin/orders/todays-hotels-orders",
    Some("/api/admin/orders/hotels-orders-history")
);
resource!(
    TodaysVegetables,
    ReportRow,
    "today's vegetables",
    "/api/admin/orders/todays-vegetables",
    Some("/api/admin/orders/vegetables-history")
);

impl MutableResource for Orders {
    const ITEM_PATH: &'static str = "/api/admin/orders";
}

impl StatusResource for Orders {}

impl PricingResource for Orders {}

// Pending-pricing rows are ordinary orders; mutations go to the order endpoints.
impl MutableResource for PendingPricingOrders {
    const ITEM_PATH: &'static str = "/api/admin/orders";
}

impl PricingResource for PendingPricingOrders {}

impl MutableResource for Products {
    const ITEM_PATH: &'static str = "/api/admin/products";
}

impl MutableResource for Users {
    const ITEM_PATH: &'static str = "/api/admin/users";
}

impl MutableResource for Hotels {
    const ITEM_PATH: &'static str = "/api/admin/hotels";
}

impl MutableResource for Suppliers {
    const ITEM_PATH: &'static str = "/api/admin/suppliers";
}

impl MutableResource for Bills {
    const ITEM_PATH: &'static str = "/api/admin/bills";
}

impl MutableResource for SupportTickets {
    const ITEM_PATH: &'static str = "/api/admin/support/tickets";
}

impl SupportTickets {
    pub fn reply_path(id: &EntityId) -> String {
        format!("{}/reply", Self::item_path(id))
    }

    pub fn close_path(id: &EntityId) -> String {
        format!("{}/close", Self::item_path(id))
    }
}

// =========================================================
// Wire Types
// =========================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
}

/// Error payload of a non-2xx response. Endpoints disagree on the key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    /// `error` wins over `message`; empty strings count as absent.
    pub fn into_message(self) -> Option<String> {
        self.error
            .filter(|s| !s.trim().is_empty())
            .or(self.message.filter(|s| !s.trim().is_empty()))
    }

    /// Extracts the server message from a raw response body, if any.
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(ErrorBody::into_message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockUpdate {
    pub stock_quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLine {
    pub product_id: EntityId,
    pub price_per_unit: f64,
}

/// Body of `PUT /api/admin/orders/<id>/finalize-prices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalizePrices {
    pub items: Vec<PriceLine>,
}

/// Why a set of entered prices cannot be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingError {
    /// The order has no lines to price.
    NoItems,
    /// Lines without a usable price, as `"<name> (ID: <id>)"`.
    Missing(Vec<String>),
    /// Some price is zero or negative.
    NotPositive,
}

impl fmt::Display for PricingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PricingError::NoItems => write!(f, "Order has no items to price"),
            PricingError::Missing(lines) => {
                write!(f, "Please enter valid prices for: {}", lines.join(", "))
            }
            PricingError::NotPositive => write!(
                f,
                "Price cannot be zero. Please enter valid amounts for all items."
            ),
        }
    }
}

impl std::error::Error for PricingError {}

impl FinalizePrices {
    /// Builds the request from the admin's entries, keyed by product id.
    ///
    /// Every line of the order needs a finite price; missing entries are
    /// reported before non-positive ones.
    pub fn for_order(
        order: &Order,
        prices: &HashMap<EntityId, f64>,
    ) -> Result<Self, PricingError> {
        if order.items.is_empty() {
            return Err(PricingError::NoItems);
        }

        let missing: Vec<String> = order
            .items
            .iter()
            .filter(|line| !prices.get(&line.product_id).is_some_and(|p| p.is_finite()))
            .map(|line| {
                format!(
                    "{} (ID: {})",
                    line.product_name.as_deref().unwrap_or("Unknown product"),
                    line.product_id
                )
            })
            .collect();
        if !missing.is_empty() {
            return Err(PricingError::Missing(missing));
        }

        let items = order
            .items
            .iter()
            .filter_map(|line| {
                prices.get(&line.product_id).map(|&price_per_unit| PriceLine {
                    product_id: line.product_id.clone(),
                    price_per_unit,
                })
            })
            .collect::<Vec<_>>();
        if items.iter().any(|line| line.price_per_unit <= 0.0) {
            return Err(PricingError::NotPositive);
        }
        Ok(Self { items })
    }
}

/// Body of `POST /api/admin/support/tickets/<id>/reply`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketReply {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_path_switches_to_history_endpoint() {
        let date: HistoryDate = "2024-05-01".parse().unwrap();
        assert_eq!(TodaysFilling::list_path(None), "/api/admin/orders/todays-filling");
        assert_eq!(
            TodaysFilling::list_path(Some(&date)),
            "/api/admin/orders/filling-history?date=2024-05-01"
        );
    }

    #[test]
    fn list_path_without_history_endpoint_adds_query() {
        let date: HistoryDate = "2024-05-01".parse().unwrap();
        assert_eq!(Orders::list_path(Some(&date)), "/api/admin/orders?date=2024-05-01");
    }

    #[test]
    fn item_and_status_paths() {
        let id = EntityId::from(12);
        assert_eq!(Products::item_path(&id), "/api/admin/products/12");
        assert_eq!(Orders::status_path(&id), "/api/admin/orders/12/status");
    }

    #[test]
    fn pricing_and_ticket_paths() {
        let id = EntityId::from(31);
        assert_eq!(
            PendingPricingOrders::finalize_prices_path(&id),
            "/api/admin/orders/31/finalize-prices"
        );
        assert_eq!(SupportTickets::reply_path(&id), "/api/admin/support/tickets/31/reply");
        assert_eq!(SupportTickets::close_path(&id), "/api/admin/support/tickets/31/close");
    }

    fn pending_order() -> Order {
        serde_json::from_value(serde_json::json!({
            "id": 31,
            "items": [
                {"product_id": 5, "product_name": "Tomato", "quantity": 10},
                {"product_id": 6, "product_name": "Onion", "quantity": 4}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn finalize_prices_keeps_order_line_sequence() {
        let prices = HashMap::from([(EntityId::from(6), 18.0), (EntityId::from(5), 42.5)]);

        let body = FinalizePrices::for_order(&pending_order(), &prices).unwrap();

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"items": [
                {"product_id": 5, "price_per_unit": 42.5},
                {"product_id": 6, "price_per_unit": 18.0}
            ]})
        );
    }

    #[test]
    fn finalize_prices_lists_missing_lines() {
        let prices = HashMap::from([(EntityId::from(5), 42.5), (EntityId::from(6), f64::NAN)]);

        let err = FinalizePrices::for_order(&pending_order(), &prices).unwrap_err();

        assert_eq!(err, PricingError::Missing(vec!["Onion (ID: 6)".to_string()]));
        assert_eq!(err.to_string(), "Please enter valid prices for: Onion (ID: 6)");
    }

    #[test]
    fn finalize_prices_rejects_zero() {
        let prices = HashMap::from([(EntityId::from(5), 42.5), (EntityId::from(6), 0.0)]);

        let err = FinalizePrices::for_order(&pending_order(), &prices).unwrap_err();

        assert_eq!(err, PricingError::NotPositive);
        assert_eq!(
            FinalizePrices::for_order(&Order::default(), &prices),
            Err(PricingError::NoItems)
        );
    }

    #[test]
    fn error_body_prefers_error_key() {
        assert_eq!(
            ErrorBody::message_from(r#"{"error": "Invalid credentials", "message": "x"}"#),
            Some("Invalid credentials".to_string())
        );
        assert_eq!(
            ErrorBody::message_from(r#"{"message": "Token expired"}"#),
            Some("Token expired".to_string())
        );
        assert_eq!(ErrorBody::message_from(r#"{"error": ""}"#), None);
        assert_eq!(ErrorBody::message_from("<html>502</html>"), None);
    }
}
