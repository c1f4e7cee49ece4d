//! Row types returned by the admin list endpoints.
//!
//! Every struct is lenient: all fields default, unknown fields are ignored and
//! numeric fields accept numeric strings. The upstream API is not uniformly
//! shaped and a missing column must not make the whole page fail to load.

use crate::EntityId;
use crate::filter::Filterable;
use crate::serde_helper::{lenient_bool, lenient_f64, lenient_opt_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =========================================================
// Orders
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderLine {
    pub product_id: EntityId,
    #[serde(alias = "name")]
    pub product_name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: f64,
    #[serde(alias = "unit")]
    pub unit_type: Option<String>,
    #[serde(alias = "price", deserialize_with = "lenient_f64")]
    pub price_per_unit: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Order {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub hotel_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    pub order_date: Option<String>,
    pub created_at: Option<String>,
    pub items: Vec<OrderLine>,
}

impl Filterable for Order {
    fn category(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [self.hotel_name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

// =========================================================
// Products
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(alias = "price", deserialize_with = "lenient_f64")]
    pub price_per_unit: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub stock_quantity: f64,
    #[serde(alias = "unit")]
    pub unit_type: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: Option<String>,
}

impl Filterable for Product {
    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [self.name.as_deref(), self.category.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

// =========================================================
// Users & hotels
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub username: Option<String>,
    pub email: Option<String>,
    pub hotel_name: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    pub role: Option<String>,
    pub address: Option<String>,
    pub last_login: Option<String>,
    pub created_at: Option<String>,
}

impl Filterable for User {
    fn category(&self) -> Option<&str> {
        self.role.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            self.username.as_deref(),
            self.email.as_deref(),
            self.hotel_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hotel {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub hotel_name: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    pub status: Option<String>,
    pub hotel_image: Option<String>,
    pub last_login: Option<String>,
    pub created_at: Option<String>,
}

impl Filterable for Hotel {
    fn category(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            self.hotel_name.as_deref(),
            self.username.as_deref(),
            self.email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// =========================================================
// Suppliers
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Supplier {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub name: Option<String>,
    pub contact_person: Option<String>,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<String>,
}

impl Filterable for Supplier {
    fn category(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            self.name.as_deref(),
            self.contact_person.as_deref(),
            self.email.as_deref(),
            self.phone.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// =========================================================
// Bills
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bill {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub order_id: Option<String>,
    pub hotel_name: Option<String>,
    pub email: Option<String>,
    pub bill_date: Option<String>,
    #[serde(alias = "amount", deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    #[serde(deserialize_with = "lenient_bool")]
    pub paid: bool,
    pub payment_method: Option<String>,
    pub comments: Option<String>,
}

impl Filterable for Bill {
    /// Bills have no status column; the page filters on paid/unpaid.
    fn category(&self) -> Option<&str> {
        Some(if self.paid { "paid" } else { "unpaid" })
    }

    fn search_fields(&self) -> Vec<&str> {
        [self.hotel_name.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnpaidBill {
    #[serde(alias = "_id")]
    pub id: EntityId,
    #[serde(deserialize_with = "lenient_opt_string")]
    pub order_id: Option<String>,
    pub hotel_name: Option<String>,
    pub bill_date: Option<String>,
    #[serde(alias = "amount", deserialize_with = "lenient_f64")]
    pub total_amount: f64,
}

impl Filterable for UnpaidBill {
    fn category(&self) -> Option<&str> {
        None
    }

    fn search_fields(&self) -> Vec<&str> {
        self.hotel_name.as_deref().into_iter().collect()
    }
}

// =========================================================
// Support tickets
// =========================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportTicket {
    #[serde(alias = "_id")]
    pub id: EntityId,
    pub subject: Option<String>,
    pub message: Option<String>,
    /// `open` or `closed`
    pub status: Option<String>,
    pub hotel_name: Option<String>,
    pub email: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Filterable for SupportTicket {
    fn category(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn search_fields(&self) -> Vec<&str> {
        [
            self.subject.as_deref(),
            self.hotel_name.as_deref(),
            self.email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// =========================================================
// Report rows
// =========================================================

/// An untyped row from one of the "today's ..." report endpoints.
///
/// Those endpoints change shape between deployments, so the row is kept as
/// the raw JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportRow(pub Map<String, Value>);

impl ReportRow {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }
}

impl Filterable for ReportRow {
    fn category(&self) -> Option<&str> {
        self.get_str("status")
    }

    fn search_fields(&self) -> Vec<&str> {
        self.0.values().filter_map(Value::as_str).collect()
    }
}
