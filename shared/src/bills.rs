//! Unpaid bills report.
//!
//! `GET /api/admin/unpaid-bills` answers with the outstanding bills, a
//! per-hotel breakdown and (usually) a server-side total. The summary below
//! is what the unpaid-bills page shows in its header cards.

use crate::date::parse_loose_date;
use crate::models::UnpaidBill;
use crate::serde_helper::{lenient_f64, lenient_opt_f64};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotelDue {
    pub hotel_name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    #[serde(alias = "count", alias = "bill_count", deserialize_with = "lenient_f64")]
    pub bills: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnpaidReport {
    pub unpaid_bills: Vec<UnpaidBill>,
    pub hotel_breakdown: Vec<HotelDue>,
    #[serde(deserialize_with = "lenient_opt_f64")]
    pub total_unpaid_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnpaidSummary {
    /// Oldest first; bills with an unreadable date go last.
    pub bills: Vec<UnpaidBill>,
    pub total_amount: f64,
    pub bill_count: usize,
    pub oldest_bill: Option<NaiveDate>,
    pub average_amount: f64,
}

impl UnpaidReport {
    pub fn summarize(self) -> UnpaidSummary {
        let mut bills = self.unpaid_bills;
        bills.sort_by_key(|bill| {
            let date = bill.bill_date.as_deref().and_then(parse_loose_date);
            (date.is_none(), date)
        });

        let total_amount = self
            .total_unpaid_amount
            .unwrap_or_else(|| bills.iter().map(|b| b.total_amount).sum());
        let bill_count = bills.len();
        let oldest_bill = bills
            .iter()
            .filter_map(|b| b.bill_date.as_deref().and_then(parse_loose_date))
            .min();
        let average_amount = if bill_count > 0 {
            total_amount / bill_count as f64
        } else {
            0.0
        };

        UnpaidSummary {
            bills,
            total_amount,
            bill_count,
            oldest_bill,
            average_amount,
        }
    }
}
