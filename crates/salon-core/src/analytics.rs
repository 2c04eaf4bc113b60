//! # Sales Analytics
//!
//! Read-only rollups over a set of receipts. Pure derivation: callers
//! hand in the receipts (and the menu catalog for category lookups) and
//! get the aggregate back, nothing is cached or mutated.
//!
//! Sync state does not gate inclusion: a `pending` receipt is already a
//! completed sale locally and counts like any other. The only filter is
//! the service date range.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Menu, MenuCategory, PaymentMethod, Receipt};

// =============================================================================
// Query Shapes
// =============================================================================

/// Inclusive date range filter on `service_date`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[ts(as = "String")]
    pub start: DateTime<Utc>,
    #[ts(as = "String")]
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        DateRange { start, end }
    }

    /// True when `at` falls inside the range (inclusive on both ends).
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

/// Rollup bucket size for the per-period sales series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One bucket per calendar day.
    #[default]
    Day,
    /// One bucket per ISO week (Monday start); keyed by the Monday.
    Week,
    /// One bucket per calendar month; keyed by the 1st.
    Month,
}

// =============================================================================
// Output Shapes
// =============================================================================

/// Sales for one rollup bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DailySales {
    /// First day of the bucket.
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub sales: i64,
    pub receipt_count: u32,
}

/// One row of the per-menu sales ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MenuRanking {
    pub menu_id: String,
    pub menu_name: String,
    pub category: MenuCategory,
    /// Units sold across the range.
    pub sold_count: i64,
    /// Revenue across the range.
    pub total_sales: i64,
    /// 1-based position after sorting.
    pub rank: u32,
}

/// Sales share of one payment method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethodBreakdown {
    pub method: PaymentMethod,
    pub count: u32,
    pub amount: i64,
    /// Share of total sales (0.0 to 1.0); 0 when there are no sales.
    pub percentage: f64,
}

/// Full analytics rollup for a date range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SalesAnalytics {
    pub period: DateRange,
    pub total_sales: i64,
    pub receipt_count: u32,
    /// Integer yen; 0 when the range is empty.
    pub average_per_receipt: i64,
    pub daily_sales: Vec<DailySales>,
    pub menu_ranking: Vec<MenuRanking>,
    pub payment_method_breakdown: Vec<PaymentMethodBreakdown>,
}

// =============================================================================
// Aggregation
// =============================================================================

/// Derives the sales rollup for every receipt whose `service_date`
/// falls in `range`, bucketed by `group_by`.
///
/// `menus` is only consulted to resolve ranking categories; a sold menu
/// that has since been deleted falls back to its receipt snapshot name
/// and the `Other` category.
pub fn sales_analytics(
    receipts: &[Receipt],
    menus: &[Menu],
    range: &DateRange,
    group_by: GroupBy,
) -> SalesAnalytics {
    let in_range: Vec<&Receipt> = receipts
        .iter()
        .filter(|r| range.contains(r.service_date))
        .collect();

    let total_sales: i64 = in_range.iter().map(|r| r.total_amount).sum();
    let receipt_count = in_range.len() as u32;
    let average_per_receipt = if receipt_count == 0 {
        0
    } else {
        total_sales / receipt_count as i64
    };

    SalesAnalytics {
        period: *range,
        total_sales,
        receipt_count,
        average_per_receipt,
        daily_sales: rollup_by_bucket(&in_range, group_by),
        menu_ranking: rank_menus(&in_range, menus),
        payment_method_breakdown: payment_breakdown(&in_range, total_sales),
    }
}

fn bucket_start(date: NaiveDate, group_by: GroupBy) -> NaiveDate {
    match group_by {
        GroupBy::Day => date,
        GroupBy::Week => date.week(Weekday::Mon).first_day(),
        GroupBy::Month => date.with_day(1).unwrap_or(date),
    }
}

fn rollup_by_bucket(receipts: &[&Receipt], group_by: GroupBy) -> Vec<DailySales> {
    // BTreeMap keeps the series in chronological order.
    let mut buckets: BTreeMap<NaiveDate, (i64, u32)> = BTreeMap::new();
    for receipt in receipts {
        let key = bucket_start(receipt.service_date.date_naive(), group_by);
        let entry = buckets.entry(key).or_insert((0, 0));
        entry.0 += receipt.total_amount;
        entry.1 += 1;
    }

    buckets
        .into_iter()
        .map(|(date, (sales, receipt_count))| DailySales {
            date,
            sales,
            receipt_count,
        })
        .collect()
}

fn rank_menus(receipts: &[&Receipt], menus: &[Menu]) -> Vec<MenuRanking> {
    struct Tally {
        name: String,
        sold: i64,
        sales: i64,
    }

    let mut tallies: BTreeMap<String, Tally> = BTreeMap::new();
    for receipt in receipts {
        for item in &receipt.items {
            let tally = tallies.entry(item.menu_id.clone()).or_insert(Tally {
                name: item.menu_name.clone(),
                sold: 0,
                sales: 0,
            });
            tally.sold += item.quantity;
            tally.sales += item.subtotal;
        }
    }

    let mut rows: Vec<MenuRanking> = tallies
        .into_iter()
        .map(|(menu_id, tally)| {
            let catalog = menus.iter().find(|m| m.id == menu_id);
            MenuRanking {
                menu_name: catalog.map(|m| m.name.clone()).unwrap_or(tally.name),
                category: catalog.map(|m| m.category).unwrap_or(MenuCategory::Other),
                menu_id,
                sold_count: tally.sold,
                total_sales: tally.sales,
                rank: 0,
            }
        })
        .collect();

    // Sold count, then revenue, descending; menu id ascending on full
    // ties keeps the ranking deterministic.
    rows.sort_by(|a, b| {
        b.sold_count
            .cmp(&a.sold_count)
            .then(b.total_sales.cmp(&a.total_sales))
            .then(a.menu_id.cmp(&b.menu_id))
    });
    for (index, row) in rows.iter_mut().enumerate() {
        row.rank = index as u32 + 1;
    }

    rows
}

fn payment_breakdown(receipts: &[&Receipt], total_sales: i64) -> Vec<PaymentMethodBreakdown> {
    const METHODS: [PaymentMethod; 4] = [
        PaymentMethod::Cash,
        PaymentMethod::Credit,
        PaymentMethod::PayPay,
        PaymentMethod::Other,
    ];

    METHODS
        .iter()
        .filter_map(|&method| {
            let matching: Vec<&&Receipt> = receipts
                .iter()
                .filter(|r| r.payment_method == method)
                .collect();
            if matching.is_empty() {
                return None;
            }

            let amount: i64 = matching.iter().map(|r| r.total_amount).sum();
            let percentage = if total_sales == 0 {
                0.0
            } else {
                amount as f64 / total_sales as f64
            };
            Some(PaymentMethodBreakdown {
                method,
                count: matching.len() as u32,
                amount,
                percentage,
            })
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ReceiptItem, SyncStatus};
    use chrono::TimeZone;

    fn day(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, d, hour, 0, 0).unwrap()
    }

    fn receipt(
        id: &str,
        service_date: DateTime<Utc>,
        method: PaymentMethod,
        items: Vec<(&str, i64, i64)>,
    ) -> Receipt {
        let items: Vec<ReceiptItem> = items
            .into_iter()
            .map(|(menu_id, price, quantity)| ReceiptItem {
                menu_id: menu_id.into(),
                menu_name: format!("Menu {menu_id}"),
                price,
                quantity,
                subtotal: price * quantity,
            })
            .collect();
        let total = items.iter().map(|i| i.subtotal).sum();
        Receipt {
            id: id.into(),
            receipt_number: "20260115-0001".into(),
            customer_name: "Sato".into(),
            service_date,
            items,
            total_amount: total,
            staff_name: "Aoi".into(),
            payment_method: method,
            memo: None,
            sync_status: SyncStatus::Pending,
            created_at: service_date,
            updated_at: service_date,
            synced_at: None,
        }
    }

    fn january() -> DateRange {
        DateRange::new(day(1, 0), day(31, 23))
    }

    #[test]
    fn test_empty_range_yields_zeroes_not_faults() {
        let analytics = sales_analytics(&[], &[], &january(), GroupBy::Day);

        assert_eq!(analytics.total_sales, 0);
        assert_eq!(analytics.receipt_count, 0);
        assert_eq!(analytics.average_per_receipt, 0);
        assert!(analytics.daily_sales.is_empty());
        assert!(analytics.menu_ranking.is_empty());
        assert!(analytics.payment_method_breakdown.is_empty());
    }

    #[test]
    fn test_zero_priced_sales_have_zero_percentage() {
        let receipts = vec![receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-1", 0, 1)])];
        let analytics = sales_analytics(&receipts, &[], &january(), GroupBy::Day);

        assert_eq!(analytics.total_sales, 0);
        let row = &analytics.payment_method_breakdown[0];
        assert_eq!(row.percentage, 0.0);
        assert!(row.percentage.is_finite());
    }

    #[test]
    fn test_totals_and_daily_rollup() {
        let receipts = vec![
            receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-1", 6000, 1)]),
            receipt("r-2", day(5, 14), PaymentMethod::Credit, vec![("m-2", 3000, 2)]),
            receipt("r-3", day(6, 11), PaymentMethod::Cash, vec![("m-1", 6000, 1)]),
            // Out of range, must be ignored.
            receipt("r-4", Utc.with_ymd_and_hms(2026, 2, 1, 10, 0, 0).unwrap(), PaymentMethod::Cash, vec![("m-1", 6000, 1)]),
        ];

        let analytics = sales_analytics(&receipts, &[], &january(), GroupBy::Day);

        assert_eq!(analytics.total_sales, 18000);
        assert_eq!(analytics.receipt_count, 3);
        assert_eq!(analytics.average_per_receipt, 6000);
        assert_eq!(analytics.daily_sales.len(), 2);
        assert_eq!(analytics.daily_sales[0].sales, 12000);
        assert_eq!(analytics.daily_sales[0].receipt_count, 2);
        assert_eq!(analytics.daily_sales[1].sales, 6000);
    }

    #[test]
    fn test_week_and_month_buckets() {
        let receipts = vec![
            // 2026-01-05 is a Monday, 2026-01-07 the same ISO week.
            receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-1", 1000, 1)]),
            receipt("r-2", day(7, 10), PaymentMethod::Cash, vec![("m-1", 1000, 1)]),
            receipt("r-3", day(14, 10), PaymentMethod::Cash, vec![("m-1", 1000, 1)]),
        ];

        let weekly = sales_analytics(&receipts, &[], &january(), GroupBy::Week);
        assert_eq!(weekly.daily_sales.len(), 2);
        assert_eq!(
            weekly.daily_sales[0].date,
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
        );
        assert_eq!(weekly.daily_sales[0].sales, 2000);

        let monthly = sales_analytics(&receipts, &[], &january(), GroupBy::Month);
        assert_eq!(monthly.daily_sales.len(), 1);
        assert_eq!(
            monthly.daily_sales[0].date,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
        );
        assert_eq!(monthly.daily_sales[0].receipt_count, 3);
    }

    #[test]
    fn test_menu_ranking_order_and_tie_break() {
        let receipts = vec![
            receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-b", 1000, 2)]),
            // m-a and m-b tie on sold count and revenue; m-a ranks first by id.
            receipt("r-2", day(6, 10), PaymentMethod::Cash, vec![("m-a", 1000, 2), ("m-c", 500, 1)]),
        ];

        let analytics = sales_analytics(&receipts, &[], &january(), GroupBy::Day);
        let ids: Vec<&str> = analytics
            .menu_ranking
            .iter()
            .map(|r| r.menu_id.as_str())
            .collect();

        assert_eq!(ids, vec!["m-a", "m-b", "m-c"]);
        assert_eq!(analytics.menu_ranking[0].rank, 1);
        assert_eq!(analytics.menu_ranking[2].rank, 3);
        assert_eq!(analytics.menu_ranking[2].sold_count, 1);
    }

    #[test]
    fn test_ranking_uses_catalog_category() {
        let menus = vec![Menu {
            id: "m-1".into(),
            name: "Gel Nail".into(),
            price: 6000,
            duration: 60,
            category: MenuCategory::Nail,
            is_active: true,
            created_at: day(1, 0),
            updated_at: day(1, 0),
        }];
        let receipts = vec![
            receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-1", 6000, 1)]),
            receipt("r-2", day(5, 11), PaymentMethod::Cash, vec![("m-gone", 1000, 1)]),
        ];

        let analytics = sales_analytics(&receipts, &menus, &january(), GroupBy::Day);

        let known = analytics.menu_ranking.iter().find(|r| r.menu_id == "m-1").unwrap();
        assert_eq!(known.category, MenuCategory::Nail);
        assert_eq!(known.menu_name, "Gel Nail");
        let gone = analytics.menu_ranking.iter().find(|r| r.menu_id == "m-gone").unwrap();
        assert_eq!(gone.category, MenuCategory::Other);
    }

    #[test]
    fn test_payment_breakdown_percentages() {
        let receipts = vec![
            receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-1", 6000, 1)]),
            receipt("r-2", day(5, 11), PaymentMethod::Cash, vec![("m-1", 6000, 1)]),
            receipt("r-3", day(6, 10), PaymentMethod::PayPay, vec![("m-2", 4000, 1)]),
        ];

        let analytics = sales_analytics(&receipts, &[], &january(), GroupBy::Day);
        let breakdown = &analytics.payment_method_breakdown;

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].method, PaymentMethod::Cash);
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[0].amount, 12000);
        assert!((breakdown[0].percentage - 0.75).abs() < 1e-9);
        assert!((breakdown[1].percentage - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_sync_status_does_not_gate_inclusion() {
        let mut synced = receipt("r-1", day(5, 10), PaymentMethod::Cash, vec![("m-1", 6000, 1)]);
        synced.sync_status = SyncStatus::Synced;
        let mut errored = receipt("r-2", day(5, 11), PaymentMethod::Cash, vec![("m-1", 6000, 1)]);
        errored.sync_status = SyncStatus::Error;
        let receipts = vec![synced, errored];

        let analytics = sales_analytics(&receipts, &[], &january(), GroupBy::Day);
        assert_eq!(analytics.receipt_count, 2);
    }
}
