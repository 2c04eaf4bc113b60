//! # Request DTOs
//!
//! Shapes the UI/API layer submits to the entity store. These carry
//! only caller-editable fields; ids, timestamps, receipt numbers and
//! sync bookkeeping are assigned by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{Menu, MenuCategory, PaymentMethod};

// =============================================================================
// Menu Requests
// =============================================================================

/// Payload for creating a new menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuRequest {
    pub name: String,
    pub price: i64,
    pub duration: i64,
    pub category: MenuCategory,
}

/// Partial update for an existing menu; absent fields stay untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<MenuCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateMenuRequest {
    /// Applies the present fields onto `menu`. Timestamps are the
    /// store's responsibility.
    pub fn apply(&self, menu: &mut Menu) {
        if let Some(name) = &self.name {
            menu.name = name.clone();
        }
        if let Some(price) = self.price {
            menu.price = price;
        }
        if let Some(duration) = self.duration {
            menu.duration = duration;
        }
        if let Some(category) = self.category {
            menu.category = category;
        }
        if let Some(is_active) = self.is_active {
            menu.is_active = is_active;
        }
    }

    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.duration.is_none()
            && self.category.is_none()
            && self.is_active.is_none()
    }
}

// =============================================================================
// Receipt Requests
// =============================================================================

/// One requested line: the store snapshots name and price from the
/// referenced menu at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItemRequest {
    pub menu_id: String,
    pub quantity: i64,
}

/// Payload for issuing a new receipt.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateReceiptRequest {
    pub customer_name: String,
    #[ts(as = "String")]
    pub service_date: DateTime<Utc>,
    pub items: Vec<ReceiptItemRequest>,
    pub staff_name: String,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

// =============================================================================
// Receipt Search
// =============================================================================

/// Default page size for receipt searches.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Filterable, paginated receipt search.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptQuery {
    /// Substring match on customer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Substring match on staff name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_name: Option<String>,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// 1-based page number.
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl Default for ReceiptQuery {
    fn default() -> Self {
        ReceiptQuery {
            customer_name: None,
            staff_name: None,
            start_date: None,
            end_date: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

/// Pagination envelope returned alongside a result page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_count: u32,
    pub total_pages: u32,
}

impl PageInfo {
    /// Computes the envelope for a result set of `total_count` rows.
    pub fn compute(total_count: u32, page: u32, page_size: u32) -> Self {
        let page_size = page_size.max(1);
        let total_pages = total_count.div_ceil(page_size);
        PageInfo {
            page: page.max(1),
            page_size,
            total_count,
            total_pages,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
