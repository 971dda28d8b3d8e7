//! Dashboard domain records
//!
//! - `Order`: a customer order with line items, status and priority
//! - `Transaction`: a payment event, as pushed by the live transactions feed
//! - `RevenueSample`: one revenue data point for the revenue panel

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::record::{ExportRow, FieldValue, Record};

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// All statuses, in display order
    pub fn all() -> &'static [OrderStatus] {
        &[
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Cancelled and refunded orders do not count towards revenue
    pub fn is_terminal_negative(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Refunded)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handling priority of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub fn all() -> &'static [Priority] {
        &[Priority::Low, Priority::Medium, Priority::High, Priority::Urgent]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Customer contact details on an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

/// One line of an order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32, price: f64) -> Self {
        Self {
            name: name.into(),
            quantity,
            price,
        }
    }

    /// quantity * unit price
    pub fn subtotal(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

/// A customer order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: String,
    pub customer: Customer,
    #[serde(default)]
    pub items: Vec<LineItem>,
    pub total: f64,
    pub status: OrderStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<String>,
}

impl Order {
    /// Create an order; the total is derived from the line items
    pub fn new(
        id: impl Into<String>,
        customer_name: impl Into<String>,
        customer_email: impl Into<String>,
        items: Vec<LineItem>,
        date: DateTime<Utc>,
    ) -> Self {
        let total = items.iter().map(LineItem::subtotal).sum();
        Self {
            id: id.into(),
            customer: Customer {
                name: customer_name.into(),
                email: customer_email.into(),
            },
            items,
            total,
            status: OrderStatus::Pending,
            priority: Priority::default(),
            date,
            payment_method: None,
            shipping_address: None,
        }
    }

    /// Builder: set status
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder: set priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: override the total
    pub fn total(mut self, total: f64) -> Self {
        self.total = total;
        self
    }

    /// Builder: set payment method
    pub fn payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }
}

impl Record for Order {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "id" => FieldValue::Text(&self.id),
            "customer" | "customer.name" => FieldValue::Text(&self.customer.name),
            "customer.email" | "email" => FieldValue::Text(&self.customer.email),
            "items" | "items.name" => {
                FieldValue::TextList(self.items.iter().map(|i| i.name.as_str()).collect())
            }
            "item_count" => FieldValue::Number(self.items.len() as f64),
            "total" | "amount" => FieldValue::Number(self.total),
            "status" => FieldValue::Text(self.status.as_str()),
            "priority" => FieldValue::Text(self.priority.as_str()),
            "date" => FieldValue::Timestamp(self.date),
            "payment_method" => FieldValue::Text(self.payment_method.as_deref()?),
            "shipping_address" => FieldValue::Text(self.shipping_address.as_deref()?),
            _ => return None,
        })
    }
}

impl ExportRow for Order {
    fn headers() -> &'static [&'static str] {
        &[
            "id",
            "customer",
            "email",
            "items",
            "total",
            "status",
            "priority",
            "date",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.customer.name.clone(),
            self.customer.email.clone(),
            self.items
                .iter()
                .map(|i| format!("{} x{}", i.name, i.quantity))
                .collect::<Vec<_>>()
                .join("; "),
            format!("{:.2}", self.total),
            self.status.to_string(),
            self.priority.to_string(),
            self.date.format("%Y-%m-%d").to_string(),
        ]
    }
}

/// Outcome of a payment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
    Pending,
    Failed,
    Refunded,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Completed => "completed",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Refunded => "refunded",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A payment event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub customer: String,
    pub amount: f64,
    pub status: TransactionStatus,
    #[serde(default)]
    pub method: String,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub date: DateTime<Utc>,
}

impl Record for Transaction {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "id" => FieldValue::Text(&self.id),
            "customer" | "customer.name" => FieldValue::Text(&self.customer),
            "amount" | "total" => FieldValue::Number(self.amount),
            "status" => FieldValue::Text(self.status.as_str()),
            "method" => FieldValue::Text(&self.method),
            "date" => FieldValue::Timestamp(self.date),
            _ => return None,
        })
    }
}

impl ExportRow for Transaction {
    fn headers() -> &'static [&'static str] {
        &["id", "customer", "amount", "status", "method", "date"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.customer.clone(),
            format!("{:.2}", self.amount),
            self.status.to_string(),
            self.method.clone(),
            self.date.to_rfc3339(),
        ]
    }
}

/// One revenue data point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RevenueSample {
    pub id: String,
    #[serde(deserialize_with = "deserialize_flexible_date")]
    pub date: DateTime<Utc>,
    pub revenue: f64,
    #[serde(default)]
    pub orders: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Record for RevenueSample {
    fn id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        Some(match name {
            "id" => FieldValue::Text(&self.id),
            "date" => FieldValue::Timestamp(self.date),
            "revenue" | "total" => FieldValue::Number(self.revenue),
            "orders" => FieldValue::Number(self.orders as f64),
            "category" => FieldValue::Text(self.category.as_deref()?),
            _ => return None,
        })
    }
}

impl ExportRow for RevenueSample {
    fn headers() -> &'static [&'static str] {
        &["id", "date", "revenue", "orders", "category"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.clone(),
            self.date.format("%Y-%m-%d").to_string(),
            format!("{:.2}", self.revenue),
            self.orders.to_string(),
            self.category.clone().unwrap_or_default(),
        ]
    }
}

/// Parse a date the way API payloads and mock data write them:
/// RFC 3339 timestamps or bare `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_flexible_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn deserialize_flexible_date<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_flexible_date(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s)))
}
