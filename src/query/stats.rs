//! Dashboard statistics
//!
//! Derived aggregates over a collection: counts per category, revenue sum and
//! average, period-over-period change and revenue buckets for charts.
//!
//! Every division is guarded, so an empty collection simply yields zeros.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::filter::DateRange;
use crate::records::{OrderStatus, Record};

/// Which fields the aggregation reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Categorical field grouped into counts
    pub category_field: String,
    /// Monetary field summed into revenue
    pub amount_field: String,
    /// Date field used for period comparisons and buckets
    pub date_field: String,
    /// Categories left out of revenue (terminal-negative outcomes)
    pub excluded_categories: Vec<String>,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            category_field: "status".to_string(),
            amount_field: "total".to_string(),
            date_field: "date".to_string(),
            excluded_categories: OrderStatus::all()
                .iter()
                .filter(|status| status.is_terminal_negative())
                .map(|status| status.as_str().to_string())
                .collect(),
        }
    }
}

impl StatsConfig {
    fn is_excluded(&self, category: Option<&str>) -> bool {
        category
            .map(|c| {
                self.excluded_categories
                    .iter()
                    .any(|excluded| excluded.eq_ignore_ascii_case(c))
            })
            .unwrap_or(false)
    }

    /// Revenue contribution of a record, `None` when it does not count
    fn revenue_of<R: Record>(&self, record: &R) -> Option<f64> {
        let category = record.field(&self.category_field);
        if self.is_excluded(category.as_ref().and_then(|c| c.as_text())) {
            return None;
        }
        record
            .field(&self.amount_field)
            .and_then(|v| v.as_number())
            .filter(|n| n.is_finite())
    }
}

/// Aggregate summary of a collection
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSummary {
    /// Number of records in the collection
    pub total_count: usize,
    /// Record count per category value
    pub counts: BTreeMap<String, usize>,
    /// Sum of the amount field over counted records
    pub revenue: f64,
    /// Records that contributed to revenue
    pub counted: usize,
    /// revenue / max(counted, 1)
    pub average: f64,
}

impl StatsSummary {
    /// Count for one category (zero if absent)
    pub fn count(&self, category: &str) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} records, revenue {:.2} over {} counted (avg {:.2})",
            self.total_count, self.revenue, self.counted, self.average
        )
    }
}

/// Compute dashboard stats with the default field mapping
pub fn compute_stats<R: Record>(collection: &[R]) -> StatsSummary {
    compute_stats_with(collection.iter(), &StatsConfig::default())
}

/// Compute stats over any sequence of records
pub fn compute_stats_with<'a, R, I>(records: I, config: &StatsConfig) -> StatsSummary
where
    R: Record + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut summary = StatsSummary::default();

    for record in records {
        summary.total_count += 1;

        if let Some(category) = record
            .field(&config.category_field)
            .and_then(|v| v.as_text())
        {
            *summary.counts.entry(category.to_string()).or_insert(0) += 1;
        }

        if let Some(amount) = config.revenue_of(record) {
            summary.revenue += amount;
            summary.counted += 1;
        }
    }

    summary.average = summary.revenue / summary.counted.max(1) as f64;
    summary
}

/// Relative change in percent, `None` when the previous value is zero
pub fn percentage_change(current: f64, previous: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous.abs() * 100.0)
}

/// Stats of two windows side by side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub current: StatsSummary,
    pub previous: StatsSummary,
    pub revenue_change: Option<f64>,
    pub count_change: Option<f64>,
    pub average_change: Option<f64>,
}

/// Compare the stats of two date windows of the same collection
pub fn compare_periods<R: Record>(
    collection: &[R],
    current: &DateRange,
    previous: &DateRange,
    config: &StatsConfig,
) -> PeriodComparison {
    let current_stats = compute_stats_with(in_window(collection, current, config), config);
    let previous_stats = compute_stats_with(in_window(collection, previous, config), config);

    PeriodComparison {
        revenue_change: percentage_change(current_stats.revenue, previous_stats.revenue),
        count_change: percentage_change(
            current_stats.total_count as f64,
            previous_stats.total_count as f64,
        ),
        average_change: percentage_change(current_stats.average, previous_stats.average),
        current: current_stats,
        previous: previous_stats,
    }
}

fn in_window<'a, R: Record>(
    collection: &'a [R],
    range: &'a DateRange,
    config: &'a StatsConfig,
) -> impl Iterator<Item = &'a R> + 'a {
    collection.iter().filter(move |record| {
        record
            .field(&config.date_field)
            .and_then(|v| v.as_timestamp())
            .map(|ts| range.contains(ts))
            .unwrap_or(false)
    })
}

/// Bucket width for revenue charts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Day,
    /// Weeks start on Monday
    Week,
    /// Calendar month
    Month,
}

impl Interval {
    /// First day of the bucket containing `ts`
    pub fn truncate(&self, ts: DateTime<Utc>) -> NaiveDate {
        let day = ts.date_naive();
        match self {
            Interval::Day => day,
            Interval::Week => {
                day - chrono::Duration::days(day.weekday().num_days_from_monday() as i64)
            }
            Interval::Month => day.with_day(1).unwrap_or(day),
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "day" | "d" | "daily" => Some(Interval::Day),
            "week" | "w" | "weekly" => Some(Interval::Week),
            "month" | "m" | "monthly" => Some(Interval::Month),
            _ => None,
        }
    }
}

/// Revenue of one chart bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueBucket {
    pub start: NaiveDate,
    pub revenue: f64,
    pub counted: usize,
}

/// Revenue grouped into buckets, ordered by bucket start
///
/// Records without a date or excluded from revenue are skipped.
pub fn revenue_by_period<R: Record>(
    collection: &[R],
    interval: Interval,
    config: &StatsConfig,
) -> Vec<RevenueBucket> {
    let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for record in collection {
        let ts = match record
            .field(&config.date_field)
            .and_then(|v| v.as_timestamp())
        {
            Some(ts) => ts,
            None => continue,
        };

        if let Some(amount) = config.revenue_of(record) {
            let entry = buckets.entry(interval.truncate(ts)).or_insert((0.0, 0));
            entry.0 += amount;
            entry.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(start, (revenue, counted))| RevenueBucket {
            start,
            revenue,
            counted,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{LineItem, Order, OrderStatus, RevenueSample};
    use chrono::TimeZone;

    fn order(id: &str, total: f64, status: OrderStatus, month: u32, day: u32) -> Order {
        Order::new(
            id,
            "Customer",
            "c@example.com",
            vec![LineItem::new("Item", 1, total)],
            Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap(),
        )
        .status(status)
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn test_empty_collection_is_all_zero() {
        let stats = compute_stats::<Order>(&[]);
        assert_eq!(stats, StatsSummary::default());
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.count("pending"), 0);
    }

    #[test]
    fn test_default_exclusions_follow_order_status() {
        let config = StatsConfig::default();
        assert_eq!(config.excluded_categories, vec!["cancelled", "refunded"]);
        assert!(config.is_excluded(Some("Refunded")));
        assert!(!config.is_excluded(Some("delivered")));
        assert!(!config.is_excluded(None));
    }

    #[test]
    fn test_revenue_excludes_cancelled_and_refunded() {
        let orders = vec![
            order("1", 100.0, OrderStatus::Delivered, 1, 1),
            order("2", 50.0, OrderStatus::Cancelled, 1, 2),
        ];
        let stats = compute_stats(&orders);
        assert_eq!(stats.revenue, 100.0);
        assert_eq!(stats.counted, 1);
        assert_eq!(stats.average, 100.0);
        assert_eq!(stats.total_count, 2);
        assert_eq!(stats.count("cancelled"), 1);
    }

    #[test]
    fn test_counts_per_status() {
        let orders = vec![
            order("1", 10.0, OrderStatus::Pending, 1, 1),
            order("2", 20.0, OrderStatus::Pending, 1, 2),
            order("3", 30.0, OrderStatus::Refunded, 1, 3),
            order("4", 40.0, OrderStatus::Shipped, 1, 4),
        ];
        let stats = compute_stats(&orders);
        assert_eq!(stats.count("pending"), 2);
        assert_eq!(stats.count("refunded"), 1);
        assert_eq!(stats.count("shipped"), 1);
        assert_eq!(stats.revenue, 70.0);
        assert!((stats.average - 70.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_only_excluded_records_average_is_zero() {
        let orders = vec![order("1", 10.0, OrderStatus::Cancelled, 1, 1)];
        let stats = compute_stats(&orders);
        assert_eq!(stats.counted, 0);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn test_percentage_change() {
        assert_eq!(percentage_change(150.0, 100.0), Some(50.0));
        assert_eq!(percentage_change(50.0, 100.0), Some(-50.0));
        assert_eq!(percentage_change(10.0, 0.0), None);
    }

    #[test]
    fn test_compare_periods() {
        let orders = vec![
            order("1", 100.0, OrderStatus::Delivered, 1, 2),
            order("2", 100.0, OrderStatus::Delivered, 1, 9),
            order("3", 200.0, OrderStatus::Delivered, 1, 10),
            order("4", 999.0, OrderStatus::Cancelled, 1, 11),
        ];
        let current = DateRange::new(date(1, 8), date(1, 14));
        let previous = current.previous().unwrap();

        let cmp = compare_periods(&orders, &current, &previous, &StatsConfig::default());
        assert_eq!(cmp.current.revenue, 300.0);
        assert_eq!(cmp.previous.revenue, 100.0);
        assert_eq!(cmp.revenue_change, Some(200.0));
        assert_eq!(cmp.count_change, Some(200.0));
    }

    #[test]
    fn test_interval_truncate() {
        // 2024-01-17 is a Wednesday
        let ts = Utc.with_ymd_and_hms(2024, 1, 17, 15, 45, 0).unwrap();
        assert_eq!(Interval::Day.truncate(ts), date(1, 17));
        assert_eq!(Interval::Week.truncate(ts), date(1, 15));
        assert_eq!(Interval::Month.truncate(ts), date(1, 1));
        assert_eq!(Interval::parse("weekly"), Some(Interval::Week));
    }

    #[test]
    fn test_revenue_by_month() {
        let orders = vec![
            order("1", 100.0, OrderStatus::Delivered, 2, 14),
            order("2", 50.0, OrderStatus::Delivered, 1, 3),
            order("3", 25.0, OrderStatus::Shipped, 1, 30),
            order("4", 80.0, OrderStatus::Refunded, 1, 5),
        ];
        let buckets = revenue_by_period(&orders, Interval::Month, &StatsConfig::default());
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].start, date(1, 1));
        assert_eq!(buckets[0].revenue, 75.0);
        assert_eq!(buckets[0].counted, 2);
        assert_eq!(buckets[1].start, date(2, 1));
        assert_eq!(buckets[1].revenue, 100.0);
    }

    #[test]
    fn test_revenue_samples_with_custom_config() {
        let samples = vec![
            RevenueSample {
                id: "r1".into(),
                date: Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap(),
                revenue: 1200.0,
                orders: 12,
                category: Some("electronics".into()),
            },
            RevenueSample {
                id: "r2".into(),
                date: Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap(),
                revenue: 800.0,
                orders: 9,
                category: Some("books".into()),
            },
        ];
        let config = StatsConfig {
            category_field: "category".into(),
            amount_field: "revenue".into(),
            ..StatsConfig::default()
        };
        let stats = compute_stats_with(samples.iter(), &config);
        assert_eq!(stats.revenue, 2000.0);
        assert_eq!(stats.average, 1000.0);
        assert_eq!(stats.count("books"), 1);
    }
}
