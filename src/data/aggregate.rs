//! Summary tables behind the four dashboard views.
//!
//! Every function takes a view (`&[&Transaction]`) and returns plain data.
//! Grouping goes through `BTreeMap`, so ties keep key order after the stable
//! descending sorts.  An empty view yields empty tables, zero totals and
//! `None` for indicators that need at least one row.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Weekday};

use super::filter::restrict_to_country;
use super::model::Transaction;
use crate::config::{HISTOGRAM_BINS, PRICE_PERCENTILE, REVENUE_THRESHOLD_CEILING, THRESHOLD_FRACTION, TOP_N};

/// Display order of the weekday chart.
pub const WEEKDAY_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Headline indicators of the overview page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overview {
    pub total_revenue: f64,
    pub invoices: usize,
    pub customers: usize,
    /// `None` when there are no invoices.
    pub average_order_value: Option<f64>,
    /// Description with the largest summed quantity.
    pub best_product: Option<String>,
    /// Customer with the largest summed revenue.
    pub top_customer: Option<String>,
}

pub fn overview(view: &[&Transaction]) -> Overview {
    let total_revenue = total_revenue(view);
    let invoices = distinct_invoices(view);
    let customers = view.iter().map(|t| t.customer_id.as_str()).collect::<BTreeSet<_>>().len();

    let average_order_value = (invoices > 0).then(|| total_revenue / invoices as f64);

    let quantities = sum_by(view, |t| t.description.as_str(), |t| t.quantity);
    let best_product = arg_max(&quantities, |a, b| a.cmp(b)).map(str::to_string);

    let revenues = sum_by(view, |t| t.customer_id.as_str(), |t| t.line_revenue);
    let top_customer = arg_max(&revenues, |a, b| a.total_cmp(b)).map(str::to_string);

    Overview {
        total_revenue,
        invoices,
        customers,
        average_order_value,
        best_product,
        top_customer,
    }
}

pub fn total_revenue(view: &[&Transaction]) -> f64 {
    view.iter().fold(0.0, |acc, t| acc + t.line_revenue)
}

/// Number of distinct invoice ids.
pub fn distinct_invoices(view: &[&Transaction]) -> usize {
    view.iter().map(|t| t.invoice_no.as_str()).collect::<BTreeSet<_>>().len()
}

// ---------------------------------------------------------------------------
// Time series and leaderboards
// ---------------------------------------------------------------------------

/// Revenue per month bucket, chronological.
pub fn monthly_revenue(view: &[&Transaction]) -> Vec<(NaiveDate, f64)> {
    sum_by(view, |t| t.month, |t| t.line_revenue).into_iter().collect()
}

/// Ten best-selling descriptions of one country by summed quantity.
pub fn top_products(view: &[&Transaction], country: &str) -> Vec<(String, i64)> {
    let in_country = restrict_to_country(view, country);
    let mut rows: Vec<(String, i64)> = sum_by(&in_country, |t| t.description.as_str(), |t| t.quantity)
        .into_iter()
        .map(|(d, q)| (d.to_string(), q))
        .collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows.truncate(TOP_N);
    rows
}

/// Ten countries with the highest revenue.
pub fn revenue_by_country(view: &[&Transaction]) -> Vec<(String, f64)> {
    top_by_revenue(sum_by(view, |t| t.country.as_str(), |t| t.line_revenue), f64::NEG_INFINITY)
}

/// Ten customers with the highest revenue, among those reaching `threshold`.
pub fn revenue_by_customer(view: &[&Transaction], threshold: f64) -> Vec<(String, f64)> {
    top_by_revenue(sum_by(view, |t| t.customer_id.as_str(), |t| t.line_revenue), threshold)
}

fn top_by_revenue(totals: BTreeMap<&str, f64>, threshold: f64) -> Vec<(String, f64)> {
    let mut rows: Vec<(String, f64)> = totals
        .into_iter()
        .filter(|(_, revenue)| *revenue >= threshold)
        .map(|(k, revenue)| (k.to_string(), revenue))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    rows.truncate(TOP_N);
    rows
}

/// Bounds of the customer revenue threshold slider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevenueThreshold {
    pub floor: i64,
    pub ceiling: i64,
}

impl RevenueThreshold {
    /// Floor is 0.1% of `total_revenue` truncated to an integer (never
    /// negative); ceiling is fixed unless the floor already exceeds it.
    pub fn bounds(total_revenue: f64) -> Self {
        let floor = (total_revenue * THRESHOLD_FRACTION).trunc().max(0.0) as i64;
        RevenueThreshold {
            floor,
            ceiling: REVENUE_THRESHOLD_CEILING.max(floor),
        }
    }

    /// Initial slider position.
    pub fn default_value(&self) -> i64 {
        self.floor
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.floor, self.ceiling)
    }
}

// ---------------------------------------------------------------------------
// Unit price histogram
// ---------------------------------------------------------------------------

/// Equal-width histogram over `[lo, hi]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistogram {
    pub lo: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
}

impl PriceHistogram {
    /// Midpoint of bin `i`.
    pub fn bin_center(&self, i: usize) -> f64 {
        self.lo + (i as f64 + 0.5) * self.bin_width
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// Upper bound of the price slider: the 99th percentile of unit price,
/// truncated to a non-negative integer.  Zero for an empty view.
pub fn price_ceiling(view: &[&Transaction]) -> u32 {
    let prices: Vec<f64> = view.iter().map(|t| t.unit_price).collect();
    quantile(&prices, PRICE_PERCENTILE)
        .map(|p| p.trunc().clamp(0.0, f64::from(u32::MAX)) as u32)
        .unwrap_or(0)
}

/// Unit prices of one country within `[lo, hi]`, bucketed into 50 bins.
///
/// The last bin is closed so `hi` itself is counted.  `lo == hi` collapses
/// into a single bin.
pub fn price_histogram(view: &[&Transaction], country: &str, lo: u32, hi: u32) -> PriceHistogram {
    let (lo, hi) = (f64::from(lo.min(hi)), f64::from(lo.max(hi)));
    let bins = if hi > lo { HISTOGRAM_BINS } else { 1 };
    let bin_width = if hi > lo { (hi - lo) / bins as f64 } else { 1.0 };

    let mut counts = vec![0usize; bins];
    for t in restrict_to_country(view, country) {
        let p = t.unit_price;
        if !p.is_finite() || p < lo || p > hi {
            continue;
        }
        let idx = (((p - lo) / bin_width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    PriceHistogram { lo, bin_width, counts }
}

/// Quantile with linear interpolation between closest ranks.
/// `None` for an empty slice; NaNs are ignored.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let below = pos.floor() as usize;
    let above = pos.ceil() as usize;
    Some(sorted[below] + (sorted[above] - sorted[below]) * (pos - below as f64))
}

// ---------------------------------------------------------------------------
// Orders by time of day
// ---------------------------------------------------------------------------

/// Distinct invoices per hour of day, ascending; only observed hours.
pub fn orders_by_hour(view: &[&Transaction]) -> Vec<(u32, usize)> {
    let mut by_hour: BTreeMap<u32, BTreeSet<&str>> = BTreeMap::new();
    for t in view {
        by_hour.entry(t.hour).or_default().insert(t.invoice_no.as_str());
    }
    by_hour.into_iter().map(|(h, invoices)| (h, invoices.len())).collect()
}

/// Distinct invoices per weekday, Monday first; only observed days.
pub fn orders_by_weekday(view: &[&Transaction]) -> Vec<(Weekday, usize)> {
    let mut by_day: [BTreeSet<&str>; 7] = Default::default();
    for t in view {
        by_day[t.weekday.num_days_from_monday() as usize].insert(t.invoice_no.as_str());
    }
    WEEKDAY_ORDER
        .iter()
        .zip(by_day)
        .filter(|(_, invoices)| !invoices.is_empty())
        .map(|(day, invoices)| (*day, invoices.len()))
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sum_by<'a, K, V, FK, FV>(view: &[&'a Transaction], key: FK, value: FV) -> BTreeMap<K, V>
where
    K: Ord,
    V: Default + std::ops::AddAssign,
    FK: Fn(&'a Transaction) -> K,
    FV: Fn(&'a Transaction) -> V,
{
    let mut totals: BTreeMap<K, V> = BTreeMap::new();
    for &t in view {
        *totals.entry(key(t)).or_default() += value(t);
    }
    totals
}

/// Key of the largest value; the first key wins a tie.
fn arg_max<'k, V>(totals: &BTreeMap<&'k str, V>, cmp: impl Fn(&V, &V) -> std::cmp::Ordering) -> Option<&'k str> {
    let mut best: Option<(&'k str, &V)> = None;
    for (k, v) in totals {
        match best {
            Some((_, b)) if cmp(v, b).is_le() => {}
            _ => best = Some((*k, v)),
        }
    }
    best.map(|(k, _)| k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{DateRange, filter_by_date};
    use crate::data::model::fixtures::{raw, tx};
    use crate::data::model::RetailDataset;

    fn sample() -> Vec<Transaction> {
        vec![
            tx("536365", "17850", "United Kingdom", "LANTERN", 2, 5.0, "2010-12-01 08:26"),
            tx("536366", "13047", "United Kingdom", "CANDLE", 1, 10.0, "2010-12-06 09:02"),
            tx("C536367", "17850", "France", "LANTERN", -1, 5.0, "2011-01-04 15:30"),
        ]
    }

    fn view(rows: &[Transaction]) -> Vec<&Transaction> {
        rows.iter().collect()
    }

    #[test]
    fn overview_of_three_lines() {
        let rows = sample();
        let o = overview(&view(&rows));
        assert!((o.total_revenue - 15.0).abs() < 1e-9);
        assert_eq!(o.invoices, 3);
        assert_eq!(o.customers, 2);
        assert!((o.average_order_value.unwrap() - 5.0).abs() < 1e-9);
        // CANDLE sells 1, LANTERN 2 - 1 = 1; tie keeps key order.
        assert_eq!(o.best_product.as_deref(), Some("CANDLE"));
        // 13047 earns 10, 17850 earns 10 - 5 = 5.
        assert_eq!(o.top_customer.as_deref(), Some("13047"));
    }

    #[test]
    fn overview_of_empty_view() {
        let o = overview(&[]);
        assert_eq!(o, Overview::default());
        assert_eq!(o.average_order_value, None);
    }

    #[test]
    fn average_order_value_times_invoices_is_total() {
        let rows = vec![
            tx("1", "A", "Spain", "CUP", 3, 1.25, "2011-05-02 10:00"),
            tx("1", "A", "Spain", "MUG", 7, 0.85, "2011-05-02 10:00"),
            tx("2", "B", "Spain", "MUG", 12, 0.85, "2011-05-03 11:00"),
            tx("3", "B", "Italy", "BAG", 1, 19.99, "2011-05-04 12:00"),
        ];
        let o = overview(&view(&rows));
        let aov = o.average_order_value.unwrap();
        assert!((aov * o.invoices as f64 - o.total_revenue).abs() < 1e-9);
    }

    #[test]
    fn revenue_is_additive_over_partitions() {
        let ds = RetailDataset::from_raw(vec![
            raw("1", Some("A"), "Spain", "CUP", 3, 1.25, "2011-01-02 10:00"),
            raw("2", Some("B"), "Spain", "MUG", -2, 0.85, "2011-02-03 11:00"),
            raw("3", Some("B"), "Italy", "BAG", 1, 19.99, "2011-03-04 12:00"),
            raw("4", Some("C"), "Italy", "BAG", 4, 19.99, "2011-03-31 23:00"),
        ]);
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let first = filter_by_date(&ds, &DateRange::new(date("2011-01-01"), date("2011-02-28")));
        let second = filter_by_date(&ds, &DateRange::new(date("2011-03-01"), date("2011-12-31")));
        let full = total_revenue(&ds.view());
        assert!((total_revenue(&first) + total_revenue(&second) - full).abs() < 1e-9);
    }

    #[test]
    fn null_customer_never_reaches_aggregates() {
        let ds = RetailDataset::from_raw(vec![
            raw("1", Some("A"), "Spain", "CUP", 3, 1.0, "2011-01-02 10:00"),
            raw("2", None, "Peru", "GHOST", 100, 100.0, "2011-01-02 11:00"),
        ]);
        let v = ds.view();
        let o = overview(&v);
        assert_eq!(o.invoices, 1);
        assert_eq!(o.best_product.as_deref(), Some("CUP"));
        assert!(revenue_by_country(&v).iter().all(|(c, _)| c != "Peru"));
        assert!(top_products(&v, "Peru").is_empty());
        assert_eq!(orders_by_hour(&v), vec![(10, 1)]);
    }

    #[test]
    fn monthly_series_is_chronological() {
        let rows = vec![
            tx("3", "A", "Spain", "CUP", 1, 3.0, "2011-02-14 10:00"),
            tx("1", "A", "Spain", "CUP", 1, 1.0, "2010-12-31 10:00"),
            tx("2", "A", "Spain", "CUP", 1, 2.0, "2011-02-01 10:00"),
        ];
        let series = monthly_revenue(&view(&rows));
        let months: Vec<String> = series.iter().map(|(m, _)| m.to_string()).collect();
        assert_eq!(months, ["2010-12-01", "2011-02-01"]);
        assert_eq!(series[1].1, 5.0);
    }

    #[test]
    fn top_products_caps_at_ten_descending() {
        let rows: Vec<Transaction> = (0..15)
            .map(|i| tx(&i.to_string(), "A", "United Kingdom", &format!("ITEM {i:02}"), i, 1.0, "2011-01-02 10:00"))
            .chain(std::iter::once(tx("99", "A", "France", "ITEM 99", 1000, 1.0, "2011-01-02 10:00")))
            .collect();
        let top = top_products(&view(&rows), "United Kingdom");
        assert_eq!(top.len(), 10);
        assert_eq!(top[0], ("ITEM 14".to_string(), 14));
        assert!(top.windows(2).all(|w| w[0].1 >= w[1].1));
        assert!(top.iter().all(|(d, _)| d != "ITEM 99"));
    }

    #[test]
    fn countries_sorted_by_revenue() {
        let rows = vec![
            tx("1", "A", "Germany", "CUP", 50, 1.0, "2011-01-02 10:00"),
            tx("2", "B", "France", "CUP", 100, 1.0, "2011-01-02 10:00"),
        ];
        let top = revenue_by_country(&view(&rows));
        assert_eq!(top, vec![("France".to_string(), 100.0), ("Germany".to_string(), 50.0)]);
    }

    #[test]
    fn customers_below_threshold_are_hidden() {
        let rows: Vec<Transaction> = (1..=12)
            .map(|i| tx(&i.to_string(), &format!("C{i:02}"), "Spain", "CUP", i, 100.0, "2011-01-02 10:00"))
            .collect();
        let all = revenue_by_customer(&view(&rows), 0.0);
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].0, "C12");
        assert!(all.windows(2).all(|w| w[0].1 >= w[1].1));

        let rich = revenue_by_customer(&view(&rows), 1000.0);
        assert_eq!(rich.len(), 3);
        assert!(rich.iter().all(|(_, r)| *r >= 1000.0));
    }

    #[test]
    fn threshold_bounds() {
        let t = RevenueThreshold::bounds(8_911_407.9);
        assert_eq!(t.floor, 8911);
        assert_eq!(t.ceiling, 10_000);
        assert_eq!(t.default_value(), 8911);
        assert_eq!(t.clamp(5), 8911);
        assert_eq!(t.clamp(50_000), 10_000);

        let negative = RevenueThreshold::bounds(-500.0);
        assert_eq!(negative.floor, 0);

        let huge = RevenueThreshold::bounds(30_000_000.5);
        assert_eq!(huge.floor, 30_000);
        assert_eq!(huge.ceiling, 30_000);
    }

    #[test]
    fn hours_ascending_with_distinct_invoices() {
        let rows = vec![
            tx("2", "A", "Spain", "CUP", 1, 1.0, "2011-01-02 15:10"),
            tx("1", "A", "Spain", "CUP", 1, 1.0, "2011-01-02 08:00"),
            tx("1", "A", "Spain", "MUG", 1, 1.0, "2011-01-02 08:00"),
            tx("3", "A", "Spain", "MUG", 1, 1.0, "2011-01-03 08:59"),
        ];
        assert_eq!(orders_by_hour(&view(&rows)), vec![(8, 2), (15, 1)]);
    }

    #[test]
    fn weekdays_monday_first() {
        // 2011-01-09 is a Sunday, 2011-01-05 a Wednesday, 2011-01-03 a Monday.
        let rows = vec![
            tx("1", "A", "Spain", "CUP", 1, 1.0, "2011-01-09 10:00"),
            tx("2", "A", "Spain", "CUP", 1, 1.0, "2011-01-05 10:00"),
            tx("3", "A", "Spain", "CUP", 1, 1.0, "2011-01-03 10:00"),
            tx("4", "A", "Spain", "CUP", 1, 1.0, "2011-01-10 10:00"),
        ];
        let days = orders_by_weekday(&view(&rows));
        assert_eq!(days, vec![(Weekday::Mon, 2), (Weekday::Wed, 1), (Weekday::Sun, 1)]);
    }

    #[test]
    fn histogram_bins_prices_of_one_country() {
        let rows = vec![
            tx("1", "A", "Spain", "CUP", 1, 0.0, "2011-01-02 10:00"),
            tx("2", "A", "Spain", "CUP", 1, 4.99, "2011-01-02 10:00"),
            tx("3", "A", "Spain", "CUP", 1, 10.0, "2011-01-02 10:00"),
            tx("4", "A", "Spain", "CUP", 1, 10.5, "2011-01-02 10:00"),
            tx("5", "A", "Italy", "CUP", 1, 5.0, "2011-01-02 10:00"),
        ];
        let h = price_histogram(&view(&rows), "Spain", 0, 10);
        assert_eq!(h.counts.len(), 50);
        assert_eq!(h.total(), 3);
        assert_eq!(h.counts[0], 1);
        assert_eq!(h.counts[24], 1);
        assert_eq!(h.counts[49], 1);
        assert!((h.bin_center(0) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn histogram_skips_non_finite_prices() {
        let rows = vec![
            tx("1", "A", "Spain", "CUP", 1, 0.5, "2011-01-02 10:00"),
            tx("2", "A", "Spain", "CUP", 1, f64::NAN, "2011-01-02 10:00"),
        ];
        let h = price_histogram(&view(&rows), "Spain", 0, 10);
        assert_eq!(h.total(), 1);
        assert_eq!(h.counts[0], 1);
    }

    #[test]
    fn histogram_with_collapsed_range() {
        let rows = vec![
            tx("1", "A", "Spain", "CUP", 1, 2.0, "2011-01-02 10:00"),
            tx("2", "A", "Spain", "CUP", 1, 2.5, "2011-01-02 10:00"),
        ];
        let h = price_histogram(&view(&rows), "Spain", 2, 2);
        assert_eq!(h.counts, vec![1]);
    }

    #[test]
    fn quantile_interpolates() {
        let values: Vec<f64> = (1..=101).map(f64::from).collect();
        assert!((quantile(&values, 0.99).unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(quantile(&[1.0, 2.0], 0.5), Some(1.5));
        assert_eq!(quantile(&[], 0.99), None);
    }

    #[test]
    fn price_ceiling_truncates() {
        let rows: Vec<Transaction> = (0..100)
            .map(|i| tx(&i.to_string(), "A", "Spain", "CUP", 1, f64::from(i) + 0.75, "2011-01-02 10:00"))
            .collect();
        // p99 of 0.75..99.75 is 98.76
        assert_eq!(price_ceiling(&view(&rows)), 98);
        assert_eq!(price_ceiling(&[]), 0);
    }

    #[test]
    fn empty_view_yields_empty_tables() {
        assert!(monthly_revenue(&[]).is_empty());
        assert!(top_products(&[], "United Kingdom").is_empty());
        assert!(revenue_by_country(&[]).is_empty());
        assert!(revenue_by_customer(&[], 0.0).is_empty());
        assert!(orders_by_hour(&[]).is_empty());
        assert!(orders_by_weekday(&[]).is_empty());
        assert_eq!(price_histogram(&[], "Spain", 0, 10).total(), 0);
    }
}
