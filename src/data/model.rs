use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike, Weekday};

// ---------------------------------------------------------------------------
// RawRecord – one source row before derivation
// ---------------------------------------------------------------------------

/// A source row as read from disk, with the customer id still optional.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: f64,
    pub customer_id: Option<String>,
    pub country: String,
    pub invoice_date: NaiveDateTime,
}

// ---------------------------------------------------------------------------
// Transaction – one loaded row with derived columns
// ---------------------------------------------------------------------------

/// A single invoice line with its derived attributes.
///
/// Built once by [`Transaction::derive`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub invoice_no: String,
    pub stock_code: String,
    pub description: String,
    /// Negative for returns.
    pub quantity: i64,
    pub unit_price: f64,
    pub customer_id: String,
    pub country: String,
    pub invoice_date: NaiveDateTime,

    /// `quantity * unit_price`.
    pub line_revenue: f64,
    /// First calendar day of the invoice month.
    pub month: NaiveDate,
    /// Hour of day, 0–23.
    pub hour: u32,
    pub weekday: Weekday,
}

impl Transaction {
    /// Derive the calculated columns.  Rows without a customer id yield `None`.
    pub fn derive(raw: RawRecord) -> Option<Self> {
        let customer_id = raw
            .customer_id
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())?;

        let ts = raw.invoice_date;
        Some(Transaction {
            line_revenue: raw.quantity as f64 * raw.unit_price,
            month: month_bucket(ts),
            hour: ts.hour(),
            weekday: ts.weekday(),
            invoice_no: raw.invoice_no,
            stock_code: raw.stock_code,
            description: raw.description,
            quantity: raw.quantity,
            unit_price: raw.unit_price,
            customer_id,
            country: raw.country,
            invoice_date: ts,
        })
    }
}

/// Truncate a timestamp to the first day of its month.
pub fn month_bucket(ts: NaiveDateTime) -> NaiveDate {
    let date = ts.date();
    date - Days::new(u64::from(date.day0()))
}

/// Full English weekday name ("Monday" … "Sunday").
/// `United Kingdom` when present, otherwise the first country by name.
pub fn preferred_country(countries: &BTreeSet<String>) -> Option<&str> {
    if countries.contains(crate::config::DEFAULT_COUNTRY) {
        return Some(crate::config::DEFAULT_COUNTRY);
    }
    countries.iter().next().map(String::as_str)
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// ---------------------------------------------------------------------------
// RetailDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// The full loaded table with pre-computed lookups for the UI.
#[derive(Debug, Clone, Default)]
pub struct RetailDataset {
    /// All transactions, in source order.
    pub records: Vec<Transaction>,
    /// Sorted distinct countries.
    pub countries: BTreeSet<String>,
    /// Earliest and latest invoice timestamp, `None` when empty.
    pub span: Option<(NaiveDateTime, NaiveDateTime)>,
    /// Source rows discarded for a missing customer id.
    pub dropped_rows: usize,
}

impl RetailDataset {
    /// Derive every raw row, dropping the ones without a customer id.
    pub fn from_raw(raw: Vec<RawRecord>) -> Self {
        let total = raw.len();
        let records: Vec<Transaction> = raw.into_iter().filter_map(Transaction::derive).collect();
        let dropped_rows = total - records.len();

        let countries = records.iter().map(|t| t.country.clone()).collect();
        let span = records.iter().fold(None, |acc, t| {
            let ts = t.invoice_date;
            Some(match acc {
                None => (ts, ts),
                Some((lo, hi)) => (std::cmp::min(lo, ts), std::cmp::max(hi, ts)),
            })
        });

        RetailDataset {
            records,
            countries,
            span,
            dropped_rows,
        }
    }

    /// Every record, as a view.
    pub fn view(&self) -> Vec<&Transaction> {
        self.records.iter().collect()
    }

    /// Country preselected on the products view.
    pub fn default_country(&self) -> Option<&str> {
        preferred_country(&self.countries)
    }

    /// Number of transactions.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------
