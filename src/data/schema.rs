use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

use super::model::RawRecord;

// ---------------------------------------------------------------------------
// Cell – one loosely typed source value
// ---------------------------------------------------------------------------

/// A source cell as produced by any of the file readers.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Wrap text, treating blank strings as empty.
    pub fn text(s: &str) -> Cell {
        if s.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s.to_string())
        }
    }

    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Int(i) => Some(i.to_string()),
            Cell::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(format!("{}", *f as i64)),
            Cell::Float(f) => Some(f.to_string()),
            Cell::DateTime(ts) => Some(ts.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }

    fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Float(f) if f.is_finite() => Some(f.round() as i64),
            Cell::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            }
            _ => None,
        }
    }

    /// Only finite values count as numbers; `NaN` and `inf` are rejected.
    fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        value.filter(|f| f.is_finite())
    }

    fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Cell::DateTime(ts) => Some(*ts),
            Cell::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

/// Formats seen in exports of the Online Retail table.
const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

/// Parse an invoice timestamp in any of the accepted text forms.
/// A bare `YYYY-MM-DD` date is read as midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ---------------------------------------------------------------------------
// Column – the required source columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    InvoiceNo,
    StockCode,
    Description,
    Quantity,
    InvoiceDate,
    UnitPrice,
    CustomerId,
    Country,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::InvoiceNo,
        Column::StockCode,
        Column::Description,
        Column::Quantity,
        Column::InvoiceDate,
        Column::UnitPrice,
        Column::CustomerId,
        Column::Country,
    ];

    /// Header name in the source workbook.
    pub fn source_name(self) -> &'static str {
        match self {
            Column::InvoiceNo => "InvoiceNo",
            Column::StockCode => "StockCode",
            Column::Description => "Description",
            Column::Quantity => "Quantity",
            Column::InvoiceDate => "InvoiceDate",
            Column::UnitPrice => "UnitPrice",
            Column::CustomerId => "CustomerID",
            Column::Country => "Country",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("source table has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("source table has no header row")]
    NoHeader,
}

/// Lower-case and drop spaces/underscores so `CustomerID`, `customer_id`
/// and `Customer ID` all match.
fn normalize_header(h: &str) -> String {
    h.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// ColumnMap – header position of every required column
// ---------------------------------------------------------------------------

/// Positions of the required columns within a header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    positions: [usize; 8],
}

impl ColumnMap {
    /// Locate every required column; extra columns are ignored.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Result<Self, SchemaError> {
        if headers.is_empty() {
            return Err(SchemaError::NoHeader);
        }
        let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h.as_ref())).collect();

        let mut positions = [0usize; 8];
        for (slot, col) in positions.iter_mut().zip(Column::ALL) {
            let wanted = normalize_header(col.source_name());
            *slot = normalized
                .iter()
                .position(|h| *h == wanted)
                .ok_or(SchemaError::MissingColumn(col.source_name()))?;
        }
        Ok(ColumnMap { positions })
    }

    /// Index of `col` within the header row.
    pub fn position(&self, col: Column) -> usize {
        self.positions[col as usize]
    }

    /// Convert one data row.  `row` is 1-based and only used in messages;
    /// `cell` returns the value at a header position.
    pub fn record<F>(&self, row: usize, cell: F) -> Result<RawRecord>
    where
        F: Fn(usize) -> Cell,
    {
        let get = |col: Column| cell(self.position(col));
        let text = |col: Column| get(col).as_text().unwrap_or_default();

        let quantity = get(Column::Quantity);
        let quantity = quantity
            .as_i64()
            .with_context(|| format!("row {row}: Quantity {quantity:?} is not an integer"))?;

        let price = get(Column::UnitPrice);
        let unit_price = price
            .as_f64()
            .with_context(|| format!("row {row}: UnitPrice {price:?} is not a number"))?;

        let date = get(Column::InvoiceDate);
        let Some(invoice_date) = date.as_datetime() else {
            bail!("row {row}: InvoiceDate {date:?} is not a timestamp");
        };

        Ok(RawRecord {
            invoice_no: text(Column::InvoiceNo),
            stock_code: text(Column::StockCode),
            description: text(Column::Description),
            quantity,
            unit_price,
            customer_id: get(Column::CustomerId).as_text().map(|c| normalize_id(&c)),
            country: text(Column::Country),
            invoice_date,
        })
    }
}

/// `17850.0` → `17850`; anything else unchanged.
fn normalize_id(id: &str) -> String {
    match id.strip_suffix(".0") {
        Some(head) if !head.is_empty() && head.chars().all(|c| c.is_ascii_digit()) => head.to_string(),
        _ => id.to_string(),
    }
}
