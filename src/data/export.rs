use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use super::model::{Transaction, weekday_name};

const HEADERS: [&str; 12] = [
    "invoice_no",
    "stock_code",
    "description",
    "quantity",
    "unit_price",
    "customer_id",
    "country",
    "invoice_date",
    "line_revenue",
    "month",
    "hour",
    "weekday",
];

/// One exported line: source columns followed by the derived ones.
#[derive(Serialize)]
struct ExportRow<'a> {
    invoice_no: &'a str,
    stock_code: &'a str,
    description: &'a str,
    quantity: i64,
    unit_price: f64,
    customer_id: &'a str,
    country: &'a str,
    invoice_date: String,
    line_revenue: f64,
    month: String,
    hour: u32,
    weekday: &'static str,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(t: &'a Transaction) -> Self {
        ExportRow {
            invoice_no: &t.invoice_no,
            stock_code: &t.stock_code,
            description: &t.description,
            quantity: t.quantity,
            unit_price: t.unit_price,
            customer_id: &t.customer_id,
            country: &t.country,
            invoice_date: t.invoice_date.format("%Y-%m-%d %H:%M:%S").to_string(),
            line_revenue: t.line_revenue,
            month: t.month.format("%Y-%m-%d").to_string(),
            hour: t.hour,
            weekday: weekday_name(t.weekday),
        }
    }
}

/// Write `records` as CSV with a header row, even when empty.
/// Returns the number of data rows written.
pub fn write_csv<W: Write>(writer: W, records: &[&Transaction]) -> Result<usize> {
    let mut out = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    out.write_record(HEADERS).context("writing CSV header")?;
    for t in records {
        out.serialize(ExportRow::from(*t))
            .with_context(|| format!("writing invoice {}", t.invoice_no))?;
    }
    out.flush().context("flushing CSV")?;
    Ok(records.len())
}

/// Export the filtered records to `path`.
pub fn export_to_path(path: &Path, records: &[&Transaction]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let rows = write_csv(std::io::BufWriter::new(file), records)?;
    log::info!("Exported {rows} transactions to {}", path.display());
    Ok(rows)
}
