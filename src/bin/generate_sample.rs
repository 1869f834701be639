//! Writes a synthetic Online Retail table as `sample_retail.csv` and
//! `sample_retail.parquet` for trying the dashboard without the UCI workbook.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array, StringArray, TimestampSecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Weekday};
use parquet::arrow::ArrowWriter;

const PRODUCTS: &[(&str, &str, f64)] = &[
    ("85123A", "WHITE HANGING HEART T-LIGHT HOLDER", 2.55),
    ("71053", "WHITE METAL LANTERN", 3.39),
    ("84406B", "CREAM CUPID HEARTS COAT HANGER", 2.75),
    ("84029G", "KNITTED UNION FLAG HOT WATER BOTTLE", 3.39),
    ("22752", "SET 7 BABUSHKA NESTING BOXES", 7.65),
    ("21730", "GLASS STAR FROSTED T-LIGHT HOLDER", 4.25),
    ("22633", "HAND WARMER UNION JACK", 1.85),
    ("22745", "POPPY'S PLAYHOUSE BEDROOM", 2.10),
    ("22728", "ALARM CLOCK BAKELIKE PINK", 3.75),
    ("22726", "ALARM CLOCK BAKELIKE GREEN", 3.75),
    ("21754", "HOME BUILDING BLOCK WORD", 5.95),
    ("84879", "ASSORTED COLOUR BIRD ORNAMENT", 1.69),
    ("22086", "PAPER CHAIN KIT 50'S CHRISTMAS", 2.95),
    ("85099B", "JUMBO BAG RED RETROSPOT", 1.95),
    ("22423", "REGENCY CAKESTAND 3 TIER", 12.75),
    ("47566", "PARTY BUNTING", 4.95),
    ("20725", "LUNCH BAG RED RETROSPOT", 1.65),
    ("23084", "RABBIT NIGHT LIGHT", 2.08),
    ("22197", "POPCORN HOLDER", 0.85),
    ("M", "Manual", 18.00),
];

/// (country, relative weight)
const COUNTRIES: &[(&str, u32)] = &[
    ("United Kingdom", 85),
    ("Germany", 3),
    ("France", 3),
    ("EIRE", 2),
    ("Spain", 1),
    ("Netherlands", 1),
    ("Belgium", 1),
    ("Switzerland", 1),
    ("Portugal", 1),
    ("Australia", 1),
    ("Norway", 1),
];

const INVOICES: usize = 4_000;
const CUSTOMERS: u64 = 400;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `[lo, hi]`.
    fn range(&mut self, lo: u64, hi: u64) -> u64 {
        lo + self.next_u64() % (hi - lo + 1)
    }

    fn pick_weighted<'a>(&mut self, items: &'a [(&'a str, u32)]) -> &'a str {
        let total: u32 = items.iter().map(|(_, w)| w).sum();
        let mut roll = self.range(0, u64::from(total) - 1) as u32;
        for (item, weight) in items {
            if roll < *weight {
                return *item;
            }
            roll -= weight;
        }
        items[0].0
    }
}

/// One generated invoice line.
struct Line {
    invoice_no: String,
    stock_code: &'static str,
    description: &'static str,
    quantity: i64,
    invoice_date: NaiveDateTime,
    unit_price: f64,
    customer_id: Option<u64>,
    country: String,
}

fn invoice_time(rng: &mut SimpleRng, first_day: NaiveDate, days: u64) -> NaiveDateTime {
    loop {
        let date = first_day + Days::new(rng.range(0, days));
        // The shop does not trade on Saturdays.
        if date.weekday() == Weekday::Sat {
            continue;
        }
        // Busiest around midday.
        let hour = (7 + rng.range(0, 6) + rng.range(0, 7)) as u32;
        let minute = rng.range(0, 59) as u32;
        if let Some(ts) = date.and_hms_opt(hour, minute, 0) {
            return ts;
        }
    }
}

fn generate(rng: &mut SimpleRng) -> Result<Vec<Line>> {
    let first_day = NaiveDate::from_ymd_opt(2010, 12, 1).context("invalid start date")?;
    let last_day = NaiveDate::from_ymd_opt(2011, 12, 9).context("invalid end date")?;
    let days = u64::try_from((last_day - first_day).num_days())?;

    let mut lines = Vec::new();
    for n in 0..INVOICES {
        let cancelled = rng.next_f64() < 0.02;
        let invoice_no = format!("{}{}", if cancelled { "C" } else { "" }, 536_365 + n);
        let invoice_date = invoice_time(rng, first_day, days);
        let customer_id = (rng.next_f64() >= 0.2).then(|| 12_346 + rng.range(0, CUSTOMERS - 1));
        let country = rng.pick_weighted(COUNTRIES).to_string();

        for _ in 0..rng.range(1, 8) {
            let (stock_code, description, price) = PRODUCTS[rng.range(0, PRODUCTS.len() as u64 - 1) as usize];
            let quantity = rng.range(1, 24) as i64;
            lines.push(Line {
                invoice_no: invoice_no.clone(),
                stock_code,
                description,
                quantity: if cancelled { -quantity } else { quantity },
                invoice_date,
                unit_price: price,
                customer_id,
                country: country.clone(),
            });
        }
    }
    Ok(lines)
}

fn write_csv(path: &str, lines: &[Line]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record([
        "InvoiceNo", "StockCode", "Description", "Quantity", "InvoiceDate", "UnitPrice", "CustomerID", "Country",
    ])?;
    for line in lines {
        writer.write_record([
            line.invoice_no.clone(),
            line.stock_code.to_string(),
            line.description.to_string(),
            line.quantity.to_string(),
            line.invoice_date.format("%m/%d/%Y %H:%M").to_string(),
            line.unit_price.to_string(),
            line.customer_id.map(|c| c.to_string()).unwrap_or_default(),
            line.country.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &str, lines: &[Line]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("InvoiceNo", DataType::Utf8, false),
        Field::new("StockCode", DataType::Utf8, false),
        Field::new("Description", DataType::Utf8, false),
        Field::new("Quantity", DataType::Int64, false),
        Field::new("InvoiceDate", DataType::Timestamp(TimeUnit::Second, None), false),
        Field::new("UnitPrice", DataType::Float64, false),
        // Pandas stores the id as a nullable float.
        Field::new("CustomerID", DataType::Float64, true),
        Field::new("Country", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(lines.iter().map(|l| l.invoice_no.as_str()))),
            Arc::new(StringArray::from_iter_values(lines.iter().map(|l| l.stock_code))),
            Arc::new(StringArray::from_iter_values(lines.iter().map(|l| l.description))),
            Arc::new(Int64Array::from_iter_values(lines.iter().map(|l| l.quantity))),
            Arc::new(TimestampSecondArray::from_iter_values(
                lines.iter().map(|l| l.invoice_date.and_utc().timestamp()),
            )),
            Arc::new(Float64Array::from_iter_values(lines.iter().map(|l| l.unit_price))),
            Arc::new(Float64Array::from_iter(lines.iter().map(|l| l.customer_id.map(|c| c as f64)))),
            Arc::new(StringArray::from_iter_values(lines.iter().map(|l| l.country.as_str()))),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let lines = generate(&mut rng)?;

    write_csv("sample_retail.csv", &lines)?;
    write_parquet("sample_retail.parquet", &lines)?;

    let without_customer = lines.iter().filter(|l| l.customer_id.is_none()).count();
    println!(
        "Wrote {} lines from {INVOICES} invoices ({without_customer} without customer) \
         to sample_retail.csv and sample_retail.parquet",
        lines.len()
    );
    Ok(())
}
