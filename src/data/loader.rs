use std::path::Path;
use std::sync::OnceLock;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::{can_cast_types, cast};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int32Type, Int64Type, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType,
};
use calamine::{Data, Reader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{RawRecord, RetailDataset};
use super::schema::{Cell, Column, ColumnMap};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

static DATASET: OnceLock<RetailDataset> = OnceLock::new();

/// Load the session dataset once and hand out the same table afterwards.
///
/// Only the first successful call reads `path`; later calls ignore their
/// argument and return the memoized table.
pub fn cached_dataset(path: &Path) -> Result<&'static RetailDataset> {
    if let Some(dataset) = DATASET.get() {
        return Ok(dataset);
    }
    let dataset = load_file(path)?;
    Ok(DATASET.get_or_init(|| dataset))
}

/// Load a transactions table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first sheet, header in row 1
/// * `.csv`     – header row with the Online Retail column names
/// * `.json`    – `[{ "InvoiceNo": ..., "Quantity": ..., ... }, ...]`
/// * `.parquet` – one column per field, names as in the CSV header
pub fn load_file(path: &Path) -> Result<RetailDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let raw = match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "ods" => load_spreadsheet(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    let dataset = RetailDataset::from_raw(raw);
    log::info!(
        "Loaded {} transactions from {} ({} rows without customer dropped, {} countries)",
        dataset.len(),
        path.display(),
        dataset.dropped_rows,
        dataset.countries.len()
    );
    match dataset.span {
        Some((lo, hi)) => log::info!("Invoices span {lo} .. {hi}"),
        None => log::warn!("{} contains no usable transactions", path.display()),
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// Read the first worksheet; row 1 is the header.
fn load_spreadsheet(path: &Path) -> Result<Vec<RawRecord>> {
    let mut workbook = calamine::open_workbook_auto(path).context("opening workbook")?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .context("workbook has no sheets")?;
    if workbook.sheet_names().len() > 1 {
        log::warn!("Workbook has several sheets, reading only '{sheet}'");
    }
    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("reading sheet '{sheet}'"))?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::with_capacity(range.height().saturating_sub(1));
    for (row_no, row) in rows.enumerate() {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        let record = columns.record(row_no + 1, |i| row.get(i).map(spreadsheet_cell).unwrap_or(Cell::Empty))?;
        records.push(record);
    }
    Ok(records)
}

fn spreadsheet_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s),
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(Cell::DateTime)
            .unwrap_or(Cell::Float(dt.as_f64())),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one invoice line per row.
fn load_csv(path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {}", row_no + 1))?;
        let record = columns.record(row_no + 1, |i| Cell::text(row.get(i).unwrap_or("")))?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "InvoiceNo": "536365", "Quantity": 6, "CustomerID": 17850.0, ... },
///   ...
/// ]
/// ```
///
/// Column names come from the first object; a key missing from a later
/// object reads as empty.
fn load_json(path: &Path) -> Result<Vec<RawRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;
    let Some(first) = rows.first() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = first
        .as_object()
        .context("Row 1 is not a JSON object")?
        .keys()
        .cloned()
        .collect();
    let columns = ColumnMap::from_headers(&headers)?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {} is not a JSON object", i + 1))?;
        let record = columns.record(i + 1, |col| {
            obj.get(&headers[col]).map(json_cell).unwrap_or(Cell::Empty)
        })?;
        records.push(record);
    }
    Ok(records)
}

fn json_cell(val: &JsonValue) -> Cell {
    match val {
        JsonValue::Null => Cell::Empty,
        JsonValue::String(s) => Cell::text(s),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::Float).unwrap_or(Cell::Empty),
        },
        other => Cell::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one flat column per field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`); `InvoiceDate` may be a timestamp,
/// a date or text.
fn load_parquet(path: &Path) -> Result<Vec<RawRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let columns = ColumnMap::from_headers(&headers)?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    let mut row_base = 0;
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let mut arrays = batch.columns().to_vec();
        for col in Column::ALL {
            let i = columns.position(col);
            arrays[i] = readable_column(&headers[i], &arrays[i])?;
        }
        for row in 0..batch.num_rows() {
            let record = columns.record(row_base + row + 1, |i| arrow_cell(&arrays[i], row))?;
            records.push(record);
        }
        row_base += batch.num_rows();
    }
    Ok(records)
}

/// Cast a column into one of the types `arrow_cell` reads.
///
/// Dictionaries are unpacked to their values, string views become `Utf8`,
/// narrow or unsigned integers widen to `Int64` and anything else castable
/// is read as text.
fn readable_column(name: &str, col: &ArrayRef) -> Result<ArrayRef> {
    let target = match col.data_type() {
        DataType::Utf8
        | DataType::LargeUtf8
        | DataType::Int32
        | DataType::Int64
        | DataType::Float32
        | DataType::Float64
        | DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(..) => return Ok(col.clone()),
        DataType::Dictionary(_, values) => values.as_ref().clone(),
        DataType::Int8 | DataType::Int16 | DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            DataType::Int64
        }
        DataType::Float16 | DataType::Decimal128(..) | DataType::Decimal256(..) => DataType::Float64,
        _ => DataType::Utf8,
    };
    if !can_cast_types(col.data_type(), &target) {
        bail!("column '{name}' has unsupported type {}", col.data_type());
    }
    let cast_col = cast(col, &target)
        .with_context(|| format!("converting column '{name}' from {}", col.data_type()))?;
    if matches!(col.data_type(), DataType::Dictionary(..)) {
        readable_column(name, &cast_col)
    } else {
        Ok(cast_col)
    }
}

/// Extract one cell from an Arrow column.
fn arrow_cell(col: &ArrayRef, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Empty;
    }
    match col.data_type() {
        DataType::Utf8 => Cell::text(col.as_string::<i32>().value(row)),
        DataType::LargeUtf8 => Cell::text(col.as_string::<i64>().value(row)),
        DataType::Int32 => Cell::Int(i64::from(col.as_primitive::<Int32Type>().value(row))),
        DataType::Int64 => Cell::Int(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Cell::Float(f64::from(col.as_primitive::<Float32Type>().value(row))),
        DataType::Float64 => Cell::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Date32 => datetime_cell(col.as_primitive::<Date32Type>().value_as_datetime(row)),
        DataType::Date64 => datetime_cell(col.as_primitive::<Date64Type>().value_as_datetime(row)),
        DataType::Timestamp(unit, _) => datetime_cell(match unit {
            TimeUnit::Second => col.as_primitive::<TimestampSecondType>().value_as_datetime(row),
            TimeUnit::Millisecond => col.as_primitive::<TimestampMillisecondType>().value_as_datetime(row),
            TimeUnit::Microsecond => col.as_primitive::<TimestampMicrosecondType>().value_as_datetime(row),
            TimeUnit::Nanosecond => col.as_primitive::<TimestampNanosecondType>().value_as_datetime(row),
        }),
        // Unreachable once the column went through `readable_column`.
        _ => Cell::Empty,
    }
}

fn datetime_cell(ts: Option<chrono::NaiveDateTime>) -> Cell {
    ts.map(Cell::DateTime).unwrap_or(Cell::Empty)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Arc;

    use super::*;

    const HEADER: &str = "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country\n";

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_drops_rows_without_customer() {
        let file = write_temp(
            ".csv",
            &format!(
                "{HEADER}\
                 536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,12/1/2010 8:26,2.55,17850,United Kingdom\n\
                 536414,22139,,56,12/1/2010 11:52,0,,United Kingdom\n\
                 536370,22728,ALARM CLOCK BAKELIKE PINK,24,12/1/2010 8:45,3.75,12583,France\n"
            ),
        );
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.dropped_rows, 1);
        assert_eq!(ds.records[1].country, "France");
        assert!((ds.records[1].line_revenue - 90.0).abs() < 1e-9);
    }

    #[test]
    fn csv_with_missing_column_fails() {
        let file = write_temp(".csv", "InvoiceNo,Quantity\n1,2\n");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("StockCode"));
    }

    #[test]
    fn json_records_are_loaded() {
        let file = write_temp(
            ".json",
            r#"[
                {"InvoiceNo": "536365", "StockCode": "71053", "Description": "WHITE METAL LANTERN",
                 "Quantity": 6, "InvoiceDate": "2010-12-01 08:26:00", "UnitPrice": 3.39,
                 "CustomerID": 17850.0, "Country": "United Kingdom"},
                {"InvoiceNo": "536366", "StockCode": "22633", "Description": "HAND WARMER UNION JACK",
                 "Quantity": 6, "InvoiceDate": "2010-12-01 08:28:00", "UnitPrice": 1.85,
                 "CustomerID": null, "Country": "United Kingdom"}
            ]"#,
        );
        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.records[0].customer_id, "17850");
        assert_eq!(ds.dropped_rows, 1);
    }

    #[test]
    fn parquet_with_timestamp_and_float_ids() {
        use arrow::array::{Float64Array, Int64Array, StringArray, TimestampSecondArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new("InvoiceNo", DataType::Utf8, false),
            Field::new("StockCode", DataType::Utf8, false),
            Field::new("Description", DataType::Utf8, false),
            Field::new("Quantity", DataType::Int64, false),
            Field::new("InvoiceDate", DataType::Timestamp(TimeUnit::Second, None), false),
            Field::new("UnitPrice", DataType::Float64, false),
            Field::new("CustomerID", DataType::Float64, true),
            Field::new("Country", DataType::Utf8, false),
        ]));
        // 2010-12-01 08:26:00 UTC
        let ts = 1_291_191_960;
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["536365", "536366"])),
                Arc::new(StringArray::from(vec!["71053", "22633"])),
                Arc::new(StringArray::from(vec!["WHITE METAL LANTERN", "HAND WARMER UNION JACK"])),
                Arc::new(Int64Array::from(vec![6, 6])),
                Arc::new(TimestampSecondArray::from(vec![ts, ts + 120])),
                Arc::new(Float64Array::from(vec![3.39, 1.85])),
                Arc::new(Float64Array::from(vec![Some(17850.0), None])),
                Arc::new(StringArray::from(vec!["United Kingdom", "United Kingdom"])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.dropped_rows, 1);
        assert_eq!(ds.records[0].customer_id, "17850");
        assert_eq!(ds.records[0].invoice_date.to_string(), "2010-12-01 08:26:00");
    }

    #[test]
    fn parquet_with_dictionary_and_narrow_columns() {
        use arrow::array::{DictionaryArray, Float64Array, Int16Array, StringArray, TimestampSecondArray};
        use arrow::datatypes::{Field, Int8Type, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let dictionary = |values: Vec<&str>| -> DictionaryArray<Int8Type> { values.into_iter().collect() };
        let country = dictionary(vec!["United Kingdom", "France", "United Kingdom"]);
        let description = dictionary(vec!["WHITE METAL LANTERN", "HAND WARMER UNION JACK", "WHITE METAL LANTERN"]);
        let dict_type = DataType::Dictionary(Box::new(DataType::Int8), Box::new(DataType::Utf8));

        let schema = Arc::new(Schema::new(vec![
            Field::new("InvoiceNo", DataType::Utf8, false),
            Field::new("StockCode", DataType::Utf8, false),
            Field::new("Description", dict_type.clone(), false),
            Field::new("Quantity", DataType::Int16, false),
            Field::new("InvoiceDate", DataType::Timestamp(TimeUnit::Second, None), false),
            Field::new("UnitPrice", DataType::Float64, false),
            Field::new("CustomerID", DataType::Float64, true),
            Field::new("Country", dict_type, false),
        ]));
        let ts = 1_291_191_960;
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["536365", "536366", "536367"])),
                Arc::new(StringArray::from(vec!["71053", "22633", "71053"])),
                Arc::new(description),
                Arc::new(Int16Array::from(vec![6, 12, -2])),
                Arc::new(TimestampSecondArray::from(vec![ts, ts + 60, ts + 120])),
                Arc::new(Float64Array::from(vec![3.39, 1.85, 3.39])),
                Arc::new(Float64Array::from(vec![17850.0, 13047.0, 17850.0])),
                Arc::new(country),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.reopen().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(file.path()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.records[1].country, "France");
        assert_eq!(ds.records[1].description, "HAND WARMER UNION JACK");
        assert_eq!(ds.records[1].quantity, 12);
        assert_eq!(ds.records[2].quantity, -2);
        let countries: Vec<&str> = ds.countries.iter().map(String::as_str).collect();
        assert_eq!(countries, ["France", "United Kingdom"]);
    }

    #[test]
    fn string_views_and_booleans_read_as_text() {
        use arrow::array::{BooleanArray, StringViewArray, UInt32Array};

        let view: ArrayRef = Arc::new(StringViewArray::from(vec!["Spain"]));
        let view = readable_column("Country", &view).unwrap();
        assert_eq!(view.data_type(), &DataType::Utf8);
        assert_eq!(arrow_cell(&view, 0), Cell::text("Spain"));

        let flag: ArrayRef = Arc::new(BooleanArray::from(vec![true]));
        let flag = readable_column("Description", &flag).unwrap();
        assert_eq!(arrow_cell(&flag, 0), Cell::text("true"));

        let qty: ArrayRef = Arc::new(UInt32Array::from(vec![24]));
        let qty = readable_column("Quantity", &qty).unwrap();
        assert_eq!(arrow_cell(&qty, 0), Cell::Int(24));
    }

    fn workbook(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
    }

    #[test]
    fn xlsx_reads_native_dates_and_numeric_ids() {
        let ds = load_file(&workbook("online_retail_sample.xlsx")).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.dropped_rows, 1);

        let first = &ds.records[0];
        assert_eq!(first.invoice_no, "536365");
        assert_eq!(first.stock_code, "85123A");
        assert_eq!(first.customer_id, "17850");
        assert_eq!(first.quantity, 6);
        assert_eq!(first.invoice_date.to_string(), "2010-12-01 12:00:00");
        assert!((first.line_revenue - 15.3).abs() < 1e-9);

        let second = &ds.records[1];
        assert_eq!(second.stock_code, "84879");
        assert_eq!(second.customer_id, "13047");
        assert_eq!(second.country, "France");
        assert_eq!(second.invoice_date.to_string(), "2010-12-02 06:00:00");
    }

    #[test]
    fn xlsx_without_country_column() {
        let err = load_file(&workbook("missing_country.xlsx")).unwrap_err();
        assert!(format!("{err:#}").contains("no 'Country' column"), "{err:#}");
    }

    #[test]
    fn xlsx_bad_cell_names_the_data_row() {
        let err = load_file(&workbook("bad_quantity.xlsx")).unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("row 2: Quantity"), "{msg}");
        assert!(msg.contains("bad_quantity.xlsx"), "{msg}");
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_file(Path::new("/nonexistent/Online Retail.csv")).is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let file = write_temp(".txt", "whatever");
        let err = load_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));
    }

    #[test]
    fn cached_dataset_reads_once() {
        let file = write_temp(
            ".csv",
            &format!("{HEADER}536365,71053,WHITE METAL LANTERN,6,2010-12-01 08:26:00,3.39,17850,United Kingdom\n"),
        );
        let first = cached_dataset(file.path()).unwrap();
        // A path that does not exist still returns the memoized table.
        let second = cached_dataset(Path::new("/nonexistent.csv")).unwrap();
        assert!(std::ptr::eq(first, second));
    }
}
