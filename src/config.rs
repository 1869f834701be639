//! Dashboard constants shared by the aggregation engine and the UI.

/// Source file opened when no path is given on the command line.
pub const DEFAULT_SOURCE: &str = "Online Retail.xlsx";

/// Country preselected on the products view when present in the data.
pub const DEFAULT_COUNTRY: &str = "United Kingdom";

/// Length of every leaderboard (products, countries, customers).
pub const TOP_N: usize = 10;

/// Number of equal-width bins in the unit price histogram.
pub const HISTOGRAM_BINS: usize = 50;

/// Quantile of the unit price column used as the price slider ceiling.
pub const PRICE_PERCENTILE: f64 = 0.99;

/// Share of total revenue used as the customer leaderboard threshold floor.
pub const THRESHOLD_FRACTION: f64 = 0.001;

/// Upper bound of the customer revenue threshold slider.
pub const REVENUE_THRESHOLD_CEILING: i64 = 10_000;

/// File name proposed by the export dialog.
pub const EXPORT_FILE_NAME: &str = "filtered_data.csv";
