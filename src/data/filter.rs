use chrono::{Days, NaiveDate, NaiveDateTime};

use super::model::{RetailDataset, Transaction};

// ---------------------------------------------------------------------------
// DateRange – the period picked in the side panel
// ---------------------------------------------------------------------------

/// Inclusive range of calendar days.
///
/// A range with only one bound set is incomplete and filters nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Range covering every record of the dataset; unbounded when it is empty.
    pub fn full(dataset: &RetailDataset) -> Self {
        match dataset.span {
            Some((lo, hi)) => DateRange::new(lo.date(), hi.date()),
            None => DateRange::default(),
        }
    }

    /// Timestamp bounds `[start 00:00, end + 1 day)`, or `None` when a bound
    /// is missing.
    fn bounds(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let start = self.start?.and_hms_opt(0, 0, 0)?;
        let end = self.end?.checked_add_days(Days::new(1))?.and_hms_opt(0, 0, 0)?;
        Some((start, end))
    }

    /// Whether `ts` falls inside the range.  Incomplete ranges contain everything.
    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        match self.bounds() {
            Some((start, end)) => start <= ts && ts < end,
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Narrow the whole dataset to `range`, keeping source order.
pub fn filter_by_date<'a>(dataset: &'a RetailDataset, range: &DateRange) -> Vec<&'a Transaction> {
    dataset
        .records
        .iter()
        .filter(|t| range.contains(t.invoice_date))
        .collect()
}

/// Narrow an existing view further; reapplying the same range is a no-op.
pub fn apply_to_view<'a>(view: &[&'a Transaction], range: &DateRange) -> Vec<&'a Transaction> {
    view.iter()
        .copied()
        .filter(|t| range.contains(t.invoice_date))
        .collect()
}

/// Keep only the transactions of one country.
pub fn restrict_to_country<'a>(view: &[&'a Transaction], country: &str) -> Vec<&'a Transaction> {
    view.iter().copied().filter(|t| t.country == country).collect()
}
