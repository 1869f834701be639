use std::collections::BTreeSet;
use std::path::Path;

use chrono::NaiveDate;
use retail_lens::data::aggregate::{RevenueThreshold, price_ceiling, total_revenue};
use retail_lens::data::export::export_to_path;
use retail_lens::data::filter::{DateRange, filter_by_date};
use retail_lens::data::model::{RetailDataset, Transaction, preferred_country};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

/// The four dashboard pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Overview,
    Products,
    CustomersCountries,
    TimeOfDay,
}

impl View {
    pub const ALL: [View; 4] = [View::Overview, View::Products, View::CustomersCountries, View::TimeOfDay];

    pub fn label(self) -> &'static str {
        match self {
            View::Overview => "Overview",
            View::Products => "Products",
            View::CustomersCountries => "Customers & Countries",
            View::TimeOfDay => "Time of Day",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductsTab {
    TopProducts,
    UnitPrices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomersTab {
    ByCountry,
    ByCustomer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeTab {
    ByHour,
    ByWeekday,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState<'a> {
    /// Session dataset, read-only.
    pub dataset: &'a RetailDataset,

    /// Active period and the values shown in the two date pickers.
    pub range: DateRange,
    pub start_pick: NaiveDate,
    pub end_pick: NaiveDate,

    /// Transactions inside `range` (recomputed on every range change).
    pub visible: Vec<&'a Transaction>,

    pub view: View,
    pub products_tab: ProductsTab,
    pub customers_tab: CustomersTab,
    pub time_tab: TimeTab,

    /// Country shown on the products page, picked from the countries with
    /// sales in the period.
    pub country: String,
    pub period_countries: BTreeSet<String>,

    /// Price slider ceiling for the current period and the selected sub-range.
    pub price_ceiling: u32,
    pub price_range: (u32, u32),

    /// Customer leaderboard threshold and its slider bounds.
    pub threshold_bounds: RevenueThreshold,
    pub revenue_threshold: i64,

    pub country_colors: ColorMap,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl<'a> AppState<'a> {
    pub fn new(dataset: &'a RetailDataset) -> Self {
        let range = DateRange::full(dataset);
        let mut state = AppState {
            dataset,
            range,
            start_pick: range.start.unwrap_or_default(),
            end_pick: range.end.unwrap_or_default(),
            visible: Vec::new(),
            view: View::Overview,
            products_tab: ProductsTab::TopProducts,
            customers_tab: CustomersTab::ByCountry,
            time_tab: TimeTab::ByHour,
            country: dataset.default_country().unwrap_or_default().to_string(),
            period_countries: BTreeSet::new(),
            price_ceiling: 0,
            price_range: (0, 0),
            threshold_bounds: RevenueThreshold::bounds(0.0),
            revenue_threshold: 0,
            country_colors: ColorMap::new(&dataset.countries),
            status_message: None,
        };
        state.refilter();
        state
    }

    /// Apply the date pickers' values as the active period.
    pub fn set_range(&mut self, start: NaiveDate, end: NaiveDate) {
        self.start_pick = start;
        self.end_pick = end;
        self.range = DateRange::new(start, end);
        self.refilter();
    }

    /// Recompute `visible` and reset the sliders whose bounds depend on it.
    pub fn refilter(&mut self) {
        self.visible = filter_by_date(self.dataset, &self.range);

        self.period_countries = self.visible.iter().map(|t| t.country.clone()).collect();
        if !self.period_countries.contains(&self.country) {
            if let Some(country) = preferred_country(&self.period_countries) {
                self.country = country.to_string();
            }
        }

        self.price_ceiling = price_ceiling(&self.visible);
        self.price_range = (0, self.price_ceiling);

        self.threshold_bounds = RevenueThreshold::bounds(total_revenue(&self.visible));
        self.revenue_threshold = self.threshold_bounds.default_value();

        log::debug!(
            "Period {:?}..{:?}: {} of {} transactions",
            self.range.start,
            self.range.end,
            self.visible.len(),
            self.dataset.len()
        );
    }

    /// Write the visible transactions to `path` and report the outcome.
    pub fn export_visible(&mut self, path: &Path) {
        self.status_message = match export_to_path(path, &self.visible) {
            Ok(rows) => Some(format!("Exported {rows} rows to {}", path.display())),
            Err(e) => {
                log::error!("Export failed: {e:#}");
                Some(format!("Error: {e:#}"))
            }
        };
    }
}
