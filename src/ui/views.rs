use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};
use retail_lens::data::aggregate;
use retail_lens::data::model::weekday_name;

use crate::color::ACCENT;
use crate::state::{AppState, CustomersTab, ProductsTab, TimeTab, View};
use crate::ui::charts;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the active page.
pub fn show(ui: &mut Ui, state: &mut AppState<'_>) {
    if state.visible.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No transactions in the selected period.");
        });
        return;
    }

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.view {
            View::Overview => overview(ui, state),
            View::Products => products(ui, state),
            View::CustomersCountries => customers_countries(ui, state),
            View::TimeOfDay => time_of_day(ui, state),
        });
}

fn page_title(ui: &mut Ui, title: &str, subtitle: &str) {
    ui.heading(title);
    ui.label(subtitle);
    ui.add_space(8.0);
}

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

fn overview(ui: &mut Ui, state: &AppState<'_>) {
    page_title(ui, "Sales overview", "Headline indicators and monthly trend.");

    let o = aggregate::overview(&state.visible);
    ui.columns(3, |cols| {
        metric(&mut cols[0], "Total revenue", &format_money(o.total_revenue));
        metric(&mut cols[1], "Orders", &format_count(o.invoices));
        metric(&mut cols[2], "Customers", &format_count(o.customers));
    });
    ui.add_space(8.0);

    ui.group(|ui: &mut Ui| {
        let aov = o.average_order_value.map(format_money).unwrap_or_else(|| "no data".into());
        ui.label(format!("Average order: {aov}"));
        ui.label(format!("Best-selling product: {}", o.best_product.as_deref().unwrap_or("no data")));
        ui.label(format!("Top customer: {}", o.top_customer.as_deref().unwrap_or("no data")));
    });
    ui.add_space(8.0);

    charts::monthly_revenue(ui, &aggregate::monthly_revenue(&state.visible));
}

fn metric(ui: &mut Ui, label: &str, value: &str) {
    ui.group(|ui: &mut Ui| {
        ui.vertical_centered(|ui: &mut Ui| {
            ui.label(label);
            ui.label(RichText::new(value).size(24.0).strong());
        });
    });
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

fn products(ui: &mut Ui, state: &mut AppState<'_>) {
    page_title(ui, "Products", "Best sellers and unit price distribution.");

    egui::ComboBox::from_label("Country")
        .selected_text(state.country.clone())
        .show_ui(ui, |ui: &mut Ui| {
            for country in &state.period_countries {
                ui.selectable_value(&mut state.country, country.clone(), country.as_str());
            }
        });
    ui.add_space(4.0);

    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.products_tab, ProductsTab::TopProducts, "Top products");
        ui.selectable_value(&mut state.products_tab, ProductsTab::UnitPrices, "Unit prices");
    });
    ui.separator();

    match state.products_tab {
        ProductsTab::TopProducts => {
            let rows: Vec<(String, f64)> = aggregate::top_products(&state.visible, &state.country)
                .into_iter()
                .map(|(description, quantity)| (description, quantity as f64))
                .collect();
            ui.strong(format!("Top 10 products – {}", state.country));
            charts::category_bars(ui, "top_products", &rows, "Quantity", true, |_| ACCENT);
        }
        ProductsTab::UnitPrices => {
            let ceiling = state.price_ceiling;
            let (lo, hi) = &mut state.price_range;
            ui.add(egui::Slider::new(&mut *lo, 0..=ceiling).text("Minimum price (£)"));
            ui.add(egui::Slider::new(&mut *hi, 0..=ceiling).text("Maximum price (£)"));
            if *lo > *hi {
                *hi = *lo;
            }

            let (lo, hi) = state.price_range;
            let histogram = aggregate::price_histogram(&state.visible, &state.country, lo, hi);
            ui.strong(format!(
                "Unit price distribution – {} ({} lines)",
                state.country,
                format_count(histogram.total())
            ));
            charts::price_histogram(ui, &histogram);
        }
    }
}

// ---------------------------------------------------------------------------
// Customers & countries
// ---------------------------------------------------------------------------

fn customers_countries(ui: &mut Ui, state: &mut AppState<'_>) {
    page_title(ui, "Customers & Countries", "Where the revenue comes from.");

    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.customers_tab, CustomersTab::ByCountry, "Revenue by country");
        ui.selectable_value(&mut state.customers_tab, CustomersTab::ByCustomer, "Revenue by customer");
    });
    ui.separator();

    match state.customers_tab {
        CustomersTab::ByCountry => {
            let rows = aggregate::revenue_by_country(&state.visible);
            ui.strong("Top 10 countries by revenue");
            let colors = &state.country_colors;
            charts::category_bars(ui, "revenue_by_country", &rows, "Revenue (£)", false, |c| colors.color_for(c));
        }
        CustomersTab::ByCustomer => {
            let bounds = state.threshold_bounds;
            ui.add(
                egui::Slider::new(&mut state.revenue_threshold, bounds.floor..=bounds.ceiling)
                    .text("Minimum revenue (£)"),
            );
            state.revenue_threshold = bounds.clamp(state.revenue_threshold);

            let rows = aggregate::revenue_by_customer(&state.visible, state.revenue_threshold as f64);
            ui.strong("Top 10 customers by revenue");
            charts::category_bars(ui, "revenue_by_customer", &rows, "Revenue (£)", false, |_| ACCENT);
            ui.add_space(8.0);
            revenue_table(ui, &rows);
        }
    }
}

fn revenue_table(ui: &mut Ui, rows: &[(String, f64)]) {
    TableBuilder::new(ui)
        .striped(true)
        .vscroll(false)
        .column(Column::auto().at_least(120.0))
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui| {
                ui.strong("Customer");
            });
            header.col(|ui| {
                ui.strong("Revenue");
            });
        })
        .body(|mut body| {
            for (customer, revenue) in rows {
                body.row(18.0, |mut row| {
                    row.col(|ui| {
                        ui.label(customer.as_str());
                    });
                    row.col(|ui| {
                        ui.label(format_money(*revenue));
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// Time of day
// ---------------------------------------------------------------------------

fn time_of_day(ui: &mut Ui, state: &mut AppState<'_>) {
    page_title(ui, "Time of Day", "When orders are placed.");

    ui.horizontal(|ui: &mut Ui| {
        ui.selectable_value(&mut state.time_tab, TimeTab::ByHour, "Orders by hour");
        ui.selectable_value(&mut state.time_tab, TimeTab::ByWeekday, "Orders by weekday");
    });
    ui.separator();

    let rows: Vec<(String, f64)> = match state.time_tab {
        TimeTab::ByHour => aggregate::orders_by_hour(&state.visible)
            .into_iter()
            .map(|(hour, orders)| (format!("{hour:02}h"), orders as f64))
            .collect(),
        TimeTab::ByWeekday => aggregate::orders_by_weekday(&state.visible)
            .into_iter()
            .map(|(day, orders)| (weekday_name(day).to_string(), orders as f64))
            .collect(),
    };
    let (id, title) = match state.time_tab {
        TimeTab::ByHour => ("orders_by_hour", "Orders by hour of day"),
        TimeTab::ByWeekday => ("orders_by_weekday", "Orders by weekday"),
    };
    ui.strong(title);
    charts::category_bars(ui, id, &rows, "Orders", false, |_| ACCENT);
}

// ---------------------------------------------------------------------------
// Number formatting
// ---------------------------------------------------------------------------

/// `1234567.891` → `£1,234,567.89`.
pub fn format_money(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}£{}.{:02}", group_thousands(cents / 100), cents % 100)
}

/// `8911` → `8,911`.
pub fn format_count(value: usize) -> String {
    group_thousands(value as u64)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
