use chrono::NaiveDate;
use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoints, Points, uniform_grid_spacer};

use retail_lens::data::aggregate::PriceHistogram;

use crate::color::ACCENT;

const CHART_HEIGHT: f32 = 360.0;

/// Label for the category at integer position `mark`, blank between categories.
fn category_label(labels: &[String], mark: GridMark) -> String {
    let idx = mark.value.round();
    if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

fn static_plot(id: &str) -> Plot {
    Plot::new(id)
        .height(CHART_HEIGHT)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .allow_boxed_zoom(false)
}

// ---------------------------------------------------------------------------
// Line chart (monthly revenue)
// ---------------------------------------------------------------------------

/// Revenue per month as a line with markers.
pub fn monthly_revenue(ui: &mut Ui, series: &[(NaiveDate, f64)]) {
    let labels: Vec<String> = series.iter().map(|(m, _)| m.format("%b %Y").to_string()).collect();
    let points: Vec<[f64; 2]> = series
        .iter()
        .enumerate()
        .map(|(i, (_, revenue))| [i as f64, *revenue])
        .collect();

    ui.strong("Monthly revenue");
    static_plot("monthly_revenue")
        .x_axis_label("Month")
        .y_axis_label("Revenue (£)")
        .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
        .x_axis_formatter(move |mark, _range| category_label(&labels, mark))
        .include_y(0.0)
        .show(ui, |plot_ui| {
            plot_ui.line(
                Line::new(PlotPoints::from(points.clone()))
                    .name("Revenue")
                    .color(ACCENT)
                    .width(2.0),
            );
            plot_ui.points(Points::new(PlotPoints::from(points)).radius(3.5).color(ACCENT));
        });
}

// ---------------------------------------------------------------------------
// Bar charts
// ---------------------------------------------------------------------------

/// One bar per category, in the given order.
///
/// Horizontal charts list the first row at the top.
pub fn category_bars(
    ui: &mut Ui,
    id: &str,
    rows: &[(String, f64)],
    value_label: &str,
    horizontal: bool,
    color_for: impl Fn(&str) -> Color32,
) {
    let n = rows.len();
    // Horizontal bars grow upwards from 0, so flip to keep rank 1 on top.
    let position = |i: usize| if horizontal { (n - 1 - i) as f64 } else { i as f64 };

    let bars: Vec<Bar> = rows
        .iter()
        .enumerate()
        .map(|(i, (label, value))| {
            Bar::new(position(i), *value)
                .name(label)
                .fill(color_for(label.as_str()))
                .width(0.7)
        })
        .collect();

    let mut labels: Vec<String> = rows.iter().map(|(label, _)| label.clone()).collect();
    if horizontal {
        labels.reverse();
    }

    let mut chart = BarChart::new(bars).name(value_label);
    if horizontal {
        chart = chart.horizontal();
    }

    let plot = static_plot(id).include_x(0.0).include_y(0.0);
    let plot = if horizontal {
        plot.x_axis_label(value_label)
            .y_grid_spacer(uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
            .y_axis_formatter(move |mark, _range| category_label(&labels, mark))
            .y_axis_min_width(180.0)
    } else {
        plot.y_axis_label(value_label)
            .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 1.0, 1.0]))
            .x_axis_formatter(move |mark, _range| category_label(&labels, mark))
    };
    plot.show(ui, |plot_ui| plot_ui.bar_chart(chart));
}

/// Unit price histogram; each bar spans its bin.
pub fn price_histogram(ui: &mut Ui, histogram: &PriceHistogram) {
    let bars: Vec<Bar> = histogram
        .counts
        .iter()
        .enumerate()
        .map(|(i, count)| {
            Bar::new(histogram.bin_center(i), *count as f64)
                .width(histogram.bin_width)
                .fill(ACCENT)
        })
        .collect();

    static_plot("price_histogram")
        .x_axis_label("Unit price (£)")
        .y_axis_label("Count")
        .include_y(0.0)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).name("Lines")));
}
