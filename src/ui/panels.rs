use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;
use retail_lens::config::EXPORT_FILE_NAME;
use retail_lens::data::filter::DateRange;

use crate::state::{AppState, View};

// ---------------------------------------------------------------------------
// Left side panel – period, export, navigation
// ---------------------------------------------------------------------------

/// Render the left side panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState<'_>) {
    ui.heading("Online Retail");
    ui.label("Interactive analysis of the Online Retail sales dataset.");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            period_picker(ui, state);
            ui.add_space(4.0);

            if ui
                .add_enabled(!state.visible.is_empty(), egui::Button::new("⬇ Download filtered data"))
                .clicked()
            {
                save_file_dialog(state);
            }
            ui.separator();

            ui.strong("Go to");
            for view in View::ALL {
                ui.radio_value(&mut state.view, view, view.label());
            }
            ui.separator();

            egui::CollapsingHeader::new(RichText::new("Navigation").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    ui.label("• Overview: indicators and monthly revenue.");
                    ui.label("• Products: best sellers and unit price distribution.");
                    ui.label("• Customers & Countries: top customers and countries by revenue.");
                    ui.label("• Time of Day: orders by hour and by weekday.");
                    ui.add_space(4.0);
                    ui.label("The period filter applies to every page.");
                });

            ui.separator();
            ui.small("Dataset: UCI Online Retail");
        });
}

/// Two date pickers; any change becomes the active period.
fn period_picker(ui: &mut Ui, state: &mut AppState<'_>) {
    ui.strong("Period");
    if state.dataset.span.is_none() {
        ui.label("No dates available.");
        return;
    }

    let mut start = state.start_pick;
    let mut end = state.end_pick;
    egui::Grid::new("period_grid").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("From");
        ui.add(DatePickerButton::new(&mut start).id_salt("period_start").format("%d/%m/%Y"));
        ui.end_row();
        ui.label("To");
        ui.add(DatePickerButton::new(&mut end).id_salt("period_end").format("%d/%m/%Y"));
        ui.end_row();
    });
    if start != state.start_pick || end != state.end_pick {
        state.set_range(start, end);
    }

    if ui.small_button("Whole period").clicked() {
        let full = DateRange::full(state.dataset);
        if let (Some(start), Some(end)) = (full.start, full.end) {
            state.set_range(start, end);
        }
    }
    if state.start_pick > state.end_pick {
        ui.label(RichText::new("Start date is after end date.").color(Color32::YELLOW));
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState<'_>) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Export filtered data…").clicked() {
                save_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Quit").clicked() {
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }
        });

        ui.separator();

        ui.label(format!(
            "{} transactions loaded, {} in period",
            state.dataset.len(),
            state.visible.len()
        ));
        if state.dataset.dropped_rows > 0 {
            ui.label(
                RichText::new(format!("({} without customer ignored)", state.dataset.dropped_rows))
                    .color(Color32::GRAY),
            );
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") { Color32::RED } else { Color32::LIGHT_GREEN };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn save_file_dialog(state: &mut AppState<'_>) {
    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name(EXPORT_FILE_NAME)
        .add_filter("CSV", &["csv"])
        .save_file();

    if let Some(path) = file {
        state.export_visible(&path);
    }
}
