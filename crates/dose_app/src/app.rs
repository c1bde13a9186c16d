use anyhow::{anyhow, Context, Result};
use dose_core::{
    config::AppConfig,
    dose::DoseUnit,
    form::{EntryForm, RowId},
    history::HistoryRecord,
    render::{self, ResultPanel},
    DoseService, DoseServiceBuilder,
};
use tracing::{error, info};

const WINDOW_TITLE: &str = "Dose Calculator";

pub fn run(config: AppConfig) -> Result<()> {
    info!(history_dir = %config.history_dir.display(), timezone = %config.timezone, "starting");
    let service = DoseServiceBuilder::from_config(&config)
        .build()
        .context("failed to initialize dose service")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size([520.0, 720.0])
            .with_min_inner_size([360.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        WINDOW_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(DoseApp::new(service)))),
    )
    .map_err(|err| anyhow!("window terminated: {err}"))
}

/// A destructive history action waiting for the user to confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingConfirm {
    Delete(usize),
    ClearAll,
}

impl PendingConfirm {
    fn message(self) -> &'static str {
        match self {
            PendingConfirm::Delete(_) => "Delete this history entry?",
            PendingConfirm::ClearAll => "Clear all calculation history?",
        }
    }
}

pub struct DoseApp {
    service: DoseService,
    appointment: String,
    form: EntryForm,
    panel: Option<ResultPanel>,
    history: Vec<HistoryRecord>,
    pending: Option<PendingConfirm>,
    status: Option<String>,
}

impl DoseApp {
    pub fn new(service: DoseService) -> Self {
        let mut app = Self {
            service,
            appointment: String::new(),
            form: EntryForm::new(),
            panel: None,
            history: Vec::new(),
            pending: None,
            status: None,
        };
        app.refresh_history();
        app
    }

    pub fn form_mut(&mut self) -> &mut EntryForm {
        &mut self.form
    }

    pub fn set_appointment(&mut self, value: impl Into<String>) {
        self.appointment = value.into();
    }

    pub fn panel(&self) -> Option<&ResultPanel> {
        self.panel.as_ref()
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    pub fn pending(&self) -> Option<PendingConfirm> {
        self.pending
    }

    /// Shows the calculation, then records it. Ignored while a confirmation is open so
    /// the pending history index still points at the record the user picked.
    pub fn submit(&mut self) {
        if self.pending.is_some() {
            return;
        }
        self.status = None;
        let inputs = self.form.inputs();
        let outcome = self
            .service
            .calculate(Some(self.appointment.as_str()), &inputs);
        self.panel = Some(ResultPanel::from_outcome(&outcome));
        let Ok(result) = outcome else {
            return;
        };
        if let Err(err) = self.service.record(&result) {
            error!(%err, "calculation succeeded but history was not saved");
            self.status = Some(format!("History was not saved: {err}"));
        }
        self.refresh_history();
    }

    pub fn request(&mut self, action: PendingConfirm) {
        self.pending = Some(action);
    }

    /// Applies the pending action when `confirmed`, otherwise drops it.
    pub fn resolve(&mut self, confirmed: bool) {
        let Some(action) = self.pending.take() else {
            return;
        };
        if !confirmed {
            return;
        }
        let outcome = match action {
            PendingConfirm::Delete(index) => self.service.delete_history(index).map(|_| ()),
            PendingConfirm::ClearAll => self.service.clear_history(),
        };
        if let Err(err) = outcome {
            error!(%err, ?action, "history update failed");
            self.status = Some(format!("{err:#}"));
        }
        self.refresh_history();
    }

    fn refresh_history(&mut self) {
        match self.service.history() {
            Ok(records) => self.history = records,
            Err(err) => {
                error!(%err, "unable to load history");
                self.status = Some(format!("{err:#}"));
            }
        }
    }
}

impl eframe::App for DoseApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let interactive = self.pending.is_none();
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_enabled_ui(interactive, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    ui.heading(WINDOW_TITLE);
                    if let Some(status) = &self.status {
                        ui.colored_label(egui::Color32::YELLOW, status);
                    }
                    ui.separator();
                    self.render_form(ui);
                    ui.separator();
                    self.render_result(ui);
                    ui.separator();
                    self.render_history(ui);
                });
            });
        });
        self.render_confirmation(ctx);
    }
}

impl DoseApp {
    fn render_form(&mut self, ui: &mut egui::Ui) {
        let today = self.service.today_string();
        ui.horizontal(|ui| {
            ui.label("Appointment date");
            ui.add(
                egui::TextEdit::singleline(&mut self.appointment)
                    .hint_text(format!("YYYY-MM-DD, {today} or later"))
                    .desired_width(160.0),
            );
        });

        let mut removed: Option<RowId> = None;
        for row in self.form.rows_mut() {
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.strong(render::drug_label(row.id.0 as usize));
                    ui.label("Amount");
                    ui.add(
                        egui::TextEdit::singleline(&mut row.amount)
                            .hint_text("e.g. 2")
                            .desired_width(60.0),
                    );
                    egui::ComboBox::from_id_salt(("dose-unit", row.id.0))
                        .selected_text(row.unit.label())
                        .show_ui(ui, |ui| {
                            for unit in DoseUnit::ALL {
                                ui.selectable_value(&mut row.unit, unit, unit.label());
                            }
                        });
                    if ui.button("Remove").clicked() {
                        removed = Some(row.id);
                    }
                });
            });
        }
        if let Some(id) = removed {
            self.form.remove_row(id);
        }

        ui.horizontal(|ui| {
            if ui.button("Add drug").clicked() {
                self.form.add_row();
            }
            if ui.button("Calculate").clicked() {
                self.submit();
            }
        });
    }

    fn render_result(&self, ui: &mut egui::Ui) {
        match &self.panel {
            None => {}
            Some(ResultPanel::Error(message)) => {
                ui.colored_label(egui::Color32::RED, message);
            }
            Some(ResultPanel::Success { days, lines }) => {
                ui.strong(render::days_text(*days));
                for line in lines {
                    ui.label(format!("• {line}"));
                }
            }
        }
    }

    fn render_history(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("History");
            if !self.history.is_empty() && ui.button("Clear all").clicked() {
                self.pending = Some(PendingConfirm::ClearAll);
            }
        });

        if self.history.is_empty() {
            ui.weak(render::EMPTY_HISTORY);
            return;
        }

        let mut requested = None;
        for (index, record) in self.history.iter().enumerate() {
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.label(render::history_header(record));
                    if ui.button("Delete").clicked() {
                        requested = Some(PendingConfirm::Delete(index));
                    }
                });
                for line in &record.lines {
                    ui.label(format!("• {}", render::dose_line_text(line)));
                }
            });
        }
        if let Some(action) = requested {
            self.request(action);
        }
    }

    fn render_confirmation(&mut self, ctx: &egui::Context) {
        let Some(action) = self.pending else {
            return;
        };
        let mut decision = None;
        egui::Window::new("Confirm")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(action.message());
                ui.horizontal(|ui| {
                    if ui.button("OK").clicked() {
                        decision = Some(true);
                    }
                    if ui.button("Cancel").clicked() {
                        decision = Some(false);
                    }
                });
            });
        if let Some(confirmed) = decision {
            self.resolve(confirmed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use dose_core::{
        clock::FixedClock,
        storage::{MemoryBackend, StorageBackend},
        HistoryError,
    };

    use super::*;

    /// Reads succeed but every write fails.
    struct ReadOnlyBackend(MemoryBackend);

    impl StorageBackend for ReadOnlyBackend {
        fn read(&self, key: &str) -> Result<Option<String>, HistoryError> {
            self.0.read(key)
        }

        fn write(&self, key: &str, _value: &str) -> Result<(), HistoryError> {
            Err(HistoryError::Io {
                key: key.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }

        fn remove(&self, key: &str) -> Result<(), HistoryError> {
            self.0.remove(key)
        }
    }

    fn app_with(backend: Box<dyn StorageBackend>) -> DoseApp {
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 1, 0, 0).unwrap();
        let service = DoseService::builder()
            .clock(Arc::new(FixedClock(now)))
            .backend(backend)
            .build()
            .expect("build dose service");
        DoseApp::new(service)
    }

    fn app() -> DoseApp {
        app_with(Box::new(MemoryBackend::new()))
    }

    fn doses(app: &DoseApp) -> Vec<f64> {
        app.history().iter().map(|r| r.lines[0].dose).collect()
    }

    fn fill_first_row(app: &mut DoseApp, amount: &str) {
        let id = app.form_mut().rows()[0].id;
        app.form_mut().row_mut(id).expect("row").amount = amount.into();
    }

    #[test]
    fn submit_shows_result_and_records_history() {
        let mut app = app();
        app.set_appointment("2026-10-26");
        fill_first_row(&mut app, "2");
        app.submit();

        assert_eq!(
            app.panel(),
            Some(&ResultPanel::Success {
                days: 10,
                lines: vec!["Drug ①: 20 tablets".into()],
            })
        );
        assert_eq!(app.history().len(), 1);
    }

    #[test]
    fn missing_date_shows_error_only() {
        let mut app = app();
        fill_first_row(&mut app, "2");
        app.submit();
        assert!(app.panel().expect("panel").is_error());
        assert!(app.history().is_empty());
    }

    #[test]
    fn destructive_actions_wait_for_confirmation() {
        let mut app = app();
        app.set_appointment("2026-10-20");
        fill_first_row(&mut app, "1");
        app.submit();
        app.submit();
        assert_eq!(app.history().len(), 2);

        app.request(PendingConfirm::Delete(0));
        app.resolve(false);
        assert_eq!(app.pending(), None);
        assert_eq!(app.history().len(), 2);

        app.request(PendingConfirm::Delete(0));
        app.resolve(true);
        assert_eq!(app.history().len(), 1);

        app.request(PendingConfirm::ClearAll);
        app.resolve(true);
        assert!(app.history().is_empty());
    }

    #[test]
    fn calculating_is_blocked_while_a_delete_is_pending() {
        let mut app = app();
        app.set_appointment("2026-10-20");
        fill_first_row(&mut app, "1");
        app.submit();
        assert_eq!(doses(&app), vec![4.0]);

        app.request(PendingConfirm::Delete(0));
        fill_first_row(&mut app, "5");
        app.submit();
        assert_eq!(doses(&app), vec![4.0]);

        app.resolve(true);
        assert!(app.history().is_empty());

        app.submit();
        assert_eq!(doses(&app), vec![20.0]);
    }

    #[test]
    fn result_is_shown_even_when_history_cannot_be_saved() {
        let mut app = app_with(Box::new(ReadOnlyBackend(MemoryBackend::new())));
        app.set_appointment("2026-10-26");
        fill_first_row(&mut app, "2");
        app.submit();

        assert_eq!(
            app.panel(),
            Some(&ResultPanel::Success {
                days: 10,
                lines: vec!["Drug ①: 20 tablets".into()],
            })
        );
        assert!(app.status.as_deref().unwrap_or_default().starts_with("History was not saved"));
        assert!(app.history().is_empty());
    }
}
