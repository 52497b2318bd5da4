//! Tier Content Manager
//! Desktop admin tool for the tiered video-content lists used in ad placement

// Hide console window on Windows release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

// Use mimalloc for faster memory allocation (Linux, macOS)
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use eframe::egui;
use log::Level;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

mod api;
mod config;
mod drafts;
mod logging;
mod models;
mod notify;
mod query;
mod view;

use api::{with_retries, ClientConfig, TierClient};
use config::AppConfig;
use drafts::{DraftBook, DraftForm};
use models::*;
use notify::ToastKind;
use query::{QueryStatus, RequestId};
use view::{Effect, TierView};

/// Console keeps this many lines
const CONSOLE_LIMIT: usize = 500;

/// Get current local time as HH:MM:SS
fn timestamp_now() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Application icon: three stacked tier bars on a blue gradient
fn load_icon() -> egui::IconData {
    let size: usize = 64;
    let mut rgba = vec![0u8; size * size * 4];

    // (top, bottom, right edge) of each bar, widest tier first
    let bars = [(0.18, 0.32, 0.82), (0.43, 0.57, 0.68), (0.68, 0.82, 0.54)];

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let nx = x as f32 / size as f32;
            let ny = y as f32 / size as f32;

            let in_bar = bars
                .iter()
                .any(|&(top, bottom, right)| ny >= top && ny <= bottom && nx >= 0.18 && nx <= right);

            let pixel = if in_bar {
                [255, 255, 255, 255]
            } else {
                let t = nx * 0.5 + ny * 0.5;
                [
                    (37.0 + (14.0 - 37.0) * t) as u8,
                    (99.0 + (165.0 - 99.0) * t) as u8,
                    (235.0 + (233.0 - 235.0) * t) as u8,
                    255,
                ]
            };
            rgba[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}

/// Background task messages
enum TaskResult {
    IncludedLoaded {
        tier: Tier,
        request: RequestId,
        result: Result<IncludedPage, String>,
    },
    CandidatesLoaded {
        key: PageKey,
        request: RequestId,
        result: Result<CandidatePage, String>,
    },
    InclusionFinished {
        tier: Tier,
        request: RequestId,
        count: usize,
        result: Result<(), String>,
    },
}

/// Everything a worker thread needs, cloned off the app
struct FetchContext {
    client_config: ClientConfig,
    retries: u32,
    retry_delay: Duration,
    sender: Sender<TaskResult>,
    repaint: egui::Context,
}

impl FetchContext {
    fn client(&self) -> TierClient {
        TierClient::new(&self.client_config)
    }

    fn send(&self, result: TaskResult) {
        let _ = self.sender.send(result);
        self.repaint.request_repaint();
    }
}

/// Operator input collected while drawing, applied after the frame
enum UiAction {
    SelectTier(Tier),
    NextPage,
    PreviousPage,
    Search(String),
    ToggleSelection(String),
    SubmitInclusion,
    ApplySettings,
    SaveSettings,
    AddDraft,
    RemoveDraft(String),
}

fn main() -> Result<(), eframe::Error> {
    logging::initialize();
    log::info!("Tier Content Manager starting");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 800.0])
            .with_min_inner_size([1000.0, 550.0])
            .with_icon(load_icon()),
        vsync: true,
        ..Default::default()
    };

    eframe::run_native(
        "RTB Video Content Management",
        options,
        Box::new(|cc| Ok(Box::new(TierManagerApp::new(cc.egui_ctx.clone())))),
    )
}

struct TierManagerApp {
    config: AppConfig,
    current_tab: Tab,
    status_message: String,

    // Background task channel
    task_receiver: Receiver<TaskResult>,
    task_sender: Sender<TaskResult>,
    repaint: egui::Context,

    view: TierView,

    // Local drafts
    drafts: DraftBook,
    draft_form: DraftForm,
    draft_error: Option<String>,

    // Console log
    console_log: Vec<String>,
}

impl TierManagerApp {
    fn new(repaint: egui::Context) -> Self {
        let config = AppConfig::load();
        let (task_sender, task_receiver) = channel();

        let mut app = Self {
            view: TierView::new(config.notification_ttl()),
            config,
            current_tab: Tab::Contents,
            status_message: "Ready".to_string(),
            task_receiver,
            task_sender,
            repaint,
            drafts: DraftBook::new(),
            draft_form: DraftForm::default(),
            draft_error: None,
            console_log: Vec::new(),
        };
        app.log(Level::Info, "Tier Content Manager started");
        app.log(Level::Info, &format!("Service endpoint: {}", app.config.api_base_url));

        let effects = app.view.mount();
        app.run_effects(effects);
        app
    }

    fn log(&mut self, level: Level, message: &str) {
        log::log!(level, "{}", message);
        self.console_log.push(format!("[{}] [{}] {}", timestamp_now(), level, message));
        if self.console_log.len() > CONSOLE_LIMIT {
            let excess = self.console_log.len() - CONSOLE_LIMIT;
            self.console_log.drain(..excess);
        }
    }

    fn fetch_context(&self) -> FetchContext {
        FetchContext {
            client_config: self.config.client_config(),
            retries: self.config.query_retries,
            retry_delay: self.config.retry_delay(),
            sender: self.task_sender.clone(),
            repaint: self.repaint.clone(),
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.spawn_effect(effect);
        }
    }

    fn spawn_effect(&mut self, effect: Effect) {
        let ctx = self.fetch_context();

        match effect {
            Effect::FetchIncluded { tier, request } => {
                self.log(Level::Debug, &format!("Loading included contents for {}", tier.label()));
                thread::spawn(move || {
                    let client = ctx.client();
                    let result = with_retries(ctx.retries, ctx.retry_delay, || client.get_included_contents(tier))
                        .map_err(|e| e.to_string());
                    ctx.send(TaskResult::IncludedLoaded { tier, request, result });
                });
            }
            Effect::FetchCandidates { key, request } => {
                self.log(
                    Level::Debug,
                    &format!("Loading candidates for {} page {}", key.tier.label(), key.page),
                );
                thread::spawn(move || {
                    let client = ctx.client();
                    let result = with_retries(ctx.retries, ctx.retry_delay, || {
                        client.get_candidate_contents(key.tier, key.page)
                    })
                    .map_err(|e| e.to_string());
                    ctx.send(TaskResult::CandidatesLoaded { key, request, result });
                });
            }
            Effect::SubmitInclusion { tier, request, body } => {
                let count = body.inclusions.len();
                self.log(Level::Info, &format!("Including {} content(s) in {}", count, tier.label()));
                self.status_message = "Submitting inclusion...".to_string();
                thread::spawn(move || {
                    let result = ctx.client().include_contents(tier, &body).map_err(|e| e.to_string());
                    ctx.send(TaskResult::InclusionFinished { tier, request, count, result });
                });
            }
        }
    }

    fn process_results(&mut self) {
        while let Ok(result) = self.task_receiver.try_recv() {
            match result {
                TaskResult::IncludedLoaded { tier, request, result } => {
                    let summary = match &result {
                        Ok(page) => Ok(format!("{} included contents in {}", page.total_count, tier.label())),
                        Err(e) => Err(format!("Included contents for {}: {}", tier.label(), e)),
                    };
                    if self.view.included_loaded(tier, request, result) {
                        self.report(summary);
                    }
                }
                TaskResult::CandidatesLoaded { key, request, result } => {
                    let summary = match &result {
                        Ok(page) => Ok(format!(
                            "Loaded {} candidates for {} page {} ({} total)",
                            page.list.len(),
                            key.tier.label(),
                            key.page,
                            page.total_count
                        )),
                        Err(e) => Err(format!("Candidates for {} page {}: {}", key.tier.label(), key.page, e)),
                    };
                    if self.view.candidates_loaded(key, request, result) {
                        self.report(summary);
                    }
                }
                TaskResult::InclusionFinished { tier, request, count, result } => {
                    let summary = match &result {
                        Ok(()) => Ok(format!("Included {} content(s) in {}", count, tier.label())),
                        Err(e) => Err(format!("Inclusion into {} failed: {}", tier.label(), e)),
                    };
                    let effects = self
                        .view
                        .inclusion_finished(tier, request, result.map(|_| count), Instant::now());
                    self.report(summary);
                    self.run_effects(effects);
                }
            }
        }
    }

    fn report(&mut self, summary: Result<String, String>) {
        match summary {
            Ok(msg) => {
                self.log(Level::Info, &msg);
                self.status_message = msg;
            }
            Err(msg) => {
                self.log(Level::Error, &msg);
                self.status_message = format!("Error: {}", msg);
            }
        }
    }

    fn apply(&mut self, action: UiAction) {
        let effects = match action {
            UiAction::SelectTier(tier) => {
                self.log(Level::Info, &format!("Selected {}", tier.label()));
                self.view.select_tier(tier)
            }
            UiAction::NextPage => self.view.next_page(),
            UiAction::PreviousPage => self.view.previous_page(),
            UiAction::Search(text) => {
                self.view.set_search(text);
                Vec::new()
            }
            UiAction::ToggleSelection(code) => {
                self.view.toggle_selection(&code);
                Vec::new()
            }
            UiAction::SubmitInclusion => self.view.submit_inclusion(),
            UiAction::ApplySettings => {
                self.log(Level::Info, &format!("Service endpoint: {}", self.config.api_base_url));
                self.view.set_notification_ttl(self.config.notification_ttl());
                self.view.reload()
            }
            UiAction::SaveSettings => {
                match self.config.save() {
                    Ok(()) => {
                        self.log(Level::Info, "Settings saved");
                        self.status_message = "Settings saved".to_string();
                    }
                    Err(e) => self.report(Err(format!("Could not save settings: {}", e))),
                }
                Vec::new()
            }
            UiAction::AddDraft => {
                match self.drafts.add(&mut self.draft_form) {
                    Ok(added) => {
                        let msg = format!("Added local draft '{}' ({}) to {}", added.name, added.id, added.tier.label());
                        self.draft_error = None;
                        self.log(Level::Info, &msg);
                    }
                    Err(e) => self.draft_error = Some(e.to_string()),
                }
                Vec::new()
            }
            UiAction::RemoveDraft(id) => {
                if self.drafts.remove(&id) {
                    self.log(Level::Info, &format!("Removed local draft {}", id));
                }
                Vec::new()
            }
        };
        self.run_effects(effects);
    }

    fn show_top_panel(&mut self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.heading("RTB Video Content Management");
                ui.separator();
                ui.selectable_value(&mut self.current_tab, Tab::Contents, "Contents");
                ui.selectable_value(&mut self.current_tab, Tab::Drafts, "Local Drafts");
                ui.selectable_value(&mut self.current_tab, Tab::Console, "Console");
            });

            ui.horizontal(|ui| {
                ui.label("Service:");
                ui.add(egui::TextEdit::singleline(&mut self.config.api_base_url).desired_width(260.0));
                ui.label("Included host:")
                    .on_hover_text("Leave empty to use the service URL");
                ui.add(
                    egui::TextEdit::singleline(&mut self.config.included_base_url)
                        .hint_text("same as service")
                        .desired_width(200.0),
                );
                ui.label("Admin ID:");
                ui.add(egui::TextEdit::singleline(&mut self.config.admin_id).desired_width(100.0));
                if ui.button("Apply").on_hover_text("Reload both panels").clicked() {
                    actions.push(UiAction::ApplySettings);
                }
                ui.separator();
                ui.checkbox(&mut self.config.dark_mode, "Dark");
                if ui.button("Save").on_hover_text("Save current settings").clicked() {
                    actions.push(UiAction::SaveSettings);
                }
            });
            ui.add_space(3.0);
        });
    }

    fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(&self.status_message);
                if self.view.is_submitting() {
                    ui.spinner();
                }
            });
        });
    }

    fn show_included_panel(&self, ctx: &egui::Context, actions: &mut Vec<UiAction>) {
        egui::SidePanel::left("tier_panel")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                ui.heading("Tier Contents");
                ui.separator();

                let current = self.view.tier();
                egui::ComboBox::from_id_salt("tier_select")
                    .selected_text(current.label())
                    .width(200.0)
                    .show_ui(ui, |ui| {
                        let mut picked = current;
                        for tier in Tier::ALL {
                            if ui.selectable_value(&mut picked, tier, tier.label()).clicked() {
                                actions.push(UiAction::SelectTier(tier));
                            }
                        }
                    });
                ui.add_space(8.0);

                let included_stale = self.view.included_is_stale();
                match self.view.included_status() {
                    QueryStatus::Idle | QueryStatus::Loading => {
                        ui.horizontal(|ui| {
                            ui.spinner();
                            ui.label("Loading tier contents...");
                        });
                    }
                    QueryStatus::Error(msg) => {
                        ui.colored_label(egui::Color32::RED, "Error loading data")
                            .on_hover_text(msg);
                    }
                    QueryStatus::Ready { value, refreshing, .. } => {
                        ui.horizontal(|ui| {
                            ui.label(egui::RichText::new(format!("{} contents", value.total_count)).strong());
                            if refreshing {
                                ui.spinner();
                            }
                            if included_stale {
                                ui.label(egui::RichText::new("outdated").weak())
                                    .on_hover_text("Contents changed since this list was loaded");
                            }
                        });
                        ui.separator();
                        egui::ScrollArea::vertical()
                            .id_salt("included_scroll")
                            .auto_shrink([false, false])
                            .show(ui, |ui| {
                                for content in &value.list {
                                    ui.label(format!("• {}", content.name)).on_hover_text(format!(
                                        "{} / {}",
                                        content.content_code, content.pip_content_code
                                    ));
                                }
                            });
                    }
                }
            });
    }

    fn show_candidates_panel(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Content List");
        ui.separator();

        ui.horizontal(|ui| {
            let mut search = self.view.search().to_string();
            if ui
                .add(
                    egui::TextEdit::singleline(&mut search)
                        .hint_text("Search content...")
                        .desired_width(320.0),
                )
                .changed()
            {
                actions.push(UiAction::Search(search));
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let label = if self.view.is_submitting() {
                    "Including...".to_string()
                } else {
                    format!("Include Selected Contents ({})", self.view.selection().len())
                };
                if ui.add_enabled(self.view.can_submit(), egui::Button::new(label)).clicked() {
                    actions.push(UiAction::SubmitInclusion);
                }
            });
        });
        ui.add_space(6.0);

        // Pagination footer first so the table can take the remaining height
        egui::TopBottomPanel::bottom("pagination")
            .show_separator_line(false)
            .show_inside(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(self.view.has_previous_page(), egui::Button::new("Previous"))
                        .clicked()
                    {
                        actions.push(UiAction::PreviousPage);
                    }
                    let page_text = match self.view.total_count() {
                        Some(total) => format!("Page {} · {} total", self.view.page(), total),
                        None => format!("Page {}", self.view.page()),
                    };
                    ui.label(page_text);
                    if ui
                        .add_enabled(self.view.has_next_page(), egui::Button::new("Next"))
                        .clicked()
                    {
                        actions.push(UiAction::NextPage);
                    }
                });
            });

        match self.view.candidates_status() {
            QueryStatus::Idle | QueryStatus::Loading => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading...");
                });
            }
            QueryStatus::Error(msg) => {
                ui.colored_label(egui::Color32::RED, "Error loading data").on_hover_text(msg);
            }
            QueryStatus::Ready { refreshing, .. } => {
                if refreshing {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(egui::RichText::new("Refreshing...").weak());
                    });
                }
                self.show_candidate_table(ui, actions);
            }
        }
    }

    fn show_candidate_table(&self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        let rows = self.view.visible_candidates();

        egui::ScrollArea::both()
            .id_salt("candidate_scroll")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("candidate_grid")
                    .striped(true)
                    .num_columns(13)
                    .spacing([14.0, 6.0])
                    .show(ui, |ui| {
                        for header in [
                            "", "Order", "Name", "Code", "Tier", "Price", "Type", "Grade", "Exclusive",
                            "Broadcast", "Weekdays", "Status", "Included",
                        ] {
                            ui.label(egui::RichText::new(header).strong());
                        }
                        ui.end_row();

                        for content in rows {
                            let mut checked = self.view.is_selected(&content.content_code);
                            if ui.checkbox(&mut checked, "").changed() {
                                actions.push(UiAction::ToggleSelection(content.content_code.clone()));
                            }
                            ui.label(content.order.to_string());
                            ui.label(&content.name);
                            ui.label(&content.content_code)
                                .on_hover_text(format!("PIP: {}", content.pip_content_code));
                            ui.label(&content.tier_name);
                            ui.label(format_price(content.tier_price));
                            ui.label(&content.content_type);
                            ui.label(format!("{} ({})", content.grade, content.grade_kind));
                            ui.label(content.exclusive_type.as_deref().unwrap_or("-"));
                            ui.label(format!(
                                "{} ~ {}",
                                format_date(content.broadcast_start_date),
                                format_optional_date(content.broadcast_end_date)
                            ));
                            ui.label(&content.broadcast_weekdays);
                            ui.label(&content.release_status);
                            if content.is_included_tier {
                                ui.colored_label(egui::Color32::from_rgb(80, 200, 120), "✔");
                            } else {
                                ui.label("");
                            }
                            ui.end_row();
                        }
                    });
            });
    }

    fn show_drafts_tab(&mut self, ui: &mut egui::Ui, actions: &mut Vec<UiAction>) {
        ui.heading("Add New Video Content");
        ui.label(egui::RichText::new("Drafts stay on this machine and are lost on exit.").weak());
        ui.separator();

        egui::Grid::new("draft_form").num_columns(2).spacing([12.0, 6.0]).show(ui, |ui| {
            ui.label("Name:");
            ui.add(egui::TextEdit::singleline(&mut self.draft_form.name).hint_text("Video Name"));
            ui.end_row();

            ui.label("URL:");
            ui.add(
                egui::TextEdit::singleline(&mut self.draft_form.url)
                    .hint_text("Video URL")
                    .desired_width(360.0),
            );
            ui.end_row();

            ui.label("Tier:");
            egui::ComboBox::from_id_salt("draft_tier")
                .selected_text(self.draft_form.tier.label())
                .show_ui(ui, |ui| {
                    for tier in Tier::RANKED {
                        ui.selectable_value(&mut self.draft_form.tier, tier, tier.label());
                    }
                });
            ui.end_row();
        });

        ui.horizontal(|ui| {
            if ui.button("Add Video Content").clicked() {
                actions.push(UiAction::AddDraft);
            }
            if let Some(err) = &self.draft_error {
                ui.colored_label(egui::Color32::RED, err);
            }
        });
        ui.add_space(10.0);

        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            for tier in Tier::RANKED {
                ui.heading(format!("{} Video Contents", tier.label()));
                egui::Grid::new(("draft_list", tier.id()))
                    .striped(true)
                    .num_columns(3)
                    .spacing([16.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new("Name").strong());
                        ui.label(egui::RichText::new("URL").strong());
                        ui.label(egui::RichText::new("Actions").strong());
                        ui.end_row();

                        for content in self.drafts.by_tier(tier) {
                            ui.label(&content.name);
                            ui.label(&content.url);
                            if ui.button("Delete").clicked() {
                                actions.push(UiAction::RemoveDraft(content.id.clone()));
                            }
                            ui.end_row();
                        }
                    });
                ui.add_space(12.0);
            }
        });
    }

    fn show_console_tab(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Console Log");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Clear").clicked() {
                    self.console_log.clear();
                    self.console_log.push(format!("[{}] Console cleared", timestamp_now()));
                }
            });
        });
        ui.separator();

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for line in &self.console_log {
                    let color = if line.contains("[ERROR]") {
                        egui::Color32::RED
                    } else if line.contains("[WARN]") {
                        egui::Color32::YELLOW
                    } else if line.contains("[INFO]") {
                        egui::Color32::LIGHT_BLUE
                    } else {
                        egui::Color32::GRAY
                    };
                    ui.label(egui::RichText::new(line).monospace().color(color));
                }
            });
    }

    fn show_toasts(&self, ctx: &egui::Context) {
        if self.view.toasts().is_empty() {
            return;
        }
        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-16.0, -40.0))
            .show(ctx, |ui| {
                for toast in self.view.toasts().iter() {
                    let color = match toast.kind {
                        ToastKind::Success => egui::Color32::from_rgb(80, 200, 120),
                        ToastKind::Error => egui::Color32::from_rgb(230, 80, 80),
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(egui::RichText::new(&toast.message).color(color));
                    });
                    ui.add_space(4.0);
                }
            });
    }
}

impl eframe::App for TierManagerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Process background task results (non-blocking)
        self.process_results();

        let now = Instant::now();
        self.view.tick(now);

        if self.config.dark_mode {
            ctx.set_visuals(egui::Visuals::dark());
        } else {
            ctx.set_visuals(egui::Visuals::light());
        }

        let mut actions = Vec::new();

        self.show_top_panel(ctx, &mut actions);
        self.show_status_bar(ctx);

        match self.current_tab {
            Tab::Contents => {
                self.show_included_panel(ctx, &mut actions);
                egui::CentralPanel::default().show(ctx, |ui| {
                    self.show_candidates_panel(ui, &mut actions);
                });
            }
            Tab::Drafts => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    self.show_drafts_tab(ui, &mut actions);
                });
            }
            Tab::Console => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    self.show_console_tab(ui);
                });
            }
        }

        self.show_toasts(ctx);

        for action in actions {
            self.apply(action);
        }

        // Wake up again when the next toast should disappear
        if let Some(wait) = self.view.toasts().next_expiry(now) {
            ctx.request_repaint_after(wait);
        }
    }
}
