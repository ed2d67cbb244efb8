//! Terminal host for the entity wizards.
//!
//! Layout:
//! - Centered window titled with the entity wizard
//! - Left step panel (F2 collapses it; the choice is persisted)
//! - Content panel with the active step's fields, inline errors and the banner
//! - Bottom button row: [ Back ] [ Next|Submit|Close ] [ Cancel ]
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid corrupting the terminal UI.

use crate::api::Submitter;
use crate::artifacts::id_card::{ArtifactRenderer, Branding, SvgCardRenderer};
use crate::entities::EntityKind;
use crate::error::WizardError;
use crate::host::preferences::NavPreferences;
use crate::host::HostEnvironment;
use crate::models::field::FieldValue;
use crate::models::responses::SubmitReceipt;
use crate::models::state::SubmissionStatus;
use crate::utils::encoding;
use crate::wizard::controller::{CompletionOutcome, NextOutcome, SubmitTicket, WizardController};
use crate::wizard::schema::{FieldKind, StepField, StepKind};
use crate::wizard::validator::item_key;
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::info;
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Field(usize),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    ConfirmCancel,
    Message { title: String, body: String },
}

enum UiMsg {
    SubmitFinished {
        ticket: SubmitTicket,
        result: Result<SubmitReceipt, WizardError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowTarget {
    Field(&'static str),
    Item {
        list: &'static str,
        index: usize,
        field: &'static str,
    },
}

/// One focusable line in the content panel.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Row {
    key: String,
    label: String,
    kind: FieldKind,
    required: bool,
    target: RowTarget,
}

pub struct TuiOptions {
    pub entity: EntityKind,
    pub host: HostEnvironment,
    pub submitter: Arc<dyn Submitter>,
    pub branding: Branding,
}

struct TuiApp {
    controller: WizardController,
    prefs: NavPreferences,
    submitter: Arc<dyn Submitter>,
    renderer: Arc<dyn ArtifactRenderer>,
    branding: Branding,
    rt: tokio::runtime::Runtime,
    tx: mpsc::Sender<UiMsg>,
    rx: mpsc::Receiver<UiMsg>,
    focus: FocusTarget,
    // Raw text for date and document rows, keyed like error keys.
    drafts: HashMap<String, String>,
    modal: Option<Modal>,
    sidebar_collapsed: bool,
    quit: bool,
}

impl TuiApp {
    fn new(opts: TuiOptions) -> Result<Self> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (tx, rx) = mpsc::channel::<UiMsg>();
        let prefs = opts.host.preferences();
        let mut app = Self {
            controller: opts.entity.controller(),
            sidebar_collapsed: prefs.sidebar_collapsed(),
            prefs,
            submitter: opts.submitter,
            renderer: Arc::new(SvgCardRenderer),
            branding: opts.branding,
            rt,
            tx,
            rx,
            focus: FocusTarget::Button(ButtonFocus::Next),
            drafts: HashMap::new(),
            modal: None,
            quit: false,
        };
        app.focus_first_field();
        Ok(app)
    }

    fn rows(&self) -> Vec<Row> {
        let schema = self.controller.schema();
        let Some(step) = schema.step(self.controller.current_step()) else {
            return Vec::new();
        };
        if step.kind != StepKind::DataEntry {
            return Vec::new();
        }
        let fields = self.controller.state().fields();
        let mut rows = Vec::new();
        for field in &step.fields {
            match field {
                StepField::Single(spec) => rows.push(Row {
                    key: spec.name.to_string(),
                    label: spec.label.to_string(),
                    kind: spec.kind,
                    required: spec.required,
                    target: RowTarget::Field(spec.name),
                }),
                StepField::List(list) => {
                    for index in 0..fields.list(list.name).len() {
                        for sub in &list.fields {
                            rows.push(Row {
                                key: item_key(list.name, index, sub.name),
                                label: format!("{} #{} {}", list.item_label, index + 1, sub.label),
                                kind: sub.kind,
                                required: sub.required,
                                target: RowTarget::Item {
                                    list: list.name,
                                    index,
                                    field: sub.name,
                                },
                            });
                        }
                    }
                }
            }
        }
        rows
    }

    fn stored_value(&self, row: &Row) -> String {
        let fields = self.controller.state().fields();
        match row.target {
            RowTarget::Field(name) => match fields.get(name) {
                Some(FieldValue::Text(s)) => s.clone(),
                Some(FieldValue::Date(_)) => fields.date_string(name),
                _ => String::new(),
            },
            RowTarget::Item { list, index, field } => fields
                .list(list)
                .get(index)
                .map(|item| item.get(field).to_string())
                .unwrap_or_default(),
        }
    }

    fn display_value(&self, row: &Row) -> String {
        let stored = self.stored_value(row);
        match row.kind {
            FieldKind::Document | FieldKind::Artifact if encoding::is_data_url(&stored) => {
                describe_attachment(&stored)
            }
            FieldKind::Document => self.drafts.get(&row.key).cloned().unwrap_or_default(),
            FieldKind::Artifact => "(generated on Next)".to_string(),
            FieldKind::Date => self.drafts.get(&row.key).cloned().unwrap_or(stored),
            FieldKind::Text => stored,
        }
    }

    fn focus_first_field(&mut self) {
        self.focus = if self.rows().is_empty() {
            FocusTarget::Button(ButtonFocus::Next)
        } else {
            FocusTarget::Field(0)
        };
    }

    fn focus_key(&mut self, key: &str) {
        if let Some(i) = self.rows().iter().position(|r| r.key == key) {
            self.focus = FocusTarget::Field(i);
        }
    }

    fn focus_first_error(&mut self) {
        let errors = self.controller.state().field_errors();
        let first = self.rows().iter().position(|r| errors.contains_key(&r.key));
        match first {
            Some(i) => self.focus = FocusTarget::Field(i),
            None => self.focus_first_field(),
        }
    }

    fn move_focus(&mut self, forward: bool) {
        let n = self.rows().len();
        let order: Vec<FocusTarget> = (0..n)
            .map(FocusTarget::Field)
            .chain([
                FocusTarget::Button(ButtonFocus::Back),
                FocusTarget::Button(ButtonFocus::Next),
                FocusTarget::Button(ButtonFocus::Cancel),
            ])
            .collect();
        let pos = order.iter().position(|f| *f == self.focus).unwrap_or(0);
        let next = if forward {
            (pos + 1) % order.len()
        } else {
            (pos + order.len() - 1) % order.len()
        };
        self.focus = order[next];
    }

    fn focused_row(&self) -> Option<Row> {
        match self.focus {
            FocusTarget::Field(i) => self.rows().get(i).cloned(),
            FocusTarget::Button(_) => None,
        }
    }

    fn show_message(&mut self, title: &str, body: impl Into<String>) {
        self.modal = Some(Modal::Message {
            title: title.to_string(),
            body: body.into(),
        });
    }

    // =========================
    // Editing
    // =========================

    fn edit_focused(&mut self, code: KeyCode) {
        let Some(row) = self.focused_row() else {
            return;
        };
        match row.kind {
            FieldKind::Artifact => {}
            FieldKind::Document => {
                let draft = self.drafts.entry(row.key.clone()).or_default();
                apply_edit(draft, code);
            }
            FieldKind::Date => {
                let stored = self.stored_value(&row);
                let draft = self.drafts.entry(row.key.clone()).or_insert(stored);
                if !apply_edit(draft, code) {
                    return;
                }
                let parsed = NaiveDate::parse_from_str(draft.trim(), "%Y-%m-%d").ok();
                if let RowTarget::Field(name) = row.target {
                    if let Err(e) = self.controller.set_date(name, parsed) {
                        log::debug!("[PHASE: tui] [STEP: edit] {} rejected: {}", row.key, e);
                    }
                }
            }
            FieldKind::Text => {
                let mut value = self.stored_value(&row);
                if !apply_edit(&mut value, code) {
                    return;
                }
                let res = match row.target {
                    RowTarget::Field(name) => self.controller.set_text(name, value),
                    RowTarget::Item { list, index, field } => {
                        self.controller.set_item_field(list, index, field, value)
                    }
                };
                if let Err(e) = res {
                    log::debug!("[PHASE: tui] [STEP: edit] {} rejected: {}", row.key, e);
                }
            }
        }
    }

    fn attach_focused(&mut self) {
        let Some(row) = self.focused_row() else {
            return;
        };
        if row.kind != FieldKind::Document {
            self.move_focus(true);
            return;
        }
        let raw = self.drafts.get(&row.key).cloned().unwrap_or_default();
        if raw.trim().is_empty() {
            self.show_message("Attach file", "Type the path of the file to attach, then press Enter.");
            return;
        }
        let path = PathBuf::from(raw.trim());
        let res = match row.target {
            RowTarget::Field(name) => self.rt.block_on(self.controller.attach_document(name, &path)),
            RowTarget::Item { list, index, field } => self.rt.block_on(
                self.controller
                    .attach_item_document(list, index, field, &path),
            ),
        };
        match res {
            Ok(()) => {
                self.drafts.remove(&row.key);
                self.move_focus(true);
            }
            Err(e) => self.show_message("Attach file", e.user_message()),
        }
    }

    fn focused_or_first_list(&self) -> Option<&'static str> {
        if let Some(Row {
            target: RowTarget::Item { list, .. },
            ..
        }) = self.focused_row()
        {
            return Some(list);
        }
        let step = self.controller.schema().step(self.controller.current_step())?;
        step.fields.iter().find_map(|f| match f {
            StepField::List(l) => Some(l.name),
            StepField::Single(_) => None,
        })
    }

    fn add_item(&mut self) {
        let Some(list) = self.focused_or_first_list() else {
            return;
        };
        match self.controller.add_item(list) {
            Ok(index) => {
                // Item drafts are positional.
                self.drafts.retain(|k, _| !k.starts_with(&format!("{}[", list)));
                let first = self
                    .controller
                    .schema()
                    .find_list(list)
                    .and_then(|l| l.fields.first())
                    .map(|f| item_key(list, index, f.name));
                if let Some(key) = first {
                    self.focus_key(&key);
                }
            }
            Err(e) => log::debug!("[PHASE: tui] [STEP: add_item] {}", e),
        }
    }

    fn remove_item(&mut self) {
        let Some(Row {
            target: RowTarget::Item { list, index, .. },
            ..
        }) = self.focused_row()
        else {
            return;
        };
        match self.controller.remove_item(list, index) {
            Ok(true) => {
                self.drafts.retain(|k, _| !k.starts_with(&format!("{}[", list)));
                self.focus_first_field();
            }
            Ok(false) => {
                let label = self
                    .controller
                    .schema()
                    .find_list(list)
                    .map(|l| (l.min_items, l.item_label))
                    .unwrap_or((1, "item"));
                self.show_message(
                    "Cannot remove",
                    format!("At least {} {} is required", label.0, label.1),
                );
            }
            Err(e) => log::debug!("[PHASE: tui] [STEP: remove_item] {}", e),
        }
    }

    // =========================
    // Navigation
    // =========================

    /// Cards reflect the member data, so they are (re)rendered right before leaving the step.
    fn render_step_artifacts(&mut self) {
        let Some(step) = self.controller.schema().step(self.controller.current_step()) else {
            return;
        };
        let lists: Vec<&'static str> = step
            .fields
            .iter()
            .filter_map(|f| match f {
                StepField::List(l) if l.artifact_field().is_some() => Some(l.name),
                _ => None,
            })
            .collect();
        for list in lists {
            let count = self.controller.state().fields().list(list).len();
            for index in 0..count {
                let renderer = self.renderer.clone();
                let res = self.rt.block_on(self.controller.render_item_artifact(
                    list,
                    index,
                    renderer.as_ref(),
                    &self.branding,
                ));
                if let Err(e) = res {
                    log::warn!("[PHASE: tui] [STEP: artifact] {}[{}]: {}", list, index, e);
                }
            }
        }
    }

    fn press_next(&mut self) {
        if self.controller.is_confirmation() {
            self.controller.close();
            self.quit = true;
            return;
        }
        self.render_step_artifacts();
        match self.controller.next() {
            NextOutcome::Advanced { .. } => {
                self.drafts.clear();
                self.focus_first_field();
            }
            NextOutcome::Blocked { .. } | NextOutcome::ReviewRejected { .. } => {
                self.focus_first_error();
            }
            NextOutcome::Submit(ticket) => self.spawn_submit(ticket),
            NextOutcome::SubmitAborted(e) => self.show_message("Submission failed", e.user_message()),
            NextOutcome::Ignored => {}
        }
    }

    fn spawn_submit(&mut self, ticket: SubmitTicket) {
        info!(
            "[PHASE: tui] [STEP: submit] dispatching {} generation={}",
            ticket.entity.as_id(),
            ticket.generation
        );
        let tx = self.tx.clone();
        let submitter = self.submitter.clone();
        thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();
            let result = match rt {
                Ok(rt) => rt.block_on(submitter.submit(&ticket)),
                Err(e) => Err(WizardError::Unexpected(format!("runtime: {}", e))),
            };
            let _ = tx.send(UiMsg::SubmitFinished { ticket, result });
        });
    }

    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            self.apply_message(msg);
        }
    }

    fn apply_message(&mut self, msg: UiMsg) {
        match msg {
            UiMsg::SubmitFinished { ticket, result } => {
                match self.controller.complete_submission(&ticket, result) {
                    CompletionOutcome::Confirmed { .. } => {
                        self.focus = FocusTarget::Button(ButtonFocus::Next);
                    }
                    CompletionOutcome::Failed { error, .. } => {
                        if error.is_auth_required() {
                            self.show_message("Sign in required", error.user_message());
                        }
                        self.focus_first_field();
                    }
                    CompletionOutcome::Discarded => {}
                }
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        if let Some(modal) = self.modal.clone() {
            match modal {
                Modal::ConfirmCancel => match code {
                    KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                        self.focus = match self.focus {
                            FocusTarget::Button(ButtonFocus::Cancel) => {
                                FocusTarget::Button(ButtonFocus::Next)
                            }
                            _ => FocusTarget::Button(ButtonFocus::Cancel),
                        };
                    }
                    KeyCode::Enter => {
                        let confirm = self.focus == FocusTarget::Button(ButtonFocus::Cancel);
                        self.modal = None;
                        if confirm && self.controller.close() {
                            self.quit = true;
                        }
                    }
                    KeyCode::Esc => self.modal = None,
                    _ => {}
                },
                Modal::Message { .. } => {
                    if matches!(code, KeyCode::Enter | KeyCode::Esc) {
                        self.modal = None;
                    }
                }
            }
            return;
        }

        let submitting = self.controller.state().submission_status() == SubmissionStatus::Submitting;
        match code {
            KeyCode::Esc => {
                if !submitting {
                    self.modal = Some(Modal::ConfirmCancel);
                    self.focus = FocusTarget::Button(ButtonFocus::Next);
                }
            }
            KeyCode::Tab | KeyCode::Down => self.move_focus(true),
            KeyCode::BackTab | KeyCode::Up => self.move_focus(false),
            KeyCode::F(2) => match self.prefs.toggle_sidebar() {
                Ok(collapsed) => self.sidebar_collapsed = collapsed,
                Err(e) => log::warn!("[PHASE: tui] [STEP: prefs] {}", e),
            },
            KeyCode::F(3) => self.add_item(),
            KeyCode::F(4) => self.remove_item(),
            KeyCode::F(5) => self.controller.dismiss_banner(),
            KeyCode::Enter => match self.focus {
                FocusTarget::Button(ButtonFocus::Back) => {
                    self.controller.back();
                    self.drafts.clear();
                    self.focus_first_field();
                }
                FocusTarget::Button(ButtonFocus::Next) => self.press_next(),
                FocusTarget::Button(ButtonFocus::Cancel) => {
                    if !submitting {
                        self.modal = Some(Modal::ConfirmCancel);
                    }
                }
                FocusTarget::Field(_) => self.attach_focused(),
            },
            other => self.edit_focused(other),
        }
    }
}

/// Apply a text-editing key at the end of `value`. Returns whether it changed anything.
fn apply_edit(value: &mut String, code: KeyCode) -> bool {
    match code {
        KeyCode::Char(c) => {
            value.push(c);
            true
        }
        KeyCode::Backspace => value.pop().is_some(),
        _ => false,
    }
}

fn describe_attachment(data_url: &str) -> String {
    match encoding::decode_data_url(data_url) {
        Ok((mime, bytes)) => format!("[attached {} {} KB]", mime, (bytes.len() + 1023) / 1024),
        Err(_) => "[attached]".to_string(),
    }
}

/// Interactive run on the real terminal.
pub fn run(opts: TuiOptions) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: start] Starting TUI wizard entity={}",
        opts.entity.as_id()
    );

    let mut app = TuiApp::new(opts)?;
    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, &mut app);
    restore_terminal(&mut terminal)?;

    result
}

/// Smoke-only state: sample data, positioned on the review step.
fn new_smoke_app(entity: EntityKind, host: HostEnvironment, branding: Branding) -> Result<TuiApp> {
    let mut app = TuiApp::new(TuiOptions {
        entity,
        host,
        submitter: Arc::new(crate::api::OfflineSubmitter::default()),
        branding,
    })?;
    entity
        .fill_sample(&mut app.controller)
        .map_err(|e| anyhow::anyhow!("sample data for {}: {}", entity, e))?;
    while app.controller.current_step() < app.controller.schema().review_index() {
        app.render_step_artifacts();
        match app.controller.next() {
            NextOutcome::Advanced { .. } => {}
            other => anyhow::bail!("smoke: {} sample did not advance: {:?}", entity, other),
        }
    }
    app.focus = FocusTarget::Button(ButtonFocus::Next);
    Ok(app)
}

/// Non-interactive smoke mode: render a single frame and return it as text.
pub fn smoke(entity: EntityKind, host: HostEnvironment, branding: Branding) -> Result<String> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke entity={}",
        entity.as_id()
    );

    let app = new_smoke_app(entity, host, branding)?;

    // In-memory backend: no raw mode / alternate screen.
    let backend = TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, &app))?;

    Ok(buffer_text(terminal.backend()))
}

fn buffer_text(backend: &TestBackend) -> String {
    let buffer = backend.buffer();
    let width = buffer.area.width as usize;
    buffer
        .content()
        .chunks(width.max(1))
        .map(|row| row.iter().map(|c| c.symbol()).collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut TuiApp) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    while !app.quit {
        app.drain_messages();
        terminal.draw(|f| draw(f.size(), f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_millis(0));

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }
    }

    Ok(())
}

// =========================
// Drawing
// =========================

fn draw(area: Rect, f: &mut ratatui::Frame<'_>, app: &TuiApp) {
    let window_area = centered_window(area, 100, 30);
    let schema = app.controller.schema();

    let outer_block = Block::default()
        .borders(Borders::ALL)
        .title(format!("MineOps | {}", schema.title));
    f.render_widget(outer_block, window_area);

    let inner = window_area.inner(&ratatui::layout::Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)].as_ref())
        .split(inner);

    let sidebar_width = if app.sidebar_collapsed { 7 } else { 26 };
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(sidebar_width), Constraint::Min(0)].as_ref())
        .split(rows[0]);

    draw_sidebar(f, cols[0], app);
    draw_content(f, cols[1], app);
    draw_buttons(f, rows[1], app);

    match &app.modal {
        Some(Modal::ConfirmCancel) => draw_cancel_modal(f, window_area, app),
        Some(Modal::Message { title, body }) => draw_message_modal(f, window_area, title, body),
        None => {}
    }
}

fn draw_sidebar(f: &mut ratatui::Frame<'_>, area: Rect, app: &TuiApp) {
    let current = app.controller.current_step();
    let lines: Vec<Line> = app
        .controller
        .schema()
        .steps
        .iter()
        .map(|step| {
            let marker = if step.index < current {
                "✓"
            } else if step.index == current {
                ">"
            } else {
                " "
            };
            let text = if app.sidebar_collapsed {
                format!("{}{}", marker, step.index + 1)
            } else {
                format!("{} {}. {}", marker, step.index + 1, step.title)
            };
            let style = if step.index == current {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(Span::styled(text, style))
        })
        .collect();
    let title = if app.sidebar_collapsed { "" } else { "Steps (F2)" };
    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    f.render_widget(p, area);
}

fn draw_content(f: &mut ratatui::Frame<'_>, area: Rect, app: &TuiApp) {
    let c = &app.controller;
    let state = c.state();
    let step_title = c
        .schema()
        .step(c.current_step())
        .map(|s| s.title)
        .unwrap_or("");

    let mut lines: Vec<Line> = Vec::new();
    if let Some(banner) = state.banner() {
        lines.push(Line::from(Span::styled(
            banner.to_string(),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }
    if state.submission_status() == SubmissionStatus::Submitting {
        lines.push(Line::from("Submitting..."));
        lines.push(Line::from(""));
    }

    let mut focus_line = 0usize;
    match c.step_kind() {
        StepKind::DataEntry => {
            let errors = c.visible_errors();
            for (i, row) in app.rows().iter().enumerate() {
                let focused = app.focus == FocusTarget::Field(i);
                if focused {
                    focus_line = lines.len();
                }
                let label = format!("{}{}: ", row.label, if row.required { "*" } else { "" });
                let value_style = if focused {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                lines.push(Line::from(vec![
                    Span::raw(label),
                    Span::styled(format!("{} ", app.display_value(row)), value_style),
                ]));
                if let Some(msg) = errors.and_then(|e| e.get(&row.key)) {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", msg),
                        Style::default().fg(Color::Red),
                    )));
                }
            }
            if let Some(msg) = errors.and_then(|e| {
                c.schema()
                    .step(c.current_step())
                    .into_iter()
                    .flat_map(|s| s.fields.iter())
                    .find_map(|fld| match fld {
                        StepField::List(l) => e.get(l.name),
                        StepField::Single(_) => None,
                    })
            }) {
                lines.push(Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Red))));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Tab moves focus. F3/F4 add or remove an item. F5 dismisses the banner. Enter attaches a typed file path.",
                Style::default().fg(Color::DarkGray),
            )));
        }
        StepKind::Review => lines.extend(review_lines(app)),
        StepKind::Confirmation => {
            lines.push(Line::from("Your submission was received."));
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::raw("Reference number: "),
                Span::styled(
                    state.reference_number().unwrap_or("").to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
            ]));
        }
    }

    let visible = area.height.saturating_sub(2) as usize;
    let scroll = focus_line.saturating_sub(visible.saturating_sub(2)) as u16;
    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(step_title))
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    f.render_widget(p, area);
}

fn review_lines(app: &TuiApp) -> Vec<Line<'static>> {
    let schema = app.controller.schema();
    let fields = app.controller.state().fields();
    let mut lines = Vec::new();
    for step in schema.data_steps() {
        lines.push(Line::from(Span::styled(
            step.title.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for field in &step.fields {
            match field {
                StepField::Single(spec) => {
                    let value = match spec.kind {
                        FieldKind::Date => fields.date_string(spec.name),
                        FieldKind::Document => {
                            if fields.opt_text(spec.name).is_some() {
                                "attached".to_string()
                            } else {
                                "not provided".to_string()
                            }
                        }
                        _ => fields.text(spec.name),
                    };
                    lines.push(Line::from(format!("  {}: {}", spec.label, value)));
                }
                StepField::List(list) => {
                    let items = fields.list(list.name);
                    lines.push(Line::from(format!("  {}: {}", list.label, items.len())));
                    for item in items {
                        let summary: Vec<String> = list
                            .fields
                            .iter()
                            .filter(|f| f.kind == FieldKind::Text)
                            .filter_map(|f| item.non_empty(f.name))
                            .take(3)
                            .collect();
                        lines.push(Line::from(format!("    - {}", summary.join(", "))));
                    }
                }
            }
        }
    }
    lines
}

fn centered_window(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width.saturating_sub(2)).max(60).min(area.width);
    let h = height.min(area.height.saturating_sub(2)).max(20).min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn next_label(app: &TuiApp) -> &'static str {
    match app.controller.step_kind() {
        StepKind::Review => "Submit",
        StepKind::Confirmation => "Close",
        StepKind::DataEntry => "Next",
    }
}

fn draw_buttons(f: &mut ratatui::Frame<'_>, area: Rect, app: &TuiApp) {
    let c = &app.controller;
    let submitting = c.state().submission_status() == SubmissionStatus::Submitting;
    let back_enabled = c.current_step() > 0 && !c.is_confirmation() && !submitting;
    let next_enabled = !submitting;
    let cancel_enabled = !submitting;

    let back = button_text(
        "Back",
        app.focus == FocusTarget::Button(ButtonFocus::Back),
        back_enabled,
    );
    let next = button_text(
        next_label(app),
        app.focus == FocusTarget::Button(ButtonFocus::Next),
        next_enabled,
    );
    let cancel = button_text(
        "Cancel",
        app.focus == FocusTarget::Button(ButtonFocus::Cancel),
        cancel_enabled,
    );

    let line = Line::from(vec![back, Span::raw(" "), next, Span::raw(" "), cancel]);
    let p = Paragraph::new(Text::from(line)).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

fn modal_area(window_area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(window_area.width.saturating_sub(4)).max(30);
    let h = height.min(window_area.height.saturating_sub(4)).max(5);
    Rect {
        x: window_area.x + (window_area.width.saturating_sub(w)) / 2,
        y: window_area.y + (window_area.height.saturating_sub(h)) / 2,
        width: w,
        height: h,
    }
}

fn draw_cancel_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, app: &TuiApp) {
    let area = modal_area(window_area, 56, 7);
    f.render_widget(Clear, area);

    let block = Block::default().borders(Borders::ALL).title("Cancel?");
    let body = Paragraph::new(Text::from(vec![
        Line::from("Discard everything entered in this wizard?"),
        Line::from(""),
    ]))
    .block(block)
    .wrap(Wrap { trim: false });
    f.render_widget(body, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(2),
        width: area.width.saturating_sub(2),
        height: 1,
    };
    let yes = button_text(
        "Yes, discard",
        app.focus == FocusTarget::Button(ButtonFocus::Cancel),
        true,
    );
    let no = button_text("No", app.focus != FocusTarget::Button(ButtonFocus::Cancel), true);
    let line = Line::from(vec![yes, Span::raw(" "), no]);
    f.render_widget(Paragraph::new(Text::from(line)).alignment(Alignment::Right), buttons_area);
}

fn draw_message_modal(f: &mut ratatui::Frame<'_>, window_area: Rect, title: &str, body: &str) {
    let area = modal_area(window_area, 70, 9);
    f.render_widget(Clear, area);

    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    let p = Paragraph::new(Text::from(body.to_string()))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(2),
        width: area.width.saturating_sub(2),
        height: 1,
    };
    let ok = button_text("OK", true, true);
    f.render_widget(
        Paragraph::new(Text::from(Line::from(vec![ok]))).alignment(Alignment::Right),
        buttons_area,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::OfflineSubmitter;
    use crate::entities::miner::TEAM_MEMBERS;

    fn app(entity: EntityKind) -> TuiApp {
        TuiApp::new(TuiOptions {
            entity,
            host: HostEnvironment::in_memory(),
            submitter: Arc::new(OfflineSubmitter::default()),
            branding: Branding::default(),
        })
        .expect("app")
    }

    fn type_str(app: &mut TuiApp, s: &str) {
        for c in s.chars() {
            app.handle_key(KeyCode::Char(c));
        }
    }

    #[test]
    fn smoke_frame_shows_title_steps_and_submit_button() {
        let frame = smoke(EntityKind::Incident, HostEnvironment::in_memory(), Branding::default())
            .expect("smoke");
        assert!(frame.contains("Incident Report"), "frame:\n{}", frame);
        assert!(frame.contains("Persons Involved"));
        assert!(frame.contains("[ Submit ]"));
    }

    #[test]
    fn smoke_renders_every_entity() {
        for kind in EntityKind::ALL {
            smoke(kind, HostEnvironment::in_memory(), Branding::default())
                .unwrap_or_else(|e| panic!("{}: {}", kind, e));
        }
    }

    #[test]
    fn typing_applies_structured_id_transform() {
        let mut a = app(EntityKind::Miner);
        a.handle_key(KeyCode::Tab); // syndicateName -> idNumber
        type_str(&mut a, "67657432d45");
        assert_eq!(a.controller.state().fields().text("idNumber"), "67-657432D45");
        a.handle_key(KeyCode::Backspace);
        assert_eq!(a.controller.state().fields().text("idNumber"), "67-657432D4");
    }

    #[test]
    fn date_rows_parse_iso_input() {
        let mut a = app(EntityKind::Miner);
        a.focus_key("registrationDate");
        type_str(&mut a, "2024-02-14");
        assert_eq!(a.controller.state().fields().date_string("registrationDate"), "2024-02-14");
        a.handle_key(KeyCode::Backspace);
        a.handle_key(KeyCode::Backspace);
        assert!(a.controller.state().fields().date("registrationDate").is_none());
    }

    #[test]
    fn f2_toggles_and_persists_sidebar() {
        let host = HostEnvironment::in_memory();
        let mut a = TuiApp::new(TuiOptions {
            entity: EntityKind::User,
            host: host.clone(),
            submitter: Arc::new(OfflineSubmitter::default()),
            branding: Branding::default(),
        })
        .expect("app");
        a.handle_key(KeyCode::F(2));
        assert!(a.sidebar_collapsed);
        assert!(host.preferences().sidebar_collapsed());
    }

    #[test]
    fn f3_and_f4_manage_list_items() {
        let mut a = app(EntityKind::Miner);
        EntityKind::Miner.fill_sample(&mut a.controller).expect("sample");
        a.focus = FocusTarget::Button(ButtonFocus::Next);
        a.handle_key(KeyCode::Enter);
        assert_eq!(a.controller.current_step(), 1, "team members step");
        assert_eq!(a.focus, FocusTarget::Field(0));
        a.handle_key(KeyCode::F(4));
        assert!(matches!(a.modal, Some(Modal::Message { .. })), "minimum must be kept");
        a.handle_key(KeyCode::Enter);
        a.handle_key(KeyCode::F(3));
        assert_eq!(a.controller.state().fields().list(TEAM_MEMBERS).len(), 2);
        a.handle_key(KeyCode::F(4));
        assert_eq!(a.controller.state().fields().list(TEAM_MEMBERS).len(), 1);
    }

    #[test]
    fn next_on_invalid_step_focuses_first_error() {
        let mut a = app(EntityKind::User);
        a.controller.set_text("firstName", "Nokuthula").expect("name");
        a.focus = FocusTarget::Button(ButtonFocus::Next);
        a.handle_key(KeyCode::Enter);
        assert_eq!(a.controller.current_step(), 0);
        assert_eq!(a.focused_row().map(|r| r.key), Some("lastName".to_string()));
    }

    #[test]
    fn submit_round_trips_through_channel() {
        let mut a = new_smoke_app(EntityKind::Mill, HostEnvironment::in_memory(), Branding::default())
            .expect("smoke app");
        a.handle_key(KeyCode::Enter);
        assert_eq!(a.controller.state().submission_status(), SubmissionStatus::Submitting);

        a.handle_key(KeyCode::Esc);
        assert!(a.modal.is_none(), "cancel is ignored while submitting");

        let msg = a.rx.recv_timeout(Duration::from_secs(5)).expect("completion");
        a.apply_message(msg);
        assert!(a.controller.is_confirmation());
        assert!(a
            .controller
            .state()
            .reference_number()
            .unwrap_or_default()
            .starts_with("MIL-"));

        a.handle_key(KeyCode::Enter);
        assert!(a.quit, "Close on confirmation exits");
    }

    #[test]
    fn failed_submission_shows_banner_until_f5() {
        let mut a = new_smoke_app(EntityKind::User, HostEnvironment::in_memory(), Branding::default())
            .expect("smoke app");
        let NextOutcome::Submit(ticket) = a.controller.next() else {
            panic!("expected a submit ticket");
        };
        a.apply_message(UiMsg::SubmitFinished {
            ticket,
            result: Err(WizardError::AuthenticationRequired),
        });
        assert!(matches!(a.modal, Some(Modal::Message { .. })), "host is told to sign in");
        assert!(a.controller.state().banner().is_some());

        a.handle_key(KeyCode::Enter);
        a.handle_key(KeyCode::F(5));
        assert!(a.controller.state().banner().is_none());
    }

    #[test]
    fn cancel_modal_confirms_and_quits() {
        let mut a = app(EntityKind::Driver);
        a.handle_key(KeyCode::Esc);
        assert_eq!(a.modal, Some(Modal::ConfirmCancel));
        a.handle_key(KeyCode::Tab);
        a.handle_key(KeyCode::Enter);
        assert!(a.quit);
    }

    #[test]
    fn miner_cards_are_rendered_when_leaving_team_step() {
        let a = new_smoke_app(EntityKind::Miner, HostEnvironment::in_memory(), Branding::default())
            .expect("smoke app");
        let members = a.controller.state().fields().list(TEAM_MEMBERS);
        assert!(members[0].get("idCard").starts_with("data:image/svg+xml"));
    }
}
