//! Interactive project browser.
//!
//! The view is a thin shell over a [`Dashboard`]: every key press turns into
//! a dashboard operation and the next frame is drawn from dashboard state.

use anyhow::Result;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use folio_core::{
    Dashboard, DataProvider, DetailView, Facet, LoadOutcome, Project, QueryPatch,
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::collections::BTreeSet;
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

const TICK: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_secs(1);
const STATUS_TTL: Duration = Duration::from_secs(3);

// ---------------------------------------------------------------------------
// Application input modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InputMode {
    #[default]
    Normal,
    /// User is typing a search query.
    Search,
    /// Facet picker is open.
    FacetPopup,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

pub struct BrowseView {
    dashboard: Dashboard,
    provider: Option<Box<dyn DataProvider>>,
    /// Selected row within the visible page.
    table_state: TableState,
    input_mode: InputMode,
    /// Buffer for the search query being typed.
    search_buf: String,
    /// Query value before entering Search mode (for Esc cancel).
    search_prev_query: String,
    /// Facet focused in the picker.
    facet_focus: usize,
    /// Highlighted option within the focused facet's narrowed list.
    facet_cursor: usize,
    /// Typed text narrowing each facet's options, indexed like `Facet::ALL`.
    facet_filters: [String; 5],
    detail_scroll: u16,
    status_msg: Option<(String, Instant)>,
    should_quit: bool,
    last_poll: Instant,
}

impl BrowseView {
    /// Wrap an already loaded dashboard. `provider` is kept for refreshes and
    /// change polling.
    pub fn new(dashboard: Dashboard, provider: Option<Box<dyn DataProvider>>) -> Self {
        let mut view = Self {
            dashboard,
            provider,
            table_state: TableState::default(),
            input_mode: InputMode::Normal,
            search_buf: String::new(),
            search_prev_query: String::new(),
            facet_focus: 0,
            facet_cursor: 0,
            facet_filters: Default::default(),
            detail_scroll: 0,
            status_msg: None,
            should_quit: false,
            last_poll: Instant::now(),
        };
        view.search_buf.clone_from(&view.dashboard.query_state().search);
        view.clamp_selection();
        view
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn set_status(&mut self, msg: String) {
        self.status_msg = Some((msg, Instant::now()));
    }

    fn detail_open(&self) -> bool {
        self.dashboard.detail().is_some()
    }

    fn page_len(&self) -> usize {
        self.dashboard.visible_projects().projects.len()
    }

    fn clamp_selection(&mut self) {
        let len = self.page_len();
        if len == 0 {
            self.table_state.select(None);
        } else {
            let current = self.table_state.selected().unwrap_or(0);
            self.table_state.select(Some(current.min(len - 1)));
        }
    }

    fn apply(&mut self, patch: QueryPatch) {
        self.dashboard.set_query_state(patch);
        self.clamp_selection();
    }

    fn selected_project(&self) -> Option<&Project> {
        let index = self.table_state.selected()?;
        self.dashboard
            .visible_projects()
            .projects
            .get(index)
            .copied()
    }

    fn focused_facet(&self) -> Facet {
        Facet::ALL[self.facet_focus % Facet::ALL.len()]
    }

    fn facet_filter(&self) -> &str {
        &self.facet_filters[self.facet_focus % Facet::ALL.len()]
    }

    fn facet_filter_mut(&mut self) -> &mut String {
        &mut self.facet_filters[self.facet_focus % Facet::ALL.len()]
    }

    /// Options of the focused facet that survive its typed filter.
    fn visible_facet_options(&self) -> Vec<&str> {
        self.dashboard
            .facet_options()
            .matching(self.focused_facet(), self.facet_filter())
    }

    // -- Keys ------------------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        match self.input_mode {
            InputMode::Search => self.handle_search_key(key),
            InputMode::FacetPopup => self.handle_facet_popup_key(key),
            InputMode::Normal if self.detail_open() => self.handle_detail_key(key),
            InputMode::Normal => self.handle_normal_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,

            KeyCode::Char('j') | KeyCode::Down => self.select_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.select_by(-1),
            KeyCode::Char('g') | KeyCode::Home => self.table_state.select(Some(0)),
            KeyCode::Char('G') | KeyCode::End => {
                self.table_state.select(Some(self.page_len().saturating_sub(1)));
            }

            KeyCode::Char('n' | 'f') | KeyCode::PageDown => self.turn_page(1),
            KeyCode::Char('p' | 'b') | KeyCode::PageUp => self.turn_page(-1),

            KeyCode::Enter | KeyCode::Char('l') => self.open_selected(),

            KeyCode::Char('/') => {
                self.search_prev_query.clone_from(&self.dashboard.query_state().search);
                self.search_buf.clone_from(&self.search_prev_query);
                self.input_mode = InputMode::Search;
            }
            KeyCode::Char('F') => {
                self.facet_cursor = 0;
                self.input_mode = InputMode::FacetPopup;
            }
            KeyCode::Char('s') => {
                let sort = self.dashboard.query_state().sort.next();
                self.apply(QueryPatch::sort(sort));
                self.set_status(format!("sorted by {sort}"));
            }
            KeyCode::Char('c') => {
                self.dashboard.clear_query();
                self.search_buf.clear();
                self.clamp_selection();
                self.set_status("filters cleared".to_string());
            }
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc | KeyCode::Char('h') | KeyCode::Backspace => {
                self.dashboard.close_detail();
                self.detail_scroll = 0;
            }
            KeyCode::Right | KeyCode::Char('n' | ']') => {
                if self.dashboard.next_detail() {
                    self.detail_scroll = 0;
                }
            }
            KeyCode::Left | KeyCode::Char('p' | '[') => {
                if self.dashboard.previous_detail() {
                    self.detail_scroll = 0;
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.detail_scroll = self.detail_scroll.saturating_add(1);
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.detail_scroll = self.detail_scroll.saturating_sub(1);
            }
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.search_buf.clone_from(&self.search_prev_query);
                self.apply(QueryPatch::search(self.search_prev_query.clone()));
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.search_buf.pop();
                self.apply(QueryPatch::search(self.search_buf.clone()));
            }
            KeyCode::Char(c) => {
                self.search_buf.push(c);
                self.apply(QueryPatch::search(self.search_buf.clone()));
            }
            _ => {}
        }
    }

    fn handle_facet_popup_key(&mut self, key: KeyEvent) {
        let facet = self.focused_facet();
        let option_count = self.visible_facet_options().len();

        match key.code {
            KeyCode::Esc if !self.facet_filter().is_empty() => {
                self.facet_filter_mut().clear();
                self.facet_cursor = 0;
            }
            KeyCode::Esc | KeyCode::Enter => {
                self.input_mode = InputMode::Normal;
            }
            KeyCode::Tab | KeyCode::Right => {
                self.facet_focus = (self.facet_focus + 1) % Facet::ALL.len();
                self.facet_cursor = 0;
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.facet_focus = (self.facet_focus + Facet::ALL.len() - 1) % Facet::ALL.len();
                self.facet_cursor = 0;
            }
            KeyCode::Down => {
                if self.facet_cursor + 1 < option_count {
                    self.facet_cursor += 1;
                }
            }
            KeyCode::Up => {
                self.facet_cursor = self.facet_cursor.saturating_sub(1);
            }
            KeyCode::Char(' ') => self.toggle_facet_value(facet),
            KeyCode::Delete => {
                self.apply(QueryPatch::default().with_facet(facet, BTreeSet::<String>::new()));
            }
            KeyCode::Backspace => {
                self.facet_filter_mut().pop();
                self.facet_cursor = 0;
            }
            KeyCode::Char(c) => {
                self.facet_filter_mut().push(c);
                self.facet_cursor = 0;
            }
            _ => {}
        }
    }

    fn toggle_facet_value(&mut self, facet: Facet) {
        let Some(value) = self
            .visible_facet_options()
            .get(self.facet_cursor)
            .map(|v| (*v).to_string())
        else {
            return;
        };
        let mut selection = self.dashboard.query_state().facets.clone();
        selection.toggle(facet, &value);
        let values = selection.get(facet).clone();
        self.apply(QueryPatch::default().with_facet(facet, values));
    }

    fn select_by(&mut self, delta: isize) {
        let len = self.page_len();
        if len == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(len - 1);
        self.table_state.select(Some(next));
    }

    fn turn_page(&mut self, delta: isize) {
        let page = self.dashboard.query_state().page.saturating_add_signed(delta);
        self.apply(QueryPatch::page(page.max(1)));
        self.table_state.select(Some(0));
        self.clamp_selection();
    }

    fn open_selected(&mut self) {
        let Some(id) = self.selected_project().map(|p| p.project_number.clone()) else {
            return;
        };
        if let Err(err) = self.dashboard.open_detail(&id) {
            self.set_status(err.to_string());
        }
        self.detail_scroll = 0;
    }

    fn refresh(&mut self) {
        let provider = self
            .provider
            .as_mut()
            .map(|p| &mut **p as &mut dyn DataProvider);
        let outcome = self.dashboard.refresh(provider);
        self.clamp_selection();
        let msg = match outcome {
            LoadOutcome::Loaded { count } => format!("reloaded {count} projects"),
            LoadOutcome::Fallback { reason } => format!("load failed: {reason}"),
            LoadOutcome::Rejected { reason } => format!("load rejected: {reason}"),
            LoadOutcome::Superseded => "refresh superseded".to_string(),
        };
        self.set_status(msg);
    }

    /// Periodic work between key presses: pick up provider events.
    pub fn tick(&mut self) {
        if self.last_poll.elapsed() < POLL_INTERVAL {
            return;
        }
        self.last_poll = Instant::now();
        let Some(provider) = self.provider.as_mut() else {
            return;
        };
        let handled = self.dashboard.poll(&mut **provider);
        if handled > 0 {
            debug!(events = handled, "provider events applied");
            self.clamp_selection();
            self.set_status("source changed, reloaded".to_string());
        }
    }

    /// Render the browser into `area` within the given frame.
    pub fn render(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        render_into(frame, self, area);
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.unwrap_or(fallback)
}

fn build_row(project: &Project) -> Row<'static> {
    Row::new([
        Cell::from(project.project_number.clone()),
        Cell::from(project.display_name().to_string()),
        Cell::from(or(project.client.as_deref(), "-").to_string()),
        Cell::from(or(project.year.as_deref(), "-").to_string()),
        Cell::from(or(project.location.country.as_deref(), "-").to_string()),
    ])
}

fn detail_lines(view: &DetailView<'_>) -> Vec<Line<'static>> {
    let project = view.project;
    let heading = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let key_style = Style::default().fg(Color::DarkGray);

    let kv = |key: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{key:<14}"), key_style),
            Span::raw(value),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            project.display_name().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(project.project_number.clone(), key_style)),
        Line::default(),
        kv("Client", or(project.client.as_deref(), "Unknown Client").to_string()),
        kv("Category", or(project.category.as_deref(), "N/A").to_string()),
        kv("Year", or(project.year.as_deref(), "N/A").to_string()),
        kv(
            "Deliverables",
            or(project.deliverables_summary.as_deref(), "N/A").to_string(),
        ),
        kv(
            "Location",
            project
                .location
                .display_line()
                .unwrap_or_else(|| "Location unknown".to_string()),
        ),
    ];

    if !project.team.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Team", heading)));
        for (role, name) in project.team_members() {
            lines.push(kv(role.label(), name.to_string()));
        }
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled("Notes", heading)));
    lines.push(Line::raw(
        or(project.notes.as_deref(), "No notes available").to_string(),
    ));

    if !project.links.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Links", heading)));
        for link in &project.links {
            lines.push(Line::from(vec![
                Span::styled(format!("{:<14}", link.label), Style::default().fg(Color::Cyan)),
                Span::raw(link.url.clone()),
            ]));
        }
    }
    lines
}

fn render_detail_panel(frame: &mut ratatui::Frame<'_>, app: &BrowseView, area: Rect) {
    let Some(view) = app.dashboard.detail() else {
        return;
    };
    let title = format!(
        " {} of {}  {} prev  next {} ",
        view.position,
        view.total,
        if view.has_previous() { "←" } else { " " },
        if view.has_next() { "→" } else { " " },
    );
    let paragraph = Paragraph::new(detail_lines(&view))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(Color::Green))
                .title(title),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.detail_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_into(frame: &mut ratatui::Frame<'_>, app: &mut BrowseView, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);
    let content_area = chunks[0];
    let status_area = chunks[1];

    let show_detail = app.detail_open();
    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(if show_detail {
            [Constraint::Percentage(50), Constraint::Percentage(50)]
        } else {
            [Constraint::Percentage(100), Constraint::Percentage(0)]
        })
        .split(content_area);
    let table_area = content_chunks[0];
    let detail_area = content_chunks[1];

    let result = app.dashboard.visible_projects();
    let rows: Vec<Row<'static>> = result.projects.iter().copied().map(build_row).collect();
    let block_title = match app.input_mode {
        InputMode::Search => format!(" folio · search: {}_ ", app.search_buf),
        _ => format!(
            " folio · {}  [sort: {}]  page {}/{} ",
            result.summary(),
            app.dashboard.query_state().sort,
            result.page_number,
            result.total_pages.max(1)
        ),
    };

    let border_style = if show_detail {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green)
    };

    let widths = [
        Constraint::Length(10),
        Constraint::Min(16),
        Constraint::Min(12),
        Constraint::Length(6),
        Constraint::Length(12),
    ];
    let header = Row::new(["Number", "Project", "Client", "Year", "Country"]).style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    );
    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(border_style)
                .title(block_title)
                .title_style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(" ");

    let mut table_state = app.table_state.clone();
    frame.render_stateful_widget(table, table_area, &mut table_state);
    app.table_state = table_state;

    if show_detail && detail_area.width > 0 {
        render_detail_panel(frame, app, detail_area);
    }

    let status = Paragraph::new(build_status_bar(app)).alignment(Alignment::Left);
    frame.render_widget(status, status_area);

    if app.input_mode == InputMode::FacetPopup {
        render_facet_popup(frame, app, area);
    }
}

fn build_status_bar(app: &BrowseView) -> Line<'static> {
    if let Some((ref msg, at)) = app.status_msg
        && at.elapsed() < STATUS_TTL
    {
        return Line::from(Span::styled(msg.clone(), Style::default().fg(Color::Cyan)));
    }

    let key_style = Style::default().fg(Color::Cyan);
    let dim_style = Style::default().fg(Color::DarkGray);
    let mut spans: Vec<Span<'static>> = Vec::new();

    if app.input_mode == InputMode::Normal
        && let Some(notice) = app.dashboard.notice()
    {
        spans.push(Span::styled(
            format!("{notice}  "),
            Style::default().fg(Color::Yellow),
        ));
    }

    let hints: &[(&str, &str)] = match app.input_mode {
        InputMode::Search => &[("ESC", "cancel"), ("ENTER", "confirm")],
        InputMode::FacetPopup => &[
            ("TAB", "next facet"),
            ("↑/↓", "move"),
            ("type", "narrow"),
            ("SPACE", "toggle"),
            ("DEL", "clear facet"),
            ("ESC", "close"),
        ],
        InputMode::Normal if app.detail_open() => &[
            ("←/→", "prev/next"),
            ("j/k", "scroll"),
            ("esc", "close"),
            ("q", "quit"),
        ],
        InputMode::Normal => &[
            ("j/k", "nav"),
            ("n/p", "page"),
            ("enter", "open"),
            ("/", "search"),
            ("F", "filter"),
            ("s", "sort"),
            ("c", "clear"),
            ("r", "refresh"),
            ("q", "quit"),
        ],
    };
    for (key, desc) in hints {
        spans.push(Span::styled((*key).to_string(), key_style));
        spans.push(Span::styled(format!(" {desc}  "), dim_style));
    }
    Line::from(spans)
}

fn render_facet_popup(frame: &mut ratatui::Frame<'_>, app: &BrowseView, area: Rect) {
    let popup_w: u16 = 48;
    let popup_h: u16 = 16;
    let popup_area = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    frame.render_widget(Clear, popup_area);

    let facet = app.focused_facet();
    let selected = app.dashboard.query_state().facets.get(facet);
    let options = app.visible_facet_options();

    let focused_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let dim_style = Style::default().fg(Color::DarkGray);

    let tabs: Vec<Span<'static>> = Facet::ALL
        .iter()
        .map(|f| {
            let style = if *f == facet { focused_style } else { dim_style };
            Span::styled(format!(" {} ", f.plural()), style)
        })
        .collect();

    let mut lines = vec![
        Line::from(tabs),
        Line::from(Span::styled(format!("filter: {}_", app.facet_filter()), dim_style)),
    ];
    if options.is_empty() {
        lines.push(Line::from(Span::styled("(no values)", dim_style)));
    }
    for (i, value) in options.iter().enumerate() {
        let marker = if selected.contains(*value) { "[x]" } else { "[ ]" };
        let prefix = if i == app.facet_cursor { "► " } else { "  " };
        let style = if i == app.facet_cursor {
            focused_style
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(
            format!("{prefix}{marker} {value}"),
            style,
        )));
    }

    let visible_rows = usize::from(popup_area.height.saturating_sub(4));
    let scroll = app
        .facet_cursor
        .saturating_sub(visible_rows.saturating_sub(1));
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .title(" Filter ")
                .title_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
        )
        .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0));
    frame.render_widget(paragraph, popup_area);
}

// ---------------------------------------------------------------------------
// Terminal lifecycle
// ---------------------------------------------------------------------------

/// Raw mode and the alternate screen, undone on drop.
struct TerminalGuard {
    restore: fn(),
}

impl TerminalGuard {
    fn enter() -> io::Result<Self> {
        Self::enter_with(
            enable_raw_mode,
            || io::stdout().execute(EnterAlternateScreen).map(|_| ()),
            restore_terminal,
        )
    }

    /// Once `raw` succeeds the guard exists, so a failing `screen` step
    /// still restores the terminal.
    fn enter_with(
        raw: impl FnOnce() -> io::Result<()>,
        screen: impl FnOnce() -> io::Result<()>,
        restore: fn(),
    ) -> io::Result<Self> {
        raw()?;
        let guard = Self { restore };
        screen()?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = io::stdout().execute(LeaveAlternateScreen);
}

/// Run the browser until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal cannot be set up or drawn.
pub fn run_browse_tui(dashboard: Dashboard, provider: Option<Box<dyn DataProvider>>) -> Result<()> {
    let mut view = BrowseView::new(dashboard, provider);
    let _guard = TerminalGuard::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;

    loop {
        terminal.draw(|frame| {
            let area = frame.area();
            view.render(frame, area);
        })?;
        if view.should_quit() {
            break;
        }
        if event::poll(TICK)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            view.handle_key(key);
        }
        view.tick();
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
