use crate::expense::{new_expense_id, Category, Expense};
use crate::storage::Storage;
use crate::store::ExpenseStore;
use crate::summary::{category_totals, format_amount, SpendingSummary};
use crate::undo::UndoAction;
use crate::validation::{error_for, ExpenseDraft, FieldError};
use anyhow::Result;
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const DATE_INPUT_FORMAT: &str = "%Y-%m-%d";
const PAGE_STEP: usize = 20;

const BAR_COLORS: [Color; 8] = [
    Color::Blue,
    Color::Green,
    Color::LightRed,
    Color::Magenta,
    Color::LightMagenta,
    Color::Red,
    Color::LightGreen,
    Color::Gray,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Transactions,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Dashboard => Page::Transactions,
            Page::Transactions => Page::Dashboard,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Dashboard => "Dashboard",
            Page::Transactions => "Recent Transactions",
        }
    }
}

// ============================================================================
// ENTRY FORM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Amount,
    Description,
    Category,
    Date,
}

impl FormField {
    const ORDER: [FormField; 4] = [
        FormField::Amount,
        FormField::Description,
        FormField::Category,
        FormField::Date,
    ];

    fn next(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        let i = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(i + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }

    fn key(self) -> &'static str {
        match self {
            FormField::Amount => "amount",
            FormField::Description => "description",
            FormField::Category => "category",
            FormField::Date => "date",
        }
    }

    fn label(self) -> &'static str {
        match self {
            FormField::Amount => "Amount ($)",
            FormField::Description => "Description",
            FormField::Category => "Category",
            FormField::Date => "Date (YYYY-MM-DD)",
        }
    }
}

/// Text-mode add/edit form. `editing` holds the id when editing.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub editing: Option<String>,
    pub amount: String,
    pub description: String,
    pub category: Option<Category>,
    pub date: String,
    pub focus: FormField,
    pub errors: Vec<FieldError>,
}

impl FormState {
    pub fn blank(today: NaiveDate) -> Self {
        FormState {
            editing: None,
            amount: String::new(),
            description: String::new(),
            category: None,
            date: today.format(DATE_INPUT_FORMAT).to_string(),
            focus: FormField::Amount,
            errors: Vec::new(),
        }
    }

    pub fn for_edit(expense: &Expense) -> Self {
        FormState {
            editing: Some(expense.id.clone()),
            amount: format!("{:.2}", expense.amount),
            description: expense.description.clone(),
            category: expense.known_category(),
            date: expense.day().format(DATE_INPUT_FORMAT).to_string(),
            focus: FormField::Amount,
            errors: Vec::new(),
        }
    }

    pub fn draft(&self) -> ExpenseDraft {
        let amount = match self.amount.trim() {
            "" => None,
            // Unparseable input is reported as "not a number" by validation
            text => Some(text.parse::<f64>().unwrap_or(f64::NAN)),
        };

        ExpenseDraft {
            amount,
            description: self.description.trim().to_string(),
            category: self.category.map(|c| c.as_str().to_string()).unwrap_or_default(),
            date: NaiveDate::parse_from_str(self.date.trim(), DATE_INPUT_FORMAT).ok(),
        }
    }

    fn cycle_category(&mut self, forward: bool) {
        let len = Category::ALL.len();
        let next = match (self.category, forward) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(c), true) => (c.index() + 1) % len,
            (Some(c), false) => (c.index() + len - 1) % len,
        };
        self.category = Some(Category::ALL[next]);
    }

    fn input(&mut self, c: char) {
        match self.focus {
            FormField::Amount => self.amount.push(c),
            FormField::Description => self.description.push(c),
            FormField::Date => self.date.push(c),
            FormField::Category => {
                // Jump to the first category starting with the typed letter
                if let Some(found) = Category::ALL
                    .iter()
                    .find(|cat| cat.as_str().starts_with(c.to_ascii_uppercase()))
                {
                    self.category = Some(*found);
                }
            }
        }
    }

    fn backspace(&mut self) {
        match self.focus {
            FormField::Amount => {
                self.amount.pop();
            }
            FormField::Description => {
                self.description.pop();
            }
            FormField::Date => {
                self.date.pop();
            }
            FormField::Category => self.category = None,
        }
    }

    fn value(&self, field: FormField) -> String {
        match field {
            FormField::Amount => self.amount.clone(),
            FormField::Description => self.description.clone(),
            FormField::Category => self
                .category
                .map(|c| format!("◀ {} ▶", c))
                .unwrap_or_else(|| "◀ Select a category ▶".to_string()),
            FormField::Date => self.date.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Browse,
    Form(FormState),
    ConfirmDelete(String),
}

// ============================================================================
// APP STATE
// ============================================================================

pub struct App<S: Storage> {
    pub store: ExpenseStore<S>,
    pub today: NaiveDate,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
    pub mode: Mode,
    pub undo: Option<UndoAction>,
    pub notice: Option<String>,
}

impl<S: Storage> App<S> {
    pub fn new(store: ExpenseStore<S>, today: NaiveDate) -> Self {
        let mut state = TableState::default();
        if !store.is_empty() {
            state.select(Some(0));
        }

        Self {
            store,
            today,
            state,
            current_page: Page::Dashboard,
            show_detail: false,
            mode: Mode::Browse,
            undo: None,
            notice: None,
        }
    }

    pub fn summary(&self) -> SpendingSummary {
        SpendingSummary::compute(self.store.expenses(), self.today)
    }

    pub fn selected_expense(&self) -> Option<&Expense> {
        self.state.selected().and_then(|i| self.store.expenses().get(i))
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    // ------------------------------------------------------------------------
    // Actions
    // ------------------------------------------------------------------------

    pub fn begin_add(&mut self) {
        self.mode = Mode::Form(FormState::blank(self.today));
    }

    pub fn begin_edit(&mut self) {
        if let Some(expense) = self.selected_expense() {
            // Work on a copy; the store is only touched on submit
            self.mode = Mode::Form(FormState::for_edit(expense));
        }
    }

    pub fn cancel(&mut self) {
        self.mode = Mode::Browse;
    }

    /// Validate the open form and hand the result to the store. On failure the
    /// form stays open with the field errors filled in.
    pub fn submit_form(&mut self) {
        let Mode::Form(form) = &mut self.mode else {
            return;
        };

        let id = form.editing.clone().unwrap_or_else(new_expense_id);
        let editing = form.editing.is_some();

        let expense = match form.draft().into_expense(id, self.today) {
            Ok(expense) => expense,
            Err(errors) => {
                form.errors = errors;
                return;
            }
        };

        self.mode = Mode::Browse;

        if editing {
            // A pending undo of this record's add must name it as it now reads
            if let Some(UndoAction::RemoveAdded { id, description }) = &mut self.undo {
                if *id == expense.id {
                    *description = expense.description.clone();
                }
            }
            self.store.update(expense);
            self.notice = Some("Expense updated successfully".to_string());
        } else {
            self.notice = Some(format!("Expense added: {}", expense.description));
            self.undo = Some(UndoAction::after_add(&expense));
            self.store.add(expense);
            self.state.select(Some(self.store.len() - 1));
        }
    }

    pub fn request_delete(&mut self) {
        if let Some(expense) = self.selected_expense() {
            self.mode = Mode::ConfirmDelete(expense.id.clone());
        }
    }

    pub fn confirm_delete(&mut self) {
        let Mode::ConfirmDelete(id) = &self.mode else {
            return;
        };
        let id = id.clone();
        self.mode = Mode::Browse;

        if let Some(expense) = self.store.get(&id).cloned() {
            self.store.delete(&id);
            self.notice = Some(format!("{} has been removed", expense.description));
            self.undo = Some(UndoAction::after_delete(expense));
            self.clamp_selection();
        }
    }

    pub fn undo_last(&mut self) {
        match self.undo.take() {
            Some(action) => {
                self.notice = Some(action.apply(&mut self.store));
                self.clamp_selection();
            }
            None => self.notice = Some("Nothing to undo".to_string()),
        }
    }

    pub fn dismiss_error(&mut self) {
        self.store.clear_error();
    }

    fn clamp_selection(&mut self) {
        let len = self.store.len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i >= len => self.state.select(Some(len - 1)),
            None => self.state.select(Some(0)),
            Some(_) => {}
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    pub fn next(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.store.len();
        if len == 0 {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| (i + PAGE_STEP).min(len - 1))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_STEP))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    // ------------------------------------------------------------------------
    // Keys
    // ------------------------------------------------------------------------

    /// Dispatch a key press. Returns `true` when the app should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::Form(_) => self.handle_form_key(key),
            Mode::ConfirmDelete(_) => match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => self.confirm_delete(),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.cancel(),
                _ => {}
            },
            Mode::Browse => return self.handle_browse_key(key),
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => return self.cancel(),
            KeyCode::Enter => return self.submit_form(),
            _ => {}
        }

        let Mode::Form(form) = &mut self.mode else {
            return;
        };

        match key.code {
            KeyCode::Tab | KeyCode::Down => form.focus = form.focus.next(),
            KeyCode::BackTab | KeyCode::Up => form.focus = form.focus.previous(),
            KeyCode::Left if form.focus == FormField::Category => form.cycle_category(false),
            KeyCode::Right if form.focus == FormField::Category => form.cycle_category(true),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => form.input(c),
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> bool {
        self.notice = None;

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Tab | KeyCode::BackTab => self.next_page(),
            KeyCode::Enter => {
                self.current_page = Page::Transactions;
                self.toggle_detail();
            }
            KeyCode::Char('a') => self.begin_add(),
            KeyCode::Char('e') => self.begin_edit(),
            KeyCode::Char('d') | KeyCode::Delete => self.request_delete(),
            KeyCode::Char('u') => self.undo_last(),
            KeyCode::Char('x') => self.dismiss_error(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => {
                if !self.store.is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.store.is_empty() {
                    self.state.select(Some(self.store.len() - 1));
                }
            }
            _ => {}
        }
        false
    }
}

// ============================================================================
// TERMINAL LOOP
// ============================================================================

pub fn run_ui<S: Storage>(app: &mut App<S>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend, S: Storage>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

// ============================================================================
// RENDERING
// ============================================================================

fn ui<S: Storage>(f: &mut Frame, app: &mut App<S>) {
    let error_height = if app.store.last_error().is_some() { 3 } else { 0 };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header with navigation
            Constraint::Length(error_height), // Storage notice
            Constraint::Min(0),               // Content area
            Constraint::Length(3),            // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if let Some(message) = app.store.last_error() {
        render_error_notice(f, chunks[1], &message);
    }

    match app.current_page {
        Page::Dashboard => render_dashboard(f, chunks[2], app),
        Page::Transactions if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[2]);

            render_table(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Transactions => render_table(f, chunks[2], app),
    }

    render_status_bar(f, chunks[3], app);

    if let Mode::Form(form) = &app.mode {
        let area = centered_rect(60, 60, f.size());
        render_form(f, area, form);
    }
}

fn render_header<S: Storage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Dashboard, Page::Transactions].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("{} expenses", app.store.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        app.today.format("%A, %B %-d, %Y").to_string(),
        Style::default().fg(Color::Cyan),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Expense Tracker "),
    );

    f.render_widget(header, area);
}

fn render_error_notice(f: &mut Frame, area: Rect, message: &str) {
    let notice = Paragraph::new(Line::from(vec![
        Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled("(x dismiss)", Style::default().fg(Color::DarkGray)),
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)),
    );

    f.render_widget(notice, area);
}

fn render_dashboard<S: Storage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(chunks[0]);

    let summary = app.summary();

    let trend = match summary.trend_label() {
        Some(label) => {
            let color = if summary.percent_change() > 0.0 {
                Color::Red
            } else if summary.percent_change() < 0.0 {
                Color::Green
            } else {
                Color::DarkGray
            };
            Span::styled(label, Style::default().fg(color))
        }
        None => Span::raw(""),
    };

    render_card(f, cards[0], "Today's Spending", summary.today_total, trend);
    render_card(
        f,
        cards[1],
        "This Week",
        summary.week_total,
        Span::styled(
            format!("Week of {}", app.today.format("%b %-d")),
            Style::default().fg(Color::DarkGray),
        ),
    );
    render_card(
        f,
        cards[2],
        "This Month",
        summary.month_total,
        Span::styled(
            app.today.format("%B %Y").to_string(),
            Style::default().fg(Color::DarkGray),
        ),
    );

    render_category_chart(f, chunks[1], app);
}

fn render_card(f: &mut Frame, area: Rect, title: &str, amount: f64, footer: Span) {
    let content = vec![
        Line::from(Span::styled(
            format!(" {}", format_amount(amount)),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![Span::raw(" "), footer]),
    ];

    let card = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", title)),
    );

    f.render_widget(card, area);
}

fn render_category_chart<S: Storage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(" Spending by Category ");

    let totals = category_totals(app.store.expenses());
    if totals.is_empty() {
        let empty = Paragraph::new("  No data to display. Press a to add an expense.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = totals
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            Bar::default()
                .value(entry.total.max(0.0).round() as u64)
                .text_value(format_amount(entry.total))
                .label(Line::from(truncate(&entry.category, 12)))
                .style(Style::default().fg(BAR_COLORS[i % BAR_COLORS.len()]))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .data(BarGroup::default().bars(&bars))
        .bar_width(12)
        .bar_gap(2)
        .value_style(Style::default().fg(Color::Black).add_modifier(Modifier::BOLD));

    f.render_widget(chart, area);
}

fn render_table<S: Storage>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let header_cells = ["Date", "Description", "Category", "Amount"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .store
        .expenses()
        .iter()
        .map(|expense| {
            let category_color = match expense.known_category() {
                Some(_) => Color::Cyan,
                None => Color::Magenta,
            };

            Row::new(vec![
                Cell::from(expense.date.format("%b %-d, %Y").to_string()),
                Cell::from(truncate(&expense.description, 40)),
                Cell::from(expense.category.clone()).style(Style::default().fg(category_color)),
                Cell::from(format_amount(expense.amount)).style(Style::default().fg(Color::Red)),
            ])
            .height(1)
        })
        .collect();

    let title = if rows.is_empty() {
        " No expenses recorded yet. Press a to add one. ".to_string()
    } else {
        format!(" {} ", app.current_page.title())
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(14),
            Constraint::Min(20),
            Constraint::Length(16),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel<S: Storage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Expense Details ");

    let Some(expense) = app.selected_expense() else {
        f.render_widget(Paragraph::new("No expense selected").block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);

    let content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Description: ", label),
            Span::raw(expense.description.clone()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount: ", label),
            Span::styled(format_amount(expense.amount), Style::default().fg(Color::Red)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Category: ", label),
            Span::raw(expense.category.clone()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Date: ", label),
            Span::raw(expense.date.format("%B %-d, %Y").to_string()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Id: ", label),
            Span::styled(expense.id.clone(), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "  e edit | d delete | Enter close",
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_form(f: &mut Frame, area: Rect, form: &FormState) {
    let title = if form.editing.is_some() {
        " Edit Expense "
    } else {
        " Add New Expense "
    };

    let mut content = vec![Line::from("")];

    for field in FormField::ORDER {
        let focused = field == form.focus;
        let label_style = if focused {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };

        content.push(Line::from(Span::styled(format!("  {}", field.label()), label_style)));
        content.push(Line::from(vec![
            Span::raw(if focused { "  > " } else { "    " }),
            Span::raw(form.value(field)),
            Span::styled(if focused { "_" } else { "" }, Style::default().fg(Color::Yellow)),
        ]));
        if let Some(message) = error_for(&form.errors, field.key()) {
            content.push(Line::from(Span::styled(
                format!("    {}", message),
                Style::default().fg(Color::Red),
            )));
        }
        content.push(Line::from(""));
    }

    content.push(Line::from(Span::styled(
        "  Tab next field | ◀ ▶ category | Enter save | Esc cancel",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    let panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title),
    );

    f.render_widget(Clear, area);
    f.render_widget(panel, area);
}

fn render_status_bar<S: Storage>(f: &mut Frame, area: Rect, app: &App<S>) {
    let key = Style::default().fg(Color::Yellow);

    let status_spans = match &app.mode {
        Mode::ConfirmDelete(id) => {
            let name = app
                .store
                .get(id)
                .map(|e| e.description.clone())
                .unwrap_or_default();
            vec![
                Span::styled(
                    format!(" Delete \"{}\"? This cannot be undone after leaving. ", name),
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                ),
                Span::styled("y", key),
                Span::raw(" yes | "),
                Span::styled("n", key),
                Span::raw(" no"),
            ]
        }
        Mode::Form(_) => vec![Span::styled(" Editing... ", Style::default().fg(Color::Cyan))],
        Mode::Browse => {
            let mut spans = Vec::new();
            if let Some(notice) = &app.notice {
                spans.push(Span::styled(
                    format!(" {} ", notice),
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw("| "));
            }
            if let Some(undo) = &app.undo {
                spans.push(Span::styled("u", key));
                spans.push(Span::raw(format!(" {} | ", undo.label())));
            }
            spans.extend([
                Span::styled("a", key),
                Span::raw(" Add | "),
                Span::styled("e", key),
                Span::raw(" Edit | "),
                Span::styled("d", key),
                Span::raw(" Delete | "),
                Span::styled("Tab", key),
                Span::raw(" Page | "),
                Span::styled("q", Style::default().fg(Color::Red)),
                Span::raw(" Quit"),
            ]);
            spans
        }
    };

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use ratatui::backend::TestBackend;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 25).unwrap()
    }

    fn app() -> App<MemoryStorage> {
        App::new(ExpenseStore::load(MemoryStorage::new()), today())
    }

    fn press(app: &mut App<MemoryStorage>, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App<MemoryStorage>, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_add_through_form_and_undo() {
        let mut app = app();

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "12.50");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Coffee");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right); // Food
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.store.len(), 6);
        let added = app.selected_expense().unwrap().clone();
        assert_eq!(added.description, "Coffee");
        assert_eq!(added.category, "Food");
        assert_eq!(added.amount, 12.5);
        assert_eq!(added.day(), today());

        press(&mut app, KeyCode::Char('u'));
        assert_eq!(app.store.len(), 5);
        assert_eq!(app.notice.as_deref(), Some("Expense removed"));
        assert!(app.undo.is_none());
    }

    #[test]
    fn test_invalid_form_stays_open_with_errors() {
        let mut app = app();

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "abc");
        press(&mut app, KeyCode::Enter);

        let Mode::Form(form) = &app.mode else {
            panic!("form should still be open");
        };
        assert_eq!(error_for(&form.errors, "amount"), Some("Amount must be a number"));
        assert_eq!(error_for(&form.errors, "category"), Some("Please select a category"));
        assert_eq!(app.store.len(), 5);

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.mode, Mode::Browse);
    }

    #[test]
    fn test_edit_selected_expense() {
        let mut app = app();
        press(&mut app, KeyCode::Down); // "2" Movie ticket

        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Tab);
        for _ in 0.."Movie ticket".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "Cinema");
        press(&mut app, KeyCode::Enter);

        let edited = app.store.get("2").unwrap();
        assert_eq!(edited.description, "Cinema");
        assert_eq!(edited.amount, 10.5);
        assert_eq!(app.store.len(), 5);
        // Edits are not undoable
        assert!(app.undo.is_none());
    }

    #[test]
    fn test_edit_relabels_pending_undo_of_add() {
        let mut app = app();

        press(&mut app, KeyCode::Char('a'));
        type_text(&mut app, "12.50");
        press(&mut app, KeyCode::Tab);
        type_text(&mut app, "Coffee");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Right); // Food
        press(&mut app, KeyCode::Enter);
        let id = app.selected_expense().unwrap().id.clone();

        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Tab);
        for _ in 0.."Coffee".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "Latte");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.store.get(&id).unwrap().description, "Latte");
        assert_eq!(app.undo.as_ref().map(|u| u.label()).as_deref(), Some("Undo add of Latte"));

        press(&mut app, KeyCode::Char('u'));
        assert!(!app.store.contains(&id));
        assert_eq!(app.store.len(), 5);
    }

    #[test]
    fn test_delete_confirm_and_undo() {
        let mut app = app();
        press(&mut app, KeyCode::End);

        press(&mut app, KeyCode::Char('d'));
        assert_eq!(app.mode, Mode::ConfirmDelete("5".to_string()));
        press(&mut app, KeyCode::Char('y'));

        assert_eq!(app.store.len(), 4);
        assert!(!app.store.contains("5"));
        assert_eq!(app.state.selected(), Some(3));
        assert_eq!(app.notice.as_deref(), Some("New t-shirt has been removed"));

        press(&mut app, KeyCode::Char('u'));
        assert_eq!(app.store.len(), 5);
        assert!(app.store.contains("5"));
        assert_eq!(app.notice.as_deref(), Some("Expense restored"));
    }

    #[test]
    fn test_delete_cancelled() {
        let mut app = app();

        press(&mut app, KeyCode::Char('d'));
        press(&mut app, KeyCode::Char('n'));

        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.store.len(), 5);
        assert!(app.undo.is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();

        press(&mut app, KeyCode::Up);
        assert_eq!(app.state.selected(), Some(4));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.state.selected(), Some(0));
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.state.selected(), Some(4));
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = app();
        assert!(!press(&mut app, KeyCode::Tab));
        assert_eq!(app.current_page, Page::Transactions);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_dismiss_error_notice() {
        let store = ExpenseStore::load(MemoryStorage::with_entry("expenses", "garbage"));
        let mut app = App::new(store, today());
        assert!(app.store.last_error().is_some());

        press(&mut app, KeyCode::Char('x'));
        assert!(app.store.last_error().is_none());
    }

    #[test]
    fn test_renders_every_page() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();

        terminal.draw(|f| ui(f, &mut app)).unwrap();
        press(&mut app, KeyCode::Enter);
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        press(&mut app, KeyCode::Char('a'));
        terminal.draw(|f| ui(f, &mut app)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let text: String = buffer.content.iter().map(|c| c.symbol()).collect();
        assert!(text.contains("Add New Expense"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer description", 10), "a much ...");
    }
}
