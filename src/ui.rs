use crate::budget::{budget_vs_actual, Budget, BudgetStatus};
use crate::labels::label_for;
use crate::ledger::{Transaction, TransactionDraft};
use crate::rules::{RuleSet, EMPTY_INPUT_ACCOUNT, NO_MATCH_ACCOUNT};
use anyhow::Result;
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
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Transactions,
    BudgetVsActual,
    NewTransaction,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Transactions => Page::BudgetVsActual,
            Page::BudgetVsActual => Page::NewTransaction,
            Page::NewTransaction => Page::Transactions,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Transactions => Page::NewTransaction,
            Page::BudgetVsActual => Page::Transactions,
            Page::NewTransaction => Page::BudgetVsActual,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Transactions => "Transactions",
            Page::BudgetVsActual => "Budget vs Actual",
            Page::NewTransaction => "New Transaction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Description,
    Amount,
    CostCenter,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Description => FormField::Amount,
            FormField::Amount => FormField::CostCenter,
            FormField::CostCenter => FormField::Description,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            FormField::Description => FormField::CostCenter,
            FormField::Amount => FormField::Description,
            FormField::CostCenter => FormField::Amount,
        }
    }
}

pub struct App {
    pub rules: RuleSet,
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    /// Indexes into `transactions` after the account filter
    pub visible: Vec<usize>,
    pub state: TableState,
    pub current_page: Page,
    pub account_filter: Option<String>,
    pub draft: TransactionDraft,
    pub form_field: FormField,
    pub form_message: Option<String>,
}

impl App {
    pub fn new(rules: RuleSet, transactions: Vec<Transaction>, budgets: Vec<Budget>) -> Self {
        let mut app = Self {
            rules,
            transactions,
            budgets,
            visible: Vec::new(),
            state: TableState::default(),
            current_page: Page::Transactions,
            account_filter: None,
            draft: TransactionDraft::default(),
            form_field: FormField::Description,
            form_message: None,
        };
        app.refresh_visible();
        app
    }

    fn refresh_visible(&mut self) {
        let rules = &self.rules;
        let filter = self.account_filter.as_deref();
        self.visible = self
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| filter.map_or(true, |account| tx.account(rules) == account))
            .map(|(i, _)| i)
            .collect();

        if self.visible.is_empty() {
            self.state.select(None);
        } else {
            self.state.select(Some(0));
        }
    }

    /// Accounts the filter cycles through: rule accounts, then the fallbacks
    pub fn filter_choices(&self) -> Vec<String> {
        let mut choices: Vec<String> = self.rules.accounts().iter().map(|a| a.to_string()).collect();
        for fallback in [EMPTY_INPUT_ACCOUNT, NO_MATCH_ACCOUNT] {
            if !choices.iter().any(|c| c == fallback) {
                choices.push(fallback.to_string());
            }
        }
        choices
    }

    pub fn cycle_account_filter(&mut self) {
        let choices = self.filter_choices();
        self.account_filter = match &self.account_filter {
            None => choices.first().cloned(),
            Some(current) => {
                let pos = choices.iter().position(|c| c == current);
                match pos {
                    Some(i) if i + 1 < choices.len() => Some(choices[i + 1].clone()),
                    _ => None,
                }
            }
        };
        self.refresh_visible();
    }

    pub fn clear_filter(&mut self) {
        self.account_filter = None;
        self.refresh_visible();
    }

    pub fn selected_transaction(&self) -> Option<&Transaction> {
        self.state
            .selected()
            .and_then(|i| self.visible.get(i))
            .map(|&idx| &self.transactions[idx])
    }

    pub fn next(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Account the form would assign right now
    pub fn live_suggestion(&self) -> &str {
        self.draft.suggested_account(&self.rules)
    }

    pub fn submit_draft(&mut self) {
        match self.draft.submit(&self.rules) {
            Ok(tx) => {
                self.form_message = Some(format!(
                    "Added '{}' to {}",
                    tx.description,
                    tx.account(&self.rules)
                ));
                self.transactions.push(tx);
                self.draft = TransactionDraft::default();
                self.form_field = FormField::Description;
                self.refresh_visible();
            }
            Err(err) => {
                self.form_message = Some(format!("Error: {:#}", err));
            }
        }
    }

    /// Step the draft's cost center through "auto" (None) and the rule accounts
    pub fn cycle_draft_cost_center(&mut self, forward: bool) {
        let mut choices: Vec<Option<String>> = vec![None];
        choices.extend(self.rules.accounts().into_iter().map(|a| Some(a.to_string())));

        let pos = choices
            .iter()
            .position(|c| *c == self.draft.cost_center)
            .unwrap_or(0);
        let len = choices.len();
        let next = if forward { (pos + 1) % len } else { (pos + len - 1) % len };
        self.draft.cost_center = choices.swap_remove(next);
    }

    fn form_input(&mut self) -> Option<&mut String> {
        match self.form_field {
            FormField::Description => Some(&mut self.draft.description),
            FormField::Amount => Some(&mut self.draft.amount),
            FormField::CostCenter => None,
        }
    }

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::Tab => {
                self.current_page = self.current_page.next();
                return false;
            }
            KeyCode::BackTab => {
                self.current_page = self.current_page.previous();
                return false;
            }
            _ => {}
        }

        if self.current_page == Page::NewTransaction {
            match key.code {
                KeyCode::Enter => self.submit_draft(),
                KeyCode::Down => self.form_field = self.form_field.next(),
                KeyCode::Up => self.form_field = self.form_field.previous(),
                KeyCode::Right | KeyCode::Char(' ') if self.form_field == FormField::CostCenter => {
                    self.cycle_draft_cost_center(true)
                }
                KeyCode::Left if self.form_field == FormField::CostCenter => {
                    self.cycle_draft_cost_center(false)
                }
                KeyCode::Backspace => {
                    if let Some(input) = self.form_input() {
                        input.pop();
                    } else {
                        self.draft.cost_center = None;
                    }
                }
                KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    if let Some(input) = self.form_input() {
                        input.push(c);
                    }
                }
                _ => {}
            }
            return false;
        }

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('f') => self.cycle_account_filter(),
            KeyCode::Char('c') => self.clear_filter(),
            KeyCode::Char('n') => self.current_page = Page::NewTransaction,
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Home => {
                if !self.visible.is_empty() {
                    self.state.select(Some(0));
                }
            }
            KeyCode::End => {
                if !self.visible.is_empty() {
                    self.state.select(Some(self.visible.len() - 1));
                }
            }
            _ => {}
        }
        false
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
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

    res.map_err(Into::into)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press && app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Transactions => render_transactions(f, chunks[1], app),
        Page::BudgetVsActual => render_budgets(f, chunks[1], app),
        Page::NewTransaction => render_form(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn header_style() -> Style {
    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Transactions, Page::BudgetVsActual, Page::NewTransaction];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
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

    let total: f64 = app.transactions.iter().map(|tx| tx.amount).sum();
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("{} txs, {:.2}", app.transactions.len(), total),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_transactions(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Date", "Kind", "Description", "Amount", "Account"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = app
        .visible
        .iter()
        .map(|&idx| {
            let tx = &app.transactions[idx];
            let label = label_for(tx.account(&app.rules));
            let badge_color = if tx.is_auto_assigned() {
                Color::Cyan
            } else {
                Color::Green
            };

            Row::new(vec![
                Cell::from(tx.date.to_string()),
                Cell::from(tx.kind.as_str()),
                Cell::from(truncate(&tx.description, 40)),
                Cell::from(format!("{:.2}", tx.amount)),
                Cell::from(label.badge()).style(Style::default().fg(badge_color)),
            ])
            .height(1)
        })
        .collect();

    let title = match &app.account_filter {
        Some(account) => format!(" Transactions - {} ", account),
        None => " Transactions ".to_string(),
    };

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(42),
            Constraint::Length(14),
            Constraint::Length(22),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_budgets(f: &mut Frame, area: Rect, app: &App) {
    let report = budget_vs_actual(&app.budgets, &app.transactions, &app.rules);

    let header_cells = ["Cost Center", "Period", "Budget", "Actual", "Variance", "Used %"]
        .iter()
        .map(|h| Cell::from(*h).style(header_style()));

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows: Vec<Row> = report
        .details
        .iter()
        .map(|line| {
            let color = match line.status() {
                BudgetStatus::UnderBudget => Color::Green,
                BudgetStatus::NearLimit => Color::Yellow,
                BudgetStatus::OverBudget => Color::Red,
            };

            Row::new(vec![
                Cell::from(label_for(&line.cost_center).badge()),
                Cell::from(format!("{} → {}", line.period_start, line.period_end)),
                Cell::from(format!("{:.2}", line.budget_amount)),
                Cell::from(format!("{:.2}", line.actual_spent)),
                Cell::from(format!("{:.2}", line.variance)).style(Style::default().fg(color)),
                Cell::from(format!("{:.2}", line.utilization_percentage))
                    .style(Style::default().fg(color)),
            ])
            .height(1)
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(22),
            Constraint::Length(26),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(9),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" {} ", report.summary_line())),
    );

    f.render_widget(table, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let field_style = |field: FormField| {
        if app.form_field == field {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let suggestion = label_for(app.live_suggestion());
    let cost_center = match &app.draft.cost_center {
        Some(account) => label_for(account).badge(),
        None => "auto (use suggestion)".to_string(),
    };

    let mut content = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  Description: ", field_style(FormField::Description)),
            Span::raw(app.draft.description.as_str()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Amount:      ", field_style(FormField::Amount)),
            Span::raw(app.draft.amount.as_str()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Cost center: ", field_style(FormField::CostCenter)),
            Span::raw(cost_center),
            Span::styled("  ←/→ to choose", Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Suggested account: ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(suggestion.badge(), Style::default().fg(Color::Green)),
            Span::styled(
                format!("  ({})", suggestion.kind.as_str()),
                Style::default().fg(Color::DarkGray),
            ),
        ]),
    ];

    if let Some(message) = &app.form_message {
        content.push(Line::from(""));
        content.push(Line::from(Span::styled(
            format!("  {}", message),
            Style::default().fg(Color::Magenta),
        )));
    }

    let form = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" New Transaction "),
    );

    f.render_widget(form, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let mut status_spans = vec![];

    if app.current_page == Page::NewTransaction {
        status_spans.extend([
            key(" Enter"),
            Span::raw(" Submit | "),
            key("↑/↓"),
            Span::raw(" Field | "),
            key("←/→"),
            Span::raw(" Cost center | "),
        ]);
    } else {
        let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
        status_spans.push(Span::styled(
            format!(" Row: {}/{} ", selected, app.visible.len()),
            Style::default().fg(Color::Cyan),
        ));
        if let Some(tx) = app.selected_transaction() {
            status_spans.push(Span::raw(format!("| {} ", tx.id)));
        }
        status_spans.extend([
            Span::raw("| "),
            key("f"),
            Span::raw(" Filter | "),
            key("c"),
            Span::raw(" Clear | "),
            key("n"),
            Span::raw(" New | "),
        ]);
    }

    status_spans.extend([
        key("Tab"),
        Span::raw(" Page | "),
        Span::styled("Esc", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ]);

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
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
    use crate::ledger::TransactionKind;
    use chrono::NaiveDate;

    fn tx(description: &str, amount: f64) -> Transaction {
        Transaction {
            id: description.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            kind: TransactionKind::Purchase,
            description: description.to_string(),
            amount,
            quantity: 1,
            cost_center: None,
        }
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app() -> App {
        App::new(
            RuleSet::default(),
            vec![tx("Teak logs", 100.0), tx("Truck rental", 50.0), tx("Misc", 5.0)],
            Vec::new(),
        )
    }

    #[test]
    fn test_account_filter_cycles() {
        let mut app = app();
        assert_eq!(app.visible.len(), 3);

        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.account_filter.as_deref(), Some("Production"));
        assert_eq!(app.visible, vec![0]);

        press(&mut app, KeyCode::Char('f'));
        assert_eq!(app.account_filter.as_deref(), Some("Marketing"));
        assert!(app.visible.is_empty());
        assert_eq!(app.state.selected(), None);

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.visible.len(), 3);
    }

    #[test]
    fn test_filter_choices_include_fallbacks() {
        let app = app();
        assert_eq!(
            app.filter_choices(),
            vec!["Production", "Marketing", "Logistics", "Administrative", "General", "Uncategorized"]
        );
    }

    #[test]
    fn test_form_live_suggestion_and_submit() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.current_page, Page::NewTransaction);

        for c in "Oak".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.live_suggestion(), "Production");

        // 'q' is text on the form page
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Backspace);

        press(&mut app, KeyCode::Down);
        for c in "250".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.transactions.len(), 4);
        assert_eq!(app.transactions[3].cost_center.as_deref(), Some("Production"));
        assert!(app.draft.description.is_empty());
        assert!(app.form_message.as_deref().unwrap().contains("Production"));
    }

    #[test]
    fn test_form_explicit_cost_center_overrides_suggestion() {
        let mut app = app();
        app.current_page = Page::NewTransaction;
        for c in "Teak".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Down);
        for c in "900".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Down);
        assert_eq!(app.form_field, FormField::CostCenter);

        // auto -> Production -> Marketing; typing is ignored on this field
        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Char(' '));
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.draft.cost_center.as_deref(), Some("Marketing"));
        assert_eq!(app.live_suggestion(), "Production");

        press(&mut app, KeyCode::Enter);
        assert_eq!(app.transactions[3].cost_center.as_deref(), Some("Marketing"));
        assert_eq!(app.transactions[3].account(&app.rules), "Marketing");
        assert!(!app.transactions[3].is_auto_assigned());
        assert_eq!(app.draft.cost_center, None);
    }

    #[test]
    fn test_form_cost_center_cycles_back_to_auto() {
        let mut app = app();
        app.current_page = Page::NewTransaction;
        press(&mut app, KeyCode::Up);
        assert_eq!(app.form_field, FormField::CostCenter);

        press(&mut app, KeyCode::Left);
        assert_eq!(app.draft.cost_center.as_deref(), Some("Administrative"));
        press(&mut app, KeyCode::Right);
        assert_eq!(app.draft.cost_center, None);

        press(&mut app, KeyCode::Right);
        press(&mut app, KeyCode::Backspace);
        assert_eq!(app.draft.cost_center, None);
    }

    #[test]
    fn test_form_submit_error_keeps_draft() {
        let mut app = app();
        app.current_page = Page::NewTransaction;
        press(&mut app, KeyCode::Char('x'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.transactions.len(), 3);
        assert_eq!(app.draft.description, "x");
        assert!(app.form_message.as_deref().unwrap().starts_with("Error"));
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        press(&mut app, KeyCode::Up);
        assert_eq!(app.state.selected(), Some(2));
        press(&mut app, KeyCode::Down);
        assert_eq!(app.state.selected(), Some(0));
        assert_eq!(app.selected_transaction().map(|t| t.id.as_str()), Some("Teak logs"));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("Ünïcödé description", 8), "Ünïcö...");
    }
}
