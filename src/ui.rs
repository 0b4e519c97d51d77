use anyhow::Result;
use calf_ledger::{
    ear_tag_options, filter_by_property, format_br_date, order_for_display, parse_br_date,
    property_options, request_timeline, timeline::date_span, CalfRecord, ChartSummary,
    EventCategory, Notice, NoticeLevel, RecordStore, Tally, TimelineEvent, TreatmentRecord,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, BarChart, Block, Borders, Cell, Chart, Dataset, GraphType, List, ListItem, ListState,
        Paragraph, Row, Table, TableState,
    },
    Frame, Terminal,
};
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Treatments,
    Calves,
    Charts,
    Timeline,
    RegisterTreatment,
    RegisterCalf,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Treatments => Page::Calves,
            Page::Calves => Page::Charts,
            Page::Charts => Page::Timeline,
            Page::Timeline => Page::RegisterTreatment,
            Page::RegisterTreatment => Page::RegisterCalf,
            Page::RegisterCalf => Page::Treatments,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Treatments => Page::RegisterCalf,
            Page::Calves => Page::Treatments,
            Page::Charts => Page::Calves,
            Page::Timeline => Page::Charts,
            Page::RegisterTreatment => Page::Timeline,
            Page::RegisterCalf => Page::RegisterTreatment,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Treatments => "Tratamentos",
            Page::Calves => "Bezerras",
            Page::Charts => "Gráficos",
            Page::Timeline => "Linha do Tempo",
            Page::RegisterTreatment => "Cadastro de Tratamento",
            Page::RegisterCalf => "Cadastro de Bezerra",
        }
    }

    /// Pages where printable keys go into the focused field
    pub fn is_form(&self) -> bool {
        matches!(self, Page::RegisterTreatment | Page::RegisterCalf)
    }
}

const PAGES: [Page; 6] = [
    Page::Treatments,
    Page::Calves,
    Page::Charts,
    Page::Timeline,
    Page::RegisterTreatment,
    Page::RegisterCalf,
];

const TREATMENT_FIELDS: [&str; 9] = [
    "Propriedade",
    "Brinco da Bezerra",
    "Razão do Tratamento",
    "Tipo de Medicamento",
    "Nome do Medicamento",
    "Dose",
    "Data da 1ª Dose",
    "Nº de Doses",
    "Responsável",
];

const CALF_FIELDS: [&str; 8] = [
    "Propriedade",
    "Brinco",
    "Nascimento",
    "Brinco mãe",
    "Peso",
    "Altura",
    "Vol. Colostro",
    "Brix",
];

/// Text inputs of a registration page, one per field, parsed on submit
#[derive(Debug, Clone)]
pub struct Form {
    pub fields: &'static [&'static str],
    pub values: Vec<String>,
    pub focus: usize,
}

impl Form {
    fn new(fields: &'static [&'static str]) -> Self {
        Self {
            fields,
            values: vec![String::new(); fields.len()],
            focus: 0,
        }
    }

    fn with_value(mut self, field: usize, value: impl Into<String>) -> Self {
        if let Some(slot) = self.values.get_mut(field) {
            *slot = value.into();
        }
        self
    }

    /// Dates start at today, dose count at 1
    pub fn treatment() -> Self {
        Self::new(&TREATMENT_FIELDS)
            .with_value(6, format_br_date(today()))
            .with_value(7, "1")
    }

    pub fn calf() -> Self {
        Self::new(&CALF_FIELDS).with_value(2, format_br_date(today()))
    }

    fn value(&self, field: usize) -> &str {
        self.values.get(field).map(|v| v.trim()).unwrap_or("")
    }

    pub fn focus_next(&mut self) {
        self.focus = (self.focus + 1) % self.values.len();
    }

    pub fn focus_previous(&mut self) {
        self.focus = (self.focus + self.values.len() - 1) % self.values.len();
    }

    pub fn push(&mut self, c: char) {
        if let Some(value) = self.values.get_mut(self.focus) {
            value.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(value) = self.values.get_mut(self.focus) {
            value.pop();
        }
    }

    pub fn to_treatment(&self) -> std::result::Result<TreatmentRecord, String> {
        let first_dose = parse_br_date("Data da 1ª Dose", self.value(6)).map_err(|e| e.to_string())?;
        let dose_count = match self.value(7).parse::<u32>() {
            Ok(n) if n >= 1 => n,
            _ => return Err(format!("Nº de Doses deve ser um inteiro ≥ 1: {:?}", self.value(7))),
        };

        Ok(
            TreatmentRecord::new(self.value(0), self.value(1), self.value(2), first_dose)
                .with_medication(self.value(3), self.value(4), self.value(5))
                .with_dose_count(dose_count)
                .with_responsible(self.value(8)),
        )
    }

    pub fn to_calf(&self) -> std::result::Result<CalfRecord, String> {
        let birth = parse_br_date("Nascimento", self.value(2)).map_err(|e| e.to_string())?;
        let amount = |field: usize| -> std::result::Result<f64, String> {
            let raw = self.value(field);
            if raw.is_empty() {
                return Ok(0.0);
            }
            match raw.replace(',', ".").parse::<f64>() {
                Ok(v) if v >= 0.0 => Ok(v),
                _ => Err(format!("Valor inválido para {}: {:?}", self.fields[field], raw)),
            }
        };

        Ok(CalfRecord::new(self.value(0), self.value(1), birth)
            .with_mother(self.value(3))
            .with_measurements(amount(4)?, amount(5)?)
            .with_colostrum(amount(6)?, amount(7)?))
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

/// Property filter for one table: options list + selected index
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    pub options: Vec<String>,
    pub selected: usize,
}

impl FilterState {
    pub fn active(&self) -> &str {
        self.options
            .get(self.selected)
            .map(String::as_str)
            .unwrap_or(calf_ledger::ALL_PROPERTIES)
    }

    fn cycle(&mut self) {
        if !self.options.is_empty() {
            self.selected = (self.selected + 1) % self.options.len();
        }
    }

    /// Replace options, keeping the active property when it still exists
    fn reset(&mut self, options: Vec<String>) {
        let active = self.active().to_string();
        self.selected = options.iter().position(|o| *o == active).unwrap_or(0);
        self.options = options;
    }
}

pub struct App {
    pub store: RecordStore,
    pub current_page: Page,
    pub filtered_treatments: Vec<TreatmentRecord>,
    pub filtered_calves: Vec<CalfRecord>,
    pub treatment_filter: FilterState,
    pub calf_filter: FilterState,
    pub treatment_state: TableState,
    pub calf_state: TableState,
    pub ear_tags: Vec<String>,
    pub tag_state: ListState,
    pub selected_tags: Vec<String>,
    pub timeline: Option<std::result::Result<Vec<TimelineEvent>, String>>,
    pub treatment_form: Form,
    pub calf_form: Form,
    pub status: Option<Notice>,
}

impl App {
    pub fn new(store: RecordStore) -> Self {
        let mut app = Self {
            store,
            current_page: Page::Treatments,
            filtered_treatments: Vec::new(),
            filtered_calves: Vec::new(),
            treatment_filter: FilterState::default(),
            calf_filter: FilterState::default(),
            treatment_state: TableState::default(),
            calf_state: TableState::default(),
            ear_tags: Vec::new(),
            tag_state: ListState::default(),
            selected_tags: Vec::new(),
            timeline: None,
            treatment_form: Form::treatment(),
            calf_form: Form::calf(),
            status: None,
        };
        app.sync();
        app
    }

    /// Recompute everything derived from the store
    fn sync(&mut self) {
        self.treatment_filter
            .reset(property_options(self.store.treatments()));
        self.calf_filter.reset(property_options(self.store.calves()));
        self.apply_filters();

        self.ear_tags = ear_tag_options(self.store.calves());
        self.selected_tags.retain(|t| self.ear_tags.contains(t));
        select_first(&mut self.tag_state, self.ear_tags.len());

        self.pull_notices();
    }

    fn pull_notices(&mut self) {
        let notices = self.store.take_notices();
        // Warnings win over the success messages of the same batch
        let latest = notices
            .iter()
            .rev()
            .find(|n| n.level == NoticeLevel::Warning)
            .or_else(|| notices.last())
            .cloned();
        if latest.is_some() {
            self.status = latest;
        }
    }

    pub fn apply_filters(&mut self) {
        self.filtered_treatments =
            filter_by_property(self.store.treatments(), self.treatment_filter.active());
        self.filtered_calves = filter_by_property(self.store.calves(), self.calf_filter.active());

        select_first_row(&mut self.treatment_state, self.filtered_treatments.len());
        select_first_row(&mut self.calf_state, self.filtered_calves.len());
    }

    pub fn cycle_filter(&mut self) {
        match self.current_page {
            Page::Treatments => self.treatment_filter.cycle(),
            Page::Calves => self.calf_filter.cycle(),
            _ => return,
        }
        self.apply_filters();
    }

    pub fn refresh(&mut self) {
        self.store.refresh();
        self.timeline = None;
        self.sync();
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn row_count(&self) -> usize {
        match self.current_page {
            Page::Treatments => self.filtered_treatments.len(),
            Page::Calves => self.filtered_calves.len(),
            Page::Timeline => self.ear_tags.len(),
            Page::Charts | Page::RegisterTreatment | Page::RegisterCalf => 0,
        }
    }

    fn selected_row(&self) -> Option<usize> {
        match self.current_page {
            Page::Treatments => self.treatment_state.selected(),
            Page::Calves => self.calf_state.selected(),
            Page::Timeline => self.tag_state.selected(),
            Page::Charts | Page::RegisterTreatment | Page::RegisterCalf => None,
        }
    }

    fn select_row(&mut self, row: usize) {
        match self.current_page {
            Page::Treatments => self.treatment_state.select(Some(row)),
            Page::Calves => self.calf_state.select(Some(row)),
            Page::Timeline => self.tag_state.select(Some(row)),
            Page::Charts | Page::RegisterTreatment | Page::RegisterCalf => {}
        }
    }

    /// Move the cursor by `delta` rows; `wrap` cycles past the ends
    fn move_cursor(&mut self, delta: isize, wrap: bool) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let current = self.selected_row().unwrap_or(0) as isize;
        let last = len as isize - 1;
        let next = current + delta;
        let row = if wrap {
            next.rem_euclid(len as isize)
        } else {
            next.clamp(0, last)
        };
        self.select_row(row as usize);
    }

    pub fn next(&mut self) {
        self.move_cursor(1, true);
    }

    pub fn previous(&mut self) {
        self.move_cursor(-1, true);
    }

    pub fn page_down(&mut self) {
        self.move_cursor(20, false);
    }

    pub fn page_up(&mut self) {
        self.move_cursor(-20, false);
    }

    /// Select / deselect the ear tag under the cursor
    pub fn toggle_tag(&mut self) {
        let tag = match self.tag_state.selected().and_then(|i| self.ear_tags.get(i)) {
            Some(tag) => tag.clone(),
            None => return,
        };
        match self.selected_tags.iter().position(|t| *t == tag) {
            Some(i) => {
                self.selected_tags.remove(i);
            }
            None => self.selected_tags.push(tag),
        }
    }

    pub fn build_timeline(&mut self) {
        let result = request_timeline(&self.selected_tags, self.store.calves(), self.store.treatments())
            .map(order_for_display)
            .map_err(|e| e.to_string());
        self.timeline = Some(result);
    }

    pub fn clear_selection(&mut self) {
        self.selected_tags.clear();
        self.timeline = None;
    }

    pub fn active_form(&mut self) -> Option<&mut Form> {
        match self.current_page {
            Page::RegisterTreatment => Some(&mut self.treatment_form),
            Page::RegisterCalf => Some(&mut self.calf_form),
            _ => None,
        }
    }

    /// Parse the active form and append the record. The input is kept
    /// when parsing or saving fails.
    pub fn submit_form(&mut self) {
        let parsed = match self.current_page {
            Page::RegisterTreatment => self
                .treatment_form
                .to_treatment()
                .map(|record| self.store.add_treatment(record).is_ok()),
            Page::RegisterCalf => self
                .calf_form
                .to_calf()
                .map(|record| self.store.add_calf(record).is_ok()),
            _ => return,
        };
        let saved = match parsed {
            Ok(saved) => saved,
            Err(msg) => {
                self.status = Some(Notice::warning(msg));
                return;
            }
        };

        if saved {
            match self.current_page {
                Page::RegisterTreatment => self.treatment_form = Form::treatment(),
                _ => self.calf_form = Form::calf(),
            }
        }
        self.sync();
    }
}

fn select_first(state: &mut ListState, len: usize) {
    state.select(if len == 0 { None } else { Some(0) });
}

fn select_first_row(state: &mut TableState, len: usize) {
    state.select(if len == 0 { None } else { Some(0) });
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

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if app.current_page.is_form() && handle_form_key(app, key.code) {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('f') => app.cycle_filter(),
                KeyCode::Char('r') => app.refresh(),
                KeyCode::Char(' ') if app.current_page == Page::Timeline => app.toggle_tag(),
                KeyCode::Enter if app.current_page == Page::Timeline => app.build_timeline(),
                KeyCode::Char('c') if app.current_page == Page::Timeline => app.clear_selection(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => app.select_row(0),
                KeyCode::End => {
                    let len = app.row_count();
                    if len > 0 {
                        app.select_row(len - 1);
                    }
                }
                _ => {}
            }
        }
    }
}

/// Editing keys of the registration pages; false lets the page keys through
fn handle_form_key(app: &mut App, code: KeyCode) -> bool {
    match code {
        KeyCode::Enter => app.submit_form(),
        code => {
            let form = match app.active_form() {
                Some(form) => form,
                None => return false,
            };
            match code {
                KeyCode::Down => form.focus_next(),
                KeyCode::Up => form.focus_previous(),
                KeyCode::Backspace => form.backspace(),
                KeyCode::Char(c) => form.push(c),
                _ => return false,
            }
        }
    }
    true
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
        Page::Treatments => render_treatments(f, chunks[1], app),
        Page::Calves => render_calves(f, chunks[1], app),
        Page::Charts => render_charts(f, chunks[1], app),
        Page::Timeline => render_timeline(f, chunks[1], app),
        Page::RegisterTreatment => {
            render_form(f, chunks[1], " Adicionar Tratamento ", &app.treatment_form)
        }
        Page::RegisterCalf => render_form(f, chunks[1], " Adicionar Bezerra ", &app.calf_form),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in PAGES.iter().enumerate() {
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

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Bezerras: {}", app.store.calves().len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Tratamentos: {}", app.store.treatments().len()),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn table_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_treatments(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.filtered_treatments.iter().map(|t| {
        Row::new(vec![
            Cell::from(t.property.clone()),
            Cell::from(t.calf_ear_tag.clone()),
            Cell::from(truncate(&t.reason, 22)).style(Style::default().fg(Color::Red)),
            Cell::from(truncate(&t.medication_type, 16)),
            Cell::from(truncate(&t.medication_name, 20)),
            Cell::from(truncate(&t.dose, 10)),
            Cell::from(t.first_dose_date.clone()),
            Cell::from(t.dose_count.to_string()),
            Cell::from(truncate(&t.responsible, 14)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(24),
            Constraint::Length(18),
            Constraint::Length(22),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(16),
        ],
    )
    .header(header_row(&[
        "Propriedade",
        "Brinco",
        "Razão",
        "Tipo",
        "Medicamento",
        "Dose",
        "1ª Dose",
        "Doses",
        "Responsável",
    ]))
    .block(table_block(format!(
        " Tratamentos - Propriedade: {} ",
        app.treatment_filter.active()
    )))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.treatment_state);
}

fn render_calves(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.filtered_calves.iter().map(|c| {
        Row::new(vec![
            Cell::from(c.property.clone()),
            Cell::from(c.ear_tag.clone()),
            Cell::from(c.birth_date.clone()),
            Cell::from(c.mother_ear_tag.clone()),
            Cell::from(format!("{:.1}", c.weight_kg)),
            Cell::from(format!("{:.1}", c.height_cm)),
            Cell::from(format!("{:.1}", c.colostrum_volume)),
            Cell::from(format!("{:.1}", c.brix_score)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(14),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&[
        "Propriedade",
        "Brinco",
        "Nascimento",
        "Brinco mãe",
        "Peso",
        "Altura",
        "Vol. Colostro",
        "Brix",
    ]))
    .block(table_block(format!(
        " Bezerras - Propriedade: {} ",
        app.calf_filter.active()
    )))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.calf_state);
}

fn render_tally<K: ToString>(f: &mut Frame, area: Rect, title: &str, tally: &Tally<K>, color: Color) {
    let labels: Vec<(String, u64)> = tally.iter().map(|(k, n)| (k.to_string(), *n as u64)).collect();
    let data: Vec<(&str, u64)> = labels.iter().map(|(k, n)| (k.as_str(), *n)).collect();

    let chart = BarChart::default()
        .block(table_block(format!(" {} ", title)))
        .data(data.as_slice())
        .bar_width(9)
        .bar_gap(1)
        .bar_style(Style::default().fg(color))
        .value_style(Style::default().fg(Color::Black).bg(color));

    f.render_widget(chart, area);
}

fn render_charts(f: &mut Frame, area: Rect, app: &App) {
    let summary = ChartSummary::from_treatments(app.store.treatments());

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[0]);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);

    render_tally(f, top[0], "Tratamentos por Propriedade", &summary.by_property, Color::Cyan);
    render_tally(f, top[1], "Tratamentos por Tipo", &summary.by_reason, Color::Red);
    render_tally(f, middle[0], "Tratamentos por Responsável", &summary.by_responsible, Color::Green);
    render_tally(f, middle[1], "Número de Doses", &summary.by_dose_count, Color::Yellow);

    render_over_time(f, rows[2], &summary);
}

fn render_over_time(f: &mut Frame, area: Rect, summary: &ChartSummary) {
    let title = " Tratamentos ao Longo do Tempo ";

    if let Some(err) = &summary.over_time_error {
        let msg = Paragraph::new(format!("  ❌ {}", err))
            .style(Style::default().fg(Color::Red))
            .block(table_block(title.to_string()));
        f.render_widget(msg, area);
        return;
    }

    let (first, last) = match (summary.over_time.first(), summary.over_time.last()) {
        (Some((first, _)), Some((last, _))) => (*first, *last),
        _ => {
            let msg = Paragraph::new("  Sem tratamentos registrados").block(table_block(title.to_string()));
            f.render_widget(msg, area);
            return;
        }
    };

    let points: Vec<(f64, f64)> = summary
        .over_time
        .iter()
        .map(|(day, n)| ((*day - first).num_days() as f64, *n as f64))
        .collect();
    let span = (last - first).num_days().max(1) as f64;
    let peak = summary.over_time.iter().map(|(_, n)| *n).max().unwrap_or(1) as f64;

    let dataset = Dataset::default()
        .name("tratamentos")
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(table_block(title.to_string()))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, span])
                .labels(vec![
                    Span::raw(first.format("%d/%m/%Y").to_string()),
                    Span::raw(last.format("%d/%m/%Y").to_string()),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(Color::DarkGray))
                .bounds([0.0, peak])
                .labels(vec![Span::raw("0"), Span::raw(format!("{}", peak as usize))]),
        );

    f.render_widget(chart, area);
}

fn render_timeline(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(24), Constraint::Min(0)])
        .split(area);

    let items: Vec<ListItem> = app
        .ear_tags
        .iter()
        .map(|tag| {
            let (mark, style) = if app.selected_tags.contains(tag) {
                ("[x] ", Style::default().fg(Color::Green))
            } else {
                ("[ ] ", Style::default())
            };
            ListItem::new(Line::from(vec![Span::styled(mark, style), Span::raw(tag.clone())]))
        })
        .collect();

    let list = List::new(items)
        .block(table_block(" Brincos ".to_string()))
        .highlight_style(highlight())
        .highlight_symbol("→ ");
    f.render_stateful_widget(list, chunks[0], &mut app.tag_state);

    let title = " Linha do Tempo das Bezerras Selecionadas ";
    let events = match &app.timeline {
        None => {
            let hint = Paragraph::new(vec![
                Line::from(""),
                Line::from("  Espaço seleciona, Enter busca, c limpa"),
            ])
            .style(Style::default().fg(Color::DarkGray))
            .block(table_block(title.to_string()));
            f.render_widget(hint, chunks[1]);
            return;
        }
        Some(Err(msg)) => {
            let warning = Paragraph::new(format!("  {}", msg))
                .style(Style::default().fg(Color::Yellow))
                .block(table_block(title.to_string()));
            f.render_widget(warning, chunks[1]);
            return;
        }
        Some(Ok(events)) => events,
    };

    let track_width: usize = 40;
    let span = date_span(events);

    let rows = events.iter().map(|e| {
        let color = match e.category {
            EventCategory::Birth => Color::Green,
            EventCategory::Treatment => Color::Red,
        };
        let offset = match span {
            Some((first, last)) if last > first => {
                let total = (last - first).num_days() as usize;
                (e.date - first).num_days() as usize * (track_width - 1) / total
            }
            _ => 0,
        };
        let track = format!("{}●{}", "·".repeat(offset), "·".repeat(track_width - 1 - offset));

        Row::new(vec![
            Cell::from(truncate(&e.label, 28)),
            Cell::from(e.date.format("%d/%m/%Y").to_string()),
            Cell::from(e.category.name().to_string()).style(Style::default().fg(color)),
            Cell::from(track).style(Style::default().fg(color)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(30),
            Constraint::Length(12),
            Constraint::Length(12),
            Constraint::Length(track_width as u16),
        ],
    )
    .header(header_row(&["Evento", "Data", "Tipo", ""]))
    .block(table_block(title.to_string()));

    f.render_widget(table, chunks[1]);
}

fn render_form(f: &mut Frame, area: Rect, title: &str, form: &Form) {
    let mut lines = vec![Line::from("")];
    for (i, (field, value)) in form.fields.iter().zip(&form.values).enumerate() {
        let focused = i == form.focus;
        let (marker, style) = if focused {
            ("→ ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else {
            ("  ", Style::default().fg(Color::White))
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{:<22}", marker, field), style),
            Span::raw(value.clone()),
            Span::styled(if focused { "▏" } else { "" }, style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "  ↑/↓ campo, Enter adiciona. Datas em DD/MM/AAAA",
        Style::default().fg(Color::DarkGray),
    )));

    f.render_widget(Paragraph::new(lines).block(table_block(title.to_string())), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = Vec::new();

    if let Some(notice) = &app.status {
        let color = match notice.level {
            NoticeLevel::Info => Color::Green,
            NoticeLevel::Warning => Color::Red,
        };
        status_spans.push(Span::styled(format!(" {} ", notice.text), Style::default().fg(color)));
        status_spans.push(Span::raw("| "));
    }

    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Página | "));
    status_spans.push(Span::styled("f", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Filtro | "));
    status_spans.push(Span::styled("r", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Atualizar | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Sair"));

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
        let cut: String = s.chars().take(max_len - 3).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn app_with_data(dir: &std::path::Path) -> App {
        let calves = dir.join("calves.csv");
        let treatments = dir.join("treatments.csv");
        calf_ledger::persist_calf_registry(
            &calves,
            &[
                CalfRecord::new("A", "001", day(2023, 1, 1)),
                CalfRecord::new("B", "002", day(2023, 2, 1)),
            ],
        )
        .unwrap();
        calf_ledger::persist_treatment_log(
            &treatments,
            &[
                TreatmentRecord::new("A", "001", "Fever", day(2023, 1, 15)),
                TreatmentRecord::new("B", "002", "Tosse", day(2023, 2, 3)),
                TreatmentRecord::new("A", "001", "Diarreia", day(2023, 1, 20)),
            ],
        )
        .unwrap();
        App::new(RecordStore::open(calves, treatments))
    }

    #[test]
    fn test_filter_cycles_through_properties() {
        let dir = tempdir().unwrap();
        let mut app = app_with_data(dir.path());

        assert_eq!(app.treatment_filter.active(), "Todas");
        assert_eq!(app.filtered_treatments.len(), 3);

        app.cycle_filter();
        assert_eq!(app.treatment_filter.active(), "A");
        assert_eq!(app.filtered_treatments.len(), 2);

        app.cycle_filter();
        app.cycle_filter();
        assert_eq!(app.treatment_filter.active(), "Todas");
    }

    #[test]
    fn test_timeline_selection() {
        let dir = tempdir().unwrap();
        let mut app = app_with_data(dir.path());
        app.current_page = Page::Timeline;

        app.build_timeline();
        assert!(matches!(&app.timeline, Some(Err(msg)) if msg == "Selecione pelo menos uma bezerra."));

        app.toggle_tag();
        app.build_timeline();
        let events = match &app.timeline {
            Some(Ok(events)) => events,
            other => panic!("unexpected timeline: {:?}", other),
        };
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].label, "001 - Diarreia");

        app.toggle_tag();
        assert!(app.selected_tags.is_empty());
    }

    #[test]
    fn test_cursor_wraps_and_clamps() {
        let dir = tempdir().unwrap();
        let mut app = app_with_data(dir.path());

        app.previous();
        assert_eq!(app.treatment_state.selected(), Some(2));
        app.next();
        assert_eq!(app.treatment_state.selected(), Some(0));
        app.page_down();
        assert_eq!(app.treatment_state.selected(), Some(2));
    }

    #[test]
    fn test_register_pages_close_the_tab_cycle() {
        assert_eq!(Page::Timeline.next(), Page::RegisterTreatment);
        assert_eq!(Page::RegisterCalf.next(), Page::Treatments);
        assert_eq!(Page::Treatments.previous(), Page::RegisterCalf);
        assert!(PAGES.iter().all(|p| p.next().previous() == *p));
        assert_eq!(PAGES.iter().filter(|p| p.is_form()).count(), 2);
    }

    #[test]
    fn test_form_typing_and_focus() {
        let mut form = Form::calf();
        assert_eq!(form.values.len(), CALF_FIELDS.len());

        form.focus_previous();
        assert_eq!(form.focus, CALF_FIELDS.len() - 1);
        form.focus_next();
        for c in "Faz".chars() {
            form.push(c);
        }
        form.backspace();
        assert_eq!(form.values[0], "Fa");
    }

    #[test]
    fn test_submit_calf_form_appends_and_persists() {
        let dir = tempdir().unwrap();
        let mut app = app_with_data(dir.path());
        app.current_page = Page::RegisterCalf;
        app.calf_form.values = ["C", "003", "05/03/2023", "M-9", "40,5", "", "3", "23"]
            .iter()
            .map(|v| v.to_string())
            .collect();

        app.submit_form();

        let added = app.store.calves().last().unwrap().clone();
        assert_eq!(added.ear_tag, "003");
        assert_eq!(added.weight_kg, 40.5);
        assert_eq!(added.height_cm, 0.0);
        assert!(app.ear_tags.contains(&"003".to_string()));
        assert_eq!(app.calf_form.values[1], "");
        assert!(matches!(&app.status, Some(n) if n.level == NoticeLevel::Info));

        let reopened = RecordStore::open(dir.path().join("calves.csv"), dir.path().join("treatments.csv"));
        assert_eq!(reopened.calves().len(), 3);
    }

    #[test]
    fn test_invalid_form_keeps_input() {
        let dir = tempdir().unwrap();
        let mut app = app_with_data(dir.path());
        app.current_page = Page::RegisterTreatment;
        app.treatment_form.values[1] = "001".to_string();
        app.treatment_form.values[6] = "2023-01-01".to_string();

        app.submit_form();

        assert_eq!(app.store.treatments().len(), 3);
        assert_eq!(app.treatment_form.values[1], "001");
        assert!(matches!(&app.status, Some(n) if n.level == NoticeLevel::Warning));

        app.treatment_form.values[6] = "01/01/2023".to_string();
        app.treatment_form.values[7] = "0".to_string();
        app.submit_form();
        assert_eq!(app.store.treatments().len(), 3);

        app.treatment_form.values[7] = "2".to_string();
        app.submit_form();
        assert_eq!(app.store.treatments().len(), 4);
        assert_eq!(app.store.treatments()[3].dose_count, 2);
        assert_eq!(app.treatment_form.values[7], "1");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("Responsável", 20), "Responsável");
        assert_eq!(truncate("Antibiótico de amplo espectro", 10), "Antibió...");
    }
}
