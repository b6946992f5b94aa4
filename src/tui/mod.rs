//! Ratatui-based terminal UI.
//!
//! The TUI is an interactive what-if panel: pick the driving metric and total
//! budget, pin channels to fixed amounts, and watch the split update.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Cell, List, ListItem, Paragraph, Row, Table},
    Terminal,
};
use tracing::debug;

use crate::app::pipeline::{run_allocation, AllocationRun, LoadedData};
use crate::domain::{AllocConfig, Metric};
use crate::error::AppError;

const FIELD_BUDGET: usize = 0;
const FIELD_METRIC: usize = 1;
const FIELD_CHANNEL: usize = 2;
const FIELD_COUNT: usize = 3;

/// Start the TUI on an already-loaded dataset.
pub fn run(data: LoadedData, config: AllocConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(data, config);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    data: LoadedData,
    config: AllocConfig,
    metrics: Vec<Metric>,
    channels: Vec<String>,
    selected_field: usize,
    selected_channel: usize,
    status: String,
    /// Last allocation that succeeded; failed edits never replace it.
    run: Option<AllocationRun>,
}

impl App {
    fn new(data: LoadedData, config: AllocConfig) -> Self {
        let channels = crate::alloc::filter_channels(&data.dataset, &config.channels)
            .map(|ds| ds.channels())
            .unwrap_or_default();
        let metrics = match data.dataset.metrics() {
            m if m.is_empty() => Metric::ALL.to_vec(),
            m => m,
        };

        let mut app = Self {
            data,
            config,
            metrics,
            channels,
            selected_field: FIELD_BUDGET,
            selected_channel: 0,
            status: String::new(),
            run: None,
        };
        app.recompute();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the user asked to quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Up => {
                self.selected_field = self.selected_field.saturating_sub(1);
            }
            KeyCode::Down => {
                if self.selected_field + 1 < FIELD_COUNT {
                    self.selected_field += 1;
                }
            }
            KeyCode::Left => self.adjust_field(-1),
            KeyCode::Right => self.adjust_field(1),
            KeyCode::Char('+') | KeyCode::Char('=') => self.nudge_override(1.0),
            KeyCode::Char('-') => self.nudge_override(-1.0),
            KeyCode::Char('c') => {
                if !self.config.overrides.is_empty() {
                    self.config.overrides.clear();
                    self.recompute();
                    self.status = "Cleared overrides.".to_string();
                }
            }
            KeyCode::Char('e') => {
                let previous = self.config.clone();
                self.config.equal_split = !self.config.equal_split;
                self.commit(previous, if self.config.equal_split { "equal split: on" } else { "equal split: off" });
            }
            _ => {}
        }
        false
    }

    fn adjust_field(&mut self, delta: i32) {
        let previous = self.config.clone();
        match self.selected_field {
            FIELD_BUDGET => {
                let step = budget_step(self.config.total_budget);
                let next = self.config.total_budget + step * f64::from(delta);
                if next <= 0.0 {
                    self.status = "Budget must stay positive.".to_string();
                    return;
                }
                self.config.total_budget = next;
                let label = format!("budget: {:.2}", next);
                self.commit(previous, &label);
            }
            FIELD_METRIC => {
                self.config.metric = cycle(&self.metrics, self.config.metric, delta);
                let label = format!("metric: {}", self.config.metric.display_name());
                self.commit(previous, &label);
            }
            FIELD_CHANNEL => {
                if self.channels.is_empty() {
                    return;
                }
                let n = self.channels.len() as i32;
                self.selected_channel = (self.selected_channel as i32 + delta).rem_euclid(n) as usize;
                self.status = format!("channel: {}", self.channels[self.selected_channel]);
            }
            _ => {}
        }
    }

    /// Move the selected channel's pinned amount up or down by one budget step.
    fn nudge_override(&mut self, direction: f64) {
        let Some(channel) = self.channels.get(self.selected_channel).cloned() else {
            return;
        };
        let current = self
            .run
            .as_ref()
            .and_then(|run| run.final_result().get(&channel))
            .unwrap_or(0.0);
        let amount = (current + direction * budget_step(self.config.total_budget)).max(0.0);

        let previous = self.config.clone();
        set_override(&mut self.config.overrides, &channel, amount);
        let label = format!("override {channel} = {amount:.2}");
        self.commit(previous, &label);
    }

    /// Recompute; on failure restore `previous` and show the error.
    fn commit(&mut self, previous: AllocConfig, label: &str) {
        if self.recompute() {
            self.status = label.to_string();
        } else {
            self.config = previous;
            self.status = format!("{} (reverted)", self.status);
        }
    }

    fn recompute(&mut self) -> bool {
        match run_allocation(&self.data.dataset, &self.data.source, &self.config) {
            Ok(run) => {
                self.run = Some(run);
                true
            }
            Err(err) => {
                debug!(error = %err, "what-if change rejected");
                self.status = err.to_string();
                false
            }
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        lines.push(Line::from(vec![
            Span::styled("mmb", Style::default().fg(Color::Cyan)),
            Span::raw(format!(
                " | {} | {} rows | {} channels",
                self.data.source,
                self.data.dataset.len(),
                self.channels.len()
            )),
        ]));

        let basis = self
            .run
            .as_ref()
            .map(|r| r.weights.basis.describe())
            .unwrap_or_else(|| "-".to_string());
        lines.push(Line::from(Span::styled(
            format!(
                "budget: {:.2} | basis: {basis} | overrides: {}",
                self.config.total_budget,
                self.config.overrides.len()
            ),
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines)).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(5)])
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[0]);

        self.draw_chart(frame, cols[0]);
        self.draw_table(frame, cols[1]);
        self.draw_settings(frame, rows[1]);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Allocation").borders(Borders::ALL);
        let Some(run) = &self.run else {
            let msg = Paragraph::new("No allocation yet. Adjust the settings below.")
                .style(Style::default().fg(Color::Yellow))
                .block(block);
            frame.render_widget(msg, area);
            return;
        };

        let result = run.final_result();
        let bars: Vec<Bar> = result
            .iter()
            .map(|entry| {
                let style = if run.overrides.contains_key(&entry.channel) {
                    Style::default().fg(Color::Magenta)
                } else {
                    Style::default().fg(Color::Cyan)
                };
                Bar::default()
                    .label(Line::from(entry.channel.clone()))
                    .value(entry.amount.max(0.0).round() as u64)
                    .text_value(format!("{:.0}", entry.amount))
                    .style(style)
            })
            .collect();

        let chart = BarChart::default()
            .block(block)
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(1)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    fn draw_table(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Channels").borders(Borders::ALL);
        let Some(run) = &self.run else {
            frame.render_widget(block, area);
            return;
        };

        let result = run.final_result();
        let rows: Vec<Row> = result
            .iter()
            .map(|entry| {
                let pinned = if run.overrides.contains_key(&entry.channel) { "*" } else { "" };
                let share = result.share(&entry.channel).unwrap_or(0.0) * 100.0;
                let row = Row::new(vec![
                    Cell::from(format!("{}{pinned}", entry.channel)),
                    Cell::from(format!("{:.4}", run.weights.get(&entry.channel).unwrap_or(0.0))),
                    Cell::from(format!("{:.2}", entry.amount)),
                    Cell::from(format!("{share:.1}%")),
                ]);
                let selected = self.selected_field == FIELD_CHANNEL
                    && self.channels.get(self.selected_channel) == Some(&entry.channel);
                if selected {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Min(10),
                Constraint::Length(8),
                Constraint::Length(12),
                Constraint::Length(7),
            ],
        )
        .header(Row::new(vec!["channel", "weight", "amount", "share"]).style(Style::default().fg(Color::Gray)))
        .block(block);
        frame.render_widget(table, area);
    }

    fn draw_settings(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let channel = self
            .channels
            .get(self.selected_channel)
            .map(String::as_str)
            .unwrap_or("-");

        let items = vec![
            ListItem::new(format!("Budget: {:.2}", self.config.total_budget)),
            ListItem::new(format!(
                "Metric: {}{}",
                self.config.metric.display_name(),
                if self.config.equal_split { " (equal split)" } else { "" }
            )),
            ListItem::new(format!("Channel: {channel}")),
        ];

        let list = List::new(items)
            .block(Block::default().title("Settings").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ratatui::widgets::ListState::default();
        state.select(Some(self.selected_field));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "↑/↓ select  ←/→ adjust  +/- pin channel  c clear  e equal  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// One "click" of budget adjustment: a tenth of the budget's order of magnitude.
fn budget_step(budget: f64) -> f64 {
    if !budget.is_finite() || budget <= 0.0 {
        return 1.0;
    }
    10f64.powf(budget.log10().floor() - 1.0).max(1.0)
}

fn cycle(metrics: &[Metric], current: Metric, delta: i32) -> Metric {
    let Some(pos) = metrics.iter().position(|m| *m == current) else {
        return metrics.first().copied().unwrap_or(current);
    };
    let n = metrics.len() as i32;
    metrics[(pos as i32 + delta).rem_euclid(n) as usize]
}

fn set_override(overrides: &mut Vec<(String, f64)>, channel: &str, amount: f64) {
    match overrides.iter_mut().find(|(name, _)| name.eq_ignore_ascii_case(channel)) {
        Some(entry) => entry.1 = amount,
        None => overrides.push((channel.to_string(), amount)),
    }
}
