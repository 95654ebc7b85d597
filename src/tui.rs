use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

use crate::app::{ProgressEvent, ProgressSink, ProgressSinkKind};
use crate::error::ZooError;

const EVENTS_MAX: usize = 8;
const LOGS_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Resolve,
    Prepare,
    Fetch,
    Verify,
    Extract,
    Scan,
    Load,
    Convert,
    Store,
}

impl Phase {
    const ALL: [Phase; 9] = [
        Phase::Resolve,
        Phase::Prepare,
        Phase::Fetch,
        Phase::Verify,
        Phase::Extract,
        Phase::Scan,
        Phase::Load,
        Phase::Convert,
        Phase::Store,
    ];

    fn label(self) -> &'static str {
        match self {
            Phase::Resolve => "Resolve",
            Phase::Prepare => "Prepare",
            Phase::Fetch => "Fetch",
            Phase::Verify => "Verify",
            Phase::Extract => "Extract",
            Phase::Scan => "Scan",
            Phase::Load => "Load",
            Phase::Convert => "Convert",
            Phase::Store => "Store",
        }
    }

    fn index(self) -> usize {
        Phase::ALL
            .iter()
            .position(|phase| *phase == self)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Operational,
    Logs,
}

#[derive(Debug)]
struct AppState {
    status: String,
    phase: Phase,
    latency_ms: Option<u128>,
    progress: Option<(usize, usize)>,
    events: VecDeque<String>,
    logs: VecDeque<String>,
    view: View,
    started: Instant,
    active: bool,
    finished: bool,
}

pub struct Tui {
    kind: ProgressSinkKind,
    state: Arc<Mutex<AppState>>,
    log_scroll: u16,
}

struct TuiProgress {
    state: Arc<Mutex<AppState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        if let Ok(mut state) = self.state.lock() {
            let message = event.message.trim().to_string();
            if let Some((phase, payload)) = parse_phase(&message) {
                state.phase = phase;
                state.status = payload.to_string();
            } else if let Some(progress) = parse_progress(&message) {
                state.progress = Some(progress);
            } else if message == "remote.response" {
                state.latency_ms = event.elapsed.map(|elapsed| elapsed.as_millis());
            } else {
                state.status = message.clone();
            }

            push_bounded(&mut state.events, message.clone(), EVENTS_MAX);
            push_bounded(
                &mut state.logs,
                format!("[{}] {message}", timestamp()),
                LOGS_MAX,
            );
        }
    }
}

impl Tui {
    pub fn new(kind: ProgressSinkKind) -> Self {
        Self {
            kind,
            state: Arc::new(Mutex::new(AppState {
                status: "ready".to_string(),
                phase: Phase::Resolve,
                latency_ms: None,
                progress: None,
                events: VecDeque::new(),
                logs: VecDeque::new(),
                view: View::Operational,
                started: Instant::now(),
                active: false,
                finished: false,
            })),
            log_scroll: 0,
        }
    }

    /// Runs `f` on a worker thread while rendering its progress events.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, ZooError> + Send + 'static,
        R: Send + 'static,
    {
        self.set_active(true);

        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let mut tick = 0usize;
        loop {
            if let Ok(state) = self.state.lock() {
                let elapsed = state.started.elapsed();
                terminal
                    .draw(|frame| draw_ui(frame, self, &state, tick, elapsed))
                    .into_diagnostic()?;
            }

            if let Ok(result) = rx.try_recv() {
                self.set_active(false);
                restore_terminal()?;
                handle.join().ok();
                return result.map_err(miette::Report::new);
            }

            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }

            tick = tick.wrapping_add(1);
        }

        self.set_active(false);
        restore_terminal()?;
        Err(miette::Report::msg("aborted"))
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        match key.code {
            KeyCode::Esc => return true,
            KeyCode::F(4) | KeyCode::Char('l') => self.toggle_logs(),
            KeyCode::PageUp => self.scroll_logs(-5),
            KeyCode::PageDown => self.scroll_logs(5),
            _ => {}
        }
        false
    }

    fn toggle_logs(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.view = match state.view {
                View::Operational => View::Logs,
                View::Logs => View::Operational,
            };
        }
    }

    fn set_active(&self, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.active = active;
            state.finished = !active;
            if active {
                state.started = Instant::now();
                state.latency_ms = None;
                state.progress = None;
                state.phase = Phase::Resolve;
            }
        }
    }

    fn scroll_logs(&mut self, delta: i16) {
        let max = self.state.lock().map(|state| state.logs.len()).unwrap_or(0);
        let max_scroll = max.saturating_sub(1) as i16;
        let next = (self.log_scroll as i16 + delta).clamp(0, max_scroll);
        self.log_scroll = next as u16;
    }
}

fn restore_terminal() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    io::stdout()
        .execute(LeaveAlternateScreen)
        .into_diagnostic()?;
    Ok(())
}

fn draw_ui(frame: &mut ratatui::Frame, tui: &Tui, state: &AppState, tick: usize, elapsed: Duration) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(8),
            Constraint::Length(2),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(tui.kind, tick), chunks[0]);
    match state.view {
        View::Operational => {
            let main = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            frame.render_widget(draw_status_panel(state, elapsed), main[0]);
            frame.render_widget(draw_events_panel(state), main[1]);
        }
        View::Logs => frame.render_widget(draw_logs_view(state, tui.log_scroll), chunks[1]),
    }
    let footer = Paragraph::new(Line::from(Span::styled(
        "Esc abort   l/F4 logs   PgUp/PgDn scroll",
        Style::default().fg(Color::Gray),
    )))
    .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);
}

fn draw_header(kind: ProgressSinkKind, tick: usize) -> Paragraph<'static> {
    let hb = if tick % 2 == 0 { "*" } else { " " };
    let op_label = match kind {
        ProgressSinkKind::Download => "Download",
        ProgressSinkKind::Convert => "Convert",
        ProgressSinkKind::List => "List",
        ProgressSinkKind::Info => "Info",
        ProgressSinkKind::Delete => "Delete",
    };
    let header_line = Line::from(vec![
        Span::styled(
            "DATASET-ZOO",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   Op: "),
        Span::styled(op_label, Style::default().fg(Color::Cyan)),
        Span::raw("   "),
        Span::styled(hb, Style::default().fg(Color::Green)),
    ]);
    Paragraph::new(header_line)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_status_panel(state: &AppState, elapsed: Duration) -> Paragraph<'static> {
    let percent = match state.progress {
        Some((done, total)) if total > 0 => ((done * 100) / total).min(100) as u8,
        _ => phase_progress(state.phase),
    };
    let phase_color = if state.active {
        Color::Cyan
    } else if state.finished {
        Color::Green
    } else {
        Color::Yellow
    };
    let latency = state
        .latency_ms
        .map(|v| format!("{v} ms"))
        .unwrap_or_else(|| "--".to_string());
    let mut lines = vec![
        Line::from(Span::styled(
            "STATUS / PROGRESS",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("Phase: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{:<8} ", state.phase.label()),
                Style::default().fg(phase_color),
            ),
            Span::raw(progress_bar(percent)),
            Span::raw(format!(" {percent:>3}%")),
        ]),
        Line::from(vec![
            Span::styled("Elapsed: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{:.1}s", elapsed.as_secs_f64())),
            Span::styled("   Download: ", Style::default().fg(Color::Gray)),
            Span::raw(latency),
        ]),
        Line::from(vec![
            Span::styled("Status: ", Style::default().fg(Color::Gray)),
            Span::raw(state.status.clone()),
        ]),
    ];
    if let Some((done, total)) = state.progress {
        lines.push(Line::from(vec![
            Span::styled("Images: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{done}/{total}")),
        ]));
    }

    Paragraph::new(lines)
        .block(Block::default().borders(Borders::RIGHT))
        .wrap(Wrap { trim: true })
}

fn draw_events_panel(state: &AppState) -> Paragraph<'static> {
    let mut lines = vec![Line::from(Span::styled(
        "RECENT EVENTS",
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))];
    for event in state.events.iter().rev() {
        lines.push(Line::from(format!("- {event}")));
    }
    Paragraph::new(lines).wrap(Wrap { trim: true })
}

fn draw_logs_view(state: &AppState, scroll: u16) -> Paragraph<'static> {
    let lines = state
        .logs
        .iter()
        .map(|line| Line::from(line.clone()))
        .collect::<Vec<_>>();
    Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Logs"))
        .scroll((scroll, 0))
        .wrap(Wrap { trim: false })
}

fn phase_progress(phase: Phase) -> u8 {
    (((phase.index() + 1) * 100) / Phase::ALL.len()) as u8
}

fn progress_bar(percent: u8) -> String {
    let total = 10;
    let filled = (percent as usize * total) / 100;
    let mut out = String::from("[");
    for i in 0..total {
        out.push(if i < filled { '#' } else { '.' });
    }
    out.push(']');
    out
}

fn parse_phase(message: &str) -> Option<(Phase, &str)> {
    let rest = message.strip_prefix("phase=")?;
    let (label, payload) = rest.split_once(';')?;
    let phase = Phase::ALL
        .into_iter()
        .find(|phase| phase.label() == label.trim())?;
    Some((phase, payload.trim()))
}

fn parse_progress(message: &str) -> Option<(usize, usize)> {
    let (done, total) = message.strip_prefix("progress ")?.split_once('/')?;
    Some((done.trim().parse().ok()?, total.trim().parse().ok()?))
}

fn push_bounded(buffer: &mut VecDeque<String>, item: String, max: usize) {
    buffer.push_back(item);
    while buffer.len() > max {
        buffer.pop_front();
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
