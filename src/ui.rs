use color_eyre::eyre::{
    Result,
    eyre,
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use device_console::{
    console::{
        Console,
        DetailState,
    },
    device::{
        DeviceId,
        PlaceId,
    },
};
use futures::StreamExt;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use unicode_width::{
    UnicodeWidthChar,
    UnicodeWidthStr,
};

pub type InputEventReceiver = EventStream;

#[derive(Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Refresh,
    DismissError,
    SelectDevice(DeviceId),
    AmountChar(PlaceId, char),
    AmountBackspace(PlaceId),
    Deposit(PlaceId),
    Withdraw(PlaceId),
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Focus {
    #[default]
    Devices,
    Places,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    focus: Focus,
    device_idx: usize,
    place_idx: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl UiState {
    pub fn reset_place_cursor(&mut self) {
        self.place_idx = 0;
    }

    fn clamp(&mut self, console: &Console) {
        self.device_idx = self
            .device_idx
            .min(console.devices().len().saturating_sub(1));
        self.place_idx = self.place_idx.min(console.places().len().saturating_sub(1));
    }

    fn focused_place(&self, console: &Console) -> Option<PlaceId> {
        console.places().get(self.place_idx).map(|p| p.place)
    }
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    Ok(())
}

pub fn input_event_stream() -> InputEventReceiver {
    EventStream::new()
}

pub async fn next_raw_event(events: &mut InputEventReceiver) -> Result<Event> {
    match events.next().await {
        Some(Ok(event)) => Ok(event),
        Some(Err(err)) => Err(eyre!(err)),
        None => Err(eyre!("terminal input stream closed")),
    }
}

pub fn draw(state: &mut UiState, console: &Console) -> Result<()> {
    state.clamp(console);
    if let Some(mut term) = state.terminal.take() {
        let res = term.draw(|f| ui(f, state, console)).map(|_| ());
        state.terminal = Some(term);
        res?;
    }
    Ok(())
}

/// Maps a terminal event to a console action. Cursor movement and focus
/// changes are handled here and surface as [`UserEvent::Redraw`].
pub fn interpret_event(
    state: &mut UiState,
    console: &Console,
    event: Event,
) -> Option<UserEvent> {
    let key = match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => key,
        Event::Resize(_, _) => return Some(UserEvent::Redraw),
        _ => return None,
    };
    if is_ctrl_c(&key) {
        return Some(UserEvent::Quit);
    }
    state.clamp(console);
    if state.mode == Mode::QuitModal {
        return match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                Some(UserEvent::Redraw)
            }
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            return Some(UserEvent::Redraw);
        }
        KeyCode::Char('x') => return Some(UserEvent::DismissError),
        KeyCode::Char('r') => return Some(UserEvent::Refresh),
        KeyCode::Tab | KeyCode::BackTab => {
            state.focus = match state.focus {
                Focus::Devices => Focus::Places,
                Focus::Places => Focus::Devices,
            };
            return Some(UserEvent::Redraw);
        }
        _ => {}
    }
    match state.focus {
        Focus::Devices => match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                state.device_idx = state.device_idx.saturating_sub(1);
                Some(UserEvent::Redraw)
            }
            KeyCode::Down | KeyCode::Char('j') => {
                let max = console.devices().len().saturating_sub(1);
                state.device_idx = (state.device_idx + 1).min(max);
                Some(UserEvent::Redraw)
            }
            KeyCode::Enter => {
                let device = console.devices().get(state.device_idx)?;
                state.focus = Focus::Places;
                state.place_idx = 0;
                Some(UserEvent::SelectDevice(device.id.clone()))
            }
            _ => None,
        },
        Focus::Places => {
            let place = state.focused_place(console);
            match key.code {
                KeyCode::Up | KeyCode::Char('k') => {
                    state.place_idx = state.place_idx.saturating_sub(1);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Down | KeyCode::Char('j') => {
                    let max = console.places().len().saturating_sub(1);
                    state.place_idx = (state.place_idx + 1).min(max);
                    Some(UserEvent::Redraw)
                }
                KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                    Some(UserEvent::AmountChar(place?, c))
                }
                KeyCode::Backspace => Some(UserEvent::AmountBackspace(place?)),
                KeyCode::Char('d') | KeyCode::Char('+') => Some(UserEvent::Deposit(place?)),
                KeyCode::Char('w') | KeyCode::Char('-') => Some(UserEvent::Withdraw(place?)),
                _ => None,
            }
        }
    }
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

fn ui(f: &mut Frame, state: &UiState, console: &Console) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(f.area());
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[0]);

    draw_devices(f, state, main[0], console);
    draw_device_panel(f, state, main[1], console);
    draw_status(f, chunks[1], console);
    draw_help(f, chunks[2]);
    if state.mode == Mode::QuitModal {
        draw_quit_modal(f);
    }
}

fn focus_border(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    }
}

fn draw_devices(f: &mut Frame, state: &UiState, area: Rect, console: &Console) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_border(state.focus == Focus::Devices))
        .title("Devices");
    if console.devices().is_empty() {
        let text = if console.loading_devices() {
            Line::styled("Loading devices...", Style::default().fg(Color::DarkGray))
        } else {
            Line::styled("No devices", Style::default().fg(Color::DarkGray))
        };
        f.render_widget(Paragraph::new(text).block(block), area);
        return;
    }
    let name_width = usize::from(area.width.saturating_sub(6));
    let selected = console.selected_device_id();
    let items: Vec<ListItem> = console
        .devices()
        .iter()
        .map(|device| {
            let label = if device.name.is_empty() {
                device.id.as_str()
            } else {
                device.name.as_str()
            };
            let label = truncate_to_width(label, name_width);
            if selected == Some(&device.id) {
                ListItem::new(format!("● {label}")).style(
                    Style::default()
                        .fg(Color::Cyan)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ListItem::new(format!("  {label}"))
            }
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut list_state = ListState::default().with_selected(Some(state.device_idx));
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_device_panel(f: &mut Frame, state: &UiState, area: Rect, console: &Console) {
    let focused = state.focus == Focus::Places;
    let Some(selection) = console.selection() else {
        let hint = Paragraph::new(Line::styled(
            "Select a device",
            Style::default().fg(Color::DarkGray),
        ))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(focus_border(focused))
                .title("Places"),
        );
        f.render_widget(hint, area);
        return;
    };
    let title = if selection.name.is_empty() {
        selection.device_id.to_string()
    } else {
        selection.name.clone()
    };

    let banner_height = if console.error().is_some() { 3 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(banner_height), Constraint::Min(3)])
        .split(area);

    if let Some(message) = console.error() {
        let banner = Paragraph::new(message.to_string())
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title("Error (x to dismiss)"),
            );
        f.render_widget(banner, chunks[0]);
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(focus_border(focused))
        .title(title);
    match selection.detail {
        DetailState::Loading if console.places().is_empty() => {
            let p = Paragraph::new(Line::styled(
                "Loading...",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block);
            f.render_widget(p, chunks[1]);
        }
        DetailState::NotFound => {
            let p = Paragraph::new(Line::styled(
                "Device not found",
                Style::default().fg(Color::Red),
            ))
            .block(block);
            f.render_widget(p, chunks[1]);
        }
        _ if console.places().is_empty() => {
            let p = Paragraph::new(Line::styled(
                "This device has no places",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block);
            f.render_widget(p, chunks[1]);
        }
        _ => draw_places_table(f, state, chunks[1], console, block),
    }
}

fn draw_places_table(
    f: &mut Frame,
    state: &UiState,
    area: Rect,
    console: &Console,
    block: Block,
) {
    let header = Row::new(["Place", "Currency", "Balance", "Amount", "Actions"])
        .style(Style::default().add_modifier(Modifier::BOLD));
    let focused = state.focus == Focus::Places;
    let rows: Vec<Row> = console
        .places()
        .iter()
        .enumerate()
        .map(|(idx, place)| {
            let raw = console.amount(place.place);
            let amount = if raw.is_empty() {
                Span::styled("Amount", Style::default().fg(Color::DarkGray))
            } else if focused && idx == state.place_idx {
                Span::raw(format!("{raw}_"))
            } else {
                Span::raw(raw.to_string())
            };
            let actions = if console.is_updating(place.place) {
                Span::styled("Updating...", Style::default().fg(Color::Yellow))
            } else if console.can_submit(place.place) {
                Span::styled("[d] Deposit  [w] Withdraw", Style::default().fg(Color::Green))
            } else {
                Span::styled(
                    "[d] Deposit  [w] Withdraw",
                    Style::default().fg(Color::DarkGray),
                )
            };
            Row::new([
                Cell::from(place.place.to_string()),
                Cell::from(place.currency.clone()),
                Cell::from(format!("{:.2}", place.balances)),
                Cell::from(amount),
                Cell::from(actions),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(14),
        Constraint::Min(26),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut table_state =
        TableState::default().with_selected(focused.then_some(state.place_idx));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn draw_status(f: &mut Frame, area: Rect, console: &Console) {
    let status = if console.status().trim().is_empty() {
        "Ready"
    } else {
        console.status()
    };
    let widget = Paragraph::new(status.to_string())
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(Style::default().fg(Color::Green));
    f.render_widget(widget, area);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let help = Paragraph::new(
        "Tab focus | ↑/↓ move | Enter select | 0-9 . amount | d/+ deposit | w/- withdraw | x dismiss | r refresh | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, area);
}

fn draw_quit_modal(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    f.render_widget(Clear, area);
    let modal = Paragraph::new("Quit the console? (y/n)")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Quit"));
    f.render_widget(modal, area);
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Fits `s` into `max_width` columns, spending the last column on `…` when
/// it has to cut.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(s) <= max_width {
        return s.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let budget = max_width - 1;
    let mut width = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push('…');
    out
}
