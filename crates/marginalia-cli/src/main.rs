use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use marginalia_config::Config;
use marginalia_engine::{
    BackgroundService, CaretSurface, ColorToken, CommitOutcome, ContentKind, Document, Editor,
    FocusTarget, HoverTarget, InsertionPointId, InsertionPointView, MessageLog, ParagraphId,
    Sender, SentenceGeneratorProducer, SentenceId, SentenceView, Settings, Slot, Snapshot,
    dispatch_effects,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{
    env,
    fs::OpenOptions,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    Document,
    Messages,
}

/// Records the caret requests the engine makes between two frames
#[derive(Debug, Default)]
struct TerminalSurface {
    focus: Option<FocusTarget>,
}

impl CaretSurface for TerminalSurface {
    fn focus(&mut self, target: &FocusTarget) {
        self.focus = Some(target.clone());
    }

    fn place_caret_at_end(&mut self, target: &FocusTarget) {
        // The edit buffer always holds the caret at its end
        self.focus = Some(target.clone());
    }
}

struct App {
    editor: Editor<BackgroundService>,
    surface: TerminalSurface,
    messages: MessageLog,
    message_list_state: ListState,
    message_input: String,
    pane: Pane,
    caret: Option<InsertionPointId>,
    edit_buffer: Option<String>,
    status: String,
    started: Instant,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let service = BackgroundService::spawn(SentenceGeneratorProducer::new())?;
        let mut editor =
            Editor::with_service(Document::sample(), service, settings_from_config(config));
        editor.set_title(config.title.clone());

        let caret = editor
            .snapshot()
            .insertion_points()
            .last()
            .map(|point| point.id.clone());

        Ok(Self {
            editor,
            surface: TerminalSurface::default(),
            messages: MessageLog::new(),
            message_list_state: ListState::default(),
            message_input: String::new(),
            pane: Pane::Document,
            caret,
            edit_buffer: None,
            status: String::new(),
            started: Instant::now(),
        })
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    fn tick(&mut self) {
        let appeared = self.editor.tick(self.now());
        if appeared > 0 {
            log::info!("{appeared} remark(s) appeared");
        }
        self.flush_effects();
    }

    /// Hand queued engine effects to the surface and the message log, then
    /// follow any caret request
    fn flush_effects(&mut self) {
        let effects = self.editor.drain_effects();
        if effects.is_empty() {
            return;
        }
        dispatch_effects(effects, &mut self.surface, &mut self.messages);

        match self.surface.focus.take() {
            Some(FocusTarget::InsertionPoint(id)) => self.caret = Some(id),
            Some(FocusTarget::Sentence(sentence_id)) => {
                self.edit_buffer = self
                    .editor
                    .document()
                    .sentence(&sentence_id)
                    .map(|s| s.text.clone());
            }
            None => {}
        }

        if let Some(position) = self
            .messages
            .scroll_request()
            .and_then(|id| self.messages.position(id))
        {
            self.message_list_state.select(Some(position));
        }
    }

    /// Returns false when the user asked to quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        match key.code {
            KeyCode::Char('q') | KeyCode::Char('c') if ctrl => return false,
            KeyCode::Tab => {
                self.pane = match self.pane {
                    Pane::Document => Pane::Messages,
                    Pane::Messages => Pane::Document,
                };
            }
            _ => match self.pane {
                Pane::Document => self.handle_document_key(key.code, ctrl, alt),
                Pane::Messages => self.handle_message_key(key.code, ctrl),
            },
        }

        self.flush_effects();
        true
    }

    fn handle_document_key(&mut self, code: KeyCode, ctrl: bool, alt: bool) {
        if let Some(sentence_id) = self.editor.editing_sentence().cloned()
            && self.edit_buffer.is_some()
        {
            self.handle_sentence_edit_key(&sentence_id, code);
            return;
        }

        match code {
            KeyCode::Char('e') if ctrl => self.edit_sentence_at_caret(),
            KeyCode::Char('r') if ctrl => {
                if let Some(sentence_id) = self.sentence_at_caret() {
                    match self.editor.remark_marker_click(&sentence_id) {
                        Some(remark_id) => self.status = format!("Remark {remark_id}"),
                        None => self.status = "No open remarks".to_string(),
                    }
                }
            }
            KeyCode::Char('h') if ctrl => self.toggle_remark_hover(),
            KeyCode::Up if alt => self.drag_sentence_at_caret(false),
            KeyCode::Down if alt => self.drag_sentence_at_caret(true),
            KeyCode::Left => self.move_caret(-1),
            KeyCode::Right => self.move_caret(1),
            KeyCode::Esc => {
                self.editor.click_empty_space();
                self.status.clear();
            }
            KeyCode::Enter => self.commit_at_caret(),
            KeyCode::Backspace => {
                if let Some(id) = self.caret.clone() {
                    let mut content = self.caret_content();
                    content.pop();
                    self.editor.input(id, content);
                }
            }
            KeyCode::Char(c) if !ctrl && !alt => {
                if let Some(id) = self.caret.clone() {
                    let mut content = self.caret_content();
                    content.push(c);
                    self.editor.input(id, content);
                }
            }
            _ => {}
        }
    }

    fn handle_sentence_edit_key(&mut self, sentence_id: &SentenceId, code: KeyCode) {
        let Some(buffer) = self.edit_buffer.as_mut() else {
            return;
        };
        match code {
            KeyCode::Enter => {
                let text = buffer.clone();
                if self
                    .editor
                    .submit_sentence_edit(sentence_id, &text, self.now())
                {
                    self.edit_buffer = None;
                    self.status = format!("Updated {sentence_id}");
                }
            }
            KeyCode::Esc => {
                self.editor.cancel_sentence_edit();
                self.edit_buffer = None;
                self.status.clear();
            }
            KeyCode::Backspace => {
                buffer.pop();
                let text = buffer.clone();
                self.editor.sentence_input(sentence_id, text);
            }
            KeyCode::Char(c) => {
                buffer.push(c);
                let text = buffer.clone();
                self.editor.sentence_input(sentence_id, text);
            }
            _ => {}
        }
    }

    fn handle_message_key(&mut self, code: KeyCode, ctrl: bool) {
        match code {
            KeyCode::Up => self.select_message(-1),
            KeyCode::Down => self.select_message(1),
            KeyCode::Esc => {
                self.editor.click_empty_space();
                self.message_list_state.select(None);
            }
            KeyCode::Enter => {
                let text = std::mem::take(&mut self.message_input);
                match self.editor.new_message(&text, self.now()) {
                    Some(sentence_id) => self.status = format!("Added {sentence_id}"),
                    None => self.message_input = text,
                }
            }
            KeyCode::Backspace => {
                self.message_input.pop();
            }
            KeyCode::Char(c) if !ctrl => self.message_input.push(c),
            _ => {}
        }
    }

    fn move_caret(&mut self, delta: isize) {
        let snapshot = self.editor.snapshot();
        let points = snapshot.insertion_points();
        if points.is_empty() {
            return;
        }
        let current = self
            .caret
            .as_ref()
            .and_then(|caret| points.iter().position(|p| &p.id == caret))
            .unwrap_or(0);
        let next = current
            .saturating_add_signed(delta)
            .min(points.len() - 1);
        self.editor.focus_insertion_point(points[next].id.clone());
    }

    fn caret_content(&self) -> String {
        self.caret
            .as_ref()
            .map(|id| self.editor.insertion_points().content(id).to_string())
            .unwrap_or_default()
    }

    fn commit_at_caret(&mut self) {
        let Some(id) = self.caret.clone() else {
            return;
        };
        let content = self.caret_content();
        self.status = match self.editor.commit(&id, &content, self.now()) {
            CommitOutcome::Committed(commit) => format!("Added {}", commit.sentence_id),
            CommitOutcome::Ignored => "Nothing to commit".to_string(),
            CommitOutcome::Coalesced => "Already committed".to_string(),
            CommitOutcome::Rejected => {
                log::warn!("commit at {id} rejected: paragraph is gone");
                "That paragraph no longer exists".to_string()
            }
        };
    }

    fn sentence_at_caret(&self) -> Option<SentenceId> {
        let caret = self.caret.as_ref()?;
        sentence_before(self.editor.document(), caret)
    }

    fn edit_sentence_at_caret(&mut self) {
        let Some(sentence_id) = self.sentence_at_caret() else {
            return;
        };
        self.editor.click_sentence(&sentence_id, self.now());
        self.edit_buffer = self
            .editor
            .document()
            .sentence(&sentence_id)
            .map(|s| s.text.clone());
        self.status = format!("Editing {sentence_id} (Enter saves, Esc cancels)");
    }

    fn toggle_remark_hover(&mut self) {
        if self.editor.emphasis().hovered_remark_id.is_some() {
            self.editor.remark_marker_leave();
            return;
        }
        if let Some(sentence_id) = self.sentence_at_caret()
            && self.editor.remark_marker_hover(&sentence_id).is_none()
        {
            self.status = "No open remarks".to_string();
        }
    }

    fn drag_sentence_at_caret(&mut self, down: bool) {
        let Some(sentence_id) = self.sentence_at_caret() else {
            return;
        };
        let Some(target) = drag_target(self.editor.document(), &sentence_id, down) else {
            return;
        };
        if !self.editor.begin_drag(&sentence_id) {
            return;
        }
        self.editor.drag_hover(&target);
        if self.editor.drop_drag().is_none() {
            return;
        }

        // Keep the caret on the moved sentence
        if let Some(location) = self.editor.document().locate_sentence(&sentence_id) {
            let paragraph = &self.editor.document().paragraphs()[location.paragraph_index];
            let id = InsertionPointId::after_sentence(&paragraph.id, location.sentence_index);
            self.editor.focus_insertion_point(id);
        }
    }

    fn select_message(&mut self, delta: isize) {
        let messages = self.messages.messages();
        if messages.is_empty() {
            return;
        }
        let next = match self.message_list_state.selected() {
            Some(i) => i.saturating_add_signed(delta).min(messages.len() - 1),
            None => 0,
        };
        self.message_list_state.select(Some(next));

        let message = &messages[next];
        self.editor.message_click(&message.id, message.kind);
    }
}

/// Engine settings from the on-disk configuration
fn settings_from_config(config: &Config) -> Settings {
    Settings {
        remark_delays: config
            .remarks
            .delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect(),
        remark_colors: config
            .remarks
            .colors
            .iter()
            .map(|c| ColorToken::from(c.as_str()))
            .collect(),
        commit_debounce: Duration::from_millis(config.input.commit_debounce_ms),
        double_click: Duration::from_millis(config.input.double_click_ms),
    }
}

/// The sentence the caret sits behind; the paragraph's first sentence for
/// start and separator slots
fn sentence_before(doc: &Document, caret: &InsertionPointId) -> Option<SentenceId> {
    let paragraph = doc.paragraph(&caret.paragraph_id)?;
    let index = match caret.slot {
        Slot::AfterSentence(index) => index,
        Slot::SeparatorAfter => paragraph.sentences.len().checked_sub(1)?,
        Slot::Start | Slot::SeparatorBefore => 0,
    };
    paragraph.sentences.get(index).map(|s| s.id.clone())
}

/// Hover position one slot up or down from the sentence, placed in the half
/// of the neighbour that the drag midpoint rule accepts
fn drag_target(doc: &Document, sentence_id: &SentenceId, down: bool) -> Option<HoverTarget> {
    let location = doc.locate_sentence(sentence_id)?;
    let paragraphs = doc.paragraphs();
    let paragraph = &paragraphs[location.paragraph_index];

    let (paragraph_id, index): (ParagraphId, usize) = if down {
        if location.sentence_index + 1 < paragraph.sentences.len() {
            (paragraph.id.clone(), location.sentence_index + 1)
        } else {
            (paragraphs.get(location.paragraph_index + 1)?.id.clone(), 0)
        }
    } else if location.sentence_index > 0 {
        (paragraph.id.clone(), location.sentence_index - 1)
    } else {
        let previous = paragraphs.get(location.paragraph_index.checked_sub(1)?)?;
        (previous.id.clone(), previous.sentences.len())
    };

    let pointer_y = if index >= location.sentence_index {
        0.75
    } else {
        0.25
    };
    Some(HoverTarget {
        paragraph_id,
        index,
        pointer_y,
        rect_top: 0.0,
        rect_bottom: 1.0,
    })
}

fn init_logging(log_path: &Path) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_path)?;

    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    // Optional config path argument, else the default location
    let args: Vec<String> = env::args().collect();
    let config_arg = match args.len() {
        1 => None,
        2 => Some(PathBuf::from(&args[1])),
        _ => {
            eprintln!("Usage: {} [config-file-path]", args[0]);
            process::exit(1);
        }
    };

    let config = match Config::load_or_default(config_arg.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            eprintln!("Usage: {} [config-file-path]", args[0]);
            process::exit(1);
        }
    };

    let log_path = config.log_file_path();
    if let Err(e) = init_logging(&log_path) {
        eprintln!("Error: Cannot open log file '{}': {e}", log_path.display());
        process::exit(1);
    }
    log::info!("marginalia starting up, logging to {}", log_path.display());

    let mut app = App::new(&config)?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("event loop failed: {err:?}");
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && !app.handle_key(key)
        {
            return Ok(());
        }

        app.tick();
    }
}

fn remark_color(token: &ColorToken) -> Color {
    match token.0.as_str() {
        "amber" => Color::Yellow,
        "teal" => Color::Cyan,
        "rose" => Color::LightRed,
        "violet" => Color::Magenta,
        _ => Color::Gray,
    }
}

fn point_spans(point: &InsertionPointView) -> Vec<Span<'static>> {
    if point.is_focused {
        vec![
            Span::styled(point.content.clone(), Style::default().fg(Color::Cyan)),
            Span::styled(
                "▏",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::SLOW_BLINK),
            ),
        ]
    } else if !point.content.is_empty() {
        vec![Span::styled(
            format!("[{}]", point.content),
            Style::default().fg(Color::DarkGray),
        )]
    } else {
        Vec::new()
    }
}

fn sentence_spans(sentence: &SentenceView) -> Vec<Span<'static>> {
    let mut style = Style::default();
    if sentence.is_emphasized {
        style = style.bg(Color::Blue).fg(Color::White);
    }
    if sentence.is_editing {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if sentence.is_hovered_remark_owner {
        style = style.add_modifier(Modifier::REVERSED);
    }

    let mut spans = vec![Span::styled(sentence.text.clone(), style)];
    if sentence.show_remark_marker {
        let color = sentence
            .remark_color
            .as_ref()
            .map(remark_color)
            .unwrap_or(Color::Gray);
        spans.push(Span::styled(
            format!(" ●{}", sentence.open_remark_count),
            Style::default().fg(color),
        ));
    }
    spans
}

fn document_lines(snapshot: &Snapshot) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for paragraph in &snapshot.paragraphs {
        let before = point_spans(&paragraph.separator_before);
        if !before.is_empty() {
            lines.push(Line::from(before));
        }

        let mut spans = point_spans(&paragraph.start);
        for slot in &paragraph.sentences {
            spans.extend(sentence_spans(&slot.sentence));
            spans.extend(point_spans(&slot.after));
            spans.push(Span::raw(" "));
        }
        lines.push(Line::from(spans));

        let after = point_spans(&paragraph.separator_after);
        if !after.is_empty() {
            lines.push(Line::from(after));
        }
        lines.push(Line::default());
    }

    if lines.is_empty() {
        lines.push(Line::from("Empty document. Tab to the message pane to start writing."));
    }
    lines
}

fn ui(f: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)].as_ref())
        .split(outer[0]);

    let current = app.pane;
    let active = |pane: Pane| {
        if current == pane {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        }
    };

    // Document panel
    let snapshot = app.editor.snapshot();
    let document = Paragraph::new(document_lines(&snapshot))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(active(Pane::Document))
                .title(format!("{} (v{})", snapshot.title, snapshot.version)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(document, chunks[0]);

    // Message panel
    let message_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(chunks[1]);

    let emphasized = app.editor.emphasis().emphasized_message_id.clone();
    let items: Vec<ListItem> = app
        .messages
        .messages()
        .iter()
        .map(|message| {
            let (prefix, color) = match (message.sender, message.kind) {
                (Sender::User, _) => ("you: ", Color::White),
                (Sender::Ai, ContentKind::Remark) => ("  ↳ ", Color::Green),
                (Sender::Ai, ContentKind::Sentence) => ("ai: ", Color::Green),
            };
            let mut style = Style::default().fg(color);
            if emphasized.as_deref() == Some(message.id.as_str()) {
                style = style.add_modifier(Modifier::BOLD);
            }
            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(message.text.clone(), style),
            ]))
        })
        .collect();

    let message_list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(active(Pane::Messages))
                .title("Messages"),
        )
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(message_list, message_chunks[0], &mut app.message_list_state);

    let input = Paragraph::new(app.message_input.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(active(Pane::Messages))
            .title("New message"),
    );
    f.render_widget(input, message_chunks[1]);

    // Instructions
    let help_text = match app.pane {
        Pane::Document => Line::from(vec![
            Span::raw("^Q: Quit | Tab: Messages | ←/→: Caret | Enter: Commit | "),
            Span::raw("^E: Edit | ^R: Next remark | ^H: Hover | Alt-↑/↓: Move | Esc: Clear"),
        ]),
        Pane::Messages => Line::from(vec![
            Span::raw("^Q: Quit | Tab: Document | ↑/↓: Select | Enter: Send | Esc: Clear"),
        ]),
    };
    let help = Paragraph::new(vec![help_text, Line::from(app.status.clone())]);
    f.render_widget(help, outer[1]);
}
