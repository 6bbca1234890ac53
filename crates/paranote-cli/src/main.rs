use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use paranote_config::Config;
use paranote_engine::blocks::content::{BookmarkMeta, ChecklistItem, CodeSnippet, ImageSource, TableData};
use paranote_engine::{
    BlockKind, BlockRecord, Category, InlineSpan, PageId, PageStore, SqliteStore, TitleIndex,
    render_markup,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::{env, io::stdout, path::PathBuf, process};

enum SidebarItem {
    Category(Category),
    Page { id: PageId, title: String },
}

struct App {
    store: SqliteStore,
    items: Vec<SidebarItem>,
    list_state: ListState,
    title_index: TitleIndex,
    current_content: Vec<Line<'static>>,
}

impl App {
    fn new(store: SqliteStore) -> Result<Self> {
        let mut app = Self {
            store,
            items: Vec::new(),
            list_state: ListState::default(),
            title_index: TitleIndex::empty(),
            current_content: Vec::new(),
        };
        app.refresh()?;

        if !app.items.is_empty() {
            app.list_state.select(Some(0));
            app.update_content_for_selection();
        }
        Ok(app)
    }

    /// Rebuild the sidebar and the wiki-link title snapshot.
    fn refresh(&mut self) -> Result<()> {
        let pages = self.store.list_pages()?;
        self.title_index = TitleIndex::from_store(&self.store)?;

        let mut items = Vec::new();
        for category in Category::ALL {
            let in_category: Vec<_> = pages
                .iter()
                .filter(|page| page.category == category)
                .collect();
            if in_category.is_empty() {
                continue;
            }
            items.push(SidebarItem::Category(category));
            for page in in_category {
                items.push(SidebarItem::Page {
                    id: page.id,
                    title: page.title.clone(),
                });
            }
        }
        self.items = items;
        Ok(())
    }

    fn next_item(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.items.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn previous_item(&mut self) {
        if self.items.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
        self.update_content_for_selection();
    }

    fn update_content_for_selection(&mut self) {
        if let Some(index) = self.list_state.selected()
            && let Some(item) = self.items.get(index)
        {
            match item {
                SidebarItem::Category(category) => {
                    self.current_content = vec![
                        Line::from(format!("▸ {category}")),
                        Line::from(""),
                        Line::from("Select a page to view its blocks"),
                    ];
                }
                SidebarItem::Page { id, .. } => {
                    self.current_content = match self.load_page_content(*id) {
                        Ok(lines) => lines,
                        Err(e) => vec![Line::from(format!("Error loading page: {e}"))],
                    };
                }
            }
        }
    }

    fn load_page_content(&self, id: PageId) -> Result<Vec<Line<'static>>> {
        let page = self
            .store
            .get_page(id)?
            .ok_or_else(|| anyhow::anyhow!("page {id} disappeared"))?;
        let blocks = self.store.get_blocks(id)?;

        let mut lines = Vec::new();
        lines.push(Line::from(Span::styled(
            page.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));

        let mut meta_line = format!("[{}]", page.category);
        if let Some(deadline) = &page.deadline {
            meta_line.push_str(&format!(" due {deadline}"));
        }
        if !page.tags.is_empty() {
            meta_line.push_str(&format!(" #{}", page.tags.canonical()));
        }
        lines.push(Line::from(Span::styled(
            meta_line,
            Style::default().fg(Color::DarkGray),
        )));

        let mut previous_kind: Option<BlockKind> = None;
        for block in &blocks {
            // Consecutive same-kind list items render tight; everything
            // else gets a separating blank line.
            let tight = block.kind.is_list() && previous_kind == Some(block.kind);
            if !tight {
                lines.push(Line::from(""));
            }
            lines.extend(self.render_block(block));
            previous_kind = Some(block.kind);
        }

        Ok(lines)
    }

    fn render_block(&self, block: &BlockRecord) -> Vec<Line<'static>> {
        match block.kind {
            BlockKind::Heading => vec![Line::from(Span::styled(
                block.content.clone(),
                Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ))],
            BlockKind::Paragraph => vec![Line::from(self.markup_spans(&block.content))],
            BlockKind::Quote => {
                let mut spans = vec![Span::styled("▌ ", Style::default().fg(Color::DarkGray))];
                spans.extend(self.markup_spans(&block.content));
                vec![Line::from(spans)]
            }
            BlockKind::Bullet => {
                let mut spans = vec![Span::raw("• ")];
                spans.extend(self.markup_spans(&block.content));
                vec![Line::from(spans)]
            }
            BlockKind::Checkbox => {
                let item = ChecklistItem::decode(&block.content);
                let mut spans = vec![Span::raw(if item.checked { "[x] " } else { "[ ] " })];
                if item.checked {
                    spans.push(Span::styled(
                        item.text,
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT),
                    ));
                } else {
                    spans.extend(self.markup_spans(&item.text));
                }
                vec![Line::from(spans)]
            }
            BlockKind::Table => {
                let table = TableData::decode(&block.content);
                table
                    .rows()
                    .iter()
                    .enumerate()
                    .map(|(i, row)| {
                        let text = row.join(" │ ");
                        if i == 0 {
                            Line::from(Span::styled(
                                text,
                                Style::default().add_modifier(Modifier::BOLD),
                            ))
                        } else {
                            Line::from(text)
                        }
                    })
                    .collect()
            }
            BlockKind::Code => {
                let snippet = CodeSnippet::decode(&block.content);
                let mut lines = vec![Line::from(Span::styled(
                    format!("```{}", snippet.language),
                    Style::default().fg(Color::DarkGray),
                ))];
                lines.extend(snippet.code.lines().map(|code_line| {
                    Line::from(Span::styled(
                        code_line.to_string(),
                        Style::default().fg(Color::Yellow),
                    ))
                }));
                lines.push(Line::from(Span::styled(
                    "```",
                    Style::default().fg(Color::DarkGray),
                )));
                lines
            }
            BlockKind::Image => {
                let image = ImageSource::decode(&block.content);
                if image.url.is_empty() {
                    vec![Line::from(Span::styled(
                        "[image: empty]",
                        Style::default().fg(Color::DarkGray),
                    ))]
                } else {
                    vec![Line::from(format!("[image: {}]", image.url))]
                }
            }
            BlockKind::LinkPreview => match BookmarkMeta::decode(&block.content) {
                Some(meta) => vec![Line::from(vec![
                    Span::raw("🔗 "),
                    Span::styled(meta.title, Style::default().add_modifier(Modifier::BOLD)),
                    Span::styled(
                        format!(" ({})", meta.url),
                        Style::default().fg(Color::Blue),
                    ),
                ])],
                None => vec![Line::from(Span::styled(
                    "[bookmark: awaiting url]",
                    Style::default().fg(Color::DarkGray),
                ))],
            },
            BlockKind::Divider => vec![Line::from(Span::styled(
                "─".repeat(40),
                Style::default().fg(Color::DarkGray),
            ))],
        }
    }

    fn markup_spans(&self, text: &str) -> Vec<Span<'static>> {
        render_markup(text, &self.title_index)
            .into_iter()
            .map(|span| match span {
                InlineSpan::Plain(t) => Span::raw(t),
                InlineSpan::Bold(t) => {
                    Span::styled(t, Style::default().add_modifier(Modifier::BOLD))
                }
                InlineSpan::Italic(t) => {
                    Span::styled(t, Style::default().add_modifier(Modifier::ITALIC))
                }
                InlineSpan::Strikethrough(t) => {
                    Span::styled(t, Style::default().add_modifier(Modifier::CROSSED_OUT))
                }
                InlineSpan::Underline(t) => {
                    Span::styled(t, Style::default().add_modifier(Modifier::UNDERLINED))
                }
                InlineSpan::Code(t) => Span::styled(t, Style::default().fg(Color::Yellow)),
                InlineSpan::Hyperlink { text, .. } => Span::styled(
                    text,
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                ),
                InlineSpan::WikiLink { title, target } => match target {
                    Some(_) => Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ),
                    // Dead lead: creation happens only on explicit action,
                    // never while rendering.
                    None => Span::styled(
                        title,
                        Style::default()
                            .fg(Color::Red)
                            .add_modifier(Modifier::UNDERLINED),
                    ),
                },
            })
            .collect()
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Determine the database path from CLI args or config file
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let data_path;
    if args.len() == 2 {
        // CLI argument provided - use it
        data_path = PathBuf::from(&args[1]);
    } else if args.len() == 1 {
        // No CLI argument - try config file
        match Config::load() {
            Ok(Some(config)) => {
                data_path = config.data_path;
            }
            Ok(None) => {
                eprintln!("Error: No database path provided and no config file found");
                eprintln!("Usage: {} <database-path>", args[0]);
                eprintln!("Or create a config file at {}", config_path.display());
                process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: Failed to load config file: {e}");
                eprintln!("Usage: {} <database-path>", args[0]);
                process::exit(1);
            }
        }
    } else {
        eprintln!("Usage: {} [database-path]", args[0]);
        process::exit(1);
    };

    let store = match SqliteStore::open(&data_path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: Failed to open database '{}': {e}", data_path.display());
            process::exit(1);
        }
    };
    tracing::info!(path = %data_path.display(), "opened page store");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app
    let mut app = App::new(store)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next_item(),
                KeyCode::Up | KeyCode::Char('k') => app.previous_item(),
                KeyCode::Char('r') => {
                    app.refresh()?;
                    app.update_content_for_selection();
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)].as_ref())
        .split(f.area());

    // Sidebar: pages grouped by PARA category
    let sidebar_items: Vec<ListItem> = app
        .items
        .iter()
        .map(|item| match item {
            SidebarItem::Category(category) => ListItem::new(Line::from(Span::styled(
                category.as_str().to_uppercase(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            ))),
            SidebarItem::Page { title, .. } => {
                ListItem::new(Line::from(format!("  📄 {title}")))
            }
        })
        .collect();

    let sidebar = List::new(sidebar_items)
        .block(Block::default().borders(Borders::ALL).title("Pages"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));

    f.render_stateful_widget(sidebar, chunks[0], &mut app.list_state);

    // Content panel
    let content_text = if app.current_content.is_empty() {
        vec![Line::from("Select a page to view its content")]
    } else {
        app.current_content.clone()
    };

    let content = Paragraph::new(content_text)
        .block(Block::default().borders(Borders::ALL).title("Content"))
        .wrap(ratatui::widgets::Wrap { trim: true });

    f.render_widget(content, chunks[1]);

    // Instructions
    let help_text = Line::from(vec![
        Span::raw("q: Quit | "),
        Span::raw("↑/k: Previous | "),
        Span::raw("↓/j: Next | "),
        Span::raw("r: Refresh"),
    ]);

    let help = Paragraph::new(vec![help_text]).block(Block::default());

    // Place help at bottom
    let bottom_chunk = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    f.render_widget(help, bottom_chunk[1]);
}
