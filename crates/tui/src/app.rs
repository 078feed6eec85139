use std::{io, ops::Range, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Circle},
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Tabs,
        Wrap,
    },
    Frame, Terminal,
};
use steamscape_core::{
    backlog::{
        analyze_library, cold_library, format_hours_from_minutes, is_cold, BacklogAnalysis,
        BacklogTotals, ColdSort, PlaytimeBucket,
    },
    config::AppConfig,
    graph::{place_nodes, GraphResponse, GraphSynthesizer, HslColor, NodePlacement},
    models::{
        persona_state_label, visibility_label, GraphNode, OwnedGameRecord, UserLibrary,
    },
    steam::SteamClient,
    store::LibraryStore,
    sync::{LibrarySync, SyncEvent},
};
use tokio::{spawn, sync::mpsc};
use tracing::{error, info, warn};

const TICK_RATE: Duration = Duration::from_millis(250);
const ABANDONED_SHOWN: usize = 10;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    accent_alt: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            accent_alt: Color::Blue,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

impl Theme {
    fn bucket_color(&self, bucket: PlaytimeBucket) -> Color {
        match bucket {
            PlaytimeBucket::Never => self.muted,
            PlaytimeBucket::Sampled => self.warning,
            PlaytimeBucket::Mid => self.accent_alt,
            PlaytimeBucket::Committed => self.success,
        }
    }

    fn node_color(&self, node: &GraphNode) -> Color {
        HslColor::parse(&node.color)
            .map(|hsl| {
                let (r, g, b) = hsl.to_rgb();
                Color::Rgb(r, g, b)
            })
            .unwrap_or(self.accent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Universe,
    Backlog,
    Cold,
    Friends,
}

impl Screen {
    const ALL: [Screen; 4] = [
        Screen::Universe,
        Screen::Backlog,
        Screen::Cold,
        Screen::Friends,
    ];

    fn title(self) -> &'static str {
        match self {
            Screen::Universe => "1 Universe",
            Screen::Backlog => "2 Backlog",
            Screen::Cold => "3 Cold library",
            Screen::Friends => "4 Friends",
        }
    }

    fn index(self) -> usize {
        Screen::ALL
            .iter()
            .position(|screen| *screen == self)
            .unwrap_or(0)
    }

    fn cycle(self, delta: isize) -> Self {
        let len = Screen::ALL.len() as isize;
        let next = (self.index() as isize + delta).rem_euclid(len);
        Screen::ALL[next as usize]
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Cached friend shown on the friends screen.
#[derive(Debug, Clone)]
struct FriendRow {
    steam_id: String,
    name: String,
    persona_state: Option<u8>,
    visibility: Option<u8>,
    games: usize,
    friend_since: Option<i64>,
}

/// Terminal frontend over a cached Steam library.
pub struct SteamscapeApp {
    config: AppConfig,
    store: LibraryStore,
    synthesizer: GraphSynthesizer,
    owner_id: String,
    steam_id: String,
    library: UserLibrary,
    placements: Vec<NodePlacement>,
    analysis: BacklogAnalysis,
    cold_rows: Vec<OwnedGameRecord>,
    cold_only: bool,
    cold_sort: ColdSort,
    friends: Vec<FriendRow>,
    screen: Screen,
    state: UiState,
    sync_tx: Option<mpsc::Sender<SyncEvent>>,
    sync_rx: Option<mpsc::Receiver<SyncEvent>>,
    syncing: bool,
    demo: bool,
    theme: Theme,
}

impl SteamscapeApp {
    pub fn new(config: AppConfig, store: LibraryStore, steam_id: String, demo: bool) -> Self {
        let synthesizer = GraphSynthesizer::new(config.icon_base_url.clone());
        Self {
            config,
            store,
            synthesizer,
            owner_id: steam_id.clone(),
            library: UserLibrary::new(steam_id.clone()),
            steam_id,
            placements: Vec::new(),
            analysis: BacklogAnalysis::default(),
            cold_rows: Vec::new(),
            cold_only: true,
            cold_sort: ColdSort::default(),
            friends: Vec::new(),
            screen: Screen::Universe,
            state: UiState::default(),
            sync_tx: None,
            sync_rx: None,
            syncing: false,
            demo,
            theme: Theme::default(),
        }
    }

    pub fn attach_sync(
        &mut self,
        sender: mpsc::Sender<SyncEvent>,
        receiver: mpsc::Receiver<SyncEvent>,
    ) {
        self.sync_tx = Some(sender);
        self.sync_rx = Some(receiver);
    }

    pub async fn run(&mut self) -> Result<()> {
        self.reload_library()?;
        let status = if self.demo {
            format!(
                "Demo library: {} games. Set steam_api_key and steam_id to use your own.",
                self.library.games.len()
            )
        } else {
            format!("Loaded {} cached games", self.library.games.len())
        };
        self.state.set_status(status);

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        let mut sync_rx = self.sync_rx.take();

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            match sync_rx.as_mut() {
                Some(rx) => {
                    let mut sync_closed = false;
                    tokio::select! {
                        maybe_event = event_rx.recv() => {
                            if !self.process_app_event(maybe_event) {
                                break;
                            }
                        }
                        maybe_sync = rx.recv() => {
                            match maybe_sync {
                                Some(event) => self.handle_sync_event(event),
                                None => sync_closed = true,
                            }
                        }
                    }
                    if sync_closed {
                        sync_rx = None;
                    }
                }
                None => {
                    let maybe_event = event_rx.recv().await;
                    if !self.process_app_event(maybe_event) {
                        break;
                    }
                }
            }

            if self.state.should_quit {
                break;
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    /// Kick off a background sync of the user currently shown.
    pub fn start_sync(&mut self) {
        if self.demo {
            self.state.set_status(
                "Demo mode: configure a Steam API key and steam_id to sync".to_string(),
            );
            return;
        }
        if self.syncing {
            self.state.set_status("Sync already running".to_string());
            return;
        }
        let Some(sender) = self.sync_tx.clone() else {
            warn!("sync requested without an attached channel");
            return;
        };

        let client = match SteamClient::from_config(&self.config) {
            Ok(client) => client,
            Err(err) => {
                error!(?err, "Failed to create Steam client");
                self.state.set_status(format!("Sync unavailable: {err}"));
                return;
            }
        };
        let sync = LibrarySync::new(self.config.clone(), client, self.store.clone());
        let steam_id = self.steam_id.clone();
        info!(steam_id = %steam_id, "Starting background sync");
        spawn(async move {
            if let Err(err) = sync.run(steam_id, sender).await {
                error!("Library sync task error: {err}");
            }
        });
        self.syncing = true;
        self.state
            .set_status(format!("Syncing {} from Steam...", self.library.owner_name()));
    }

    fn reload_library(&mut self) -> Result<()> {
        self.library = self.store.library(&self.steam_id)?;
        let nodes = self.synthesizer.build(&self.library.games, &self.library.rarity);
        self.placements = place_nodes(&nodes);
        self.analysis = analyze_library(&self.library.games);
        self.refresh_cold_rows();
        self.friends = self.friend_rows()?;
        self.state.set_nodes(nodes);
        self.state.apply_filter();
        self.state.friends.clamp(self.friends.len());
        info!(
            steam_id = %self.steam_id,
            games = self.library.games.len(),
            friends = self.friends.len(),
            "Library reloaded"
        );
        Ok(())
    }

    fn refresh_cold_rows(&mut self) {
        self.cold_rows = cold_library(&self.library.games, self.cold_only, self.cold_sort);
        self.state.cold.clamp(self.cold_rows.len());
    }

    fn friend_rows(&self) -> Result<Vec<FriendRow>> {
        let mut rows = Vec::with_capacity(self.library.friends.len());
        for entry in &self.library.friends {
            let friend = self.store.library(&entry.steam_id)?;
            let profile = friend.profile.as_ref();
            rows.push(FriendRow {
                steam_id: entry.steam_id.clone(),
                name: friend.owner_name(),
                persona_state: profile.and_then(|p| p.persona_state),
                visibility: profile.and_then(|p| p.visibility),
                games: friend.games.len(),
                friend_since: entry.friend_since,
            });
        }
        rows.sort_by_key(|row| row.name.to_lowercase());
        Ok(rows)
    }

    fn switch_user(&mut self, steam_id: String) -> Result<()> {
        if steam_id == self.steam_id {
            return Ok(());
        }
        self.steam_id = steam_id;
        self.state.filter.clear();
        self.state.universe = ListCursor::default();
        self.state.cold = ListCursor::default();
        self.state.friends = ListCursor::default();
        self.reload_library()?;
        self.screen = Screen::Universe;
        let mut status = format!("Viewing {}", self.library.owner_name());
        if self.library.games.is_empty() {
            status.push_str(" (no cached games; press s to sync)");
        }
        if !self.is_owner() {
            status.push_str(" · Esc returns to your library");
        }
        self.state.set_status(status);
        Ok(())
    }

    fn is_owner(&self) -> bool {
        self.steam_id == self.owner_id
    }

    fn export_graph(&mut self) -> Result<()> {
        let response = GraphResponse::from_records(
            &self.synthesizer,
            &self.library.games,
            &self.library.rarity,
        );
        let path = response.export(self.config.export_dir(), &self.steam_id)?;
        self.state.set_status(format!(
            "Exported {} nodes to {}",
            response.nodes.len(),
            path.display()
        ));
        Ok(())
    }

    fn handle_tick(&mut self) {
        if self.state.mode == Mode::Filter {
            self.state
                .set_status(format!("Filter: {}", self.state.filter));
        }
    }

    fn handle_sync_event(&mut self, event: SyncEvent) {
        self.syncing = false;
        match event {
            SyncEvent::Success {
                steam_id,
                games,
                friends,
                synced_at,
            } => {
                info!(steam_id = %steam_id, games, friends, "Sync succeeded");
                if steam_id != self.steam_id {
                    return;
                }
                if let Err(err) = self.reload_library() {
                    error!(?err, "Reload after sync failed");
                    self.state.set_status(format!("Reload failed: {err}"));
                } else {
                    self.state.set_status(format!(
                        "Synced {games} games and {friends} friends at {}",
                        format_local(synced_at)
                    ));
                }
            }
            SyncEvent::Error(err) => {
                error!(?err, "Background sync failed");
                self.state.set_status(format!("Sync failed: {err:#}"));
            }
        }
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            None => false,
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Key(key) => match self.state.mode {
                Mode::Filter => self.handle_filter_key(key),
                Mode::Browse => self.handle_browse_key(key),
            },
            Event::Resize(_, _) | Event::Mouse(_) => Ok(()),
            Event::FocusGained | Event::FocusLost | Event::Paste(_) => Ok(()),
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.filter.clear();
                self.state.apply_filter();
                self.state.set_status("Filter cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "Filter applied: {} ({} games)",
                    self.state.filter,
                    self.state.filtered.len()
                ));
            }
            KeyCode::Backspace => {
                self.state.filter.pop();
                self.state.apply_filter();
                self.state
                    .set_status(format!("Filter: {}", self.state.filter));
            }
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.state.filter.push(c);
                    self.state.apply_filter();
                    self.state
                        .set_status(format!("Filter: {}", self.state.filter));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        let len = self.list_len();
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.state.should_quit = true
            }
            KeyCode::Tab => self.screen = self.screen.cycle(1),
            KeyCode::BackTab => self.screen = self.screen.cycle(-1),
            KeyCode::Char(digit @ '1'..='4') => {
                let index = digit as usize - '1' as usize;
                self.screen = Screen::ALL[index];
            }
            KeyCode::Char('j') | KeyCode::Down => self.cursor_mut().move_by(1, len),
            KeyCode::Char('k') | KeyCode::Up => self.cursor_mut().move_by(-1, len),
            KeyCode::Char('g') | KeyCode::Home => self.cursor_mut().move_to(0, len),
            KeyCode::Char('G') | KeyCode::End => self.cursor_mut().move_to_end(len),
            KeyCode::PageDown => self.cursor_mut().page_down(len),
            KeyCode::PageUp => self.cursor_mut().page_up(len),
            KeyCode::Char('/') => {
                self.screen = Screen::Universe;
                self.state.mode = Mode::Filter;
                self.state.set_status("Enter filter text".to_string());
            }
            KeyCode::Char('s') => self.start_sync(),
            KeyCode::Char('e') => self.export_graph()?,
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reload_library()?;
                self.state
                    .set_status(format!("Reloaded {} games", self.library.games.len()));
            }
            KeyCode::Char('c') if self.screen == Screen::Cold => {
                self.cold_only = !self.cold_only;
                self.refresh_cold_rows();
                let message = if self.cold_only {
                    "Showing cold games only"
                } else {
                    "Showing the whole library"
                };
                self.state.set_status(message.to_string());
            }
            KeyCode::Char('o') if self.screen == Screen::Cold => {
                self.cold_sort = self.cold_sort.next();
                self.refresh_cold_rows();
                self.state
                    .set_status(format!("Sorted by {}", self.cold_sort.label()));
            }
            KeyCode::Enter if self.screen == Screen::Friends => {
                if let Some(friend) = self.friends.get(self.state.friends.cursor) {
                    let id = friend.steam_id.clone();
                    self.switch_user(id)?;
                }
            }
            KeyCode::Esc if !self.is_owner() => {
                let owner = self.owner_id.clone();
                self.switch_user(owner)?;
            }
            _ => {}
        }
        Ok(())
    }

    fn list_len(&self) -> usize {
        match self.screen {
            Screen::Universe => self.state.filtered.len(),
            Screen::Backlog => 0,
            Screen::Cold => self.cold_rows.len(),
            Screen::Friends => self.friends.len(),
        }
    }

    fn cursor_mut(&mut self) -> &mut ListCursor {
        match self.screen {
            Screen::Universe | Screen::Backlog => &mut self.state.universe,
            Screen::Cold => &mut self.state.cold,
            Screen::Friends => &mut self.state.friends,
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        self.render_tabs(frame, chunks[0]);
        match self.screen {
            Screen::Universe => self.draw_universe(frame, chunks[1]),
            Screen::Backlog => self.draw_backlog(frame, chunks[1]),
            Screen::Cold => self.draw_cold(frame, chunks[1]),
            Screen::Friends => self.draw_friends(frame, chunks[1]),
        }
        self.render_status(frame, chunks[2]);
    }

    fn render_tabs(&self, frame: &mut Frame, area: Rect) {
        let mut title = format!("steamscape · {}", self.library.owner_name());
        if self.demo {
            title.push_str(" [demo]");
        }
        if self.syncing {
            title.push_str(" [syncing]");
        }
        let tabs = Tabs::new(Screen::ALL.iter().map(|screen| screen.title()))
            .select(self.screen.index())
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(self.theme.muted))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            );
        frame.render_widget(tabs, area);
    }

    fn draw_universe(&mut self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(12), Constraint::Percentage(50)])
            .split(columns[1]);

        self.render_node_list(frame, columns[0]);
        self.render_node_details(frame, right[0]);
        self.render_universe_map(frame, right[1]);
    }

    fn render_node_list(&mut self, frame: &mut Frame, area: Rect) {
        let height = area.height.saturating_sub(2) as usize;
        let len = self.state.filtered.len();
        self.state.universe.height = height;
        self.state.universe.clamp(len);

        let window = self.state.universe.window(len);
        let mut list_state = ListState::default();
        if !window.is_empty() {
            list_state.select(Some(self.state.universe.cursor - window.start));
        }

        let cursor = self.state.universe.cursor;
        let items: Vec<ListItem> = self.state.filtered[window.clone()]
            .iter()
            .enumerate()
            .map(|(idx, node)| {
                let marker = if window.start + idx == cursor {
                    Span::styled(
                        "▶ ",
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw("  ")
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::styled("● ", Style::default().fg(self.theme.node_color(node))),
                    Span::styled(
                        node.name.clone(),
                        Style::default()
                            .fg(self.theme.primary_fg)
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(" · {:.1}h", node.playtime_hours),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();

        let title = if self.state.filter.is_empty() {
            format!("Games ({len})")
        } else {
            format!("Games ({len}/{}) /{}", self.state.all_nodes.len(), self.state.filter)
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_node_details(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Node");
        let Some(node) = self.state.current_node() else {
            let message = if self.state.all_nodes.is_empty() {
                "No games cached for this user"
            } else {
                "No games match the filter"
            };
            frame.render_widget(Paragraph::new(message).block(block), area);
            return;
        };

        let muted = Style::default().fg(self.theme.muted);
        let mut lines = vec![
            Line::from(vec![
                Span::styled(
                    node.name.clone(),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(format!("  app {}", node.id), muted),
            ]),
            Line::from(vec![
                Span::styled("    ", Style::default().bg(self.theme.node_color(node))),
                Span::styled(format!(" {}", node.color), muted),
            ]),
            Line::from(format!("Genre: {}", node.genre)),
            Line::from(format!(
                "Playtime: {:.1}h total · {:.1}h last two weeks",
                node.playtime_hours, node.recent_hours
            )),
            Line::from(format!(
                "Top-percentile rank: {} (0 is the most played)",
                node.top_percentile_rank
            )),
            Line::from(format!("Last played: {}", node.last_played_label)),
        ];

        let achievements = &node.achievements;
        if achievements.total > 0 {
            lines.push(Line::from(format!(
                "Achievements: {}/{} ({:.0}%)",
                achievements.unlocked,
                achievements.total,
                achievements.completion() * 100.0
            )));
        } else {
            lines.push(Line::from(Span::styled("Achievements: none tracked", muted)));
        }
        lines.push(Line::from(format!(
            "Rarest: {} ({:.1}%)",
            achievements.rarest.name, achievements.rarest.percent
        )));

        if let Some(placement) = self.placements.iter().find(|p| p.id == node.id) {
            let props = placement.properties;
            let [x, y, z] = placement.position;
            lines.push(Line::from(format!(
                "Size {:.2} · glow {:.2} · orbit {:.2}",
                props.size, props.glow_intensity, props.orbit_distance
            )));
            lines.push(Line::from(Span::styled(
                format!("Position ({x:.1}, {y:.1}, {z:.1})"),
                muted,
            )));
        }
        if !node.icon_url.is_empty() {
            lines.push(Line::from(Span::styled(node.icon_url.clone(), muted)));
        }

        let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_universe_map(&self, frame: &mut Frame, area: Rect) {
        let extent = self
            .placements
            .iter()
            .map(|p| p.position[0].abs().max(p.position[2].abs()))
            .fold(5.0_f64, f64::max)
            + 1.0;
        let selected = self.state.current_node().map(|node| node.id);
        let nodes = &self.state.all_nodes;

        let canvas = Canvas::default()
            .block(Block::default().borders(Borders::ALL).title("Orbit map (top view)"))
            .marker(Marker::Braille)
            .x_bounds([-extent, extent])
            .y_bounds([-extent, extent])
            .paint(|ctx| {
                for (placement, node) in self.placements.iter().zip(nodes.iter()) {
                    let color = if Some(placement.id) == selected {
                        self.theme.primary_fg
                    } else {
                        self.theme.node_color(node)
                    };
                    ctx.draw(&Circle {
                        x: placement.position[0],
                        y: placement.position[2],
                        radius: placement.properties.size * 0.6,
                        color,
                    });
                }
                if let Some(placement) = self.placements.iter().find(|p| Some(p.id) == selected) {
                    if let Some(node) = nodes.iter().find(|n| n.id == placement.id) {
                        ctx.print(
                            placement.position[0],
                            placement.position[2],
                            node.name.clone(),
                        );
                    }
                }
            });
        frame.render_widget(canvas, area);
    }

    fn draw_backlog(&self, frame: &mut Frame, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(6)])
            .split(area);
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(rows[1]);

        self.render_backlog_snapshot(frame, rows[0]);
        self.render_bucket_table(frame, columns[0]);
        self.render_abandoned(frame, columns[1]);
    }

    fn render_backlog_snapshot(&self, frame: &mut Frame, area: Rect) {
        let totals = &self.analysis.totals;
        let bar_width = area.width.saturating_sub(4) as usize;
        let widths = bucket_widths(totals, bar_width);
        let bar: Vec<Span> = PlaytimeBucket::ALL
            .iter()
            .zip(widths)
            .filter(|(_, width)| *width > 0)
            .map(|(bucket, width)| {
                Span::styled(
                    " ".repeat(width),
                    Style::default().bg(self.theme.bucket_color(*bucket)),
                )
            })
            .collect();

        let legend: Vec<Span> = PlaytimeBucket::ALL
            .iter()
            .flat_map(|bucket| {
                [
                    Span::styled("■ ", Style::default().fg(self.theme.bucket_color(*bucket))),
                    Span::raw(format!("{}  ", bucket.label())),
                ]
            })
            .collect();

        let lines = vec![
            Line::from(format!(
                "{} games · {:.1}h played · {:.0}% meaningfully played (2h+)",
                totals.total_games, totals.total_hours, totals.meaningful_played_pct
            )),
            Line::from(""),
            Line::from(bar),
            Line::from(legend),
        ];
        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Backlog snapshot"))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);
    }

    fn render_bucket_table(&self, frame: &mut Frame, area: Rect) {
        let totals = &self.analysis.totals;
        let rows: Vec<Row> = PlaytimeBucket::ALL
            .iter()
            .map(|bucket| {
                Row::new(vec![
                    Cell::from(Span::styled(
                        bucket.label(),
                        Style::default().fg(self.theme.bucket_color(*bucket)),
                    )),
                    Cell::from(totals.count(*bucket).to_string()),
                    Cell::from(format!("{:.0}%", totals.pct(*bucket))),
                ])
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Min(16),
                Constraint::Length(7),
                Constraint::Length(6),
            ],
        )
        .header(
            Row::new(vec!["Bucket", "Games", "Share"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title("Playtime buckets"));
        frame.render_widget(table, area);
    }

    fn render_abandoned(&self, frame: &mut Frame, area: Rect) {
        let abandoned = &self.analysis.abandoned;
        let items: Vec<ListItem> = if abandoned.is_empty() {
            vec![ListItem::new(Span::styled(
                "No abandoned starts",
                Style::default().fg(self.theme.muted),
            ))]
        } else {
            abandoned
                .iter()
                .take(ABANDONED_SHOWN)
                .map(|game| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!(
                                "{:>6} ",
                                format_hours_from_minutes(game.total_playtime_minutes)
                            ),
                            Style::default().fg(self.theme.warning),
                        ),
                        Span::raw(game.display_name()),
                    ]))
                })
                .collect()
        };
        let title = format!(
            "Abandoned starts ({}; cold, 30m to 5h)",
            abandoned.len()
        );
        let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(list, area);
    }

    fn draw_cold(&mut self, frame: &mut Frame, area: Rect) {
        let len = self.cold_rows.len();
        // borders plus the header row
        self.state.cold.height = area.height.saturating_sub(3) as usize;
        self.state.cold.clamp(len);
        let window = self.state.cold.window(len);

        let rows: Vec<Row> = self.cold_rows[window.clone()]
            .iter()
            .map(|game| {
                let (label, color) = if is_cold(game) {
                    ("Cold", self.theme.accent_alt)
                } else {
                    ("Active", self.theme.success)
                };
                Row::new(vec![
                    Cell::from(game.display_name()),
                    Cell::from(format_hours_from_minutes(game.total_playtime_minutes)),
                    Cell::from(format_hours_from_minutes(game.recent_playtime_minutes)),
                    Cell::from(Span::styled(label, Style::default().fg(color))),
                ])
            })
            .collect();

        let mut table_state = TableState::default();
        if !window.is_empty() {
            table_state.select(Some(self.state.cold.cursor - window.start));
        }

        let title = format!(
            "Cold library ({len}) · sort: {} [o] · {} [c]",
            self.cold_sort.label(),
            if self.cold_only { "cold only" } else { "all games" }
        );
        let table = Table::new(
            rows,
            [
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(14),
                Constraint::Length(8),
            ],
        )
        .header(
            Row::new(vec!["Game", "Total", "Last 2 weeks", "Status"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn draw_friends(&mut self, frame: &mut Frame, area: Rect) {
        let len = self.friends.len();
        self.state.friends.height = area.height.saturating_sub(2) as usize;
        self.state.friends.clamp(len);
        let window = self.state.friends.window(len);

        let items: Vec<ListItem> = if self.friends.is_empty() {
            vec![ListItem::new(Span::styled(
                "No friends cached. Private friend lists stay empty.",
                Style::default().fg(self.theme.muted),
            ))]
        } else {
            self.friends[window.clone()]
                .iter()
                .map(|friend| {
                    let state_color = match friend.persona_state {
                        Some(0) | None => self.theme.muted,
                        Some(1) => self.theme.success,
                        Some(_) => self.theme.warning,
                    };
                    let since = friend
                        .friend_since
                        .map(format_date)
                        .unwrap_or_else(|| "unknown".to_string());
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            friend.name.clone(),
                            Style::default().add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!("  {}", persona_state_label(friend.persona_state)),
                            Style::default().fg(state_color),
                        ),
                        Span::styled(
                            format!(
                                "  · {} · {} games cached · friends since {since}",
                                visibility_label(friend.visibility),
                                friend.games
                            ),
                            Style::default().fg(self.theme.muted),
                        ),
                    ]))
                })
                .collect()
        };

        let mut list_state = ListState::default();
        if !window.is_empty() {
            list_state.select(Some(self.state.friends.cursor - window.start));
        }
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Friends ({len}) · Enter to view library")),
            )
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Filter {
            format!("Filter: {}", self.state.filter)
        } else {
            self.state.status.clone()
        };
        let last_sync = self
            .library
            .last_sync_at
            .map(format_local)
            .unwrap_or_else(|| "never".to_string());
        let secondary = Line::from(Span::styled(
            format!(
                "Last sync: {last_sync} · Tab/1-4 screens · / filter · s sync · e export · q quit"
            ),
            Style::default().fg(if self.syncing {
                self.theme.warning
            } else {
                self.theme.muted
            }),
        ));
        let primary_style = if primary.starts_with("Sync failed") || primary.starts_with("Error") {
            Style::default().fg(self.theme.danger)
        } else {
            Style::default()
        };
        let paragraph = Paragraph::new(vec![
            Line::from(Span::styled(primary, primary_style)),
            secondary,
        ])
        .block(block)
        .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        let event = match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => AppEvent::Input(evt),
                Err(_) => break,
            },
            Ok(false) => AppEvent::Tick,
            Err(_) => break,
        };
        if sender.blocking_send(event).is_err() {
            break;
        }
    });
}

/// Scroll position of one list; `height` is refreshed on every draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct ListCursor {
    cursor: usize,
    offset: usize,
    height: usize,
}

impl ListCursor {
    fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            return;
        }
        let idx = (self.cursor as isize + delta).clamp(0, len as isize - 1);
        self.cursor = idx as usize;
        self.ensure_visible(len);
    }

    fn move_to(&mut self, index: usize, len: usize) {
        if len == 0 {
            return;
        }
        self.cursor = index.min(len - 1);
        self.ensure_visible(len);
    }

    fn move_to_end(&mut self, len: usize) {
        self.move_to(len.saturating_sub(1), len);
    }

    fn page_down(&mut self, len: usize) {
        let delta = self.height.max(1).min(len);
        self.move_by(delta as isize, len);
    }

    fn page_up(&mut self, len: usize) {
        let delta = self.height.max(1).min(len);
        self.move_by(-(delta as isize), len);
    }

    fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
            self.offset = 0;
            return;
        }
        if self.cursor >= len {
            self.cursor = len - 1;
        }
        self.ensure_visible(len);
    }

    fn ensure_visible(&mut self, len: usize) {
        if len == 0 || self.height == 0 {
            self.offset = 0;
            return;
        }
        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + self.height {
            self.offset = self.cursor + 1 - self.height;
        }
        self.offset = self.offset.min(len.saturating_sub(self.height));
    }

    /// Index range currently on screen.
    fn window(&self, len: usize) -> Range<usize> {
        let start = self.offset.min(len);
        let end = (self.offset + self.height.max(1)).min(len);
        start..end
    }
}

struct UiState {
    all_nodes: Vec<GraphNode>,
    filtered: Vec<GraphNode>,
    universe: ListCursor,
    cold: ListCursor,
    friends: ListCursor,
    filter: String,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            all_nodes: Vec::new(),
            filtered: Vec::new(),
            universe: ListCursor::default(),
            cold: ListCursor::default(),
            friends: ListCursor::default(),
            filter: String::new(),
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_nodes(&mut self, nodes: Vec<GraphNode>) {
        self.all_nodes = nodes;
    }

    /// Re-filter, keeping the selected game when it survives.
    fn apply_filter(&mut self) {
        let selected = self.current_node().map(|node| node.id);
        if self.filter.trim().is_empty() {
            self.filtered = self.all_nodes.clone();
        } else {
            let needle = self.filter.to_lowercase();
            self.filtered = self
                .all_nodes
                .iter()
                .filter(|node| node_matches(node, &needle))
                .cloned()
                .collect();
        }

        let len = self.filtered.len();
        match selected.and_then(|id| self.filtered.iter().position(|node| node.id == id)) {
            Some(pos) => self.universe.move_to(pos, len),
            None => {
                self.universe.cursor = 0;
                self.universe.offset = 0;
            }
        }
    }

    fn current_node(&self) -> Option<&GraphNode> {
        self.filtered.get(self.universe.cursor)
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}

fn node_matches(node: &GraphNode, needle: &str) -> bool {
    node.name.to_lowercase().contains(needle)
        || node.genre.to_lowercase().contains(needle)
        || node.id.to_string() == needle
}

/// Split `width` cells between the buckets in proportion to their counts.
fn bucket_widths(totals: &BacklogTotals, width: usize) -> [usize; 4] {
    let mut widths = [0; 4];
    if totals.total_games == 0 || width == 0 {
        return widths;
    }
    for (slot, bucket) in widths.iter_mut().zip(PlaytimeBucket::ALL) {
        *slot = totals.count(bucket) * width / totals.total_games;
    }
    // rounding remainder goes to the largest bucket
    let used: usize = widths.iter().sum();
    if let Some(largest) = (0..widths.len()).max_by_key(|&i| totals.count(PlaytimeBucket::ALL[i])) {
        widths[largest] += width - used;
    }
    widths
}

fn format_local(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_date(epoch_seconds: i64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_seconds, 0)
        .map(|at| at.with_timezone(&Local).format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
