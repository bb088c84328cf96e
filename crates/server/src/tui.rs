use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Tabs};

use skyward::{MatchPhase, Team};

use crate::events::Severity;
use crate::server::{ClientInfo, EntityRow, ServerStats};

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Overview,
    Entities,
    Clients,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Overview, Tab::Entities, Tab::Clients];

    fn title(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Entities => "Entities",
            Tab::Clients => "Clients",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }
}

pub struct TuiState {
    log: VecDeque<(Severity, String)>,
    scroll: usize,
    tab: Tab,
    selected_client: usize,
    pending_kick: Option<u32>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::new(),
            scroll: 0,
            tab: Tab::Overview,
            selected_client: 0,
            pending_kick: None,
        }
    }

    pub fn log(&mut self, severity: Severity, message: impl Into<String>) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back((severity, message.into()));
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn active_tab(&self) -> Tab {
        self.tab
    }

    pub fn next_tab(&mut self) {
        self.tab = Tab::ALL[(self.tab.index() + 1) % Tab::ALL.len()];
    }

    pub fn prev_tab(&mut self) {
        self.tab = Tab::ALL[(self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len()];
    }

    pub fn scroll_up(&mut self) {
        self.scroll = (self.scroll + 10).min(self.log.len());
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_sub(10);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }

    pub fn select_prev_client(&mut self) {
        self.selected_client = self.selected_client.saturating_sub(1);
    }

    pub fn select_next_client(&mut self, count: usize) {
        if self.selected_client + 1 < count {
            self.selected_client += 1;
        }
    }

    pub fn request_kick(&mut self, clients: &[ClientInfo]) {
        self.pending_kick = clients.get(self.selected_client).map(|c| c.client_id);
    }

    pub fn take_pending_kick(&mut self) -> Option<u32> {
        self.pending_kick.take()
    }
}

pub fn render(
    frame: &mut Frame,
    state: &TuiState,
    stats: &ServerStats,
    clients: &[ClientInfo],
    entities: &[EntityRow],
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_tabs(frame, chunks[1], state);
    match state.tab {
        Tab::Overview => render_overview(frame, chunks[2], state, stats),
        Tab::Entities => render_entities(frame, chunks[2], entities),
        Tab::Clients => render_clients(frame, chunks[2], state, clients),
    }
    render_help(frame, chunks[3]);
}

fn team_color(team: Team) -> Color {
    match team {
        Team::Red => Color::Red,
        Team::Blue => Color::Blue,
        Team::Undefined => Color::DarkGray,
    }
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(" Skyward Server - Uptime: {} ", format_duration(stats.uptime_secs));
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let game = &stats.game;
    let phase_color = match game.phase {
        MatchPhase::Active if game.started => Color::Green,
        MatchPhase::Active => Color::Yellow,
        MatchPhase::Ending | MatchPhase::Ended => Color::Magenta,
    };
    let phase = if game.phase == MatchPhase::Active && !game.started {
        "loading"
    } else {
        game.phase.as_str()
    };

    let line = Line::from(vec![
        Span::styled(phase, Style::default().fg(phase_color).add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "  |  Tick: {}  |  Clients: {}/{}  |  Entities: {}  |  ",
            game.tick, game.client_count, stats.max_clients, game.entity_count
        )),
        Span::styled(format!("Red {}", game.scores[0]), Style::default().fg(Color::Red)),
        Span::raw(" : "),
        Span::styled(format!("{} Blue", game.scores[1]), Style::default().fg(Color::Blue)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_tabs(frame: &mut Frame, area: Rect, state: &TuiState) {
    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .block(Block::default().borders(Borders::ALL))
        .select(state.tab.index())
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(tabs, area);
}

fn render_overview(frame: &mut Frame, area: Rect, state: &TuiState, stats: &ServerStats) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(6), Constraint::Min(0)])
        .split(area);

    let game = &stats.game;
    let filled = game.entity_count as f64 / stats.capacity_target.max(1) as f64;
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(" Capacity ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        )
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(filled.min(1.0))
        .label(format!(
            "{}/{} slots ({} bots, {} bot requests)",
            game.entity_count, stats.capacity_target, game.live_bots, game.bot_spawn_requests
        ));
    frame.render_widget(gauge, chunks[0]);

    let net = &stats.network_stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Red roster: ", Style::default().fg(Color::Gray)),
            Span::styled(game.red_roster.to_string(), Style::default().fg(Color::Red)),
            Span::styled("   Blue roster: ", Style::default().fg(Color::Gray)),
            Span::styled(game.blue_roster.to_string(), Style::default().fg(Color::Blue)),
        ]),
        Line::from(vec![
            Span::styled("Scene: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{}/{} loaded", game.loaded_clients, game.client_count)),
        ]),
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::raw(format!("{} sent / {} recv", net.packets_sent, net.packets_received)),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::raw(format!(
                "{} sent / {} recv",
                format_bytes(net.bytes_sent),
                format_bytes(net.bytes_received)
            )),
        ]),
    ];
    let match_block = Block::default()
        .title(" Match ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));
    frame.render_widget(Paragraph::new(lines).block(match_block), chunks[1]);

    render_log(frame, chunks[2], state);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let end = state.log.len().saturating_sub(state.scroll);
    let start = end.saturating_sub(visible);

    let lines: Vec<Line> = state
        .log
        .range(start..end)
        .map(|(severity, message)| {
            let color = match severity {
                Severity::Info => Color::White,
                Severity::Warn => Color::Yellow,
                Severity::Error => Color::Red,
            };
            Line::from(Span::styled(message.as_str(), Style::default().fg(color)))
        })
        .collect();

    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_entities(frame: &mut Frame, area: Rect, entities: &[EntityRow]) {
    let lines: Vec<Line> = entities
        .iter()
        .map(|row| {
            let hp = match row.hp {
                Some((hp, max)) => format!("{:>4}/{:<4}", hp, max),
                None => "   --    ".to_string(),
            };
            let status = if row.alive { "alive" } else { "down" };
            Line::from(vec![
                Span::raw(format!("{:<6}", row.id)),
                Span::styled(
                    format!("{:<14}", row.name),
                    Style::default().fg(team_color(row.team)),
                ),
                Span::raw(format!("{:<7}", if row.is_bot { "bot" } else { "player" })),
                Span::raw(hp),
                Span::styled(
                    format!("  {}", status),
                    Style::default().fg(if row.alive { Color::Green } else { Color::Red }),
                ),
            ])
        })
        .collect();

    let block = Block::default()
        .title(format!(" Entities ({}) ", entities.len()))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_clients(frame: &mut Frame, area: Rect, state: &TuiState, clients: &[ClientInfo]) {
    let lines: Vec<Line> = clients
        .iter()
        .enumerate()
        .map(|(index, client)| {
            let style = if index == state.selected_client {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let hp = client
                .hp
                .map(|(hp, max)| format!("{}/{}", hp, max))
                .unwrap_or_else(|| "--".to_string());
            Line::from(vec![
                Span::styled(format!("client {:<4}", client.client_id), style),
                Span::raw(format!(
                    " entity {:<6}",
                    client.entity.as_deref().unwrap_or("none")
                )),
                Span::styled(
                    format!("{:<10}", client.team.as_str()),
                    Style::default().fg(team_color(client.team)),
                ),
                Span::raw(format!("hp {:<9} sees {} entities", hp, client.known_entities)),
            ])
        })
        .collect();

    let block = Block::default()
        .title(format!(" Clients ({}) ", clients.len()))
        .borders(Borders::ALL);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new(
        "q/Esc quit  Tab switch  PgUp/PgDn scroll  j join  k kick  g end match",
    )
    .block(block)
    .style(
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
