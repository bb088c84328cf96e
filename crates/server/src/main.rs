mod config;
mod events;
mod server;
mod skirmish;
mod tui;

use std::io;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::{ServerConfig, SkirmishConfig};
use events::Severity;
use server::GameServer;
use skyward::{DEFAULT_CAPACITY_TARGET, DEFAULT_TICK_RATE, MatchSettings};
use tui::TuiState;

#[derive(Parser)]
#[command(name = "skyward-server")]
#[command(about = "Authoritative Skyward match server with simulated clients")]
struct Args {
    #[arg(short, long, default_value_t = DEFAULT_CAPACITY_TARGET, help = "Players plus bots per match")]
    capacity: usize,

    #[arg(long, default_value_t = 2, help = "Loopback clients connected at startup")]
    clients: u32,

    #[arg(long, default_value_t = 0, help = "Clients joining one per second after start")]
    late_joiners: u32,

    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 25, help = "Kills needed to win, 0 disables")]
    score_limit: u32,

    #[arg(long, default_value_t = 3.0, help = "Seconds before a downed player respawns")]
    respawn_delay: f32,

    #[arg(long, default_value_t = 0.25, help = "Chance per tick that a hit lands")]
    hit_chance: f64,

    #[arg(long, help = "Seed for spawn points and combat rolls")]
    seed: Option<u64>,

    #[arg(long)]
    headless: bool,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        let settings = MatchSettings {
            capacity_target: self.capacity,
            max_clients: self.capacity.max(self.clients as usize + self.late_joiners as usize),
            score_limit: (self.score_limit > 0).then_some(self.score_limit),
            respawn_delay_ticks: (self.respawn_delay.max(0.0) * self.tick_rate as f32) as u32,
            rng_seed: self.seed,
            ..Default::default()
        };

        ServerConfig {
            tick_rate: self.tick_rate,
            simulated_clients: self.clients,
            late_joiners: self.late_joiners,
            skirmish: SkirmishConfig {
                hit_chance: self.hit_chance,
                ..Default::default()
            },
            settings,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let headless = args.headless;
    let config = args.into_config();

    if headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut server = GameServer::new(config).context("failed to set up the match")?;

    if headless {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(run_headless(&mut server));
    } else {
        run_with_tui(&mut server)?;
    }

    Ok(())
}

async fn run_headless(server: &mut GameServer) {
    log::info!("Server started, tick every {:?}", server.tick_duration());
    let running = server.running();
    let mut interval = tokio::time::interval(server.tick_duration());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            _ = interval.tick() => {
                server.tick();
                for event in server.drain_events() {
                    match event.severity() {
                        Severity::Info => log::info!("{}", event.describe()),
                        Severity::Warn => log::warn!("{}", event.describe()),
                        Severity::Error => log::error!("{}", event.describe()),
                    }
                }
            }
            _ = &mut shutdown => {
                running.store(false, Ordering::SeqCst);
            }
        }
    }

    log::info!("Server shutting down");
    server.shutdown_connections();
}

fn run_with_tui(server: &mut GameServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();
    tui_state.log_info("Server started");

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            tui_state.log(event.severity(), event.describe());
        }

        if let Some(client) = tui_state.take_pending_kick() {
            server.kick_client(client);
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let clients = server.client_infos();
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Tab => tui_state.next_tab(),
                        KeyCode::BackTab => tui_state.prev_tab(),
                        KeyCode::PageUp => tui_state.scroll_up(),
                        KeyCode::PageDown => tui_state.scroll_down(),
                        KeyCode::End => tui_state.scroll_to_bottom(),
                        KeyCode::Up => tui_state.select_prev_client(),
                        KeyCode::Down => tui_state.select_next_client(clients.len()),
                        KeyCode::Char('j') => {
                            if let Err(err) = server.connect_client() {
                                tui_state.log(Severity::Warn, format!("Join refused: {}", err));
                            }
                        }
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            if tui_state.active_tab() == tui::Tab::Clients {
                                tui_state.request_kick(&clients);
                            }
                        }
                        KeyCode::Char('g') => {
                            if server.end_match() {
                                tui_state.log_info("Match ended by operator");
                            }
                        }
                        _ => {}
                    }
                }
            }
        }

        let stats = server.stats();
        let clients = server.client_infos();
        let entities = server.entity_rows();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats, &clients, &entities);
        })?;
    }

    tui_state.log_info("Shutting down...");
    server.shutdown_connections();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
