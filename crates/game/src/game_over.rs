use crate::event::Outbox;
use crate::lifecycle::LifecycleContext;
use crate::net::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchPhase {
    Active,
    Ending,
    Ended,
}

impl MatchPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            MatchPhase::Active => "active",
            MatchPhase::Ending => "ending",
            MatchPhase::Ended => "ended",
        }
    }
}

/// Terminal match state machine: Active -> Ending -> Ended, entered at most
/// once per match.
#[derive(Debug)]
pub struct GameOverCoordinator {
    phase: MatchPhase,
    triggered: bool,
    ending_tick: Option<u32>,
}

impl Default for GameOverCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl GameOverCoordinator {
    pub fn new() -> Self {
        Self {
            phase: MatchPhase::Active,
            triggered: false,
            ending_tick: None,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == MatchPhase::Active
    }

    /// Despawns every registered entity, newest first. Returns `false` when
    /// the match was already ending or over.
    pub fn trigger_game_over(&mut self, ctx: &mut LifecycleContext<'_>, tick: u32) -> bool {
        if self.triggered {
            return false;
        }
        self.triggered = true;
        self.phase = MatchPhase::Ending;
        self.ending_tick = Some(tick);

        let ids = ctx.spawner.ids_reversed();
        let count = ids.len();
        for id in ids {
            ctx.despawn(id);
        }
        log::info!("game over triggered at tick {}, despawned {} entities", tick, count);
        true
    }

    /// Completes the transition once a tick boundary has passed since the
    /// trigger, broadcasting `GameOver` exactly once.
    pub fn advance(&mut self, tick: u32, outbox: &mut Outbox) -> bool {
        match (self.phase, self.ending_tick) {
            (MatchPhase::Ending, Some(ending)) if tick != ending => {
                self.phase = MatchPhase::Ended;
                outbox.broadcast(ServerMessage::GameOver);
                true
            }
            _ => false,
        }
    }
}
