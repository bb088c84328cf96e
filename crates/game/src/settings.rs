use glam::Vec3;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::spawn::{BotNamePool, DEFAULT_BOT_NAMES, SpawnArea, SpawnAreas};
use crate::team::{TIE_BREAK_TEAM, Team};

pub const DEFAULT_TICK_RATE: u32 = 60;
pub const DEFAULT_CAPACITY_TARGET: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchSettings {
    pub capacity_target: usize,
    pub max_clients: usize,
    pub max_hp: u32,
    pub respawn_delay_ticks: u32,
    pub kill_score: u32,
    pub score_limit: Option<u32>,
    pub tie_break_team: Team,
    pub bot_names: Vec<String>,
    pub red_spawn: SpawnArea,
    pub blue_spawn: SpawnArea,
    pub rng_seed: Option<u64>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            capacity_target: DEFAULT_CAPACITY_TARGET,
            max_clients: DEFAULT_CAPACITY_TARGET,
            max_hp: 100,
            respawn_delay_ticks: 3 * DEFAULT_TICK_RATE,
            kill_score: 1,
            score_limit: Some(25),
            tie_break_team: TIE_BREAK_TEAM,
            bot_names: DEFAULT_BOT_NAMES.iter().map(|n| n.to_string()).collect(),
            red_spawn: SpawnArea::new(Vec3::new(-400.0, 120.0, 0.0), Vec3::new(60.0, 20.0, 60.0)),
            blue_spawn: SpawnArea::new(Vec3::new(400.0, 120.0, 0.0), Vec3::new(60.0, 20.0, 60.0)),
            rng_seed: None,
        }
    }
}

impl MatchSettings {
    pub fn spawn_areas(&self) -> SpawnAreas {
        SpawnAreas::new()
            .with(Team::Red, self.red_spawn)
            .with(Team::Blue, self.blue_spawn)
    }

    pub fn bot_name_pool(&self) -> BotNamePool {
        BotNamePool::new(self.bot_names.iter().cloned())
    }

    pub fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
