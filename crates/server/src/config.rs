use skyward::{DEFAULT_TICK_RATE, MatchSettings};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tick_rate: u32,
    /// Loopback clients created at startup.
    pub simulated_clients: u32,
    /// Simulated clients that join after the match started, one per second.
    pub late_joiners: u32,
    pub skirmish: SkirmishConfig,
    pub settings: MatchSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            simulated_clients: 2,
            late_joiners: 0,
            skirmish: SkirmishConfig::default(),
            settings: MatchSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkirmishConfig {
    /// Chance per tick that some entity lands a hit.
    pub hit_chance: f64,
    pub min_damage: u32,
    pub max_damage: u32,
    /// Chance per tick that a damaged entity picks up a repair.
    pub repair_chance: f64,
    pub repair_amount: u32,
}

impl Default for SkirmishConfig {
    fn default() -> Self {
        Self {
            hit_chance: 0.25,
            min_damage: 10,
            max_damage: 45,
            repair_chance: 0.02,
            repair_amount: 25,
        }
    }
}
