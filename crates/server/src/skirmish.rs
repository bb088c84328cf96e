use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use skyward::{Damageable, EntityId, HealthModification, Match, Team};

use crate::config::SkirmishConfig;

/// Stand-in for the combat layer: lands random hits between live entities
/// of opposing teams and hands out the odd repair.
pub struct Skirmish {
    config: SkirmishConfig,
    rng: StdRng,
}

impl Skirmish {
    pub fn new(config: SkirmishConfig, rng: StdRng) -> Self {
        Self { config, rng }
    }

    pub fn step(&mut self, game: &mut Match) {
        if self.rng.gen_bool(self.config.hit_chance.clamp(0.0, 1.0)) {
            self.exchange_fire(game);
        }
        if self.rng.gen_bool(self.config.repair_chance.clamp(0.0, 1.0)) {
            self.repair(game);
        }
    }

    fn combatants(game: &Match, team: Team) -> Vec<EntityId> {
        game.teams()
            .roster(team)
            .iter()
            .copied()
            .filter(|&id| game.health().is_alive(id))
            .collect()
    }

    fn exchange_fire(&mut self, game: &mut Match) {
        let Some(&attacking_team) = Team::PLAYABLE.choose(&mut self.rng) else {
            return;
        };
        let attackers = Self::combatants(game, attacking_team);
        let targets = Self::combatants(game, attacking_team.opponent());

        let (Some(&attacker), Some(&target)) = (
            attackers.choose(&mut self.rng),
            targets.choose(&mut self.rng),
        ) else {
            return;
        };

        let low = self.config.min_damage.min(self.config.max_damage);
        let damage = self.rng.gen_range(low..=self.config.max_damage.max(low));
        game.modify_health(target, HealthModification::Damage, damage, Some(attacker));
    }

    fn repair(&mut self, game: &mut Match) {
        let damaged: Vec<EntityId> = Team::PLAYABLE
            .iter()
            .flat_map(|&team| Self::combatants(game, team))
            .filter(|&id| {
                game.health()
                    .get(id)
                    .is_some_and(|h| h.hit_points() < h.max_hit_points())
            })
            .collect();

        if let Some(&id) = damaged.choose(&mut self.rng) {
            game.modify_health(id, HealthModification::Heal, self.config.repair_amount, None);
        }
    }
}
