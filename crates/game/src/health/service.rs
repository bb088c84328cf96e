use std::collections::HashMap;

use crate::entity::{Damageable, EntityId};
use crate::error::NetMode;
use crate::event::Outbox;
use crate::net::ServerMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthModification {
    Damage,
    Heal,
    MaxHpIncrease,
    MaxHpDecrease,
}

/// Server-local record of a requested change. Only the resulting values are
/// ever broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthModificationIntent {
    pub target: EntityId,
    pub kind: HealthModification,
    pub amount: u32,
    pub source: Option<EntityId>,
    pub previous_hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthState {
    current: u32,
    max: u32,
    state: LifeState,
}

impl HealthState {
    pub fn new(max: u32) -> Self {
        let max = max.max(1);
        Self {
            current: max,
            max,
            state: LifeState::Alive,
        }
    }

    pub fn state(&self) -> LifeState {
        self.state
    }
}

impl Damageable for HealthState {
    fn hit_points(&self) -> u32 {
        self.current
    }

    fn max_hit_points(&self) -> u32 {
        self.max
    }

    fn is_dead(&self) -> bool {
        self.state == LifeState::Dead
    }

    fn apply(&mut self, kind: HealthModification, amount: u32) -> bool {
        if self.is_dead() {
            return false;
        }

        match kind {
            HealthModification::Damage => {
                self.current = self.current.saturating_sub(amount).min(self.max);
            }
            HealthModification::Heal => {
                self.current = self.current.saturating_add(amount).min(self.max);
            }
            HealthModification::MaxHpIncrease => {
                self.max = self.max.saturating_add(amount);
                self.current = self.current.saturating_add(amount);
            }
            HealthModification::MaxHpDecrease => {
                self.max = self.max.saturating_sub(amount).max(1);
                self.current = self.current.min(self.max);
            }
        }

        if self.current == 0 {
            self.state = LifeState::Dead;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthOutcome {
    pub intent: HealthModificationIntent,
    pub hp: u32,
    pub max_hp: u32,
    pub died: bool,
}

#[derive(Debug, Clone, Copy)]
struct Tracked {
    health: HealthState,
    sequence: u32,
}

/// Holds the single authoritative hit-point value of every registered entity.
#[derive(Debug)]
pub struct HealthReplicationService {
    mode: NetMode,
    default_max_hp: u32,
    entities: HashMap<EntityId, Tracked>,
}

impl HealthReplicationService {
    pub fn new(mode: NetMode, default_max_hp: u32) -> Self {
        Self {
            mode,
            default_max_hp: default_max_hp.max(1),
            entities: HashMap::new(),
        }
    }

    pub fn default_max_hp(&self) -> u32 {
        self.default_max_hp
    }

    /// Starts tracking `entity` at full health. Already tracked entities are
    /// left untouched.
    pub fn register(&mut self, entity: EntityId) -> bool {
        if self.mode.require_authority("health registration").is_err()
            || self.entities.contains_key(&entity)
        {
            return false;
        }
        self.entities.insert(
            entity,
            Tracked {
                health: HealthState::new(self.default_max_hp),
                sequence: 0,
            },
        );
        true
    }

    /// Gives `entity` a fresh life at the default maximum and broadcasts it.
    pub fn reset(&mut self, entity: EntityId, outbox: &mut Outbox) -> bool {
        if self.mode.require_authority("health reset").is_err() {
            return false;
        }
        let default_max_hp = self.default_max_hp;
        let Some(tracked) = self.entities.get_mut(&entity) else {
            return false;
        };
        tracked.health = HealthState::new(default_max_hp);
        Self::broadcast(entity, tracked, outbox);
        true
    }

    pub fn modify_health(
        &mut self,
        target: EntityId,
        kind: HealthModification,
        amount: u32,
        source: Option<EntityId>,
        outbox: &mut Outbox,
    ) -> Option<HealthOutcome> {
        self.mode.require_authority("health modification").ok()?;

        let tracked = self.entities.get_mut(&target)?;
        if tracked.health.is_dead() {
            return None;
        }

        let intent = HealthModificationIntent {
            target,
            kind,
            amount,
            source,
            previous_hp: tracked.health.hit_points(),
        };
        let died = tracked.health.apply(kind, amount);
        Self::broadcast(target, tracked, outbox);

        log::debug!(
            "{:?} {} on {} from {:?}: {} -> {}/{}",
            kind,
            amount,
            target,
            source,
            intent.previous_hp,
            tracked.health.hit_points(),
            tracked.health.max_hit_points()
        );

        Some(HealthOutcome {
            intent,
            hp: tracked.health.hit_points(),
            max_hp: tracked.health.max_hit_points(),
            died,
        })
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<HealthState> {
        self.entities.remove(&entity).map(|t| t.health)
    }

    pub fn get(&self, entity: EntityId) -> Option<&HealthState> {
        self.entities.get(&entity).map(|t| &t.health)
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.get(entity).is_some_and(|h| !h.is_dead())
    }

    /// The last broadcast state of `entity`, for clients that missed it.
    /// Repeats the current sequence so replicas that already hold it drop it.
    pub fn snapshot(&self, entity: EntityId) -> Option<ServerMessage> {
        self.entities.get(&entity).map(|t| ServerMessage::UpdateHealth {
            entity,
            hp: t.health.hit_points(),
            max_hp: t.health.max_hit_points(),
            sequence: t.sequence,
        })
    }

    pub fn tracked_count(&self) -> usize {
        self.entities.len()
    }

    fn broadcast(entity: EntityId, tracked: &mut Tracked, outbox: &mut Outbox) {
        tracked.sequence = tracked.sequence.wrapping_add(1);
        outbox.broadcast(ServerMessage::UpdateHealth {
            entity,
            hp: tracked.health.hit_points(),
            max_hp: tracked.health.max_hit_points(),
            sequence: tracked.sequence,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_with(entity: EntityId) -> HealthReplicationService {
        let mut health = HealthReplicationService::new(NetMode::Server, 100);
        assert!(health.register(entity));
        health
    }

    #[test]
    fn damage_to_zero_kills_once() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();

        let first = health
            .modify_health(id, HealthModification::Damage, 30, None, &mut outbox)
            .unwrap();
        assert_eq!(first.hp, 70);
        assert!(!first.died);

        let second = health
            .modify_health(id, HealthModification::Damage, 80, Some(EntityId(2)), &mut outbox)
            .unwrap();
        assert_eq!(second.hp, 0);
        assert!(second.died);
        assert_eq!(second.intent.previous_hp, 70);

        let third = health.modify_health(id, HealthModification::Damage, 10, None, &mut outbox);
        assert!(third.is_none());
        assert_eq!(health.get(id).unwrap().hit_points(), 0);
        assert!(health.get(id).unwrap().is_dead());
        assert_eq!(outbox.len(), 2);
    }

    #[test]
    fn heal_is_capped_at_max() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();

        health.modify_health(id, HealthModification::Damage, 40, None, &mut outbox);
        let healed = health
            .modify_health(id, HealthModification::Heal, 500, None, &mut outbox)
            .unwrap();

        assert_eq!(healed.hp, 100);
        assert_eq!(healed.max_hp, 100);
    }

    #[test]
    fn max_increase_shifts_current_upward() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();

        health.modify_health(id, HealthModification::Damage, 20, None, &mut outbox);
        let raised = health
            .modify_health(id, HealthModification::MaxHpIncrease, 50, None, &mut outbox)
            .unwrap();

        assert_eq!(raised.hp, 130);
        assert_eq!(raised.max_hp, 150);
    }

    #[test]
    fn max_decrease_never_drops_below_one() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();

        let lowered = health
            .modify_health(id, HealthModification::MaxHpDecrease, 60, None, &mut outbox)
            .unwrap();
        assert_eq!((lowered.hp, lowered.max_hp), (40, 40));

        let floor = health
            .modify_health(id, HealthModification::MaxHpDecrease, 1000, None, &mut outbox)
            .unwrap();
        assert_eq!((floor.hp, floor.max_hp), (1, 1));
        assert!(!floor.died);
    }

    #[test]
    fn unchanged_values_are_still_broadcast() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();

        health.modify_health(id, HealthModification::Heal, 10, None, &mut outbox);
        health.modify_health(id, HealthModification::Damage, 0, None, &mut outbox);

        let sequences: Vec<u32> = outbox
            .drain()
            .filter_map(|o| match o.message {
                ServerMessage::UpdateHealth { hp, sequence, .. } => {
                    assert_eq!(hp, 100);
                    Some(sequence)
                }
                _ => None,
            })
            .collect();
        assert_eq!(sequences, vec![1, 2]);
    }

    #[test]
    fn hp_stays_within_bounds() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();
        let steps = [
            (HealthModification::Damage, 15),
            (HealthModification::MaxHpDecrease, 30),
            (HealthModification::Heal, 90),
            (HealthModification::Damage, 7),
            (HealthModification::MaxHpDecrease, 5),
            (HealthModification::Heal, 3),
            (HealthModification::Damage, 200),
            (HealthModification::Heal, 50),
        ];

        for (kind, amount) in steps {
            health.modify_health(id, kind, amount, None, &mut outbox);
            let state = health.get(id).unwrap();
            assert!(state.hit_points() <= state.max_hit_points());
        }
        assert!(health.get(id).unwrap().is_dead());
    }

    #[test]
    fn unknown_target_is_dropped() {
        let mut health = HealthReplicationService::new(NetMode::Server, 100);
        let mut outbox = Outbox::new();

        let outcome =
            health.modify_health(EntityId(9), HealthModification::Damage, 5, None, &mut outbox);

        assert!(outcome.is_none());
        assert!(outbox.is_empty());
    }

    #[test]
    fn client_context_cannot_modify() {
        let mut health = HealthReplicationService::new(NetMode::Client, 100);
        let mut outbox = Outbox::new();

        assert!(!health.register(EntityId(1)));
        assert!(
            health
                .modify_health(EntityId(1), HealthModification::Damage, 5, None, &mut outbox)
                .is_none()
        );
    }

    #[test]
    fn reset_revives_and_keeps_sequence() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();

        health.modify_health(id, HealthModification::MaxHpIncrease, 20, None, &mut outbox);
        health.modify_health(id, HealthModification::Damage, 120, None, &mut outbox);
        assert!(!health.is_alive(id));

        assert!(health.reset(id, &mut outbox));
        let state = health.get(id).unwrap();
        assert_eq!((state.hit_points(), state.max_hit_points()), (100, 100));
        assert!(health.is_alive(id));

        let last = outbox.drain().last().unwrap();
        assert!(matches!(
            last.message,
            ServerMessage::UpdateHealth { sequence: 3, .. }
        ));
    }

    #[test]
    fn snapshot_repeats_the_last_sequence() {
        let id = EntityId(1);
        let mut health = service_with(id);
        let mut outbox = Outbox::new();
        health.modify_health(id, HealthModification::Damage, 25, None, &mut outbox);

        assert_eq!(
            health.snapshot(id),
            Some(ServerMessage::UpdateHealth {
                entity: id,
                hp: 75,
                max_hp: 100,
                sequence: 1,
            })
        );
        assert_eq!(health.snapshot(id), health.snapshot(id));
        assert_eq!(outbox.len(), 1);
        assert!(health.snapshot(EntityId(2)).is_none());
    }
}
