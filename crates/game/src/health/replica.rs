use crate::entity::EntityId;
use crate::net::sequence_greater_than;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplicaNotification {
    HealthChanged { entity: EntityId, hp: u32, max_hp: u32 },
    Died { entity: EntityId },
}

/// Client-side mirror of one entity's health. It never derives game truth;
/// it only records what the server pushed.
#[derive(Debug, Clone)]
pub struct HealthReplica {
    entity: EntityId,
    hp: u32,
    max_hp: u32,
    dead: bool,
    last_sequence: Option<u32>,
}

impl HealthReplica {
    pub fn new(entity: EntityId) -> Self {
        Self {
            entity,
            hp: 0,
            max_hp: 0,
            dead: false,
            last_sequence: None,
        }
    }

    pub fn hp(&self) -> u32 {
        self.hp
    }

    pub fn max_hp(&self) -> u32 {
        self.max_hp
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Stores an update pushed by the server. Updates older than the newest
    /// one already applied are discarded.
    pub fn handle_health_update(
        &mut self,
        hp: u32,
        max_hp: u32,
        sequence: u32,
    ) -> Vec<ReplicaNotification> {
        if let Some(last) = self.last_sequence {
            if !sequence_greater_than(sequence, last) {
                return Vec::new();
            }
        }
        self.last_sequence = Some(sequence);
        self.hp = hp;
        self.max_hp = max_hp;

        let mut notifications = vec![ReplicaNotification::HealthChanged {
            entity: self.entity,
            hp,
            max_hp,
        }];
        if hp == 0 && !self.dead {
            self.dead = true;
            notifications.push(ReplicaNotification::Died {
                entity: self.entity,
            });
        }
        notifications
    }

    /// Clears the dead flag after the server announced a respawn.
    pub fn revive(&mut self) {
        self.dead = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_notification_fires_once() {
        let mut replica = HealthReplica::new(EntityId(1));

        let first = replica.handle_health_update(0, 100, 1);
        assert_eq!(first.len(), 2);
        assert!(matches!(first[1], ReplicaNotification::Died { .. }));

        let second = replica.handle_health_update(0, 100, 2);
        assert_eq!(second.len(), 1);
        assert!(replica.is_dead());
    }

    #[test]
    fn stale_updates_are_ignored() {
        let mut replica = HealthReplica::new(EntityId(1));

        replica.handle_health_update(40, 100, 5);
        let stale = replica.handle_health_update(90, 100, 4);
        let duplicate = replica.handle_health_update(90, 100, 5);

        assert!(stale.is_empty());
        assert!(duplicate.is_empty());
        assert_eq!(replica.hp(), 40);
    }

    #[test]
    fn sequence_wraps() {
        let mut replica = HealthReplica::new(EntityId(1));

        replica.handle_health_update(50, 100, u32::MAX);
        let wrapped = replica.handle_health_update(60, 100, 0);

        assert_eq!(wrapped.len(), 1);
        assert_eq!(replica.hp(), 60);
    }

    #[test]
    fn revive_allows_a_new_death() {
        let mut replica = HealthReplica::new(EntityId(1));

        replica.handle_health_update(0, 100, 1);
        replica.revive();
        replica.handle_health_update(100, 100, 2);
        let again = replica.handle_health_update(0, 100, 3);

        assert!(again.contains(&ReplicaNotification::Died { entity: EntityId(1) }));
    }
}
