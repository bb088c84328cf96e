use std::collections::VecDeque;

use crate::error::LifecycleError;

/// Longest callsign that still fits a `SpawnedEntity` packet with room to spare.
pub const MAX_BOT_NAME_LEN: usize = 64;

pub const DEFAULT_BOT_NAMES: [&str; 24] = [
    "Maverick", "Goose", "Iceman", "Viper", "Jester", "Cougar", "Merlin", "Slider",
    "Hollywood", "Wolfman", "Sundown", "Chipper", "Stinger", "Hondo", "Rooster", "Hangman",
    "Phoenix", "Bob", "Payback", "Fanboy", "Coyote", "Warlock", "Cyclone", "Halo",
];

/// Fixed pool of bot callsigns. Names return to the pool when their bot is
/// unregistered.
#[derive(Debug, Clone)]
pub struct BotNamePool {
    available: VecDeque<String>,
    capacity: usize,
}

impl Default for BotNamePool {
    fn default() -> Self {
        Self::new(DEFAULT_BOT_NAMES.iter().map(|name| name.to_string()))
    }
}

impl BotNamePool {
    pub fn new(names: impl IntoIterator<Item = String>) -> Self {
        let mut available: VecDeque<String> = VecDeque::new();
        for name in names {
            if !available.contains(&name) {
                available.push_back(name);
            }
        }
        let capacity = available.len();
        Self {
            available,
            capacity,
        }
    }

    pub fn validate(&self) -> Result<(), LifecycleError> {
        match self.available.iter().find(|name| name.is_empty() || name.len() > MAX_BOT_NAME_LEN) {
            Some(name) => Err(LifecycleError::configuration(format!(
                "bot name of {} bytes, expected 1 to {}",
                name.len(),
                MAX_BOT_NAME_LEN
            ))),
            None => Ok(()),
        }
    }

    pub fn allocate(&mut self) -> Result<String, LifecycleError> {
        self.available
            .pop_front()
            .ok_or(LifecycleError::CapacityExceeded {
                what: "bot names",
                limit: self.capacity,
            })
    }

    pub fn release(&mut self, name: String) {
        if self.available.len() < self.capacity && !self.available.contains(&name) {
            self.available.push_back(name);
        }
    }

    pub fn remaining(&self) -> usize {
        self.available.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhaustion_is_rejected() {
        let mut pool = BotNamePool::new(["Alpha".to_string(), "Bravo".to_string()]);

        assert_eq!(pool.allocate().unwrap(), "Alpha");
        assert_eq!(pool.allocate().unwrap(), "Bravo");
        assert_eq!(
            pool.allocate(),
            Err(LifecycleError::CapacityExceeded {
                what: "bot names",
                limit: 2
            })
        );
    }

    #[test]
    fn released_names_are_reused() {
        let mut pool = BotNamePool::new(["Alpha".to_string()]);

        let name = pool.allocate().unwrap();
        pool.release(name);

        assert_eq!(pool.remaining(), 1);
        assert_eq!(pool.allocate().unwrap(), "Alpha");
    }

    #[test]
    fn duplicate_names_are_collapsed() {
        let pool = BotNamePool::new(["Alpha".to_string(), "Alpha".to_string()]);
        assert_eq!(pool.capacity(), 1);
    }

    #[test]
    fn default_pool_covers_a_full_match() {
        assert!(BotNamePool::default().capacity() >= 20);
    }

    #[test]
    fn oversized_names_are_rejected() {
        assert!(BotNamePool::default().validate().is_ok());

        let pool = BotNamePool::new(["Alpha".to_string(), "x".repeat(2000)]);
        assert!(matches!(pool.validate(), Err(LifecycleError::Configuration(_))));

        let pool = BotNamePool::new([String::new()]);
        assert!(pool.validate().is_err());
    }
}
