use std::collections::HashMap;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::LifecycleError;
use crate::team::Team;

/// Axis-aligned box a team's entities are placed in on (re)spawn.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnArea {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl SpawnArea {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let (min, max) = (self.min(), self.max());
        point.cmpge(min).all() && point.cmple(max).all()
    }

    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        let (min, max) = (self.min(), self.max());
        Vec3::new(
            rng.gen_range(min.x..=max.x),
            rng.gen_range(min.y..=max.y),
            rng.gen_range(min.z..=max.z),
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpawnAreas {
    areas: HashMap<Team, SpawnArea>,
}

impl SpawnAreas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, team: Team, area: SpawnArea) -> Self {
        self.insert(team, area);
        self
    }

    pub fn insert(&mut self, team: Team, area: SpawnArea) {
        self.areas.insert(team, area);
    }

    pub fn get(&self, team: Team) -> Result<&SpawnArea, LifecycleError> {
        self.areas.get(&team).ok_or_else(|| {
            LifecycleError::configuration(format!("no spawn area for team {}", team.as_str()))
        })
    }

    /// Every playable team needs bounds before the first spawn.
    pub fn validate(&self) -> Result<(), LifecycleError> {
        for team in Team::PLAYABLE {
            let area = self.get(team)?;
            if !area.center.is_finite() || !area.half_extents.is_finite() {
                return Err(LifecycleError::configuration(format!(
                    "spawn area for team {} has non-finite bounds",
                    team.as_str()
                )));
            }
        }
        Ok(())
    }
}
