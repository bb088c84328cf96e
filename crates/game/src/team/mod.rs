use std::collections::HashMap;

use crate::entity::EntityId;
use crate::error::{LifecycleError, NetMode};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
#[rkyv(derive(Debug))]
pub enum Team {
    #[default]
    Undefined,
    Red,
    Blue,
}

impl Team {
    pub const PLAYABLE: [Team; 2] = [Team::Red, Team::Blue];

    pub fn is_playable(self) -> bool {
        self != Team::Undefined
    }

    pub fn opponent(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
            Team::Undefined => Team::Undefined,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::Undefined => "undefined",
            Team::Red => "red",
            Team::Blue => "blue",
        }
    }
}

impl From<u8> for Team {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Red,
            2 => Self::Blue,
            _ => Self::Undefined,
        }
    }
}

/// Team used when both rosters hold the same number of entities.
pub const TIE_BREAK_TEAM: Team = Team::Red;

#[derive(Debug, Clone, Default)]
struct Roster {
    members: Vec<EntityId>,
    score: u32,
}

#[derive(Debug)]
pub struct TeamAssignmentService {
    mode: NetMode,
    tie_break: Team,
    assignments: HashMap<EntityId, Team>,
    rosters: HashMap<Team, Roster>,
}

impl TeamAssignmentService {
    pub fn new(mode: NetMode) -> Self {
        Self::with_tie_break(mode, TIE_BREAK_TEAM)
    }

    pub fn with_tie_break(mode: NetMode, tie_break: Team) -> Self {
        let tie_break = if tie_break.is_playable() {
            tie_break
        } else {
            TIE_BREAK_TEAM
        };
        Self {
            mode,
            tie_break,
            assignments: HashMap::new(),
            rosters: Team::PLAYABLE
                .iter()
                .map(|&team| (team, Roster::default()))
                .collect(),
        }
    }

    /// Places `entity` on the smaller team, or returns its existing team
    /// without touching any roster.
    pub fn assign_team(&mut self, entity: EntityId) -> Result<Team, LifecycleError> {
        self.mode.require_authority("team assignment")?;

        if let Some(&team) = self.assignments.get(&entity) {
            return Ok(team);
        }

        let team = self.smaller_team();
        self.assignments.insert(entity, team);
        if let Some(roster) = self.rosters.get_mut(&team) {
            roster.members.push(entity);
        }
        log::debug!("entity {} assigned to team {}", entity, team.as_str());

        Ok(team)
    }

    pub fn team_of(&self, entity: EntityId) -> Team {
        self.assignments
            .get(&entity)
            .copied()
            .unwrap_or(Team::Undefined)
    }

    pub fn smaller_team(&self) -> Team {
        let red = self.roster_len(Team::Red);
        let blue = self.roster_len(Team::Blue);
        match red.cmp(&blue) {
            std::cmp::Ordering::Less => Team::Red,
            std::cmp::Ordering::Greater => Team::Blue,
            std::cmp::Ordering::Equal => self.tie_break,
        }
    }

    pub fn roster(&self, team: Team) -> &[EntityId] {
        self.rosters
            .get(&team)
            .map(|r| r.members.as_slice())
            .unwrap_or(&[])
    }

    pub fn roster_len(&self, team: Team) -> usize {
        self.roster(team).len()
    }

    /// Drops a despawned entity from its roster so later assignments balance
    /// against live members only. Its id is never reassigned.
    pub fn release(&mut self, entity: EntityId) -> Option<Team> {
        let team = self.assignments.remove(&entity)?;
        if let Some(roster) = self.rosters.get_mut(&team) {
            roster.members.retain(|&member| member != entity);
        }
        Some(team)
    }

    pub fn add_score(&mut self, team: Team, points: u32) -> Result<u32, LifecycleError> {
        self.mode.require_authority("score update")?;
        let roster = self.rosters.get_mut(&team).ok_or_else(|| {
            LifecycleError::configuration(format!("team {} cannot score", team.as_str()))
        })?;
        roster.score = roster.score.saturating_add(points);
        Ok(roster.score)
    }

    pub fn score(&self, team: Team) -> u32 {
        self.rosters.get(&team).map(|r| r.score).unwrap_or(0)
    }

    pub fn scores(&self) -> [u32; 2] {
        [self.score(Team::Red), self.score(Team::Blue)]
    }

    pub fn leader(&self) -> Option<Team> {
        let [red, blue] = self.scores();
        match red.cmp(&blue) {
            std::cmp::Ordering::Greater => Some(Team::Red),
            std::cmp::Ordering::Less => Some(Team::Blue),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alternating_assignment_from_empty_rosters() {
        let mut teams = TeamAssignmentService::new(NetMode::Server);

        let assigned: Vec<Team> = (1..=5)
            .map(|id| teams.assign_team(EntityId(id)).unwrap())
            .collect();

        assert_eq!(
            assigned,
            vec![Team::Red, Team::Blue, Team::Red, Team::Blue, Team::Red]
        );
        assert_eq!(teams.roster_len(Team::Red), 3);
        assert_eq!(teams.roster_len(Team::Blue), 2);
    }

    #[test]
    fn test_assignment_is_idempotent() {
        let mut teams = TeamAssignmentService::new(NetMode::Server);

        let first = teams.assign_team(EntityId(1)).unwrap();
        let second = teams.assign_team(EntityId(1)).unwrap();

        assert_eq!(first, second);
        assert_eq!(teams.roster_len(first), 1);
        assert_eq!(teams.assigned_count(), 1);
    }

    #[test]
    fn test_tie_break_is_stable() {
        let teams = TeamAssignmentService::new(NetMode::Server);
        for _ in 0..10 {
            assert_eq!(teams.smaller_team(), Team::Red);
        }

        let teams = TeamAssignmentService::with_tie_break(NetMode::Server, Team::Blue);
        for _ in 0..10 {
            assert_eq!(teams.smaller_team(), Team::Blue);
        }
    }

    #[test]
    fn test_unknown_entity_is_undefined() {
        let teams = TeamAssignmentService::new(NetMode::Server);
        assert_eq!(teams.team_of(EntityId(42)), Team::Undefined);
    }

    #[test]
    fn test_client_context_is_rejected() {
        let mut teams = TeamAssignmentService::new(NetMode::Client);

        let result = teams.assign_team(EntityId(1));

        assert!(matches!(result, Err(LifecycleError::ProtocolViolation(_))));
        assert_eq!(teams.assigned_count(), 0);
        assert_eq!(teams.roster_len(Team::Red), 0);
    }

    #[test]
    fn test_release_rebalances() {
        let mut teams = TeamAssignmentService::new(NetMode::Server);
        teams.assign_team(EntityId(1)).unwrap();
        teams.assign_team(EntityId(2)).unwrap();

        assert_eq!(teams.release(EntityId(1)), Some(Team::Red));
        assert_eq!(teams.release(EntityId(1)), None);
        assert_eq!(teams.assign_team(EntityId(3)).unwrap(), Team::Red);
    }

    #[test]
    fn test_scores() {
        let mut teams = TeamAssignmentService::new(NetMode::Server);

        assert_eq!(teams.add_score(Team::Blue, 2).unwrap(), 2);
        assert_eq!(teams.add_score(Team::Blue, 1).unwrap(), 3);
        assert_eq!(teams.scores(), [0, 3]);
        assert_eq!(teams.leader(), Some(Team::Blue));
        assert!(teams.add_score(Team::Undefined, 1).is_err());
    }
}
