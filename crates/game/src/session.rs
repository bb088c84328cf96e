use std::collections::VecDeque;

use crate::entity::{ConnectionId, Entity, EntityId, EntityKind};
use crate::error::{LifecycleError, NetMode};
use crate::event::{MatchEvent, Outbox, Recipient};
use crate::game_over::{GameOverCoordinator, MatchPhase};
use crate::health::{HealthModification, HealthOutcome, HealthReplicationService};
use crate::lifecycle::{EntityLifecycleController, LifecycleContext};
use crate::net::{
    ClientMessage, ClientPacket, ConnectionManager, ServerMessage, ServerPacket, Transport,
    WireError,
};
use crate::scene::{LoadProgress, SceneTransitionCoordinator, match_start_requests};
use crate::settings::MatchSettings;
use crate::spawn::{SpawnCoordinator, SpawnRequest};
use crate::team::{Team, TeamAssignmentService};

#[derive(Debug, Clone)]
pub struct MatchStats {
    pub tick: u32,
    pub phase: MatchPhase,
    pub started: bool,
    pub client_count: usize,
    pub loaded_clients: usize,
    pub entity_count: usize,
    pub live_bots: usize,
    pub bot_spawn_requests: u64,
    pub red_roster: usize,
    pub blue_roster: usize,
    pub scores: [u32; 2],
}

/// The authoritative match. Every mutation of shared state happens through
/// `&mut self` on the server's single tick thread.
#[derive(Debug)]
pub struct Match {
    settings: MatchSettings,
    connections: ConnectionManager,
    scene: SceneTransitionCoordinator,
    teams: TeamAssignmentService,
    spawner: SpawnCoordinator,
    health: HealthReplicationService,
    game_over: GameOverCoordinator,
    outbox: Outbox,
    events: VecDeque<MatchEvent>,
    pending_bot_init: Vec<EntityId>,
    pending_respawns: Vec<(u32, EntityId)>,
    bot_spawn_requests: u64,
    tick: u32,
}

impl Match {
    pub fn new(settings: MatchSettings) -> Result<Self, LifecycleError> {
        let spawner = SpawnCoordinator::new(
            NetMode::Server,
            settings.capacity_target,
            settings.spawn_areas(),
            settings.bot_name_pool(),
            settings.rng(),
        )?;

        Ok(Self {
            connections: ConnectionManager::new(settings.max_clients),
            scene: SceneTransitionCoordinator::new(),
            teams: TeamAssignmentService::with_tie_break(NetMode::Server, settings.tie_break_team),
            spawner,
            health: HealthReplicationService::new(NetMode::Server, settings.max_hp),
            game_over: GameOverCoordinator::new(),
            outbox: Outbox::new(),
            events: VecDeque::new(),
            pending_bot_init: Vec::new(),
            pending_respawns: Vec::new(),
            bot_spawn_requests: 0,
            tick: 0,
            settings,
        })
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub fn tick_count(&self) -> u32 {
        self.tick
    }

    pub fn phase(&self) -> MatchPhase {
        self.game_over.phase()
    }

    pub fn teams(&self) -> &TeamAssignmentService {
        &self.teams
    }

    pub fn spawner(&self) -> &SpawnCoordinator {
        &self.spawner
    }

    pub fn health(&self) -> &HealthReplicationService {
        &self.health
    }

    pub fn scene(&self) -> &SceneTransitionCoordinator {
        &self.scene
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn entity(&self, entity: EntityId) -> Option<&Entity> {
        self.spawner.get(entity)
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = MatchEvent> + '_ {
        self.events.drain(..)
    }

    /// Registers a new connection. Connecting an id that is already connected
    /// changes nothing.
    pub fn connect(&mut self, client: ConnectionId) -> Result<(), LifecycleError> {
        if self.connections.is_connected(client) {
            log::debug!("client {} is already connected", client);
            return Ok(());
        }
        self.connections.connect(client, self.tick)?;
        self.scene.client_connected(client);
        self.spawner
            .set_connected_clients(self.connections.connected_count());

        for bot in self.spawner.excess_bots() {
            self.lifecycle().despawn(bot);
            self.events
                .push_back(MatchEvent::EntityDespawned { entity: bot });
        }

        log::info!("client {} connected", client);
        self.events
            .push_back(MatchEvent::ClientConnected { client });
        Ok(())
    }

    /// Reaps everything the connection owned. Unknown clients are ignored.
    pub fn disconnect(&mut self, client: ConnectionId) {
        if self.connections.remove(client).is_none() {
            return;
        }
        self.spawner
            .set_connected_clients(self.connections.connected_count());

        let owned = self.spawner.owned_by(client);
        let reaped = owned.len();
        for entity in owned {
            self.lifecycle().despawn(entity);
        }

        log::info!("client {} disconnected, reaped {} entities", client, reaped);
        self.events
            .push_back(MatchEvent::ClientDisconnected { client, reaped });

        if let LoadProgress::StartMatch { clients } = self.scene.client_disconnected(client) {
            self.start_match(&clients);
        }
    }

    pub fn handle_packet(&mut self, client: ConnectionId, data: &[u8]) -> Result<(), WireError> {
        let packet = ClientPacket::deserialize(data)?;

        let Some(connection) = self.connections.get_mut(client) else {
            log::debug!("dropping packet from unknown client {}", client);
            return Ok(());
        };
        if !connection.accept_sequence(packet.header.sequence) {
            log::debug!(
                "dropping stale packet {} from client {}",
                packet.header.sequence,
                client
            );
            return Ok(());
        }

        self.handle_message(client, packet.message);
        Ok(())
    }

    pub fn handle_message(&mut self, client: ConnectionId, message: ClientMessage) {
        if !self.connections.is_connected(client) {
            return;
        }

        match message {
            ClientMessage::NotifySceneLoaded { client: claimed } => {
                if claimed != client {
                    self.drop_request(client, "scene ack on behalf of another client");
                    return;
                }
                self.on_scene_loaded(client);
            }
            ClientMessage::RequestPlayerSpawn { client: claimed } => {
                if claimed != client {
                    self.drop_request(client, "spawn request on behalf of another client");
                    return;
                }
                if !self.scene.is_loaded(client) {
                    self.drop_request(client, "spawn requested before scene load");
                    return;
                }
                if !self.scene.is_started() {
                    self.drop_request(client, "spawn requested before match start");
                    return;
                }
                self.spawn_player(client);
            }
            ClientMessage::AckEntity { entity } => self.on_entity_acknowledged(client, entity),
            ClientMessage::RequestTeamAssignment { entity } => {
                self.on_team_assignment_requested(client, entity)
            }
        }
    }

    pub fn request_bot_spawn(&mut self) -> Result<EntityId, LifecycleError> {
        if !self.game_over.is_active() {
            return Err(LifecycleError::CapacityExceeded {
                what: "bot slots after game over",
                limit: 0,
            });
        }
        self.bot_spawn_requests += 1;

        let entity = self
            .spawner
            .request_spawn(SpawnRequest::bot(), &mut self.outbox)?;
        self.pending_bot_init.push(entity);
        self.events.push_back(MatchEvent::EntitySpawned {
            entity,
            kind: EntityKind::Bot,
            owner: None,
        });
        Ok(entity)
    }

    /// Gameplay hook for the combat layer. Dropped silently once the match is
    /// over or when the target is gone.
    pub fn modify_health(
        &mut self,
        target: EntityId,
        kind: HealthModification,
        amount: u32,
        source: Option<EntityId>,
    ) -> Option<HealthOutcome> {
        if !self.game_over.is_active() {
            return None;
        }

        let outcome = self
            .health
            .modify_health(target, kind, amount, source, &mut self.outbox)?;
        if outcome.died {
            self.on_death(target, source);
        }
        Some(outcome)
    }

    pub fn trigger_game_over(&mut self) -> bool {
        let tick = self.tick;
        let mut ctx = LifecycleContext::new(
            &mut self.spawner,
            &mut self.teams,
            &mut self.health,
            &mut self.outbox,
        );
        if !self.game_over.trigger_game_over(&mut ctx, tick) {
            return false;
        }

        self.pending_bot_init.clear();
        self.pending_respawns.clear();
        true
    }

    pub fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);

        if self.game_over.advance(self.tick, &mut self.outbox) {
            let winner = self.teams.leader();
            log::info!(
                "match over, winner: {}",
                winner.map(Team::as_str).unwrap_or("draw")
            );
            self.events.push_back(MatchEvent::GameOver { winner });
        }

        if !self.game_over.is_active() || !self.scene.is_started() {
            return;
        }

        for entity in std::mem::take(&mut self.pending_bot_init) {
            if let Some(record) = self.spawner.get_mut(entity) {
                record.acknowledged = true;
                self.initialize_entity(entity);
            }
        }

        let tick = self.tick;
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_respawns)
            .into_iter()
            .partition(|&(at, _)| at <= tick);
        self.pending_respawns = waiting;
        for (_, entity) in due {
            self.respawn_entity(entity);
        }

        for _ in 0..self.spawner.bot_deficit() {
            if let Err(err) = self.request_bot_spawn() {
                log::warn!("bot refill stopped: {}", err);
                break;
            }
        }
    }

    /// Encodes and hands every queued server message to `transport`. A
    /// message that fails is logged and skipped; the rest still go out and
    /// the first failure is returned afterwards.
    pub fn flush<T: Transport>(&mut self, transport: &mut T) -> Result<usize, WireError> {
        let outgoing: Vec<_> = self.outbox.drain().collect();
        let mut sent = 0;
        let mut first_error = None;

        for item in outgoing {
            let recipients = match item.recipient {
                Recipient::All => self.connections.ids(),
                Recipient::Client(client) => vec![client],
            };
            for client in recipients {
                let Some(connection) = self.connections.get_mut(client) else {
                    continue;
                };
                let packet = ServerPacket::new(connection.next_send_sequence(), item.message.clone());
                let result = packet
                    .serialize()
                    .and_then(|bytes| transport.send(client, bytes));
                match result {
                    Ok(()) => sent += 1,
                    Err(WireError::UnknownClient(_)) => {
                        log::debug!("transport has no route to client {}", client);
                    }
                    Err(err) => {
                        log::error!("failed to send {:?} to client {}: {}", item.message, client, err);
                        first_error.get_or_insert(err);
                    }
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(sent),
        }
    }

    pub fn stats(&self) -> MatchStats {
        MatchStats {
            tick: self.tick,
            phase: self.game_over.phase(),
            started: self.scene.is_started(),
            client_count: self.connections.connected_count(),
            loaded_clients: self.scene.loaded_count(),
            entity_count: self.spawner.len(),
            live_bots: self.spawner.live_bot_count(),
            bot_spawn_requests: self.bot_spawn_requests,
            red_roster: self.teams.roster_len(Team::Red),
            blue_roster: self.teams.roster_len(Team::Blue),
            scores: self.teams.scores(),
        }
    }

    fn lifecycle(&mut self) -> LifecycleContext<'_> {
        LifecycleContext::new(
            &mut self.spawner,
            &mut self.teams,
            &mut self.health,
            &mut self.outbox,
        )
    }

    fn drop_request(&mut self, client: ConnectionId, reason: &str) {
        log::warn!("dropping request from client {}: {}", client, reason);
        self.events.push_back(MatchEvent::RequestDropped {
            client,
            reason: reason.to_string(),
        });
    }

    fn on_scene_loaded(&mut self, client: ConnectionId) {
        match self.scene.notify_loaded(client) {
            LoadProgress::Waiting { loaded, expected } => {
                self.events.push_back(MatchEvent::SceneLoaded {
                    client,
                    loaded,
                    expected,
                });
            }
            LoadProgress::StartMatch { clients } => {
                let expected = clients.len();
                self.events.push_back(MatchEvent::SceneLoaded {
                    client,
                    loaded: expected,
                    expected,
                });
                self.start_match(&clients);
            }
            LoadProgress::LateJoin(client) => {
                self.sync_client(client);
                self.spawn_player(client);
            }
            LoadProgress::Duplicate | LoadProgress::UnknownClient => {
                log::debug!("ignoring repeated scene ack from client {}", client);
            }
        }
    }

    /// Sends a late joiner the state every other client already holds.
    fn sync_client(&mut self, client: ConnectionId) {
        let mut replay = Vec::new();
        for entity in self.spawner.entities() {
            replay.push(ServerMessage::SpawnedEntity {
                entity: entity.id,
                is_bot: entity.is_bot(),
                owner: entity.owner,
                name: entity.name.clone(),
            });
            if entity.team.is_playable() {
                replay.push(ServerMessage::TeamAssigned {
                    entity: entity.id,
                    team: entity.team,
                });
            }
            if !entity.initialized {
                continue;
            }
            if let Some(transform) = entity.transform {
                replay.push(ServerMessage::Respawned {
                    entity: entity.id,
                    position: transform.position.into(),
                });
            }
            replay.extend(self.health.snapshot(entity.id));
        }

        log::debug!("replaying {} entities to client {}", self.spawner.len(), client);
        for message in replay {
            self.outbox.send_to(client, message);
        }
    }

    fn start_match(&mut self, clients: &[ConnectionId]) {
        if !self.game_over.is_active() {
            return;
        }

        let mut players = 0;
        let mut bots = 0;
        for request in match_start_requests(clients, self.settings.capacity_target) {
            match request.requester {
                Some(client) if !request.is_bot => {
                    if self.spawn_player(client).is_some() {
                        players += 1;
                    }
                }
                _ => match self.request_bot_spawn() {
                    Ok(_) => bots += 1,
                    Err(err) => log::warn!("bot spawn rejected: {}", err),
                },
            }
        }

        log::info!("match started with {} players and {} bots", players, bots);
        self.events
            .push_back(MatchEvent::MatchStarted { players, bots });
    }

    fn spawn_player(&mut self, client: ConnectionId) -> Option<EntityId> {
        if !self.game_over.is_active() {
            return None;
        }

        match self
            .spawner
            .request_spawn(SpawnRequest::player(client), &mut self.outbox)
        {
            Ok(entity) => {
                if let Some(connection) = self.connections.get_mut(client) {
                    if connection.entity_id != Some(entity) {
                        connection.entity_id = Some(entity);
                        self.events.push_back(MatchEvent::EntitySpawned {
                            entity,
                            kind: EntityKind::Player,
                            owner: Some(client),
                        });
                    }
                }
                Some(entity)
            }
            Err(err) => {
                log::warn!("player spawn for client {} rejected: {}", client, err);
                None
            }
        }
    }

    fn on_entity_acknowledged(&mut self, client: ConnectionId, entity: EntityId) {
        let Some(record) = self.spawner.get_mut(entity) else {
            return;
        };
        if !record.is_owned_by(client) {
            self.drop_request(client, "ack for an entity the client does not own");
            return;
        }
        if record.acknowledged {
            return;
        }
        record.acknowledged = true;
        self.initialize_entity(entity);
    }

    fn on_team_assignment_requested(&mut self, client: ConnectionId, entity: EntityId) {
        if !self.spawner.contains(entity) {
            return;
        }
        match self.teams.assign_team(entity) {
            Ok(team) => {
                self.outbox
                    .send_to(client, ServerMessage::TeamAssigned { entity, team });
            }
            Err(err) => log::warn!("team assignment for {} failed: {}", entity, err),
        }
    }

    fn initialize_entity(&mut self, entity: EntityId) {
        let Some(record) = self.spawner.get(entity) else {
            return;
        };
        let (is_bot, owner) = (record.is_bot(), record.owner);

        let team = match self.teams.assign_team(entity) {
            Ok(team) => team,
            Err(err) => {
                log::warn!("team assignment for {} failed: {}", entity, err);
                return;
            }
        };
        self.outbox
            .broadcast(ServerMessage::TeamAssigned { entity, team });

        let controller = EntityLifecycleController::new(entity);
        let initialized = controller.initialize(&mut self.lifecycle(), is_bot, owner, team);
        match initialized {
            Ok(Some(position)) => {
                self.events
                    .push_back(MatchEvent::EntityInitialized { entity, team });
                self.events.push_back(MatchEvent::EntityRespawned {
                    entity,
                    position: position.into(),
                });
            }
            Ok(None) | Err(LifecycleError::StaleReference(_)) => {}
            Err(err) => log::error!("failed to initialize {}: {}", entity, err),
        }
    }

    fn respawn_entity(&mut self, entity: EntityId) {
        let respawned = EntityLifecycleController::new(entity).respawn(&mut self.lifecycle());
        match respawned {
            Ok(position) => {
                self.events.push_back(MatchEvent::EntityRespawned {
                    entity,
                    position: position.into(),
                });
            }
            Err(LifecycleError::StaleReference(_)) => {}
            Err(err) => log::error!("failed to respawn {}: {}", entity, err),
        }
    }

    fn on_death(&mut self, victim: EntityId, killer: Option<EntityId>) {
        self.events
            .push_back(MatchEvent::EntityDied { entity: victim, killer });

        self.credit_kill(victim, killer);
        if !self.game_over.is_active() {
            return;
        }

        let is_bot = self.spawner.get(victim).is_some_and(Entity::is_bot);
        if is_bot {
            self.lifecycle().despawn(victim);
            self.events
                .push_back(MatchEvent::EntityDespawned { entity: victim });
        } else {
            let due = self.tick.wrapping_add(self.settings.respawn_delay_ticks);
            self.pending_respawns.push((due, victim));
        }
    }

    fn credit_kill(&mut self, victim: EntityId, killer: Option<EntityId>) {
        let Some(killer) = killer.filter(|&k| k != victim) else {
            return;
        };
        let killer_team = self.teams.team_of(killer);
        if !killer_team.is_playable() || killer_team == self.teams.team_of(victim) {
            return;
        }

        let score = match self.teams.add_score(killer_team, self.settings.kill_score) {
            Ok(score) => score,
            Err(err) => {
                log::warn!("score update failed: {}", err);
                return;
            }
        };
        let [red, blue] = self.teams.scores();
        self.outbox
            .broadcast(ServerMessage::ScoreUpdate { red, blue });
        self.events.push_back(MatchEvent::ScoreChanged { red, blue });

        if self.settings.score_limit.is_some_and(|limit| score >= limit) {
            log::info!("team {} reached the score limit", killer_team.as_str());
            self.trigger_game_over();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Damageable;

    fn settings(capacity: usize) -> MatchSettings {
        MatchSettings {
            capacity_target: capacity,
            max_clients: 8,
            respawn_delay_ticks: 2,
            score_limit: Some(3),
            rng_seed: Some(42),
            ..Default::default()
        }
    }

    fn started_match(clients: &[ConnectionId], capacity: usize) -> Match {
        let mut game = Match::new(settings(capacity)).unwrap();
        for &client in clients {
            game.connect(client).unwrap();
        }
        for &client in clients {
            game.handle_message(client, ClientMessage::NotifySceneLoaded { client });
        }
        game
    }

    #[test]
    fn two_clients_and_capacity_twenty_request_eighteen_bots() {
        let game = started_match(&[1, 2], 20);

        let stats = game.stats();
        assert!(stats.started);
        assert_eq!(stats.bot_spawn_requests, 18);
        assert_eq!(stats.live_bots, 18);
        assert_eq!(stats.entity_count, 20);
    }

    #[test]
    fn match_waits_for_every_scene_ack() {
        let mut game = Match::new(settings(4)).unwrap();
        game.connect(1).unwrap();
        game.connect(2).unwrap();

        game.handle_message(1, ClientMessage::NotifySceneLoaded { client: 1 });
        game.handle_message(1, ClientMessage::NotifySceneLoaded { client: 1 });

        assert!(!game.scene().is_started());
        assert_eq!(game.spawner().len(), 0);

        game.handle_message(2, ClientMessage::NotifySceneLoaded { client: 2 });
        assert!(game.scene().is_started());
    }

    #[test]
    fn ack_for_foreign_entity_is_dropped() {
        let mut game = started_match(&[1, 2], 2);
        let entity = game.spawner().player_of(1).unwrap();

        game.handle_message(2, ClientMessage::AckEntity { entity });

        assert!(!game.entity(entity).unwrap().initialized);
        assert!(
            game.drain_events()
                .any(|e| matches!(e, MatchEvent::RequestDropped { client: 2, .. }))
        );
    }

    #[test]
    fn bots_initialize_on_the_next_tick() {
        let mut game = started_match(&[1], 3);
        assert!(game.spawner().entities().filter(|e| e.is_bot()).all(|e| !e.initialized));

        game.tick();

        assert!(game.spawner().entities().filter(|e| e.is_bot()).all(|e| e.initialized));
        assert_eq!(game.stats().red_roster + game.stats().blue_roster, 2);
    }

    #[test]
    fn player_initializes_after_ack() {
        let mut game = started_match(&[1], 1);
        let entity = game.spawner().player_of(1).unwrap();

        game.handle_message(1, ClientMessage::AckEntity { entity });

        let record = game.entity(entity).unwrap();
        assert!(record.initialized);
        assert_eq!(record.team, Team::Red);
        assert!(game.health().is_alive(entity));
    }

    #[test]
    fn team_request_for_despawned_entity_is_dropped() {
        let mut game = started_match(&[1], 1);
        let entity = game.spawner().player_of(1).unwrap();
        game.disconnect(1);
        game.connect(1).unwrap();

        game.handle_message(1, ClientMessage::RequestTeamAssignment { entity });

        assert_eq!(game.teams().team_of(entity), Team::Undefined);
    }

    #[test]
    fn disconnect_reaps_owned_entities_and_refills_bots() {
        let mut game = started_match(&[1, 2], 4);
        let entity = game.spawner().player_of(2).unwrap();

        game.disconnect(2);
        assert!(game.entity(entity).is_none());

        game.tick();
        assert_eq!(game.stats().live_bots, 3);
    }

    #[test]
    fn new_client_displaces_a_bot() {
        let mut game = started_match(&[1], 3);
        assert_eq!(game.stats().live_bots, 2);

        game.connect(2).unwrap();

        assert_eq!(game.stats().live_bots, 1);
        game.handle_message(2, ClientMessage::NotifySceneLoaded { client: 2 });
        assert!(game.spawner().player_of(2).is_some());
        assert_eq!(game.stats().entity_count, 3);
    }

    #[test]
    fn killed_bot_is_replaced_and_scores() {
        let mut game = started_match(&[1], 3);
        let player = game.spawner().player_of(1).unwrap();
        game.handle_message(1, ClientMessage::AckEntity { entity: player });
        game.tick();

        let bot = game
            .spawner()
            .entities()
            .find(|e| e.is_bot() && e.team != game.teams().team_of(player))
            .map(|e| e.id)
            .unwrap();
        let outcome = game
            .modify_health(bot, HealthModification::Damage, 500, Some(player))
            .unwrap();

        assert!(outcome.died);
        assert!(game.entity(bot).is_none());
        assert_eq!(game.teams().score(game.teams().team_of(player)), 1);

        game.tick();
        assert_eq!(game.stats().live_bots, 2);
    }

    #[test]
    fn dead_player_respawns_after_delay() {
        let mut game = started_match(&[1], 1);
        let player = game.spawner().player_of(1).unwrap();
        game.handle_message(1, ClientMessage::AckEntity { entity: player });

        game.modify_health(player, HealthModification::Damage, 100, None);
        assert!(!game.health().is_alive(player));
        assert!(game.modify_health(player, HealthModification::Heal, 10, None).is_none());

        game.tick();
        assert!(!game.health().is_alive(player));
        game.tick();
        assert!(game.health().is_alive(player));
        assert_eq!(game.health().get(player).map(|h| h.hit_points()), Some(100));
    }

    #[test]
    fn score_limit_ends_the_match_once() {
        let mut game = started_match(&[1], 8);
        let player = game.spawner().player_of(1).unwrap();
        game.handle_message(1, ClientMessage::AckEntity { entity: player });
        game.tick();
        let own_team = game.teams().team_of(player);

        let mut kills = 0;
        for _ in 0..20 {
            if game.phase() != MatchPhase::Active {
                break;
            }
            let enemy = game
                .spawner()
                .entities()
                .find(|e| e.is_bot() && e.initialized && e.team != own_team)
                .map(|e| e.id);
            if let Some(enemy) = enemy {
                game.modify_health(enemy, HealthModification::Damage, 1000, Some(player));
                kills += 1;
            }
            game.tick();
        }

        assert_eq!(kills, 3);
        assert_eq!(game.teams().score(own_team), 3);
        assert_ne!(game.phase(), MatchPhase::Active);
        assert!(game.spawner().is_empty());
        assert!(!game.trigger_game_over());

        game.tick();
        assert_eq!(game.phase(), MatchPhase::Ended);
        let game_overs = game
            .outbox()
            .pending()
            .filter(|o| o.message == ServerMessage::GameOver)
            .count();
        assert_eq!(game_overs, 1);
    }

    #[test]
    fn spawn_request_before_match_start_is_dropped() {
        let mut game = Match::new(settings(4)).unwrap();
        game.connect(1).unwrap();
        game.connect(2).unwrap();
        game.handle_message(1, ClientMessage::NotifySceneLoaded { client: 1 });
        game.drain_events().for_each(drop);

        game.handle_message(1, ClientMessage::RequestPlayerSpawn { client: 1 });

        assert!(!game.scene().is_started());
        assert!(game.spawner().player_of(1).is_none());
        assert!(game.spawner().is_empty());
        assert!(
            game.drain_events()
                .any(|e| matches!(e, MatchEvent::RequestDropped { client: 1, .. }))
        );
    }

    #[test]
    fn reconnecting_a_connected_client_changes_nothing() {
        let mut game = started_match(&[1], 3);
        game.drain_events().for_each(drop);

        game.connect(1).unwrap();

        assert_eq!(game.stats().client_count, 1);
        assert_eq!(game.stats().live_bots, 2);
        assert_eq!(game.drain_events().count(), 0);
    }

    #[test]
    fn replayed_packet_is_ignored() {
        let mut game = Match::new(settings(4)).unwrap();
        game.connect(1).unwrap();
        game.connect(2).unwrap();
        let spoofed = ClientPacket::new(5, ClientMessage::NotifySceneLoaded { client: 2 })
            .serialize()
            .unwrap();
        game.handle_packet(1, &spoofed).unwrap();
        game.drain_events().for_each(drop);

        game.handle_packet(1, &spoofed).unwrap();
        let older = ClientPacket::new(4, ClientMessage::NotifySceneLoaded { client: 1 })
            .serialize()
            .unwrap();
        game.handle_packet(1, &older).unwrap();

        assert_eq!(game.drain_events().count(), 0);
        assert!(!game.scene().is_loaded(1));
    }

    #[test]
    fn late_joiner_is_sent_existing_entities() {
        let mut game = started_match(&[1], 3);
        let player = game.spawner().player_of(1).unwrap();
        game.handle_message(1, ClientMessage::AckEntity { entity: player });
        game.tick();
        game.modify_health(player, HealthModification::Damage, 10, None);
        game.outbox.drain().for_each(drop);

        game.connect(2).unwrap();
        game.handle_message(2, ClientMessage::NotifySceneLoaded { client: 2 });

        let direct: Vec<_> = game
            .outbox()
            .pending()
            .filter(|o| o.recipient == Recipient::Client(2))
            .map(|o| o.message.clone())
            .collect();
        let existing: Vec<_> = game
            .spawner()
            .entities()
            .filter(|e| e.owner != Some(2))
            .map(|e| e.id)
            .collect();
        assert_eq!(existing.len(), 2);

        for entity in existing {
            assert!(direct.iter().any(
                |m| matches!(m, ServerMessage::SpawnedEntity { entity: e, .. } if *e == entity)
            ));
            assert!(direct.iter().any(
                |m| matches!(m, ServerMessage::TeamAssigned { entity: e, .. } if *e == entity)
            ));
            assert!(direct.iter().any(
                |m| matches!(m, ServerMessage::Respawned { entity: e, .. } if *e == entity)
            ));
        }
        assert!(direct.iter().any(|m| matches!(
            m,
            ServerMessage::UpdateHealth { entity, hp: 90, sequence: 2, .. } if *entity == player
        )));
    }

    #[test]
    fn oversized_bot_name_is_a_configuration_error() {
        let mut config = settings(4);
        config.bot_names[0] = "x".repeat(2000);

        assert!(matches!(
            Match::new(config),
            Err(LifecycleError::Configuration(_))
        ));
    }

    struct RefusingTransport {
        refused: ConnectionId,
        delivered: Vec<ConnectionId>,
    }

    impl Transport for RefusingTransport {
        fn send(&mut self, client: ConnectionId, payload: Vec<u8>) -> Result<(), WireError> {
            if client == self.refused {
                return Err(WireError::TooLarge(payload.len()));
            }
            self.delivered.push(client);
            Ok(())
        }
    }

    #[test]
    fn failed_send_does_not_lose_other_messages() {
        let mut game = started_match(&[1, 2], 2);
        let queued = game.outbox().len();
        assert!(queued > 0);
        let mut transport = RefusingTransport {
            refused: 1,
            delivered: Vec::new(),
        };

        let result = game.flush(&mut transport);

        assert!(matches!(result, Err(WireError::TooLarge(_))));
        assert!(game.outbox().is_empty());
        assert_eq!(transport.delivered.iter().filter(|&&c| c == 2).count(), queued);
    }
}
