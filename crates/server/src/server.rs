use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;

use skyward::net::NetworkStats;
use skyward::{
    ClientMessage, ConnectionId, Damageable, LifecycleError, LoopbackTransport, Match, MatchPhase,
    MatchStats, ReplicaWorld, Team,
};

use crate::config::ServerConfig;
use crate::events::{DisconnectReason, ServerEvent};
use crate::skirmish::Skirmish;

/// Hosts one authoritative match and drives it at a fixed tick rate. Clients
/// are simulated in-process over a loopback transport.
pub struct GameServer {
    game: Match,
    transport: LoopbackTransport,
    clients: BTreeMap<ConnectionId, ReplicaWorld>,
    skirmish: Skirmish,
    config: ServerConfig,
    next_client_id: ConnectionId,
    late_joiners_left: u32,
    tick_duration: Duration,
    last_tick_time: Instant,
    accumulator: Duration,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Result<Self, LifecycleError> {
        if config.tick_rate == 0 {
            return Err(LifecycleError::configuration("tick rate must be positive"));
        }
        let game = Match::new(config.settings.clone())?;
        let skirmish_rng = match config.settings.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(1)),
            None => StdRng::from_entropy(),
        };

        let mut server = Self {
            game,
            transport: LoopbackTransport::new(),
            clients: BTreeMap::new(),
            skirmish: Skirmish::new(config.skirmish.clone(), skirmish_rng),
            next_client_id: 1,
            late_joiners_left: config.late_joiners,
            tick_duration: Duration::from_secs_f64(1.0 / config.tick_rate as f64),
            last_tick_time: Instant::now(),
            accumulator: Duration::ZERO,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        };

        for _ in 0..server.config.simulated_clients {
            server.connect_client()?;
        }
        Ok(server)
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Opens a loopback connection and has the new client report its scene
    /// as loaded.
    pub fn connect_client(&mut self) -> Result<ConnectionId, LifecycleError> {
        let client = self.next_client_id;
        self.game.connect(client)?;
        self.next_client_id += 1;

        self.transport.open(client);
        let replica = ReplicaWorld::new(client);
        let loaded = replica.scene_loaded_message();
        self.clients.insert(client, replica);
        self.send_from_client(client, loaded);

        self.pending_events
            .push_back(ServerEvent::ClientJoined { client });
        Ok(client)
    }

    pub fn kick_client(&mut self, client: ConnectionId) {
        self.disconnect_client(client, DisconnectReason::Kicked);
    }

    pub fn disconnect_client(&mut self, client: ConnectionId, reason: DisconnectReason) {
        if self.clients.remove(&client).is_none() {
            return;
        }
        self.transport.close(client);
        self.game.disconnect(client);
        self.pending_events
            .push_back(ServerEvent::ClientLeft { client, reason });
    }

    /// Operator override: ends the match now regardless of score.
    pub fn end_match(&mut self) -> bool {
        self.game.trigger_game_over()
    }

    pub fn shutdown_connections(&mut self) {
        let clients: Vec<ConnectionId> = self.clients.keys().copied().collect();
        for client in clients {
            self.disconnect_client(client, DisconnectReason::Graceful);
        }
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_tick_time;
        self.last_tick_time = now;
        self.accumulator += delta;

        while self.accumulator >= self.tick_duration {
            self.accumulator -= self.tick_duration;
            self.tick();
        }
    }

    pub fn tick(&mut self) {
        self.process_inbound();

        self.game.tick();
        if self.game.phase() == MatchPhase::Active && self.game.scene().is_started() {
            self.skirmish.step(&mut self.game);
            self.admit_late_joiner();
        }

        if let Err(err) = self.game.flush(&mut self.transport) {
            self.report(format!("Failed to flush server messages: {}", err));
        }
        self.deliver_to_clients();

        self.pending_events
            .extend(self.game.drain_events().map(ServerEvent::Match));
    }

    fn admit_late_joiner(&mut self) {
        let second = self.config.tick_rate.max(1);
        if self.late_joiners_left == 0 || self.game.tick_count() % second != 0 {
            return;
        }
        self.late_joiners_left -= 1;
        if let Err(err) = self.connect_client() {
            self.report(format!("Late joiner rejected: {}", err));
        }
    }

    fn process_inbound(&mut self) {
        for (client, bytes) in self.transport.poll_server() {
            if let Err(err) = self.game.handle_packet(client, &bytes) {
                self.report(format!("Bad packet from client {}: {}", client, err));
            }
        }
    }

    fn deliver_to_clients(&mut self) {
        let ids: Vec<ConnectionId> = self.clients.keys().copied().collect();
        for client in ids {
            let messages = match self.transport.receive(client) {
                Ok(messages) => messages,
                Err(err) => {
                    self.report(format!("Client {} could not decode: {}", client, err));
                    continue;
                }
            };

            let Some(replica) = self.clients.get_mut(&client) else {
                continue;
            };
            let replies: Vec<_> = messages.iter().flat_map(|m| replica.apply(m)).collect();
            replica.drain_notifications().for_each(drop);

            for reply in replies {
                self.send_from_client(client, reply);
            }
        }
    }

    fn send_from_client(&mut self, client: ConnectionId, message: ClientMessage) {
        if let Err(err) = self.transport.send_to_server(client, message) {
            self.report(format!("Client {} send failed: {}", client, err));
        }
    }

    fn report(&mut self, message: String) {
        log::error!("{}", message);
        self.pending_events
            .push_back(ServerEvent::Error { message });
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            game: self.game.stats(),
            max_clients: self.config.settings.max_clients,
            capacity_target: self.config.settings.capacity_target,
            uptime_secs: self.start_time.elapsed().as_secs(),
            network_stats: self.transport.stats().clone(),
        }
    }

    pub fn client_infos(&self) -> Vec<ClientInfo> {
        self.clients
            .values()
            .map(|replica| {
                let own = replica.own_entity();
                ClientInfo {
                    client_id: replica.client(),
                    entity: own.map(|e| e.id.to_string()),
                    team: own.map(|e| e.team).unwrap_or_default(),
                    hp: own.map(|e| (e.health.hp(), e.health.max_hp())),
                    known_entities: replica.len(),
                }
            })
            .collect()
    }

    pub fn entity_rows(&self) -> Vec<EntityRow> {
        self.game
            .spawner()
            .entities()
            .map(|entity| {
                let health = self.game.health().get(entity.id);
                EntityRow {
                    id: entity.id.to_string(),
                    name: entity.name.clone(),
                    is_bot: entity.is_bot(),
                    team: entity.team,
                    hp: health.map(|h| (h.hit_points(), h.max_hit_points())),
                    alive: self.game.health().is_alive(entity.id),
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub game: MatchStats,
    pub max_clients: usize,
    pub capacity_target: usize,
    pub uptime_secs: u64,
    pub network_stats: NetworkStats,
}

#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub client_id: ConnectionId,
    pub entity: Option<String>,
    pub team: Team,
    pub hp: Option<(u32, u32)>,
    pub known_entities: usize,
}

#[derive(Debug, Clone)]
pub struct EntityRow {
    pub id: String,
    pub name: String,
    pub is_bot: bool,
    pub team: Team,
    pub hp: Option<(u32, u32)>,
    pub alive: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyward::MatchSettings;

    use crate::config::SkirmishConfig;

    fn config(clients: u32) -> ServerConfig {
        ServerConfig {
            simulated_clients: clients,
            skirmish: SkirmishConfig {
                hit_chance: 0.0,
                repair_chance: 0.0,
                ..Default::default()
            },
            settings: MatchSettings {
                capacity_target: 6,
                rng_seed: Some(11),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn simulated_clients_start_the_match() {
        let mut server = GameServer::new(config(2)).unwrap();

        server.tick();
        server.tick();
        server.tick();

        let stats = server.stats();
        assert!(stats.game.started);
        assert_eq!(stats.game.entity_count, 6);
        assert_eq!(stats.game.red_roster + stats.game.blue_roster, 6);
        assert!(server.client_infos().iter().all(|c| c.team.is_playable()));
    }

    #[test]
    fn kicked_client_loses_its_entity() {
        let mut server = GameServer::new(config(2)).unwrap();
        for _ in 0..3 {
            server.tick();
        }

        server.kick_client(1);
        server.tick();

        assert_eq!(server.client_infos().len(), 1);
        assert!(
            server
                .drain_events()
                .any(|e| matches!(e, ServerEvent::ClientLeft { client: 1, .. }))
        );
        assert!(server.entity_rows().iter().filter(|r| !r.is_bot).count() == 1);
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let result = GameServer::new(ServerConfig {
            tick_rate: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(LifecycleError::Configuration(_))));
    }
}
