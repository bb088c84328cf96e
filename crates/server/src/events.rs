use skyward::{ConnectionId, MatchEvent, Team};

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Match(MatchEvent),
    ClientJoined { client: ConnectionId },
    ClientLeft { client: ConnectionId, reason: DisconnectReason },
    Error { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Kicked,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Graceful => "left",
            DisconnectReason::Kicked => "was kicked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl ServerEvent {
    pub fn severity(&self) -> Severity {
        match self {
            ServerEvent::Match(event) if event.is_warning() => Severity::Warn,
            ServerEvent::Error { .. } => Severity::Error,
            _ => Severity::Info,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ServerEvent::Match(event) => describe_match_event(event),
            ServerEvent::ClientJoined { client } => format!("Simulated client {} joined", client),
            ServerEvent::ClientLeft { client, reason } => {
                format!("Client {} {}", client, reason.as_str())
            }
            ServerEvent::Error { message } => message.clone(),
        }
    }
}

fn team_name(team: Option<Team>) -> &'static str {
    team.map(Team::as_str).unwrap_or("nobody")
}

fn describe_match_event(event: &MatchEvent) -> String {
    match event {
        MatchEvent::ClientConnected { client } => format!("Client {} connected", client),
        MatchEvent::ClientDisconnected { client, reaped } => {
            format!("Client {} disconnected ({} entities reaped)", client, reaped)
        }
        MatchEvent::SceneLoaded {
            client,
            loaded,
            expected,
        } => format!("Client {} loaded the scene ({}/{})", client, loaded, expected),
        MatchEvent::MatchStarted { players, bots } => {
            format!("Match started: {} players, {} bots", players, bots)
        }
        MatchEvent::EntitySpawned {
            entity,
            kind,
            owner,
        } => match owner {
            Some(owner) => format!("{:?} {} spawned for client {}", kind, entity, owner),
            None => format!("{:?} {} spawned", kind, entity),
        },
        MatchEvent::EntityInitialized { entity, team } => {
            format!("{} joined team {}", entity, team.as_str())
        }
        MatchEvent::EntityDied { entity, killer } => match killer {
            Some(killer) => format!("{} shot down by {}", entity, killer),
            None => format!("{} destroyed", entity),
        },
        MatchEvent::EntityRespawned { entity, position } => format!(
            "{} respawned at ({:.0}, {:.0}, {:.0})",
            entity, position[0], position[1], position[2]
        ),
        MatchEvent::EntityDespawned { entity } => format!("{} despawned", entity),
        MatchEvent::ScoreChanged { red, blue } => format!("Score red {} : {} blue", red, blue),
        MatchEvent::RequestDropped { client, reason } => {
            format!("Dropped request from client {}: {}", client, reason)
        }
        MatchEvent::GameOver { winner } => format!("Game over, winner: {}", team_name(*winner)),
    }
}
