use rkyv::util::AlignedVec;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::entity::EntityId;
use crate::team::Team;

pub const MAX_PACKET_SIZE: usize = 1200;
pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x534B5957;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ClientMessage {
    NotifySceneLoaded { client: u32 },
    RequestPlayerSpawn { client: u32 },
    AckEntity { entity: EntityId },
    RequestTeamAssignment { entity: EntityId },
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum ServerMessage {
    SpawnedEntity {
        entity: EntityId,
        is_bot: bool,
        owner: Option<u32>,
        name: String,
    },
    TeamAssigned {
        entity: EntityId,
        team: Team,
    },
    UpdateHealth {
        entity: EntityId,
        hp: u32,
        max_hp: u32,
        sequence: u32,
    },
    Respawned {
        entity: EntityId,
        position: [f32; 3],
    },
    Despawned {
        entity: EntityId,
    },
    ScoreUpdate {
        red: u32,
        blue: u32,
    },
    GameOver,
}

impl ServerMessage {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::SpawnedEntity { entity, .. }
            | Self::TeamAssigned { entity, .. }
            | Self::UpdateHealth { entity, .. }
            | Self::Respawned { entity, .. }
            | Self::Despawned { entity } => Some(*entity),
            Self::ScoreUpdate { .. } | Self::GameOver => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("packet of {0} bytes exceeds the maximum packet size")]
    TooLarge(usize),
    #[error("invalid packet header (magic {magic:#x}, version {version})")]
    InvalidHeader { magic: u32, version: u32 },
    #[error("client {0} is not connected")]
    UnknownClient(u32),
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ClientPacket {
    pub header: PacketHeader,
    pub message: ClientMessage,
}

impl ClientPacket {
    pub fn new(sequence: u32, message: ClientMessage) -> Self {
        Self {
            header: PacketHeader::new(sequence),
            message,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, WireError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self).map_err(WireError::Serialize)?;
        check_size(bytes.len())?;
        Ok(bytes.into_vec())
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, WireError> {
        let aligned = aligned_copy(data);
        let packet =
            rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(WireError::Deserialize)?;
        check_header(&packet.header)?;
        Ok(packet)
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ServerPacket {
    pub header: PacketHeader,
    pub message: ServerMessage,
}

impl ServerPacket {
    pub fn new(sequence: u32, message: ServerMessage) -> Self {
        Self {
            header: PacketHeader::new(sequence),
            message,
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, WireError> {
        let bytes = rkyv::to_bytes::<rancor::Error>(self).map_err(WireError::Serialize)?;
        check_size(bytes.len())?;
        Ok(bytes.into_vec())
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, WireError> {
        let aligned = aligned_copy(data);
        let packet =
            rkyv::from_bytes::<Self, rancor::Error>(&aligned).map_err(WireError::Deserialize)?;
        check_header(&packet.header)?;
        Ok(packet)
    }
}

fn aligned_copy(data: &[u8]) -> AlignedVec {
    let mut aligned = AlignedVec::with_capacity(data.len());
    aligned.extend_from_slice(data);
    aligned
}

fn check_size(len: usize) -> Result<(), WireError> {
    if len > MAX_PACKET_SIZE {
        return Err(WireError::TooLarge(len));
    }
    Ok(())
}

fn check_header(header: &PacketHeader) -> Result<(), WireError> {
    if !header.is_valid() {
        return Err(WireError::InvalidHeader {
            magic: header.magic,
            version: header.version,
        });
    }
    Ok(())
}
