mod connection;
mod protocol;
mod transport;

pub use connection::{ClientConnection, ConnectionManager};
pub use protocol::{
    ClientMessage, ClientPacket, PacketHeader, ServerMessage, ServerPacket, WireError,
    MAX_PACKET_SIZE, PROTOCOL_MAGIC, PROTOCOL_VERSION, sequence_greater_than,
};
pub use transport::{LoopbackTransport, NetworkStats, Transport};
