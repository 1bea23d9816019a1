//! Remote console (RCON) support for skald.
//!
//! - [`codec`]: length-prefixed packet framing
//! - [`client`]: one authenticated connection with a serialized command queue
//! - [`session`]: reconnect policy, player polling and the command surface
//! - [`commands`]: fixed command strings and response parsing

pub mod client;
pub mod codec;
pub mod commands;
pub mod error;
pub mod session;

pub use client::RconClient;
pub use codec::{CodecError, Direction, PacketType, RconCodec, RconPacket};
pub use error::RconError;
pub use session::{RconEvent, RconSession};
