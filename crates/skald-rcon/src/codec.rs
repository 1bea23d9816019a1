//! RCON wire format.
//!
//! ```text
//! +-----------+-----------+-----------+----------------+------+
//! | length    | id        | type      | body           | 0x00 |
//! | i32 LE    | i32 LE    | i32 LE    | ASCII, 0x00    | 0x00 |
//! +-----------+-----------+-----------+----------------+------+
//! ```
//!
//! `length` counts every byte after itself. Exec-command and auth-response
//! share the value 2 on the wire, so the codec is built for one direction
//! and interprets incoming types accordingly.
//!
//! TCP has no message boundaries: the decoder buffers partial reads until a
//! whole packet is available.

use bytes::{Buf, BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// id + type + two NUL terminators.
pub const MIN_PACKET_LENGTH: usize = 10;

/// Upper bound for a declared packet length. Anything larger means the
/// stream is out of sync.
pub const MAX_PACKET_LENGTH: usize = 1 << 20;

const AUTH: i32 = 3;
const EXEC_OR_AUTH_RESPONSE: i32 = 2;
const RESPONSE_VALUE: i32 = 0;

/// Wire-level framing errors.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid packet length {0}")]
    InvalidLength(i64),

    #[error("Packet body of {0} bytes is too long")]
    BodyTooLong(usize),

    #[error("Packet body contains a NUL byte")]
    InteriorNul,
}

/// Who sends the packets a codec decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToServer,
    ToClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Auth,
    AuthResponse,
    ExecCommand,
    ResponseValue,
}

impl PacketType {
    pub const fn to_wire(self) -> i32 {
        match self {
            Self::Auth => AUTH,
            Self::AuthResponse | Self::ExecCommand => EXEC_OR_AUTH_RESPONSE,
            Self::ResponseValue => RESPONSE_VALUE,
        }
    }

    /// Interpret a wire value given the direction it travelled.
    pub const fn from_wire(value: i32, direction: Direction) -> Option<Self> {
        match (value, direction) {
            (AUTH, Direction::ToServer) => Some(Self::Auth),
            (EXEC_OR_AUTH_RESPONSE, Direction::ToServer) => Some(Self::ExecCommand),
            (EXEC_OR_AUTH_RESPONSE, Direction::ToClient) => Some(Self::AuthResponse),
            (RESPONSE_VALUE, _) => Some(Self::ResponseValue),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RconPacket {
    pub id: i32,
    pub kind: PacketType,
    pub body: String,
}

impl RconPacket {
    pub fn new(id: i32, kind: PacketType, body: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            body: body.into(),
        }
    }

    pub fn auth(id: i32, password: &str) -> Self {
        Self::new(id, PacketType::Auth, password)
    }

    pub fn exec(id: i32, command: &str) -> Self {
        Self::new(id, PacketType::ExecCommand, command)
    }

    pub fn response(id: i32, body: &str) -> Self {
        Self::new(id, PacketType::ResponseValue, body)
    }

    pub fn auth_response(id: i32) -> Self {
        Self::new(id, PacketType::AuthResponse, "")
    }
}

/// Length-prefixed packet codec for one side of the connection.
#[derive(Debug, Clone, Copy)]
pub struct RconCodec {
    incoming: Direction,
}

impl RconCodec {
    /// Codec for a client: decodes server packets.
    pub const fn client() -> Self {
        Self {
            incoming: Direction::ToClient,
        }
    }

    /// Codec for a server: decodes client packets.
    pub const fn server() -> Self {
        Self {
            incoming: Direction::ToServer,
        }
    }
}

impl Decoder for RconCodec {
    type Item = RconPacket;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 4 {
                return Ok(None);
            }

            let mut header = &src[..4];
            let declared = header.get_i32_le();
            let length = usize::try_from(declared)
                .ok()
                .filter(|len| (MIN_PACKET_LENGTH..=MAX_PACKET_LENGTH).contains(len))
                .ok_or(CodecError::InvalidLength(i64::from(declared)))?;

            if src.len() < 4 + length {
                src.reserve(4 + length - src.len());
                return Ok(None);
            }

            src.advance(4);
            let mut frame = src.split_to(length);
            let id = frame.get_i32_le();
            let raw_type = frame.get_i32_le();

            // Body ends at the first NUL; the terminators are not part of it
            let end = frame.iter().position(|&b| b == 0).unwrap_or(frame.len());
            let body = String::from_utf8_lossy(&frame[..end]).into_owned();

            match PacketType::from_wire(raw_type, self.incoming) {
                Some(kind) => return Ok(Some(RconPacket { id, kind, body })),
                None => {
                    warn!(id = %id, packet_type = %raw_type, "Discarding RCON packet of unknown type");
                }
            }
        }
    }
}

impl Encoder<RconPacket> for RconCodec {
    type Error = CodecError;

    fn encode(&mut self, packet: RconPacket, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let body = packet.body.as_bytes();
        if body.contains(&0) {
            return Err(CodecError::InteriorNul);
        }

        let length = body.len() + MIN_PACKET_LENGTH;
        if length > MAX_PACKET_LENGTH {
            return Err(CodecError::BodyTooLong(body.len()));
        }
        let declared = i32::try_from(length).map_err(|_| CodecError::BodyTooLong(body.len()))?;

        dst.reserve(4 + length);
        dst.put_i32_le(declared);
        dst.put_i32_le(packet.id);
        dst.put_i32_le(packet.kind.to_wire());
        dst.put_slice(body);
        dst.put_u8(0);
        dst.put_u8(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(codec: &mut RconCodec, packet: RconPacket) -> BytesMut {
        let mut buf = BytesMut::new();
        codec.encode(packet, &mut buf).unwrap();
        buf
    }

    #[test]
    fn exec_command_layout_is_bit_exact() {
        let buf = encode(&mut RconCodec::client(), RconPacket::exec(7, "save"));
        let expected: &[u8] = &[
            14, 0, 0, 0, // length
            7, 0, 0, 0, // id
            2, 0, 0, 0, // type
            b's', b'a', b'v', b'e', 0, 0,
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn exec_command_round_trip() {
        let mut buf = encode(&mut RconCodec::client(), RconPacket::exec(42, "kick Ragnar"));
        let decoded = RconCodec::server().decode(&mut buf).unwrap().unwrap();

        assert_eq!(decoded, RconPacket::exec(42, "kick Ragnar"));
        assert!(buf.is_empty());
    }

    #[test]
    fn type_two_depends_on_direction() {
        let mut buf = encode(&mut RconCodec::server(), RconPacket::auth_response(1));
        let decoded = RconCodec::client().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.kind, PacketType::AuthResponse);

        let mut buf = encode(&mut RconCodec::client(), RconPacket::exec(1, ""));
        let decoded = RconCodec::server().decode(&mut buf).unwrap().unwrap();
        assert_eq!(decoded.kind, PacketType::ExecCommand);
    }

    #[test]
    fn partial_reads_are_buffered() {
        let wire = encode(&mut RconCodec::server(), RconPacket::response(3, "Players: 2"));
        let mut codec = RconCodec::client();
        let mut src = BytesMut::new();

        for (i, byte) in wire.iter().enumerate() {
            src.put_u8(*byte);
            let result = codec.decode(&mut src).unwrap();
            if i + 1 < wire.len() {
                assert!(result.is_none(), "yielded early at byte {i}");
            } else {
                assert_eq!(result, Some(RconPacket::response(3, "Players: 2")));
            }
        }
    }

    #[test]
    fn back_to_back_packets_decode_separately() {
        let mut codec = RconCodec::server();
        let mut src = encode(&mut codec, RconPacket::response(5, "first"));
        src.extend_from_slice(&encode(&mut codec, RconPacket::response(6, "second")));
        // Start of a third packet
        src.extend_from_slice(&[20, 0, 0]);

        let mut client = RconCodec::client();
        assert_eq!(client.decode(&mut src).unwrap().unwrap().body, "first");
        assert_eq!(client.decode(&mut src).unwrap().unwrap().body, "second");
        assert!(client.decode(&mut src).unwrap().is_none());
        assert_eq!(src.len(), 3);
    }

    #[test]
    fn unknown_type_is_skipped() {
        let mut src = BytesMut::new();
        src.put_i32_le(10);
        src.put_i32_le(9);
        src.put_i32_le(99);
        src.put_slice(&[0, 0]);
        src.extend_from_slice(&encode(&mut RconCodec::server(), RconPacket::response(10, "ok")));

        let decoded = RconCodec::client().decode(&mut src).unwrap().unwrap();
        assert_eq!(decoded, RconPacket::response(10, "ok"));
    }

    #[test]
    fn insane_length_is_an_error() {
        let mut src = BytesMut::new();
        src.put_i32_le(-5);
        src.put_slice(&[0; 12]);
        assert!(matches!(
            RconCodec::client().decode(&mut src),
            Err(CodecError::InvalidLength(-5))
        ));

        let mut src = BytesMut::new();
        src.put_i32_le(3);
        assert!(matches!(
            RconCodec::client().decode(&mut src),
            Err(CodecError::InvalidLength(3))
        ));
    }

    #[test]
    fn interior_nul_is_rejected() {
        let mut buf = BytesMut::new();
        let result = RconCodec::client().encode(RconPacket::exec(1, "say\0hi"), &mut buf);
        assert!(matches!(result, Err(CodecError::InteriorNul)));
        assert!(buf.is_empty());
    }
}
