//! # Shared Wire Protocol
//!
//! This crate defines the on-wire contract between the crash-game server and
//! its terminal client: the 32-byte fixed frame, the recognized message tags,
//! and the framed async send/receive helpers both sides use.
//!
//! Every frame is exactly [`FRAME_LEN`] bytes, little-endian, laid out as:
//!
//! | offset | size | field          |
//! |--------|------|----------------|
//! | 0      | 4    | player_id (i32; 0 = broadcast) |
//! | 4      | 4    | value (f32, meaning depends on tag) |
//! | 8      | 11   | tag (ASCII, NUL-padded)        |
//! | 19     | 1    | pad (must be zero)             |
//! | 20     | 4    | player_profit (f32)            |
//! | 24     | 4    | house_profit (f32)             |
//! | 28     | 4    | reserved (zero)                |
//!
//! The layout is host-independent: both sides encode and decode with the
//! explicit little-endian conversions below, never by casting structs.

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Maximum number of simultaneously connected players.
pub const MAX_PLAYERS: usize = 10;

/// `player_id` used on frames addressed to every connected player.
/// Real slot ids start at 1, so 0 is free for the sentinel.
pub const BROADCAST_ID: i32 = 0;

/// Maximum nickname length accepted by the client CLI.
pub const NICK_MAX: usize = 13;

/// Size of one wire frame in bytes.
pub const FRAME_LEN: usize = 32;

/// Width of the NUL-padded tag field.
pub const TAG_LEN: usize = 11;

/// Wall-clock length of the betting window.
pub const BETTING_WINDOW: Duration = Duration::from_secs(10);

/// Cadence of multiplier ticks during flight.
pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Multiplier increase per tick.
pub const MULTIPLIER_STEP: f32 = 0.01;

/// Message tags recognized on the wire.
///
/// Direction and `value` semantics:
/// - `Start` (S→C broadcast): a new round is open for bets, value 0.
/// - `Bet` (C→S): value is the bet amount.
/// - `Closed` (S→C broadcast): betting closed, value is the explosion point.
/// - `Multiplier` (S→C broadcast): value is the current multiplier.
/// - `Cashout` (C→S): value 0; the server stamps the multiplier at receipt.
/// - `Explode` (S→C broadcast): value is the explosion point.
/// - `Payout` (S→C addressed): value is the amount credited (0 if lost).
/// - `Profit` (S→C addressed): cumulative profits in the profit fields.
/// - `Nick` (C→S): hello sent once after connecting; carries no payload.
/// - `Bye` (either direction): terminates the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Start,
    Bet,
    Closed,
    Multiplier,
    Cashout,
    Explode,
    Payout,
    Profit,
    Nick,
    Bye,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Start => "start",
            Tag::Bet => "bet",
            Tag::Closed => "closed",
            Tag::Multiplier => "multiplier",
            Tag::Cashout => "cashout",
            Tag::Explode => "explode",
            Tag::Payout => "payout",
            Tag::Profit => "profit",
            Tag::Nick => "nick",
            Tag::Bye => "bye",
        }
    }

    fn from_str(s: &str) -> Option<Tag> {
        match s {
            "start" => Some(Tag::Start),
            "bet" => Some(Tag::Bet),
            "closed" => Some(Tag::Closed),
            "multiplier" => Some(Tag::Multiplier),
            "cashout" => Some(Tag::Cashout),
            "explode" => Some(Tag::Explode),
            "payout" => Some(Tag::Payout),
            "profit" => Some(Tag::Profit),
            "nick" => Some(Tag::Nick),
            "bye" => Some(Tag::Bye),
            _ => None,
        }
    }
}

/// Errors produced by the codec and the framed transfer helpers.
#[derive(Debug, Error)]
pub enum WireError {
    /// The peer closed the connection, cleanly or otherwise.
    #[error("peer disconnected")]
    PeerGone,
    /// A transport failure other than disconnection.
    #[error("transport error: {0}")]
    Io(std::io::Error),
    /// The bytes on the wire do not form a valid frame.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),
}

impl WireError {
    /// Disconnections surface as different io error kinds depending on how
    /// the peer went away; fold them all into `PeerGone`.
    fn from_io(err: std::io::Error) -> WireError {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::UnexpectedEof
            | ErrorKind::BrokenPipe
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted => WireError::PeerGone,
            _ => WireError::Io(err),
        }
    }
}

/// One decoded wire frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub player_id: i32,
    pub value: f32,
    pub tag: Tag,
    pub player_profit: f32,
    pub house_profit: f32,
}

impl Frame {
    /// Frame addressed to every player; profit fields are zero.
    pub fn broadcast(tag: Tag, value: f32) -> Frame {
        Frame {
            player_id: BROADCAST_ID,
            value,
            tag,
            player_profit: 0.0,
            house_profit: 0.0,
        }
    }

    /// Frame addressed to a single player, carrying both profit accumulators.
    pub fn addressed(
        player_id: i32,
        tag: Tag,
        value: f32,
        player_profit: f32,
        house_profit: f32,
    ) -> Frame {
        Frame {
            player_id,
            value,
            tag,
            player_profit,
            house_profit,
        }
    }

    /// Client-to-server request; the server fills profits on the way back.
    pub fn request(tag: Tag, value: f32) -> Frame {
        Frame {
            player_id: 0,
            value,
            tag,
            player_profit: 0.0,
            house_profit: 0.0,
        }
    }

    /// Serializes the frame into its fixed 32-byte layout.
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut buf = [0u8; FRAME_LEN];
        buf[0..4].copy_from_slice(&self.player_id.to_le_bytes());
        buf[4..8].copy_from_slice(&self.value.to_le_bytes());
        let tag = self.tag.as_str().as_bytes();
        buf[8..8 + tag.len()].copy_from_slice(tag);
        // bytes 8+len..19 stay NUL, byte 19 is the pad, 28..32 are reserved
        buf[20..24].copy_from_slice(&self.player_profit.to_le_bytes());
        buf[24..28].copy_from_slice(&self.house_profit.to_le_bytes());
        buf
    }

    /// Parses a frame, rejecting unknown tags and a non-zero pad byte.
    pub fn decode(buf: &[u8; FRAME_LEN]) -> Result<Frame, WireError> {
        if buf[19] != 0 {
            return Err(WireError::Malformed("non-zero pad byte"));
        }
        let raw_tag = &buf[8..8 + TAG_LEN];
        let end = raw_tag.iter().position(|&b| b == 0).unwrap_or(TAG_LEN);
        let tag = std::str::from_utf8(&raw_tag[..end])
            .ok()
            .and_then(Tag::from_str)
            .ok_or(WireError::Malformed("unknown tag"))?;

        Ok(Frame {
            player_id: i32::from_le_bytes(buf[0..4].try_into().unwrap()),
            value: f32::from_le_bytes(buf[4..8].try_into().unwrap()),
            tag,
            player_profit: f32::from_le_bytes(buf[20..24].try_into().unwrap()),
            house_profit: f32::from_le_bytes(buf[24..28].try_into().unwrap()),
        })
    }
}

/// Writes one frame, looping until all 32 bytes are accepted.
pub async fn send_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(&frame.encode())
        .await
        .map_err(WireError::from_io)
}

/// Reads exactly one frame, looping over short reads.
pub async fn recv_frame<R>(reader: &mut R) -> Result<Frame, WireError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; FRAME_LEN];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(WireError::from_io)?;
    Frame::decode(&buf)
}
