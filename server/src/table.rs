//! Bounded player table: slot admission, release, and broadcast snapshots.

use shared::MAX_PLAYERS;
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, Notify};

/// Write side of one player's socket plus the signal used to unseat its
/// handler when the slot is released from the manager side.
///
/// The writer sits behind its own mutex so that neither the table lock nor
/// the round lock is ever held across a socket write.
#[derive(Clone)]
pub struct Connection {
    pub writer: Arc<Mutex<OwnedWriteHalf>>,
    pub kick: Arc<Notify>,
}

impl Connection {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            kick: Arc::new(Notify::new()),
        }
    }
}

struct Slot {
    conn: Connection,
}

/// Fixed arena of [`MAX_PLAYERS`] slots addressed by 1-based id.
///
/// The table is the single source of truth for membership: the acceptor,
/// the handlers, and the round manager all go through it. An id is reused
/// only after its slot has returned to free.
pub struct PlayerTable {
    slots: [Option<Slot>; MAX_PLAYERS],
}

impl PlayerTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Seats a connection in the lowest free slot.
    ///
    /// Returns the assigned id, or `None` when every slot is occupied.
    pub fn admit(&mut self, conn: Connection) -> Option<i32> {
        let free = self.slots.iter().position(|slot| slot.is_none())?;
        self.slots[free] = Some(Slot { conn });
        Some((free + 1) as i32)
    }

    /// Frees a slot. Idempotent; returns whether the slot was occupied.
    pub fn release(&mut self, id: i32) -> bool {
        match self.slots.get_mut(id.wrapping_sub(1) as usize) {
            Some(slot) => slot.take().is_some(),
            None => false,
        }
    }

    /// Connection handle for an addressed send, if the slot is occupied.
    pub fn connection(&self, id: i32) -> Option<Connection> {
        self.slots
            .get(id.wrapping_sub(1) as usize)?
            .as_ref()
            .map(|slot| slot.conn.clone())
    }

    /// Snapshot of every occupied slot for broadcast fan-out.
    ///
    /// Cloned handles keep the table lock out of the write path: the caller
    /// releases the lock before touching any socket.
    pub fn snapshot(&self) -> Vec<(i32, Connection)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                slot.as_ref().map(|s| ((i + 1) as i32, s.conn.clone()))
            })
            .collect()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }
}

impl Default for PlayerTable {
    fn default() -> Self {
        Self::new()
    }
}
