//! Per-connection receive loop: frame dispatch and slot teardown.

use crate::event_log::Event;
use crate::round::RoundState;
use crate::table::{Connection, PlayerTable};
use log::{debug, warn};
use shared::{recv_frame, send_frame, Frame, Tag, WireError};
use std::sync::Arc;
use tokio::net::tcp::OwnedReadHalf;
use tokio::sync::Mutex;

/// How the receive loop ended.
enum Close {
    /// Client sent `bye` and got an acknowledgement.
    Bye,
    /// Peer vanished, cleanly or otherwise.
    PeerGone,
    Io(std::io::Error),
    Malformed(&'static str),
    /// Client sent a server-to-client tag.
    Protocol(Tag),
    /// The manager released this slot after a failed send.
    Kicked,
}

/// One handler task per admitted player.
///
/// The handler owns the read half of the socket; the write half lives in the
/// player table behind its own mutex so the round manager can broadcast
/// through it. Whatever way the loop ends, teardown releases the slot and
/// forfeits any live bet.
pub struct PlayerHandler {
    pub id: i32,
    pub reader: OwnedReadHalf,
    pub conn: Connection,
    pub table: Arc<Mutex<PlayerTable>>,
    pub round: Arc<Mutex<RoundState>>,
}

impl PlayerHandler {
    pub async fn run(mut self) {
        let close = self.serve().await;
        match &close {
            Close::Bye => debug!("player {} left", self.id),
            Close::PeerGone => debug!("player {} disconnected", self.id),
            Close::Kicked => debug!("player {} kicked after failed send", self.id),
            Close::Io(e) => warn!("player {}: transport error: {}", self.id, e),
            Close::Malformed(what) => warn!("player {}: malformed frame: {}", self.id, what),
            Close::Protocol(tag) => {
                warn!("player {}: unexpected {:?} frame", self.id, tag)
            }
        }

        self.table.lock().await.release(self.id);
        self.round.lock().await.forfeit(self.id);
        Event {
            event: "disconnect",
            id: Some(self.id),
            ..Default::default()
        }
        .emit();
    }

    async fn serve(&mut self) -> Close {
        loop {
            let frame = tokio::select! {
                _ = self.conn.kick.notified() => return Close::Kicked,
                received = recv_frame(&mut self.reader) => match received {
                    Ok(frame) => frame,
                    Err(WireError::PeerGone) => return Close::PeerGone,
                    Err(WireError::Io(e)) => return Close::Io(e),
                    Err(WireError::Malformed(what)) => return Close::Malformed(what),
                },
            };

            match frame.tag {
                Tag::Nick => debug!("player {} said hello", self.id),
                Tag::Bet => self.handle_bet(frame.value).await,
                Tag::Cashout => self.handle_cashout().await,
                Tag::Bye => {
                    let ack = Frame::addressed(self.id, Tag::Bye, 0.0, 0.0, 0.0);
                    let mut writer = self.conn.writer.lock().await;
                    let _ = send_frame(&mut *writer, &ack).await;
                    return Close::Bye;
                }
                other => return Close::Protocol(other),
            }
        }
    }

    async fn handle_bet(&self, amount: f32) {
        let accepted = self.round.lock().await.record_bet(self.id, amount);
        match accepted {
            Ok(()) => Event {
                event: "bet",
                id: Some(self.id),
                bet: amount,
                ..Default::default()
            }
            .emit(),
            Err(kind) => debug!(
                "rejected bet of {} from player {}: {:?}",
                amount, self.id, kind
            ),
        }
    }

    /// An accepted cashout settles inline: the payout frame reaches the
    /// player before the round's explode broadcast does.
    async fn handle_cashout(&self) {
        let receipt = self.round.lock().await.record_cashout(self.id);
        let receipt = match receipt {
            Ok(receipt) => receipt,
            Err(kind) => {
                debug!("rejected cashout from player {}: {:?}", self.id, kind);
                return;
            }
        };

        let frame = Frame::addressed(
            self.id,
            Tag::Payout,
            receipt.payout,
            receipt.player_profit,
            receipt.house_profit,
        );
        let sent = {
            let mut writer = self.conn.writer.lock().await;
            send_frame(&mut *writer, &frame).await
        };
        if sent.is_err() {
            // The read side will observe the dead peer and tear down.
            debug!("player {} unreachable for payout", self.id);
        }

        Event {
            event: "payout",
            id: Some(self.id),
            m: receipt.multiplier,
            bet: receipt.bet,
            payout: receipt.payout,
            player_profit: receipt.player_profit,
            house_profit: receipt.house_profit,
            ..Default::default()
        }
        .emit();
    }
}
