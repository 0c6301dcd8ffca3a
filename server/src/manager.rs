//! Round timeline driver: phase sequencing, broadcasts, and settlement.

use crate::event_log::Event;
use crate::network::ServerConfig;
use crate::round::{RoundState, TickOutcome};
use crate::table::{Connection, PlayerTable};
use log::debug;
use shared::{send_frame, Frame, Tag};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// The single task that advances rounds on time.
///
/// The manager is the sole writer of phase transitions and of broadcast
/// frames. Handlers only record bets and cashouts against whatever phase
/// the manager has set.
pub struct RoundManager {
    table: Arc<Mutex<PlayerTable>>,
    round: Arc<Mutex<RoundState>>,
    occupancy: Arc<Notify>,
    config: ServerConfig,
}

impl RoundManager {
    pub fn new(
        table: Arc<Mutex<PlayerTable>>,
        round: Arc<Mutex<RoundState>>,
        occupancy: Arc<Notify>,
        config: ServerConfig,
    ) -> Self {
        Self {
            table,
            round,
            occupancy,
            config,
        }
    }

    pub async fn run(self) {
        loop {
            self.run_round().await;
        }
    }

    async fn run_round(&self) {
        // Idle: park until at least one slot is occupied. With players still
        // seated after settlement this falls straight through and the next
        // betting window opens immediately.
        loop {
            if !self.table.lock().await.is_empty() {
                break;
            }
            self.occupancy.notified().await;
        }

        self.round.lock().await.begin_betting();
        Event {
            event: "start",
            ..Default::default()
        }
        .emit();
        self.broadcast(&Frame::broadcast(Tag::Start, 0.0)).await;

        sleep(self.config.betting_window).await;

        let (n, v, me) = self.round.lock().await.close_betting();
        Event {
            event: "closed",
            me,
            n,
            v,
            ..Default::default()
        }
        .emit();
        self.broadcast(&Frame::broadcast(Tag::Closed, me)).await;

        // Absolute deadlines: the round's observable length is the tick
        // count times the cadence, so a late tick must not shift the rest.
        let mut ticker = interval_at(
            Instant::now() + self.config.tick_interval,
            self.config.tick_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        loop {
            ticker.tick().await;
            let outcome = self.round.lock().await.advance();
            match outcome {
                TickOutcome::Rising(m) => {
                    Event {
                        event: "multiplier",
                        m,
                        me,
                        n,
                        v,
                        ..Default::default()
                    }
                    .emit();
                    self.broadcast(&Frame::broadcast(Tag::Multiplier, m)).await;
                }
                TickOutcome::Exploded(_) => break,
            }
        }

        Event {
            event: "explode",
            m: me,
            me,
            n,
            v,
            ..Default::default()
        }
        .emit();
        self.broadcast(&Frame::broadcast(Tag::Explode, me)).await;

        let settlements = self.round.lock().await.settle();
        for settlement in settlements {
            if let Some(payout) = settlement.payout {
                let frame = Frame::addressed(
                    settlement.id,
                    Tag::Payout,
                    payout,
                    settlement.player_profit,
                    settlement.house_profit,
                );
                self.send_to(settlement.id, &frame).await;
                Event {
                    event: "payout",
                    id: Some(settlement.id),
                    m: me,
                    me,
                    n,
                    v,
                    bet: settlement.bet,
                    payout,
                    player_profit: settlement.player_profit,
                    house_profit: settlement.house_profit,
                }
                .emit();
            }
            let frame = Frame::addressed(
                settlement.id,
                Tag::Profit,
                0.0,
                settlement.player_profit,
                settlement.house_profit,
            );
            self.send_to(settlement.id, &frame).await;
            Event {
                event: "profit",
                id: Some(settlement.id),
                me,
                n,
                v,
                bet: settlement.bet,
                player_profit: settlement.player_profit,
                house_profit: settlement.house_profit,
                ..Default::default()
            }
            .emit();
        }

        self.round.lock().await.finish_round();
    }

    /// Fan-out to every occupied slot.
    ///
    /// The snapshot is taken under the table lock and the lock released
    /// before any write; a dead connection is dropped without stalling the
    /// rest of the fan-out.
    async fn broadcast(&self, frame: &Frame) {
        let targets = self.table.lock().await.snapshot();
        for (id, conn) in targets {
            let sent = {
                let mut writer = conn.writer.lock().await;
                send_frame(&mut *writer, frame).await
            };
            if sent.is_err() {
                self.drop_slot(id, conn).await;
            }
        }
    }

    async fn send_to(&self, id: i32, frame: &Frame) {
        let conn = self.table.lock().await.connection(id);
        if let Some(conn) = conn {
            let sent = {
                let mut writer = conn.writer.lock().await;
                send_frame(&mut *writer, frame).await
            };
            if sent.is_err() {
                self.drop_slot(id, conn).await;
            }
        }
    }

    /// Releases a slot whose socket failed on send and unblocks its handler.
    async fn drop_slot(&self, id: i32, conn: Connection) {
        debug!("releasing unreachable player {}", id);
        self.table.lock().await.release(id);
        self.round.lock().await.forfeit(id);
        conn.kick.notify_one();
    }
}
