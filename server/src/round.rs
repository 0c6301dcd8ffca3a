//! Round lifecycle state: phases, bets, cashouts, and settlement accounting.
//!
//! `RoundState` is a plain synchronous struct; callers lock it, call one
//! operation, and release before doing any I/O. Phase transitions are driven
//! exclusively by the round manager, while connection handlers only record
//! bets and cashouts against the current phase.

use shared::{MAX_PLAYERS, MULTIPLIER_STEP};

/// Position of the round in its state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Betting,
    Flight,
    Exploding,
    Settling,
}

/// Why a bet was not accepted. Rejections are silent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetError {
    WrongPhase,
    NotPositive,
    AlreadyPlaced,
}

/// Why a cashout was not accepted. Rejections are silent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CashoutError {
    WrongPhase,
    NoBet,
    AlreadyCashed,
    TooLate,
}

/// Result of one multiplier tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    Rising(f32),
    Exploded(f32),
}

/// Everything the handler needs to answer an accepted cashout inline.
#[derive(Debug, Clone, Copy)]
pub struct CashoutReceipt {
    pub multiplier: f32,
    pub bet: f32,
    pub payout: f32,
    pub player_profit: f32,
    pub house_profit: f32,
}

/// One slot's outcome at end-of-round settlement.
///
/// `payout` is `Some(0.0)` for a lost bet (a payout frame is still owed) and
/// `None` for a bet already settled inline by its own cashout.
#[derive(Debug, Clone, Copy)]
pub struct Settlement {
    pub id: i32,
    pub bet: f32,
    pub payout: Option<f32>,
    pub player_profit: f32,
    pub house_profit: f32,
}

#[derive(Debug, Clone, Copy, Default)]
struct PlayerRound {
    bet: f32,
    cashout: Option<f32>,
    settled: bool,
}

/// Shared game state for the current round plus the persistent profit
/// accumulators. Guarded by a single mutex at the call sites.
pub struct RoundState {
    phase: Phase,
    multiplier: f32,
    explosion: f32,
    bet_count: u32,
    bet_sum: f32,
    // Liability left behind by players who disconnected with a live bet:
    // counted into N/V at close if betting was still open, credited to the
    // house at settlement either way.
    forfeited_count: u32,
    forfeited_sum: f32,
    house_profit: f32,
    players: [PlayerRound; MAX_PLAYERS],
    profits: [f32; MAX_PLAYERS],
}

fn index(id: i32) -> usize {
    debug_assert!((1..=MAX_PLAYERS as i32).contains(&id));
    (id - 1) as usize
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            multiplier: 1.0,
            explosion: 0.0,
            bet_count: 0,
            bet_sum: 0.0,
            forfeited_count: 0,
            forfeited_sum: 0.0,
            house_profit: 0.0,
            players: [PlayerRound::default(); MAX_PLAYERS],
            profits: [0.0; MAX_PLAYERS],
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn multiplier(&self) -> f32 {
        self.multiplier
    }

    pub fn explosion_point(&self) -> f32 {
        self.explosion
    }

    pub fn bet_count(&self) -> u32 {
        self.bet_count
    }

    pub fn bet_sum(&self) -> f32 {
        self.bet_sum
    }

    pub fn house_profit(&self) -> f32 {
        self.house_profit
    }

    pub fn player_profit(&self, id: i32) -> f32 {
        self.profits[index(id)]
    }

    /// Clears a reused slot's lifetime profit; called at admission.
    pub fn join(&mut self, id: i32) {
        self.profits[index(id)] = 0.0;
    }

    /// Opens the betting window and wipes all per-round fields.
    pub fn begin_betting(&mut self) {
        self.phase = Phase::Betting;
        self.players = [PlayerRound::default(); MAX_PLAYERS];
        self.multiplier = 1.0;
        self.explosion = 0.0;
        self.bet_count = 0;
        self.bet_sum = 0.0;
        self.forfeited_count = 0;
        self.forfeited_sum = 0.0;
    }

    /// Accepts at most one positive, finite bet per slot per round.
    pub fn record_bet(&mut self, id: i32, amount: f32) -> Result<(), BetError> {
        if self.phase != Phase::Betting {
            return Err(BetError::WrongPhase);
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(BetError::NotPositive);
        }
        let player = &mut self.players[index(id)];
        if player.bet > 0.0 {
            return Err(BetError::AlreadyPlaced);
        }
        player.bet = amount;
        Ok(())
    }

    /// Freezes N and V and fixes the explosion point.
    ///
    /// me = sqrt(1 + N + 0.01 * V), evaluated in single precision; with no
    /// bets this is exactly 1.0 and the round explodes on the first tick.
    pub fn close_betting(&mut self) -> (u32, f32, f32) {
        let live = self.players.iter().filter(|p| p.bet > 0.0);
        let n = live.clone().count() as u32 + self.forfeited_count;
        let v: f32 = live.map(|p| p.bet).sum::<f32>() + self.forfeited_sum;

        self.bet_count = n;
        self.bet_sum = v;
        self.explosion = (1.0 + n as f32 + 0.01 * v).sqrt();
        self.multiplier = 1.0;
        self.phase = Phase::Flight;
        (n, v, self.explosion)
    }

    /// Raises the multiplier by one step, exploding once it reaches me.
    pub fn advance(&mut self) -> TickOutcome {
        debug_assert_eq!(self.phase, Phase::Flight);
        self.multiplier += MULTIPLIER_STEP;
        if self.multiplier >= self.explosion {
            self.phase = Phase::Exploding;
            TickOutcome::Exploded(self.explosion)
        } else {
            TickOutcome::Rising(self.multiplier)
        }
    }

    /// Stamps the current multiplier on a valid cashout and settles the
    /// slot inline, so the payout frame can go out before the explosion.
    pub fn record_cashout(&mut self, id: i32) -> Result<CashoutReceipt, CashoutError> {
        if self.phase != Phase::Flight {
            return Err(CashoutError::WrongPhase);
        }
        if self.multiplier >= self.explosion {
            return Err(CashoutError::TooLate);
        }
        let i = index(id);
        let player = self.players[i];
        if player.bet <= 0.0 {
            return Err(CashoutError::NoBet);
        }
        if player.cashout.is_some() {
            return Err(CashoutError::AlreadyCashed);
        }

        let multiplier = self.multiplier;
        let payout = player.bet * multiplier;
        self.players[i].cashout = Some(multiplier);
        self.players[i].settled = true;
        self.profits[i] += payout - player.bet;
        self.house_profit += player.bet - payout;

        Ok(CashoutReceipt {
            multiplier,
            bet: player.bet,
            payout,
            player_profit: self.profits[i],
            house_profit: self.house_profit,
        })
    }

    /// Releases a departed player's slot state.
    ///
    /// An unsettled bet moves into the forfeit accumulators so the house is
    /// credited at settlement and a reused id starts clean. Idempotent.
    pub fn forfeit(&mut self, id: i32) {
        let i = index(id);
        let player = self.players[i];
        if player.bet > 0.0 && !player.settled {
            self.forfeited_count += 1;
            self.forfeited_sum += player.bet;
        }
        self.players[i] = PlayerRound::default();
    }

    /// Settles every outstanding bet at explosion.
    ///
    /// Lost bets pay zero and debit the player's accumulator; bets already
    /// settled by their own cashout only contribute a profit record.
    /// Forfeited bets are credited to the house with no record.
    pub fn settle(&mut self) -> Vec<Settlement> {
        self.phase = Phase::Settling;
        self.house_profit += self.forfeited_sum;
        self.forfeited_count = 0;
        self.forfeited_sum = 0.0;

        let mut settlements = Vec::new();
        for i in 0..MAX_PLAYERS {
            let player = self.players[i];
            if player.bet <= 0.0 {
                continue;
            }
            let payout = if player.settled {
                None
            } else {
                self.players[i].settled = true;
                self.profits[i] -= player.bet;
                self.house_profit += player.bet;
                Some(0.0)
            };
            settlements.push(Settlement {
                id: (i + 1) as i32,
                bet: player.bet,
                payout,
                player_profit: self.profits[i],
                house_profit: self.house_profit,
            });
        }
        settlements
    }

    /// Returns to Idle after settlement; per-round fields are wiped again
    /// when the next betting window opens.
    pub fn finish_round(&mut self) {
        self.phase = Phase::Idle;
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}
