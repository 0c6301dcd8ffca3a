//! # Crash-Game Server Library
//!
//! Authoritative server for the multiplayer crash game. The server drives
//! rounds through a fixed lifecycle (betting window, ascending multiplier,
//! explosion at a point fixed when betting closes), accepts one bet per
//! player per round, answers cashouts while the multiplier is still rising,
//! and settles everything at the explosion.
//!
//! ## Module Organization
//!
//! - [`table`]: the bounded slot arena holding each player's connection.
//! - [`round`]: the shared round state — phase machine, bets, cashouts,
//!   profit accumulators, and settlement.
//! - [`handler`]: one receive loop per connection, dispatching frames and
//!   tearing the slot down on exit.
//! - [`manager`]: the single task that advances phases on time and performs
//!   all broadcasts.
//! - [`network`]: the acceptor binding the listening socket and admitting
//!   players up to the cap.
//! - [`event_log`]: the fixed-field info-level event lines.
//!
//! ## Concurrency
//!
//! Tasks share state through two mutexes: one over the player table and one
//! over the round state (which also carries the profit accumulators). Lock
//! order is table before round, and no lock is ever held across a socket
//! write — sends go through each connection's own writer mutex after the
//! shared locks are released. Occupancy changes wake the round manager
//! through a notify; a slot released from the manager side unblocks its
//! handler through a per-connection kick notify.

pub mod event_log;
pub mod handler;
pub mod manager;
pub mod network;
pub mod round;
pub mod table;
