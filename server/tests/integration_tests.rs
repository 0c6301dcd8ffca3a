//! End-to-end scenarios over real loopback TCP.
//!
//! Each test starts a server on an ephemeral port with a shortened betting
//! window and tick cadence; payout math does not depend on the cadence, only
//! the wall-clock length of a round does.

use server::network::{IpVersion, Server, ServerConfig};
use shared::{recv_frame, send_frame, Frame, Tag, WireError, MAX_PLAYERS};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn start_server(betting_ms: u64, tick_ms: u64) -> SocketAddr {
    let config = ServerConfig {
        betting_window: Duration::from_millis(betting_ms),
        tick_interval: Duration::from_millis(tick_ms),
    };
    let server = Server::bind(IpVersion::V4, 0, config)
        .await
        .expect("failed to bind test server");
    let addr = server.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    addr
}

struct TestClient {
    stream: TcpStream,
}

impl TestClient {
    async fn connect(addr: SocketAddr) -> TestClient {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        send_frame(&mut stream, &Frame::request(Tag::Nick, 0.0))
            .await
            .unwrap();
        TestClient { stream }
    }

    async fn send(&mut self, tag: Tag, value: f32) {
        send_frame(&mut self.stream, &Frame::request(tag, value))
            .await
            .unwrap();
    }

    async fn next(&mut self) -> Frame {
        timeout(Duration::from_secs(10), recv_frame(&mut self.stream))
            .await
            .expect("timed out waiting for a frame")
            .expect("connection failed while waiting for a frame")
    }

    /// Discards frames until one with the wanted tag arrives.
    async fn expect(&mut self, tag: Tag) -> Frame {
        loop {
            let frame = self.next().await;
            if frame.tag == tag {
                return frame;
            }
        }
    }

    /// Reads multiplier broadcasts until one reaches the target.
    async fn ride_to(&mut self, target: f32) {
        loop {
            let frame = self.expect(Tag::Multiplier).await;
            if frame.value >= target {
                return;
            }
        }
    }
}

#[tokio::test]
async fn solo_win() {
    let addr = start_server(400, 10).await;
    let mut player = TestClient::connect(addr).await;

    player.expect(Tag::Start).await;
    player.send(Tag::Bet, 100.0).await;

    // One bet of 100: me = sqrt(1 + 1 + 1) = sqrt(3).
    let closed = player.expect(Tag::Closed).await;
    assert!((closed.value - 3.0f32.sqrt()).abs() < 1e-3);

    player.ride_to(1.5).await;
    player.send(Tag::Cashout, 0.0).await;

    // The stamped multiplier may be a tick or two past what we saw.
    let payout = player.expect(Tag::Payout).await;
    assert!(
        (150.0..156.0).contains(&payout.value),
        "payout was {}",
        payout.value
    );
    assert!((payout.player_profit - (payout.value - 100.0)).abs() < 1e-3);
    assert!((payout.house_profit + payout.player_profit).abs() < 1e-3);

    let explode = player.expect(Tag::Explode).await;
    assert!((explode.value - 3.0f32.sqrt()).abs() < 1e-3);

    // Cashed out, so settlement owes only the profit record.
    let profit = player.expect(Tag::Profit).await;
    assert!((profit.player_profit - payout.player_profit).abs() < 1e-3);
}

#[tokio::test]
async fn solo_loss() {
    let addr = start_server(300, 5).await;
    let mut player = TestClient::connect(addr).await;

    player.expect(Tag::Start).await;
    player.send(Tag::Bet, 100.0).await;
    player.expect(Tag::Closed).await;

    let explode = player.expect(Tag::Explode).await;
    assert!((explode.value - 3.0f32.sqrt()).abs() < 1e-3);

    let payout = player.expect(Tag::Payout).await;
    assert_eq!(payout.value, 0.0);
    assert!((payout.player_profit + 100.0).abs() < 1e-3);
    assert!((payout.house_profit - 100.0).abs() < 1e-3);

    let profit = player.expect(Tag::Profit).await;
    assert!((profit.player_profit + 100.0).abs() < 1e-3);
}

#[tokio::test]
async fn two_players_mixed() {
    let addr = start_server(500, 10).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect(Tag::Start).await;
    let mut bob = TestClient::connect(addr).await;

    alice.send(Tag::Bet, 50.0).await;
    bob.send(Tag::Bet, 50.0).await;

    // Two bets of 50: me = sqrt(1 + 2 + 1) = 2.
    let closed = alice.expect(Tag::Closed).await;
    assert!((closed.value - 2.0).abs() < 1e-3);

    alice.ride_to(1.8).await;
    alice.send(Tag::Cashout, 0.0).await;
    let alice_payout = alice.expect(Tag::Payout).await;
    assert!(
        (90.0..95.0).contains(&alice_payout.value),
        "payout was {}",
        alice_payout.value
    );

    let bob_payout = bob.expect(Tag::Payout).await;
    assert_eq!(bob_payout.value, 0.0);
    let bob_profit = bob.expect(Tag::Profit).await;
    assert!((bob_profit.player_profit + 50.0).abs() < 1e-3);

    // Per-round conservation: both player deltas and the house sum to zero.
    let alice_profit = alice.expect(Tag::Profit).await;
    let total =
        alice_profit.player_profit + bob_profit.player_profit + bob_profit.house_profit;
    assert!(total.abs() < 0.1, "round was not zero-sum: {}", total);
    assert!(
        (9.0..11.0).contains(&bob_profit.house_profit),
        "house profit was {}",
        bob_profit.house_profit
    );
}

#[tokio::test]
async fn full_house_rejects_eleventh_player() {
    // Long betting window keeps the round stable while everyone connects.
    let addr = start_server(10_000, 100).await;

    let mut seated = Vec::new();
    for _ in 0..MAX_PLAYERS {
        seated.push(TestClient::connect(addr).await);
    }
    // The round opened on the first admission; later players joined the
    // betting window in progress and see no start frame of their own.
    seated[0].expect(Tag::Start).await;

    let mut rejected = TestClient::connect(addr).await;
    let frame = rejected.next().await;
    assert_eq!(frame.tag, Tag::Bye);

    match timeout(Duration::from_secs(10), recv_frame(&mut rejected.stream)).await {
        Ok(Err(WireError::PeerGone)) => {}
        other => panic!("expected the socket to close, got {:?}", other),
    }
}

#[tokio::test]
async fn disconnect_mid_flight_forfeits_bet() {
    let addr = start_server(500, 10).await;

    let mut alice = TestClient::connect(addr).await;
    alice.expect(Tag::Start).await;
    let mut bob = TestClient::connect(addr).await;

    alice.send(Tag::Bet, 25.0).await;
    bob.send(Tag::Bet, 50.0).await;

    // N = 2, V = 75: me = sqrt(3.75).
    let closed = alice.expect(Tag::Closed).await;
    assert!((closed.value - 3.75f32.sqrt()).abs() < 1e-3);

    drop(alice);

    let explode = bob.expect(Tag::Explode).await;
    assert!((explode.value - 3.75f32.sqrt()).abs() < 1e-3);

    let payout = bob.expect(Tag::Payout).await;
    assert_eq!(payout.value, 0.0);

    // The forfeited 25 lands with the house at settlement.
    let profit = bob.expect(Tag::Profit).await;
    assert!((profit.player_profit + 50.0).abs() < 1e-3);
    assert!(
        (profit.house_profit - 75.0).abs() < 1e-3,
        "house profit was {}",
        profit.house_profit
    );
}

#[tokio::test]
async fn zero_bet_round_explodes_immediately() {
    let addr = start_server(300, 5).await;
    let mut player = TestClient::connect(addr).await;

    player.expect(Tag::Start).await;

    // No bets: me = 1.0, the first tick explodes, and no multiplier frame
    // is ever sent.
    let closed = player.expect(Tag::Closed).await;
    assert!((closed.value - 1.0).abs() < 1e-6);

    let frame = player.next().await;
    assert_eq!(frame.tag, Tag::Explode);
    assert!((frame.value - 1.0).abs() < 1e-6);

    // No bet was recorded, so no payout or profit frames: the next thing on
    // the wire is the following round's start.
    let frame = player.next().await;
    assert_eq!(frame.tag, Tag::Start);
}

#[tokio::test]
async fn bye_is_acknowledged() {
    let addr = start_server(5_000, 100).await;
    let mut player = TestClient::connect(addr).await;

    player.expect(Tag::Start).await;
    player.send(Tag::Bye, 0.0).await;
    let frame = player.expect(Tag::Bye).await;
    assert_eq!(frame.tag, Tag::Bye);
}

#[tokio::test]
async fn duplicate_bet_is_ignored() {
    let addr = start_server(400, 5).await;
    let mut player = TestClient::connect(addr).await;

    player.expect(Tag::Start).await;
    player.send(Tag::Bet, 100.0).await;
    player.send(Tag::Bet, 500.0).await;

    // Only the first bet counts: me = sqrt(3), and the lost stake is 100.
    let closed = player.expect(Tag::Closed).await;
    assert!((closed.value - 3.0f32.sqrt()).abs() < 1e-3);

    player.expect(Tag::Explode).await;
    let payout = player.expect(Tag::Payout).await;
    assert!((payout.player_profit + 100.0).abs() < 1e-3);
    assert!((payout.house_profit - 100.0).abs() < 1e-3);
}
