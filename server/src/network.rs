//! TCP acceptor: socket setup, admission, and handler spawning.

use crate::handler::PlayerHandler;
use crate::manager::RoundManager;
use crate::round::RoundState;
use crate::table::{Connection, PlayerTable};
use log::{info, warn};
use shared::{recv_frame, send_frame, Frame, Tag, BETTING_WINDOW, TICK_INTERVAL};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio::sync::{Mutex, Notify};

// Connections beyond the player cap still get a bye before close, so the
// backlog leaves room for overflow.
const BACKLOG: u32 = 32;

/// Which unspecified address the listener binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

/// Round timing. Defaults match the protocol: a 10 second betting window
/// and 100 ms multiplier ticks. Payout math is independent of the cadence,
/// which lets the integration tests shrink the clock.
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    pub betting_window: Duration,
    pub tick_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            betting_window: BETTING_WINDOW,
            tick_interval: TICK_INTERVAL,
        }
    }
}

/// Listener plus the shared state every task hangs off.
pub struct Server {
    listener: TcpListener,
    table: Arc<Mutex<PlayerTable>>,
    round: Arc<Mutex<RoundState>>,
    occupancy: Arc<Notify>,
    config: ServerConfig,
}

impl Server {
    /// Binds `0.0.0.0` or `::` on the given port with address reuse enabled.
    pub async fn bind(
        version: IpVersion,
        port: u16,
        config: ServerConfig,
    ) -> Result<Server, Box<dyn std::error::Error>> {
        let (socket, addr) = match version {
            IpVersion::V4 => (
                TcpSocket::new_v4()?,
                SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            ),
            IpVersion::V6 => (
                TcpSocket::new_v6()?,
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, port)),
            ),
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(BACKLOG)?;
        info!("listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            table: Arc::new(Mutex::new(PlayerTable::new())),
            round: Arc::new(Mutex::new(RoundState::new())),
            occupancy: Arc::new(Notify::new()),
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Spawns the round manager and serves the accept loop forever.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let manager = RoundManager::new(
            Arc::clone(&self.table),
            Arc::clone(&self.round),
            Arc::clone(&self.occupancy),
            self.config,
        );
        tokio::spawn(manager.run());

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("accept failed: {}", e);
                    continue;
                }
            };

            let (reader, writer) = stream.into_split();
            let conn = Connection::new(writer);
            let admitted = self.table.lock().await.admit(conn.clone());
            match admitted {
                Some(id) => {
                    info!("player {} connected from {}", id, addr);
                    self.round.lock().await.join(id);
                    self.occupancy.notify_one();
                    let handler = PlayerHandler {
                        id,
                        reader,
                        conn,
                        table: Arc::clone(&self.table),
                        round: Arc::clone(&self.round),
                    };
                    tokio::spawn(handler.run());
                }
                None => {
                    info!("table full, turning away {}", addr);
                    tokio::spawn(async move {
                        {
                            let mut writer = conn.writer.lock().await;
                            let _ =
                                send_frame(&mut *writer, &Frame::broadcast(Tag::Bye, 0.0)).await;
                        }
                        // Drain until the peer hangs up so unread bytes do
                        // not turn the close into a reset that eats the bye.
                        let mut reader = reader;
                        let _ = tokio::time::timeout(Duration::from_secs(1), async {
                            while recv_frame(&mut reader).await.is_ok() {}
                        })
                        .await;
                    });
                }
            }
        }
    }
}
