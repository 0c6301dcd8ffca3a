//! Connection session: prints server updates, turns stdin lines into frames.

use log::debug;
use shared::{recv_frame, send_frame, Frame, Tag, WireError};
use std::error::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

enum Input {
    Net(Result<Frame, WireError>),
    Line(Option<String>),
}

pub struct Session {
    reader: OwnedReadHalf,
    writer: OwnedWriteHalf,
}

impl Session {
    /// Connects and sends the hello frame. The nickname stays local; the
    /// server identifies players by slot id.
    pub async fn connect(host: &str, port: u16, nick: &str) -> Result<Session, Box<dyn Error>> {
        let stream = TcpStream::connect((host, port)).await?;
        let (reader, mut writer) = stream.into_split();
        send_frame(&mut writer, &Frame::request(Tag::Nick, 0.0)).await?;

        println!("Connected as {}.", nick);
        println!("Commands: bet <amount>, cashout, quit");
        Ok(Session { reader, writer })
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            let input = tokio::select! {
                received = recv_frame(&mut self.reader) => Input::Net(received),
                line = lines.next_line() => Input::Line(line?),
            };

            match input {
                Input::Net(Ok(frame)) => {
                    if !print_update(&frame) {
                        break;
                    }
                }
                Input::Net(Err(WireError::PeerGone)) => {
                    println!("server closed the connection");
                    break;
                }
                Input::Net(Err(e)) => return Err(e.into()),
                Input::Line(None) => break,
                Input::Line(Some(line)) => self.handle_command(line.trim()).await?,
            }
        }
        Ok(())
    }

    async fn handle_command(&mut self, line: &str) -> Result<(), Box<dyn Error>> {
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("bet") => match parts.next().and_then(|v| v.parse::<f32>().ok()) {
                Some(amount) => {
                    send_frame(&mut self.writer, &Frame::request(Tag::Bet, amount)).await?
                }
                None => println!("usage: bet <amount>"),
            },
            Some("cashout") => {
                send_frame(&mut self.writer, &Frame::request(Tag::Cashout, 0.0)).await?
            }
            // The server acknowledges with its own bye, which ends the loop.
            Some("quit") => send_frame(&mut self.writer, &Frame::request(Tag::Bye, 0.0)).await?,
            Some(other) => println!("unknown command: {}", other),
            None => {}
        }
        Ok(())
    }
}

/// Renders one server frame; returns false when the session is over.
fn print_update(frame: &Frame) -> bool {
    match frame.tag {
        Tag::Start => println!("-- round open, place your bets --"),
        Tag::Closed => println!("bets closed, explodes at {:.2}", frame.value),
        Tag::Multiplier => println!("multiplier {:.2}", frame.value),
        Tag::Explode => println!("exploded at {:.2}", frame.value),
        Tag::Payout => println!(
            "payout {:.2} (your profit {:.2}, house {:.2})",
            frame.value, frame.player_profit, frame.house_profit
        ),
        Tag::Profit => println!(
            "round over, your profit {:.2} (house {:.2})",
            frame.player_profit, frame.house_profit
        ),
        Tag::Bye => {
            println!("goodbye");
            return false;
        }
        other => debug!("ignoring {:?} frame", other),
    }
    true
}
