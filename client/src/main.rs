mod network;

use clap::Parser;
use shared::NICK_MAX;

#[derive(Parser, Debug)]
#[command(author, version, about = "Crash-game terminal client")]
struct Args {
    /// Server address
    ip: String,

    /// Server port
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,

    /// Nickname shown locally (1 to 13 characters)
    #[arg(short, long, value_parser = parse_nick)]
    nick: String,
}

fn parse_nick(s: &str) -> Result<String, String> {
    if s.is_empty() || s.len() > NICK_MAX {
        return Err(format!("nickname must be 1 to {} characters", NICK_MAX));
    }
    if !s.chars().all(|c| c.is_ascii_graphic()) {
        return Err("nickname must be printable ASCII without spaces".to_string());
    }
    Ok(s.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let session = network::Session::connect(&args.ip, args.port, &args.nick).await?;
    session.run().await
}
