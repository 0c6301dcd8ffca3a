use clap::Parser;
use server::network::{IpVersion, Server, ServerConfig};

#[derive(Parser, Debug)]
#[command(author, version, about = "Crash-game server")]
struct Args {
    /// Address family to bind: "v4" (0.0.0.0) or "v6" (::)
    #[arg(value_parser = parse_version)]
    version: IpVersion,

    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
}

fn parse_version(s: &str) -> Result<IpVersion, String> {
    match s {
        "v4" => Ok(IpVersion::V4),
        "v6" => Ok(IpVersion::V6),
        other => Err(format!("expected v4 or v6, got {}", other)),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info to see round event lines");
    }

    let args = Args::parse();
    let server = Server::bind(args.version, args.port, ServerConfig::default()).await?;
    server.run().await
}
