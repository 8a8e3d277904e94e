use clap::Parser;
use server::network::Server;
use std::time::Duration;

/// Command line arguments for the relay binary.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Maximum number of concurrent sessions
    #[clap(short, long, default_value = "32")]
    max_clients: usize,
    /// Seconds of inactivity before a session is dropped
    #[clap(short = 't', long, default_value = "5")]
    client_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let mut server = Server::new(
        &address,
        args.max_clients,
        Duration::from_secs(args.client_timeout),
    )
    .await?;

    server.run().await
}
