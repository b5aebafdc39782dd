//! Relay Client - Entry Point
//!
//! Connects to a relay server and chats over stdin/stdout.

use clap::Parser;

use room_relay::cli::ClientArgs;
use room_relay::client;
use room_relay::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = ClientArgs::parse();
    client::run(args).await?;
    Ok(())
}
