//! Relay Server - Entry Point
//!
//! Binds the listener and relays messages until Ctrl-C.

use clap::Parser;
use tracing::info;

use room_relay::cli::ServerArgs;
use room_relay::logging::init_tracing;
use room_relay::ChatServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args = ServerArgs::parse();
    let config = args.session_config();

    let server = ChatServer::bind((args.host, args.port), config).await?;
    info!(
        "Relay server listening on {} (queue capacity {}, overflow {:?})",
        server.local_addr()?,
        config.queue_capacity,
        config.overflow
    );

    server.run_until_ctrl_c().await;
    Ok(())
}
