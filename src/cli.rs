//! Command line arguments for the server and client binaries

use std::net::IpAddr;

use clap::Parser;

use crate::config::{OverflowPolicy, SessionConfig, DEFAULT_QUEUE_CAPACITY};

/// Relay server
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Single-room text relay server", long_about = None)]
pub struct ServerArgs {
    /// Port to listen on. Use 0 for an ephemeral port.
    pub port: u16,

    /// Address to bind to
    #[arg(long, default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Messages buffered per session before the overflow policy applies
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// What to do when a session's outgoing queue is full
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Disconnect)]
    pub overflow: OverflowPolicy,
}

impl ServerArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new(self.queue_capacity, self.overflow)
    }
}

/// Interactive relay client
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Single-room text relay client", long_about = None)]
pub struct ClientArgs {
    /// Server port to connect to
    pub port: u16,

    /// Server host
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,
}
