//! Relay server
//!
//! Owns the listener and the single shared [`Room`], and spawns one
//! handler task per accepted connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::SessionConfig;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::room::Room;

/// The relay server
pub struct ChatServer {
    listener: TcpListener,
    room: Arc<Room>,
    config: SessionConfig,
}

impl ChatServer {
    /// Bind a listener; port 0 picks an ephemeral port
    pub async fn bind<A: ToSocketAddrs>(addr: A, config: SessionConfig) -> Result<Self, AppError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self::new(listener, config))
    }

    /// Wrap an already bound listener
    pub fn new(listener: TcpListener, config: SessionConfig) -> Self {
        Self {
            listener,
            room: Arc::new(Room::new()),
            config,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the room
    pub fn room(&self) -> Arc<Room> {
        Arc::clone(&self.room)
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// On shutdown the room is closed, every participant is asked to leave,
    /// and this waits for all connection handlers to finish.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let ChatServer {
            listener,
            room,
            config,
        } = self;
        tokio::pin!(shutdown);
        let mut sessions = JoinSet::new();

        info!("ChatServer started");

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        spawn_session(&mut sessions, stream, peer, &room, config);
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
            // Reap finished handlers so the set tracks live connections only
            while sessions.try_join_next().is_some() {}
        }
        drop(listener);

        info!("ChatServer shutting down, closing {} sessions", sessions.len());
        room.disconnect_all();

        while let Some(joined) = sessions.join_next().await {
            if let Err(e) = joined {
                warn!("Connection handler failed: {}", e);
            }
        }
        info!("ChatServer stopped");
    }

    /// Run until Ctrl-C
    pub async fn run_until_ctrl_c(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
            }
        })
        .await
    }
}

fn spawn_session(
    sessions: &mut JoinSet<()>,
    stream: TcpStream,
    peer: SocketAddr,
    room: &Arc<Room>,
    config: SessionConfig,
) {
    info!("New connection from {}", peer);
    if let Err(e) = stream.set_nodelay(true) {
        debug!("Could not set TCP_NODELAY for {}: {}", peer, e);
    }

    let room = Arc::clone(room);
    sessions.spawn(async move {
        let cause = handle_connection(stream, room, config).await;
        debug!("Connection from {} ended: {}", peer, cause);
    });
}
