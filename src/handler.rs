//! Connection handler
//!
//! Drives one [`Session`] over a byte stream: a read loop feeding
//! `on_read_complete`, and a writer task draining the session's
//! outgoing queue one frame at a time.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, BufReader, WriteHalf};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::message::Message;
use crate::peer::{CloseReason, Mailbox};
use crate::room::Room;
use crate::session::Session;
use crate::wire::{read_chunk, write_message};

/// Run a session on `stream` until it closes
///
/// Returns the cause of the shutdown. Session errors never escape further:
/// by the time this returns the session has left the room and the stream
/// has been dropped.
pub async fn handle_connection<S>(
    stream: S,
    room: Arc<Room>,
    config: SessionConfig,
) -> SessionError
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let mut session = Session::new(room, config);
    let Mailbox {
        outgoing,
        mut close,
    } = match session.start() {
        Ok(mailbox) => mailbox,
        Err(e) => {
            session.on_error(&e);
            return e;
        }
    };

    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    // Write task (outgoing queue -> stream)
    let mut write_task = tokio::spawn(write_loop(write_half, outgoing));

    let mut chunk = Vec::new();
    let cause = loop {
        tokio::select! {
            read = read_chunk(&mut reader, &mut chunk) => {
                if let Err(e) = read {
                    break e;
                }
                if let Err(e) = session.on_read_complete(&chunk) {
                    break e;
                }
                chunk.clear();
            }
            written = &mut write_task => {
                break match written {
                    Ok(Err(e)) => e,
                    // Queue closed or task gone: nothing left to write to
                    _ => SessionError::Disconnected,
                };
            }
            reason = close_requested(&mut close) => {
                session.begin_close();
                break match reason {
                    CloseReason::Overflow => SessionError::QueueOverflow,
                    CloseReason::Shutdown => SessionError::Shutdown,
                };
            }
        }
    };

    session.on_error(&cause);
    // Pending messages are discarded with the writer
    write_task.abort();
    debug!("Handler for {} finished", session.id());

    cause
}

/// Write queued messages in order, one write in flight at a time
async fn write_loop<S>(
    mut writer: WriteHalf<S>,
    mut outgoing: mpsc::Receiver<Message>,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite,
{
    while let Some(message) = outgoing.recv().await {
        write_message(&mut writer, &message).await?;
    }
    Ok(())
}

/// Resolve once a close reason has been set
async fn close_requested(close: &mut watch::Receiver<Option<CloseReason>>) -> CloseReason {
    loop {
        let current = *close.borrow_and_update();
        if let Some(reason) = current {
            return reason;
        }
        if close.changed().await.is_err() {
            // Sender lives as long as the session is joined
            std::future::pending::<()>().await;
        }
    }
}
