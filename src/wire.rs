//! Framed reads and writes over async streams
//!
//! Shared by the server's sessions and the client.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{CodecError, SessionError};
use crate::message::{Message, DELIMITER, HEADER_WIDTH, MAX_BODY, MAX_FRAME_LEN};

/// Read bytes up to the next delimiter into `chunk`, delimiter stripped
///
/// Appends to whatever `chunk` already holds, so a read interrupted by
/// `select!` resumes where it stopped; callers clear `chunk` after using a
/// complete frame. Never buffers more than one maximal frame: a peer that
/// sends [`MAX_FRAME_LEN`] bytes without a delimiter is rejected with
/// `PayloadTooLarge`. End of stream is `Disconnected`, including in the
/// middle of a frame.
pub async fn read_chunk<R>(reader: &mut R, chunk: &mut Vec<u8>) -> Result<(), SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let limit = MAX_FRAME_LEN.saturating_sub(chunk.len());
    (&mut *reader)
        .take(limit as u64)
        .read_until(DELIMITER, chunk)
        .await?;

    if chunk.last() == Some(&DELIMITER) {
        chunk.pop();
        return Ok(());
    }

    if chunk.len() >= MAX_FRAME_LEN {
        return Err(CodecError::PayloadTooLarge {
            len: chunk.len() - HEADER_WIDTH,
            max: MAX_BODY,
        }
        .into());
    }

    Err(SessionError::Disconnected)
}

/// Write one message as a full frame and flush
pub async fn write_message<W>(writer: &mut W, message: &Message) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(&message.to_frame()).await?;
    writer.flush().await
}
