//! Interactive client
//!
//! Sends each line typed on stdin as one message and prints every message
//! relayed by the server.

use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use crate::cli::ClientArgs;
use crate::error::{AppError, SessionError};
use crate::message::{decode_frame, Message};
use crate::wire::{read_chunk, write_message};

/// Typed on its own line to leave
pub const QUIT_COMMAND: &str = "/quit";

/// Connect to the server and chat over stdin/stdout
pub async fn run(args: ClientArgs) -> Result<(), AppError> {
    let stream = TcpStream::connect((args.host, args.port)).await?;
    info!("Connected to {}:{}", args.host, args.port);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    chat(stream, stdin, &mut stdout).await
}

/// Relay between a server connection and line-oriented input/output
///
/// Returns when the input ends, [`QUIT_COMMAND`] is entered, or the server
/// closes the connection.
pub async fn chat<S, I, O>(stream: S, mut input: I, output: &mut O) -> Result<(), AppError>
where
    S: AsyncRead + AsyncWrite,
    I: AsyncBufRead + Unpin,
    O: AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut chunk = Vec::new();
    // Kept across iterations: a frame arriving mid-line must not lose the
    // bytes typed so far
    let mut line = Vec::new();

    loop {
        tokio::select! {
            read = read_chunk(&mut reader, &mut chunk) => match read {
                Ok(()) => {
                    let message = decode_frame(&chunk)?;
                    chunk.clear();
                    output.write_all(message.body()).await?;
                    output.write_all(b"\n").await?;
                    output.flush().await?;
                }
                Err(SessionError::Disconnected) => {
                    info!("Server closed the connection");
                    break;
                }
                Err(e) => return Err(e.into()),
            },
            typed = input.read_until(b'\n', &mut line) => {
                if typed? == 0 {
                    break;
                }
                let keep_going = handle_line(&line, &mut writer).await?;
                line.clear();
                if !keep_going {
                    break;
                }
            }
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Failed to shut down connection cleanly: {}", e);
    }
    Ok(())
}

/// Send one typed line; returns false when the user asked to quit
async fn handle_line<W>(line: &[u8], writer: &mut W) -> Result<bool, AppError>
where
    W: AsyncWrite + Unpin,
{
    let end = line
        .iter()
        .rposition(|b| !matches!(b, b'\r' | b'\n'))
        .map_or(0, |last| last + 1);
    let text = &line[..end];
    if text == QUIT_COMMAND.as_bytes() {
        return Ok(false);
    }
    if text.is_empty() {
        return Ok(true);
    }

    match Message::encode(text) {
        Ok(message) => write_message(writer, &message).await?,
        Err(e) => warn!("Message not sent: {}", e),
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::io::{duplex, AsyncReadExt};
    use tokio::time::timeout;

    use crate::message::MAX_BODY;

    #[tokio::test]
    async fn test_lines_become_frames() {
        let (client_end, mut server_end) = duplex(1024);
        let input = BufReader::new(&b"hello\n\nworld\r\n/quit\nignored\n"[..]);
        let mut output = Vec::new();

        chat(client_end, input, &mut output).await.unwrap();

        let mut sent = Vec::new();
        server_end.read_to_end(&mut sent).await.unwrap();
        assert_eq!(sent, b"0005hello\n0005world\n");
    }

    #[tokio::test]
    async fn test_incoming_frames_are_printed() {
        let (client_end, mut server_end) = duplex(1024);
        server_end.write_all(b"0002hi\n0003bye\n").await.unwrap();
        drop(server_end);

        // Input never ends, so only the server hangup stops the loop
        let (_keep_open, pending_input) = duplex(16);
        let mut output = Vec::new();

        chat(client_end, BufReader::new(pending_input), &mut output)
            .await
            .unwrap();

        assert_eq!(output, b"hi\nbye\n");
    }

    #[tokio::test]
    async fn test_partial_line_survives_incoming_frame() {
        let (client_end, mut server_end) = duplex(1024);
        let (mut keyboard, stdin) = duplex(64);

        let client = tokio::spawn(async move {
            let mut output = Vec::new();
            chat(client_end, BufReader::new(stdin), &mut output)
                .await
                .unwrap();
            output
        });

        keyboard.write_all(b"hel").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        server_end.write_all(b"0002hi\n").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        keyboard.write_all(b"lo\n/quit\n").await.unwrap();

        let output = timeout(Duration::from_secs(3), client)
            .await
            .expect("client did not quit")
            .unwrap();
        assert_eq!(output, b"hi\n");

        let mut sent = Vec::new();
        server_end.read_to_end(&mut sent).await.unwrap();
        assert_eq!(sent, b"0005hello\n");
    }

    #[tokio::test]
    async fn test_last_line_without_newline_is_sent() {
        let (client_end, mut server_end) = duplex(1024);
        let input = BufReader::new(&b"one\ntwo"[..]);
        let mut output = Vec::new();

        chat(client_end, input, &mut output).await.unwrap();

        let mut sent = Vec::new();
        server_end.read_to_end(&mut sent).await.unwrap();
        assert_eq!(sent, b"0003one\n0003two\n");
    }

    #[tokio::test]
    async fn test_oversized_line_is_not_sent() {
        let (client_end, mut server_end) = duplex(64 * 1024);
        let mut typed = vec![b'x'; MAX_BODY + 1];
        typed.extend_from_slice(b"\nok\n");
        let input = BufReader::new(typed.as_slice());
        let mut output = Vec::new();

        chat(client_end, input, &mut output).await.unwrap();

        let mut sent = Vec::new();
        server_end.read_to_end(&mut sent).await.unwrap();
        assert_eq!(sent, b"0002ok\n");
    }

    #[tokio::test]
    async fn test_bad_frame_from_server_is_an_error() {
        let (client_end, mut server_end) = duplex(1024);
        server_end.write_all(b"zzzzhi\n").await.unwrap();
        let (_keep_open, pending_input) = duplex(16);
        let mut output = Vec::new();

        let err = chat(client_end, BufReader::new(pending_input), &mut output)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Codec(_)));
    }
}
