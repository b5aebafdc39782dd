//! End-to-end relay tests over real TCP connections.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use room_relay::wire::{read_chunk, write_message};
use room_relay::{
    decode_frame, ChatServer, Message, OverflowPolicy, Room, SessionConfig, SessionError,
};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(3);

struct TestServer {
    addr: SocketAddr,
    room: Arc<Room>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(config: SessionConfig) -> Self {
        let server = ChatServer::bind("127.0.0.1:0", config)
            .await
            .expect("bind test server");
        let addr = server.local_addr().expect("local addr");
        let room = server.room();

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async move {
            let _ = shutdown_rx.await;
        }));

        Self {
            addr,
            room,
            shutdown: Some(shutdown_tx),
            task,
        }
    }

    async fn connect(&self) -> TestClient {
        let before = self.room.len();
        let stream = TcpStream::connect(self.addr).await.expect("connect");
        let (reader, writer) = stream.into_split();
        self.wait_for_participants(before + 1).await;
        TestClient {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn wait_for_participants(&self, count: usize) {
        timeout(WAIT, async {
            while self.room.len() != count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("room never reached {count} participants"));
    }

    async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        timeout(WAIT, self.task)
            .await
            .expect("server did not stop")
            .expect("server task panicked");
    }
}

struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    async fn send(&mut self, body: &str) {
        let message = Message::encode(body).expect("encode");
        write_message(&mut self.writer, &message)
            .await
            .expect("send");
    }

    async fn recv(&mut self) -> String {
        let mut chunk = Vec::new();
        timeout(WAIT, read_chunk(&mut self.reader, &mut chunk))
            .await
            .expect("timed out waiting for a message")
            .expect("read failed");
        decode_frame(&chunk).expect("decode").body_text().into_owned()
    }

    /// True if nothing arrives within a short grace period
    async fn is_silent(&mut self) -> bool {
        let mut chunk = Vec::new();
        timeout(
            Duration::from_millis(200),
            read_chunk(&mut self.reader, &mut chunk),
        )
        .await
        .is_err()
    }

    async fn expect_closed(&mut self) {
        let mut chunk = Vec::new();
        let read = timeout(WAIT, read_chunk(&mut self.reader, &mut chunk))
            .await
            .expect("connection was not closed");
        assert!(
            matches!(read, Err(SessionError::Disconnected) | Err(SessionError::Connection(_))),
            "expected closed connection, got {read:?}"
        );
    }
}

#[tokio::test]
async fn test_message_reaches_others_but_not_sender() {
    let server = TestServer::start(SessionConfig::default()).await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    alice.send("hi").await;

    assert_eq!(bob.recv().await, "hi");
    assert!(alice.is_silent().await);

    server.stop().await;
}

#[tokio::test]
async fn test_three_way_fan_out() {
    let server = TestServer::start(SessionConfig::default()).await;
    let mut a = server.connect().await;
    let mut b = server.connect().await;
    let mut c = server.connect().await;

    a.send("m1").await;
    c.send("m2").await;

    // Relative order of different senders is not fixed
    let mut at_b = vec![b.recv().await, b.recv().await];
    at_b.sort();
    assert_eq!(at_b, vec!["m1", "m2"]);
    assert!(b.is_silent().await);

    assert_eq!(a.recv().await, "m2");
    assert_eq!(c.recv().await, "m1");

    server.stop().await;
}

#[tokio::test]
async fn test_per_sender_order() {
    let server = TestServer::start(SessionConfig::default()).await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    for i in 0..100 {
        alice.send(&format!("line {i}")).await;
    }
    for i in 0..100 {
        assert_eq!(bob.recv().await, format!("line {i}"));
    }

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_body_disconnects_sender_only() {
    let server = TestServer::start(SessionConfig::default()).await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;

    let mut frame = b"9999".to_vec();
    frame.extend(std::iter::repeat(b'x').take(10000));
    frame.push(b'\n');
    alice.writer.write_all(&frame).await.unwrap();

    alice.expect_closed().await;
    server.wait_for_participants(1).await;

    // Bob is alone now; a newcomer still hears him
    let mut carol = server.connect().await;
    bob.send("still here").await;
    assert_eq!(carol.recv().await, "still here");

    server.stop().await;
}

#[tokio::test]
async fn test_invalid_header_disconnects_sender() {
    let server = TestServer::start(SessionConfig::default()).await;
    let mut alice = server.connect().await;
    let _bob = server.connect().await;

    alice.writer.write_all(b"abcdhi\n").await.unwrap();

    alice.expect_closed().await;
    server.wait_for_participants(1).await;

    server.stop().await;
}

#[tokio::test]
async fn test_departure_stops_delivery() {
    let server = TestServer::start(SessionConfig::default()).await;
    let mut alice = server.connect().await;
    let bob = server.connect().await;

    drop(bob);
    server.wait_for_participants(1).await;

    let mut carol = server.connect().await;
    alice.send("after bob").await;
    assert_eq!(carol.recv().await, "after bob");

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_clients() {
    let server = TestServer::start(SessionConfig::new(16, OverflowPolicy::DropNewest)).await;
    let mut alice = server.connect().await;
    let mut bob = server.connect().await;
    let room = Arc::clone(&server.room);

    server.stop().await;

    // Handlers have finished by the time the server stops
    assert!(room.is_empty());
    alice.expect_closed().await;
    bob.expect_closed().await;
}

#[tokio::test]
async fn test_shutdown_right_after_connect_leaves_room_empty() {
    for _ in 0..10 {
        let server = TestServer::start(SessionConfig::default()).await;
        let room = Arc::clone(&server.room);

        // No wait for the room to grow: sessions may still be starting
        let mut clients = Vec::new();
        for _ in 0..4 {
            let stream = TcpStream::connect(server.addr).await.expect("connect");
            let (reader, writer) = stream.into_split();
            clients.push(TestClient {
                reader: BufReader::new(reader),
                writer,
            });
        }

        server.stop().await;

        assert!(room.is_closed());
        assert!(room.is_empty(), "room still holds {:?}", room.participant_ids());
        for client in &mut clients {
            client.expect_closed().await;
        }
    }
}
