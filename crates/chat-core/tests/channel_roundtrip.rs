//! Integration tests exercising chat-core through its public API only:
//! a full key exchange over an in-memory pipe, followed by the same kind of
//! traffic a real chat session produces.

use chat_core::protocol::command;
use chat_core::{handshake, Command};

type Side = (
    chat_core::SecureReader<tokio::io::ReadHalf<tokio::io::DuplexStream>>,
    chat_core::SecureWriter<tokio::io::WriteHalf<tokio::io::DuplexStream>>,
);

async fn connected_pair(key_bits: u64) -> (Side, Side) {
    let (a, b) = tokio::io::duplex(8192);
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);
    let (side_a, side_b) = tokio::join!(
        handshake(a_read, a_write, key_bits),
        handshake(b_read, b_write, key_bits)
    );
    (side_a.expect("handshake a"), side_b.expect("handshake b"))
}

#[tokio::test]
async fn test_session_traffic_round_trips_through_the_channel() {
    let ((mut server_rx, mut server_tx), (mut client_rx, mut client_tx)) =
        connected_pair(128).await;

    // Client logs in: two credential lines, server replies with the ack.
    client_tx.send_line("alice").await.expect("send username");
    client_tx.send_line("pw1").await.expect("send password");
    assert_eq!(server_rx.recv_line().await.expect("username"), "alice");
    assert_eq!(server_rx.recv_line().await.expect("password"), "pw1");

    server_tx
        .send_line(command::LOGIN_ACCEPTED)
        .await
        .expect("send ack");
    assert_eq!(
        client_rx.recv_line().await.expect("ack"),
        command::LOGIN_ACCEPTED
    );

    // A chat line, classified the way the server would.
    client_tx.send_line("@bob the cake is a lie").await.expect("send pm");
    let received = server_rx.recv_line().await.expect("pm");
    assert_eq!(
        Command::parse(&received),
        Command::Private {
            to: "bob".to_string(),
            text: "the cake is a lie".to_string(),
        }
    );

    // The formatted delivery payload survives the return trip too.
    let delivery = command::private_message("alice", "the cake is a lie");
    server_tx.send_line(&delivery).await.expect("send delivery");
    assert_eq!(client_rx.recv_line().await.expect("delivery"), delivery);
}

#[tokio::test]
async fn test_each_direction_uses_its_own_key() {
    let ((mut server_rx, server_tx), (client_rx, mut client_tx)) = connected_pair(64).await;

    // The two sides negotiated independent pairs, so the same plaintext
    // produces different wire encodings in each direction.
    let to_server = chat_core::encrypt_line("same text", client_tx.peer_key());
    let to_client = chat_core::encrypt_line("same text", server_tx.peer_key());
    assert_ne!(to_server, to_client);

    client_tx.send_line("same text").await.expect("send");
    assert_eq!(server_rx.recv_line().await.expect("recv"), "same text");
    drop(client_rx);
}
