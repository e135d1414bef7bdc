//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Integration tests for the command client

use cmdwire_client::{ClientConfig, ClientError, CommandClient};
use cmdwire_service::{
    ChannelObserver, CommandServer, Notification, NotificationKind, ServerConfig, ServiceStatus,
};
use std::net::Ipv4Addr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, sleep, timeout};

const WAIT: Duration = Duration::from_secs(10);

fn observed(config: ClientConfig) -> (CommandClient, UnboundedReceiver<Notification>) {
    let client = CommandClient::new(config).unwrap();
    let (observer, rx) = ChannelObserver::new();
    client.bus().subscribe(observer);
    (client, rx)
}

async fn next_of(rx: &mut UnboundedReceiver<Notification>, kind: NotificationKind) -> Notification {
    timeout(WAIT, async {
        loop {
            let n = rx.recv().await.expect("bus closed");
            if n.kind == kind {
                return n;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {:?}", kind))
}

async fn wait_for_status(client: &CommandClient, status: ServiceStatus) {
    timeout(WAIT, async {
        while client.status() != status {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("client never reached {:?}", status));
}

/// Fake server: accept one connection
async fn accept_one() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[test]
fn test_invalid_config_rejected() {
    assert!(matches!(
        CommandClient::new(ClientConfig::new("", 9000)),
        Err(ClientError::InvalidConfig(_))
    ));
    assert!(matches!(
        CommandClient::new(ClientConfig::new("localhost", 0)),
        Err(ClientError::InvalidConfig(_))
    ));
}

#[test]
fn test_start_requires_runtime() {
    let client = CommandClient::new(ClientConfig::new("localhost", 9000)).unwrap();
    assert!(matches!(client.start(false), Err(ClientError::NoRuntime)));
    assert_eq!(client.status(), ServiceStatus::Stopped);
}

#[tokio::test]
async fn test_unresolvable_host() {
    let (client, mut rx) = observed(ClientConfig::new("nonexistent.invalid", 9000));
    client.start(false).unwrap();

    let error = next_of(&mut rx, NotificationKind::Error).await;
    assert!(error.message.contains("nonexistent.invalid"));
    wait_for_status(&client, ServiceStatus::Stopped).await;

    // Never got as far as a connection attempt
    while let Ok(n) = rx.try_recv() {
        assert_ne!(n.status, ServiceStatus::Started);
        assert_ne!(n.kind, NotificationKind::ClientConnected);
    }
}

#[tokio::test]
async fn test_connect_and_receive_lines() {
    let (listener, port) = accept_one().await;
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();

    let (mut peer, _) = listener.accept().await.unwrap();

    let started = next_of(&mut rx, NotificationKind::StatusChange).await;
    assert_eq!(started.status, ServiceStatus::Started);
    assert_eq!(started.message, format!("127.0.0.1:{}", port));

    let connected = next_of(&mut rx, NotificationKind::ClientConnected).await;
    assert!(connected.reply.is_some());
    assert!(client.is_connected());

    peer.write_all(b"hello\r\n\nworld\0").await.unwrap();
    assert_eq!(next_of(&mut rx, NotificationKind::ReceivedLine).await.message, "hello");
    assert_eq!(next_of(&mut rx, NotificationKind::ReceivedLine).await.message, "world");

    client.stop();
    assert_eq!(client.status(), ServiceStatus::Stopped);
}

#[tokio::test]
async fn test_send_is_ascii() {
    let (listener, port) = accept_one().await;
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();
    next_of(&mut rx, NotificationKind::ClientConnected).await;

    client.send("h\u{e9}llo\n", None);

    let mut buf = [0u8; 6];
    timeout(WAIT, peer.read_exact(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf, b"h?llo\n");
    let write = next_of(&mut rx, NotificationKind::Write).await;
    assert_eq!(write.message, "h\u{e9}llo");

    client.stop();
}

#[tokio::test]
async fn test_reply_from_observer_reaches_server() {
    let (listener, port) = accept_one().await;
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.bus().subscribe(|n: &Notification| {
        if n.kind == NotificationKind::ReceivedLine {
            if let Some(reply) = &n.reply {
                reply.write_line(&format!("done {}", n.message));
            }
        }
    });
    client.start(false).unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();
    next_of(&mut rx, NotificationKind::ClientConnected).await;

    peer.write_all(b"task\n").await.unwrap();

    let mut buf = [0u8; 9];
    timeout(WAIT, peer.read_exact(&mut buf)).await.unwrap().unwrap();
    assert_eq!(&buf, b"done task");

    client.stop();
}

#[tokio::test]
async fn test_send_when_not_connected_is_silent() {
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", 9));
    client.send("ignored", None);
    client.reply().write("ignored");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_negotiation_is_answered() {
    let (listener, port) = accept_one().await;
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();
    let (mut peer, _) = listener.accept().await.unwrap();
    next_of(&mut rx, NotificationKind::ClientConnected).await;

    // IAC WILL SGA, IAC DO ECHO
    peer.write_all(&[255, 251, 3, 255, 253, 1]).await.unwrap();

    let mut response = [0u8; 6];
    timeout(WAIT, peer.read_exact(&mut response))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(response, [255, 253, 3, 255, 252, 1]);

    client.stop();
}

#[tokio::test]
async fn test_peer_close_is_an_error() {
    let (listener, port) = accept_one().await;
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();
    let (peer, _) = listener.accept().await.unwrap();
    next_of(&mut rx, NotificationKind::ClientConnected).await;

    drop(peer);

    let error = next_of(&mut rx, NotificationKind::Error).await;
    assert_eq!(error.message, "connection closed by remote host");
    wait_for_status(&client, ServiceStatus::Stopped).await;

    // The finished session does not block a new one
    client.start(false).unwrap();
    let _again = listener.accept().await.unwrap();
    wait_for_status(&client, ServiceStatus::Connected).await;
    client.stop();
}

#[tokio::test]
async fn test_connection_refused() {
    let (listener, port) = accept_one().await;
    drop(listener);

    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();

    let error = next_of(&mut rx, NotificationKind::Error).await;
    assert!(error.message.starts_with("Unable to connect"));
    wait_for_status(&client, ServiceStatus::Stopped).await;
}

#[tokio::test]
async fn test_double_start_rejected() {
    let config = ClientConfig::new("127.0.0.1", 9).with_start_delay(Some(Duration::from_secs(30)));
    let (client, _rx) = observed(config);

    client.start(true).unwrap();
    assert!(matches!(client.start(true), Err(ClientError::AlreadyRunning)));
    client.stop();
}

#[tokio::test]
async fn test_stop_while_sleeping_is_not_an_error() {
    let config = ClientConfig::new("127.0.0.1", 9).with_start_delay(Some(Duration::from_secs(30)));
    let (client, mut rx) = observed(config);

    client.start(true).unwrap();
    wait_for_status(&client, ServiceStatus::Sleeping).await;

    client.stop();
    client.stop();
    assert_eq!(client.status(), ServiceStatus::Stopped);

    sleep(Duration::from_millis(50)).await;
    while let Ok(n) = rx.try_recv() {
        assert_ne!(n.kind, NotificationKind::Error);
    }
}

#[tokio::test]
async fn test_client_talks_to_server() {
    let server = CommandServer::new(
        ServerConfig::new().with_bind_address(Ipv4Addr::LOCALHOST.into()),
    )
    .unwrap();
    let (server_observer, mut server_rx) = ChannelObserver::new();
    server.bus().subscribe(server_observer);
    server.start(0).await.unwrap();
    let port = server.local_addr().unwrap().port();

    let (client, mut client_rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();
    next_of(&mut client_rx, NotificationKind::ClientConnected).await;
    next_of(&mut server_rx, NotificationKind::ClientConnected).await;

    client.send("status\n", None);
    let line = next_of(&mut server_rx, NotificationKind::ReceivedLine).await;
    assert_eq!(line.message, "status");

    line.reply.unwrap().write("ok\n");
    let answer = next_of(&mut client_rx, NotificationKind::ReceivedLine).await;
    assert_eq!(answer.message, "ok");

    client.stop();
    next_of(&mut server_rx, NotificationKind::ClientDisconnected).await;
    server.stop();
}

#[tokio::test]
async fn test_raw_stream_unaffected_by_lone_newlines() {
    let (listener, port) = accept_one().await;
    let (client, mut rx) = observed(ClientConfig::new("127.0.0.1", port));
    client.start(false).unwrap();
    let (mut peer, _): (TcpStream, _) = listener.accept().await.unwrap();
    next_of(&mut rx, NotificationKind::ClientConnected).await;

    peer.write_all(b"\n\r\n").await.unwrap();
    peer.write_all(b"last\n").await.unwrap();
    assert_eq!(next_of(&mut rx, NotificationKind::ReceivedLine).await.message, "last");

    client.stop();
}
