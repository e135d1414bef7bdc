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

//! # Command Server Example
//!
//! Listens for line commands and answers each one. Try it with any Telnet
//! client:
//!
//! ```bash
//! cargo run -p cmdwire-service --example command_server -- 9000
//! telnet localhost 9000
//! ```
//!
//! ## Commands
//!
//! - `time` - Reply with the seconds since the server started
//! - `clients` - Reply with the number of connected clients
//! - `say <text>` - Broadcast text to every client
//! - `wake <host> <port> <command>` - Send a one-shot command to another server
//! - anything else is echoed back

use cmdwire_service::{
    ChannelObserver, CommandServer, LogObserver, NotificationKind, ServerConfig,
};
use std::time::Instant;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let port = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(9000u16);

    let server = CommandServer::new(ServerConfig::default())?;
    server.bus().subscribe(LogObserver);
    let (observer, mut notifications) = ChannelObserver::new();
    server.bus().subscribe(observer);

    server.start(port).await?;
    let started = Instant::now();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(n) = notifications.recv() => {
                match n.kind {
                    NotificationKind::ClientConnected => {
                        if let Some(reply) = &n.reply {
                            reply.write_line("cmdwire ready");
                        }
                    }
                    NotificationKind::ReceivedLine => {
                        let Some(reply) = n.reply else { continue };
                        let mut words = n.message.splitn(2, ' ');
                        match (words.next(), words.next()) {
                            (Some("time"), _) => {
                                reply.write_line(&format!("up {}s", started.elapsed().as_secs()));
                            }
                            (Some("clients"), _) => {
                                reply.write_line(&server.connection_count().to_string());
                            }
                            (Some("say"), Some(text)) => {
                                server.send(&format!("{}\n", text), None);
                            }
                            (Some("wake"), Some(rest)) => {
                                let args: Vec<&str> = rest.splitn(3, ' ').collect();
                                match args.as_slice() {
                                    [host, port, command] => match port.parse() {
                                        Ok(port) => server.send_awake_command(command, host, port).await,
                                        Err(_) => reply.write_line("bad port"),
                                    },
                                    _ => reply.write_line("usage: wake <host> <port> <command>"),
                                }
                            }
                            _ => reply.write_line(&n.message),
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    server.stop();
    Ok(())
}
