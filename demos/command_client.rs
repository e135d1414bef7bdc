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

//! # Command Client Example
//!
//! Connects to a command server and forwards stdin to it line by line.
//!
//! ```bash
//! cargo run -p cmdwire-client --example command_client -- localhost 9000
//! ```

use cmdwire_client::{ClientConfig, CommandClient};
use cmdwire_service::{Notification, NotificationKind, ServiceStatus};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "localhost".to_string());
    let port: u16 = args.next().map(|arg| arg.parse()).transpose()?.unwrap_or(9000);

    let config = ClientConfig::new(host, port)
        .with_start_delay(Some(Duration::from_secs(1)))
        .with_connect_timeout(Duration::from_secs(5));
    let client = CommandClient::new(config)?;

    client.bus().subscribe(|n: &Notification| match n.kind {
        NotificationKind::ReceivedLine => println!("< {}", n.message),
        NotificationKind::Error => eprintln!("! {}", n.message),
        NotificationKind::StatusChange => eprintln!("* {} ({})", n.status, n.message),
        _ => {}
    });
    client.start(true)?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = stdin.next_line() => match line? {
                Some(line) if line == "/quit" => break,
                Some(line) => {
                    if client.status() != ServiceStatus::Connected {
                        eprintln!("! not connected");
                    }
                    client.send(&format!("{}\n", line), None);
                }
                None => break,
            },
        }
    }

    client.stop();
    Ok(())
}
