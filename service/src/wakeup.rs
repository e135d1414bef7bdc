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

//! One-shot wake commands and IPv4 resolution

use crate::error::WakeupError;
use cmdwire_codec::with_newline;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;
use tracing::{debug, instrument};

/// Resolve `host` and return its first IPv4 address, if any
pub async fn resolve_ipv4(host: &str, port: u16) -> io::Result<Option<SocketAddr>> {
    let mut addrs = lookup_host((host, port)).await?;
    Ok(addrs.find(SocketAddr::is_ipv4))
}

/// Connect to `host:port`, write `command` plus a newline, then close.
///
/// Returns the address the command was delivered to.
#[instrument(skip(command))]
pub async fn send_wake_command(
    command: &str,
    host: &str,
    port: u16,
    connect_timeout: Duration,
) -> Result<SocketAddr, WakeupError> {
    if host.is_empty() {
        return Err(WakeupError::EmptyHost);
    }
    if port == 0 {
        return Err(WakeupError::InvalidPort(host.to_string()));
    }

    let address = match resolve_ipv4(host, port).await {
        Ok(Some(address)) => address,
        Ok(None) => {
            return Err(WakeupError::Resolve {
                host: host.to_string(),
                reason: "no IPv4 address".to_string(),
            });
        }
        Err(e) => {
            return Err(WakeupError::Resolve {
                host: host.to_string(),
                reason: e.to_string(),
            });
        }
    };

    let mut stream = match timeout(connect_timeout, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(WakeupError::Connect { address, source }),
        Err(_) => {
            return Err(WakeupError::Connect {
                address,
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            });
        }
    };

    let payload = with_newline(command);
    stream
        .write_all(payload.as_bytes())
        .await
        .map_err(|source| WakeupError::Send { address, source })?;
    stream
        .shutdown()
        .await
        .map_err(|source| WakeupError::Send { address, source })?;

    debug!(%address, "Wake command delivered");
    Ok(address)
}
