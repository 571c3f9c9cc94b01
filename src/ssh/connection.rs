// Copyright 2025 The hopssh Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The established, reusable connection handle.

use russh::client::{Handle, Msg};
use russh::Channel;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::dial::AcceptingHandler;
use super::Error;

pub(crate) type SshHandle = Handle<AcceptingHandler>;

/// What a live connection holds on to. For bastion connections the bastion
/// handle rides along so the tunnel underneath the client stays open.
struct Transport {
    client: SshHandle,
    bastion: Option<SshHandle>,
}

/// An authenticated transport handle, shared between concurrent callers.
///
/// Sessions are single-use channels carved off this handle: one per exec or
/// shell activation, never pooled. Access to the underlying client goes
/// through a mutex; once the client is cleared by [`close`], every later
/// session request fails with [`Error::ConnectionClosed`].
///
/// The cancellation token is intended for forced teardown of everything
/// derived from this connection. Output reads and waits are not yet wired to
/// it, so cancellation currently takes effect at the next blocking call.
///
/// [`close`]: Connection::close
pub struct Connection {
    transport: Mutex<Option<Transport>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

impl Connection {
    pub(crate) fn established(client: SshHandle, bastion: Option<SshHandle>) -> Self {
        Self {
            transport: Mutex::new(Some(Transport { client, bastion })),
            cancel: CancellationToken::new(),
        }
    }

    /// A fresh single-use session channel.
    pub async fn new_session(&self) -> Result<Channel<Msg>, Error> {
        let transport = self.transport.lock().await;
        let transport = transport.as_ref().ok_or(Error::ConnectionClosed)?;
        transport
            .client
            .channel_open_session()
            .await
            .map_err(Error::Ssh)
    }

    /// Token cancelled when the connection is closed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the transport client has been cleared.
    pub async fn is_closed(&self) -> bool {
        self.transport.lock().await.is_none()
    }

    /// Clear the transport client and disconnect, best effort. Safe to call
    /// more than once; later calls are no-ops.
    pub async fn close(&self) {
        let transport = self.transport.lock().await.take();
        if let Some(transport) = transport {
            if let Err(err) = transport
                .client
                .disconnect(russh::Disconnect::ByApplication, "", "")
                .await
            {
                tracing::debug!(%err, "disconnect failed");
            }
            if let Some(bastion) = transport.bastion {
                if let Err(err) = bastion
                    .disconnect(russh::Disconnect::ByApplication, "", "")
                    .await
                {
                    tracing::debug!(%err, "bastion disconnect failed");
                }
            }
        }
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closed_connection() -> Connection {
        Connection {
            transport: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn session_request_on_closed_connection_fails() {
        let conn = closed_connection();
        let err = conn.new_session().await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(err.to_string(), "connection closed");
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let conn = closed_connection();
        conn.close().await;
        conn.close().await;
        assert!(conn.is_closed().await);
        assert!(conn.cancellation_token().is_cancelled());
    }
}
