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

//! Per-address connection cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::connection::Connection;
use super::dial::connect;
use super::Error;
use crate::config::{ConnectConfig, Host};

/// Dial timeout used when deriving dial parameters from a host descriptor.
const DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Caches one [`Connection`] per host address.
///
/// [`connect`](ConnectionRegistry::connect) always performs a fresh dial and
/// stores the result under the host's address, replacing whatever was there.
/// The map lock is held for the whole dial, so concurrent callers serialize
/// even for unrelated addresses. That keeps the one-dial-per-address promise
/// trivially true at the cost of throughput.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dial `host` and cache the connection under its address.
    ///
    /// A replaced entry is closed rather than abandoned, so sessions handed
    /// out from it start failing with a closed-connection error instead of
    /// silently pinning a dead transport.
    pub async fn connect(&self, host: &Host) -> Result<Arc<Connection>, Error> {
        let mut connections = self.connections.lock().await;

        let mut cfg = ConnectConfig::from_host(host);
        cfg.timeout = Some(DIAL_TIMEOUT);

        let connection = Arc::new(connect(cfg).await?);
        if let Some(previous) = connections.insert(host.address.clone(), Arc::clone(&connection)) {
            tracing::debug!(address = %host.address, "closing replaced connection");
            previous.close().await;
        }

        Ok(connection)
    }

    /// The cached connection for `address`, if one is registered.
    pub async fn get(&self, address: &str) -> Option<Arc<Connection>> {
        self.connections.lock().await.get(address).cloned()
    }

    /// Close and drop every cached connection.
    pub async fn close_all(&self) {
        let connections = {
            let mut map = self.connections.lock().await;
            std::mem::take(&mut *map)
        };
        for (address, connection) in connections {
            tracing::debug!(%address, "closing cached connection");
            connection.close().await;
        }
    }
}
