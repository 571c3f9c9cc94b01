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

//! Connection establishment, direct or tunneled through a bastion host.

use russh::client::{Config, Handle};
use std::sync::Arc;
use std::time::Duration;

use super::auth::{authenticate, build_auth_methods, AuthMethod};
use super::connection::Connection;
use super::Error;
use crate::config::{ConnectConfig, DEFAULT_DIAL_TIMEOUT};

/// Host-key policy used for every hop: accept whatever the server presents.
///
/// Host keys are not verified. Known weakness, kept because strict checking
/// would change connection behavior for hosts without a known_hosts entry.
#[derive(Debug, Clone)]
pub struct AcceptingHandler;

impl russh::client::Handler for AcceptingHandler {
    type Error = Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &russh::keys::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Establish an authenticated connection described by `cfg`.
///
/// Without a bastion this is a single dial to `address:port`. With a bastion
/// it is two authenticated hops: first to the bastion with the bastion
/// username, then through a `direct-tcpip` tunnel to the target with the
/// original username, reusing the same authentication methods. Either hop
/// fails with a dial error naming the endpoint it could not reach.
pub async fn connect(cfg: ConnectConfig) -> Result<Connection, Error> {
    let cfg = cfg.normalized()?;
    let mut methods = build_auth_methods(&cfg).await?;
    let timeout = cfg.timeout.unwrap_or(DEFAULT_DIAL_TIMEOUT);
    let config = Arc::new(Config::default());

    let Some(bastion) = cfg.bastion.as_ref() else {
        let endpoint = cfg.endpoint();
        tracing::debug!(%endpoint, username = %cfg.username, "dialing directly");
        let handle = dial_tcp(
            Arc::clone(&config),
            &cfg.address,
            cfg.port,
            &cfg.username,
            &mut methods,
            timeout,
        )
        .await?;
        return Ok(Connection::established(handle, None));
    };

    let bastion_endpoint = format!("{}:{}", bastion.address, bastion.port);
    tracing::debug!(
        bastion = %bastion_endpoint,
        target = %cfg.endpoint(),
        "dialing through bastion"
    );

    let bastion_handle = dial_tcp(
        Arc::clone(&config),
        &bastion.address,
        bastion.port,
        &bastion.username,
        &mut methods,
        timeout,
    )
    .await?;

    let handle = dial_through(
        config,
        &bastion_handle,
        &cfg.address,
        cfg.port,
        &cfg.username,
        &mut methods,
        timeout,
    )
    .await?;

    // The bastion handle has to outlive the tunneled connection; dropping it
    // would tear down the stream the second hop runs on.
    Ok(Connection::established(handle, Some(bastion_handle)))
}

/// One direct hop: TCP connect, SSH handshake, authentication.
async fn dial_tcp(
    config: Arc<Config>,
    address: &str,
    port: u16,
    username: &str,
    methods: &mut [AuthMethod],
    timeout: Duration,
) -> Result<Handle<AcceptingHandler>, Error> {
    let endpoint = format!("{address}:{port}");

    let mut handle = tokio::time::timeout(
        timeout,
        russh::client::connect(config, (address, port), AcceptingHandler),
    )
    .await
    .map_err(|_| dial_timeout(&endpoint, timeout))?
    .map_err(|source| dial_error(&endpoint, source))?;

    authenticate(&mut handle, username, methods)
        .await
        .map_err(|source| dial_error(&endpoint, source))?;

    Ok(handle)
}

/// The second hop of a bastion connection: open a `direct-tcpip` channel
/// through the already-authenticated bastion transport, run a fresh SSH
/// handshake over that stream, and authenticate as the target user.
async fn dial_through(
    config: Arc<Config>,
    bastion: &Handle<AcceptingHandler>,
    address: &str,
    port: u16,
    username: &str,
    methods: &mut [AuthMethod],
    timeout: Duration,
) -> Result<Handle<AcceptingHandler>, Error> {
    let endpoint = format!("{address}:{port}");

    let channel = tokio::time::timeout(
        timeout,
        bastion.channel_open_direct_tcpip(address, u32::from(port), "127.0.0.1", 0),
    )
    .await
    .map_err(|_| dial_timeout(&endpoint, timeout))?
    .map_err(|source| dial_error(&endpoint, Error::Ssh(source)))?;

    let mut handle = tokio::time::timeout(
        timeout,
        russh::client::connect_stream(config, channel.into_stream(), AcceptingHandler),
    )
    .await
    .map_err(|_| dial_timeout(&endpoint, timeout))?
    .map_err(|source| dial_error(&endpoint, source))?;

    authenticate(&mut handle, username, methods)
        .await
        .map_err(|source| dial_error(&endpoint, source))?;

    Ok(handle)
}

fn dial_error(endpoint: &str, source: Error) -> Error {
    Error::Dial {
        endpoint: endpoint.to_string(),
        source: Box::new(source),
    }
}

fn dial_timeout(endpoint: &str, timeout: Duration) -> Error {
    Error::Dial {
        endpoint: endpoint.to_string(),
        source: Box::new(Error::Timeout {
            seconds: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BastionConfig;

    #[tokio::test]
    async fn credential_free_config_fails_before_dialing() {
        let cfg = ConnectConfig {
            username: "alice".to_string(),
            // A TEST-NET address; validation must reject the config before
            // this would ever be dialed.
            address: "203.0.113.1".to_string(),
            ..Default::default()
        };
        let err = connect(cfg).await.unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, Error::NoCredentials));
    }

    #[tokio::test]
    async fn refused_dial_reports_the_endpoint() {
        let cfg = ConnectConfig {
            username: "alice".to_string(),
            password: "secret".to_string(),
            address: "127.0.0.1".to_string(),
            // Reserved port, nothing listens here.
            port: 1,
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let err = connect(cfg).await.unwrap_err();
        match err {
            Error::Dial { endpoint, .. } => assert_eq!(endpoint, "127.0.0.1:1"),
            other => panic!("expected a dial error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bastion_hop_is_attempted_before_the_target() {
        let cfg = ConnectConfig {
            username: "alice".to_string(),
            password: "secret".to_string(),
            // TEST-NET target; it must never be dialed when the bastion hop
            // already fails.
            address: "203.0.113.1".to_string(),
            bastion: Some(BastionConfig {
                address: "127.0.0.1".to_string(),
                port: 1,
                username: "jump".to_string(),
            }),
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        };
        let err = connect(cfg).await.unwrap_err();
        match err {
            Error::Dial { endpoint, .. } => assert_eq!(endpoint, "127.0.0.1:1"),
            other => panic!("expected a bastion dial error, got {other:?}"),
        }
    }
}
